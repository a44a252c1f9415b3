//! Supported provider regions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a region identifier is not in the supported set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported region: {0}")]
pub struct UnsupportedRegion(pub String);

macro_rules! regions {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// A region the broker is allowed to provision buckets in.
        ///
        /// Serialized as the provider's region identifier (e.g. `"eu-west-1"`).
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum Region {
            $(
                #[doc = concat!("`", $name, "`")]
                $variant,
            )+
        }

        impl Region {
            /// All supported regions, in declaration order.
            pub const ALL: &[Region] = &[$(Region::$variant),+];

            /// The provider identifier for this region.
            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Region::$variant => $name,)+
                }
            }
        }

        impl FromStr for Region {
            type Err = UnsupportedRegion;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($name => Ok(Region::$variant),)+
                    other => Err(UnsupportedRegion(other.to_owned())),
                }
            }
        }
    };
}

regions! {
    UsEast1 => "us-east-1",
    UsEast2 => "us-east-2",
    UsWest1 => "us-west-1",
    UsWest2 => "us-west-2",
    CaCentral1 => "ca-central-1",
    EuWest1 => "eu-west-1",
    EuWest2 => "eu-west-2",
    EuWest3 => "eu-west-3",
    EuCentral1 => "eu-central-1",
    EuNorth1 => "eu-north-1",
    ApSouth1 => "ap-south-1",
    ApSoutheast1 => "ap-southeast-1",
    ApSoutheast2 => "ap-southeast-2",
    ApNortheast1 => "ap-northeast-1",
    ApNortheast2 => "ap-northeast-2",
    SaEast1 => "sa-east-1",
}

impl Region {
    /// Whether bucket creation in this region needs an explicit location
    /// constraint. `us-east-1` is the provider default and rejects one.
    #[must_use]
    pub fn needs_location_constraint(self) -> bool {
        self != Region::UsEast1
    }
}

impl Default for Region {
    /// `us-east-1`, the provider default.
    fn default() -> Self {
        Region::UsEast1
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Region {
    type Error = UnsupportedRegion;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Region> for String {
    fn from(region: Region) -> Self {
        region.as_str().to_owned()
    }
}
