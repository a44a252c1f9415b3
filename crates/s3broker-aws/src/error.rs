//! Classification of SDK failures into [`ProviderError`].
//!
//! The retry policy only understands [`ProviderError::is_transient`], so
//! everything the SDK can return has to land in one of its variants:
//! service error codes first, then the dispatch/timeout kinds, then the
//! bare HTTP status.

use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_smithy_runtime_api::client::orchestrator::HttpResponse;
use s3broker_core::ProviderError;

/// Header S3 attaches to redirects and `HeadBucket` responses.
pub const BUCKET_REGION_HEADER: &str = "x-amz-bucket-region";

/// Map an SDK error for an operation on `bucket`.
pub fn classify<E>(err: &SdkError<E, HttpResponse>, bucket: &str) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let detail = || DisplayErrorContext(err).to_string();
    match err {
        SdkError::TimeoutError(_) => ProviderError::Timeout { message: detail() },
        SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            ProviderError::Network { message: detail() }
        }
        SdkError::ConstructionFailure(_) => ProviderError::rejected("InvalidRequest", detail()),
        SdkError::ServiceError(service) => classify_code(
            err.code(),
            err.message().map_or_else(detail, str::to_owned),
            service.raw().status().as_u16(),
            bucket,
        ),
        _ => ProviderError::rejected("Unknown", detail()),
    }
}

/// Whether `err` is a service error carrying `code`.
pub(crate) fn has_code<E>(err: &SdkError<E, HttpResponse>, code: &str) -> bool
where
    E: ProvideErrorMetadata,
{
    matches!(err, SdkError::ServiceError(_)) && err.code() == Some(code)
}

/// The HTTP status of a service error.
pub(crate) fn status<E>(err: &SdkError<E, HttpResponse>) -> Option<u16> {
    match err {
        SdkError::ServiceError(service) => Some(service.raw().status().as_u16()),
        _ => None,
    }
}

/// The region a service error response names in its headers.
pub(crate) fn region_header<E>(err: &SdkError<E, HttpResponse>) -> Option<String> {
    match err {
        SdkError::ServiceError(service) => service
            .raw()
            .headers()
            .get(BUCKET_REGION_HEADER)
            .map(str::to_owned),
        _ => None,
    }
}

/// Map a service error code (or, without one, an HTTP status).
pub(crate) fn classify_code(
    code: Option<&str>,
    message: String,
    status: u16,
    bucket: &str,
) -> ProviderError {
    let bucket = bucket.to_owned();
    match code {
        Some("NoSuchBucket" | "NotFound") => ProviderError::NoSuchBucket { bucket },
        Some("BucketAlreadyOwnedByYou") => ProviderError::BucketAlreadyOwnedByYou { bucket },
        Some("BucketAlreadyExists") => ProviderError::BucketAlreadyExists { bucket },
        Some(
            "AccessDenied"
            | "Forbidden"
            | "AllAccessDisabled"
            | "InvalidAccessKeyId"
            | "SignatureDoesNotMatch"
            | "ExpiredToken"
            | "InvalidToken",
        ) => ProviderError::AccessDenied { message },
        Some(
            "SlowDown"
            | "Throttling"
            | "ThrottlingException"
            | "RequestLimitExceeded"
            | "TooManyRequestsException",
        ) => ProviderError::Throttled { message },
        Some("ServiceUnavailable" | "InternalError" | "OperationAborted") => {
            ProviderError::Unavailable { message }
        }
        Some("RequestTimeout") => ProviderError::Timeout { message },
        Some(other) => ProviderError::rejected(other, message),
        None => match status {
            404 => ProviderError::NoSuchBucket { bucket },
            403 => ProviderError::AccessDenied { message },
            429 => ProviderError::Throttled { message },
            408 => ProviderError::Timeout { message },
            500..=599 => ProviderError::Unavailable { message },
            _ => ProviderError::rejected(format!("Http{status}"), message),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_with(code: Option<&str>, status: u16) -> ProviderError {
        classify_code(code, "message".to_owned(), status, "app-logs")
    }

    #[test]
    fn test_should_classify_missing_bucket() {
        assert_eq!(
            classify_with(Some("NoSuchBucket"), 404),
            ProviderError::NoSuchBucket {
                bucket: "app-logs".to_owned()
            }
        );
        assert!(matches!(
            classify_with(None, 404),
            ProviderError::NoSuchBucket { .. }
        ));
    }

    #[test]
    fn test_should_classify_create_conflicts() {
        assert!(matches!(
            classify_with(Some("BucketAlreadyOwnedByYou"), 409),
            ProviderError::BucketAlreadyOwnedByYou { .. }
        ));
        assert!(matches!(
            classify_with(Some("BucketAlreadyExists"), 409),
            ProviderError::BucketAlreadyExists { .. }
        ));
    }

    #[test]
    fn test_should_treat_throttling_and_outages_as_transient() {
        for code in ["SlowDown", "Throttling", "ServiceUnavailable", "InternalError", "RequestTimeout"] {
            assert!(classify_with(Some(code), 503).is_transient(), "{code}");
        }
        assert!(classify_with(None, 502).is_transient());
        assert!(classify_with(None, 429).is_transient());
    }

    #[test]
    fn test_should_treat_auth_failures_as_permanent() {
        let err = classify_with(Some("AccessDenied"), 403);
        assert!(matches!(err, ProviderError::AccessDenied { .. }));
        assert!(!err.is_transient());
        assert!(!classify_with(Some("SignatureDoesNotMatch"), 403).is_transient());
        assert!(matches!(
            classify_with(None, 403),
            ProviderError::AccessDenied { .. }
        ));
    }

    #[test]
    fn test_should_keep_unknown_codes() {
        assert_eq!(
            classify_with(Some("MalformedPolicy"), 400),
            ProviderError::rejected("MalformedPolicy", "message")
        );
        assert_eq!(
            classify_with(None, 400),
            ProviderError::rejected("Http400", "message")
        );
    }
}
