//! Best-effort detection of policy statements that grant public access.
//!
//! This is structure inspection, not policy evaluation. A statement counts as
//! public when it is an `Allow` for the wildcard principal (`"*"`,
//! `{"AWS": "*"}` or a principal list containing `"*"`) and carries no
//! `Condition` block. Conditions usually narrow access (source VPC, org id),
//! so conditional statements are left alone.

use serde_json::Value;

/// Identifiers of the public statements in `policy`. A statement's `Sid` is
/// used when present, otherwise its position as `#<index>`.
#[must_use]
pub fn find_public_statements(policy: &Value) -> Vec<String> {
    statements(policy)
        .iter()
        .enumerate()
        .filter(|(_, statement)| is_public_statement(statement))
        .map(|(index, statement)| statement_id(statement, index))
        .collect()
}

/// Remove the public statements from `policy`.
///
/// Returns the remaining policy (or `None` when no statement is left) and
/// the identifiers of the removed statements.
#[must_use]
pub fn strip_public_statements(policy: Value) -> (Option<Value>, Vec<String>) {
    let Value::Object(mut document) = policy else {
        return (Some(policy), Vec::new());
    };
    let Some(raw) = document.remove("Statement") else {
        return (Some(Value::Object(document)), Vec::new());
    };

    let list = match raw {
        Value::Array(list) => list,
        single => vec![single],
    };

    let mut removed = Vec::new();
    let mut kept = Vec::new();
    for (index, statement) in list.into_iter().enumerate() {
        if is_public_statement(&statement) {
            removed.push(statement_id(&statement, index));
        } else {
            kept.push(statement);
        }
    }

    if kept.is_empty() && !removed.is_empty() {
        return (None, removed);
    }
    document.insert("Statement".to_owned(), Value::Array(kept));
    (Some(Value::Object(document)), removed)
}

fn statements(policy: &Value) -> Vec<&Value> {
    match policy.get("Statement") {
        Some(Value::Array(list)) => list.iter().collect(),
        Some(single @ Value::Object(_)) => vec![single],
        _ => Vec::new(),
    }
}

fn is_public_statement(statement: &Value) -> bool {
    let allows = statement
        .get("Effect")
        .and_then(Value::as_str)
        .is_some_and(|effect| effect.eq_ignore_ascii_case("allow"));
    allows
        && statement.get("Condition").is_none()
        && statement.get("Principal").is_some_and(is_wildcard_principal)
}

fn is_wildcard_principal(principal: &Value) -> bool {
    match principal {
        Value::String(s) => s == "*",
        Value::Array(list) => list.iter().any(is_wildcard_principal),
        Value::Object(map) => map.values().any(is_wildcard_principal),
        _ => false,
    }
}

fn statement_id(statement: &Value, index: usize) -> String {
    statement
        .get("Sid")
        .and_then(Value::as_str)
        .filter(|sid| !sid.is_empty())
        .map_or_else(|| format!("#{index}"), str::to_owned)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn policy() -> Value {
        json!({
            "Version": "2012-10-17",
            "Statement": [
                {
                    "Sid": "PublicRead",
                    "Effect": "Allow",
                    "Principal": "*",
                    "Action": "s3:GetObject",
                    "Resource": "arn:aws:s3:::app-logs/*"
                },
                {
                    "Sid": "CiRole",
                    "Effect": "Allow",
                    "Principal": {"AWS": "arn:aws:iam::123456789012:role/ci"},
                    "Action": "s3:PutObject",
                    "Resource": "arn:aws:s3:::app-logs/*"
                },
                {
                    "Effect": "Allow",
                    "Principal": {"AWS": ["arn:aws:iam::123456789012:root", "*"]},
                    "Action": "s3:ListBucket",
                    "Resource": "arn:aws:s3:::app-logs"
                }
            ]
        })
    }

    #[test]
    fn test_should_find_wildcard_principal_statements() {
        assert_eq!(find_public_statements(&policy()), vec!["PublicRead", "#2"]);
    }

    #[test]
    fn test_should_ignore_deny_and_conditional_statements() {
        let doc = json!({
            "Statement": [
                {"Effect": "Deny", "Principal": "*", "Action": "s3:*"},
                {
                    "Effect": "Allow",
                    "Principal": "*",
                    "Action": "s3:GetObject",
                    "Condition": {"StringEquals": {"aws:SourceVpce": "vpce-1"}}
                }
            ]
        });
        assert!(find_public_statements(&doc).is_empty());
    }

    #[test]
    fn test_should_accept_single_statement_object() {
        let doc = json!({
            "Statement": {"Effect": "Allow", "Principal": {"AWS": "*"}, "Action": "s3:*"}
        });
        assert_eq!(find_public_statements(&doc), vec!["#0"]);
    }

    #[test]
    fn test_should_strip_only_public_statements() {
        let (remaining, removed) = strip_public_statements(policy());
        assert_eq!(removed, vec!["PublicRead", "#2"]);
        let remaining = remaining.unwrap();
        let statements = remaining["Statement"].as_array().unwrap();
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0]["Sid"], "CiRole");
        assert_eq!(remaining["Version"], "2012-10-17");
    }

    #[test]
    fn test_should_drop_policy_when_every_statement_is_public() {
        let doc = json!({
            "Version": "2012-10-17",
            "Statement": {"Effect": "Allow", "Principal": "*", "Action": "s3:GetObject"}
        });
        let (remaining, removed) = strip_public_statements(doc);
        assert!(remaining.is_none());
        assert_eq!(removed, vec!["#0"]);
    }
}
