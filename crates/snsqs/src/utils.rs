use std::sync::OnceLock;

use regex::Regex;

fn first_cap_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(.)([A-Z][a-z]+)").expect("valid regex"))
}

fn all_cap_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid regex"))
}

/// Convert an AWS CamelCase name to snake_case, keeping acronyms together.
/// # Example
/// ```
/// use snsqs::camel_to_snake;
/// assert_eq!(camel_to_snake("VisibilityTimeout"), "visibility_timeout");
/// assert_eq!(camel_to_snake("HTTPEndpoint"), "http_endpoint");
/// ```
pub fn camel_to_snake(name: &str) -> String {
    let first_pass = first_cap_re().replace_all(name, "${1}_${2}");
    all_cap_re()
        .replace_all(&first_pass, "${1}_${2}")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_to_snake() {
        assert_eq!(camel_to_snake("QueueArn"), "queue_arn");
        assert_eq!(
            camel_to_snake("ApproximateNumberOfMessagesNotVisible"),
            "approximate_number_of_messages_not_visible"
        );
        assert_eq!(camel_to_snake("SqsManagedSseEnabled"), "sqs_managed_sse_enabled");
        assert_eq!(
            camel_to_snake("KmsDataKeyReusePeriodSeconds"),
            "kms_data_key_reuse_period_seconds"
        );
    }

    #[test]
    fn test_camel_to_snake_leaves_snake_alone() {
        assert_eq!(camel_to_snake("already_snake"), "already_snake");
    }
}
