use tracing::{debug, warn};

use crate::{
    api::{ApiError, SnsApi, Subscription},
    errors::{ModuleError, ResultExt},
};

/// Return the ARN of the topic called `name`, if the account has one.
///
/// Topic names cannot contain colons, so a `:name` suffix identifies the topic.
pub async fn topic_arn_lookup<C: SnsApi + ?Sized>(
    client: &C,
    name: &str,
) -> Result<Option<String>, ModuleError> {
    let lookup_suffix = format!(":{}", name);
    let topic_arns = client
        .list_topics()
        .await
        .aws_context(|| "Couldn't get topic list")?;

    Ok(topic_arns
        .into_iter()
        .find(|topic_arn| topic_arn.ends_with(&lookup_suffix)))
}

/// List the subscriptions of a topic.
///
/// Listing the subscriptions of a topic owned by another account is refused, so on an
/// authorization error every subscription the caller can see is listed and filtered instead.
pub async fn list_topic_subscriptions<C: SnsApi + ?Sized>(
    client: &C,
    topic_arn: &str,
) -> Result<Vec<Subscription>, ApiError> {
    match client.list_subscriptions_by_topic(topic_arn).await {
        Err(ApiError::Authorization { code, .. }) => {
            warn!(
                topic_arn,
                %code,
                "Not allowed to list topic subscriptions, falling back to account subscriptions"
            );
            Ok(client
                .list_subscriptions()
                .await?
                .into_iter()
                .filter(|sub| sub.topic_arn == topic_arn)
                .collect())
        }
        other => other,
    }
}

/// SNS stores phone numbers in E.164 form, so strip formatting from `sms` endpoints before
/// comparing them.
/// # Example
/// ```
/// use snsqs::canonicalize_endpoint;
/// assert_eq!(canonicalize_endpoint("sms", "+1 (555) 010-9999"), "+15550109999");
/// assert_eq!(canonicalize_endpoint("email", "Ops@Example.com"), "Ops@Example.com");
/// ```
pub fn canonicalize_endpoint(protocol: &str, endpoint: &str) -> String {
    if protocol == "sms" {
        let canonical: String = endpoint
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '+')
            .collect();
        debug!(endpoint, %canonical, "Canonicalized sms endpoint");
        canonical
    } else {
        endpoint.to_owned()
    }
}

/// The subscription id is the last segment of its ARN.
/// # Example
/// ```
/// use snsqs::subscription_id;
/// let arn = "arn:aws:sns:us-east-1:123456789012:alarms:c9a5b229-303d-4619-acc4-82b9f990210f";
/// assert_eq!(subscription_id(arn), "c9a5b229-303d-4619-acc4-82b9f990210f");
/// ```
pub fn subscription_id(subscription_arn: &str) -> &str {
    subscription_arn
        .rsplit_once(':')
        .map(|(_, id)| id)
        .unwrap_or(subscription_arn)
}
