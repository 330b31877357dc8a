//! Report the URL, ARN and attributes of one SQS queue, or list every queue.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    api::SqsApi,
    args::{AwsConnection, ModuleContext},
    clients::get_or_init_sqs,
    errors::ModuleError,
    module::ModuleResult,
    sqs::{describe_queue, get_queue_arn, get_queue_name, get_queue_url, list_queues, QueueArn},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueueType {
    #[default]
    Standard,
    Fifo,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct QueueInfoParams {
    /// Queue name or ARN. Without one, every queue is listed.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub queue_type: QueueType,
}

/// Where a queue lives, once its name or ARN has been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueLocation {
    pub arn: String,
    pub url: String,
}

/// Resolve a queue name or ARN to its ARN and URL; `None` when the queue does not exist.
pub async fn locate_queue<C: SqsApi + ?Sized>(
    client: &C,
    name: &str,
    queue_type: QueueType,
) -> Result<Option<QueueLocation>, ModuleError> {
    if name.starts_with("arn:") {
        let arn = QueueArn::parse(name)?;
        let url = get_queue_url(client, &arn.queue_name, Some(&arn.account_id)).await?;
        return Ok(url.map(|url| QueueLocation {
            arn: name.to_owned(),
            url,
        }));
    }

    let queue_name = get_queue_name(name, queue_type == QueueType::Fifo);
    let url = match get_queue_url(client, &queue_name, None).await? {
        Some(url) => url,
        None => return Ok(None),
    };
    Ok(get_queue_arn(client, &url)
        .await?
        .map(|arn| QueueLocation { arn, url }))
}

pub async fn queue_info<C: SqsApi + ?Sized>(
    client: &C,
    params: QueueInfoParams,
) -> Result<ModuleResult, ModuleError> {
    let mut warnings = vec![];

    if let Some(name) = &params.name {
        if let Some(location) = locate_queue(client, name, params.queue_type).await? {
            debug!(queue_arn = %location.arn, queue_url = %location.url, "Describing queue");
            let attributes = describe_queue(client, &location.url).await?;
            return Ok(ModuleResult::new(false)
                .with_fact("sqs_queue_arn", &location.arn)
                .with_fact("sqs_queue_url", &location.url)
                .with_fact("sqs_queue_attributes", attributes));
        }

        let message = format!("Queue {} does not exist, listing all queues instead", name);
        warn!("{}", message);
        warnings.push(message);
    }

    let queue_urls = list_queues(client).await?;
    Ok(ModuleResult::new(false)
        .with_fact("sqs_queues", queue_urls)
        .with_warnings(warnings))
}

/// Module entry point for `sqs_queue_info`. Never changes anything, so check mode is moot.
pub async fn execute(
    _ctx: ModuleContext,
    connection: AwsConnection,
    params: QueueInfoParams,
) -> Result<ModuleResult, ModuleError> {
    let client = get_or_init_sqs(&connection).await;
    queue_info(client, params).await
}
