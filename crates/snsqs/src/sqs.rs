use std::{collections::HashMap, str::FromStr};

use serde_json::{Map, Value};

use crate::{
    api::SqsApi,
    errors::{ModuleError, ResultExt},
    utils::camel_to_snake,
};

const FIFO_SUFFIX: &str = ".fifo";

/// Attributes holding JSON documents rather than scalars.
const JSON_ATTRIBUTES: &[(&str, &str)] = &[
    ("Policy", "policy"),
    ("RedrivePolicy", "redrive_policy"),
    ("RedriveAllowPolicy", "redrive_allow_policy"),
];

/// Fifo queue names must end in `.fifo`.
/// # Example
/// ```
/// use snsqs::get_queue_name;
/// assert_eq!(get_queue_name("jobs", true), "jobs.fifo");
/// assert_eq!(get_queue_name("jobs.fifo", true), "jobs.fifo");
/// assert_eq!(get_queue_name("jobs", false), "jobs");
/// ```
pub fn get_queue_name(name: &str, is_fifo: bool) -> String {
    if !is_fifo || name.ends_with(FIFO_SUFFIX) {
        name.to_owned()
    } else {
        format!("{}{}", name, FIFO_SUFFIX)
    }
}

/// URL of the queue, `None` when it does not exist.
pub async fn get_queue_url<C: SqsApi + ?Sized>(
    client: &C,
    name: &str,
    owner_account_id: Option<&str>,
) -> Result<Option<String>, ModuleError> {
    match client.get_queue_url(name, owner_account_id).await {
        Ok(url) => Ok(Some(url)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e).aws_context(|| format!("Couldn't get URL of queue {}", name)),
    }
}

/// ARN of the queue at `url`, `None` when it does not exist.
pub async fn get_queue_arn<C: SqsApi + ?Sized>(
    client: &C,
    url: &str,
) -> Result<Option<String>, ModuleError> {
    match client.get_queue_attributes(url, &["QueueArn"]).await {
        Ok(mut attributes) => Ok(attributes.remove("QueueArn")),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e).aws_context(|| format!("Couldn't get ARN of queue {}", url)),
    }
}

/// Every attribute of the queue at `url`, as produced by [`describe_queue_attributes`].
pub async fn describe_queue<C: SqsApi + ?Sized>(
    client: &C,
    url: &str,
) -> Result<Map<String, Value>, ModuleError> {
    let attributes = client
        .get_queue_attributes(url, &["All"])
        .await
        .aws_context(|| format!("Couldn't get attributes of queue {}", url))?;
    Ok(describe_queue_attributes(attributes))
}

/// Turn raw queue attributes into snake_case keys with typed values.
///
/// SQS returns every attribute as a string: policies are parsed back into JSON documents,
/// canonical integers into numbers, and `true`/`false` into booleans.
pub fn describe_queue_attributes(mut attributes: HashMap<String, String>) -> Map<String, Value> {
    let mut policies = Map::new();
    for (attribute, key) in JSON_ATTRIBUTES {
        match attributes.remove(*attribute) {
            Some(raw) => {
                let parsed = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
                policies.insert(key.to_string(), parsed);
            }
            // redrive_allow_policy is only reported when set
            None if *attribute != "RedriveAllowPolicy" => {
                policies.insert(key.to_string(), Value::Null);
            }
            None => {}
        }
    }

    let mut description: Map<String, Value> = attributes
        .into_iter()
        .map(|(name, value)| (camel_to_snake(&name), typed_value(value)))
        .collect();
    description.extend(policies);
    description
}

fn typed_value(value: String) -> Value {
    match value.as_str() {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    match value.parse::<i64>() {
        Ok(number) if number.to_string() == value => Value::from(number),
        _ => Value::String(value),
    }
}

/// Every queue URL in the account and region.
pub async fn list_queues<C: SqsApi + ?Sized>(client: &C) -> Result<Vec<String>, ModuleError> {
    client
        .list_queues()
        .await
        .aws_context(|| "Couldn't get queue list")
}

/// `arn:<partition>:sqs:<region>:<account>:<queue name>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueArn {
    pub partition: String,
    pub region: String,
    pub account_id: String,
    pub queue_name: String,
}

impl FromStr for QueueArn {
    type Err = ModuleError;

    fn from_str(arn: &str) -> Result<Self, Self::Err> {
        let invalid =
            || ModuleError::InvalidArguments(format!("'{}' is not a valid SQS queue ARN", arn));

        let parts: Vec<&str> = arn.splitn(6, ':').collect();
        match parts.as_slice() {
            ["arn", partition, "sqs", region, account_id, queue_name]
                if !partition.is_empty() && !account_id.is_empty() && !queue_name.is_empty() =>
            {
                Ok(QueueArn {
                    partition: partition.to_string(),
                    region: region.to_string(),
                    account_id: account_id.to_string(),
                    queue_name: queue_name.to_string(),
                })
            }
            _ => Err(invalid()),
        }
    }
}

impl QueueArn {
    pub fn parse(arn: &str) -> Result<Self, ModuleError> {
        arn.parse()
    }
}
