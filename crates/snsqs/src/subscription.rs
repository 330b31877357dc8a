//! Reconcile one subscription of an SNS topic.
//!
//! The subscription is identified by its `(protocol, endpoint)` pair, with the endpoint in
//! canonical form. When it exists, only the attributes named in the parameters are compared
//! and corrected; attributes the parameters leave out are never touched.

use std::collections::{hash_map::Entry, BTreeMap, HashMap};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::{
    api::SnsApi,
    args::{AwsConnection, ModuleContext},
    clients::get_or_init_sns,
    errors::{ModuleError, ResultExt},
    module::ModuleResult,
    sns::{canonicalize_endpoint, list_topic_subscriptions, subscription_id, topic_arn_lookup},
};

const FIFO_SUFFIX: &str = ".fifo";

/// Subscription attributes SNS allows to be changed after subscribing.
pub const MUTABLE_ATTRIBUTES: &[&str] = &[
    "DeliveryPolicy",
    "FilterPolicy",
    "FilterPolicyScope",
    "RawMessageDelivery",
    "RedrivePolicy",
    "SubscriptionRoleArn",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum State {
    #[default]
    Present,
    Absent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TopicType {
    #[default]
    Standard,
    Fifo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Protocol {
    Http,
    Https,
    Email,
    EmailJson,
    Sms,
    Sqs,
    Application,
    Lambda,
    Firehose,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::Email => "email",
            Protocol::EmailJson => "email-json",
            Protocol::Sms => "sms",
            Protocol::Sqs => "sqs",
            Protocol::Application => "application",
            Protocol::Lambda => "lambda",
            Protocol::Firehose => "firehose",
        }
    }

    fn supports_raw_delivery(&self) -> bool {
        matches!(
            self,
            Protocol::Sqs | Protocol::Http | Protocol::Https | Protocol::Firehose
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TopicSpec {
    /// Topic name or ARN.
    pub name: String,
    #[serde(rename = "type", default)]
    pub topic_type: TopicType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SubscriptionSpec {
    pub protocol: Protocol,
    pub endpoint: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SubscriptionParams {
    #[serde(default)]
    pub state: State,
    pub topic: TopicSpec,
    pub subscription: SubscriptionSpec,
}

/// Render desired attributes the way the SNS API stores them: every value is a string.
pub fn desired_attributes(
    protocol: Protocol,
    attributes: &Map<String, Value>,
) -> Result<BTreeMap<String, String>, ModuleError> {
    let mut desired = BTreeMap::new();
    for (name, value) in attributes {
        if !MUTABLE_ATTRIBUTES.contains(&name.as_str()) {
            return Err(ModuleError::InvalidArguments(format!(
                "Unsupported subscription attribute '{}', expected one of: {}",
                name,
                MUTABLE_ATTRIBUTES.join(", ")
            )));
        }
        if name == "RawMessageDelivery" && !protocol.supports_raw_delivery() {
            return Err(ModuleError::InvalidArguments(format!(
                "RawMessageDelivery is not supported for '{}' subscriptions",
                protocol.as_str()
            )));
        }
        if name == "SubscriptionRoleArn" && protocol != Protocol::Firehose {
            return Err(ModuleError::InvalidArguments(
                "SubscriptionRoleArn is only supported for 'firehose' subscriptions".to_string(),
            ));
        }

        let rendered = match value {
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Null => {
                return Err(ModuleError::InvalidArguments(format!(
                    "Subscription attribute '{}' must not be null",
                    name
                )))
            }
            document => document.to_string(),
        };
        desired.insert(name.to_owned(), rendered);
    }
    Ok(desired)
}

/// Policies come back from SNS re-serialized, so JSON documents are compared parsed.
pub fn attribute_matches(desired: &str, observed: Option<&str>) -> bool {
    let observed = match observed {
        Some(observed) => observed,
        None => return desired.is_empty(),
    };
    if desired == observed {
        return true;
    }
    match (
        serde_json::from_str::<Value>(desired),
        serde_json::from_str::<Value>(observed),
    ) {
        (Ok(desired), Ok(observed)) => desired == observed,
        _ => false,
    }
}

/// `PendingConfirmation` and `Deleted` stand in for the ARN of unusable subscriptions.
fn is_usable_subscription_arn(arn: &str) -> bool {
    arn.starts_with("arn:")
}

/// Handles SNS topic subscription creation, update and removal.
pub struct SubscriptionManager<'a, C: SnsApi + ?Sized> {
    client: &'a C,
    state: State,
    topic: TopicSpec,
    protocol: Protocol,
    endpoint: String,
    desired_attributes: BTreeMap<String, String>,
    check_mode: bool,
    topic_arn: Option<String>,
    sub_arn: Option<String>,
    attributes_set: BTreeMap<String, String>,
    warnings: Vec<String>,
}

impl<'a, C: SnsApi + ?Sized> SubscriptionManager<'a, C> {
    pub fn new(
        client: &'a C,
        params: SubscriptionParams,
        check_mode: bool,
    ) -> Result<Self, ModuleError> {
        let desired_attributes =
            desired_attributes(params.subscription.protocol, &params.subscription.attributes)?;

        Ok(SubscriptionManager {
            client,
            state: params.state,
            topic: params.topic,
            protocol: params.subscription.protocol,
            endpoint: params.subscription.endpoint,
            desired_attributes,
            check_mode,
            topic_arn: None,
            sub_arn: None,
            attributes_set: BTreeMap::new(),
            warnings: vec![],
        })
    }

    pub fn topic_arn(&self) -> Option<&str> {
        self.topic_arn.as_deref()
    }

    pub fn subscription_arn(&self) -> Option<&str> {
        self.sub_arn.as_deref()
    }

    /// Resolve the topic ARN, then find the subscription matching the desired
    /// `(protocol, endpoint)` among the topic's subscriptions.
    pub async fn populate_arns(&mut self) -> Result<(), ModuleError> {
        let name = &self.topic.name;
        self.topic_arn = if name.starts_with("arn:") {
            Some(name.clone())
        } else {
            let lookup_name = if self.topic.topic_type == TopicType::Fifo
                && !name.ends_with(FIFO_SUFFIX)
            {
                format!("{}{}", name, FIFO_SUFFIX)
            } else {
                name.clone()
            };
            topic_arn_lookup(self.client, &lookup_name).await?
        };

        let topic_arn = match &self.topic_arn {
            Some(topic_arn) => topic_arn.clone(),
            None => {
                debug!(topic = %self.topic.name, "Topic not found");
                return Ok(());
            }
        };

        let subscriptions = match list_topic_subscriptions(self.client, &topic_arn).await {
            Ok(subscriptions) => subscriptions,
            Err(e) if e.is_not_found() => {
                debug!(%topic_arn, "Topic not found while listing subscriptions");
                self.topic_arn = None;
                return Ok(());
            }
            Err(e) => {
                return Err(e).aws_context(|| {
                    format!("Couldn't get subscriptions list for topic {}", topic_arn)
                })
            }
        };

        // A confirmed subscription wins over a placeholder listed for the same endpoint.
        let mut existing: HashMap<(String, String), String> = HashMap::new();
        for sub in subscriptions {
            let endpoint = canonicalize_endpoint(&sub.protocol, &sub.endpoint);
            match existing.entry((sub.protocol, endpoint)) {
                Entry::Vacant(entry) => {
                    entry.insert(sub.subscription_arn);
                }
                Entry::Occupied(mut entry) => {
                    if !is_usable_subscription_arn(entry.get())
                        && is_usable_subscription_arn(&sub.subscription_arn)
                    {
                        entry.insert(sub.subscription_arn);
                    }
                }
            }
        }

        let desired_key = (
            self.protocol.as_str().to_owned(),
            canonicalize_endpoint(self.protocol.as_str(), &self.endpoint),
        );
        self.sub_arn = existing.get(&desired_key).cloned();
        debug!(
            %topic_arn,
            existing = existing.len(),
            subscription_arn = ?self.sub_arn,
            "Looked up subscription"
        );
        Ok(())
    }

    pub async fn ensure_present(&mut self) -> Result<bool, ModuleError> {
        let topic_arn = self.topic_arn.clone().ok_or_else(|| {
            ModuleError::Failed(format!(
                "Cannot subscribe to topic. Topic '{}' does not exist.",
                self.topic.name
            ))
        })?;

        match self.sub_arn.clone() {
            None => self.create_subscription(&topic_arn).await,
            Some(sub_arn) if !is_usable_subscription_arn(&sub_arn) => {
                if !self.desired_attributes.is_empty() {
                    self.warn(format!(
                        "Subscription of {} to {} is {}; its attributes cannot be managed until it is confirmed",
                        self.endpoint, topic_arn, sub_arn
                    ));
                }
                Ok(false)
            }
            Some(sub_arn) => self.set_subscription_attributes(&sub_arn).await,
        }
    }

    pub async fn ensure_absent(&mut self) -> Result<bool, ModuleError> {
        if self.topic_arn.is_none() {
            return Ok(false);
        }

        match self.sub_arn.clone() {
            None => Ok(false),
            Some(sub_arn) if !is_usable_subscription_arn(&sub_arn) => {
                let reason = match sub_arn.as_str() {
                    "PendingConfirmation" => {
                        "SNS deletes unconfirmed subscriptions after three days"
                    }
                    "Deleted" => "SNS is already removing it",
                    _ => "it has no subscription ARN yet",
                };
                self.warn(format!(
                    "Subscription of {} is {} and cannot be removed; {}",
                    self.endpoint, sub_arn, reason
                ));
                Ok(false)
            }
            Some(sub_arn) => {
                if !self.check_mode {
                    self.client
                        .unsubscribe(&sub_arn)
                        .await
                        .aws_context(|| format!("Couldn't delete subscription {}", sub_arn))?;
                }
                info!(subscription_arn = %sub_arn, check_mode = self.check_mode, "Removed subscription");
                self.attributes_set.clear();
                Ok(true)
            }
        }
    }

    async fn create_subscription(&mut self, topic_arn: &str) -> Result<bool, ModuleError> {
        if !self.check_mode {
            let attributes: HashMap<String, String> = self
                .desired_attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            let sub_arn = self
                .client
                .subscribe(topic_arn, self.protocol.as_str(), &self.endpoint, &attributes)
                .await
                .aws_context(|| format!("Couldn't subscribe to topic {}", topic_arn))?;
            self.sub_arn = Some(sub_arn);
        }
        info!(
            %topic_arn,
            protocol = self.protocol.as_str(),
            endpoint = %self.endpoint,
            check_mode = self.check_mode,
            "Created subscription"
        );
        self.attributes_set = self.desired_attributes.clone();
        Ok(true)
    }

    async fn set_subscription_attributes(&mut self, sub_arn: &str) -> Result<bool, ModuleError> {
        let observed = self
            .client
            .get_subscription_attributes(sub_arn)
            .await
            .aws_context(|| {
                format!("Couldn't get subscription attributes for subscription {}", sub_arn)
            })?;

        let drifted: Vec<(String, String)> = self
            .desired_attributes
            .iter()
            .filter(|(name, value)| !attribute_matches(value, observed.get(*name).map(String::as_str)))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        self.attributes_set = observed.into_iter().collect();
        if drifted.is_empty() {
            debug!(subscription_arn = sub_arn, "Subscription attributes up to date");
            return Ok(false);
        }

        info!(
            subscription_arn = sub_arn,
            attributes = %drifted.iter().map(|(name, _)| name).join(", "),
            check_mode = self.check_mode,
            "Updating subscription attributes"
        );
        if !self.check_mode {
            for (name, value) in &drifted {
                self.client
                    .set_subscription_attribute(sub_arn, name, value)
                    .await
                    .aws_context(|| format!("Couldn't set subscription attribute '{}'", name))?;
            }
        }
        self.attributes_set.extend(drifted);
        Ok(true)
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }

    /// The final observed state of the subscription.
    pub fn into_result(self, changed: bool) -> ModuleResult {
        ModuleResult::new(changed)
            .with_fact("sns_topic_subscription_arn", &self.sub_arn)
            .with_fact(
                "subscription_id",
                self.sub_arn.as_deref().map(subscription_id),
            )
            .with_fact(
                "sns_topic_subscription",
                json!({
                    "topic_arn": self.topic_arn,
                    "protocol": self.protocol.as_str(),
                    "endpoint": self.endpoint,
                    "attributes": self.attributes_set,
                    "check_mode": self.check_mode,
                }),
            )
            .with_warnings(self.warnings)
    }
}

/// One reconciliation pass: resolve, look up, compare, apply, report.
pub async fn reconcile<C: SnsApi + ?Sized>(
    client: &C,
    params: SubscriptionParams,
    check_mode: bool,
) -> Result<ModuleResult, ModuleError> {
    let mut manager = SubscriptionManager::new(client, params, check_mode)?;
    manager.populate_arns().await?;

    let changed = match manager.state {
        State::Present => manager.ensure_present().await?,
        State::Absent => manager.ensure_absent().await?,
    };

    Ok(manager.into_result(changed))
}

/// Module entry point for `sns_topic_subscription`.
pub async fn execute(
    ctx: ModuleContext,
    connection: AwsConnection,
    params: SubscriptionParams,
) -> Result<ModuleResult, ModuleError> {
    let client = get_or_init_sns(&connection).await;
    reconcile(client, params, ctx.check_mode).await
}
