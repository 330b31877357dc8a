//! The slice of the SNS and SQS APIs the modules call, behind traits so the reconciliation
//! logic can run against the SDK clients or an in-memory fake.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_sns::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_sqs::types::QueueAttributeName;
use thiserror::Error;
use tracing::debug;

const NOT_FOUND_CODES: &[&str] = &[
    "NotFound",
    "NotFoundException",
    "AWS.SimpleQueueService.NonExistentQueue",
    "QueueDoesNotExist",
];

const AUTHORIZATION_CODES: &[&str] = &[
    "AuthorizationError",
    "AuthorizationErrorException",
    "AccessDenied",
    "AccessDeniedException",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("not found ({code}): {message}")]
    NotFound { code: String, message: String },
    #[error("not authorized ({code}): {message}")]
    Authorization { code: String, message: String },
    #[error("{message}")]
    Service {
        code: Option<String>,
        message: String,
    },
}

impl ApiError {
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::NotFound { code, .. } | ApiError::Authorization { code, .. } => Some(code),
            ApiError::Service { code, .. } => code.as_deref(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    /// Sort an SDK failure by its error code.
    pub fn classify<E>(err: E) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
    {
        let message = err
            .message()
            .map(str::to_owned)
            .unwrap_or_else(|| DisplayErrorContext(&err).to_string());

        match err.code() {
            Some(code) if NOT_FOUND_CODES.contains(&code) => ApiError::NotFound {
                code: code.to_owned(),
                message,
            },
            Some(code) if AUTHORIZATION_CODES.contains(&code) => ApiError::Authorization {
                code: code.to_owned(),
                message,
            },
            code => ApiError::Service {
                code: code.map(str::to_owned),
                message,
            },
        }
    }
}

/// One entry of a topic's subscription list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub subscription_arn: String,
    pub topic_arn: String,
    pub protocol: String,
    pub endpoint: String,
}

#[async_trait]
pub trait SnsApi: Send + Sync {
    /// ARNs of every topic in the account and region.
    async fn list_topics(&self) -> Result<Vec<String>, ApiError>;

    async fn list_subscriptions_by_topic(
        &self,
        topic_arn: &str,
    ) -> Result<Vec<Subscription>, ApiError>;

    /// Every subscription the caller owns, across all topics.
    async fn list_subscriptions(&self) -> Result<Vec<Subscription>, ApiError>;

    /// Subscribe and return the subscription ARN, even when confirmation is still pending.
    async fn subscribe(
        &self,
        topic_arn: &str,
        protocol: &str,
        endpoint: &str,
        attributes: &HashMap<String, String>,
    ) -> Result<String, ApiError>;

    async fn unsubscribe(&self, subscription_arn: &str) -> Result<(), ApiError>;

    async fn get_subscription_attributes(
        &self,
        subscription_arn: &str,
    ) -> Result<HashMap<String, String>, ApiError>;

    async fn set_subscription_attribute(
        &self,
        subscription_arn: &str,
        name: &str,
        value: &str,
    ) -> Result<(), ApiError>;
}

#[async_trait]
pub trait SqsApi: Send + Sync {
    /// URLs of every queue in the account and region.
    async fn list_queues(&self) -> Result<Vec<String>, ApiError>;

    async fn get_queue_url(
        &self,
        queue_name: &str,
        owner_account_id: Option<&str>,
    ) -> Result<String, ApiError>;

    async fn get_queue_attributes(
        &self,
        queue_url: &str,
        attribute_names: &[&str],
    ) -> Result<HashMap<String, String>, ApiError>;
}

/// [`SnsApi`] backed by the AWS SDK.
#[derive(Debug, Clone)]
pub struct SnsClient {
    inner: aws_sdk_sns::Client,
}

impl SnsClient {
    pub fn new(inner: aws_sdk_sns::Client) -> Self {
        Self { inner }
    }
}

fn from_sdk_subscription(sub: aws_sdk_sns::types::Subscription) -> Subscription {
    Subscription {
        subscription_arn: sub.subscription_arn.unwrap_or_default(),
        topic_arn: sub.topic_arn.unwrap_or_default(),
        protocol: sub.protocol.unwrap_or_default(),
        endpoint: sub.endpoint.unwrap_or_default(),
    }
}

#[async_trait]
impl SnsApi for SnsClient {
    async fn list_topics(&self) -> Result<Vec<String>, ApiError> {
        let mut topic_arns = vec![];
        let mut pages = self.inner.list_topics().into_paginator().send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(ApiError::classify)?;
            topic_arns.extend(
                page.topics
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|topic| topic.topic_arn),
            );
        }
        debug!(count = topic_arns.len(), "Listed SNS topics");
        Ok(topic_arns)
    }

    async fn list_subscriptions_by_topic(
        &self,
        topic_arn: &str,
    ) -> Result<Vec<Subscription>, ApiError> {
        let mut subscriptions = vec![];
        let mut pages = self
            .inner
            .list_subscriptions_by_topic()
            .topic_arn(topic_arn)
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(ApiError::classify)?;
            subscriptions.extend(
                page.subscriptions
                    .unwrap_or_default()
                    .into_iter()
                    .map(from_sdk_subscription),
            );
        }
        debug!(topic_arn, count = subscriptions.len(), "Listed topic subscriptions");
        Ok(subscriptions)
    }

    async fn list_subscriptions(&self) -> Result<Vec<Subscription>, ApiError> {
        let mut subscriptions = vec![];
        let mut pages = self.inner.list_subscriptions().into_paginator().send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(ApiError::classify)?;
            subscriptions.extend(
                page.subscriptions
                    .unwrap_or_default()
                    .into_iter()
                    .map(from_sdk_subscription),
            );
        }
        Ok(subscriptions)
    }

    async fn subscribe(
        &self,
        topic_arn: &str,
        protocol: &str,
        endpoint: &str,
        attributes: &HashMap<String, String>,
    ) -> Result<String, ApiError> {
        let output = self
            .inner
            .subscribe()
            .topic_arn(topic_arn)
            .protocol(protocol)
            .endpoint(endpoint)
            .set_attributes((!attributes.is_empty()).then(|| attributes.clone()))
            .return_subscription_arn(true)
            .send()
            .await
            .map_err(ApiError::classify)?;

        output.subscription_arn.ok_or_else(|| ApiError::Service {
            code: None,
            message: "subscribe returned no subscription ARN".to_string(),
        })
    }

    async fn unsubscribe(&self, subscription_arn: &str) -> Result<(), ApiError> {
        self.inner
            .unsubscribe()
            .subscription_arn(subscription_arn)
            .send()
            .await
            .map_err(ApiError::classify)?;
        Ok(())
    }

    async fn get_subscription_attributes(
        &self,
        subscription_arn: &str,
    ) -> Result<HashMap<String, String>, ApiError> {
        let output = self
            .inner
            .get_subscription_attributes()
            .subscription_arn(subscription_arn)
            .send()
            .await
            .map_err(ApiError::classify)?;
        Ok(output.attributes.unwrap_or_default())
    }

    async fn set_subscription_attribute(
        &self,
        subscription_arn: &str,
        name: &str,
        value: &str,
    ) -> Result<(), ApiError> {
        self.inner
            .set_subscription_attributes()
            .subscription_arn(subscription_arn)
            .attribute_name(name)
            .attribute_value(value)
            .send()
            .await
            .map_err(ApiError::classify)?;
        Ok(())
    }
}

/// [`SqsApi`] backed by the AWS SDK.
#[derive(Debug, Clone)]
pub struct SqsClient {
    inner: aws_sdk_sqs::Client,
}

impl SqsClient {
    pub fn new(inner: aws_sdk_sqs::Client) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl SqsApi for SqsClient {
    async fn list_queues(&self) -> Result<Vec<String>, ApiError> {
        let mut queue_urls = vec![];
        let mut pages = self.inner.list_queues().into_paginator().send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(ApiError::classify)?;
            queue_urls.extend(page.queue_urls.unwrap_or_default());
        }
        debug!(count = queue_urls.len(), "Listed SQS queues");
        Ok(queue_urls)
    }

    async fn get_queue_url(
        &self,
        queue_name: &str,
        owner_account_id: Option<&str>,
    ) -> Result<String, ApiError> {
        let output = self
            .inner
            .get_queue_url()
            .queue_name(queue_name)
            .set_queue_owner_aws_account_id(owner_account_id.map(str::to_owned))
            .send()
            .await
            .map_err(ApiError::classify)?;

        output.queue_url.ok_or_else(|| ApiError::NotFound {
            code: "QueueDoesNotExist".to_string(),
            message: format!("no URL returned for queue {}", queue_name),
        })
    }

    async fn get_queue_attributes(
        &self,
        queue_url: &str,
        attribute_names: &[&str],
    ) -> Result<HashMap<String, String>, ApiError> {
        let output = self
            .inner
            .get_queue_attributes()
            .queue_url(queue_url)
            .set_attribute_names(Some(
                attribute_names
                    .iter()
                    .map(|name| QueueAttributeName::from(*name))
                    .collect(),
            ))
            .send()
            .await
            .map_err(ApiError::classify)?;

        Ok(output
            .attributes
            .unwrap_or_default()
            .into_iter()
            .map(|(name, value)| (name.as_str().to_owned(), value))
            .collect())
    }
}
