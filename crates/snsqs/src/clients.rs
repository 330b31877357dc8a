use aws_config::{retry::RetryConfig, BehaviorVersion, SdkConfig};
use aws_credential_types::Credentials;
use aws_types::region::Region;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::{
    api::{SnsClient, SqsClient},
    args::AwsConnection,
};

pub const AWS_ENDPOINT_URL: &str = "AWS_ENDPOINT_URL";

/// Attempts per API call, retries included, using the SDK's standard jittered backoff.
pub const MAX_ATTEMPTS: u32 = 10;

/// The `endpoint_url` parameter, else the `AWS_ENDPOINT_URL` value; empty strings count as unset.
pub fn resolve_endpoint_url(
    connection: &AwsConnection,
    env_endpoint_url: Option<String>,
) -> Option<String> {
    connection
        .endpoint_url
        .clone()
        .filter(|url| !url.is_empty())
        .or_else(|| env_endpoint_url.filter(|url| !url.is_empty()))
}

pub static AWS_CONFIG_AND_URL: OnceCell<(SdkConfig, Option<String>)> = OnceCell::const_new();
pub async fn get_or_init_aws_config_and_url(
    connection: &AwsConnection,
) -> &'static (SdkConfig, Option<String>) {
    AWS_CONFIG_AND_URL
        .get_or_init(|| async {
            // You can select a profile by setting the `AWS_PROFILE` environment variable.
            let mut loader = aws_config::defaults(BehaviorVersion::latest())
                .retry_config(RetryConfig::standard().with_max_attempts(MAX_ATTEMPTS));

            if let Some(region) = &connection.region {
                loader = loader.region(Region::new(region.clone()));
            }
            if let Some(profile) = &connection.profile {
                loader = loader.profile_name(profile);
            }
            if let (Some(access_key), Some(secret_key)) =
                (&connection.access_key, &connection.secret_key)
            {
                loader = loader.credentials_provider(Credentials::new(
                    access_key,
                    secret_key,
                    connection.session_token.clone(),
                    None,
                    "snsqs-module-params",
                ));
            }

            let endpoint_url =
                resolve_endpoint_url(connection, std::env::var(AWS_ENDPOINT_URL).ok());
            debug!(
                region = ?connection.region,
                profile = ?connection.profile,
                endpoint_url = ?endpoint_url,
                "Loading AWS configuration"
            );

            (loader.load().await, endpoint_url)
        })
        .await
}

pub static SNS_CLIENT: OnceCell<SnsClient> = OnceCell::const_new();
pub async fn get_or_init_sns(connection: &AwsConnection) -> &'static SnsClient {
    SNS_CLIENT
        .get_or_init(|| async {
            let (base_config, base_url) = get_or_init_aws_config_and_url(connection).await;

            let client = if let Some(endpoint_url) = base_url {
                aws_sdk_sns::Client::from_conf(
                    aws_sdk_sns::config::Builder::from(base_config)
                        .endpoint_url(endpoint_url)
                        .build(),
                )
            } else {
                aws_sdk_sns::Client::new(base_config)
            };
            SnsClient::new(client)
        })
        .await
}

pub static SQS_CLIENT: OnceCell<SqsClient> = OnceCell::const_new();
pub async fn get_or_init_sqs(connection: &AwsConnection) -> &'static SqsClient {
    SQS_CLIENT
        .get_or_init(|| async {
            let (base_config, base_url) = get_or_init_aws_config_and_url(connection).await;

            let client = if let Some(endpoint_url) = base_url {
                aws_sdk_sqs::Client::from_conf(
                    aws_sdk_sqs::config::Builder::from(base_config)
                        .endpoint_url(endpoint_url)
                        .build(),
                )
            } else {
                aws_sdk_sqs::Client::new(base_config)
            };
            SqsClient::new(client)
        })
        .await
}
