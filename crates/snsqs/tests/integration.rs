//! Run both modules against localstack through the real SDK clients.
//! Needs a Docker daemon, so every test here is ignored by default:
//! `cargo test --test integration -- --ignored`

mod localstack_setup;

use localstack_setup::{wait_for_localstack_container, LocalstackMessaging};
use serde_json::json;
use snsqs::{
    api::{SnsClient, SqsClient},
    queue_info::{queue_info, QueueInfoParams, QueueType},
    subscription::{reconcile, SubscriptionParams},
};
use testcontainers::clients::Cli;

async fn sdk_config(endpoint_url: &str) -> aws_config::SdkConfig {
    aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_types::region::Region::new("us-east-1"))
        .credentials_provider(aws_credential_types::Credentials::new(
            "test", "test", None, None, "localstack",
        ))
        .endpoint_url(endpoint_url)
        .load()
        .await
}

#[tokio::test]
#[ignore]
async fn test_subscription_lifecycle_against_localstack() {
    let docker = Cli::default();
    let container = docker.run(LocalstackMessaging::default());
    let endpoint_url = format!("http://localhost:{}", container.get_host_port_ipv4(4566));
    wait_for_localstack_container(&endpoint_url)
        .await
        .expect("unable to reach container");

    let config = sdk_config(&endpoint_url).await;
    let sns_sdk = aws_sdk_sns::Client::new(&config);
    let sqs_sdk = aws_sdk_sqs::Client::new(&config);
    sns_sdk.create_topic().name("alarms").send().await.unwrap();
    sqs_sdk
        .create_queue()
        .queue_name("alarm-queue")
        .send()
        .await
        .unwrap();

    let sns = SnsClient::new(sns_sdk);
    let sqs = SqsClient::new(sqs_sdk);

    let queue = queue_info(
        &sqs,
        QueueInfoParams {
            name: Some("alarm-queue".to_string()),
            queue_type: QueueType::Standard,
        },
    )
    .await
    .unwrap();
    let queue_arn = queue.facts["sqs_queue_arn"].as_str().unwrap().to_string();

    let desired = |state: &str| -> SubscriptionParams {
        serde_json::from_value(json!({
            "state": state,
            "topic": {"name": "alarms"},
            "subscription": {
                "protocol": "sqs",
                "endpoint": queue_arn,
                "attributes": {"RawMessageDelivery": true}
            }
        }))
        .unwrap()
    };

    let created = reconcile(&sns, desired("present"), false).await.unwrap();
    assert!(created.changed);

    let unchanged = reconcile(&sns, desired("present"), false).await.unwrap();
    assert!(!unchanged.changed);

    let removed = reconcile(&sns, desired("absent"), false).await.unwrap();
    assert!(removed.changed);

    let gone = reconcile(&sns, desired("absent"), false).await.unwrap();
    assert!(!gone.changed);
}
