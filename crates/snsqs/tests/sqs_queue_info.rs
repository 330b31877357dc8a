
use fakes::{FakeSqs, ACCOUNT_ID};
use pretty_assertions::assert_eq;
use serde_json::json;
use snsqs::queue_info::{queue_info, QueueInfoParams, QueueType};

const OTHER_ACCOUNT_ID: &str = "210987654321";

fn sqs() -> FakeSqs {
    FakeSqs::default()
        .with_queue(
            "jobs",
            ACCOUNT_ID,
            &[
                ("VisibilityTimeout", "30"),
                ("MessageRetentionPeriod", "345600"),
                ("SqsManagedSseEnabled", "true"),
                (
                    "RedrivePolicy",
                    r#"{"deadLetterTargetArn":"arn:aws:sqs:us-east-1:123456789012:jobs-dlq","maxReceiveCount":5}"#,
                ),
            ],
        )
        .with_queue(
            "jobs.fifo",
            ACCOUNT_ID,
            &[("FifoQueue", "true"), ("ContentBasedDeduplication", "false")],
        )
        .with_queue("shared", OTHER_ACCOUNT_ID, &[("DelaySeconds", "0")])
}

fn named(name: &str, queue_type: QueueType) -> QueueInfoParams {
    QueueInfoParams {
        name: Some(name.to_string()),
        queue_type,
    }
}

#[tokio::test]
async fn test_describes_queue_by_name() {
    let result = queue_info(&sqs(), named("jobs", QueueType::Standard))
        .await
        .unwrap();

    assert_eq!(
        result.to_json(),
        json!({
            "changed": false,
            "sqs_queue_arn": "arn:aws:sqs:us-east-1:123456789012:jobs",
            "sqs_queue_url": "https://sqs.us-east-1.amazonaws.com/123456789012/jobs",
            "sqs_queue_attributes": {
                "queue_arn": "arn:aws:sqs:us-east-1:123456789012:jobs",
                "visibility_timeout": 30,
                "message_retention_period": 345600,
                "sqs_managed_sse_enabled": true,
                "policy": null,
                "redrive_policy": {
                    "deadLetterTargetArn": "arn:aws:sqs:us-east-1:123456789012:jobs-dlq",
                    "maxReceiveCount": 5
                }
            }
        })
    );
}

#[tokio::test]
async fn test_fifo_type_appends_suffix() {
    let result = queue_info(&sqs(), named("jobs", QueueType::Fifo))
        .await
        .unwrap();

    assert_eq!(
        result.facts["sqs_queue_arn"],
        "arn:aws:sqs:us-east-1:123456789012:jobs.fifo"
    );
    assert_eq!(result.facts["sqs_queue_attributes"]["fifo_queue"], true);
    assert_eq!(
        result.facts["sqs_queue_attributes"]["content_based_deduplication"],
        false
    );
}

#[tokio::test]
async fn test_describes_queue_of_other_account_by_arn() {
    let arn = format!("arn:aws:sqs:us-east-1:{}:shared", OTHER_ACCOUNT_ID);

    let result = queue_info(&sqs(), named(&arn, QueueType::Standard))
        .await
        .unwrap();

    assert_eq!(result.facts["sqs_queue_arn"], arn.as_str());
    assert_eq!(
        result.facts["sqs_queue_url"],
        "https://sqs.us-east-1.amazonaws.com/210987654321/shared"
    );
    assert_eq!(result.facts["sqs_queue_attributes"]["delay_seconds"], 0);
}

#[tokio::test]
async fn test_missing_queue_lists_all_queues() {
    let result = queue_info(&sqs(), named("nope", QueueType::Standard))
        .await
        .unwrap();

    assert!(!result.changed);
    assert_eq!(
        result.warnings,
        vec!["Queue nope does not exist, listing all queues instead".to_string()]
    );
    assert_eq!(result.facts["sqs_queues"].as_array().unwrap().len(), 3);
    assert!(result.facts.get("sqs_queue_arn").is_none());
}

#[tokio::test]
async fn test_without_name_lists_all_queues() {
    let result = queue_info(&sqs(), QueueInfoParams::default()).await.unwrap();

    assert_eq!(
        result.to_json(),
        json!({
            "changed": false,
            "sqs_queues": [
                "https://sqs.us-east-1.amazonaws.com/123456789012/jobs",
                "https://sqs.us-east-1.amazonaws.com/123456789012/jobs.fifo",
                "https://sqs.us-east-1.amazonaws.com/210987654321/shared"
            ]
        })
    );
}

#[tokio::test]
async fn test_malformed_arn_is_rejected() {
    let err = queue_info(&sqs(), named("arn:aws:sqs:us-east-1", QueueType::Standard))
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "'arn:aws:sqs:us-east-1' is not a valid SQS queue ARN"
    );
}
