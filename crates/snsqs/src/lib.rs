//! AWS messaging modules for configuration management, in Rust!
//!
//! Provides two automation modules that follow the binary-module protocol of
//! configuration-management tools: the tool writes the module arguments as a JSON document,
//! runs the module binary, and reads a single JSON result object back from stdout.
//!
//! - `sns_topic_subscription` creates, updates or removes a subscription on an SNS topic.
//! - `sqs_queue_info` reports the attributes of an SQS queue, or lists every queue.
//!
//! Both modules honour check mode: no mutating call is made, but `changed` is reported
//! as if it had been.
pub mod api;
pub mod args;
pub mod clients;
pub mod errors;
pub mod module;
pub mod queue_info;
pub mod sns;
pub mod sqs;
pub mod subscription;
pub mod utils;

pub use api::{ApiError, SnsApi, SqsApi, Subscription};
pub use args::{read_module_args, AwsConnection, ModuleArgs, ModuleContext};
pub use errors::{ModuleError, ResultExt};
pub use module::{default_log_level, init_tracing, module_bootstrap, ModuleResult};
pub use sns::{canonicalize_endpoint, list_topic_subscriptions, subscription_id, topic_arn_lookup};
pub use sqs::{describe_queue, get_queue_arn, get_queue_name, get_queue_url, list_queues, QueueArn};
pub use utils::camel_to_snake;
