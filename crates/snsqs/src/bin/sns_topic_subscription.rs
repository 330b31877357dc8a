//! Manage one subscription of an SNS topic.
//!
//! ```yaml
//! - name: Subscribe a queue to the alarms topic
//!   sns_topic_subscription:
//!     state: present
//!     topic:
//!       name: alarms
//!     subscription:
//!       protocol: sqs
//!       endpoint: arn:aws:sqs:us-west-2:123456789012:alarm-queue
//!       attributes:
//!         RawMessageDelivery: true
//! ```
use std::path::PathBuf;

use clap::Parser;
use snsqs::{module_bootstrap, read_module_args, subscription, ModuleResult};

#[derive(Parser, Debug)]
#[command(about = "Create, update or remove a subscription of an SNS topic")]
struct Cli {
    /// JSON file holding the module arguments; read from stdin when omitted.
    args_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let raw_args = match read_module_args(cli.args_file.as_deref()) {
        Ok(raw_args) => raw_args,
        Err(e) => ModuleResult::failure(&e).exit(),
    };

    module_bootstrap(raw_args, subscription::execute)
        .await
        .exit()
}
