//! Report the attributes of an SQS queue, or list every queue.
//!
//! ```yaml
//! - name: Describe the jobs queue
//!   sqs_queue_info:
//!     name: jobs
//!     type: fifo
//!   register: jobs_queue
//! ```
use std::path::PathBuf;

use clap::Parser;
use snsqs::{module_bootstrap, queue_info, read_module_args, ModuleResult};

#[derive(Parser, Debug)]
#[command(about = "Describe an SQS queue or list all queues")]
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

    module_bootstrap(raw_args, queue_info::execute).await.exit()
}
