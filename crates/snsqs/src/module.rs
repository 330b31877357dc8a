use std::future::Future;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{to_value, Map, Value};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use crate::{
    args::{AwsConnection, ModuleArgs, ModuleContext},
    errors::ModuleError,
};

/// The single JSON object a module prints on stdout.
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct ModuleResult {
    pub changed: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(flatten)]
    pub facts: Map<String, Value>,
}

impl ModuleResult {
    pub fn new(changed: bool) -> Self {
        ModuleResult {
            changed,
            ..Default::default()
        }
    }

    /// A failed result; AWS errors also carry their code under `error`.
    pub fn failure(err: &ModuleError) -> Self {
        ModuleResult {
            failed: true,
            msg: Some(err.to_string()),
            facts: err
                .details()
                .and_then(|details| details.as_object().cloned())
                .unwrap_or_default(),
            ..Default::default()
        }
    }

    pub fn with_fact(mut self, key: &str, value: impl Serialize) -> Self {
        self.facts
            .insert(key.to_owned(), to_value(value).unwrap_or(Value::Null));
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn to_json(&self) -> Value {
        to_value(self).unwrap_or(Value::Null)
    }

    /// Print the result on stdout and end the process; status 1 when the module failed.
    pub fn exit(self) -> ! {
        println!("{}", self.to_json());
        std::process::exit(if self.failed { 1 } else { 0 })
    }
}

/// Log level for the tool's `-v` count.
pub fn default_log_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Route tracing output to stderr; stdout belongs to the JSON result.
/// `RUST_LOG` wins over the verbosity the tool asked for.
pub fn init_tracing(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(verbosity)));

    // A subscriber may already be installed when several modules run in one test binary.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Take the raw argument document, split it into tool settings, connection and typed
/// parameters, run the module handler, and turn every failure into a failed result.
/// # Example
///
/// ```
/// use serde::Deserialize;
/// use serde_json::json;
/// use snsqs::{module_bootstrap, AwsConnection, ModuleContext, ModuleError, ModuleResult};
///
/// #[derive(Deserialize)]
/// struct Params {
///     name: String,
/// }
///
/// async fn handler(
///     ctx: ModuleContext,
///     _connection: AwsConnection,
///     params: Params,
/// ) -> Result<ModuleResult, ModuleError> {
///     Ok(ModuleResult::new(!ctx.check_mode).with_fact("name", params.name))
/// }
///
/// let result = tokio_test::block_on(module_bootstrap(json!({"name": "jobs"}), handler));
/// assert_eq!(result.to_json(), json!({"changed": true, "name": "jobs"}));
/// ```
pub async fn module_bootstrap<P, Fut>(
    raw_args: Value,
    handler: fn(ModuleContext, AwsConnection, P) -> Fut,
) -> ModuleResult
where
    P: DeserializeOwned,
    Fut: Future<Output = Result<ModuleResult, ModuleError>>,
{
    let args = match ModuleArgs::try_from(raw_args) {
        Ok(args) => args,
        Err(e) => return ModuleResult::failure(&e),
    };

    init_tracing(args.context.verbosity);
    debug!(
        check_mode = args.context.check_mode,
        module = ?args.context.module_name,
        "Running module"
    );

    let params: P = match args.parse_params() {
        Ok(params) => params,
        Err(e) => return ModuleResult::failure(&e),
    };

    match handler(args.context, args.connection, params).await {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "Module failed");
            ModuleResult::failure(&e)
        }
    }
}
