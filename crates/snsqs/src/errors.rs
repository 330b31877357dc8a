use serde_json::{json, Value};
use thiserror::Error;

use crate::api::ApiError;

#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("unable to read module arguments from {path}: {source}")]
    ArgsFile {
        path: String,
        source: std::io::Error,
    },
    #[error("module arguments are not valid JSON: {0}")]
    ArgsJson(#[from] serde_json::Error),
    #[error("{0}")]
    InvalidArguments(String),
    #[error("{msg}: {source}")]
    Aws { msg: String, source: ApiError },
    #[error("{0}")]
    Failed(String),
}

impl ModuleError {
    /// Extra fields merged into a failed result, next to `msg`.
    pub fn details(&self) -> Option<Value> {
        match self {
            ModuleError::Aws { source, .. } => Some(json!({
                "error": {
                    "code": source.code(),
                    "message": source.to_string(),
                }
            })),
            _ => None,
        }
    }
}

/// Attach a failure message to an SDK call, the way a module reports which
/// operation it was attempting when AWS said no.
pub trait ResultExt<T> {
    fn aws_context<F, S>(self, msg: F) -> Result<T, ModuleError>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for Result<T, ApiError> {
    fn aws_context<F, S>(self, msg: F) -> Result<T, ModuleError>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| ModuleError::Aws {
            msg: msg().into(),
            source,
        })
    }
}
