use std::{io::Read, path::Path};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{from_value, Map, Value};

use crate::errors::ModuleError;

const INTERNAL_PREFIX: &str = "_ansible_";

/// Read the module argument document, from `path` when given, otherwise from stdin.
pub fn read_module_args(path: Option<&Path>) -> Result<Value, ModuleError> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path).map_err(|source| ModuleError::ArgsFile {
            path: path.display().to_string(),
            source,
        })?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|source| ModuleError::ArgsFile {
                    path: "<stdin>".to_string(),
                    source,
                })?;
            buffer
        }
    };

    let document: Value = serde_json::from_str(&raw)?;
    // Some tools wrap the parameters as {"ANSIBLE_MODULE_ARGS": {...}}.
    Ok(match document {
        Value::Object(mut map) if map.contains_key("ANSIBLE_MODULE_ARGS") => map
            .remove("ANSIBLE_MODULE_ARGS")
            .unwrap_or(Value::Object(Map::new())),
        other => other,
    })
}

/// The settings the calling tool passes alongside the user's parameters.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ModuleContext {
    #[serde(rename = "_ansible_check_mode", default)]
    pub check_mode: bool,
    #[serde(rename = "_ansible_diff", default)]
    pub diff: bool,
    #[serde(rename = "_ansible_verbosity", default)]
    pub verbosity: u8,
    #[serde(rename = "_ansible_debug", default)]
    pub debug: bool,
    #[serde(rename = "_ansible_module_name", skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,
}

/// How to reach AWS. Accepted by every module next to its own parameters.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AwsConnection {
    #[serde(default, alias = "aws_region", alias = "ec2_region")]
    pub region: Option<String>,
    #[serde(default, alias = "aws_profile")]
    pub profile: Option<String>,
    #[serde(default, alias = "aws_endpoint_url", alias = "ec2_url")]
    pub endpoint_url: Option<String>,
    #[serde(default, alias = "aws_access_key_id", alias = "aws_access_key")]
    pub access_key: Option<String>,
    #[serde(default, alias = "aws_secret_access_key", alias = "aws_secret_key")]
    pub secret_key: Option<String>,
    #[serde(default, alias = "aws_session_token", alias = "security_token")]
    pub session_token: Option<String>,
}

const CONNECTION_KEYS: &[&str] = &[
    "region",
    "aws_region",
    "ec2_region",
    "profile",
    "aws_profile",
    "endpoint_url",
    "aws_endpoint_url",
    "ec2_url",
    "access_key",
    "aws_access_key_id",
    "aws_access_key",
    "secret_key",
    "aws_secret_access_key",
    "aws_secret_key",
    "session_token",
    "aws_session_token",
    "security_token",
];

/// The argument document split three ways: tool settings, AWS connection, module parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleArgs {
    pub context: ModuleContext,
    pub connection: AwsConnection,
    pub params: Map<String, Value>,
}

impl ModuleArgs {
    /// Deserialize the module's own parameters. Unknown keys, missing required keys and
    /// out-of-range choices all surface as [`ModuleError::InvalidArguments`].
    pub fn parse_params<P: DeserializeOwned>(&self) -> Result<P, ModuleError> {
        from_value(Value::Object(self.params.clone()))
            .map_err(|e| ModuleError::InvalidArguments(format!("invalid module arguments: {}", e)))
    }
}

impl TryFrom<Value> for ModuleArgs {
    type Error = ModuleError;

    fn try_from(args: Value) -> Result<Self, Self::Error> {
        let map = match args {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ModuleError::InvalidArguments(format!(
                    "module arguments must be a JSON object, got: {}",
                    other
                )))
            }
        };

        let mut internal = Map::new();
        let mut connection = Map::new();
        let mut params = Map::new();
        for (key, value) in map {
            if key.starts_with(INTERNAL_PREFIX) {
                internal.insert(key, value);
            } else if CONNECTION_KEYS.contains(&key.as_str()) {
                if !value.is_null() {
                    connection.insert(key, value);
                }
            } else {
                params.insert(key, value);
            }
        }

        // Unrecognised internal keys (`_ansible_tmpdir`, `_ansible_version`, ...) are dropped.
        let context: ModuleContext = from_value(Value::Object(internal)).map_err(|e| {
            ModuleError::InvalidArguments(format!("invalid internal module arguments: {}", e))
        })?;
        let connection: AwsConnection = from_value(Value::Object(connection)).map_err(|e| {
            ModuleError::InvalidArguments(format!("invalid AWS connection arguments: {}", e))
        })?;
        if connection.access_key.is_some() != connection.secret_key.is_some() {
            return Err(ModuleError::InvalidArguments(
                "access_key and secret_key must be given together".to_string(),
            ));
        }

        Ok(ModuleArgs {
            context,
            connection,
            params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_ne};
    use serde_json::json;
    use std::io::Write;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(deny_unknown_fields)]
    struct Params {
        name: String,
        #[serde(default)]
        fifo: bool,
    }

    #[test]
    fn test_split_internal_connection_and_params() {
        let args = ModuleArgs::try_from(json!({
            "name": "jobs",
            "aws_region": "eu-west-1",
            "endpoint_url": "http://localhost:4566",
            "_ansible_check_mode": true,
            "_ansible_verbosity": 2,
            "_ansible_tmpdir": "/tmp/ansible-tmp"
        }))
        .unwrap();

        assert_eq!(
            args.context,
            ModuleContext {
                check_mode: true,
                verbosity: 2,
                ..Default::default()
            }
        );
        assert_eq!(args.connection.region.as_deref(), Some("eu-west-1"));
        assert_eq!(
            args.connection.endpoint_url.as_deref(),
            Some("http://localhost:4566")
        );
        assert_eq!(
            args.parse_params::<Params>().unwrap(),
            Params {
                name: "jobs".to_string(),
                fifo: false
            }
        );
    }

    #[test]
    fn test_null_connection_values_are_ignored() {
        let args = ModuleArgs::try_from(json!({"name": "jobs", "region": null})).unwrap();
        assert_eq!(args.connection, AwsConnection::default());
    }

    #[test]
    fn test_unknown_parameter_rejected() {
        let args = ModuleArgs::try_from(json!({"name": "jobs", "colour": "blue"})).unwrap();
        let err = args.parse_params::<Params>().unwrap_err();
        assert!(err.to_string().contains("unknown field `colour`"));
    }

    #[test]
    fn test_missing_required_parameter_rejected() {
        let args = ModuleArgs::try_from(json!({"fifo": true})).unwrap();
        let err = args.parse_params::<Params>().unwrap_err();
        assert!(err.to_string().contains("missing field `name`"));
    }

    #[test]
    fn test_non_object_arguments_rejected() {
        assert!(matches!(
            ModuleArgs::try_from(json!(["name", "jobs"])),
            Err(ModuleError::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_every_connection_key_sets_a_connection_field() {
        for key in CONNECTION_KEYS {
            let connection: AwsConnection = from_value(json!({ *key: "value" })).unwrap();
            assert_ne!(connection, AwsConnection::default(), "{} is not a field or alias", key);
        }
    }

    #[test]
    fn test_access_key_without_secret_key_rejected() {
        let err = ModuleArgs::try_from(json!({"name": "jobs", "aws_access_key_id": "AKIA"}))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "access_key and secret_key must be given together"
        );

        assert!(matches!(
            ModuleArgs::try_from(json!({"aws_secret_access_key": "secret"})),
            Err(ModuleError::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_static_credentials_accepted_in_pairs() {
        let args = ModuleArgs::try_from(json!({
            "aws_access_key_id": "AKIA",
            "aws_secret_access_key": "secret",
            "security_token": "token"
        }))
        .unwrap();

        assert_eq!(
            args.connection,
            AwsConnection {
                access_key: Some("AKIA".to_string()),
                secret_key: Some("secret".to_string()),
                session_token: Some("token".to_string()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_read_module_args_unwraps_envelope() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"ANSIBLE_MODULE_ARGS": {{"name": "jobs", "_ansible_check_mode": false}}}}"#
        )
        .unwrap();

        let args = read_module_args(Some(file.path())).unwrap();
        assert_eq!(args, json!({"name": "jobs", "_ansible_check_mode": false}));
    }

    #[test]
    fn test_read_module_args_missing_file() {
        let err = read_module_args(Some(Path::new("/nonexistent/snsqs/args.json"))).unwrap_err();
        assert!(matches!(err, ModuleError::ArgsFile { .. }));
    }
}
