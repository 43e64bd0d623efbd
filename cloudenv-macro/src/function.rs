//! Serverless function property access
//!
//! Properties are kept as raw JSON so that everything the macro does not touch (intrinsic
//! functions, unknown keys, key order) passes through untouched. These helpers give typed
//! access to the handful of fields the transform reads or rewrites.

use cloudenv_core::SecretService;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::TransformError;

/// Resource type rewritten by the macro
pub const SERVERLESS_FUNCTION: &str = "AWS::Serverless::Function";

/// Architecture assumed when `Architectures` is absent
pub const DEFAULT_ARCHITECTURE: &str = "x86_64";

/// Custom runtimes that need the bootstrap layer in addition to the wrapper
const BOOTSTRAP_RUNTIMES: &[&str] = &["provided", "provided.al2"];

pub fn is_serverless_function(resource: &Value) -> bool {
    resource.get("Type").and_then(Value::as_str) == Some(SERVERLESS_FUNCTION)
}

pub fn needs_bootstrap(runtime: &str) -> bool {
    BOOTSTRAP_RUNTIMES.contains(&runtime)
}

/// Lambda packaging
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageType {
    Zip,
    Image,
    Other(String),
}

impl PackageType {
    /// Anything other than the `Zip` and `Image` strings, intrinsics included, is `Other`
    pub fn from_properties(props: &Map<String, Value>) -> Self {
        match props.get("PackageType") {
            None | Some(Value::Null) => Self::Zip,
            Some(Value::String(s)) => match s.as_str() {
                "Zip" => Self::Zip,
                "Image" => Self::Image,
                other => Self::Other(other.to_string()),
            },
            Some(other) => Self::Other(other.to_string()),
        }
    }
}

/// First entry of `Architectures`, which decides the wrapper layer variant
///
/// A missing or empty list yields the default architecture. `None` means the value is
/// not a literal (e.g. `{"Ref": "Arch"}`) and cannot be arm64 as far as the macro knows.
pub fn first_architecture(props: &Map<String, Value>) -> Option<&str> {
    match props.get("Architectures") {
        None | Some(Value::Null) => Some(DEFAULT_ARCHITECTURE),
        Some(Value::Array(items)) => match items.first() {
            None => Some(DEFAULT_ARCHITECTURE),
            Some(Value::String(arch)) => Some(arch.as_str()),
            Some(_) => None,
        },
        Some(_) => None,
    }
}

/// `Runtime` of a Zip function
///
/// Absent or null is an error; a non-string value such as an intrinsic yields `None`.
pub fn runtime<'a>(
    resource: &str,
    props: &'a Map<String, Value>,
) -> Result<Option<&'a str>, TransformError> {
    match props.get("Runtime") {
        Some(Value::String(runtime)) => Ok(Some(runtime.as_str())),
        None | Some(Value::Null) => Err(TransformError::MissingRuntime {
            resource: resource.to_string(),
        }),
        Some(_) => Ok(None),
    }
}

/// A declared secret after classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Secret {
    pub name: String,
    pub arn: String,
    pub service: SecretService,
}

impl Secret {
    /// Environment variable value the wrapper resolves at startup
    pub fn reference(&self) -> String {
        self.service.reference(&self.arn)
    }
}

/// Secrets declared under `Environment.Secrets`, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SecretDeclaration {
    pub secrets: Vec<Secret>,
}

impl SecretDeclaration {
    /// Classify every entry; the first unusable one fails the whole declaration
    pub fn classify(resource: &str, raw: &Map<String, Value>) -> Result<Self, TransformError> {
        let secrets = raw
            .iter()
            .map(|(name, arn)| {
                let arn = arn.as_str().ok_or_else(|| TransformError::SecretNotString {
                    resource: resource.to_string(),
                    secret: name.clone(),
                })?;
                let service = SecretService::from_arn(arn).map_err(|source| {
                    TransformError::InvalidSecretArn {
                        resource: resource.to_string(),
                        secret: name.clone(),
                        source,
                    }
                })?;
                Ok(Secret {
                    name: name.clone(),
                    arn: arn.to_string(),
                    service,
                })
            })
            .collect::<Result<Vec<_>, TransformError>>()?;

        Ok(Self { secrets })
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Secret> {
        self.secrets.iter()
    }
}

/// Mapping stored under `key`, created empty when absent or null
pub(crate) fn object_entry<'a>(
    resource: &str,
    parent: &'a mut Map<String, Value>,
    key: &str,
    field: &'static str,
) -> Result<&'a mut Map<String, Value>, TransformError> {
    let value = parent.entry(key).or_insert(Value::Null);
    if value.is_null() {
        *value = Value::Object(Map::new());
    }
    value
        .as_object_mut()
        .ok_or_else(|| TransformError::invalid_field(resource, field, "a mapping"))
}

/// List stored under `key`, created empty when absent or null
pub(crate) fn array_entry<'a>(
    resource: &str,
    parent: &'a mut Map<String, Value>,
    key: &str,
    field: &'static str,
) -> Result<&'a mut Vec<Value>, TransformError> {
    let value = parent.entry(key).or_insert(Value::Null);
    if value.is_null() {
        *value = Value::Array(Vec::new());
    }
    value
        .as_array_mut()
        .ok_or_else(|| TransformError::invalid_field(resource, field, "a list"))
}
