//! Fragment transformer
//!
//! Every resource is copied into a new fragment; serverless functions are patched on the
//! way. The input fragment is never modified, so a failure leaves nothing half-rewritten.
//!
//! The transform is not idempotent: feeding its output back in appends the wrapper layer a
//! second time. CloudFormation always hands the macro the original template, so this only
//! matters when chaining the macro manually.

use cloudenv_core::EXEC_WRAPPER_PATH;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::{EntryPointMode, LayerConfig};
use crate::error::TransformError;
use crate::function::{
    array_entry, first_architecture, is_serverless_function, needs_bootstrap, object_entry,
    runtime, PackageType, SecretDeclaration, DEFAULT_ARCHITECTURE,
};
use crate::policy::ReadAccess;

/// Variable telling the Lambda runtime to start the function through the wrapper
pub const EXEC_WRAPPER_VAR: &str = "AWS_LAMBDA_EXEC_WRAPPER";

/// Rewrites serverless functions declaring secrets
#[derive(Debug, Clone)]
pub struct Transformer {
    layers: LayerConfig,
    entrypoint_mode: EntryPointMode,
}

impl Transformer {
    pub fn new(layers: LayerConfig) -> Self {
        Self {
            layers,
            entrypoint_mode: EntryPointMode::default(),
        }
    }

    pub fn with_entrypoint_mode(mut self, mode: EntryPointMode) -> Self {
        self.entrypoint_mode = mode;
        self
    }

    pub fn layers(&self) -> &LayerConfig {
        &self.layers
    }

    /// Return a rewritten copy of `fragment`
    pub fn transform_fragment(&self, fragment: &Value) -> Result<Value, TransformError> {
        let sections = fragment.as_object().ok_or(TransformError::MissingResources)?;
        if !sections.get("Resources").is_some_and(Value::is_object) {
            return Err(TransformError::MissingResources);
        }

        sections
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::Object(resources) if key == "Resources" => {
                        Value::Object(self.transform_resources(resources)?)
                    }
                    other => other.clone(),
                };
                Ok((key.clone(), value))
            })
            .collect::<Result<Map<_, _>, TransformError>>()
            .map(Value::Object)
    }

    fn transform_resources(
        &self,
        resources: &Map<String, Value>,
    ) -> Result<Map<String, Value>, TransformError> {
        let mut rewritten = Map::with_capacity(resources.len());
        for (name, resource) in resources {
            let resource = if is_serverless_function(resource) {
                self.transform_function(name, resource)?
            } else {
                resource.clone()
            };
            rewritten.insert(name.clone(), resource);
        }
        Ok(rewritten)
    }

    /// Return a rewritten copy of one `AWS::Serverless::Function` resource
    pub fn transform_function(&self, name: &str, resource: &Value) -> Result<Value, TransformError> {
        let mut resource = resource.clone();
        let definition = resource
            .as_object_mut()
            .ok_or_else(|| TransformError::invalid_field(name, "resource", "a mapping"))?;
        let props = object_entry(name, definition, "Properties", "Properties")?;

        self.patch_properties(name, props)?;
        Ok(resource)
    }

    fn patch_properties(&self, name: &str, props: &mut Map<String, Value>) -> Result<(), TransformError> {
        let environment = object_entry(name, props, "Environment", "Environment")?;
        let raw_secrets = match environment.remove("Secrets") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(secrets)) => secrets,
            Some(_) => {
                return Err(TransformError::invalid_field(
                    name,
                    "Environment.Secrets",
                    "a mapping",
                ))
            }
        };
        object_entry(name, environment, "Variables", "Environment.Variables")?;

        let declared = Value::Object(raw_secrets.clone());
        info!(resource = %name, secrets = %declared, "Extracted secret declaration");

        let secrets = SecretDeclaration::classify(name, &raw_secrets)?;
        if secrets.is_empty() {
            return Ok(());
        }

        match PackageType::from_properties(props) {
            PackageType::Zip => self.wire_zip(name, props)?,
            PackageType::Image => self.wire_image(name, props)?,
            PackageType::Other(package_type) => {
                debug!(resource = %name, package_type = %package_type, "Unknown package type, wrapper not wired");
            }
        }

        let mut access = ReadAccess::new();
        let env_vars = variables(name, props)?;
        for secret in secrets.iter() {
            access.grant(secret.service, secret.arn.clone());
            env_vars.insert(secret.name.clone(), Value::String(secret.reference()));
        }

        policies(name, props)?.extend(access.into_policies());

        debug!(resource = %name, secrets = secrets.len(), "Function rewritten");
        Ok(())
    }

    fn wire_zip(&self, name: &str, props: &mut Map<String, Value>) -> Result<(), TransformError> {
        let architecture = first_architecture(props).unwrap_or(DEFAULT_ARCHITECTURE);
        let wrapper = self.layers.wrapper_for(architecture).to_string();
        let bootstrap = runtime(name, props)?.is_some_and(needs_bootstrap);

        let layers = array_entry(name, props, "Layers", "Layers")?;
        layers.push(Value::String(wrapper));
        if bootstrap {
            layers.push(Value::String(self.layers.bootstrap().to_string()));
        }

        variables(name, props)?.insert(
            EXEC_WRAPPER_VAR.to_string(),
            Value::String(EXEC_WRAPPER_PATH.to_string()),
        );

        debug!(resource = %name, bootstrap, "Wired wrapper layer");
        Ok(())
    }

    fn wire_image(&self, name: &str, props: &mut Map<String, Value>) -> Result<(), TransformError> {
        let image_config = object_entry(name, props, "ImageConfig", "ImageConfig")?;
        let original = match image_config.remove("EntryPoint") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(entries)) => entries,
            Some(_) => {
                return Err(TransformError::invalid_field(
                    name,
                    "ImageConfig.EntryPoint",
                    "a list",
                ))
            }
        };

        let entry_point = match self.entrypoint_mode {
            EntryPointMode::Prepend => {
                let mut entries = Vec::with_capacity(original.len() + 1);
                entries.push(Value::String(EXEC_WRAPPER_PATH.to_string()));
                entries.extend(original);
                Value::Array(entries)
            }
            EntryPointMode::Legacy => Value::Null,
        };
        image_config.insert("EntryPoint".to_string(), entry_point);

        debug!(resource = %name, mode = ?self.entrypoint_mode, "Wired image entrypoint");
        Ok(())
    }
}

fn variables<'a>(
    name: &str,
    props: &'a mut Map<String, Value>,
) -> Result<&'a mut Map<String, Value>, TransformError> {
    let environment = object_entry(name, props, "Environment", "Environment")?;
    object_entry(name, environment, "Variables", "Environment.Variables")
}

/// `Policies` as a list; SAM also accepts a single managed policy name or document
fn policies<'a>(
    name: &str,
    props: &'a mut Map<String, Value>,
) -> Result<&'a mut Vec<Value>, TransformError> {
    if let Some(existing) = props.get_mut("Policies") {
        if existing.is_string() || existing.is_object() {
            let single = existing.take();
            *existing = Value::Array(vec![single]);
        }
    }
    array_entry(name, props, "Policies", "Policies")
}
