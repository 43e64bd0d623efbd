//! Parameter and secret sources

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use cloudenv_core::{ArnError, SecretService};
use dashmap::DashMap;

use crate::env::parameter_name;
use crate::error::SourceError;

/// `GetParameters` accepts at most this many names per call
pub const MAX_PARAMETERS_PER_CALL: usize = 10;

/// A resolved SSM parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub arn: String,
    pub value: String,
}

/// Result of one `GetParameters` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetParametersOutput {
    pub parameters: Vec<Parameter>,
    /// Requested names that do not exist
    pub invalid_parameters: Vec<String>,
}

/// Value of a Secrets Manager secret
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretValue {
    pub secret_string: Option<String>,
    pub secret_binary: Option<Vec<u8>>,
}

impl SecretValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            secret_string: Some(value.into()),
            secret_binary: None,
        }
    }

    pub fn binary(value: impl Into<Vec<u8>>) -> Self {
        Self {
            secret_string: None,
            secret_binary: Some(value.into()),
        }
    }
}

/// Backend that parameters and secrets are read from
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Fetch parameters by name, decrypted
    async fn get_parameters(&self, names: &[String]) -> Result<GetParametersOutput, SourceError>;

    /// Fetch the current value of a secret by ARN
    async fn get_secret_value(&self, secret_id: &str) -> Result<SecretValue, SourceError>;
}

/// In-memory source
#[derive(Debug, Default)]
pub struct InMemorySource {
    /// Parameters indexed by name
    parameters: DashMap<String, Parameter>,
    /// Secrets indexed by ARN
    secrets: DashMap<String, SecretValue>,
    parameter_calls: AtomicUsize,
    secret_calls: AtomicUsize,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a source from `arn -> value` pairs, routing each ARN by its service
    pub fn from_values<I, K, V>(values: I) -> Result<Self, ArnError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let source = Self::new();
        for (arn, value) in values {
            let arn = arn.as_ref();
            match SecretService::from_arn(arn)? {
                SecretService::Ssm => source.put_parameter(arn, value)?,
                SecretService::SecretsManager => source.put_secret(arn, SecretValue::string(value)),
            }
        }
        Ok(source)
    }

    pub fn put_parameter(&self, arn: &str, value: impl Into<String>) -> Result<(), ArnError> {
        let name = parameter_name(arn)?.to_string();
        self.parameters.insert(
            name.clone(),
            Parameter {
                name,
                arn: arn.to_string(),
                value: value.into(),
            },
        );
        Ok(())
    }

    pub fn put_secret(&self, arn: &str, value: SecretValue) {
        self.secrets.insert(arn.to_string(), value);
    }

    /// Number of `get_parameters` calls served
    pub fn parameter_calls(&self) -> usize {
        self.parameter_calls.load(Ordering::Relaxed)
    }

    /// Number of `get_secret_value` calls served
    pub fn secret_calls(&self) -> usize {
        self.secret_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SecretSource for InMemorySource {
    async fn get_parameters(&self, names: &[String]) -> Result<GetParametersOutput, SourceError> {
        self.parameter_calls.fetch_add(1, Ordering::Relaxed);

        if names.len() > MAX_PARAMETERS_PER_CALL {
            return Err(SourceError::Service(format!(
                "too many parameters requested: {} (max {MAX_PARAMETERS_PER_CALL})",
                names.len()
            )));
        }

        let mut output = GetParametersOutput::default();
        for name in names {
            match self.parameters.get(name) {
                Some(parameter) => output.parameters.push(parameter.clone()),
                None => output.invalid_parameters.push(name.clone()),
            }
        }
        Ok(output)
    }

    async fn get_secret_value(&self, secret_id: &str) -> Result<SecretValue, SourceError> {
        self.secret_calls.fetch_add(1, Ordering::Relaxed);

        self.secrets
            .get(secret_id)
            .map(|s| s.clone())
            .ok_or_else(|| SourceError::ResourceNotFound(secret_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_parameters_reports_invalid_names() {
        let source = InMemorySource::new();
        source
            .put_parameter("arn:aws:ssm:us-east-1:1:parameter/app/db", "postgres://db")
            .unwrap();

        let output = source
            .get_parameters(&["/app/db".to_string(), "/app/missing".to_string()])
            .await
            .unwrap();
        assert_eq!(output.parameters.len(), 1);
        assert_eq!(output.parameters[0].arn, "arn:aws:ssm:us-east-1:1:parameter/app/db");
        assert_eq!(output.parameters[0].value, "postgres://db");
        assert_eq!(output.invalid_parameters, vec!["/app/missing".to_string()]);
        assert_eq!(source.parameter_calls(), 1);
    }

    #[tokio::test]
    async fn test_get_parameters_enforces_batch_limit() {
        let source = InMemorySource::new();
        let names: Vec<String> = (0..11).map(|i| format!("/p{i}")).collect();
        let result = source.get_parameters(&names).await;
        assert!(matches!(result, Err(SourceError::Service(_))));
    }

    #[tokio::test]
    async fn test_get_secret_value() {
        let source = InMemorySource::new();
        source.put_secret(
            "arn:aws:secretsmanager:us-east-1:1:secret:x",
            SecretValue::string("hunter2"),
        );

        let value = source
            .get_secret_value("arn:aws:secretsmanager:us-east-1:1:secret:x")
            .await
            .unwrap();
        assert_eq!(value.secret_string.as_deref(), Some("hunter2"));

        let result = source.get_secret_value("arn:aws:secretsmanager:us-east-1:1:secret:y").await;
        assert!(matches!(result, Err(SourceError::ResourceNotFound(_))));
    }

    #[test]
    fn test_from_values_routes_by_service() {
        let source = InMemorySource::from_values([
            ("arn:aws:ssm:us-east-1:1:parameter/a", "1"),
            ("arn:aws:secretsmanager:us-east-1:1:secret:b", "2"),
        ])
        .unwrap();
        assert!(source.parameters.contains_key("/a"));
        assert!(source
            .secrets
            .contains_key("arn:aws:secretsmanager:us-east-1:1:secret:b"));

        let err = InMemorySource::from_values([("arn:aws:s3:::bucket", "x")]).unwrap_err();
        assert!(matches!(err, ArnError::UnsupportedService { .. }));
    }
}
