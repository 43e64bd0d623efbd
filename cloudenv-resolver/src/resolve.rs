//! Fetching referenced values

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use cloudenv_core::SecretService;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use crate::env::{apply, parameter_name, scan, Env, References};
use crate::error::ResolveError;
use crate::source::{SecretSource, MAX_PARAMETERS_PER_CALL};

/// Secrets fetched in parallel by default
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Values fetched for each referenced ARN
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolved {
    parameters: HashMap<String, String>,
    secrets: HashMap<String, String>,
}

impl Resolved {
    pub fn insert(&mut self, service: SecretService, arn: impl Into<String>, value: impl Into<String>) {
        let values = match service {
            SecretService::Ssm => &mut self.parameters,
            SecretService::SecretsManager => &mut self.secrets,
        };
        values.insert(arn.into(), value.into());
    }

    pub fn get(&self, service: SecretService, arn: &str) -> Option<&str> {
        let values = match service {
            SecretService::Ssm => &self.parameters,
            SecretService::SecretsManager => &self.secrets,
        };
        values.get(arn).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.parameters.len() + self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolves references against a [`SecretSource`]
pub struct Resolver {
    source: Arc<dyn SecretSource>,
    concurrency: usize,
}

impl Resolver {
    pub fn new(source: Arc<dyn SecretSource>) -> Self {
        Self {
            source,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Return `env` with every reference replaced by its value
    pub async fn resolve_env(&self, env: &Env) -> Result<Env, ResolveError> {
        let references = scan(env);
        if references.is_empty() {
            return Ok(env.clone());
        }

        let resolved = self.fetch(&references).await?;
        apply(env, &resolved)
    }

    /// Fetch every referenced parameter and secret
    pub async fn fetch(&self, references: &References) -> Result<Resolved, ResolveError> {
        debug!(
            parameters = references.parameters.len(),
            secrets = references.secrets.len(),
            "Resolving references"
        );

        let mut resolved = Resolved::default();
        self.fetch_parameters(&references.parameters, &mut resolved)
            .await?;
        self.fetch_secrets(&references.secrets, &mut resolved).await?;
        Ok(resolved)
    }

    async fn fetch_parameters(
        &self,
        arns: &BTreeSet<String>,
        resolved: &mut Resolved,
    ) -> Result<(), ResolveError> {
        let arns: Vec<&String> = arns.iter().collect();
        for batch in arns.chunks(MAX_PARAMETERS_PER_CALL) {
            let names = batch
                .iter()
                .map(|arn| parameter_name(arn).map(str::to_string))
                .collect::<Result<Vec<_>, _>>()?;

            debug!(count = names.len(), "Fetching parameter batch");
            let output = self
                .source
                .get_parameters(&names)
                .await
                .map_err(ResolveError::Parameters)?;

            if !output.invalid_parameters.is_empty() {
                return Err(ResolveError::InvalidParameters(output.invalid_parameters));
            }

            for parameter in output.parameters {
                resolved.insert(SecretService::Ssm, parameter.arn, parameter.value);
            }
        }
        Ok(())
    }

    async fn fetch_secrets(
        &self,
        secret_ids: &BTreeSet<String>,
        resolved: &mut Resolved,
    ) -> Result<(), ResolveError> {
        let values: Vec<(String, String)> = stream::iter(secret_ids)
            .map(|secret_id| async move {
                let value = self
                    .source
                    .get_secret_value(secret_id)
                    .await
                    .map_err(|source| ResolveError::Secret {
                        secret_id: secret_id.clone(),
                        source,
                    })?;

                let value = match (value.secret_string, value.secret_binary) {
                    (Some(string), _) => string,
                    (None, Some(binary)) => String::from_utf8_lossy(&binary).into_owned(),
                    (None, None) => return Err(ResolveError::EmptySecret(secret_id.clone())),
                };
                Ok::<_, ResolveError>((secret_id.clone(), value))
            })
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;

        for (secret_id, value) in values {
            resolved.insert(SecretService::SecretsManager, secret_id, value);
        }
        Ok(())
    }
}
