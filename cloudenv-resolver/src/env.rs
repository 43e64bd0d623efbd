//! Environment scanning and substitution

use std::collections::{BTreeMap, BTreeSet};

use cloudenv_core::{ArnError, SecretService};

use crate::error::ResolveError;
use crate::resolve::Resolved;

/// Process environment, keyed by variable name
pub type Env = BTreeMap<String, String>;

/// ARNs referenced by an environment, de-duplicated per service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct References {
    pub parameters: BTreeSet<String>,
    pub secrets: BTreeSet<String>,
}

impl References {
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.secrets.is_empty()
    }
}

/// Collect every prefixed value in `env`
pub fn scan<'a, I>(env: I) -> References
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut references = References::default();
    for (_, value) in env {
        match SecretService::parse_reference(value) {
            Some((SecretService::Ssm, arn)) => {
                references.parameters.insert(arn.to_string());
            }
            Some((SecretService::SecretsManager, arn)) => {
                references.secrets.insert(arn.to_string());
            }
            None => {}
        }
    }
    references
}

/// Parameter name for `GetParameters`, e.g. `arn:aws:ssm:us-east-1:1:parameter/app/db` -> `/app/db`
pub fn parameter_name(arn: &str) -> Result<&str, ArnError> {
    let resource = arn
        .splitn(6, ':')
        .nth(5)
        .ok_or_else(|| ArnError::malformed(arn, "expected 6 colon-delimited segments"))?;
    Ok(resource.strip_prefix("parameter").unwrap_or(resource))
}

/// Copy of `env` with every reference replaced by its resolved value
pub fn apply(env: &Env, resolved: &Resolved) -> Result<Env, ResolveError> {
    env.iter()
        .map(|(name, value)| {
            let value = match SecretService::parse_reference(value) {
                Some((service, arn)) => resolved
                    .get(service, arn)
                    .ok_or_else(|| ResolveError::Unresolved(arn.to_string()))?
                    .to_string(),
                None => value.clone(),
            };
            Ok((name.clone(), value))
        })
        .collect()
}
