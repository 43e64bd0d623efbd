//! IAM statements granting read access to referenced secrets

use std::collections::{BTreeMap, BTreeSet};

use cloudenv_core::SecretService;
use serde_json::{json, Value};

/// ARNs a function must be able to read, grouped by backing service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadAccess {
    arns: BTreeMap<SecretService, BTreeSet<String>>,
}

impl ReadAccess {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&mut self, service: SecretService, arn: impl Into<String>) {
        self.arns.entry(service).or_default().insert(arn.into());
    }

    pub fn is_empty(&self) -> bool {
        self.arns.is_empty()
    }

    /// De-duplicated ARNs granted for one service
    pub fn arns(&self, service: SecretService) -> impl Iterator<Item = &str> {
        self.arns
            .get(&service)
            .into_iter()
            .flat_map(|arns| arns.iter().map(String::as_str))
    }

    /// One SAM policy document per service, SSM first
    pub fn into_policies(self) -> Vec<Value> {
        self.arns
            .into_iter()
            .map(|(service, arns)| policy_document(service, arns))
            .collect()
    }
}

/// `{"Statement": [{"Effect": "Allow", "Action": ..., "Resource": [...]}]}`
pub fn policy_document(service: SecretService, arns: BTreeSet<String>) -> Value {
    json!({
        "Statement": [
            {
                "Effect": "Allow",
                "Action": service.policy_action(),
                "Resource": arns.into_iter().collect::<Vec<_>>(),
            }
        ]
    })
}
