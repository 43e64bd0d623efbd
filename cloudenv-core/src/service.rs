//! Secret backing services
//!
//! The macro writes `prefix + arn` into a function's environment and the wrapper layer
//! strips the prefix again at startup, so both sides must agree on these values.

use serde::{Deserialize, Serialize};

use crate::arn::Arn;
use crate::error::ArnError;

/// Path of the wrapper executable shipped in the cloudenv layer
pub const EXEC_WRAPPER_PATH: &str = "/opt/cloudenv";

/// Services that can back a declared secret
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretService {
    /// SSM Parameter Store
    Ssm,
    /// AWS Secrets Manager
    SecretsManager,
}

impl SecretService {
    pub const ALL: [Self; 2] = [Self::Ssm, Self::SecretsManager];

    /// Classify an ARN by its service segment
    pub fn from_arn(arn: &str) -> Result<Self, ArnError> {
        let service = Arn::service_segment(arn)?;
        Self::from_service(service).ok_or_else(|| ArnError::UnsupportedService {
            service: service.to_string(),
            arn: arn.to_string(),
        })
    }

    pub fn from_service(service: &str) -> Option<Self> {
        match service {
            "ssm" => Some(Self::Ssm),
            "secretsmanager" => Some(Self::SecretsManager),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ssm => "ssm",
            Self::SecretsManager => "secretsmanager",
        }
    }

    /// Marker prepended to the ARN in the environment variable value
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Ssm => "{aws-ssm}",
            Self::SecretsManager => "{aws-sm}",
        }
    }

    /// IAM action the function needs to read values from this service
    pub fn policy_action(&self) -> &'static str {
        match self {
            Self::Ssm => "ssm:GetParameters",
            Self::SecretsManager => "secretsmanager:GetSecretValue",
        }
    }

    /// Environment variable value referencing `arn`
    pub fn reference(&self, arn: &str) -> String {
        format!("{}{}", self.prefix(), arn)
    }

    /// Split a prefixed environment value back into its service and ARN
    pub fn parse_reference(value: &str) -> Option<(Self, &str)> {
        Self::ALL
            .into_iter()
            .find_map(|service| value.strip_prefix(service.prefix()).map(|arn| (service, arn)))
    }
}
