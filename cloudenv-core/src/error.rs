//! ARN error types

use thiserror::Error;

/// Errors raised while interpreting an ARN
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArnError {
    #[error("malformed ARN '{arn}': {reason}")]
    Malformed { arn: String, reason: &'static str },

    #[error("unsupported secret service '{service}' in ARN '{arn}'")]
    UnsupportedService { service: String, arn: String },
}

impl ArnError {
    pub fn malformed(arn: impl Into<String>, reason: &'static str) -> Self {
        Self::Malformed {
            arn: arn.into(),
            reason,
        }
    }

    /// The ARN that caused the error
    pub fn arn(&self) -> &str {
        match self {
            Self::Malformed { arn, .. } | Self::UnsupportedService { arn, .. } => arn,
        }
    }
}
