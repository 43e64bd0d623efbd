//! Transform errors

use cloudenv_core::ArnError;
use thiserror::Error;

/// Errors that abort a transform request
///
/// There is no partial result: the first error fails the whole fragment.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("fragment must contain a Resources mapping")]
    MissingResources,

    #[error("resource '{resource}': {field} must be {expected}")]
    InvalidField {
        resource: String,
        field: &'static str,
        expected: &'static str,
    },

    #[error("resource '{resource}': secret '{secret}' must be an ARN string")]
    SecretNotString { resource: String, secret: String },

    #[error("resource '{resource}': secret '{secret}': {source}")]
    InvalidSecretArn {
        resource: String,
        secret: String,
        #[source]
        source: ArnError,
    },

    #[error("resource '{resource}': Runtime is required for Zip functions declaring secrets")]
    MissingRuntime { resource: String },
}

impl TransformError {
    pub(crate) fn invalid_field(
        resource: &str,
        field: &'static str,
        expected: &'static str,
    ) -> Self {
        Self::InvalidField {
            resource: resource.to_string(),
            field,
            expected,
        }
    }

    /// Logical name of the resource that failed, if any
    pub fn resource(&self) -> Option<&str> {
        match self {
            Self::MissingResources => None,
            Self::InvalidField { resource, .. }
            | Self::SecretNotString { resource, .. }
            | Self::InvalidSecretArn { resource, .. }
            | Self::MissingRuntime { resource } => Some(resource),
        }
    }

    /// Offending secret ARN, for secret classification failures
    pub fn arn(&self) -> Option<&str> {
        match self {
            Self::InvalidSecretArn { source, .. } => Some(source.arn()),
            _ => None,
        }
    }
}
