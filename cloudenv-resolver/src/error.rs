//! Resolver error types

use cloudenv_core::ArnError;
use thiserror::Error;

/// Errors returned by a [`crate::SecretSource`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Service error: {0}")]
    Service(String),
}

/// Errors that abort environment resolution
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Arn(#[from] ArnError),

    #[error("getting parameters: {0}")]
    Parameters(#[source] SourceError),

    #[error("invalid parameters: {}", .0.join(", "))]
    InvalidParameters(Vec<String>),

    #[error("getting secret {secret_id}: {source}")]
    Secret {
        secret_id: String,
        #[source]
        source: SourceError,
    },

    #[error("secret {0} has neither a string nor a binary value")]
    EmptySecret(String),

    #[error("no value resolved for {0}")]
    Unresolved(String),
}
