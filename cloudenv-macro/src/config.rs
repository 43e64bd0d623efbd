//! Layer configuration
//!
//! The wrapper and bootstrap layer ARNs are published per region alongside the macro and
//! handed to it through its environment (`LayerArm64`, `LayerX8664`, `BootstrapLayer`).

use cloudenv_core::{Arn, ArnError};
use serde::Deserialize;
use thiserror::Error;

/// Environment variable holding the arm64 wrapper layer ARN
pub const ENV_LAYER_ARM64: &str = "LayerArm64";
/// Environment variable holding the x86_64 wrapper layer ARN
pub const ENV_LAYER_X86_64: &str = "LayerX8664";
/// Environment variable holding the bootstrap layer ARN for `provided` runtimes
pub const ENV_BOOTSTRAP_LAYER: &str = "BootstrapLayer";

/// Layer configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing layer ARN: {0}")]
    Missing(&'static str),

    #[error("invalid layer ARN for {name}: {source}")]
    InvalidArn {
        name: &'static str,
        #[source]
        source: ArnError,
    },

    #[error("{name} must be a lambda layer ARN, got '{arn}'")]
    NotALayer { name: &'static str, arn: String },
}

/// Validated layer ARNs injected into the transformer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerConfig {
    arm64: String,
    x86_64: String,
    bootstrap: String,
}

impl LayerConfig {
    pub fn new(
        arm64: Option<String>,
        x86_64: Option<String>,
        bootstrap: Option<String>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            arm64: validate_layer(ENV_LAYER_ARM64, arm64)?,
            x86_64: validate_layer(ENV_LAYER_X86_64, x86_64)?,
            bootstrap: validate_layer(ENV_BOOTSTRAP_LAYER, bootstrap)?,
        })
    }

    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Self::new(
            lookup(ENV_LAYER_ARM64),
            lookup(ENV_LAYER_X86_64),
            lookup(ENV_BOOTSTRAP_LAYER),
        )
    }

    pub fn arm64(&self) -> &str {
        &self.arm64
    }

    pub fn x86_64(&self) -> &str {
        &self.x86_64
    }

    pub fn bootstrap(&self) -> &str {
        &self.bootstrap
    }

    /// Wrapper layer matching a function's first architecture
    pub fn wrapper_for(&self, architecture: &str) -> &str {
        if architecture == "arm64" {
            &self.arm64
        } else {
            &self.x86_64
        }
    }
}

fn validate_layer(name: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))?;

    let arn = Arn::parse(&value).map_err(|source| ConfigError::InvalidArn { name, source })?;
    if arn.service != "lambda" || !arn.resource.starts_with("layer:") {
        return Err(ConfigError::NotALayer { name, arn: value });
    }

    Ok(value)
}

/// How an `Image` function's entrypoint is rewritten
///
/// Parsed case-insensitively, from the command line and from config alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum EntryPointMode {
    /// `["/opt/cloudenv", ...original]`
    #[default]
    Prepend,
    /// Reproduces the first macro release, which replaced the entrypoint with `null`
    Legacy,
}

impl std::str::FromStr for EntryPointMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "prepend" => Ok(Self::Prepend),
            "legacy" => Ok(Self::Legacy),
            _ => Err(format!("Unknown entrypoint mode: {s}")),
        }
    }
}

impl TryFrom<String> for EntryPointMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
