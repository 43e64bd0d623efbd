//! Configuration management

use cloudenv_macro::EntryPointMode;
use cloudenv_resolver::resolve::DEFAULT_CONCURRENCY;
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub layers: LayersConfig,

    #[serde(default)]
    pub entrypoint_mode: EntryPointMode,

    #[serde(default)]
    pub resolver: ResolverConfig,
}

/// Layer ARNs; each may also come from the command line or the macro's own environment
#[derive(Debug, Deserialize, Default)]
pub struct LayersConfig {
    pub arm64: Option<String>,
    pub x86_64: Option<String>,
    pub bootstrap: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// Without an explicit path an optional `cloudenv.{toml,yaml,json}` in the working
    /// directory is read. `CLOUDENV_*` variables override the file, with `__` separating
    /// nested keys (`CLOUDENV_LAYERS__ARM64`). Variables that are not valid UTF-8 are
    /// ignored rather than aborting the load.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let vars = std::env::vars_os().filter_map(|(name, value)| {
            Some((name.into_string().ok()?, value.into_string().ok()?))
        });
        Self::load_with_env(path, vars)
    }

    /// Same as [`Config::load`] with an explicit environment
    pub fn load_with_env(
        path: Option<&Path>,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> anyhow::Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("cloudenv").required(false),
        };

        let config = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("CLOUDENV")
                    .prefix_separator("_")
                    .separator("__")
                    .source(Some(vars.into_iter().collect())),
            )
            .build()?;

        Ok(config.try_deserialize::<Config>()?)
    }
}
