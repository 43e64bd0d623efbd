//! Subcommand implementations

use std::collections::HashMap;
use std::ffi::OsString;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use cloudenv_macro::{EntryPointMode, LayerConfig, MacroHandler, MacroRequest, Transformer};
use cloudenv_resolver::{Env, InMemorySource, Resolver};
use tracing::{debug, info};

use crate::config::Config;

/// Layer and entrypoint options shared by the macro commands
#[derive(clap::Args, Debug, Default)]
pub struct MacroOptions {
    /// ARN of the arm64 wrapper layer
    #[arg(long, env = "LayerArm64")]
    pub layer_arm64: Option<String>,

    /// ARN of the x86_64 wrapper layer
    #[arg(long, env = "LayerX8664")]
    pub layer_x86_64: Option<String>,

    /// ARN of the bootstrap layer for provided runtimes
    #[arg(long, env = "BootstrapLayer")]
    pub bootstrap_layer: Option<String>,

    /// How Image function entrypoints are rewritten: prepend or legacy
    #[arg(long, env = "CLOUDENV_ENTRYPOINT_MODE")]
    pub entrypoint_mode: Option<EntryPointMode>,
}

impl MacroOptions {
    /// Build the handler, command line taking precedence over the config file
    pub fn handler(self, config: Config) -> anyhow::Result<MacroHandler> {
        let layers = LayerConfig::new(
            self.layer_arm64.or(config.layers.arm64),
            self.layer_x86_64.or(config.layers.x86_64),
            self.bootstrap_layer.or(config.layers.bootstrap),
        )
        .context("invalid layer configuration")?;
        let mode = self.entrypoint_mode.unwrap_or(config.entrypoint_mode);

        info!(
            arm64 = %layers.arm64(),
            x86_64 = %layers.x86_64(),
            bootstrap = %layers.bootstrap(),
            entrypoint_mode = ?mode,
            "Macro configured"
        );

        Ok(MacroHandler::new(
            Transformer::new(layers).with_entrypoint_mode(mode),
        ))
    }
}

#[derive(clap::Args, Debug)]
pub struct TransformArgs {
    /// Macro request to read (defaults to stdin)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Where to write the response (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Pretty-print the response
    #[arg(long)]
    pub pretty: bool,

    #[command(flatten)]
    pub options: MacroOptions,
}

#[derive(clap::Args, Debug)]
pub struct ExecArgs {
    /// JSON object mapping parameter and secret ARNs to their values
    #[arg(long)]
    pub values: PathBuf,

    /// Number of secrets fetched in parallel
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Program to run, followed by its arguments
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

/// Run one macro request from a file or stdin
pub fn transform(args: TransformArgs, config: Config) -> anyhow::Result<()> {
    let handler = args.options.handler(config)?;

    let input = match &args.input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading request from stdin")?;
            buf
        }
    };

    let request: MacroRequest =
        serde_json::from_str(&input).context("parsing macro request")?;
    let response = handler
        .handle(request)
        .context("transforming fragment")?;

    let mut body = if args.pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    body.push('\n');

    match &args.output {
        Some(path) => std::fs::write(path, body)
            .with_context(|| format!("writing {}", path.display()))?,
        None => std::io::stdout()
            .write_all(body.as_bytes())
            .context("writing response")?,
    }

    Ok(())
}

/// Resolve the current environment from a values file and run `command` with it
pub async fn exec(args: ExecArgs, config: Config) -> anyhow::Result<ExitCode> {
    let source = load_values(&args.values)?;
    let concurrency = args.concurrency.unwrap_or(config.resolver.concurrency);
    let resolver = Resolver::new(Arc::new(source)).with_concurrency(concurrency);

    let (env, opaque) = split_env(std::env::vars_os());
    let env = resolver
        .resolve_env(&env)
        .await
        .context("resolving environment")?;

    let (program, program_args) = args
        .command
        .split_first()
        .context("no program given")?;
    debug!(program = %program, "Starting program with resolved environment");

    let status = tokio::process::Command::new(program)
        .args(program_args)
        .env_clear()
        .envs(&env)
        .envs(opaque)
        .status()
        .await
        .with_context(|| format!("running {program}"))?;

    Ok(status
        .code()
        .and_then(|code| u8::try_from(code).ok())
        .map_or(ExitCode::FAILURE, ExitCode::from))
}

/// Split the environment into UTF-8 variables, which may hold references, and the rest,
/// which are passed through untouched
fn split_env(
    vars: impl IntoIterator<Item = (OsString, OsString)>,
) -> (Env, Vec<(OsString, OsString)>) {
    let mut env = Env::new();
    let mut opaque = Vec::new();
    for (name, value) in vars {
        match (name.to_str(), value.to_str()) {
            (Some(name), Some(value)) => {
                env.insert(name.to_string(), value.to_string());
            }
            _ => opaque.push((name, value)),
        }
    }
    (env, opaque)
}

fn load_values(path: &Path) -> anyhow::Result<InMemorySource> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let values: HashMap<String, String> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    InMemorySource::from_values(values).context("loading values")
}
