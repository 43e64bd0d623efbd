//! cloudenv - secret-backed environment variables for serverless functions
//!
//! `cloudenv transform` runs the CloudFormation macro over one request, and `cloudenv exec`
//! stands in for the wrapper layer when running a function locally.

mod commands;
mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{ExecArgs, TransformArgs};
use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "cloudenv")]
#[command(about = "Secret-backed environment variables for serverless functions", long_about = None)]
struct Args {
    /// Configuration file (defaults to ./cloudenv.{toml,yaml,json} when present)
    #[arg(long, global = true, env = "CLOUDENV_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info", env = "CLOUDENV_LOG_LEVEL")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Transform a macro request and print the response
    Transform(TransformArgs),
    /// Run a program with its cloudenv references resolved
    Exec(ExecArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    // Logs go to stderr, stdout carries the response document
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "cloudenv={level},cloudenv_macro={level},cloudenv_resolver={level}",
                    level = args.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load(args.config.as_deref())?;

    match args.command {
        Command::Transform(transform) => {
            commands::transform(transform, config)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Exec(exec) => commands::exec(exec, config).await,
    }
}
