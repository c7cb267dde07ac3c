//! Octopace CLI - Command-line interface for the throttled REST client
//!
//! Provides commands for:
//! - Calling any catalogue operation through the pacing and retry layer
//! - Listing operations with their rate-limit groups
//! - Viewing and validating configuration
//! - Generating shell completions

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    call::CallCommand, completions::CompletionsCommand, config::ConfigCommand,
    operations::OperationsCommand, Context,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "octopace",
    version,
    about = "Rate-limited REST API client with per-group pacing and retries"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Call an operation, e.g. `octopace call repos.get --args '{"owner":"rust-lang","repo":"rust"}'`
    Call(CallCommand),
    /// List operations and the rate-limit group each one is paced by
    Operations(OperationsCommand),
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

/// Log filter: `RUST_LOG` wins, then `-v` flags, then `logging.level`
fn env_filter(verbose: u8, config_level: &str) -> EnvFilter {
    let level = match verbose {
        0 => config_level,
        1 => "debug",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let ctx = Context::load(cli.config.clone(), format)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(cli.verbose, &ctx.config.logging.level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Call(cmd) => cmd.execute(&ctx).await,
        Commands::Operations(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
        Commands::Completions(cmd) => cmd.execute(&ctx).await,
    }
}
