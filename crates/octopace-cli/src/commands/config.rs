//! Config command - View and validate Octopace configuration
//!
//! Provides the `octopace config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON), credential redacted
//! 2. Validates the configuration file and reports errors
//! 3. Prints the configuration file path

use anyhow::{Context as _, Result};
use clap::Subcommand;
use octopace_core::config::Config;
use serde_json::json;
use tracing::info;

use super::Context;

const REDACTED: &str = "********";

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
    /// Print the configuration file path
    Path,
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        match self {
            ConfigCommand::Show => execute_show(ctx),
            ConfigCommand::Validate => execute_validate(ctx),
            ConfigCommand::Path => {
                if ctx.format.is_json() {
                    ctx.format
                        .formatter()
                        .result(&json!({"config_path": ctx.config_path.display().to_string()}));
                } else {
                    println!("{}", ctx.config_path.display());
                }
                Ok(())
            }
        }
    }
}

/// Copy of `config` safe to print
fn redacted(config: &Config) -> Config {
    let mut shown = config.clone();
    if shown.transport.credential.is_some() {
        shown.transport.credential = Some(REDACTED.to_string());
    }
    shown
}

fn execute_show(ctx: &Context) -> Result<()> {
    info!(config_path = %ctx.config_path.display(), "Showing configuration");
    let shown = redacted(&ctx.config);
    let formatter = ctx.format.formatter();

    if ctx.format.is_json() {
        let value =
            serde_json::to_value(&shown).context("Failed to serialize configuration to JSON")?;
        formatter.result(&value);
    } else {
        formatter.success(&format!("Configuration ({})", ctx.config_path.display()));
        let yaml =
            serde_yaml::to_string(&shown).context("Failed to serialize configuration to YAML")?;
        print!("{}", yaml);
    }
    Ok(())
}

fn execute_validate(ctx: &Context) -> Result<()> {
    let path = &ctx.config_path;
    let formatter = ctx.format.formatter();

    if !path.exists() {
        if ctx.format.is_json() {
            formatter.result(&json!({
                "valid": true,
                "config_path": path.display().to_string(),
                "errors": [],
                "note": "Configuration file not found. Using defaults.",
            }));
        } else {
            formatter.info(&format!("Configuration file not found at {}", path.display()));
            formatter.info("Using default configuration.");
        }
        return Ok(());
    }

    info!(config_path = %path.display(), "Validating configuration");

    // Validate the file as written, without environment overrides.
    let config = Config::load(path)
        .with_context(|| format!("Failed to parse configuration at {}", path.display()))?;
    let errors = config.validate();

    if ctx.format.is_json() {
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        formatter.result(&json!({
            "valid": errors.is_empty(),
            "config_path": path.display().to_string(),
            "errors": messages,
        }));
    } else if errors.is_empty() {
        formatter.success("Configuration is valid");
        formatter.info(&format!("File: {}", path.display()));
    } else {
        formatter.error(&format!(
            "Configuration has {} error{}:",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" }
        ));
        formatter.info(&format!("File: {}", path.display()));
        for error in &errors {
            formatter.info(&format!("  {} - {}", error.field, error.message));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("{} invalid configuration value(s)", errors.len())
    }
}
