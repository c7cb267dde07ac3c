//! CLI subcommands and the context they share

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use octopace_core::config::Config;

use crate::output::OutputFormat;

pub mod call;
pub mod completions;
pub mod config;
pub mod operations;

/// Environment variables consulted for the API credential, in order
pub const CREDENTIAL_VARS: [&str; 2] = ["OCTOPACE_TOKEN", "GITHUB_TOKEN"];

/// Loaded configuration plus global flags
#[derive(Debug)]
pub struct Context {
    pub config_path: PathBuf,
    pub config: Config,
    pub format: OutputFormat,
}

impl Context {
    /// Loads the configuration file at `path` (or the default location)
    ///
    /// A missing file yields the defaults. A file that exists but does not
    /// parse is an error rather than being silently ignored.
    pub fn load(path: Option<PathBuf>, format: OutputFormat) -> Result<Self> {
        let config_path = path.unwrap_or_else(Config::default_path);
        let mut config = if config_path.exists() {
            Config::load(&config_path).with_context(|| {
                format!("Failed to load configuration from {}", config_path.display())
            })?
        } else {
            Config::default()
        };

        apply_credential_override(&mut config, |name| std::env::var(name).ok());

        Ok(Self {
            config_path,
            config,
            format,
        })
    }
}

/// Replaces the configured credential with the first non-empty variable
/// from [`CREDENTIAL_VARS`]
pub fn apply_credential_override<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let token = CREDENTIAL_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .find(|value| !value.trim().is_empty());
    if let Some(token) = token {
        config.transport.credential = Some(token);
    }
}
