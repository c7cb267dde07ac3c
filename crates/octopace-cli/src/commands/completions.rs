//! Shell completions generation command
//!
//! Usage: `octopace completions bash > ~/.local/share/bash-completion/completions/octopace`

use std::io;

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::Shell;

use super::Context;

/// Arguments for the completions subcommand
#[derive(Debug, clap::Args)]
pub struct CompletionsCommand {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsCommand {
    pub async fn execute(&self, _ctx: &Context) -> Result<()> {
        let mut cmd = crate::Cli::command();
        clap_complete::generate(self.shell, &mut cmd, "octopace", &mut io::stdout());
        Ok(())
    }
}
