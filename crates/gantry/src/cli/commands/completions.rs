//! Shell completion scripts

use std::io::Write;
use std::path::PathBuf;

use clap::{Args, CommandFactory};
use clap_complete::Shell;
use tracing::info;

use crate::cli::{output, Cli};
use crate::exit_codes;

/// Print or install a completion script for `gantry`
#[derive(Debug, Args)]
pub struct CompletionsCommand {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Write the script to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl CompletionsCommand {
    /// Execute the completions command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<i32> {
        info!(shell = %self.shell, "generating completions");
        let script = script(self.shell);

        match &self.output {
            Some(path) => {
                std::fs::write(path, &script)?;
                if !cli.quiet {
                    output::success(&format!(
                        "{} completions written to {}",
                        self.shell,
                        output::path_style().apply_to(path.display())
                    ));
                }
            }
            None => std::io::stdout().write_all(&script)?,
        }

        Ok(exit_codes::SUCCESS)
    }
}

/// Completion script for the full command tree
fn script(shell: Shell) -> Vec<u8> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    let mut script = Vec::new();
    clap_complete::generate(shell, &mut cmd, name, &mut script);
    script
}
