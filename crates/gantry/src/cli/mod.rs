//! CLI definition and command handling

pub mod commands;
pub mod output;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::debug;

use gantry_core::config::{load_config, load_config_or_default, Config};

use commands::{
    CompletionsCommand, InitCommand, RunCommand, ValidateCommand, VariantsCommand,
};

/// Gantry - build, package, sign and publish multi-variant native libraries
#[derive(Debug, Parser)]
#[command(name = "gantry")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Working directory
    #[arg(short = 'C', long, global = true)]
    pub directory: Option<PathBuf>,

    /// Configuration file, instead of searching from the working directory
    #[arg(long, global = true, env = "GANTRY_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build variants, assemble publications and optionally publish them
    Run(RunCommand),

    /// List variants with their resolved flags and targets
    Variants(VariantsCommand),

    /// Validate configuration and the variant registry
    Validate(ValidateCommand),

    /// Write a default configuration file
    Init(InitCommand),

    /// Generate shell completions
    Completions(CompletionsCommand),
}

/// Loaded project configuration
pub struct Project {
    /// Configuration
    pub config: Config,
    /// Directory relative paths resolve against
    pub root: PathBuf,
    /// Configuration file, when one was found
    pub path: Option<PathBuf>,
}

impl Cli {
    /// Execute the CLI command, returning the process exit code
    pub fn execute(&self) -> anyhow::Result<i32> {
        // Change to specified directory if provided
        if let Some(dir) = &self.directory {
            std::env::set_current_dir(dir)
                .with_context(|| format!("cannot change directory to {}", dir.display()))?;
        }

        match &self.command {
            Commands::Run(cmd) => cmd.execute(self),
            Commands::Variants(cmd) => cmd.execute(self),
            Commands::Validate(cmd) => cmd.execute(self),
            Commands::Init(cmd) => cmd.execute(self),
            Commands::Completions(cmd) => cmd.execute(self),
        }
    }

    /// Load configuration from `--config` or by searching upwards
    pub fn load_project(&self) -> anyhow::Result<Project> {
        let cwd = std::env::current_dir()?;

        let project = match &self.config {
            Some(path) => {
                let path = absolute(&cwd, path);
                let config = load_config(&path)?;
                let root = path.parent().map(Path::to_path_buf).unwrap_or(cwd);
                Project {
                    config,
                    root,
                    path: Some(path),
                }
            }
            None => {
                let (config, path) = load_config_or_default(&cwd)?;
                let root = path
                    .as_deref()
                    .and_then(project_root)
                    .unwrap_or(cwd);
                Project { config, root, path }
            }
        };

        debug!(root = %project.root.display(), config = ?project.path, "project loaded");
        Ok(project)
    }

    /// Whether to print human-readable output
    pub fn prints_text(&self) -> bool {
        !self.quiet && self.format == OutputFormat::Text
    }
}

fn absolute(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Project root for a configuration file; files under `.github/` belong to
/// the directory above
fn project_root(config_path: &Path) -> Option<PathBuf> {
    let dir = config_path.parent()?;
    if dir.file_name().is_some_and(|n| n == ".github") {
        dir.parent().map(Path::to_path_buf)
    } else {
        Some(dir.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "gantry",
            "-C",
            "/work",
            "--format",
            "json",
            "run",
            "--variant",
            "release",
            "--variant",
            "standalone",
            "--target",
            "x86",
            "--publish",
            "-j",
            "2",
        ])
        .unwrap();

        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.directory, Some(PathBuf::from("/work")));
        match cli.command {
            Commands::Run(run) => {
                assert_eq!(run.variant, vec!["release", "standalone"]);
                assert_eq!(run.target, vec!["x86"]);
                assert!(run.publish);
                assert_eq!(run.jobs, Some(2));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_project_root() {
        assert_eq!(
            project_root(Path::new("/repo/.github/gantry.toml")),
            Some(PathBuf::from("/repo"))
        );
        assert_eq!(
            project_root(Path::new("/repo/gantry.toml")),
            Some(PathBuf::from("/repo"))
        );
    }
}
