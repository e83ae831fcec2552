//! Init command

use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use tracing::info;

use gantry_core::config::{default_config_yaml, DEFAULT_CONFIG_TEMPLATE, DEFAULT_CONFIG_TOML};

use crate::cli::Cli;
use crate::exit_codes;

/// Write a default Gantry configuration
#[derive(Debug, Args)]
pub struct InitCommand {
    /// Force overwrite existing configuration
    #[arg(short, long)]
    pub force: bool,

    /// Output file path (`.yaml`/`.yml` writes YAML)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl InitCommand {
    /// Execute the init command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<i32> {
        info!(force = self.force, "executing init command");
        let cwd = std::env::current_dir()?;
        let config_path = match &self.output {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => cwd.join(path),
            None => cwd.join(DEFAULT_CONFIG_TOML),
        };

        self.write_config(&config_path)?;

        if !cli.quiet {
            println!(
                "{} Created {}",
                style("✓").green().bold(),
                style(config_path.display()).cyan()
            );
            println!();
            println!("Next steps:");
            println!("  1. Point [toolchain] at your build script");
            println!("  2. Describe your variants under [[variants]]");
            println!("  3. Run {} to check the result", style("gantry validate").cyan());
        }

        Ok(exit_codes::SUCCESS)
    }

    fn write_config(&self, path: &Path) -> anyhow::Result<()> {
        if path.exists() && !self.force {
            anyhow::bail!(
                "Configuration file already exists at {}. Use --force to overwrite.",
                path.display()
            );
        }

        let content = if is_yaml(path) {
            default_config_yaml()
        } else {
            DEFAULT_CONFIG_TEMPLATE.to_string()
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "yaml" || ext == "yml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::config::load_config;
    use tempfile::TempDir;

    fn command(force: bool) -> InitCommand {
        InitCommand {
            force,
            output: None,
        }
    }

    #[test]
    fn test_writes_loadable_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gantry.toml");

        command(false).write_config(&path).unwrap();

        let config = load_config(&path).unwrap();
        assert!(!config.variants.is_empty());
    }

    #[test]
    fn test_writes_yaml_by_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ci").join("gantry.yml");

        command(false).write_config(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.starts_with('#'));
        assert!(content.contains("variants:"));
    }

    #[test]
    fn test_refuses_to_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gantry.toml");
        std::fs::write(&path, "# mine\n").unwrap();

        let err = command(false).write_config(&path).unwrap_err();
        assert!(err.to_string().contains("--force"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine\n");

        command(true).write_config(&path).unwrap();
        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .starts_with("# Gantry configuration"));
    }
}
