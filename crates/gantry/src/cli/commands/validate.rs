//! Validate command

use clap::Args;
use console::style;
use tracing::info;

use gantry_core::config::validate_config;
use gantry_core::VariantRegistry;

use crate::cli::{Cli, OutputFormat};
use crate::exit_codes;

/// Validate configuration and the variant registry
#[derive(Debug, Args)]
pub struct ValidateCommand {
    /// Strict mode - treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

impl ValidateCommand {
    /// Execute the validate command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<i32> {
        info!(strict = self.strict, "executing validate command");

        let mut errors: Vec<String> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();

        let project = match cli.load_project() {
            Ok(project) => Some(project),
            Err(e) => {
                errors.push(format!("Configuration: {:#}", e));
                None
            }
        };
        let config_path = project.as_ref().and_then(|p| p.path.clone());

        let mut variant_count = 0;
        if let Some(project) = &project {
            let config = &project.config;
            if project.path.is_none() {
                warnings.push("No configuration file found, using defaults".to_string());
            }

            if let Err(e) = validate_config(config) {
                errors.push(format!("Configuration validation: {}", e));
            }

            match VariantRegistry::from_config(config).and_then(|r| r.resolve_all()) {
                Ok(variants) => {
                    variant_count = variants.len();
                    if variants.iter().all(|v| !v.publish) {
                        warnings.push("No variant is published".to_string());
                    }
                }
                Err(e) => errors.push(format!("Variants: {}", e)),
            }

            if config.repositories.is_empty() {
                warnings.push("No repositories configured, run --publish will fail".to_string());
            }

            let headers = config.library.headers.as_ref().map(|h| project.root.join(h));
            if let Some(headers) = headers.filter(|h| !h.is_dir()) {
                warnings.push(format!("Header directory {} does not exist", headers.display()));
            }
            if config.toolchain.program.contains('/')
                && !project.root.join(&config.toolchain.program).is_file()
            {
                warnings.push(format!("Toolchain program {} not found", config.toolchain.program));
            }
        }

        // If strict, promote warnings to errors
        if self.strict {
            errors.append(&mut warnings);
        }

        let passed = errors.is_empty();

        match cli.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "valid": passed,
                    "config_path": config_path.map(|p| p.to_string_lossy().to_string()),
                    "variants": variant_count,
                    "errors": errors,
                    "warnings": warnings
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => {
                if !cli.quiet {
                    println!("{}", style("Validation Results").bold());
                    println!();

                    if let Some(path) = config_path {
                        println!("Config: {}", style(path.display()).cyan());
                        println!("Variants: {}", variant_count);
                        println!();
                    }

                    if !errors.is_empty() {
                        println!("{}", style("Errors:").red().bold());
                        for error in &errors {
                            println!("  {} {}", style("✗").red(), error);
                        }
                        println!();
                    }

                    if !warnings.is_empty() {
                        println!("{}", style("Warnings:").yellow().bold());
                        for warning in &warnings {
                            println!("  {} {}", style("!").yellow(), warning);
                        }
                        println!();
                    }

                    if passed {
                        println!("{}", style("✓ Configuration is valid").green().bold());
                    } else {
                        println!(
                            "{} with {} error(s)",
                            style("✗ Validation failed").red().bold(),
                            errors.len()
                        );
                    }
                }
            }
        }

        Ok(if passed {
            exit_codes::SUCCESS
        } else {
            exit_codes::CONFIG_ERROR
        })
    }
}
