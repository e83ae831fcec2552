//! Variants command - show the resolved variant registry

use clap::Args;
use console::style;
use serde_json::json;
use tracing::info;

use gantry_core::{ResolvedVariant, VariantRegistry};

use crate::cli::{output, Cli, OutputFormat};
use crate::exit_codes;

/// List variants with their resolved flags and targets
#[derive(Debug, Args)]
pub struct VariantsCommand {
    /// Only show these variants
    #[arg(value_name = "VARIANT")]
    pub names: Vec<String>,

    /// Show the full flag list
    #[arg(long)]
    pub flags: bool,
}

impl VariantsCommand {
    /// Execute the variants command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<i32> {
        info!(names = ?self.names, "executing variants command");
        let project = cli.load_project()?;
        let registry = VariantRegistry::from_config(&project.config)?;
        let variants = registry.select(&self.names, &[])?;

        match cli.format {
            OutputFormat::Json => {
                let list: Vec<_> = variants
                    .iter()
                    .map(|v| {
                        json!({
                            "name": v.name,
                            "parent": v.parent,
                            "artifact_id": v.artifact_id,
                            "version": v.version,
                            "linkage": v.linkage.to_string(),
                            "targets": v.targets.iter().map(|t| t.as_str()).collect::<Vec<_>>(),
                            "flags": v.flags,
                            "publish": v.publish,
                            "build_dependencies": v.build_dependencies,
                        })
                    })
                    .collect();
                output::json(&json!({ "variants": list }))?;
            }
            OutputFormat::Text => {
                if !cli.quiet {
                    for variant in &variants {
                        self.print_variant(variant);
                    }
                }
            }
        }

        Ok(exit_codes::SUCCESS)
    }

    fn print_variant(&self, variant: &ResolvedVariant) {
        match &variant.parent {
            Some(parent) => println!(
                "{} {}",
                output::header(&variant.name),
                style(format!("(from {})", parent)).dim()
            ),
            None => println!("{}", output::header(&variant.name)),
        }
        println!(
            "{}",
            output::key_value("artifact", &format!("{}:{}", variant.artifact_id, variant.version))
        );
        println!("{}", output::key_value("linkage", &variant.linkage.to_string()));
        let targets: Vec<&str> = variant.targets.iter().map(|t| t.as_str()).collect();
        println!("{}", output::key_value("targets", &targets.join(", ")));
        if !variant.build_dependencies.is_empty() {
            println!(
                "{}",
                output::key_value("build dependencies", &variant.build_dependencies.join(", "))
            );
        }
        if !variant.publish {
            println!("{}", output::key_value("publish", "no"));
        }

        if self.flags {
            println!("{}", output::key_value("flags", ""));
            for flag in &variant.flags {
                println!("    {}", flag);
            }
        } else {
            println!(
                "{}",
                output::key_value("flags", &format!("{} (use --flags to list)", variant.flags.len()))
            );
        }
        println!();
    }
}
