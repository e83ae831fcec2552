//! Run command - build, assemble and optionally publish

use std::path::PathBuf;

use clap::Args;
use console::style;
use serde_json::json;
use tracing::info;

use gantry_core::Credentials;
use gantry_pipeline::{Pipeline, PipelineReport, RunOptions, VariantReport, VariantStatus};
use gantry_repositories::RepositoryOutcome;

use crate::cli::{output, Cli, OutputFormat};
use crate::exit_codes;

/// Build variants and assemble their publications
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Variant to build (repeatable, default: all)
    #[arg(long)]
    pub variant: Vec<String>,

    /// Target to build (repeatable, default: all enabled)
    #[arg(short, long)]
    pub target: Vec<String>,

    /// Sign and upload publications after assembly
    #[arg(long)]
    pub publish: bool,

    /// Maximum concurrent builds
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Root directory for generated files
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl RunCommand {
    /// Execute the run command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<i32> {
        info!(
            variants = ?self.variant,
            targets = ?self.target,
            publish = self.publish,
            "executing run command"
        );
        // Run async operation in tokio runtime
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(self.execute_async(cli))
    }

    async fn execute_async(&self, cli: &Cli) -> anyhow::Result<i32> {
        let project = cli.load_project()?;
        let credentials = Credentials::from_env(&project.config, &project.root)?;
        let pipeline = Pipeline::new(project.config, &project.root, credentials)?;

        let options = RunOptions {
            variants: self.variant.clone(),
            targets: self.target.clone(),
            publish: self.publish,
            concurrency: self.jobs,
            output_dir: self.output.clone(),
        };

        if cli.prints_text() {
            println!();
            println!("{}", style("Running pipeline...").bold());
            println!(
                "  Output:  {}",
                style(pipeline.output_dir(&options).display()).cyan()
            );
            if self.publish {
                println!("  Mode:    {}", style("build + publish").cyan());
            } else {
                println!("  Mode:    {}", style("build only").cyan());
            }
            println!();
        }

        let report = pipeline.run(&options).await?;

        match cli.format {
            OutputFormat::Json => output::json(&report_json(&report))?,
            OutputFormat::Text if !cli.quiet => print_report(&report),
            OutputFormat::Text => {}
        }

        Ok(exit_codes::for_status(report.status()))
    }
}

fn print_report(report: &PipelineReport) {
    for variant in &report.variants {
        print_variant(variant);
    }

    println!();
    let summary = format!(
        "{} builds, {} publications, {} signatures, {} uploads in {:.1}s",
        report.outputs().count(),
        report.publications().count(),
        report.signature_count(),
        report.receipts().count(),
        report.duration.as_secs_f64()
    );
    match report.status() {
        VariantStatus::Succeeded => output::success(&summary),
        _ => output::error(&summary),
    }
}

fn print_variant(variant: &VariantReport) {
    let marker = match variant.status() {
        VariantStatus::Succeeded => style("✓").green().bold(),
        _ => style("✗").red().bold(),
    };
    println!("{} {}", marker, output::header(&variant.variant));

    for built in &variant.outputs {
        println!(
            "{}",
            output::key_value(
                built.target.as_str(),
                &output::path_style().apply_to(built.binary.display()).to_string()
            )
        );
    }
    for failure in &variant.build_failures {
        println!("  {} {}", style("✗").red(), failure);
    }

    if let Some(publication) = &variant.publication {
        println!("{}", output::key_value("coordinates", &publication.coordinates.to_string()));
        for artifact in publication.artifacts.iter().chain([&publication.descriptor]) {
            println!(
                "    • {}",
                output::path_style().apply_to(artifact.path.display())
            );
        }
    }
    if let Some(error) = &variant.error {
        println!("  {} {}", style("✗").red(), error);
    }

    if let Some(publish) = &variant.publish {
        for repository in &publish.repositories {
            let line = match &repository.outcome {
                RepositoryOutcome::Published(receipt) => {
                    format!("{} {} files", style("published").green(), receipt.files.len())
                }
                RepositoryOutcome::AlreadyPublished { file } => {
                    format!("{} ({})", style("already published").yellow(), file)
                }
                RepositoryOutcome::Failed(e) => format!("{} {}", style("failed").red(), e),
            };
            println!("{}", output::key_value(&repository.repository, &line));
        }
    }
}

fn report_json(report: &PipelineReport) -> serde_json::Value {
    let variants: Vec<_> = report.variants.iter().map(variant_json).collect();
    json!({
        "success": report.is_success(),
        "status": format!("{:?}", report.status()),
        "published": report.published,
        "duration_ms": report.duration.as_millis() as u64,
        "variants": variants,
    })
}

fn variant_json(variant: &VariantReport) -> serde_json::Value {
    let repositories: Vec<_> = variant
        .publish
        .iter()
        .flat_map(|p| p.repositories.iter())
        .map(|r| match &r.outcome {
            RepositoryOutcome::Published(receipt) => json!({
                "repository": r.repository,
                "outcome": "published",
                "receipt": receipt,
            }),
            RepositoryOutcome::AlreadyPublished { file } => json!({
                "repository": r.repository,
                "outcome": "already_published",
                "file": file,
            }),
            RepositoryOutcome::Failed(e) => json!({
                "repository": r.repository,
                "outcome": "failed",
                "error": e.to_string(),
            }),
        })
        .collect();

    json!({
        "variant": variant.variant,
        "status": format!("{:?}", variant.status()),
        "outputs": variant.outputs,
        "build_failures": variant.build_failures.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
        "symbols": variant.symbols,
        "publication": variant.publication,
        "error": variant.error.as_ref().map(|e| e.to_string()),
        "repositories": repositories,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_report_json_for_failed_variant() {
        let mut variant = VariantReport::new("release");
        variant.build_failures.push(gantry_core::BuildError::Timeout {
            variant: "release".to_string(),
            target: "x86".to_string(),
            seconds: 10,
        });
        let report = PipelineReport {
            variants: vec![variant],
            published: false,
            duration: Duration::from_millis(1500),
        };

        let value = report_json(&report);
        assert_eq!(value["success"], false);
        assert_eq!(value["status"], "BuildFailed");
        assert_eq!(value["duration_ms"], 1500);
        assert_eq!(value["variants"][0]["variant"], "release");
        assert_eq!(
            value["variants"][0]["build_failures"][0],
            "Toolchain for release/x86 timed out after 10s"
        );
    }
}
