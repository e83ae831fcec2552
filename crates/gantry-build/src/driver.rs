//! Native build driver

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, instrument};

use gantry_core::{BuildError, BuildOutput, ResolvedVariant, Target};

use crate::reporter::{BuildEvent, BuildReporter, TracingReporter};
use crate::toolchain::{Invocation, Toolchain};

/// Runs the toolchain for one (variant, target) pair and checks its outputs
pub struct BuildDriver {
    toolchain: Arc<dyn Toolchain>,
    output_dir: PathBuf,
    binary_name: String,
    timeout: Option<Duration>,
    reporter: Arc<dyn BuildReporter>,
}

impl BuildDriver {
    /// Create a driver writing under `output_dir`
    pub fn new(
        toolchain: Arc<dyn Toolchain>,
        output_dir: impl Into<PathBuf>,
        binary_name: impl Into<String>,
    ) -> Self {
        Self {
            toolchain,
            output_dir: output_dir.into(),
            binary_name: binary_name.into(),
            timeout: Some(Duration::from_secs(3600)),
            reporter: Arc::new(TracingReporter),
        }
    }

    /// Set the per-build timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Let builds run for as long as the toolchain needs
    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Set the reporter
    pub fn with_reporter(mut self, reporter: Arc<dyn BuildReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// The reporter events are sent to
    pub fn reporter(&self) -> Arc<dyn BuildReporter> {
        self.reporter.clone()
    }

    /// Directory reserved for a (variant, target) build
    pub fn build_dir(&self, variant: &str, target: Target) -> PathBuf {
        self.output_dir
            .join("native")
            .join(variant)
            .join(target.as_str())
    }

    /// Build one (variant, target) pair
    #[instrument(skip(self, variant), fields(variant = %variant.name, abi = %target))]
    pub async fn build(
        &self,
        variant: &ResolvedVariant,
        target: Target,
    ) -> Result<BuildOutput, BuildError> {
        let start = Instant::now();
        self.reporter.report(&BuildEvent::Started {
            variant: variant.name.clone(),
            target,
        });

        let result = self.run(variant, target).await;

        match &result {
            Ok(_) => self.reporter.report(&BuildEvent::Completed {
                variant: variant.name.clone(),
                target,
                duration: start.elapsed(),
            }),
            Err(e) => self.reporter.report(&BuildEvent::Failed {
                variant: variant.name.clone(),
                target,
                duration: start.elapsed(),
                error: e.to_string(),
            }),
        }

        result
    }

    async fn run(&self, variant: &ResolvedVariant, target: Target) -> Result<BuildOutput, BuildError> {
        let dir = self.build_dir(&variant.name, target);
        prepare_dir(&dir).await?;

        let invocation = Invocation {
            variant: variant.name.clone(),
            target,
            flags: variant.flags.clone(),
            linkage: variant.linkage,
            output_dir: dir.clone(),
            binary: dir.join(&self.binary_name),
            symbols: dir.join("symbols").join(&self.binary_name),
            build_dependencies: variant.build_dependencies.clone(),
        };

        debug!(
            toolchain = self.toolchain.name(),
            dir = %dir.display(),
            flags = invocation.flags.len(),
            "invoking toolchain"
        );

        match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.toolchain.compile(&invocation)).await {
                Ok(result) => result?,
                Err(_) => {
                    return Err(BuildError::Timeout {
                        variant: variant.name.clone(),
                        target: target.to_string(),
                        seconds: limit.as_secs(),
                    })
                }
            },
            None => self.toolchain.compile(&invocation).await?,
        }

        if !is_file(&invocation.binary).await {
            return Err(BuildError::MissingOutput {
                variant: variant.name.clone(),
                target: target.to_string(),
                path: invocation.binary,
            });
        }

        let symbols = if is_file(&invocation.symbols).await {
            Some(invocation.symbols)
        } else {
            debug!("no symbol file produced");
            None
        };

        Ok(BuildOutput {
            variant: variant.name.clone(),
            target,
            binary: invocation.binary,
            symbols,
        })
    }
}

/// Start every build from an empty directory
async fn prepare_dir(dir: &Path) -> Result<(), BuildError> {
    if tokio::fs::metadata(dir).await.is_ok() {
        tokio::fs::remove_dir_all(dir).await?;
    }
    tokio::fs::create_dir_all(dir.join("symbols")).await?;
    Ok(())
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}
