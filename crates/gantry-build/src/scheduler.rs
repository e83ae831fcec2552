//! Build scheduler: bounded fan-out with per-variant barriers

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use gantry_core::{BuildError, BuildOutput, ResolvedVariant, Target};

use crate::driver::BuildDriver;
use crate::reporter::{BuildEvent, BuildReporter};

/// Outcome of every build of one variant
#[derive(Debug)]
pub struct VariantBuildResult {
    /// Variant name
    pub variant: String,
    /// Successful outputs, in target order
    pub outputs: Vec<BuildOutput>,
    /// Failed builds
    pub failures: Vec<BuildError>,
}

impl VariantBuildResult {
    /// Whether every target built
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// In-flight builds of one variant
pub struct VariantBuilds {
    variant: String,
    handles: Vec<(Target, JoinHandle<Result<BuildOutput, BuildError>>)>,
    reporter: Arc<dyn BuildReporter>,
}

impl VariantBuilds {
    /// Variant name
    pub fn variant(&self) -> &str {
        &self.variant
    }

    /// Wait for every build of this variant
    pub async fn join(self) -> VariantBuildResult {
        let mut outputs = Vec::new();
        let mut failures = Vec::new();

        for (target, handle) in self.handles {
            match handle.await {
                Ok(Ok(output)) => outputs.push(output),
                Ok(Err(e)) => failures.push(e),
                Err(e) => failures.push(BuildError::Aborted {
                    variant: self.variant.clone(),
                    target: target.to_string(),
                    reason: e.to_string(),
                }),
            }
        }

        self.reporter.report(&BuildEvent::VariantFinished {
            variant: self.variant.clone(),
            succeeded: outputs.len(),
            failed: failures.len(),
        });

        VariantBuildResult {
            variant: self.variant,
            outputs,
            failures,
        }
    }
}

/// Runs builds with bounded concurrency
pub struct BuildScheduler {
    driver: Arc<BuildDriver>,
    semaphore: Arc<Semaphore>,
    concurrency: usize,
}

impl BuildScheduler {
    /// Create a scheduler allowing `concurrency` builds at once
    pub fn new(driver: Arc<BuildDriver>, concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            driver,
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        }
    }

    /// Scheduler sized to the available parallelism
    pub fn with_default_concurrency(driver: Arc<BuildDriver>) -> Self {
        Self::new(driver, default_concurrency())
    }

    /// Maximum concurrent builds
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Spawn every (variant, target) build.
    ///
    /// Builds start immediately, limited by the semaphore. Each returned
    /// handle completes once all builds of its variant have finished,
    /// independently of other variants.
    pub fn schedule(&self, variants: &[ResolvedVariant]) -> Vec<VariantBuilds> {
        let total: usize = variants.iter().map(|v| v.targets.len()).sum();
        info!(
            variants = variants.len(),
            builds = total,
            concurrency = self.concurrency,
            "scheduling builds"
        );

        variants
            .iter()
            .map(|variant| {
                let shared = Arc::new(variant.clone());
                let handles = variant
                    .targets
                    .iter()
                    .map(|&target| {
                        let driver = self.driver.clone();
                        let semaphore = self.semaphore.clone();
                        let variant = shared.clone();

                        let handle = tokio::spawn(async move {
                            let _permit = semaphore.acquire_owned().await.map_err(|e| {
                                BuildError::Aborted {
                                    variant: variant.name.clone(),
                                    target: target.to_string(),
                                    reason: e.to_string(),
                                }
                            })?;
                            debug!(variant = %variant.name, abi = %target, "build permit acquired");
                            driver.build(&variant, target).await
                        });
                        (target, handle)
                    })
                    .collect();

                VariantBuilds {
                    variant: variant.name.clone(),
                    handles,
                    reporter: self.driver.reporter(),
                }
            })
            .collect()
    }

    /// Build everything and wait for all variants
    pub async fn run(&self, variants: &[ResolvedVariant]) -> Vec<VariantBuildResult> {
        let mut results = Vec::with_capacity(variants.len());
        for builds in self.schedule(variants) {
            results.push(builds.join().await);
        }
        results
    }
}

/// Number of builds to run at once by default
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
