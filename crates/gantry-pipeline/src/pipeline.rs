//! Pipeline: build, collect symbols, assemble, sign and publish

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use gantry_artifacts::{collect_symbols, Assembler, AssemblyOptions, SymbolOptions};
use gantry_build::{
    BuildDriver, BuildReporter, BuildScheduler, CommandToolchain, Toolchain, TracingReporter,
    VariantBuilds,
};
use gantry_core::{
    AssemblyError, Config, Credentials, Publication, PublicationMetadata, ResolvedVariant,
    SymbolArchive, VariantRegistry,
};
use gantry_repositories::{PublicationManager, RepositoryTransport};
use gantry_signing::{sign_publication, signer_from_credentials, DetachedSigner};

use crate::error::{PipelineError, Result, StageError};
use crate::report::{PipelineReport, VariantReport};

/// What a run should do
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Variants to build; empty means all
    pub variants: Vec<String>,
    /// Targets to build; empty means all enabled
    pub targets: Vec<String>,
    /// Sign and upload after assembly
    pub publish: bool,
    /// Maximum concurrent builds
    pub concurrency: Option<usize>,
    /// Root of generated files, overriding configuration
    pub output_dir: Option<PathBuf>,
}

impl RunOptions {
    /// Build every variant for every target, without publishing
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to a variant
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variants.push(variant.into());
        self
    }

    /// Restrict to a target
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.targets.push(target.into());
        self
    }

    /// Enable publication
    pub fn with_publish(mut self, publish: bool) -> Self {
        self.publish = publish;
        self
    }
}

/// State shared by every variant's post-build stages
struct Stages {
    assembler: Assembler,
    symbols: SymbolOptions,
    metadata: PublicationMetadata,
    signer: Option<Arc<dyn DetachedSigner>>,
    manager: Option<PublicationManager>,
}

/// The multi-variant build and publish pipeline
pub struct Pipeline {
    config: Arc<Config>,
    root: PathBuf,
    registry: VariantRegistry,
    credentials: Arc<Credentials>,
    toolchain: Arc<dyn Toolchain>,
    reporter: Arc<dyn BuildReporter>,
    signer: Option<Arc<dyn DetachedSigner>>,
    transports: Vec<Arc<dyn RepositoryTransport>>,
}

impl Pipeline {
    /// Create a pipeline for the project at `root`.
    ///
    /// Builds the variant registry, so configuration errors surface here,
    /// before anything runs.
    pub fn new(config: Config, root: impl Into<PathBuf>, credentials: Credentials) -> Result<Self> {
        let root = root.into();
        let registry = VariantRegistry::from_config(&config)?;
        let reporter: Arc<dyn BuildReporter> = Arc::new(TracingReporter);
        let toolchain: Arc<dyn Toolchain> = Arc::new(
            CommandToolchain::from_config(&config.toolchain, &root).with_reporter(reporter.clone()),
        );

        Ok(Self {
            config: Arc::new(config),
            root,
            registry,
            credentials: Arc::new(credentials),
            toolchain,
            reporter,
            signer: None,
            transports: Vec::new(),
        })
    }

    /// Replace the toolchain
    pub fn with_toolchain(mut self, toolchain: Arc<dyn Toolchain>) -> Self {
        self.toolchain = toolchain;
        self
    }

    /// Replace the build reporter
    pub fn with_reporter(mut self, reporter: Arc<dyn BuildReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Sign with this signer instead of one built from credentials
    pub fn with_signer(mut self, signer: Arc<dyn DetachedSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Publish to an additional repository
    pub fn with_transport(mut self, transport: Arc<dyn RepositoryTransport>) -> Self {
        self.transports.push(transport);
        self
    }

    /// The variant registry
    pub fn registry(&self) -> &VariantRegistry {
        &self.registry
    }

    /// Output root for a run
    pub fn output_dir(&self, options: &RunOptions) -> PathBuf {
        let dir = options
            .output_dir
            .clone()
            .unwrap_or_else(|| self.config.build.output_dir.clone());
        resolve(&self.root, &dir)
    }

    /// Run the pipeline.
    ///
    /// Every (variant, target) build is scheduled at once. Each variant moves
    /// on to symbol collection, assembly, signing and publication as soon as
    /// its own builds finish. A variant with any failed build is not
    /// assembled. Only setup problems are returned as errors; everything else
    /// is recorded in the report.
    #[instrument(skip_all, fields(publish = options.publish))]
    pub async fn run(&self, options: &RunOptions) -> Result<PipelineReport> {
        let started = Instant::now();
        let selected = self.registry.select(&options.variants, &options.targets)?;
        let output_dir = self.output_dir(options);
        tokio::fs::create_dir_all(&output_dir).await?;

        let stages = Arc::new(self.stages(options, &output_dir).await?);

        let driver = BuildDriver::new(
            self.toolchain.clone(),
            &output_dir,
            &self.config.library.binary_name,
        )
        .with_reporter(self.reporter.clone());
        let driver = match self.config.toolchain.timeout_secs {
            0 => driver.without_timeout(),
            secs => driver.with_timeout(Duration::from_secs(secs)),
        };

        let driver = Arc::new(driver);
        let scheduler = match options.concurrency.or(self.config.build.concurrency) {
            Some(n) => BuildScheduler::new(driver, n),
            None => BuildScheduler::with_default_concurrency(driver),
        };

        info!(
            variants = selected.len(),
            output = %output_dir.display(),
            "starting pipeline"
        );

        let handles: Vec<(String, JoinHandle<VariantReport>)> = scheduler
            .schedule(&selected)
            .into_iter()
            .zip(selected)
            .map(|(builds, variant)| {
                let stages = stages.clone();
                (
                    variant.name.clone(),
                    tokio::spawn(finish_variant(builds, variant, stages)),
                )
            })
            .collect();

        let mut variants = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            let report = match handle.await {
                Ok(report) => report,
                Err(e) => {
                    let mut report = VariantReport::new(name);
                    report.error = Some(StageError::Aborted(e.to_string()));
                    report
                }
            };
            variants.push(report);
        }

        let report = PipelineReport {
            variants,
            published: options.publish,
            duration: started.elapsed(),
        };
        info!(
            outputs = report.outputs().count(),
            publications = report.publications().count(),
            status = ?report.status(),
            "pipeline finished"
        );
        Ok(report)
    }

    async fn stages(&self, options: &RunOptions, output_dir: &Path) -> Result<Stages> {
        let (signer, manager) = if options.publish {
            let signer = match &self.signer {
                Some(signer) => Some(signer.clone()),
                None => signer_from_credentials(&self.credentials, &self.config.signing).await?,
            };

            let mut manager = PublicationManager::from_config(
                &self.config.repositories,
                &self.credentials,
                Duration::from_secs(self.config.publish.timeout_secs),
            )?;
            for transport in &self.transports {
                manager = manager.with_transport(transport.clone());
            }
            if manager.is_empty() {
                return Err(PipelineError::NoRepositories);
            }
            if signer.is_none() {
                info!("no signing key provided, publications will be unsigned");
            }
            (signer, Some(manager))
        } else {
            (None, None)
        };

        Ok(Stages {
            assembler: Assembler::new(AssemblyOptions::from_config(
                &self.config,
                &self.root,
                output_dir,
            )),
            symbols: SymbolOptions::from_config(&self.config, output_dir),
            metadata: PublicationMetadata::from(&self.config.library),
            signer,
            manager,
        })
    }
}

/// Post-build stages of one variant
#[instrument(skip_all, fields(variant = %variant.name))]
async fn finish_variant(
    builds: VariantBuilds,
    variant: ResolvedVariant,
    stages: Arc<Stages>,
) -> VariantReport {
    let result = builds.join().await;
    let mut report = VariantReport::new(&variant.name);
    report.outputs = result.outputs;
    report.build_failures = result.failures;

    if !report.build_failures.is_empty() {
        warn!(
            failed = report.build_failures.len(),
            "variant has failed builds, skipping assembly"
        );
        return report;
    }

    let assembled = {
        let stages = stages.clone();
        let variant = variant.clone();
        let outputs = report.outputs.clone();
        tokio::task::spawn_blocking(move || assemble(&stages, &variant, &outputs)).await
    };

    let (symbols, publication) = match assembled {
        Ok(Ok(assembled)) => assembled,
        Ok(Err(e)) => {
            warn!(error = %e, "assembly failed");
            report.error = Some(e.into());
            return report;
        }
        Err(e) => {
            report.error = Some(StageError::Aborted(e.to_string()));
            return report;
        }
    };
    report.symbols = symbols;

    let Some(manager) = &stages.manager else {
        report.publication = Some(publication);
        return report;
    };
    if !variant.publish {
        info!("variant is not published");
        report.publication = Some(publication);
        return report;
    }

    let publication = match &stages.signer {
        Some(signer) => match sign_publication(publication, signer.as_ref()).await {
            Ok(signed) => signed,
            Err(e) => {
                warn!(error = %e, "signing failed, publication not uploaded");
                report.error = Some(e.into());
                return report;
            }
        },
        None => publication,
    };

    report.publish = Some(manager.publish(&publication).await);
    report.publication = Some(publication);
    report
}

fn assemble(
    stages: &Stages,
    variant: &ResolvedVariant,
    outputs: &[gantry_core::BuildOutput],
) -> std::result::Result<(Option<SymbolArchive>, Publication), AssemblyError> {
    let symbols = collect_symbols(&variant.name, outputs, &stages.symbols)?;
    let publication =
        stages
            .assembler
            .assemble(variant, outputs, symbols.as_ref(), &stages.metadata)?;
    Ok((symbols, publication))
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
