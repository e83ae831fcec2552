//! Run reports

use std::time::Duration;

use gantry_core::{BuildError, BuildOutput, Publication, SymbolArchive};
use gantry_repositories::{PublishReport, UploadReceipt};

use crate::error::StageError;

/// Furthest stage a variant failed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VariantStatus {
    /// Every stage that ran succeeded
    Succeeded,
    /// At least one repository did not receive the publication
    PublishFailed,
    /// Assembly or signing failed
    AssemblyFailed,
    /// At least one target failed to build
    BuildFailed,
}

/// Everything that happened to one variant
#[derive(Debug)]
pub struct VariantReport {
    /// Variant name
    pub variant: String,
    /// Successful builds
    pub outputs: Vec<BuildOutput>,
    /// Failed builds
    pub build_failures: Vec<BuildError>,
    /// Symbol archive, when one was produced
    pub symbols: Option<SymbolArchive>,
    /// Assembled (and possibly signed) publication
    pub publication: Option<Publication>,
    /// Per-repository upload outcomes
    pub publish: Option<PublishReport>,
    /// Failure after the builds finished
    pub error: Option<StageError>,
}

impl VariantReport {
    /// Empty report for a variant
    pub fn new(variant: impl Into<String>) -> Self {
        Self {
            variant: variant.into(),
            outputs: Vec::new(),
            build_failures: Vec::new(),
            symbols: None,
            publication: None,
            publish: None,
            error: None,
        }
    }

    /// Worst outcome of this variant
    pub fn status(&self) -> VariantStatus {
        if !self.build_failures.is_empty() {
            VariantStatus::BuildFailed
        } else if self.error.is_some() {
            VariantStatus::AssemblyFailed
        } else if self.publish.as_ref().is_some_and(|p| !p.is_success()) {
            VariantStatus::PublishFailed
        } else {
            VariantStatus::Succeeded
        }
    }

    /// Number of detached signatures attached to the publication
    pub fn signature_count(&self) -> usize {
        self.publication.as_ref().map_or(0, |p| {
            p.signatures.len() + usize::from(p.descriptor_signature.is_some())
        })
    }
}

/// Outcome of a whole run
#[derive(Debug)]
pub struct PipelineReport {
    /// One report per selected variant, in registry order
    pub variants: Vec<VariantReport>,
    /// Whether publication was requested
    pub published: bool,
    /// Wall-clock duration
    pub duration: Duration,
}

impl PipelineReport {
    /// Every successful build output
    pub fn outputs(&self) -> impl Iterator<Item = &BuildOutput> {
        self.variants.iter().flat_map(|v| v.outputs.iter())
    }

    /// Every symbol archive
    pub fn symbol_archives(&self) -> impl Iterator<Item = &SymbolArchive> {
        self.variants.iter().filter_map(|v| v.symbols.as_ref())
    }

    /// Every assembled publication
    pub fn publications(&self) -> impl Iterator<Item = &Publication> {
        self.variants.iter().filter_map(|v| v.publication.as_ref())
    }

    /// Every upload receipt
    pub fn receipts(&self) -> impl Iterator<Item = &UploadReceipt> {
        self.variants
            .iter()
            .filter_map(|v| v.publish.as_ref())
            .flat_map(|p| p.receipts())
    }

    /// Total number of detached signatures
    pub fn signature_count(&self) -> usize {
        self.variants.iter().map(VariantReport::signature_count).sum()
    }

    /// Worst status across variants
    pub fn status(&self) -> VariantStatus {
        self.variants
            .iter()
            .map(VariantReport::status)
            .max()
            .unwrap_or(VariantStatus::Succeeded)
    }

    /// Whether every variant succeeded
    pub fn is_success(&self) -> bool {
        self.status() == VariantStatus::Succeeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::{AssemblyError, Target};

    #[test]
    fn test_status_prefers_earliest_failing_stage() {
        let mut ok = VariantReport::new("release");
        assert_eq!(ok.status(), VariantStatus::Succeeded);

        ok.error = Some(StageError::Assembly(AssemblyError::EmptyArchive {
            variant: "release".to_string(),
        }));
        assert_eq!(ok.status(), VariantStatus::AssemblyFailed);

        let mut broken = VariantReport::new("minimal");
        broken.build_failures.push(BuildError::Timeout {
            variant: "minimal".to_string(),
            target: Target::X86.to_string(),
            seconds: 1,
        });

        let report = PipelineReport {
            variants: vec![ok, broken],
            published: false,
            duration: Duration::from_secs(1),
        };
        assert_eq!(report.status(), VariantStatus::BuildFailed);
        assert!(!report.is_success());
    }
}
