//! Gantry Pipeline - multi-variant build and publish orchestration
//!
//! Schedules every (variant, target) build, then for each variant as soon as
//! its builds finish: collects debug symbols, assembles the publication,
//! signs it and uploads it to every configured repository.

pub mod error;
pub mod pipeline;
pub mod report;

pub use error::{PipelineError, Result, StageError};
pub use pipeline::{Pipeline, RunOptions};
pub use report::{PipelineReport, VariantReport, VariantStatus};
