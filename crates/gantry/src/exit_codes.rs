//! Exit codes for the CLI

use gantry_core::{ConfigError, GantryError};
use gantry_pipeline::{PipelineError, VariantStatus};

/// Success
pub const SUCCESS: i32 = 0;

/// General error
pub const ERROR: i32 = 1;

/// Configuration error
pub const CONFIG_ERROR: i32 = 2;

/// At least one (variant, target) build failed
pub const BUILD_FAILURE: i32 = 3;

/// Symbol collection, assembly or signing failed
pub const ASSEMBLY_FAILURE: i32 = 4;

/// At least one repository did not receive a publication
pub const PUBLISH_FAILURE: i32 = 5;

/// Exit code for the worst variant status of a run
pub fn for_status(status: VariantStatus) -> i32 {
    match status {
        VariantStatus::Succeeded => SUCCESS,
        VariantStatus::PublishFailed => PUBLISH_FAILURE,
        VariantStatus::AssemblyFailed => ASSEMBLY_FAILURE,
        VariantStatus::BuildFailed => BUILD_FAILURE,
    }
}

/// Exit code for an error that stopped a command
pub fn for_error(error: &anyhow::Error) -> i32 {
    for cause in error.chain() {
        if cause.downcast_ref::<ConfigError>().is_some() {
            return CONFIG_ERROR;
        }
        match cause.downcast_ref::<GantryError>() {
            Some(GantryError::Config(_)) => return CONFIG_ERROR,
            Some(_) => return ERROR,
            None => {}
        }
        match cause.downcast_ref::<PipelineError>() {
            Some(PipelineError::Config(_))
            | Some(PipelineError::Repository(_))
            | Some(PipelineError::NoRepositories) => return CONFIG_ERROR,
            Some(PipelineError::Signing(_)) => return ASSEMBLY_FAILURE,
            Some(_) => return ERROR,
            None => {}
        }
    }
    ERROR
}
