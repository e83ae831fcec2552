//! Pipeline error types

use thiserror::Error;

use gantry_core::{AssemblyError, ConfigError};
use gantry_repositories::RepositoryError;
use gantry_signing::SigningError;

/// Errors that stop a run before any build starts
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid configuration or selection
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Signing was requested but cannot be set up
    #[error(transparent)]
    Signing(#[from] SigningError),

    /// A repository cannot be set up
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Publication was requested but no repository is configured
    #[error("Publishing requested but no repositories are configured")]
    NoRepositories,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a single variant after its builds finished
#[derive(Debug, Error)]
pub enum StageError {
    /// Symbol collection or assembly failed
    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    /// Signing failed; the publication was not uploaded
    #[error(transparent)]
    Signing(#[from] SigningError),

    /// A stage task ended unexpectedly
    #[error("Stage aborted: {0}")]
    Aborted(String),
}

/// Result type for pipeline setup
pub type Result<T> = std::result::Result<T, PipelineError>;
