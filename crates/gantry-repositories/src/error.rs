//! Repository error types

use thiserror::Error;

/// Repository-related errors
///
/// Errors are scoped to one repository and never affect uploads to another.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Authentication failed
    #[error("Authentication failed for {repository}: {message}")]
    AuthenticationFailed { repository: String, message: String },

    /// The coordinate and classifier already exist in the repository
    #[error("Already published: {file}")]
    AlreadyPublished { file: String },

    /// API error from the repository
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Upload did not finish in time
    #[error("Upload of {file} timed out after {seconds}s")]
    Timeout { file: String, seconds: u64 },

    /// Invalid repository configuration
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Upload task ended unexpectedly
    #[error("Upload aborted: {0}")]
    Aborted(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type for repository operations
pub type Result<T> = std::result::Result<T, RepositoryError>;
