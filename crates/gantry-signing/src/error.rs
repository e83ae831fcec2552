//! Error types for signing operations

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for signing operations
pub type Result<T> = std::result::Result<T, SigningError>;

/// Signing-related errors
///
/// Any of these fails the whole publication being signed.
#[derive(Debug, Error)]
pub enum SigningError {
    /// Signing is required but no key was provided
    #[error("Signing is required but no signing key and passphrase were provided")]
    MissingCredentials,

    /// The in-memory key could not be imported
    #[error("Failed to import signing key: {0}")]
    KeyImport(String),

    /// Signing failed
    #[error("Failed to sign {path}: {reason}")]
    SigningFailed { path: PathBuf, reason: String },

    /// Tool not found
    #[error("Signing tool not found: {tool}. {hint}")]
    ToolNotFound { tool: String, hint: String },

    /// Tool execution failed
    #[error("Signing tool failed: {tool} - {reason}")]
    ToolFailed { tool: String, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
