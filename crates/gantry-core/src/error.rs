//! Error types for Gantry

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using GantryError
pub type Result<T> = std::result::Result<T, GantryError>;

/// Main error type for Gantry operations
#[derive(Debug, Error)]
pub enum GantryError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Native build errors
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Symbol collection and assembly errors
    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
///
/// Every variant of this enum is fatal and is raised before any build starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found at {0}")]
    NotFound(PathBuf),

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// Missing required field
    #[error("Missing required configuration field: {0}")]
    MissingField(String),

    /// Variant declared twice
    #[error("Variant '{0}' is declared more than once")]
    DuplicateVariant(String),

    /// Variant refers to a parent that does not exist
    #[error("Variant '{variant}' inherits from unknown variant '{parent}'")]
    UnknownParent { variant: String, parent: String },

    /// Variant inheritance loops back on itself
    #[error("Variant inheritance cycle: {0}")]
    InheritanceCycle(String),

    /// Variant requested that is not registered
    #[error("Unknown variant: {0}")]
    UnknownVariant(String),

    /// Target outside the fixed architecture set
    #[error("Unknown target '{name}' (supported: {supported})")]
    UnknownTarget { name: String, supported: String },

    /// Target known but not enabled for the selection
    #[error("Target '{target}' is not enabled for variant '{variant}'")]
    TargetNotEnabled { variant: String, target: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from a single (variant, target) native build
#[derive(Debug, Error)]
pub enum BuildError {
    /// The toolchain could not be started or exited unsuccessfully
    #[error("Toolchain failed for {variant}/{target}: {reason}")]
    Toolchain {
        variant: String,
        target: String,
        exit_code: Option<i32>,
        reason: String,
    },

    /// The toolchain reported success but the binary is absent
    #[error("Toolchain succeeded for {variant}/{target} but {path} was not produced")]
    MissingOutput {
        variant: String,
        target: String,
        path: PathBuf,
    },

    /// The toolchain did not finish in time
    #[error("Toolchain for {variant}/{target} timed out after {seconds}s")]
    Timeout {
        variant: String,
        target: String,
        seconds: u64,
    },

    /// The build task itself aborted
    #[error("Build task for {variant}/{target} aborted: {reason}")]
    Aborted {
        variant: String,
        target: String,
        reason: String,
    },

    /// IO error while preparing the output directory
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// The (variant, target) pair this error belongs to, when known
    pub fn key(&self) -> Option<(&str, &str)> {
        match self {
            Self::Toolchain {
                variant, target, ..
            }
            | Self::MissingOutput {
                variant, target, ..
            }
            | Self::Timeout {
                variant, target, ..
            }
            | Self::Aborted {
                variant, target, ..
            } => Some((variant, target)),
            Self::Io(_) => None,
        }
    }
}

/// Errors raised while collecting symbols or assembling a publication
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// No symbol files survived filtering although some were expected
    #[error("No symbol files left for variant '{variant}' after applying exclusions")]
    EmptyArchive { variant: String },

    /// A bundle configured as required could not be produced
    #[error("Required {bundle} bundle for variant '{variant}' is missing: {reason}")]
    MissingBundle {
        variant: String,
        bundle: String,
        reason: String,
    },

    /// There are no build outputs to package
    #[error("Variant '{0}' has no binaries to package")]
    NoBinaries(String),

    /// Two outputs claim the same target
    #[error("Variant '{variant}' has more than one output for target '{target}'")]
    DuplicateOutput { variant: String, target: String },

    /// Archive writer failure
    #[error("Failed to write archive {path}: {reason}")]
    Archive { path: PathBuf, reason: String },

    /// Invalid exclusion pattern
    #[error("Invalid exclusion pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
