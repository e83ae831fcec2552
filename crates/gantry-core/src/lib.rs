//! Gantry Core - Core library for the native build-and-publish pipeline
//!
//! This crate provides the error taxonomy, configuration, the variant and
//! target registry, the credential store and the types shared by every
//! pipeline stage.

pub mod config;
pub mod credentials;
pub mod error;
pub mod registry;
pub mod types;

pub use config::Config;
pub use credentials::{Credentials, RepositoryCredential, Secret, SigningCredential};
pub use error::{AssemblyError, BuildError, ConfigError, GantryError, Result};
pub use registry::{Linkage, ResolvedVariant, Target, VariantRegistry};
pub use types::{
    Artifact, BuildOutput, Classifier, Coordinates, Publication, PublicationMetadata,
    SymbolArchive,
};
