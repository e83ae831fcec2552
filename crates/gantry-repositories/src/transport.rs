//! Repository transport trait

use std::path::PathBuf;

use async_trait::async_trait;

use gantry_core::{Artifact, Classifier, Coordinates};

use crate::error::Result;

/// One file to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Publication identity
    pub coordinates: Coordinates,
    /// Kind of file
    pub classifier: Classifier,
    /// Extension, e.g. `jar` or `jar.asc`
    pub extension: String,
    /// File on disk
    pub file: PathBuf,
    /// Lowercase hex SHA-256 of the file
    pub sha256: String,
}

impl UploadRequest {
    /// Request for an artifact of a publication
    pub fn new(coordinates: &Coordinates, artifact: &Artifact) -> Self {
        Self {
            coordinates: coordinates.clone(),
            classifier: artifact.classifier,
            extension: artifact.extension.clone(),
            file: artifact.path.clone(),
            sha256: artifact.sha256.clone(),
        }
    }

    /// Repository file name, `<artifact>-<version>[-<classifier>].<ext>`
    pub fn file_name(&self) -> String {
        self.coordinates
            .file_name(self.classifier.repository_classifier(), &self.extension)
    }

    /// Path relative to the repository root
    pub fn repository_path(&self) -> String {
        format!("{}/{}", self.coordinates.repository_path(), self.file_name())
    }
}

/// Uploads files to one artifact repository
#[async_trait]
pub trait RepositoryTransport: Send + Sync {
    /// Repository name, as configured
    fn name(&self) -> &str;

    /// Upload one file. Never retried by callers.
    async fn upload(&self, request: &UploadRequest) -> Result<()>;
}
