//! Core types shared by the pipeline stages

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::{DeveloperConfig, LibraryConfig, LicenseConfig, ScmConfig};
use crate::registry::Target;

/// Result of one (variant, target) build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOutput {
    /// Variant name
    pub variant: String,
    /// Target architecture
    pub target: Target,
    /// Stripped binary
    pub binary: PathBuf,
    /// Unstripped binary carrying debug symbols
    pub symbols: Option<PathBuf>,
}

/// Per-variant archive of debug symbol files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolArchive {
    /// Variant name
    pub variant: String,
    /// Archive location
    pub path: PathBuf,
    /// Archive entry names, `<target>/<file>`
    pub entries: Vec<String>,
}

/// Kind of a published file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classifier {
    /// Primary binary bundle
    Binary,
    /// Public headers
    Headers,
    /// Source bundle
    Sources,
    /// Documentation bundle
    Docs,
    /// Debug symbols
    Symbols,
    /// Metadata descriptor
    Descriptor,
}

impl Classifier {
    /// Classifier as it appears in repository file names
    pub fn repository_classifier(&self) -> Option<&'static str> {
        match self {
            Classifier::Binary | Classifier::Descriptor => None,
            Classifier::Headers => Some("headers"),
            Classifier::Sources => Some("sources"),
            Classifier::Docs => Some("javadoc"),
            Classifier::Symbols => Some("symbols"),
        }
    }
}

impl fmt::Display for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Classifier::Binary => "binary",
            Classifier::Headers => "headers",
            Classifier::Sources => "sources",
            Classifier::Docs => "docs",
            Classifier::Symbols => "symbols",
            Classifier::Descriptor => "descriptor",
        };
        f.write_str(s)
    }
}

/// Publication identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinates {
    /// Group
    pub group: String,
    /// Artifact id
    pub artifact_id: String,
    /// Version
    pub version: String,
}

impl Coordinates {
    /// Create coordinates
    pub fn new(
        group: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
        }
    }

    /// Repository file name for a classifier and extension
    pub fn file_name(&self, classifier: Option<&str>, extension: &str) -> String {
        match classifier {
            Some(c) => format!("{}-{}-{}.{}", self.artifact_id, self.version, c, extension),
            None => format!("{}-{}.{}", self.artifact_id, self.version, extension),
        }
    }

    /// Repository directory, `group/as/path/artifact/version`
    pub fn repository_path(&self) -> String {
        format!(
            "{}/{}/{}",
            self.group.replace('.', "/"),
            self.artifact_id,
            self.version
        )
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact_id, self.version)
    }
}

/// A file ready for publication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Kind
    pub classifier: Classifier,
    /// File extension, e.g. `jar` or `jar.asc`
    pub extension: String,
    /// Location on disk
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Lowercase hex SHA-256
    pub sha256: String,
}

impl Artifact {
    /// Describe an existing file, computing its size and checksum
    pub fn from_file(
        classifier: Classifier,
        extension: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> std::io::Result<Self> {
        let path = path.into();
        let (size, sha256) = sha256_file(&path)?;
        Ok(Self {
            classifier,
            extension: extension.into(),
            path,
            size,
            sha256,
        })
    }

    /// Whether this is a detached signature
    pub fn is_signature(&self) -> bool {
        self.extension.ends_with(".asc")
    }

    /// File name under the given coordinates
    pub fn file_name(&self, coordinates: &Coordinates) -> String {
        coordinates.file_name(self.classifier.repository_classifier(), &self.extension)
    }
}

/// Compute size and lowercase hex SHA-256 of a file
pub fn sha256_file(path: &Path) -> std::io::Result<(u64, String)> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    let mut size = 0u64;

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        size += n as u64;
    }

    Ok((size, hex(&hasher.finalize())))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Descriptive metadata shared by every publication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationMetadata {
    /// Human readable name
    pub name: String,
    /// Description
    pub description: Option<String>,
    /// Homepage
    pub url: Option<String>,
    /// Extension of the binary bundle
    pub packaging: String,
    /// Licenses
    pub licenses: Vec<LicenseConfig>,
    /// Developers
    pub developers: Vec<DeveloperConfig>,
    /// Source control
    pub scm: Option<ScmConfig>,
}

impl From<&LibraryConfig> for PublicationMetadata {
    fn from(library: &LibraryConfig) -> Self {
        Self {
            name: library.name.clone(),
            description: library.description.clone(),
            url: library.url.clone(),
            packaging: library.packaging.clone(),
            licenses: library.licenses.clone(),
            developers: library.developers.clone(),
            scm: library.scm.clone(),
        }
    }
}

/// An assembled, versioned set of artifacts for one variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    /// Variant this publication was assembled from
    pub variant: String,
    /// Identity
    pub coordinates: Coordinates,
    /// Descriptive metadata
    pub metadata: PublicationMetadata,
    /// Ordered artifacts, binary bundle first
    pub artifacts: Vec<Artifact>,
    /// Metadata descriptor
    pub descriptor: Artifact,
    /// Detached signatures, parallel to `artifacts`
    pub signatures: Vec<Artifact>,
    /// Detached signature of the descriptor
    pub descriptor_signature: Option<Artifact>,
}

impl Publication {
    /// Whether detached signatures are attached
    pub fn is_signed(&self) -> bool {
        self.descriptor_signature.is_some()
    }

    /// Files in upload order.
    ///
    /// Each artifact is followed by its signature, then the descriptor
    /// signature, and the descriptor comes last.
    pub fn upload_order(&self) -> Vec<&Artifact> {
        let mut order = Vec::with_capacity(self.artifacts.len() * 2 + 2);
        for (i, artifact) in self.artifacts.iter().enumerate() {
            order.push(artifact);
            if let Some(signature) = self.signatures.get(i) {
                order.push(signature);
            }
        }
        if let Some(signature) = &self.descriptor_signature {
            order.push(signature);
        }
        order.push(&self.descriptor);
        order
    }
}
