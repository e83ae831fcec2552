//! Filesystem repository in the Maven layout

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::fs;
use tracing::{debug, instrument};

use crate::error::{RepositoryError, Result};
use crate::transport::{RepositoryTransport, UploadRequest};

/// Repository on the local filesystem (`file://` URLs)
///
/// Released files are immutable: an existing coordinate and classifier is
/// never overwritten.
pub struct LocalRepository {
    name: String,
    root: PathBuf,
}

impl LocalRepository {
    /// Create a repository rooted at `root`
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    /// Create from a `file://` URL
    pub fn from_url(name: impl Into<String>, url: &url::Url) -> Result<Self> {
        let root = url.to_file_path().map_err(|_| {
            RepositoryError::ConfigurationError(format!("{} is not a local file URL", url))
        })?;
        Ok(Self::new(name, root))
    }

    /// Repository root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Destination of an upload
    pub fn path_for(&self, request: &UploadRequest) -> PathBuf {
        self.root.join(request.repository_path())
    }
}

#[async_trait]
impl RepositoryTransport for LocalRepository {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, request), fields(repository = %self.name, file = %request.file_name()))]
    async fn upload(&self, request: &UploadRequest) -> Result<()> {
        let dest = self.path_for(request);
        let content = fs::read(&request.file).await?;
        let sha256 = request.sha256.clone();
        let file = request.file_name();

        let bytes = content.len();
        tokio::task::spawn_blocking(move || store(&dest, &content, &sha256, file))
            .await
            .map_err(|e| RepositoryError::Aborted(e.to_string()))??;

        debug!(bytes, "stored");
        Ok(())
    }
}

/// Stage `content` next to `dest` and move it into place only if nothing is
/// there yet. A failure never leaves a file at `dest`.
fn store(dest: &Path, content: &[u8], sha256: &str, file: String) -> Result<()> {
    let dir = dest.parent().ok_or_else(|| {
        RepositoryError::ConfigurationError(format!("{} has no parent directory", dest.display()))
    })?;
    std::fs::create_dir_all(dir)?;

    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(content)?;
    staged.as_file().sync_all()?;

    if let Err(e) = staged.persist_noclobber(dest) {
        return Err(match e.error.kind() {
            ErrorKind::AlreadyExists => RepositoryError::AlreadyPublished { file },
            _ => e.error.into(),
        });
    }

    if let Err(e) = write_sidecar(dir, dest, sha256) {
        // the coordinate stays free for a retry
        let _ = std::fs::remove_file(dest);
        return Err(e.into());
    }
    Ok(())
}

fn write_sidecar(dir: &Path, dest: &Path, sha256: &str) -> std::io::Result<()> {
    let mut sidecar = dest.as_os_str().to_owned();
    sidecar.push(".sha256");

    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(sha256.as_bytes())?;
    staged.persist(PathBuf::from(sidecar)).map_err(|e| e.error)?;
    Ok(())
}
