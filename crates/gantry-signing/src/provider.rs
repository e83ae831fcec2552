//! Detached signature provider trait

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

/// Produces detached signatures
#[async_trait]
pub trait DetachedSigner: Send + Sync {
    /// Provider name
    fn name(&self) -> &str;

    /// Extension appended to a signed file's name, without the dot
    fn signature_extension(&self) -> &str {
        "asc"
    }

    /// Write a detached signature of `file` to `signature`
    async fn sign_detached(&self, file: &Path, signature: &Path) -> Result<()>;
}
