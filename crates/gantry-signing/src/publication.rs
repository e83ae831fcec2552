//! Signing whole publications

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, instrument, warn};

use gantry_core::config::SigningConfig;
use gantry_core::{Artifact, Credentials, Publication};

use crate::error::{Result, SigningError};
use crate::provider::DetachedSigner;
use crate::providers::gpg::GpgSigner;

/// Build a signer from the resolved credentials.
///
/// Returns `Ok(None)` when no signing key was provided and signing is not
/// required.
pub async fn signer_from_credentials(
    credentials: &Credentials,
    config: &SigningConfig,
) -> Result<Option<Arc<dyn DetachedSigner>>> {
    let Some(credential) = credentials.signing() else {
        if config.required {
            return Err(SigningError::MissingCredentials);
        }
        return Ok(None);
    };

    let signer = GpgSigner::from_credential(&config.gpg_path, credential).await?;
    Ok(Some(Arc::new(signer)))
}

/// Sign a publication if signing credentials are available.
///
/// Without credentials the publication is returned unchanged, unless
/// `config.required` is set.
pub async fn sign(
    publication: Publication,
    credentials: &Credentials,
    config: &SigningConfig,
) -> Result<Publication> {
    match signer_from_credentials(credentials, config).await? {
        Some(signer) => sign_publication(publication, signer.as_ref()).await,
        None => {
            info!(variant = %publication.variant, "no signing key provided, publishing unsigned");
            Ok(publication)
        }
    }
}

/// Attach a detached signature to every artifact and the descriptor.
///
/// Signatures are written next to the signed files. Either every file is
/// signed or none is: on failure, signatures written so far are removed.
#[instrument(skip(publication, signer), fields(variant = %publication.variant, signer = signer.name()))]
pub async fn sign_publication(
    mut publication: Publication,
    signer: &dyn DetachedSigner,
) -> Result<Publication> {
    let mut written: Vec<PathBuf> = Vec::new();

    let result = async {
        let mut signatures = Vec::with_capacity(publication.artifacts.len());
        for artifact in &publication.artifacts {
            signatures.push(sign_artifact(artifact, signer, &mut written).await?);
        }
        let descriptor = sign_artifact(&publication.descriptor, signer, &mut written).await?;
        Ok::<_, SigningError>((signatures, descriptor))
    }
    .await;

    match result {
        Ok((signatures, descriptor)) => {
            info!(signatures = signatures.len() + 1, "publication signed");
            publication.signatures = signatures;
            publication.descriptor_signature = Some(descriptor);
            Ok(publication)
        }
        Err(e) => {
            for path in &written {
                if let Err(remove) = tokio::fs::remove_file(path).await {
                    warn!(path = %path.display(), error = %remove, "failed to remove partial signature");
                }
            }
            Err(e)
        }
    }
}

async fn sign_artifact(
    artifact: &Artifact,
    signer: &dyn DetachedSigner,
    written: &mut Vec<PathBuf>,
) -> Result<Artifact> {
    let extension = signer.signature_extension();
    let signature = signature_path(&artifact.path, extension);

    written.push(signature.clone());
    signer.sign_detached(&artifact.path, &signature).await?;

    Artifact::from_file(
        artifact.classifier,
        format!("{}.{}", artifact.extension, extension),
        &signature,
    )
    .map_err(|e| SigningError::SigningFailed {
        path: artifact.path.clone(),
        reason: format!("signature not readable: {}", e),
    })
}

fn signature_path(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gantry_core::config::LibraryConfig;
    use gantry_core::{Classifier, Coordinates, PublicationMetadata};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Writes a fake armored signature
    struct FakeSigner;

    #[async_trait]
    impl DetachedSigner for FakeSigner {
        fn name(&self) -> &str {
            "fake"
        }

        async fn sign_detached(&self, file: &Path, signature: &Path) -> Result<()> {
            let body = format!(
                "-----BEGIN PGP SIGNATURE-----\n{}\n-----END PGP SIGNATURE-----\n",
                file.display()
            );
            tokio::fs::write(signature, body).await?;
            Ok(())
        }
    }

    /// Signs `succeed` files, then fails
    struct FailingSigner {
        succeed: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DetachedSigner for FailingSigner {
        fn name(&self) -> &str {
            "failing"
        }

        async fn sign_detached(&self, file: &Path, signature: &Path) -> Result<()> {
            if self.calls.fetch_add(1, Ordering::SeqCst) >= self.succeed {
                return Err(SigningError::SigningFailed {
                    path: file.to_path_buf(),
                    reason: "bad passphrase".to_string(),
                });
            }
            tokio::fs::write(signature, b"sig").await?;
            Ok(())
        }
    }

    fn publication(dir: &Path) -> Publication {
        let file = |name: &str, classifier: Classifier, extension: &str| {
            let path = dir.join(name);
            std::fs::write(&path, name.as_bytes()).unwrap();
            Artifact::from_file(classifier, extension, path).unwrap()
        };

        Publication {
            variant: "release".to_string(),
            coordinates: Coordinates::new("org.example", "native", "1.0"),
            metadata: PublicationMetadata::from(&LibraryConfig::default()),
            artifacts: vec![
                file("native-1.0.zip", Classifier::Binary, "zip"),
                file("native-1.0-headers.jar", Classifier::Headers, "jar"),
                file("native-1.0-symbols.jar", Classifier::Symbols, "jar"),
            ],
            descriptor: file("native-1.0.pom", Classifier::Descriptor, "pom"),
            signatures: Vec::new(),
            descriptor_signature: None,
        }
    }

    #[tokio::test]
    async fn test_every_artifact_gets_a_signature() {
        let temp = TempDir::new().unwrap();
        let signed = sign_publication(publication(temp.path()), &FakeSigner)
            .await
            .unwrap();

        assert!(signed.is_signed());
        assert_eq!(signed.signatures.len(), signed.artifacts.len());
        for (artifact, signature) in signed.artifacts.iter().zip(&signed.signatures) {
            assert_eq!(signature.classifier, artifact.classifier);
            assert_eq!(signature.extension, format!("{}.asc", artifact.extension));
            assert!(signature.is_signature());
            assert!(signature.path.is_file());
        }

        let descriptor = signed.descriptor_signature.as_ref().unwrap();
        assert_eq!(descriptor.extension, "pom.asc");
        assert_eq!(descriptor.path, temp.path().join("native-1.0.pom.asc"));
    }

    #[tokio::test]
    async fn test_failure_removes_partial_signatures() {
        let temp = TempDir::new().unwrap();
        let signer = FailingSigner {
            succeed: 2,
            calls: AtomicUsize::new(0),
        };

        let err = sign_publication(publication(temp.path()), &signer)
            .await
            .unwrap_err();
        assert!(matches!(err, SigningError::SigningFailed { .. }));

        let leftovers: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "asc"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_unsigned_without_credentials() {
        let temp = TempDir::new().unwrap();
        let original = publication(temp.path());

        let result = sign(original.clone(), &Credentials::new(), &SigningConfig::default())
            .await
            .unwrap();
        assert_eq!(result, original);
        assert!(!result.is_signed());
    }

    #[tokio::test]
    async fn test_required_signing_without_credentials() {
        let temp = TempDir::new().unwrap();
        let config = SigningConfig {
            required: true,
            ..SigningConfig::default()
        };

        let err = sign(publication(temp.path()), &Credentials::new(), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, SigningError::MissingCredentials));
    }

    #[test]
    fn test_signature_path() {
        assert_eq!(
            signature_path(Path::new("/dist/native-1.0.zip"), "asc"),
            PathBuf::from("/dist/native-1.0.zip.asc")
        );
    }
}
