//! GPG detached signatures with an in-memory key

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, instrument};

use gantry_core::{Secret, SigningCredential};

use crate::error::{Result, SigningError};
use crate::provider::DetachedSigner;

/// GPG signer using a private, throwaway keyring
///
/// The key is imported into a temporary `GNUPGHOME` that is deleted when the
/// signer is dropped, so nothing touches the user's keyring.
pub struct GpgSigner {
    gpg_path: String,
    home: TempDir,
    fingerprint: String,
    passphrase: Secret,
}

impl GpgSigner {
    /// Import the key and prepare a signer
    #[instrument(skip(credential), fields(provider = "gpg"))]
    pub async fn from_credential(gpg_path: &str, credential: &SigningCredential) -> Result<Self> {
        let gpg_path = resolve_gpg(gpg_path)?;
        let home = tempfile::Builder::new().prefix("gantry-gnupg-").tempdir()?;
        restrict_permissions(home.path())?;

        let import = run_gpg(
            &gpg_path,
            home.path(),
            &[
                "--batch",
                "--pinentry-mode",
                "loopback",
                "--passphrase-fd",
                "0",
                "--import",
            ],
            Some(format!(
                "{}\n{}",
                credential.passphrase.expose(),
                credential.key.expose()
            )),
        )
        .await;
        if let Err(e) = import {
            return Err(SigningError::KeyImport(e.to_string()));
        }

        let listing = run_gpg(
            &gpg_path,
            home.path(),
            &["--batch", "--with-colons", "--list-secret-keys"],
            None,
        )
        .await?;
        let fingerprint = parse_fingerprint(&listing).ok_or_else(|| {
            SigningError::KeyImport("no secret key found in the provided key material".to_string())
        })?;

        info!(fingerprint = %fingerprint, "signing key imported");
        Ok(Self {
            gpg_path,
            home,
            fingerprint,
            passphrase: credential.passphrase.clone(),
        })
    }

    /// Fingerprint of the imported key
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

#[async_trait]
impl DetachedSigner for GpgSigner {
    fn name(&self) -> &str {
        "gpg"
    }

    #[instrument(skip(self), fields(provider = "gpg", path = %file.display()))]
    async fn sign_detached(&self, file: &Path, signature: &Path) -> Result<()> {
        let file_str = file.to_string_lossy();
        let signature_str = signature.to_string_lossy();
        let args = [
            "--batch",
            "--yes",
            "--pinentry-mode",
            "loopback",
            "--passphrase-fd",
            "0",
            "--local-user",
            self.fingerprint.as_str(),
            "--armor",
            "--detach-sign",
            "--output",
            signature_str.as_ref(),
            file_str.as_ref(),
        ];

        run_gpg(
            &self.gpg_path,
            self.home.path(),
            &args,
            Some(format!("{}\n", self.passphrase.expose())),
        )
        .await
        .map_err(|e| SigningError::SigningFailed {
            path: file.to_path_buf(),
            reason: e.to_string(),
        })?;

        debug!(signature = %signature.display(), "detached signature written");
        Ok(())
    }
}

fn resolve_gpg(gpg_path: &str) -> Result<String> {
    let path = PathBuf::from(gpg_path);
    if path.components().count() > 1 {
        if path.is_file() {
            return Ok(gpg_path.to_string());
        }
    } else if let Ok(found) = which::which(gpg_path) {
        return Ok(found.to_string_lossy().into_owned());
    }

    Err(SigningError::ToolNotFound {
        tool: gpg_path.to_string(),
        hint: "Install GnuPG or set signing.gpg_path".to_string(),
    })
}

#[cfg(unix)]
fn restrict_permissions(dir: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_dir: &Path) -> Result<()> {
    Ok(())
}

/// Run gpg against a private home, feeding `input` on stdin
async fn run_gpg(gpg_path: &str, home: &Path, args: &[&str], input: Option<String>) -> Result<String> {
    debug!(?args, "running gpg");

    let mut child = Command::new(gpg_path)
        .arg("--homedir")
        .arg(home)
        .args(args)
        .env("GNUPGHOME", home)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
        stdin.write_all(input.as_bytes()).await?;
        stdin.shutdown().await?;
    }

    let output = child.wait_with_output().await?;
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if !output.status.success() {
        return Err(SigningError::ToolFailed {
            tool: "gpg".to_string(),
            reason: if stderr.trim().is_empty() { stdout } else { stderr },
        });
    }

    Ok(stdout)
}

/// First secret key fingerprint in `--with-colons` output
fn parse_fingerprint(listing: &str) -> Option<String> {
    let mut in_secret_key = false;
    for line in listing.lines() {
        let mut fields = line.split(':');
        match fields.next() {
            Some("sec") => in_secret_key = true,
            Some("fpr") if in_secret_key => {
                return fields.nth(8).filter(|f| !f.is_empty()).map(str::to_string);
            }
            Some("ssb") | Some("pub") => in_secret_key = false,
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fingerprint() {
        let listing = "\
sec:u:255:22:1234567890ABCDEF:1700000000:::u:::scESC:::+:::ed25519:::0:
fpr:::::::::0123456789ABCDEF0123456789ABCDEF01234567:
grp:::::::::AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA:
uid:u::::1700000000::HASH::Release Bot <release@example.com>::::::::::0:
ssb:u:255:18:FEDCBA0987654321:1700000000::::::e:::+:::cv25519::
fpr:::::::::FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF:
";
        assert_eq!(
            parse_fingerprint(listing).as_deref(),
            Some("0123456789ABCDEF0123456789ABCDEF01234567")
        );
    }

    #[test]
    fn test_parse_fingerprint_without_secret_key() {
        assert!(parse_fingerprint("pub:u:255:22:ABCDEF:::\nfpr:::::::::ABCDEF:\n").is_none());
    }

    #[tokio::test]
    async fn test_missing_gpg_binary() {
        let credential = SigningCredential {
            key: Secret::new("key"),
            passphrase: Secret::new("pass"),
        };

        let result = GpgSigner::from_credential("./definitely/not/gpg", &credential).await;
        assert!(matches!(result, Err(SigningError::ToolNotFound { .. })));
    }
}
