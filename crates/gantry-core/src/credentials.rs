//! Credential store for repositories and signing
//!
//! Credentials are resolved once at startup from environment variables and an
//! optional TOML secrets file, then shared read-only. Secrets never show up in
//! `Debug` output.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::ConfigError;

/// A secret string whose `Debug` output is redacted
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the underlying value
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Username and secret for one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryCredential {
    /// Username or actor
    pub username: String,
    /// Password or token
    pub password: Secret,
}

/// In-memory signing key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningCredential {
    /// ASCII-armored private key
    pub key: Secret,
    /// Key passphrase
    pub passphrase: Secret,
}

/// Immutable credential store
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    repositories: HashMap<String, RepositoryCredential>,
    signing: Option<SigningCredential>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SecretsFile {
    repositories: HashMap<String, SecretsRepository>,
    signing: Option<SecretsSigning>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SecretsRepository {
    username: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SecretsSigning {
    key: Option<String>,
    passphrase: Option<String>,
}

impl Credentials {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add repository credentials
    pub fn with_repository(
        mut self,
        name: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.repositories.insert(
            name.into(),
            RepositoryCredential {
                username: username.into(),
                password: Secret::new(password),
            },
        );
        self
    }

    /// Add signing credentials
    pub fn with_signing(mut self, key: impl Into<String>, passphrase: impl Into<String>) -> Self {
        self.signing = Some(SigningCredential {
            key: Secret::new(key),
            passphrase: Secret::new(passphrase),
        });
        self
    }

    /// Resolve credentials from the process environment
    pub fn from_env(config: &Config, root: &Path) -> Result<Self, ConfigError> {
        Self::resolve(config, root, |name| std::env::var(name).ok())
    }

    /// Resolve credentials with an explicit variable lookup.
    ///
    /// For every field the environment wins over the secrets file. A
    /// repository gets credentials only when both username and password are
    /// found; having exactly one of them is an error. The same applies to the
    /// signing key and passphrase.
    #[instrument(skip(config, root, lookup), fields(root = %root.display()))]
    pub fn resolve<F>(config: &Config, root: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match &config.credentials.secrets_file {
            Some(path) => read_secrets_file(&root.join(path))?,
            None => SecretsFile::default(),
        };

        let prefix = &config.credentials.env_prefix;
        let mut credentials = Self::new();

        for repo in &config.repositories {
            let from_file = file.repositories.get(&repo.name);

            let user_var = repo
                .username_env
                .clone()
                .unwrap_or_else(|| env_name(prefix, &repo.name, "USERNAME"));
            let pass_var = repo
                .password_env
                .clone()
                .unwrap_or_else(|| env_name(prefix, &repo.name, "PASSWORD"));

            let username = non_empty(lookup(&user_var))
                .or_else(|| from_file.and_then(|f| f.username.clone()));
            let password = non_empty(lookup(&pass_var))
                .or_else(|| from_file.and_then(|f| f.password.clone()));

            match (username, password) {
                (Some(username), Some(password)) => {
                    debug!(repository = %repo.name, "repository credentials resolved");
                    credentials = credentials.with_repository(&repo.name, username, password);
                }
                (None, None) => {
                    debug!(repository = %repo.name, "no repository credentials");
                }
                (Some(_), None) => return Err(ConfigError::MissingField(pass_var)),
                (None, Some(_)) => return Err(ConfigError::MissingField(user_var)),
            }
        }

        let key_var = config
            .credentials
            .signing_key_env
            .clone()
            .unwrap_or_else(|| format!("{}_SIGNING_KEY", prefix));
        let passphrase_var = config
            .credentials
            .signing_passphrase_env
            .clone()
            .unwrap_or_else(|| format!("{}_SIGNING_PASSWORD", prefix));

        let file_signing = file.signing.as_ref();
        let key = non_empty(lookup(&key_var)).or_else(|| file_signing.and_then(|s| s.key.clone()));
        let passphrase = non_empty(lookup(&passphrase_var))
            .or_else(|| file_signing.and_then(|s| s.passphrase.clone()));

        match (key, passphrase) {
            (Some(key), Some(passphrase)) => {
                debug!("signing credentials resolved");
                credentials = credentials.with_signing(key, passphrase);
            }
            (None, None) => debug!("no signing credentials, publications will be unsigned"),
            (Some(_), None) => return Err(ConfigError::MissingField(passphrase_var)),
            (None, Some(_)) => return Err(ConfigError::MissingField(key_var)),
        }

        Ok(credentials)
    }

    /// Credentials for a repository
    pub fn repository(&self, name: &str) -> Option<&RepositoryCredential> {
        self.repositories.get(name)
    }

    /// Signing credentials
    pub fn signing(&self) -> Option<&SigningCredential> {
        self.signing.as_ref()
    }

    /// Whether signing credentials are present
    pub fn can_sign(&self) -> bool {
        self.signing.is_some()
    }
}

fn env_name(prefix: &str, repository: &str, suffix: &str) -> String {
    let repository = repository.to_uppercase().replace(['.', '-', '/', ' '], "_");
    format!("{}_{}_{}", prefix, repository, suffix)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn read_secrets_file(path: &Path) -> Result<SecretsFile, ConfigError> {
    debug!(path = %path.display(), "reading secrets file");
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
        _ => ConfigError::Io(e),
    })?;
    Ok(toml::from_str(&content)?)
}
