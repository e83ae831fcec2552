//! Configuration validation

use std::collections::HashSet;

use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::registry::VariantRegistry;

use super::types::Config;

/// Validate configuration
///
/// Runs every structural check, then builds the variant registry so that
/// inheritance and target errors surface before any build starts.
pub fn validate_config(config: &Config) -> Result<()> {
    debug!("validating configuration");
    validate_library(config)?;
    validate_toolchain(config)?;
    validate_symbols(config)?;
    validate_build(config)?;
    validate_repositories(config)?;
    validate_publish(config)?;
    VariantRegistry::from_config(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.into(),
    }
}

fn validate_library(config: &Config) -> Result<()> {
    let library = &config.library;

    for (field, value) in [
        ("library.group", &library.group),
        ("library.artifact_id", &library.artifact_id),
        ("library.version", &library.version),
        ("library.packaging", &library.packaging),
        ("library.binary_name", &library.binary_name),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(field.to_string()).into());
        }
    }

    if library.binary_name.contains(['/', '\\']) {
        return Err(invalid(
            "library.binary_name",
            "must be a file name, not a path",
        )
        .into());
    }

    if library.group.contains(['/', ':']) {
        return Err(invalid("library.group", "must not contain '/' or ':'").into());
    }

    Ok(())
}

fn validate_toolchain(config: &Config) -> Result<()> {
    if config.toolchain.program.trim().is_empty() {
        return Err(ConfigError::MissingField("toolchain.program".to_string()).into());
    }

    Ok(())
}

fn validate_symbols(config: &Config) -> Result<()> {
    for pattern in &config.symbols.exclude {
        if let Err(e) = globset::Glob::new(pattern) {
            return Err(invalid("symbols.exclude", format!("'{}': {}", pattern, e)).into());
        }
    }
    Ok(())
}

fn validate_build(config: &Config) -> Result<()> {
    if config.build.concurrency == Some(0) {
        return Err(invalid("build.concurrency", "must be greater than zero").into());
    }

    if config.build.output_dir.as_os_str().is_empty() {
        return Err(ConfigError::MissingField("build.output_dir".to_string()).into());
    }

    Ok(())
}

fn validate_repositories(config: &Config) -> Result<()> {
    let mut seen = HashSet::new();

    for repo in &config.repositories {
        if repo.name.trim().is_empty() {
            return Err(ConfigError::MissingField("repositories.name".to_string()).into());
        }

        if !seen.insert(repo.name.to_lowercase()) {
            return Err(invalid(
                "repositories.name",
                format!("repository '{}' is declared more than once", repo.name),
            )
            .into());
        }

        let parsed = url::Url::parse(&repo.url)
            .map_err(|e| invalid("repositories.url", format!("'{}': {}", repo.url, e)))?;

        if !matches!(parsed.scheme(), "http" | "https" | "file") {
            return Err(invalid(
                "repositories.url",
                format!(
                    "'{}' uses unsupported scheme '{}' (expected http, https or file)",
                    repo.url,
                    parsed.scheme()
                ),
            )
            .into());
        }
    }

    Ok(())
}

fn validate_publish(config: &Config) -> Result<()> {
    if config.publish.timeout_secs == 0 {
        return Err(invalid("publish.timeout_secs", "must be greater than zero").into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RepositoryConfig, VariantConfig};
    use crate::error::GantryError;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_binary_name_must_be_file_name() {
        let mut config = Config::default();
        config.library.binary_name = "lib/libnative.so".to_string();

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("library.binary_name"));
    }

    #[test]
    fn test_missing_group() {
        let mut config = Config::default();
        config.library.group = String::new();

        assert!(matches!(
            validate_config(&config),
            Err(GantryError::Config(ConfigError::MissingField(_)))
        ));
    }

    #[test]
    fn test_invalid_exclusion_pattern() {
        let mut config = Config::default();
        config.symbols.exclude = vec!["**/[".to_string()];

        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_repository_scheme() {
        let mut config = Config::default();
        config.repositories.push(RepositoryConfig {
            name: "ftp".to_string(),
            url: "ftp://example.com/repo".to_string(),
            username_env: None,
            password_env: None,
        });

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn test_duplicate_repository() {
        let mut config = Config::default();
        for _ in 0..2 {
            config.repositories.push(RepositoryConfig {
                name: "central".to_string(),
                url: "https://repo.example.com/maven2".to_string(),
                username_env: None,
                password_env: None,
            });
        }

        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_registry_errors_surface() {
        let mut config = Config::default();
        config
            .variants
            .push(VariantConfig::new("debug").with_parent("missing"));

        assert!(matches!(
            validate_config(&config),
            Err(GantryError::Config(ConfigError::UnknownParent { .. }))
        ));
    }

    #[test]
    fn test_zero_concurrency() {
        let mut config = Config::default();
        config.build.concurrency = Some(0);

        assert!(validate_config(&config).is_err());
    }
}
