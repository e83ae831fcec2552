//! Publication manager: uploads one publication to every repository

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use gantry_core::config::RepositoryConfig;
use gantry_core::{Coordinates, Credentials, Publication};

use crate::error::{RepositoryError, Result};
use crate::local::LocalRepository;
use crate::maven::MavenRepository;
use crate::transport::{RepositoryTransport, UploadRequest};

/// Proof of a completed publication to one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReceipt {
    /// Repository name
    pub repository: String,
    /// Published identity
    pub coordinates: Coordinates,
    /// Uploaded file names, in upload order
    pub files: Vec<String>,
    /// When the last file was accepted
    pub uploaded_at: DateTime<Utc>,
}

/// Outcome of publishing to one repository
#[derive(Debug)]
pub enum RepositoryOutcome {
    /// Every file was accepted
    Published(UploadReceipt),
    /// The version already exists; nothing was replaced
    AlreadyPublished { file: String },
    /// The upload failed
    Failed(RepositoryError),
}

impl RepositoryOutcome {
    /// Whether the publication reached the repository
    pub fn is_success(&self) -> bool {
        matches!(self, RepositoryOutcome::Published(_))
    }
}

/// Outcome for one named repository
#[derive(Debug)]
pub struct RepositoryReport {
    /// Repository name
    pub repository: String,
    /// What happened
    pub outcome: RepositoryOutcome,
}

/// Result of publishing one publication everywhere
#[derive(Debug)]
pub struct PublishReport {
    /// Published identity
    pub coordinates: Coordinates,
    /// One entry per repository, in configuration order
    pub repositories: Vec<RepositoryReport>,
}

impl PublishReport {
    /// Receipts of successful repositories
    pub fn receipts(&self) -> impl Iterator<Item = &UploadReceipt> {
        self.repositories.iter().filter_map(|r| match &r.outcome {
            RepositoryOutcome::Published(receipt) => Some(receipt),
            _ => None,
        })
    }

    /// Repositories that did not receive the publication
    pub fn failures(&self) -> impl Iterator<Item = &RepositoryReport> {
        self.repositories.iter().filter(|r| !r.outcome.is_success())
    }

    /// Whether every repository accepted the publication
    pub fn is_success(&self) -> bool {
        self.repositories.iter().all(|r| r.outcome.is_success())
    }
}

/// Uploads publications to the configured repositories
pub struct PublicationManager {
    transports: Vec<Arc<dyn RepositoryTransport>>,
    timeout: Duration,
}

impl PublicationManager {
    /// Create a manager with no repositories
    pub fn new(timeout: Duration) -> Self {
        Self {
            transports: Vec::new(),
            timeout,
        }
    }

    /// Add a repository
    pub fn with_transport(mut self, transport: Arc<dyn RepositoryTransport>) -> Self {
        self.transports.push(transport);
        self
    }

    /// Build transports from configuration.
    ///
    /// `file://` URLs become local repositories, anything else a Maven HTTP
    /// repository authenticated with the credentials stored under its name.
    pub fn from_config(
        repositories: &[RepositoryConfig],
        credentials: &Credentials,
        timeout: Duration,
    ) -> Result<Self> {
        let mut manager = Self::new(timeout);

        for repository in repositories {
            let url = url::Url::parse(&repository.url).map_err(|e| {
                RepositoryError::ConfigurationError(format!(
                    "repository '{}' has an invalid url: {}",
                    repository.name, e
                ))
            })?;

            let transport: Arc<dyn RepositoryTransport> = if url.scheme() == "file" {
                Arc::new(LocalRepository::from_url(&repository.name, &url)?)
            } else {
                let mut maven = MavenRepository::new(&repository.name, &repository.url);
                match credentials.repository(&repository.name) {
                    Some(credential) => maven = maven.with_credential(credential.clone()),
                    None => warn!(repository = %repository.name, "no credentials, uploading anonymously"),
                }
                Arc::new(maven)
            };
            manager.transports.push(transport);
        }

        Ok(manager)
    }

    /// Configured repository names
    pub fn repositories(&self) -> Vec<&str> {
        self.transports.iter().map(|t| t.name()).collect()
    }

    /// Whether any repository is configured
    pub fn is_empty(&self) -> bool {
        self.transports.is_empty()
    }

    /// Publish to every repository concurrently.
    ///
    /// Each repository runs in its own task; a failure or timeout in one
    /// never cancels another.
    #[instrument(skip(self, publication), fields(coordinates = %publication.coordinates))]
    pub async fn publish(&self, publication: &Publication) -> PublishReport {
        let requests: Arc<Vec<UploadRequest>> = Arc::new(
            publication
                .upload_order()
                .into_iter()
                .map(|artifact| UploadRequest::new(&publication.coordinates, artifact))
                .collect(),
        );

        let handles: Vec<_> = self
            .transports
            .iter()
            .map(|transport| {
                let transport = Arc::clone(transport);
                let requests = Arc::clone(&requests);
                let coordinates = publication.coordinates.clone();
                let timeout = self.timeout;
                let name = transport.name().to_string();
                let handle = tokio::spawn(async move {
                    publish_to(transport.as_ref(), &coordinates, &requests, timeout).await
                });
                (name, handle)
            })
            .collect();

        let mut repositories = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => RepositoryOutcome::Failed(RepositoryError::Aborted(e.to_string())),
            };
            match &outcome {
                RepositoryOutcome::Published(receipt) => {
                    info!(repository = %name, files = receipt.files.len(), "published")
                }
                RepositoryOutcome::AlreadyPublished { file } => {
                    warn!(repository = %name, file = %file, "version already published")
                }
                RepositoryOutcome::Failed(e) => {
                    warn!(repository = %name, error = %e, "publication failed")
                }
            }
            repositories.push(RepositoryReport {
                repository: name,
                outcome,
            });
        }

        PublishReport {
            coordinates: publication.coordinates.clone(),
            repositories,
        }
    }
}

/// Upload every file in order, stopping at the first failure
async fn publish_to(
    transport: &dyn RepositoryTransport,
    coordinates: &Coordinates,
    requests: &[UploadRequest],
    timeout: Duration,
) -> RepositoryOutcome {
    let mut files = Vec::with_capacity(requests.len());

    for request in requests {
        let result = match tokio::time::timeout(timeout, transport.upload(request)).await {
            Ok(result) => result,
            Err(_) => Err(RepositoryError::Timeout {
                file: request.file_name(),
                seconds: timeout.as_secs(),
            }),
        };

        match result {
            Ok(()) => files.push(request.file_name()),
            Err(RepositoryError::AlreadyPublished { file }) => {
                return RepositoryOutcome::AlreadyPublished { file };
            }
            Err(e) => return RepositoryOutcome::Failed(e),
        }
    }

    RepositoryOutcome::Published(UploadReceipt {
        repository: transport.name().to_string(),
        coordinates: coordinates.clone(),
        files,
        uploaded_at: Utc::now(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use gantry_core::config::LibraryConfig;
    use gantry_core::{Artifact, Classifier, PublicationMetadata};
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records every upload, optionally failing on a file
    pub struct RecordingTransport {
        name: String,
        fail_on: Option<String>,
        delay: Option<Duration>,
        pub uploads: Mutex<Vec<String>>,
    }

    impl RecordingTransport {
        pub fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                fail_on: None,
                delay: None,
                uploads: Mutex::new(Vec::new()),
            }
        }

        pub fn failing_on(mut self, file: &str) -> Self {
            self.fail_on = Some(file.to_string());
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    #[async_trait]
    impl RepositoryTransport for RecordingTransport {
        fn name(&self) -> &str {
            &self.name
        }

        async fn upload(&self, request: &UploadRequest) -> Result<()> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let file = request.file_name();
            if self.fail_on.as_deref() == Some(file.as_str()) {
                return Err(RepositoryError::ApiError {
                    status: 500,
                    message: "storage unavailable".to_string(),
                });
            }
            self.uploads.lock().unwrap().push(file);
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
            ],
            descriptor: file("native-1.0.pom", Classifier::Descriptor, "pom"),
            signatures: vec![
                file("native-1.0.zip.asc", Classifier::Binary, "zip.asc"),
                file("native-1.0-headers.jar.asc", Classifier::Headers, "jar.asc"),
            ],
            descriptor_signature: Some(file("native-1.0.pom.asc", Classifier::Descriptor, "pom.asc")),
        }
    }

    #[tokio::test]
    async fn test_upload_independence() {
        let temp = TempDir::new().unwrap();
        let good = Arc::new(RecordingTransport::new("good"));
        let bad = Arc::new(RecordingTransport::new("bad").failing_on("native-1.0-headers.jar"));

        let manager = PublicationManager::new(Duration::from_secs(5))
            .with_transport(bad.clone())
            .with_transport(good.clone());

        let report = manager.publish(&publication(temp.path())).await;

        assert_eq!(report.receipts().count(), 1);
        assert_eq!(report.failures().count(), 1);
        assert!(!report.is_success());
        assert_eq!(report.repositories[0].repository, "bad");
        assert!(matches!(
            report.repositories[0].outcome,
            RepositoryOutcome::Failed(RepositoryError::ApiError { status: 500, .. })
        ));

        let uploads = good.uploads.lock().unwrap().clone();
        assert_eq!(
            uploads,
            vec![
                "native-1.0.zip",
                "native-1.0.zip.asc",
                "native-1.0-headers.jar",
                "native-1.0-headers.jar.asc",
                "native-1.0.pom.asc",
                "native-1.0.pom",
            ]
        );
        assert_eq!(bad.uploads.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_timeout_fails_only_slow_repository() {
        let temp = TempDir::new().unwrap();
        let slow = Arc::new(RecordingTransport::new("slow").with_delay(Duration::from_secs(2)));
        let fast = Arc::new(RecordingTransport::new("fast"));

        let manager = PublicationManager::new(Duration::from_millis(100))
            .with_transport(slow)
            .with_transport(fast);

        let report = manager.publish(&publication(temp.path())).await;
        assert!(matches!(
            report.repositories[0].outcome,
            RepositoryOutcome::Failed(RepositoryError::Timeout { .. })
        ));
        assert!(report.repositories[1].outcome.is_success());
    }

    #[tokio::test]
    async fn test_republish_to_local_repository() {
        let temp = TempDir::new().unwrap();
        let repo_dir = TempDir::new().unwrap();
        let manager = PublicationManager::new(Duration::from_secs(5))
            .with_transport(Arc::new(LocalRepository::new("local", repo_dir.path())));
        let publication = publication(temp.path());

        let first = manager.publish(&publication).await;
        assert!(first.is_success());
        let receipt = first.receipts().next().unwrap();
        assert_eq!(receipt.files.last().map(String::as_str), Some("native-1.0.pom"));

        let second = manager.publish(&publication).await;
        match &second.repositories[0].outcome {
            RepositoryOutcome::AlreadyPublished { file } => assert_eq!(file, "native-1.0.zip"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_from_config() {
        let repo_dir = TempDir::new().unwrap();
        let repositories = vec![
            RepositoryConfig {
                name: "ossrh".to_string(),
                url: "https://repo.example.com/releases".to_string(),
                username_env: None,
                password_env: None,
            },
            RepositoryConfig {
                name: "local".to_string(),
                url: url::Url::from_directory_path(repo_dir.path())
                    .unwrap()
                    .to_string(),
                username_env: None,
                password_env: None,
            },
        ];
        let credentials = Credentials::new().with_repository("ossrh", "deployer", "token");

        let manager =
            PublicationManager::from_config(&repositories, &credentials, Duration::from_secs(1))
                .unwrap();
        assert_eq!(manager.repositories(), vec!["ossrh", "local"]);
    }

    #[test]
    fn test_from_config_invalid_url() {
        let repositories = vec![RepositoryConfig {
            name: "broken".to_string(),
            url: "not a url".to_string(),
            username_env: None,
            password_env: None,
        }];

        let result =
            PublicationManager::from_config(&repositories, &Credentials::new(), Duration::from_secs(1));
        assert!(matches!(result, Err(RepositoryError::ConfigurationError(_))));
    }
}
