//! Maven-layout HTTP repository

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument};

use gantry_core::RepositoryCredential;

use crate::error::{RepositoryError, Result};
use crate::transport::{RepositoryTransport, UploadRequest};

/// Rejection text returned by Nexus-style repositories for existing releases
const UPDATE_REJECTED: &str = "does not allow updating";

/// Remote repository accepting `PUT` uploads in the Maven layout
pub struct MavenRepository {
    name: String,
    base_url: String,
    credential: Option<RepositoryCredential>,
    client: Client,
}

impl MavenRepository {
    /// Create a repository client
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credential: None,
            client: Client::new(),
        }
    }

    /// Authenticate uploads with basic auth
    pub fn with_credential(mut self, credential: RepositoryCredential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Use a preconfigured HTTP client
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Full URL of an upload
    pub fn url_for(&self, request: &UploadRequest) -> String {
        format!("{}/{}", self.base_url, request.repository_path())
    }

    async fn put(&self, url: &str, body: Vec<u8>) -> Result<()> {
        let mut builder = self.client.put(url).body(body);
        if let Some(credential) = &self.credential {
            builder = builder.basic_auth(
                &credential.username,
                Some(credential.password.expose()),
            );
        }

        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        Err(classify_rejection(&self.name, url, status, message))
    }
}

#[async_trait]
impl RepositoryTransport for MavenRepository {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, request), fields(repository = %self.name, file = %request.file_name()))]
    async fn upload(&self, request: &UploadRequest) -> Result<()> {
        let url = self.url_for(request);
        let body = tokio::fs::read(&request.file).await?;
        debug!(url = %url, bytes = body.len(), "uploading");

        self.put(&url, body).await?;
        self.put(&format!("{}.sha256", url), request.sha256.clone().into_bytes())
            .await?;

        info!(url = %url, "uploaded");
        Ok(())
    }
}

/// Map a non-success response to an error
fn classify_rejection(repository: &str, url: &str, status: StatusCode, message: String) -> RepositoryError {
    let file = url.rsplit('/').next().unwrap_or(url).to_string();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RepositoryError::AuthenticationFailed {
            repository: repository.to_string(),
            message: format!("{} rejected credentials", status),
        },
        StatusCode::CONFLICT => RepositoryError::AlreadyPublished { file },
        _ if message.contains(UPDATE_REJECTED) => RepositoryError::AlreadyPublished { file },
        _ => RepositoryError::ApiError {
            status: status.as_u16(),
            message,
        },
    }
}
