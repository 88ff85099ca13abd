pub mod cnb;
pub mod models;

pub use cnb::CnbRepositoryApi;
pub use models::Provisioned;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Repository request for '{repository}' failed: {source}")]
    Request {
        repository: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Registry rejected repository '{repository}' (status {status}): {body}")]
    Rejected {
        repository: String,
        status: u16,
        body: String,
    },
}

/// Ensures destination repositories exist in the target registry group
#[async_trait]
pub trait RepositoryProvisioner: Send + Sync {
    /// Create the repository, treating "already exists" as success
    ///
    /// # Arguments
    /// * `repository` - Repository name within the configured group (e.g., "whyour")
    async fn ensure_repository(&self, repository: &str) -> Result<Provisioned, ProvisionError>;
}
