use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info};

use super::models::{CreateRepositoryRequest, Provisioned};
use super::{ProvisionError, RepositoryProvisioner};
use crate::settings::RegistrySettings;

/// Repository provisioning through the CNB open API
///
/// Repositories are created with `POST {api_url}/{group}/-/repos`.
/// A `409 Conflict` means the repository is already there.
pub struct CnbRepositoryApi {
    http_client: Client,
    repos_url: String,
    authorization: String,
    visibility: String,
    license: String,
    description: String,
}

impl CnbRepositoryApi {
    pub fn new(http_client: Client, settings: &RegistrySettings, group: &str) -> Self {
        Self {
            http_client,
            repos_url: format!(
                "{}/{}/-/repos",
                settings.api_url.as_str().trim_end_matches('/'),
                group
            ),
            authorization: authorization_header(&settings.token),
            visibility: settings.visibility.clone(),
            license: settings.license.clone(),
            description: settings.description.clone(),
        }
    }

    fn request_body(&self, repository: &str) -> CreateRepositoryRequest {
        CreateRepositoryRequest {
            description: self.description.clone(),
            license: self.license.clone(),
            name: repository.to_string(),
            visibility: self.visibility.clone(),
        }
    }
}

/// Tokens are sent as bearer credentials unless they already carry the scheme
fn authorization_header(token: &str) -> String {
    let token = token.trim();
    let has_scheme = token
        .get(..7)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("bearer "));
    if has_scheme {
        token.to_string()
    } else {
        format!("Bearer {}", token)
    }
}

#[async_trait]
impl RepositoryProvisioner for CnbRepositoryApi {
    async fn ensure_repository(&self, repository: &str) -> Result<Provisioned, ProvisionError> {
        debug!("POST {} (repository: {})", self.repos_url, repository);

        let response = self
            .http_client
            .post(&self.repos_url)
            .header("accept", "application/json")
            .header("Authorization", &self.authorization)
            .json(&self.request_body(repository))
            .send()
            .await
            .map_err(|source| ProvisionError::Request {
                repository: repository.to_string(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::CONFLICT {
            info!(repository = repository, "Repository already exists");
            return Ok(Provisioned::AlreadyExists);
        }

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProvisionError::Rejected {
                repository: repository.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        info!(repository = repository, "Created repository");
        Ok(Provisioned::Created)
    }
}
