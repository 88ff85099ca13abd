use serde::Serialize;

/// Body of the create-repository request
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct CreateRepositoryRequest {
    pub description: String,
    pub license: String,
    pub name: String,
    pub visibility: String,
}

/// Outcome of a successful provisioning call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    Created,
    AlreadyExists,
}

impl std::fmt::Display for Provisioned {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provisioned::Created => write!(f, "created"),
            Provisioned::AlreadyExists => write!(f, "already exists"),
        }
    }
}
