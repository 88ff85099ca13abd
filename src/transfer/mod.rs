// Image transfer tool abstraction (manifest inspection and per-platform copy)

mod skopeo;

pub use skopeo::Skopeo;

use async_trait::async_trait;
use thiserror::Error;

use crate::oci::Platform;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Failed to execute {cli}: {source}")]
    Spawn {
        cli: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to inspect manifest of {image}: {stderr}")]
    ManifestQuery { image: String, stderr: String },

    #[error("Failed to parse manifest of {image}: {source}")]
    ManifestParse {
        image: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("No platforms remain for {image} ({discovered} discovered, all excluded)")]
    NoPlatforms { image: String, discovered: usize },

    #[error("Failed to copy {platform} of {image} to {destination}: {stderr}")]
    Copy {
        image: String,
        destination: String,
        platform: String,
        stderr: String,
    },
}

impl TransferError {
    /// Short cause label used in logs
    pub fn cause(&self) -> &'static str {
        match self {
            TransferError::Spawn { .. } => "tool unavailable",
            TransferError::ManifestQuery { .. } => "manifest query failed",
            TransferError::ManifestParse { .. } => "manifest parse failed",
            TransferError::NoPlatforms { .. } => "no platforms remain",
            TransferError::Copy { .. } => "copy failed",
        }
    }
}

/// External tool that reads manifests and copies images between registries
#[async_trait]
pub trait ImageTransfer: Send + Sync {
    /// List the platform descriptors of a source image's manifest list
    async fn inspect_manifest(&self, image: &str) -> Result<Vec<Platform>, TransferError>;

    /// Copy a single platform of `image` to `destination`
    async fn copy_platform(
        &self,
        image: &str,
        destination: &str,
        platform: &Platform,
        retries: u32,
    ) -> Result<(), TransferError>;
}
