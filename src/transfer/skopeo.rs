use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{ImageTransfer, TransferError};
use crate::oci::{parse_manifest_platforms, Platform};

/// `skopeo` invoked as a subprocess
pub struct Skopeo {
    cli: String,
}

impl Skopeo {
    pub fn new(cli: impl Into<String>) -> Self {
        Self { cli: cli.into() }
    }

    fn inspect_args(image: &str) -> Vec<String> {
        vec![
            "inspect".to_string(),
            "--raw".to_string(),
            docker_transport(image),
        ]
    }

    fn copy_args(image: &str, destination: &str, platform: &Platform, retries: u32) -> Vec<String> {
        vec![
            "copy".to_string(),
            "--all".to_string(),
            "--retry-times".to_string(),
            retries.to_string(),
            "--platform".to_string(),
            platform.to_string(),
            docker_transport(image),
            docker_transport(destination),
        ]
    }

    async fn run(&self, args: &[String]) -> Result<std::process::Output, TransferError> {
        let mut cmd = Command::new(&self.cli);
        cmd.args(args);

        debug!("Executing command: {:?}", cmd);

        cmd.output().await.map_err(|source| TransferError::Spawn {
            cli: self.cli.clone(),
            source,
        })
    }
}

fn docker_transport(reference: &str) -> String {
    format!("docker://{}", reference)
}

#[async_trait]
impl ImageTransfer for Skopeo {
    async fn inspect_manifest(&self, image: &str) -> Result<Vec<Platform>, TransferError> {
        let output = self.run(&Self::inspect_args(image)).await?;

        if !output.status.success() {
            return Err(TransferError::ManifestQuery {
                image: image.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_manifest_platforms(&output.stdout).map_err(|source| TransferError::ManifestParse {
            image: image.to_string(),
            source,
        })
    }

    async fn copy_platform(
        &self,
        image: &str,
        destination: &str,
        platform: &Platform,
        retries: u32,
    ) -> Result<(), TransferError> {
        let output = self
            .run(&Self::copy_args(image, destination, platform, retries))
            .await?;

        if !output.status.success() {
            return Err(TransferError::Copy {
                image: image.to_string(),
                destination: destination.to_string(),
                platform: platform.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        debug!(
            "Platform copy output:\n{}",
            String::from_utf8_lossy(&output.stdout)
        );
        Ok(())
    }
}
