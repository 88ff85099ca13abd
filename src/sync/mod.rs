// Sync module - resolves each listed image, provisions its destination
// repository and copies every kept platform, one image at a time.

mod copy;
mod input;

pub use copy::{copy_image, CopySummary, PlatformFilter};
pub use input::{read_image_list, ImageEntry};

use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use crate::oci::{resolve, RegistryTarget, ResolveError, ResolvedTarget};
use crate::registry::{ProvisionError, Provisioned, RepositoryProvisioner};
use crate::transfer::{ImageTransfer, TransferError};

/// Why a single line did not sync
#[derive(Debug, Error)]
pub enum LineError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error(transparent)]
    Transfer(#[from] TransferError),
}

impl LineError {
    pub fn cause(&self) -> &'static str {
        match self {
            LineError::Resolve(_) => "unroutable reference",
            LineError::Provision(_) => "repository provisioning failed",
            LineError::Transfer(err) => err.cause(),
        }
    }
}

/// A line that went through resolution (and, unless dry-running, copy)
#[derive(Debug)]
pub struct LineSuccess {
    pub target: ResolvedTarget,
    /// `None` when provisioning was skipped (dry run)
    pub provisioned: Option<Provisioned>,
    /// `None` when copying was skipped (dry run)
    pub copy: Option<CopySummary>,
}

#[derive(Debug)]
pub struct LineOutcome {
    pub entry: ImageEntry,
    pub result: Result<LineSuccess, LineError>,
}

/// Per-line outcomes of one run
#[derive(Debug, Default)]
pub struct SyncReport {
    pub outcomes: Vec<LineOutcome>,
}

impl SyncReport {
    pub fn processed(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &LineOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub filter: PlatformFilter,
    pub retry_times: u32,
    /// Resolve only: no provisioning, no copying
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            filter: PlatformFilter::default(),
            retry_times: 3,
            dry_run: false,
        }
    }
}

pub struct Syncer {
    target: RegistryTarget,
    provisioner: Arc<dyn RepositoryProvisioner>,
    transfer: Arc<dyn ImageTransfer>,
    options: SyncOptions,
}

impl Syncer {
    pub fn new(
        target: RegistryTarget,
        provisioner: Arc<dyn RepositoryProvisioner>,
        transfer: Arc<dyn ImageTransfer>,
        options: SyncOptions,
    ) -> Self {
        Self {
            target,
            provisioner,
            transfer,
            options,
        }
    }

    /// Rewrite the reference and make sure its destination repository exists
    pub async fn resolve_line(
        &self,
        reference: &str,
    ) -> Result<(ResolvedTarget, Option<Provisioned>), LineError> {
        let target = resolve(reference, &self.target)?;

        if self.options.dry_run {
            return Ok((target, None));
        }

        let provisioned = self
            .provisioner
            .ensure_repository(&target.repository_name)
            .await?;
        Ok((target, Some(provisioned)))
    }

    async fn sync_line(&self, reference: &str) -> Result<LineSuccess, LineError> {
        let (target, provisioned) = self.resolve_line(reference).await?;

        if self.options.dry_run {
            info!("Would sync {}", target);
            return Ok(LineSuccess {
                target,
                provisioned,
                copy: None,
            });
        }

        let copy = copy_image(
            self.transfer.as_ref(),
            &target.source,
            &target.destination,
            &self.options.filter,
            self.options.retry_times,
        )
        .await?;

        Ok(LineSuccess {
            target,
            provisioned,
            copy: Some(copy),
        })
    }

    /// Process every entry in order. Failures are recorded, never propagated.
    pub async fn run(&self, entries: Vec<ImageEntry>) -> SyncReport {
        let mut report = SyncReport::default();

        for entry in entries {
            info!(line = entry.line_number, "Processing {}", entry.reference);

            let result = self.sync_line(&entry.reference).await;
            match &result {
                Ok(success) => {
                    if let Some(copy) = &success.copy {
                        info!(
                            platforms = copy.copied.len(),
                            excluded = copy.excluded,
                            repository = %success.target.repository_name,
                            provisioned = ?success.provisioned,
                            "Synced {} -> {}",
                            success.target.source,
                            success.target.destination
                        );
                    }
                }
                Err(err) => {
                    error!(
                        line = entry.line_number,
                        cause = err.cause(),
                        "Failed to sync {}: {}",
                        entry.reference,
                        err
                    );
                }
            }

            report.outcomes.push(LineOutcome { entry, result });
        }

        info!(
            "Sync finished: {}/{} images succeeded",
            report.succeeded(),
            report.processed()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::copy::fake::FakeTransfer;
    use super::input::parse_image_list;
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Provisioner that records requests; named repositories already exist or fail
    #[derive(Default)]
    struct FakeProvisioner {
        existing: Vec<String>,
        rejected: Vec<String>,
        requests: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RepositoryProvisioner for FakeProvisioner {
        async fn ensure_repository(
            &self,
            repository: &str,
        ) -> Result<Provisioned, ProvisionError> {
            self.requests.lock().unwrap().push(repository.to_string());
            if self.rejected.iter().any(|r| r == repository) {
                return Err(ProvisionError::Rejected {
                    repository: repository.to_string(),
                    status: 500,
                    body: "internal error".to_string(),
                });
            }
            if self.existing.iter().any(|r| r == repository) {
                Ok(Provisioned::AlreadyExists)
            } else {
                Ok(Provisioned::Created)
            }
        }
    }

    fn syncer(
        provisioner: Arc<FakeProvisioner>,
        transfer: Arc<FakeTransfer>,
        dry_run: bool,
    ) -> Syncer {
        Syncer::new(
            RegistryTarget::new("docker.cnb.cool", "acme"),
            provisioner,
            transfer,
            SyncOptions {
                dry_run,
                ..SyncOptions::default()
            },
        )
    }

    #[tokio::test]
    async fn test_end_to_end_single_line() {
        let provisioner = Arc::new(FakeProvisioner::default());
        let transfer =
            Arc::new(FakeTransfer::default().with_manifest("mysql:5.7", &["linux/amd64"]));
        let syncer = syncer(provisioner.clone(), transfer.clone(), false);

        let entries = parse_image_list("mysql:5.7\n\n# comment\n");
        let report = syncer.run(entries).await;

        assert_eq!(report.processed(), 1);
        assert_eq!(report.succeeded(), 1);
        let success = report.outcomes[0].result.as_ref().unwrap();
        assert_eq!(success.target.repository_name, "mysql");
        assert_eq!(success.target.destination, "docker.cnb.cool/acme/mysql:5.7");
        assert_eq!(success.provisioned, Some(Provisioned::Created));
        assert_eq!(*provisioner.requests.lock().unwrap(), vec!["mysql".to_string()]);
        assert_eq!(transfer.copied()[0].1, "docker.cnb.cool/acme/mysql:5.7");
    }

    #[tokio::test]
    async fn test_existing_repository_behaves_like_created() {
        let provisioner = Arc::new(FakeProvisioner {
            existing: vec!["whyour".to_string()],
            ..Default::default()
        });
        let transfer = Arc::new(
            FakeTransfer::default().with_manifest("whyour/qinglong", &["linux/amd64"]),
        );
        let syncer = syncer(provisioner, transfer.clone(), false);

        let report = syncer.run(parse_image_list("whyour/qinglong\n")).await;

        assert_eq!(report.succeeded(), 1);
        let success = report.outcomes[0].result.as_ref().unwrap();
        assert_eq!(success.provisioned, Some(Provisioned::AlreadyExists));
        assert_eq!(transfer.copied().len(), 1);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_run() {
        let provisioner = Arc::new(FakeProvisioner {
            rejected: vec!["blocked".to_string()],
            ..Default::default()
        });
        let transfer = Arc::new(
            FakeTransfer::default()
                .with_manifest("ghcr.io/tonc/qinglong", &["linux/amd64", "linux/arm64"])
                .with_manifest("mcr.microsoft.com/windows/nanoserver", &["windows/amd64"])
                .with_manifest("redis", &["linux/amd64"]),
        );
        let syncer = syncer(provisioner.clone(), transfer.clone(), false);

        let entries = parse_image_list(
            "a/b/c/d/e\nblocked/image\nghcr.io/tonc/qinglong\nmcr.microsoft.com/windows/nanoserver\nredis\n",
        );
        let report = syncer.run(entries).await;

        assert_eq!(report.processed(), 5);
        assert_eq!(report.succeeded(), 2);

        let causes: Vec<&str> = report
            .failed()
            .map(|o| o.result.as_ref().unwrap_err().cause())
            .collect();
        assert_eq!(
            causes,
            vec![
                "unroutable reference",
                "repository provisioning failed",
                "no platforms remain",
            ]
        );

        // The unroutable line never reaches the provisioner
        assert_eq!(
            *provisioner.requests.lock().unwrap(),
            vec!["blocked", "tonc", "windows", "redis"]
        );
        assert_eq!(transfer.copied().len(), 3);
    }

    #[tokio::test]
    async fn test_dry_run_skips_side_effects() {
        let provisioner = Arc::new(FakeProvisioner::default());
        let transfer = Arc::new(FakeTransfer::default());
        let syncer = syncer(provisioner.clone(), transfer.clone(), true);

        let report = syncer.run(parse_image_list("mysql:5.7\nwhyour/qinglong\n")).await;

        assert_eq!(report.succeeded(), 2);
        assert!(provisioner.requests.lock().unwrap().is_empty());
        assert!(transfer.copied().is_empty());
        let success = report.outcomes[1].result.as_ref().unwrap();
        assert_eq!(success.target.destination, "docker.cnb.cool/acme/whyour/qinglong");
        assert!(success.provisioned.is_none());
        assert!(success.copy.is_none());
    }
}
