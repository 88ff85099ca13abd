use anyhow::{Context, Result};
use reqwest::Client;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::registry::CnbRepositoryApi;
use crate::settings::{EnvVars, Settings};
use crate::sync::{read_image_list, ImageEntry, PlatformFilter, SyncOptions, SyncReport, Syncer};
use crate::transfer::Skopeo;

/// Load settings, then the image list.
///
/// Settings come first so a misconfigured run never touches the input file.
pub fn load_job(vars: EnvVars, file: &Path) -> Result<(Settings, Vec<ImageEntry>)> {
    let settings = Settings::from_sources(vars).context("Invalid configuration")?;
    let entries = read_image_list(file)?;
    Ok((settings, entries))
}

/// Run the batch sync for every image in `file`
pub async fn handle_sync(file: &Path, dry_run: bool, fail_on_error: bool) -> Result<()> {
    let (settings, entries) = load_job(None, file)?;

    if entries.is_empty() {
        warn!("Image list {} is empty", file.display());
        return Ok(());
    }

    info!(
        group = settings.target.group(),
        host = settings.target.host(),
        "Syncing {} images from {}",
        entries.len(),
        file.display()
    );

    let provisioner = CnbRepositoryApi::new(
        Client::new(),
        &settings.registry,
        settings.target.group(),
    );
    let transfer = Skopeo::new(settings.transfer.cli.clone());

    let syncer = Syncer::new(
        settings.target.clone(),
        Arc::new(provisioner),
        Arc::new(transfer),
        SyncOptions {
            filter: PlatformFilter::new(settings.transfer.exclude_os.clone()),
            retry_times: settings.transfer.retry_times,
            dry_run,
        },
    );

    let report = syncer.run(entries).await;
    check_report(&report, fail_on_error)
}

/// Turn failed lines into an error only when asked to
fn check_report(report: &SyncReport, fail_on_error: bool) -> Result<()> {
    let failed: Vec<&str> = report
        .failed()
        .map(|outcome| outcome.entry.reference.as_str())
        .collect();

    if failed.is_empty() {
        return Ok(());
    }

    warn!("Failed images: {}", failed.join(", "));

    if fail_on_error {
        anyhow::bail!(
            "{} of {} images failed to sync",
            failed.len(),
            report.processed()
        );
    }

    Ok(())
}
