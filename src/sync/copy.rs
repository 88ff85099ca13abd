// Multi-platform image copy

use tracing::{info, warn};

use crate::oci::Platform;
use crate::transfer::{ImageTransfer, TransferError};

/// Drops platforms whose OS family is excluded (case-sensitive)
#[derive(Debug, Clone)]
pub struct PlatformFilter {
    excluded_os: Vec<String>,
}

impl PlatformFilter {
    pub fn new(excluded_os: Vec<String>) -> Self {
        Self { excluded_os }
    }

    pub fn is_excluded(&self, platform: &Platform) -> bool {
        self.excluded_os.iter().any(|os| *os == platform.os)
    }

    /// Platforms that should be copied, in manifest order
    pub fn apply(&self, platforms: &[Platform]) -> Vec<Platform> {
        platforms
            .iter()
            .filter(|p| !self.is_excluded(p))
            .cloned()
            .collect()
    }
}

impl Default for PlatformFilter {
    fn default() -> Self {
        Self::new(vec!["windows".to_string()])
    }
}

/// Platforms copied for one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopySummary {
    pub copied: Vec<Platform>,
    pub excluded: usize,
}

/// Copy every kept platform of `image` to `destination`.
///
/// The first failing platform aborts the rest. Platforms copied before the
/// failure stay in the destination registry.
pub async fn copy_image(
    transfer: &dyn ImageTransfer,
    image: &str,
    destination: &str,
    filter: &PlatformFilter,
    retries: u32,
) -> Result<CopySummary, TransferError> {
    let discovered = transfer.inspect_manifest(image).await?;
    let kept = filter.apply(&discovered);
    let excluded = discovered.len() - kept.len();

    if kept.is_empty() {
        return Err(TransferError::NoPlatforms {
            image: image.to_string(),
            discovered: discovered.len(),
        });
    }

    if excluded > 0 {
        info!(image = image, excluded = excluded, "Skipping excluded platforms");
    }

    for (index, platform) in kept.iter().enumerate() {
        info!(
            platform = %platform,
            "Copying platform {}/{}: {} -> {}",
            index + 1,
            kept.len(),
            image,
            destination
        );

        if let Err(err) = transfer
            .copy_platform(image, destination, platform, retries)
            .await
        {
            if index > 0 {
                warn!(
                    image = image,
                    destination = destination,
                    "{} platform(s) already copied are left in place",
                    index
                );
            }
            return Err(err);
        }
    }

    Ok(CopySummary {
        copied: kept,
        excluded,
    })
}
