use serde::Deserialize;
use std::fmt;

/// Raw manifest document as returned by `skopeo inspect --raw`.
///
/// Only manifest lists / OCI indexes carry `manifests`; a single-platform
/// manifest deserializes with an empty list.
#[derive(Debug, Deserialize)]
pub struct RawManifest {
    #[serde(default)]
    pub manifests: Vec<ManifestEntry>,
}

/// One platform-specific entry of a manifest list
#[derive(Debug, Deserialize)]
pub struct ManifestEntry {
    #[serde(default)]
    pub platform: Option<ManifestPlatform>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ManifestPlatform {
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub architecture: String,
}

/// `os/architecture` selector for one image variant
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: String,
    pub architecture: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, architecture: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            architecture: architecture.into(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.architecture)
    }
}

impl RawManifest {
    /// Platform descriptors in manifest order, without duplicates.
    ///
    /// Entries without platform metadata yield empty components.
    pub fn platforms(&self) -> Vec<Platform> {
        let mut platforms: Vec<Platform> = Vec::new();
        for entry in &self.manifests {
            let platform = entry
                .platform
                .as_ref()
                .map(|p| Platform::new(p.os.as_str(), p.architecture.as_str()))
                .unwrap_or_else(|| Platform::new("", ""));
            if !platforms.contains(&platform) {
                platforms.push(platform);
            }
        }
        platforms
    }
}

/// Parse a raw manifest document into its platform descriptors
pub fn parse_manifest_platforms(raw: &[u8]) -> Result<Vec<Platform>, serde_json::Error> {
    let manifest: RawManifest = serde_json::from_slice(raw)?;
    Ok(manifest.platforms())
}
