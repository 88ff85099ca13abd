// Source reference parsing and destination path rewriting

use std::fmt;
use tracing::debug;

use super::error::ResolveError;

/// Destination registry and group that every source image is mirrored into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryTarget {
    host: String,
    group: String,
}

impl RegistryTarget {
    pub fn new(host: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            host: host.into().trim_end_matches('/').to_string(),
            group: group.into().trim_matches('/').to_string(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// Build `<host>/<group>/<path>`
    fn destination(&self, path: &str) -> String {
        format!("{}/{}/{}", self.host, self.group, path)
    }
}

/// A source image reference classified by its `/`-separated segments.
///
/// Only the last segment may carry a tag or digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageShape<'a> {
    /// `mysql`, `mysql:5.7`
    Bare { name: &'a str },
    /// `whyour/qinglong`
    Owned { owner: &'a str, name: &'a str },
    /// `ghcr.io/tonc/qinglong`
    Hosted {
        host: &'a str,
        owner: &'a str,
        name: &'a str,
    },
    /// `registry.example.com/org/tonc/qinglong`
    Nested {
        host: &'a str,
        namespace: &'a str,
        owner: &'a str,
        name: &'a str,
    },
}

impl<'a> ImageShape<'a> {
    pub fn parse(reference: &'a str) -> Result<Self, ResolveError> {
        if reference.is_empty() {
            return Err(ResolveError::Empty);
        }

        let segments: Vec<&str> = reference.split('/').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(ResolveError::EmptySegment(reference.to_string()));
        }

        match segments[..] {
            [name] => Ok(ImageShape::Bare { name }),
            [owner, name] => Ok(ImageShape::Owned { owner, name }),
            [host, owner, name] => Ok(ImageShape::Hosted { host, owner, name }),
            [host, namespace, owner, name] => Ok(ImageShape::Nested {
                host,
                namespace,
                owner,
                name,
            }),
            _ => Err(ResolveError::UnsupportedShape {
                reference: reference.to_string(),
                segments: segments.len(),
            }),
        }
    }

    /// Repository that must exist in the target group before pushing
    pub fn repository_name(&self) -> &'a str {
        match *self {
            ImageShape::Bare { name } => strip_tag(name),
            ImageShape::Owned { owner, .. } => owner,
            ImageShape::Hosted { owner, .. } => owner,
            ImageShape::Nested { owner, .. } => owner,
        }
    }

    /// Path below `<host>/<group>/` that the image is pushed to.
    /// The source host and any outer namespace are dropped.
    pub fn destination_path(&self) -> String {
        match *self {
            ImageShape::Bare { name } => name.to_string(),
            ImageShape::Owned { owner, name }
            | ImageShape::Hosted { owner, name, .. }
            | ImageShape::Nested { owner, name, .. } => format!("{}/{}", owner, name),
        }
    }

    /// Leading segments that do not survive the rewrite
    pub fn dropped_prefix(&self) -> Option<String> {
        match *self {
            ImageShape::Bare { .. } | ImageShape::Owned { .. } => None,
            ImageShape::Hosted { host, .. } => Some(host.to_string()),
            ImageShape::Nested {
                host, namespace, ..
            } => Some(format!("{}/{}", host, namespace)),
        }
    }
}

/// Text before the first `:` or `@`
fn strip_tag(name: &str) -> &str {
    name.split([':', '@']).next().unwrap_or(name)
}

/// Repository to provision and fully-qualified push target for one source image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub source: String,
    pub repository_name: String,
    pub destination: String,
}

impl fmt::Display for ResolvedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} (repository: {})",
            self.source, self.destination, self.repository_name
        )
    }
}

/// Rewrite a source reference into its mirror location
///
/// # Example
/// With host `docker.cnb.cool` and group `acme`:
/// `ghcr.io/tonc/qinglong` resolves to repository `tonc` and destination
/// `docker.cnb.cool/acme/tonc/qinglong`.
pub fn resolve(reference: &str, target: &RegistryTarget) -> Result<ResolvedTarget, ResolveError> {
    let reference = reference.trim();
    let shape = ImageShape::parse(reference)?;

    if let Some(prefix) = shape.dropped_prefix() {
        debug!("Dropping source prefix '{}' from {}", prefix, reference);
    }

    Ok(ResolvedTarget {
        source: reference.to_string(),
        repository_name: shape.repository_name().to_string(),
        destination: target.destination(&shape.destination_path()),
    })
}
