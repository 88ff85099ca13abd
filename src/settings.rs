use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;
use url::Url;

use crate::oci::RegistryTarget;

const DEFAULT_REGISTRY_HOST: &str = "docker.cnb.cool";
const DEFAULT_API_URL: &str = "https://api.cnb.cool";
const DEFAULT_VISIBILITY: &str = "public";
const DEFAULT_LICENSE: &str = "MIT";
const DEFAULT_DESCRIPTION: &str = "Auto-created by sync tool";
const DEFAULT_TRANSFER_CLI: &str = "skopeo";
const DEFAULT_RETRY_TIMES: u32 = 3;
const DEFAULT_EXCLUDED_OS: &str = "windows";

/// Environment variables backing the settings. `None` reads the process
/// environment; tests pass an explicit map instead.
pub type EnvVars = Option<HashMap<String, String>>;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("failed to read configuration: {0}")]
    Source(#[from] ConfigError),
}

/// Validated runtime configuration, built once at startup
#[derive(Debug, Clone)]
pub struct Settings {
    pub target: RegistryTarget,
    pub registry: RegistrySettings,
    pub transfer: TransferSettings,
}

/// Provisioning API settings for the target registry
#[derive(Debug, Clone)]
pub struct RegistrySettings {
    /// Bearer credential for the provisioning API
    pub token: String,
    /// Base URL of the provisioning API (e.g. https://api.cnb.cool)
    pub api_url: Url,
    pub visibility: String,
    pub license: String,
    pub description: String,
}

/// Settings for the external image-transfer tool
#[derive(Debug, Clone)]
pub struct TransferSettings {
    /// Executable to invoke (skopeo or a compatible wrapper)
    pub cli: String,
    /// Retries the tool performs internally for each platform copy
    pub retry_times: u32,
    /// OS families that are never copied
    pub exclude_os: Vec<String>,
}

/// Raw `REGISTRY_*` variables before validation
#[derive(Debug, Default, Deserialize)]
struct RawRegistry {
    token: Option<String>,
    group: Option<String>,
    host: Option<String>,
    api_url: Option<String>,
    visibility: Option<String>,
    license: Option<String>,
    description: Option<String>,
}

/// Raw `SYNC_*` variables before validation
#[derive(Debug, Default, Deserialize)]
struct RawTransfer {
    transfer_cli: Option<String>,
    retry_times: Option<String>,
    exclude_os: Option<String>,
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_sources(None)
    }

    /// Load and validate settings, collecting every missing required key
    /// into a single error.
    pub fn from_sources(vars: EnvVars) -> Result<Self, SettingsError> {
        let registry: RawRegistry = load_prefixed("REGISTRY", vars.clone())?;
        let transfer: RawTransfer = load_prefixed("SYNC", vars)?;

        let token = non_empty(registry.token);
        let group = non_empty(registry.group);

        let mut missing = Vec::new();
        if token.is_none() {
            missing.push("REGISTRY_TOKEN");
        }
        if group.is_none() {
            missing.push("REGISTRY_GROUP");
        }
        let (Some(token), Some(group)) = (token, group) else {
            return Err(SettingsError::Missing(missing));
        };

        let target = RegistryTarget::new(
            non_empty(registry.host).unwrap_or_else(|| DEFAULT_REGISTRY_HOST.to_string()),
            group,
        );

        let api_url_raw =
            non_empty(registry.api_url).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = Url::parse(&api_url_raw).map_err(|e| SettingsError::Invalid {
            key: "REGISTRY_API_URL",
            reason: format!("'{}' is not a valid URL: {}", api_url_raw, e),
        })?;

        let retry_times = match non_empty(transfer.retry_times) {
            Some(value) => value.trim().parse().map_err(|_| SettingsError::Invalid {
                key: "SYNC_RETRY_TIMES",
                reason: format!("'{}' is not a non-negative integer", value),
            })?,
            None => DEFAULT_RETRY_TIMES,
        };

        let exclude_os = non_empty(transfer.exclude_os)
            .unwrap_or_else(|| DEFAULT_EXCLUDED_OS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|os| !os.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            target,
            registry: RegistrySettings {
                token,
                api_url,
                visibility: non_empty(registry.visibility)
                    .unwrap_or_else(|| DEFAULT_VISIBILITY.to_string()),
                license: non_empty(registry.license)
                    .unwrap_or_else(|| DEFAULT_LICENSE.to_string()),
                description: non_empty(registry.description)
                    .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            },
            transfer: TransferSettings {
                cli: non_empty(transfer.transfer_cli)
                    .unwrap_or_else(|| DEFAULT_TRANSFER_CLI.to_string()),
                retry_times,
                exclude_os,
            },
        })
    }

    /// Load only the destination target (group and host).
    ///
    /// Used by commands that rewrite references without talking to the
    /// registry, so the token is not required.
    pub fn target_from_sources(vars: EnvVars) -> Result<RegistryTarget, SettingsError> {
        let registry: RawRegistry = load_prefixed("REGISTRY", vars)?;
        let group = non_empty(registry.group).ok_or(SettingsError::Missing(vec!["REGISTRY_GROUP"]))?;
        Ok(RegistryTarget::new(
            non_empty(registry.host).unwrap_or_else(|| DEFAULT_REGISTRY_HOST.to_string()),
            group,
        ))
    }
}

fn load_prefixed<T: for<'de> Deserialize<'de>>(
    prefix: &str,
    vars: EnvVars,
) -> Result<T, SettingsError> {
    let config = Config::builder()
        .add_source(Environment::with_prefix(prefix).source(vars))
        .build()?;
    Ok(config.try_deserialize()?)
}

/// Treat empty values the same as unset ones
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> EnvVars {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_required_only_uses_defaults() {
        let settings =
            Settings::from_sources(vars(&[("REGISTRY_TOKEN", "secret"), ("REGISTRY_GROUP", "acme")]))
                .unwrap();

        assert_eq!(settings.registry.token, "secret");
        assert_eq!(settings.target.group(), "acme");
        assert_eq!(settings.target.host(), "docker.cnb.cool");
        assert_eq!(settings.registry.api_url.as_str(), "https://api.cnb.cool/");
        assert_eq!(settings.registry.visibility, "public");
        assert_eq!(settings.registry.license, "MIT");
        assert_eq!(settings.transfer.cli, "skopeo");
        assert_eq!(settings.transfer.retry_times, 3);
        assert_eq!(settings.transfer.exclude_os, vec!["windows".to_string()]);
    }

    #[test]
    fn test_missing_keys_are_all_listed() {
        let err = Settings::from_sources(vars(&[])).unwrap_err();
        match err {
            SettingsError::Missing(keys) => {
                assert_eq!(keys, vec!["REGISTRY_TOKEN", "REGISTRY_GROUP"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let err =
            Settings::from_sources(vars(&[("REGISTRY_TOKEN", ""), ("REGISTRY_GROUP", "acme")]))
                .unwrap_err();
        assert!(matches!(err, SettingsError::Missing(ref keys) if keys == &vec!["REGISTRY_TOKEN"]));
        assert!(err.to_string().contains("REGISTRY_TOKEN"));
    }

    #[test]
    fn test_optional_overrides() {
        let settings = Settings::from_sources(vars(&[
            ("REGISTRY_TOKEN", "secret"),
            ("REGISTRY_GROUP", "acme"),
            ("REGISTRY_HOST", "registry.example.com"),
            ("REGISTRY_API_URL", "http://127.0.0.1:8080"),
            ("REGISTRY_VISIBILITY", "private"),
            ("SYNC_TRANSFER_CLI", "/usr/local/bin/skopeo"),
            ("SYNC_RETRY_TIMES", "5"),
            ("SYNC_EXCLUDE_OS", "windows, plan9"),
        ]))
        .unwrap();

        assert_eq!(settings.target.host(), "registry.example.com");
        assert_eq!(settings.registry.api_url.as_str(), "http://127.0.0.1:8080/");
        assert_eq!(settings.registry.visibility, "private");
        assert_eq!(settings.transfer.cli, "/usr/local/bin/skopeo");
        assert_eq!(settings.transfer.retry_times, 5);
        assert_eq!(
            settings.transfer.exclude_os,
            vec!["windows".to_string(), "plan9".to_string()]
        );
    }

    #[test]
    fn test_invalid_retry_times() {
        let err = Settings::from_sources(vars(&[
            ("REGISTRY_TOKEN", "secret"),
            ("REGISTRY_GROUP", "acme"),
            ("SYNC_RETRY_TIMES", "many"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Invalid {
                key: "SYNC_RETRY_TIMES",
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_api_url() {
        let err = Settings::from_sources(vars(&[
            ("REGISTRY_TOKEN", "secret"),
            ("REGISTRY_GROUP", "acme"),
            ("REGISTRY_API_URL", "not a url"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Invalid {
                key: "REGISTRY_API_URL",
                ..
            }
        ));
    }

    #[test]
    fn test_target_without_token() {
        let target = Settings::target_from_sources(vars(&[("REGISTRY_GROUP", "acme")])).unwrap();
        assert_eq!(target.group(), "acme");
        assert_eq!(target.host(), "docker.cnb.cool");

        let err = Settings::target_from_sources(vars(&[])).unwrap_err();
        assert!(matches!(err, SettingsError::Missing(_)));
    }
}
