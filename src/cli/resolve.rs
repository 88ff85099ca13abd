use anyhow::{Context, Result};

use crate::oci::{resolve, RegistryTarget};
use crate::settings::{EnvVars, Settings};

/// Print where each reference would be mirrored. Never contacts the registry.
pub fn handle_resolve(references: &[String]) -> Result<()> {
    let target = Settings::target_from_sources(None).context("Invalid configuration")?;
    for line in resolve_lines(&target, references)? {
        println!("{}", line);
    }
    Ok(())
}

fn resolve_lines(target: &RegistryTarget, references: &[String]) -> Result<Vec<String>> {
    references
        .iter()
        .map(|reference| {
            let resolved = resolve(reference, target)?;
            Ok(format!(
                "{}\t{}\t{}",
                resolved.source, resolved.repository_name, resolved.destination
            ))
        })
        .collect()
}

/// Validate the environment without running a sync
pub fn handle_check_config(vars: EnvVars) -> Result<()> {
    let settings = Settings::from_sources(vars).context("Invalid configuration")?;
    println!("✓ Configuration is valid");
    println!("  Target: {}/{}", settings.target.host(), settings.target.group());
    println!("  API: {}", settings.registry.api_url);
    println!(
        "  Transfer: {} (retries: {}, excluded OS: {})",
        settings.transfer.cli,
        settings.transfer.retry_times,
        settings.transfer.exclude_os.join(", ")
    );
    Ok(())
}
