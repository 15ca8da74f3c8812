use owo_colors::OwoColorize;
use semver::Version;
use tracing::debug;

use crate::{
    api::Registry,
    config::Config,
    core::version::VersionResolver,
    error::{Result, StencilError},
    model::PackageName,
    traits::VersionSource,
};

/// A published stencil release newer than the running one, if any
pub async fn check_for_update(config: &Config) -> Result<Option<Version>> {
    let Some(pkg) = config.update_check() else {
        return Ok(None);
    };
    let registry = Registry::new(config.registry(), config.timeout())?;
    newer_than(&registry, &PackageName::parse(pkg)?, env!("CARGO_PKG_VERSION")).await
}

async fn newer_than(
    source: &dyn VersionSource,
    name: &PackageName,
    current: &str,
) -> Result<Option<Version>> {
    let current = Version::parse(current)
        .map_err(|e| StencilError::Config(format!("bad current version '{current}': {e}")))?;
    debug!("Checking {name} for releases newer than {current}");

    let latest = VersionResolver::new(source)
        .resolve_latest_at_least(name, &current)
        .await?;
    Ok(latest.filter(|v| v.cmp_precedence(&current).is_gt()))
}

/// Print a notice when a newer release exists; never fails the command
pub async fn notify_update(config: &Config) {
    match check_for_update(config).await {
        Ok(Some(latest)) => {
            println!(
                "A new version of stencil is available! {} -> {}",
                env!("CARGO_PKG_VERSION").bright_yellow(),
                latest.bright_yellow()
            );
            if let Some(pkg) = config.update_check() {
                println!("Update {} to get it", pkg.bright_cyan());
            }
        }
        Ok(None) => debug!("No stencil update available"),
        Err(e) => debug!("Update check failed: {e}"),
    }
}
