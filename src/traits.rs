use std::path::PathBuf;

use async_trait::async_trait;
use semver::Version;

use crate::{error::Result, model::PackageName};

/// Something that knows which versions of a package have been published
#[async_trait]
pub trait VersionSource: Send + Sync {
    /// Raw version strings in whatever order the registry returns them
    async fn package_versions(&self, name: &PackageName) -> Result<Vec<String>>;

    fn registry_url(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    pub root_dir: PathBuf,
    pub store_dir: PathBuf,
    pub registry: String,
    pub packages: Vec<(PackageName, Version)>,
}

/// Fetches packages into a store directory
///
/// Implementations must fail the whole call if any single package fails.
#[async_trait]
pub trait Installer: Send + Sync {
    async fn install(&self, request: &InstallRequest) -> Result<()>;
}
