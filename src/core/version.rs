use semver::Version;
use tracing::{debug, warn};

use crate::{
    error::{Result, StencilError},
    model::PackageName,
    traits::VersionSource,
};

/// Turns registry version listings into concrete versions
pub struct VersionResolver<'a> {
    source: &'a dyn VersionSource,
}

impl<'a> VersionResolver<'a> {
    pub fn new(source: &'a dyn VersionSource) -> Self {
        Self { source }
    }

    /// Every published version, newest first
    pub async fn list_versions(&self, name: &PackageName) -> Result<Vec<Version>> {
        let raw = self.source.package_versions(name).await?;
        let mut versions: Vec<Version> = raw
            .iter()
            .filter_map(|v| match Version::parse(v) {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!("Ignoring invalid version '{v}' of {name}: {e}");
                    None
                }
            })
            .collect();

        // stable, so equal precedence keeps registry order
        versions.sort_by(|a, b| b.cmp_precedence(a));
        debug!("Found {} versions of {name}", versions.len());
        Ok(versions)
    }

    pub async fn list_versions_at_least(
        &self,
        name: &PackageName,
        base: &Version,
    ) -> Result<Vec<Version>> {
        Ok(self
            .list_versions(name)
            .await?
            .into_iter()
            .filter(|v| v.cmp_precedence(base).is_ge())
            .collect())
    }

    /// Highest version that is at least `base`, if any
    pub async fn resolve_latest_at_least(
        &self,
        name: &PackageName,
        base: &Version,
    ) -> Result<Option<Version>> {
        Ok(self
            .list_versions_at_least(name, base)
            .await?
            .into_iter()
            .next())
    }

    pub async fn resolve_newest(&self, name: &PackageName) -> Result<Version> {
        self.list_versions(name)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StencilError::PackageNotFound(name.to_string()))
    }
}
