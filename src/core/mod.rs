pub mod commands;
pub mod install;
pub mod manifest;
pub mod path;
pub mod version;

use std::path::{Path, PathBuf};

use semver::Version;
use tokio::fs;
use tracing::{debug, instrument};

use crate::{
    error::{Result, StencilError},
    model::{Location, PackageDescriptor, PackageName, ResolvedPackage, VersionSpec},
    traits::{InstallRequest, Installer, VersionSource},
    utils::ensure_dir,
};

use self::version::VersionResolver;

enum State {
    Unresolved(PackageDescriptor),
    Resolved(ResolvedPackage),
}

/// A single package backed by the local cache
///
/// Lives for one command invocation. Methods take `&mut self` so only one
/// operation can be in flight at a time.
pub struct PackageCache<'a> {
    state: State,
    source: &'a dyn VersionSource,
    installer: &'a dyn Installer,
}

impl<'a> PackageCache<'a> {
    pub fn new(
        descriptor: PackageDescriptor,
        source: &'a dyn VersionSource,
        installer: &'a dyn Installer,
    ) -> Self {
        Self {
            state: State::Unresolved(descriptor),
            source,
            installer,
        }
    }

    pub fn name(&self) -> &PackageName {
        match &self.state {
            State::Unresolved(d) => &d.name,
            State::Resolved(r) => &r.name,
        }
    }

    /// The resolved package, if `prepare_version` has run
    pub fn resolved(&self) -> Option<&ResolvedPackage> {
        match &self.state {
            State::Resolved(r) => Some(r),
            State::Unresolved(_) => None,
        }
    }

    /// Make sure the cache root exists and the version is concrete
    ///
    /// Only talks to the registry the first time it's called.
    pub async fn prepare_version(&mut self) -> Result<&ResolvedPackage> {
        if let State::Unresolved(desc) = &self.state {
            let location = desc.location();
            if let Location::Cached { cache_root, .. } = &location {
                ensure_dir(cache_root).await?;
            }

            let version = match (&desc.version, &location) {
                (_, Location::Direct(_)) => None,
                (VersionSpec::Exact(v), _) => Some(v.clone()),
                (VersionSpec::Latest, _) => Some(
                    VersionResolver::new(self.source)
                        .resolve_newest(&desc.name)
                        .await?,
                ),
            };

            debug!(
                "Resolved {} {} to {}",
                desc.name,
                desc.version,
                version.as_ref().map_or("any".into(), Version::to_string)
            );
            self.state = State::Resolved(desc.clone().resolve(version));
        }

        let State::Resolved(resolved) = &self.state else {
            return Err(StencilError::Config(format!(
                "{} has no resolved version",
                self.name()
            )));
        };
        Ok(resolved)
    }

    /// Whether the package is present on disk
    pub async fn exists(&mut self) -> Result<bool> {
        let resolved = self.prepare_version().await?;
        let path = match (&resolved.location, &resolved.version) {
            (Location::Cached { cache_root, .. }, Some(v)) => {
                path::cache_dir_path(cache_root, &resolved.name, v)
            }
            (Location::Direct(target), _) => target.clone(),
            _ => return Ok(false),
        };

        debug!("Checking if {} exists", path.display());
        Ok(fs::try_exists(&path).await?)
    }

    /// Fetch the resolved version into the cache
    #[instrument(skip(self), fields(package = %self.name()))]
    pub async fn install(&mut self) -> Result<()> {
        let resolved = self.prepare_version().await?.clone();
        let version = cached_version(&resolved)?;
        self.install_version(&resolved, version).await
    }

    /// Move to the newest published version, fetching it if it isn't cached yet
    #[instrument(skip(self), fields(package = %self.name()))]
    pub async fn update(&mut self) -> Result<()> {
        let mut resolved = self.prepare_version().await?.clone();
        let cache_root = cached_root(&resolved)?.to_path_buf();

        let newest = VersionResolver::new(self.source)
            .resolve_newest(&resolved.name)
            .await?;
        let newest_path = path::cache_dir_path(&cache_root, &resolved.name, &newest);

        if fs::try_exists(&newest_path).await? {
            debug!("{}@{newest} is already cached", resolved.name);
        } else {
            self.install_version(&resolved, &newest).await?;
        }

        resolved.version = Some(newest);
        self.state = State::Resolved(resolved);
        Ok(())
    }

    /// Path of the package's entry point, with forward slashes
    pub async fn root_file_path(&mut self) -> Result<Option<String>> {
        let resolved = self.prepare_version().await?;
        let dir = match (&resolved.location, &resolved.version) {
            (Location::Cached { cache_root, .. }, Some(v)) => {
                path::artifact_root(cache_root, &resolved.name, v)
            }
            (Location::Direct(target), _) => target.clone(),
            _ => return Ok(None),
        };

        manifest::get_root_file_path(dir).await
    }

    async fn install_version(&self, resolved: &ResolvedPackage, version: &Version) -> Result<()> {
        let store_dir = cached_root(resolved)?.to_path_buf();
        let root_dir = resolved
            .install_root()
            .map_or_else(|| store_dir.clone(), Path::to_path_buf);

        let request = InstallRequest {
            root_dir,
            store_dir,
            registry: self.source.registry_url().to_string(),
            packages: vec![(resolved.name.clone(), version.clone())],
        };

        debug!("Installing {}@{version}", resolved.name);
        self.installer.install(&request).await.map_err(|e| match e {
            e @ StencilError::Install { .. } => e,
            other => StencilError::install(resolved.name.as_str(), version, other),
        })
    }
}

fn cached_root(resolved: &ResolvedPackage) -> Result<&Path> {
    resolved.cache_root().ok_or_else(|| {
        StencilError::Config(format!(
            "{} has no cache directory, only cached packages can be installed",
            resolved.name
        ))
    })
}

fn cached_version(resolved: &ResolvedPackage) -> Result<&Version> {
    cached_root(resolved)?;
    resolved
        .version
        .as_ref()
        .ok_or_else(|| StencilError::Config(format!("{} has no resolved version", resolved.name)))
}

/// A package found in a cache directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPackage {
    pub name: PackageName,
    pub version: Version,
    pub path: PathBuf,
}

/// Every package under a cache root, sorted by name then newest version first
pub async fn list_cached(cache_root: impl AsRef<Path>) -> Result<Vec<CachedPackage>> {
    let cache_root = cache_root.as_ref();
    if !fs::try_exists(cache_root).await? {
        return Ok(vec![]);
    }

    let mut found = vec![];
    let mut entries = fs::read_dir(cache_root).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let file_name = entry.file_name();
        if let Some((name, version)) = file_name.to_str().and_then(path::parse_cache_dir_name) {
            found.push(CachedPackage {
                name,
                version,
                path: entry.path(),
            });
        }
    }

    found.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| b.version.cmp_precedence(&a.version))
    });
    Ok(found)
}
