use std::{
    io::{self, Cursor},
    path::{Component, Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use flate2::read::GzDecoder;
use semver::Version;
use sha2::{Digest, Sha512};
use tar::{Archive, EntryType};
use tokio::fs;
use tracing::{debug, instrument, trace, warn};

use crate::{
    api::Registry,
    core::path::{cache_dir_name, cache_dir_path},
    error::{Result, StencilError},
    model::PackageName,
    traits::{InstallRequest, Installer},
    utils::{ensure_dir, to_file_size_string},
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Installs packages by downloading and unpacking their registry tarballs
#[derive(Debug, Clone)]
pub struct TarballInstaller {
    timeout: Duration,
}

impl TarballInstaller {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn install_one(
        &self,
        registry: &Registry,
        name: &PackageName,
        version: &Version,
        store: &Path,
    ) -> Result<(), BoxError> {
        let dest = cache_dir_path(store, name, version);
        if fs::try_exists(&dest).await? {
            debug!("{} already present, nothing to do", dest.display());
            return Ok(());
        }

        let dist = registry
            .get_version_dist(name, version)
            .await?
            .ok_or_else(|| format!("registry has no tarball for {name}@{version}"))?;

        let data = registry.download(&dist.tarball).await?;
        debug!(
            "Downloaded {name}@{version} ({})",
            to_file_size_string(data.len() as u64)
        );
        if let Some(integrity) = &dist.integrity {
            verify_integrity(integrity, &data)?;
        }

        let staging = store.join(format!(
            ".{}.partial-{}",
            cache_dir_name(name, version),
            std::process::id()
        ));
        if fs::try_exists(&staging).await? {
            fs::remove_dir_all(&staging).await?;
        }
        let unpack_to = match name.tail() {
            Some(tail) => staging.join(tail),
            None => staging.clone(),
        };

        let unpacked = tokio::task::spawn_blocking(move || unpack_tarball(&data, &unpack_to))
            .await
            .map_err(|e| format!("unpack task failed: {e}"))?;
        if let Err(e) = unpacked {
            // leave nothing behind that could look like a finished install
            let _ = fs::remove_dir_all(&staging).await;
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&staging, &dest).await {
            let _ = fs::remove_dir_all(&staging).await;
            if fs::try_exists(&dest).await? {
                debug!("{} was installed concurrently", dest.display());
            } else {
                return Err(e.into());
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Installer for TarballInstaller {
    #[instrument(skip_all, fields(store = %request.store_dir.display()))]
    async fn install(&self, request: &InstallRequest) -> Result<()> {
        ensure_dir(&request.root_dir).await?;
        ensure_dir(&request.store_dir).await?;
        let registry = Registry::new(&request.registry, self.timeout)?;

        for (name, version) in &request.packages {
            debug!("Installing {name}@{version}");
            self.install_one(&registry, name, version, &request.store_dir)
                .await
                .map_err(|e| StencilError::install(name.as_str(), version, e))?;
        }

        Ok(())
    }
}

/// Check a `sha512-<base64>` subresource integrity string
fn verify_integrity(expected: &str, data: &[u8]) -> Result<(), BoxError> {
    let Some(digest) = expected
        .split_whitespace()
        .find_map(|s| s.strip_prefix("sha512-"))
    else {
        warn!("Unsupported integrity '{expected}', skipping check");
        return Ok(());
    };

    let actual = STANDARD.encode(Sha512::digest(data));
    if actual != digest {
        return Err(format!("integrity mismatch: expected sha512-{digest}, got sha512-{actual}").into());
    }

    Ok(())
}

/// Unpack a gzipped tarball, dropping the top level directory every entry lives in
fn unpack_tarball(data: &[u8], dest: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dest)?;
    let mut archive = Archive::new(GzDecoder::new(Cursor::new(data)));

    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        let Some(relative) = strip_top_level(&path) else {
            trace!("Skipping entry {}", path.display());
            continue;
        };

        let out = dest.join(relative);
        match entry.header().entry_type() {
            EntryType::Directory => std::fs::create_dir_all(&out)?,
            EntryType::Regular | EntryType::Continuous => {
                if let Some(p) = out.parent() {
                    std::fs::create_dir_all(p)?;
                }
                trace!("Extracting file to {}", out.display());
                entry.unpack(&out)?;
            }
            other => debug!("Skipping {other:?} entry {}", path.display()),
        }
    }

    Ok(())
}

fn strip_top_level(path: &Path) -> Option<PathBuf> {
    let mut components = path.components();
    components.next()?;
    let rest: PathBuf = components.collect();

    let safe = rest.components().all(|c| matches!(c, Component::Normal(_)));
    (safe && !rest.as_os_str().is_empty()).then_some(rest)
}
