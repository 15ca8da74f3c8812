use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, trace};

use crate::{
    api::model::Manifest,
    error::{Result, StencilError},
    utils::{format_path, normalize_path},
};

pub const MANIFEST_FILE: &str = "package.json";

/// Find the closest directory at or above `start` that holds a manifest
pub async fn find_manifest_root(start: impl AsRef<Path>) -> Result<Option<PathBuf>> {
    let start = normalize_path(start)?;
    for dir in start.ancestors() {
        trace!("Looking for {MANIFEST_FILE} in {}", dir.display());
        match fs::metadata(dir.join(MANIFEST_FILE)).await {
            Ok(meta) if meta.is_file() => return Ok(Some(dir.to_path_buf())),
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            // NotADirectory and friends just mean there's nothing here
            Err(e) => trace!("Skipping {}: {e}", dir.display()),
        }
    }

    Ok(None)
}

/// Resolve the entry point a package's manifest declares under `main`
///
/// The result always uses forward slashes.
pub async fn get_root_file_path(start: impl AsRef<Path>) -> Result<Option<String>> {
    let Some(root) = find_manifest_root(start).await? else {
        return Ok(None);
    };

    let manifest_path = root.join(MANIFEST_FILE);
    let raw = fs::read_to_string(&manifest_path).await?;
    let manifest: Manifest =
        serde_json::from_str(&raw).map_err(|source| StencilError::ManifestParse {
            path: manifest_path.clone(),
            source,
        })?;

    let Some(main) = manifest.main.filter(|m| !m.trim().is_empty()) else {
        debug!("{} has no main field", manifest_path.display());
        return Ok(None);
    };

    let entry = normalize_path(root.join(main))?;
    debug!("Resolved entry point {}", entry.display());
    Ok(Some(format_path(entry)))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn expected(p: &Path) -> String {
        format_path(normalize_path(p).unwrap())
    }

    #[tokio::test]
    async fn resolves_main() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(MANIFEST_FILE), r#"{"main":"lib/index.js"}"#).unwrap();

        let entry = get_root_file_path(tmp.path()).await.unwrap().unwrap();
        assert_eq!(entry, expected(&tmp.path().join("lib").join("index.js")));
        assert!(!entry.contains('\\'));
    }

    #[tokio::test]
    async fn searches_upwards() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(MANIFEST_FILE), r#"{"main":"./bin/cli.js"}"#).unwrap();
        let nested = tmp.path().join("src").join("deep");
        fs::create_dir_all(&nested).unwrap();

        let root = find_manifest_root(&nested).await.unwrap().unwrap();
        assert_eq!(root, normalize_path(tmp.path()).unwrap());

        let entry = get_root_file_path(&nested).await.unwrap().unwrap();
        assert_eq!(entry, expected(&tmp.path().join("bin").join("cli.js")));
    }

    #[tokio::test]
    async fn no_manifest_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let empty = tmp.path().join("empty");
        fs::create_dir_all(&empty).unwrap();

        assert_eq!(get_root_file_path(&empty).await.unwrap(), None);
    }

    #[tokio::test]
    async fn missing_main_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(MANIFEST_FILE), r#"{"name":"tpl"}"#).unwrap();

        assert_eq!(get_root_file_path(tmp.path()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn malformed_manifest_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(MANIFEST_FILE), "{ not json").unwrap();

        let err = get_root_file_path(tmp.path()).await.unwrap_err();
        assert!(matches!(err, StencilError::ManifestParse { .. }));
    }
}
