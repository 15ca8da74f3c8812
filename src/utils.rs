use std::{
    io,
    path::{Component, Path, PathBuf},
};

use tokio::fs;
use tracing::debug;

pub async fn ensure_dir(dir: impl AsRef<Path>) -> io::Result<()> {
    let dir = dir.as_ref();

    debug!("Checking if path '{}' exists", dir.display());
    if !fs::try_exists(dir).await? {
        debug!("Path '{}' doesn't exist, creating it", dir.display());
        // create_dir_all is fine with another process winning the race
        fs::create_dir_all(dir).await?;
    } else {
        debug!("Path '{}' already exists", dir.display());
    }

    Ok(())
}

/// Render a path with forward slashes whatever the host separator is
pub fn format_path(path: impl AsRef<Path>) -> String {
    with_forward_slashes(&path.as_ref().to_string_lossy(), std::path::MAIN_SEPARATOR)
}

fn with_forward_slashes(raw: &str, separator: char) -> String {
    if separator == '/' {
        raw.to_string()
    } else {
        raw.replace(separator, "/")
    }
}

/// Make a path absolute and drop `.` and `..` components without touching the filesystem
pub fn normalize_path(path: impl AsRef<Path>) -> io::Result<PathBuf> {
    let absolute = std::path::absolute(path.as_ref())?;
    let mut out = PathBuf::new();
    for c in absolute.components() {
        match c {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }

    Ok(out)
}

pub fn to_file_size_string(size: u64) -> String {
    if size / 1_000_000 >= 1 {
        let size = size as f64 / 1_048_576f64;

        format!("{:.2} MB", size)
    } else {
        let size = size as f64 / 1024f64;
        format!("{:.2} KB", size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_drops_dots() {
        let base = std::path::absolute("/tmp").unwrap();
        let p = normalize_path(base.join("pkg").join(".").join("lib").join("..").join("index.js"))
            .unwrap();
        assert_eq!(p, base.join("pkg").join("index.js"));
    }

    #[test]
    fn format_uses_forward_slashes() {
        let p = Path::new("a").join("b").join("c.js");
        assert_eq!(format_path(&p), "a/b/c.js");

        assert_eq!(
            with_forward_slashes(r"C:\Users\me\tpl\lib\index.js", '\\'),
            "C:/Users/me/tpl/lib/index.js"
        );
        assert_eq!(with_forward_slashes("/home/me/tpl", '/'), "/home/me/tpl");
    }

    #[test]
    fn file_sizes() {
        assert_eq!(to_file_size_string(2048), "2.00 KB");
        assert_eq!(to_file_size_string(3 * 1_048_576), "3.00 MB");
    }

    #[tokio::test]
    async fn ensure_dir_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("a").join("b");
        ensure_dir(&dir).await.unwrap();
        ensure_dir(&dir).await.unwrap();
        assert!(dir.is_dir());
    }
}
