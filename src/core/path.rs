//! On-disk naming of cached packages.
//!
//! A cached package lives in `<root>/_<name with / as _>@<version>@<scope or name>`.
//! The format is shared with existing caches so it must not change.

use std::path::{Path, PathBuf};

use semver::Version;

use crate::model::PackageName;

pub fn cache_dir_name(name: &PackageName, version: &Version) -> String {
    format!(
        "_{}@{}@{}",
        name.as_str().replace('/', "_"),
        version,
        name.scope_or_name()
    )
}

pub fn cache_dir_path(root: impl AsRef<Path>, name: &PackageName, version: &Version) -> PathBuf {
    root.as_ref().join(cache_dir_name(name, version))
}

/// Directory holding the package files, scoped packages sit one level deeper
pub fn artifact_root(root: impl AsRef<Path>, name: &PackageName, version: &Version) -> PathBuf {
    let dir = cache_dir_path(root, name, version);
    match name.tail() {
        Some(tail) => dir.join(tail),
        None => dir,
    }
}

/// Recover the name and version from a cache directory name
pub fn parse_cache_dir_name(dir_name: &str) -> Option<(PackageName, Version)> {
    let rest = dir_name.strip_prefix('_')?;
    // names and versions never contain '@' outside the scope marker
    let (name, version) = match rest.split('@').collect::<Vec<_>>()[..] {
        [sanitized, version, _] => (sanitized.to_string(), version),
        ["", sanitized, version, "", scope] => {
            let tail = sanitized.strip_prefix(scope)?.strip_prefix('_')?;
            (format!("@{scope}/{tail}"), version)
        }
        _ => return None,
    };
    let version = Version::parse(version).ok()?;

    let name = PackageName::parse(&name).ok()?;
    // reject anything that doesn't round trip exactly
    (cache_dir_name(&name, &version) == dir_name).then_some((name, version))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn name(s: &str) -> PackageName {
        PackageName::parse(s).unwrap()
    }

    #[test]
    fn scoped_dir_name() {
        let v = Version::new(1, 1, 0);
        assert_eq!(cache_dir_name(&name("@scope/tpl"), &v), "_@scope_tpl@1.1.0@@scope");
        assert_eq!(
            cache_dir_path("/cache", &name("@scope/tpl"), &v),
            Path::new("/cache/_@scope_tpl@1.1.0@@scope")
        );
        assert_eq!(
            artifact_root("/cache", &name("@scope/tpl"), &v),
            Path::new("/cache/_@scope_tpl@1.1.0@@scope/tpl")
        );
    }

    #[test]
    fn plain_dir_name() {
        let v = Version::parse("2.0.0-beta.1").unwrap();
        assert_eq!(cache_dir_name(&name("tpl"), &v), "_tpl@2.0.0-beta.1@tpl");
        assert_eq!(
            artifact_root("/cache", &name("tpl"), &v),
            cache_dir_path("/cache", &name("tpl"), &v)
        );
    }

    #[test]
    fn names_dont_collide() {
        let names = [
            "a_b",
            "a-b",
            "@a/b_c",
            "@a_b/c",
            "@a/b",
            "@a/b-c",
            "@scope/tpl",
            "@scope_tpl/x",
        ];
        let versions = ["1.0.0", "1.0.1", "1.0.0-rc.1", "10.0.0"];

        let mut seen = HashSet::new();
        for n in names {
            for v in versions {
                let v = Version::parse(v).unwrap();
                let n = name(n);
                assert!(
                    seen.insert(artifact_root("/c", &n, &v)),
                    "{n}@{v} collided"
                );
                assert_eq!(cache_dir_name(&n, &v), cache_dir_name(&n, &v));
            }
        }
    }

    #[test]
    fn dir_name_round_trips() {
        for (n, v) in [("@scope/tpl", "1.1.0"), ("tpl", "0.0.1"), ("@a/b_c", "3.0.0")] {
            let n = name(n);
            let v = Version::parse(v).unwrap();
            assert_eq!(parse_cache_dir_name(&cache_dir_name(&n, &v)), Some((n, v)));
        }
    }

    #[test]
    fn foreign_dir_names_are_ignored() {
        for junk in ["node_modules", "_tpl@latest@tpl", "_tpl@1.0.0@other", ".staging"] {
            assert_eq!(parse_cache_dir_name(junk), None, "{junk}");
        }
    }
}
