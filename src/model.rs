use std::{
    fmt::{self, Display},
    path::{Path, PathBuf},
    str::FromStr,
    sync::LazyLock,
};

use regex::Regex;
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::error::StencilError;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:@[a-z0-9][a-z0-9._~-]*/)?[a-z0-9][a-z0-9._~-]*$")
        .expect("Unable to build package name regex")
});

/// A registry package name, optionally scoped (`@scope/name`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageName(String);

impl PackageName {
    pub fn parse(input: &str) -> Result<Self, StencilError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(StencilError::Config("package name can't be empty".into()));
        }

        if !NAME_RE.is_match(trimmed) {
            return Err(StencilError::Config(format!(
                "'{input}' isn't a valid package name"
            )));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Everything before the first `/`, or the whole name when unscoped
    pub fn scope_or_name(&self) -> &str {
        self.0.split_once('/').map_or(self.0.as_str(), |(s, _)| s)
    }

    /// The segment after the scope separator, if there is one
    pub fn tail(&self) -> Option<&str> {
        self.0.split_once('/').map(|(_, t)| t)
    }

    pub fn is_scoped(&self) -> bool {
        self.tail().is_some()
    }
}

impl Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PackageName {
    type Err = StencilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PackageName {
    type Error = StencilError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PackageName> for String {
    fn from(value: PackageName) -> Self {
        value.0
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VersionSpec {
    #[default]
    Latest,
    Exact(Version),
}

impl FromStr for VersionSpec {
    type Err = StencilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("latest") {
            return Ok(Self::Latest);
        }

        Version::parse(s.strip_prefix('v').unwrap_or(s))
            .map(Self::Exact)
            .map_err(|e| StencilError::Config(format!("'{s}' isn't a valid version: {e}")))
    }
}

impl Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str("latest"),
            Self::Exact(v) => write!(f, "{v}"),
        }
    }
}

/// Where a package's files are expected to live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Stored under a derived directory beneath this cache root
    Cached { cache_root: PathBuf, target_path: Option<PathBuf> },
    /// Lives directly at this path, no version based path derivation
    Direct(PathBuf),
    Unlocated,
}

/// Identifies one cacheable package before its version has been resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    pub name: PackageName,
    pub version: VersionSpec,
    pub target_path: Option<PathBuf>,
    pub cache_root: Option<PathBuf>,
}

impl PackageDescriptor {
    pub fn new(name: PackageName, version: VersionSpec) -> Self {
        Self {
            name,
            version,
            target_path: None,
            cache_root: None,
        }
    }

    pub fn with_target_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.target_path = Some(path.into());
        self
    }

    pub fn with_cache_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_root = Some(path.into());
        self
    }

    /// The cache root wins over the target path when both are set
    pub fn location(&self) -> Location {
        match (&self.cache_root, &self.target_path) {
            (Some(cache_root), target_path) => Location::Cached {
                cache_root: cache_root.clone(),
                target_path: target_path.clone(),
            },
            (None, Some(target)) => Location::Direct(target.clone()),
            (None, None) => Location::Unlocated,
        }
    }

    /// Pin the descriptor to a concrete version
    pub fn resolve(self, version: Option<Version>) -> ResolvedPackage {
        let location = self.location();
        ResolvedPackage {
            name: self.name,
            version,
            location,
        }
    }
}

/// A package whose version has been made concrete
///
/// `version` is only `None` for direct installs, which don't care about versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackage {
    pub name: PackageName,
    pub version: Option<Version>,
    pub location: Location,
}

impl ResolvedPackage {
    pub fn cache_root(&self) -> Option<&Path> {
        match &self.location {
            Location::Cached { cache_root, .. } => Some(cache_root),
            _ => None,
        }
    }

    /// Directory the installer treats as its project root
    pub fn install_root(&self) -> Option<&Path> {
        match &self.location {
            Location::Cached {
                cache_root,
                target_path,
            } => Some(target_path.as_deref().unwrap_or(cache_root)),
            _ => None,
        }
    }
}

impl Display for ResolvedPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{}@{v}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}
