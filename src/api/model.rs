use indexmap::IndexMap;
use serde::{Deserialize, Serialize, de::IgnoredAny};

/// The subset of a registry package document stencil reads when listing
///
/// Only the keys of `versions` matter here, in the order the registry sent them.
#[derive(Deserialize, Debug, Clone)]
pub struct PackageDocument {
    pub name: Option<String>,
    pub versions: IndexMap<String, IgnoredAny>,
}

/// Same document, with each version entry kept as raw JSON until one is needed
#[derive(Deserialize, Debug, Clone)]
pub(crate) struct RawPackageDocument {
    pub versions: IndexMap<String, serde_json::Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct VersionEntry {
    #[serde(default)]
    pub dist: Option<Dist>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Dist {
    pub tarball: String,
    #[serde(default)]
    pub integrity: Option<String>,
}

/// `package.json` as far as stencil cares
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Manifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub main: Option<String>,
}
