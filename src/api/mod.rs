use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use semver::Version;
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, warn};

pub mod model;

use model::{Dist, PackageDocument, RawPackageDocument, VersionEntry};

use crate::{
    error::{Result, StencilError},
    model::PackageName,
    traits::VersionSource,
};

pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";

const USER_AGENT: &str = concat!("stencil/", env!("CARGO_PKG_VERSION"));

/// Client for an npm style package registry
#[derive(Debug, Clone)]
pub struct Registry {
    client: Client,
    base_url: String,
}

impl Registry {
    pub fn new(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| StencilError::Config(format!("unable to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn package_url(&self, name: &PackageName) -> String {
        format!("{}/{}", self.base_url, name)
    }

    /// Fetch the registry document for a package
    ///
    /// Returns `None` when the registry doesn't know the package.
    pub async fn get_package_info(&self, name: &PackageName) -> Result<Option<PackageDocument>> {
        self.fetch_document(name).await
    }

    /// Distribution info for one published version
    ///
    /// Other version entries are never parsed, so a broken old release can't
    /// get in the way. Returns `None` when the package or version is unknown.
    pub async fn get_version_dist(
        &self,
        name: &PackageName,
        version: &Version,
    ) -> Result<Option<Dist>> {
        let Some(doc) = self.fetch_document::<RawPackageDocument>(name).await? else {
            return Ok(None);
        };
        let Some(entry) = doc.versions.get(&version.to_string()) else {
            debug!("Registry has no version {version} of {name}");
            return Ok(None);
        };

        let entry = Option::<VersionEntry>::deserialize(entry).map_err(|e| {
            StencilError::registry(name.as_str(), format!("version {version} is malformed: {e}"))
        })?;
        Ok(entry.and_then(|e| e.dist))
    }

    async fn fetch_document<T: DeserializeOwned>(&self, name: &PackageName) -> Result<Option<T>> {
        let url = self.package_url(name);
        debug!("Fetching package info from {url}");
        let res = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| StencilError::registry(name.as_str(), e))?;

        if res.status() == StatusCode::NOT_FOUND {
            debug!("Registry has no package {name}");
            return Ok(None);
        }

        if !res.status().is_success() {
            warn!("Got bad response from registry: {}", res.status());
            return Err(StencilError::registry(
                name.as_str(),
                format!("{} at URL {url}", res.status()),
            ));
        }

        let body = res
            .text()
            .await
            .map_err(|e| StencilError::registry(name.as_str(), e))?;
        let doc = serde_json::from_str::<T>(&body).map_err(|e| {
            StencilError::registry(name.as_str(), format!("response body was malformed: {e}"))
        })?;

        Ok(Some(doc))
    }

    /// Download a file into memory
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, reqwest::Error> {
        debug!("Starting download from {url}");
        let res = self.client.get(url).send().await?.error_for_status()?;
        let bytes = res.bytes().await?;
        debug!("Downloaded {} bytes", bytes.len());

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl VersionSource for Registry {
    async fn package_versions(&self, name: &PackageName) -> Result<Vec<String>> {
        Ok(self
            .get_package_info(name)
            .await?
            .map(|doc| doc.versions.into_keys().collect())
            .unwrap_or_default())
    }

    fn registry_url(&self) -> &str {
        &self.base_url
    }
}
