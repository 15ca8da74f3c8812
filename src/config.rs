use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Duration,
};

use directories::BaseDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    api::DEFAULT_REGISTRY,
    error::{Result, StencilError},
};

pub const CONFIG_FILE: &str = ".stencil.toml";
pub const ENV_PREFIX: &str = "STENCIL_";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    cli_home: String,
    registry: String,
    #[serde(default)]
    target_path: Option<PathBuf>,
    interpreter: String,
    commands: BTreeMap<String, String>,
    #[serde(default)]
    update_check: Option<String>,
    timeout_secs: u64,
    #[serde(default)]
    debug: bool,
    #[serde(skip)]
    home: PathBuf,
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cli_home: ".stencil".into(),
            registry: DEFAULT_REGISTRY.into(),
            target_path: None,
            interpreter: "node".into(),
            commands: BTreeMap::from([("init".to_string(), "@stencil-cli/init".to_string())]),
            update_check: None,
            timeout_secs: 30,
            debug: false,
            home: PathBuf::new(),
            config_path: None,
        }
    }
}

impl Config {
    /// Load the configuration for the current user
    pub fn load() -> Result<Self> {
        let dirs = BaseDirs::new()
            .ok_or_else(|| StencilError::Config("unable to find the user home directory".into()))?;
        Self::load_from(dirs.home_dir())
    }

    /// Layer defaults, `<home>/.stencil.toml` and `STENCIL_*` variables
    pub fn load_from(home: impl AsRef<Path>) -> Result<Self> {
        let home = home.as_ref();
        if !home.is_dir() {
            return Err(StencilError::Config(format!(
                "home directory {} doesn't exist",
                home.display()
            )));
        }

        let file = home.join(CONFIG_FILE);
        let mut config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(&file))
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .map_err(|e| StencilError::Config(e.to_string()))?;

        config.home = home.to_path_buf();
        config.config_path = file.is_file().then_some(file);
        debug!("Loaded config {config:?}");
        Ok(config)
    }

    /// Root of everything stencil writes, `<home>/<cli_home>`
    pub fn home_path(&self) -> PathBuf {
        self.home.join(&self.cli_home)
    }

    /// Working root handed to the installer
    pub fn dependencies_dir(&self) -> PathBuf {
        self.home_path().join("dependencies")
    }

    pub fn cache_root(&self) -> PathBuf {
        self.dependencies_dir().join("node_modules")
    }

    pub fn registry(&self) -> &str {
        &self.registry
    }

    pub fn target_path(&self) -> Option<&Path> {
        self.target_path.as_deref()
    }

    pub fn set_target_path(&mut self, path: impl Into<PathBuf>) {
        self.target_path = Some(path.into());
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    /// Package implementing a command
    pub fn command_package(&self, command: &str) -> Option<&str> {
        self.commands.get(command).map(String::as_str)
    }

    pub fn update_check(&self) -> Option<&str> {
        self.update_check.as_deref().filter(|s| !s.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }
}
