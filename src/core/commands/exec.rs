use std::{collections::BTreeMap, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::{
    api::Registry,
    config::Config,
    core::{PackageCache, install::TarballInstaller},
    error::{Result, StencilError},
    model::{PackageDescriptor, PackageName, VersionSpec},
};

/// Loads the entry point named by argv[1] and calls it with the JSON in argv[2]
const LOADER: &str = "require(process.argv[1]).call(null, JSON.parse(process.argv[2]))";

/// What a command package receives on its command line
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ExecArgs {
    pub command: String,
    pub args: Vec<String>,
    pub options: BTreeMap<String, serde_json::Value>,
}

impl ExecArgs {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: vec![],
            options: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

/// Build the descriptor for the package implementing `command`
///
/// A configured target path means a local checkout is used as-is,
/// otherwise the package comes from the cache.
pub fn descriptor_for(config: &Config, command: &str) -> Result<PackageDescriptor> {
    let pkg = config.command_package(command).ok_or_else(|| {
        StencilError::Config(format!("no package is configured for command '{command}'"))
    })?;
    let desc = PackageDescriptor::new(PackageName::parse(pkg)?, VersionSpec::Latest);

    Ok(match config.target_path() {
        Some(target) => desc.with_target_path(target),
        None => desc
            .with_target_path(config.dependencies_dir())
            .with_cache_root(config.cache_root()),
    })
}

/// Resolve, fetch and run the package behind a command
#[instrument(skip(config))]
pub async fn exec(config: &Config, args: &ExecArgs) -> Result<()> {
    let desc = descriptor_for(config, &args.command)?;
    let cached = desc.cache_root.is_some();
    let registry = Registry::new(config.registry(), config.timeout())?;
    let installer = TarballInstaller::new(config.timeout());
    let mut pkg = PackageCache::new(desc, &registry, &installer);

    if cached {
        let pb = ProgressBar::new_spinner()
            .with_style(ProgressStyle::with_template("{spinner} {msg}").map_err(|e| {
                StencilError::Process(format!("invalid progress template: {e}"))
            })?)
            .with_message(format!("Preparing {}", pkg.name().bright_cyan()));
        pb.enable_steady_tick(Duration::from_millis(100));
        fetch_with_progress(&mut pkg, &pb).await?;
    } else {
        debug!("Using local package for {}", args.command);
    }

    if let Some(resolved) = pkg.resolved() {
        debug!("Running {resolved}");
    }

    let entry = pkg
        .root_file_path()
        .await?
        .ok_or_else(|| StencilError::Entry(pkg.name().to_string()))?;
    debug!("Entry point: {entry}");

    run_entry(config.interpreter(), &entry, args).await
}

/// Install or update a cached package; the spinner is cleared however it ends
async fn fetch_with_progress(pkg: &mut PackageCache<'_>, pb: &ProgressBar) -> Result<()> {
    let res: Result<()> = async {
        if pkg.exists().await? {
            pb.set_message(format!("Checking {} for updates", pkg.name().bright_cyan()));
            pkg.update().await
        } else {
            pb.set_message(format!("Downloading {}", pkg.name().bright_cyan()));
            pkg.install().await
        }
    }
    .await;

    pb.finish_and_clear();
    res
}

/// Run an entry point in its own interpreter process
pub async fn run_entry(interpreter: &str, entry: &str, args: &ExecArgs) -> Result<()> {
    let program = which::which(interpreter).map_err(|e| {
        StencilError::Process(format!("unable to find interpreter '{interpreter}': {e}"))
    })?;
    let payload = serde_json::to_string(args)
        .map_err(|e| StencilError::Process(format!("unable to serialize arguments: {e}")))?;

    debug!("Spawning {} for {entry}", program.display());
    let status = tokio::process::Command::new(&program)
        .arg("-e")
        .arg(LOADER)
        .arg(entry)
        .arg(&payload)
        .status()
        .await?;

    if !status.success() {
        return Err(StencilError::Process(format!(
            "command '{}' failed ({status})",
            args.command
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;
    use crate::{core::version::tests::StaticSource, model::Location};

    #[test]
    fn cached_descriptor_by_default() {
        Jail::expect_with(|jail| {
            let config = Config::load_from(jail.directory()).map_err(|e| e.to_string())?;
            let desc = descriptor_for(&config, "init").map_err(|e| e.to_string())?;

            assert_eq!(desc.name.as_str(), "@stencil-cli/init");
            assert_eq!(desc.version, VersionSpec::Latest);
            assert_eq!(
                desc.location(),
                Location::Cached {
                    cache_root: config.cache_root(),
                    target_path: Some(config.dependencies_dir()),
                }
            );
            Ok(())
        });
    }

    #[test]
    fn target_path_means_direct() {
        Jail::expect_with(|jail| {
            let mut config = Config::load_from(jail.directory()).map_err(|e| e.to_string())?;
            config.set_target_path("/work/init");
            let desc = descriptor_for(&config, "init").map_err(|e| e.to_string())?;

            assert_eq!(desc.location(), Location::Direct("/work/init".into()));
            Ok(())
        });
    }

    #[test]
    fn unknown_command() {
        Jail::expect_with(|jail| {
            let config = Config::load_from(jail.directory()).map_err(|e| e.to_string())?;
            assert!(matches!(
                descriptor_for(&config, "publish"),
                Err(StencilError::Config(_))
            ));
            Ok(())
        });
    }

    #[test]
    fn args_serialize_as_json() {
        let args = ExecArgs::new("init")
            .arg("my-app")
            .option("force", true)
            .option("targetPath", serde_json::Value::Null);

        assert_eq!(
            serde_json::to_string(&args).unwrap(),
            r#"{"command":"init","args":["my-app"],"options":{"force":true,"targetPath":null}}"#
        );
    }

    #[tokio::test]
    async fn spinner_is_cleared_when_the_cache_is_unusable() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        let source = StaticSource(vec!["1.0.0"]);
        let installer = TarballInstaller::new(Duration::from_secs(1));
        let desc = PackageDescriptor::new(PackageName::parse("tpl").unwrap(), VersionSpec::Latest)
            .with_cache_root(blocker.join("node_modules"));
        let mut pkg = PackageCache::new(desc, &source, &installer);

        let pb = ProgressBar::hidden();
        let err = fetch_with_progress(&mut pkg, &pb).await.unwrap_err();
        assert!(matches!(err, StencilError::Io(_)));
        assert!(pb.is_finished());
    }

    #[tokio::test]
    async fn missing_interpreter() {
        let err = run_entry("definitely-not-an-interpreter", "/x/index.js", &ExecArgs::new("init"))
            .await
            .unwrap_err();
        assert!(matches!(err, StencilError::Process(_)));
    }
}
