use owo_colors::OwoColorize;
use tracing::debug;

use crate::{config::Config, core::list_cached, error::Result};

pub async fn cache(config: &Config) -> Result<()> {
    let root = config.cache_root();
    let packages = list_cached(&root).await?;
    debug!("Found {} cached packages in {}", packages.len(), root.display());

    if packages.is_empty() {
        println!("No packages cached in {}", root.display().bold());
        return Ok(());
    }

    println!("Cached packages: ");
    for p in packages {
        println!(
            "-  {}@{}\n    {}",
            p.name.bright_blue().bold(),
            p.version.bright_cyan(),
            p.path.display()
        );
    }

    Ok(())
}
