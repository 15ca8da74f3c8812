use owo_colors::OwoColorize;

use crate::{config::Config, error::Result};

pub fn env(config: &Config) -> Result<()> {
    println!("Current config:\n");
    println!("Registry: {}", config.registry().bright_cyan());
    println!(
        "Stencil home: {}",
        config.home_path().display().bright_cyan()
    );
    println!(
        "Cache directory: {}",
        config.cache_root().display().bright_cyan()
    );
    println!(
        "Target path: {}",
        config
            .target_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "[none]".into())
            .bright_cyan()
    );
    println!("Interpreter: {}", config.interpreter().bright_cyan());

    if let Some(path) = &config.config_path {
        println!("\nConfig file: {}", path.display().bright_cyan());
    }

    Ok(())
}
