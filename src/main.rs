use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use stencil::config::Config;
use stencil::core::commands::{self, ExecArgs};
use stencil::error::StencilError;

#[derive(Parser)]
#[clap(name = "stencil")]
#[clap(version = env!("CARGO_PKG_VERSION"))]
#[clap(about = "Scaffold projects from versioned template packages")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    ///Show debug output
    #[clap(long, short, global = true)]
    debug: bool,

    ///Use a local command package instead of the cached one
    #[clap(long, short, global = true, value_name = "PATH")]
    target_path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    ///Create a new project in the current directory
    Init {
        #[clap(value_name = "NAME")]
        project_name: Option<String>,

        ///Initialize even if the current directory isn't empty
        #[clap(long, short)]
        force: bool,
    },
    ///Display the current configuration
    Env {},
    ///List cached packages
    Cache {},
}

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match Config::load().context("Unable to load config") {
        Ok(c) => c,
        Err(e) => {
            init_logging(cli.debug);
            return report(e);
        }
    };
    if cli.debug {
        config.set_debug(true);
    }
    if let Some(path) = cli.target_path {
        config.set_target_path(path);
    }
    init_logging(config.debug());
    debug!("Stencil home is {}", config.home_path().display());

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(e),
    }
}

async fn run(command: Commands, config: &Config) -> Result<()> {
    commands::notify_update(config).await;

    match command {
        Commands::Init {
            project_name,
            force,
        } => {
            let mut args = ExecArgs::new("init").option("force", force).option(
                "targetPath",
                config.target_path().map(|p| p.display().to_string()),
            );
            if let Some(name) = project_name {
                args = args.arg(name);
            }
            commands::exec(config, &args.option("debug", config.debug()))
                .await
                .context("Failed to run init")?;
        }
        Commands::Env {} => commands::env(config)?,
        Commands::Cache {} => commands::cache(config)
            .await
            .context("Unable to read the package cache")?,
    }

    Ok(())
}

fn report(e: anyhow::Error) -> ExitCode {
    eprintln!("{}", e.bright_red());
    for cause in e.chain().skip(1) {
        eprintln!("  {} {cause}", "caused by:".red());
    }
    debug!("{e:?}");

    let code = e
        .downcast_ref::<StencilError>()
        .map(StencilError::exit_code)
        .unwrap_or(1);
    ExitCode::from(code as u8)
}
