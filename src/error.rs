use std::{io, path::PathBuf};

use thiserror::Error;

pub type Result<T, E = StencilError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum StencilError {
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Error querying registry for {package}: {message}")]
    Registry { package: String, message: String },
    #[error("No published versions found for package {0}")]
    PackageNotFound(String),
    #[error("Error while installing {name}@{version}")]
    Install {
        name: String,
        version: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("Unable to parse manifest {path:?}")]
    ManifestParse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Package {0} doesn't declare an entry point")]
    Entry(String),
    #[error("{0}")]
    Process(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl StencilError {
    pub(crate) fn registry(package: impl Into<String>, message: impl ToString) -> Self {
        Self::Registry {
            package: package.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn install(
        name: impl Into<String>,
        version: impl ToString,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Install {
            name: name.into(),
            version: version.to_string(),
            source: source.into(),
        }
    }

    /// Process exit code for the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Registry { .. } | Self::PackageNotFound(_) => 3,
            Self::Install { .. } => 4,
            Self::ManifestParse { .. } | Self::Entry(_) => 5,
            Self::Process(_) => 6,
            Self::Io(_) => 1,
        }
    }
}
