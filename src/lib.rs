pub mod api;
pub mod config;
pub mod core;
pub mod error;
pub mod model;
pub mod traits;
pub mod utils;

pub mod prelude {
    pub use crate::api::Registry;
    pub use crate::config::Config;
    pub use crate::core::install::TarballInstaller;
    pub use crate::core::{PackageCache, list_cached};
    pub use crate::error::{Result, StencilError};
    pub use crate::model::{PackageDescriptor, PackageName, ResolvedPackage, VersionSpec};
    pub use crate::traits::{InstallRequest, Installer, VersionSource};
}
