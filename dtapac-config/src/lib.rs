//! Configuration for the dtapac service.
//!
//! Values are resolved from command-line flags, the process environment
//! (optionally seeded from a `.env` file), and an optional TOML file, in that
//! order of precedence, before falling back to built-in defaults.
#![allow(missing_docs)]

pub mod cli;
pub mod loader;
pub mod models;
pub mod sources;
pub mod validation;

pub use cli::ConfigArgs;
pub use loader::{ConfigLoad, ConfigLoadError, ConfigLoader, ConfigLoaderOptions};
pub use models::{
    AuditConfig, Config, ConfigMetadata, DependencyTrackConfig, HttpConfig, OpaConfig,
    ServerConfig,
};
pub use sources::{ConfigOverrides, EnvConfig, FileConfig};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
