use std::path::PathBuf;

use clap::Args;

use super::{
    loader::{ConfigLoader, ConfigLoaderOptions},
    sources::ConfigOverrides,
};

/// Configuration flags shared by every dtapac entry point.
///
/// Each flag falls back to the environment variable of the same name.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// Path to a TOML configuration file
    #[arg(long = "config", env = "CONFIG", value_name = "PATH")]
    pub config_path: Option<PathBuf>,

    /// Path to a .env file loaded before reading the environment
    #[arg(long, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Dependency-Track API server URL
    #[arg(long = "dtrack-url", env = "DTRACK_URL", value_name = "URL")]
    pub dtrack_url: Option<String>,

    /// Dependency-Track API key
    #[arg(
        long = "dtrack-apikey",
        env = "DTRACK_APIKEY",
        value_name = "KEY",
        hide_env_values = true
    )]
    pub dtrack_api_key: Option<String>,

    /// Open Policy Agent URL
    #[arg(long = "opa-url", env = "OPA_URL", value_name = "URL")]
    pub opa_url: Option<String>,

    /// OPA bundle to watch; changes trigger a portfolio re-analysis
    #[arg(long, env = "WATCH_BUNDLE", value_name = "NAME")]
    pub watch_bundle: Option<String>,

    /// Policy package used to audit findings
    #[arg(long, env = "FINDING_POLICY_PATH", value_name = "PATH")]
    pub finding_policy_path: Option<String>,

    /// Policy package used to audit policy violations
    #[arg(long, env = "VIOLATION_POLICY_PATH", value_name = "PATH")]
    pub violation_policy_path: Option<String>,

    /// Timeout for requests to OPA and Dependency-Track (e.g. "30s")
    #[arg(long, env = "HTTP_TIMEOUT", value_name = "DURATION")]
    pub http_timeout: Option<String>,
}

impl ConfigArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            dtrack_url: self.dtrack_url.clone(),
            dtrack_api_key: self.dtrack_api_key.clone(),
            opa_url: self.opa_url.clone(),
            watch_bundle: self.watch_bundle.clone(),
            finding_policy_path: self.finding_policy_path.clone(),
            violation_policy_path: self.violation_policy_path.clone(),
            http_timeout: self.http_timeout.clone(),
        }
    }

    pub fn loader(&self) -> ConfigLoader {
        ConfigLoader::with_options(ConfigLoaderOptions {
            config_path: self.config_path.clone(),
            env_file: self.env_file.clone(),
            overrides: self.overrides(),
        })
    }
}
