use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub dtrack: FileDtrackConfig,
    #[serde(default)]
    pub opa: FileOpaConfig,
    #[serde(default)]
    pub audit: FileAuditConfig,
    #[serde(default)]
    pub http: FileHttpConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileDtrackConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileOpaConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileAuditConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch_bundle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finding_policy_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violation_policy_path: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileHttpConfig {
    /// Human readable duration, e.g. `30s` or `1m 30s`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dtrack_url: Option<String>,
    pub dtrack_api_key: Option<String>,
    pub opa_url: Option<String>,
    pub watch_bundle: Option<String>,
    pub finding_policy_path: Option<String>,
    pub violation_policy_path: Option<String>,
    pub http_timeout: Option<String>,
    pub config_path: Option<PathBuf>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        Self {
            host: var("HOST"),
            port: var("PORT").and_then(|s| s.trim().parse().ok()),
            dtrack_url: var("DTRACK_URL"),
            dtrack_api_key: var("DTRACK_APIKEY"),
            opa_url: var("OPA_URL"),
            watch_bundle: var("WATCH_BUNDLE"),
            finding_policy_path: var("FINDING_POLICY_PATH"),
            violation_policy_path: var("VIOLATION_POLICY_PATH"),
            http_timeout: var("HTTP_TIMEOUT"),
            config_path: var("CONFIG").map(PathBuf::from),
        }
    }
}

/// Values supplied on the command line. These win over everything else.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dtrack_url: Option<String>,
    pub dtrack_api_key: Option<String>,
    pub opa_url: Option<String>,
    pub watch_bundle: Option<String>,
    pub finding_policy_path: Option<String>,
    pub violation_policy_path: Option<String>,
    pub http_timeout: Option<String>,
}
