use std::path::PathBuf;
use std::time::Duration;

use url::Url;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Fully resolved service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub dtrack: DependencyTrackConfig,
    pub opa: OpaConfig,
    pub audit: AuditConfig,
    pub http: HttpConfig,
    pub metadata: ConfigMetadata,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone)]
pub struct DependencyTrackConfig {
    pub url: Url,
    pub api_key: String,
}

impl std::fmt::Debug for DependencyTrackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyTrackConfig")
            .field("url", &self.url.as_str())
            .field("api_key", &if self.api_key.is_empty() { "<empty>" } else { "<redacted>" })
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct OpaConfig {
    pub url: Url,
}

/// Which auditing categories run, and whether portfolio re-analysis is
/// driven by a policy bundle.
#[derive(Debug, Clone, Default)]
pub struct AuditConfig {
    pub watch_bundle: Option<String>,
    pub finding_policy_path: Option<String>,
    pub violation_policy_path: Option<String>,
}

impl AuditConfig {
    pub fn findings_enabled(&self) -> bool {
        self.finding_policy_path.is_some()
    }

    pub fn violations_enabled(&self) -> bool {
        self.violation_policy_path.is_some()
    }

    pub fn portfolio_analysis_enabled(&self) -> bool {
        self.watch_bundle.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}

/// Trim surrounding slashes from a policy package path; blank means unset.
pub fn normalize_policy_path(raw: Option<String>) -> Option<String> {
    raw.map(|path| path.trim().trim_matches('/').to_string())
        .filter(|path| !path.is_empty())
}
