use thiserror::Error;
use url::Url;

use super::models::Config;

#[derive(Debug, Error)]
pub enum ConfigGuardRailError {
    #[error("{field} is required")]
    MissingSetting { field: &'static str },
    #[error("{field} is not a valid URL: {value}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("{field} must use http or https, got {scheme}")]
    UnsupportedScheme { field: &'static str, scheme: String },
    #[error("neither FINDING_POLICY_PATH nor VIOLATION_POLICY_PATH is configured")]
    NoAuditPaths,
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(&mut self, message: S, hint: H) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.items.iter()
    }
}

/// Parse a required upstream service URL.
pub fn parse_service_url(
    field: &'static str,
    raw: Option<String>,
) -> Result<Url, ConfigGuardRailError> {
    let raw = raw.ok_or(ConfigGuardRailError::MissingSetting { field })?;
    let url = Url::parse(raw.trim()).map_err(|source| ConfigGuardRailError::InvalidUrl {
        field,
        value: raw.clone(),
        source,
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigGuardRailError::UnsupportedScheme {
            field,
            scheme: other.to_string(),
        }),
    }
}

pub fn apply_guard_rails(config: &Config) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();

    if !config.audit.findings_enabled() && !config.audit.violations_enabled() {
        return Err(ConfigGuardRailError::NoAuditPaths);
    }

    if config.dtrack.api_key.trim().is_empty() {
        warnings.push_with_hint(
            "DTRACK_APIKEY is empty; Dependency-Track will reject portfolio requests",
            "Create an API key for a team with VIEW_PORTFOLIO, VIEW_VULNERABILITY, VULNERABILITY_ANALYSIS and POLICY_VIOLATION_ANALYSIS",
        );
    }

    if !config.audit.portfolio_analysis_enabled() {
        warnings.push_with_hint(
            "WATCH_BUNDLE not configured; portfolio re-analysis on policy changes is disabled",
            "Set WATCH_BUNDLE to the bundle name reported by the OPA status plugin",
        );
    }

    if !config.audit.findings_enabled() {
        warnings.push("FINDING_POLICY_PATH not configured; findings will not be audited");
    }
    if !config.audit.violations_enabled() {
        warnings.push("VIOLATION_POLICY_PATH not configured; policy violations will not be audited");
    }

    if config.http.timeout.is_zero() {
        warnings.push("HTTP timeout is zero; every upstream request will time out immediately");
    }

    Ok(warnings)
}
