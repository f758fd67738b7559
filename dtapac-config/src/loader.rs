use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use thiserror::Error;
use tracing::debug;

use super::{
    models::{
        AuditConfig, Config, ConfigMetadata, DEFAULT_HOST, DEFAULT_HTTP_TIMEOUT, DEFAULT_PORT,
        DependencyTrackConfig, HttpConfig, OpaConfig, ServerConfig, normalize_policy_path,
    },
    sources::{ConfigOverrides, EnvConfig, FileConfig},
    validation::{self, ConfigGuardRailError, ConfigWarnings},
};

const DEFAULT_CONFIG_LOCATIONS: [&str; 2] = ["dtapac.toml", "config/dtapac.toml"];

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.options.overrides = overrides;
        self
    }

    /// Load `.env`, read the process environment and the config file, and
    /// resolve the final configuration.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(|err| match err {
                dotenvy::Error::Io(_) => Ok(false),
                _ => Err(err),
            })?,
            None => dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                dotenvy::Error::Io(_) => Ok(false),
                _ => Err(err),
            })?,
        };

        let mut load = self.load_with_env(EnvConfig::gather())?;
        load.config.metadata.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Resolve against an already gathered environment. No `.env` handling.
    pub fn load_with_env(&self, env: EnvConfig) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        let (config, warnings) = self.compose_config(file_config, env, config_path)?;
        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let (path, explicit) = if let Some(path) = &self.options.config_path {
            (path.clone(), true)
        } else if let Some(path) = &env.config_path {
            (path.clone(), true)
        } else {
            match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.exists())
            {
                Some(path) => (path, false),
                None => return Ok((None, None)),
            }
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        debug!(path = %path.display(), explicit, "reading configuration file");
        let file_config = read_file_config(&path)?;
        Ok((Some(file_config), Some(path)))
    }

    fn compose_config(
        &self,
        file_config: Option<FileConfig>,
        env: EnvConfig,
        config_path: Option<PathBuf>,
    ) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
        let mut warnings = ConfigWarnings::default();

        if config_path.is_none() {
            debug!("no configuration file; using command-line flags and environment variables");
        }

        let FileConfig {
            server: file_server,
            dtrack: file_dtrack,
            opa: file_opa,
            audit: file_audit,
            http: file_http,
        } = file_config.unwrap_or_default();
        let overrides = self.options.overrides.clone();

        let server = ServerConfig {
            host: overrides
                .host
                .or(env.host)
                .or(file_server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: overrides
                .port
                .or(env.port)
                .or(file_server.port)
                .unwrap_or(DEFAULT_PORT),
        };

        let dtrack = DependencyTrackConfig {
            url: validation::parse_service_url(
                "DTRACK_URL",
                overrides.dtrack_url.or(env.dtrack_url).or(file_dtrack.url),
            )?,
            api_key: overrides
                .dtrack_api_key
                .or(env.dtrack_api_key)
                .or(file_dtrack.api_key)
                .unwrap_or_default(),
        };

        let opa = OpaConfig {
            url: validation::parse_service_url(
                "OPA_URL",
                overrides.opa_url.or(env.opa_url).or(file_opa.url),
            )?,
        };

        let audit = AuditConfig {
            watch_bundle: overrides
                .watch_bundle
                .or(env.watch_bundle)
                .or(file_audit.watch_bundle)
                .map(|bundle| bundle.trim().to_string())
                .filter(|bundle| !bundle.is_empty()),
            finding_policy_path: normalize_policy_path(
                overrides
                    .finding_policy_path
                    .or(env.finding_policy_path)
                    .or(file_audit.finding_policy_path),
            ),
            violation_policy_path: normalize_policy_path(
                overrides
                    .violation_policy_path
                    .or(env.violation_policy_path)
                    .or(file_audit.violation_policy_path),
            ),
        };

        let http = HttpConfig {
            timeout: match overrides
                .http_timeout
                .or(env.http_timeout)
                .or(file_http.timeout)
            {
                Some(raw) => parse_timeout(&raw)?,
                None => DEFAULT_HTTP_TIMEOUT,
            },
        };

        let config = Config {
            server,
            dtrack,
            opa,
            audit,
            http,
            metadata: ConfigMetadata {
                config_path,
                env_file_loaded: false,
            },
        };

        let guard_warnings = validation::apply_guard_rails(&config)?;
        warnings.extend(guard_warnings);

        Ok((config, warnings))
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigLoadError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigLoadError> {
    humantime::parse_duration(raw.trim()).map_err(|source| ConfigLoadError::InvalidTimeout {
        value: raw.to_string(),
        source,
    })
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid HTTP timeout '{value}'")]
    InvalidTimeout {
        value: String,
        #[source]
        source: humantime::DurationError,
    },
    #[error(transparent)]
    GuardRail(#[from] ConfigGuardRailError),
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}
