//! Configuration management for starcom
//!
//! Settings come from an optional TOML file, then the environment, then the
//! command line. Every field has a default, so no file is required.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::app::ClientConfig;
use crate::constants::{env, files, http, limits, service, shell};
use crate::errors::{ConfigError, Result};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceConfig,
    /// HTTP client settings
    pub client: ClientConfigToml,
    pub shell: ShellConfig,
    pub logging: LoggingConfig,
}

/// Which StarExec instance to talk to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base address; must end with `/`
    pub base_url: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: service::DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfigToml {
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    pub rate_limit_rps: u32,
    /// Skip TLS certificate verification
    pub accept_invalid_certs: bool,
    pub user_agent: String,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
            accept_invalid_certs: false,
            user_agent: http::USER_AGENT.to_string(),
        }
    }
}

impl ClientConfigToml {
    /// Convert to the runtime client configuration
    pub fn to_runtime_config(&self) -> ClientConfig {
        ClientConfig {
            request_timeout: self.request_timeout,
            connect_timeout: self.connect_timeout,
            rate_limit_rps: self.rate_limit_rps,
            accept_invalid_certs: self.accept_invalid_certs,
            user_agent: self.user_agent.clone(),
            ..ClientConfig::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShellConfig {
    /// Text printed before each interactive command
    pub prompt: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: shell::PROMPT.to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level used when no verbosity flag is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration with multi-source precedence:
    /// 1. Default values
    /// 2. Config file (if exists)
    /// 3. Environment variables
    ///
    /// Command-line flags are applied afterwards by the caller.
    pub async fn load(config_file_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_file_override {
            Some(path) if !path.exists() => {
                return Err(ConfigError::NotFound { path }.into());
            }
            Some(path) => Some(path),
            None => Self::find_config_file(),
        };

        let mut config = match config_path {
            Some(path) => Self::load_from_file(&path).await?,
            None => {
                debug!("No config file found in standard locations");
                Self::default()
            }
        };

        if let Ok(base_url) = std::env::var(env::BASE_URL) {
            debug!("Base address overridden by {}", env::BASE_URL);
            config.service.base_url = base_url;
        }

        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(files::LOCAL_CONFIG_FILE)];
        if let Some(path) = Self::default_config_path() {
            search_paths.push(path);
        }

        search_paths.into_iter().find(|path| {
            let found = path.is_file();
            if found {
                debug!("Found config file: {}", path.display());
            }
            found
        })
    }

    /// Default config file path for the current user
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(files::CONFIG_DIR_NAME).join(files::CONFIG_FILE_NAME))
    }

    /// Load configuration from a TOML file
    pub async fn load_from_file(path: &Path) -> Result<Self> {
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;

        let config: AppConfig = toml::from_str(&content).map_err(ConfigError::from)?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Reject values that cannot work at runtime
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.base_url()?;
        if self.client.rate_limit_rps == 0 {
            return Err(ConfigError::InvalidValue {
                field: "client.rate_limit_rps".to_string(),
                value: "0".to_string(),
                reason: "The rate limit must be at least one request per second".to_string(),
            });
        }
        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                value: self.logging.level.clone(),
                reason: "Expected one of error, warn, info, debug, trace".to_string(),
            });
        }
        Ok(())
    }

    /// The configured base address, parsed
    pub fn base_url(&self) -> std::result::Result<Url, ConfigError> {
        Url::parse(&self.service.base_url).map_err(|e| ConfigError::InvalidValue {
            field: "service.base_url".to_string(),
            value: self.service.base_url.clone(),
            reason: e.to_string(),
        })
    }

    /// Level used when no verbosity flag is given
    pub fn log_level(&self) -> tracing::Level {
        self.logging.level.parse().unwrap_or(tracing::Level::WARN)
    }

    pub fn to_client_config(&self) -> ClientConfig {
        self.client.to_runtime_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.service.base_url, service::DEFAULT_BASE_URL);
        assert_eq!(config.shell.prompt, shell::PROMPT);
        assert!(!config.client.accept_invalid_certs);
        assert!(config.validate().is_ok());
        assert_eq!(config.log_level(), tracing::Level::WARN);
    }

    #[tokio::test]
    async fn test_load_partial_file() {
        // Test that missing sections and fields keep their defaults
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("starcom.toml");
        std::fs::write(
            &path,
            r#"
[service]
base_url = "https://stardev.example.edu/starexec/"

[client]
request_timeout = "45s"
accept_invalid_certs = true
"#,
        )
        .unwrap();

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(
            config.service.base_url,
            "https://stardev.example.edu/starexec/"
        );
        assert_eq!(config.client.request_timeout, Duration::from_secs(45));
        assert_eq!(config.client.connect_timeout, http::CONNECT_TIMEOUT);
        assert!(config.client.accept_invalid_certs);
        assert_eq!(config.shell.prompt, shell::PROMPT);

        let runtime = config.to_client_config();
        assert!(runtime.accept_invalid_certs);
        assert_eq!(runtime.request_timeout, Duration::from_secs(45));
    }

    #[tokio::test]
    async fn test_explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = AppConfig::load(Some(dir.path().join("absent.toml")))
            .await
            .unwrap_err();
        assert_eq!(err.category(), "config");
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[client\nrate_limit_rps = ").unwrap();
        assert!(AppConfig::load_from_file(&path).await.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.client.rate_limit_rps = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.service.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = AppConfig::default();
        let text = toml::to_string(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
