use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Environment variable consulted when no token is configured.
pub const ACCESS_TOKEN_ENV: &str = "ACTIVITY_GRAPH_TOKEN";

/// The activity API keeps content available for this many days.
pub const ACTIVITY_RETENTION_DAYS: u32 = 7;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a summary of all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Graph API settings
    #[serde(default)]
    pub graph: GraphConfig,

    /// Scan range settings
    #[serde(default)]
    pub scan: ScanConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Base URL for Graph requests, including the API version
    #[serde(default = "default_graph_base_url")]
    pub base_url: String,

    /// Bearer token for Graph requests. Token acquisition happens elsewhere;
    /// when unset, `ACTIVITY_GRAPH_TOKEN` is read instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_graph_base_url() -> String {
    "https://graph.microsoft.com/v1.0".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            base_url: default_graph_base_url(),
            access_token: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl GraphConfig {
    /// Configured token, falling back to the environment.
    pub fn access_token(&self) -> Option<String> {
        self.access_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| std::env::var(ACCESS_TOKEN_ENV).ok())
            .filter(|t| !t.trim().is_empty())
    }

    /// Like [`GraphConfig::access_token`] but fails when no token is available.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingSetting` when neither the config nor the
    /// environment provides a token.
    pub fn require_access_token(&self) -> Result<String, ConfigError> {
        self.access_token().ok_or_else(|| {
            ConfigError::MissingSetting(format!("graph.access_token (or {})", ACCESS_TOKEN_ENV))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// How many days back from now the scan range starts
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
}

fn default_lookback_days() -> u32 {
    ACTIVITY_RETENTION_DAYS
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter when `RUST_LOG` is not set
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path()?)
    }

    /// Load configuration from `path`, writing the defaults there if missing
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        Self::load()?.into_validated()
    }

    /// Same as [`Config::load_validated`] for an explicit path
    pub fn load_validated_from(path: impl AsRef<Path>) -> Result<(Self, ValidationResult)> {
        Self::load_from(path)?.into_validated()
    }

    /// Validate, log the warnings, and fail on errors
    ///
    /// Call after logging is initialized so the warnings are emitted.
    pub fn into_validated(self) -> Result<(Self, ValidationResult)> {
        let validation = self.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((self, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.graph.base_url, "graph.base_url", &mut result);

        if self.graph.request_timeout_secs == 0 {
            result.add_error(
                "graph.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        }

        if self.graph.access_token().is_none() {
            result.add_warning(
                "graph.access_token",
                format!(
                    "No Graph token configured (set it here or in {}); resolution is unavailable",
                    ACCESS_TOKEN_ENV
                ),
            );
        }

        if self.scan.lookback_days == 0 {
            result.add_warning("scan.lookback_days", "Scan range is empty (0 days)");
        } else if self.scan.lookback_days > ACTIVITY_RETENTION_DAYS {
            result.add_warning(
                "scan.lookback_days",
                format!(
                    "Activity content is only retained for {} days",
                    ACTIVITY_RETENTION_DAYS
                ),
            );
        }

        if self.logging.filter.trim().is_empty() {
            result.add_warning("logging.filter", "Empty log filter, defaulting to info");
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(Self::config_path()?)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("activity-importer");

        Ok(config_dir.join("config.toml"))
    }
}
