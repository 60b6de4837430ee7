//! Configuration management for InsightHub
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//! Precedence is file, then environment, then CLI.

use crate::error::{InsightHubError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for InsightHub
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote service settings
    #[serde(default)]
    pub service: ServiceConfig,
    /// Where the bearer token is kept
    #[serde(default)]
    pub credentials: CredentialsConfig,
    /// Workbench behavior
    #[serde(default)]
    pub workbench: WorkbenchConfig,
}

/// Remote service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the InsightHub API (e.g. `http://localhost:8000`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Where users are sent when a feature needs a higher plan
    #[serde(default = "default_pricing_url")]
    pub pricing_url: String,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_pricing_url() -> String {
    "http://localhost:5173/pricing".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            pricing_url: default_pricing_url(),
        }
    }
}

impl ServiceConfig {
    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Credential storage backend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CredentialBackend {
    /// OS keyring
    Keyring,
    /// JSON file in the platform config directory
    #[default]
    File,
    /// Process memory only; nothing survives the process
    Memory,
}

impl CredentialBackend {
    /// Parses a backend name, case-insensitively.
    ///
    /// # Examples
    ///
    /// ```
    /// use insighthub::config::CredentialBackend;
    ///
    /// assert_eq!(CredentialBackend::parse_str("KEYRING"), Some(CredentialBackend::Keyring));
    /// assert_eq!(CredentialBackend::parse_str("vault"), None);
    /// ```
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "keyring" => Some(Self::Keyring),
            "file" => Some(Self::File),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Credential storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Which store holds the token
    #[serde(default)]
    pub backend: CredentialBackend,

    /// Keyring service name
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_service_name() -> String {
    "insighthub".to_string()
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            backend: CredentialBackend::default(),
            service_name: default_service_name(),
        }
    }
}

/// Workbench configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkbenchConfig {
    /// Source identifier sent with queries when none is given
    #[serde(default = "default_source")]
    pub default_source: String,

    /// How many recent queries the history view shows
    #[serde(default = "default_history_display_limit")]
    pub history_display_limit: usize,

    /// Directory exported files are written to
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Grace period for pending history log calls at shutdown (milliseconds)
    #[serde(default = "default_log_flush_timeout_ms")]
    pub log_flush_timeout_ms: u64,
}

fn default_source() -> String {
    "default".to_string()
}

fn default_history_display_limit() -> usize {
    5
}

fn default_download_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_log_flush_timeout_ms() -> u64 {
    2000
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        Self {
            default_source: default_source(),
            history_display_limit: default_history_display_limit(),
            download_dir: default_download_dir(),
            log_flush_timeout_ms: default_log_flush_timeout_ms(),
        }
    }
}

impl WorkbenchConfig {
    /// Shutdown grace period for best-effort logging.
    pub fn log_flush_timeout(&self) -> Duration {
        Duration::from_millis(self.log_flush_timeout_ms)
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(InsightHubError::Yaml)?;
        tracing::debug!("Loaded configuration from {}", path);
        Ok(config)
    }

    fn apply_env_vars(&mut self) {
        if let Ok(url) = std::env::var("INSIGHTHUB_API_URL") {
            self.service.base_url = url;
        }

        if let Ok(timeout) = std::env::var("INSIGHTHUB_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(secs) => self.service.timeout_seconds = secs,
                Err(_) => tracing::warn!(
                    "Ignoring INSIGHTHUB_TIMEOUT_SECS={}: not a number of seconds",
                    timeout
                ),
            }
        }

        if let Ok(pricing) = std::env::var("INSIGHTHUB_PRICING_URL") {
            self.service.pricing_url = pricing;
        }

        if let Ok(backend) = std::env::var("INSIGHTHUB_CREDENTIAL_BACKEND") {
            match CredentialBackend::parse_str(&backend) {
                Some(b) => self.credentials.backend = b,
                None => tracing::warn!(
                    "Ignoring INSIGHTHUB_CREDENTIAL_BACKEND={}: expected keyring, file or memory",
                    backend
                ),
            }
        }

        if let Ok(dir) = std::env::var("INSIGHTHUB_DOWNLOAD_DIR") {
            self.workbench.download_dir = PathBuf::from(dir);
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(url) = &cli.api_url {
            self.service.base_url = url.clone();
        }
        if let Some(dir) = &cli.download_dir {
            self.workbench.download_dir = dir.clone();
        }
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.service.base_url.trim().is_empty() {
            return Err(
                InsightHubError::Config("service.base_url cannot be empty".to_string()).into(),
            );
        }

        let parsed = url::Url::parse(&self.service.base_url).map_err(|e| {
            InsightHubError::Config(format!(
                "service.base_url is not a valid URL ({}): {}",
                self.service.base_url, e
            ))
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(InsightHubError::Config(format!(
                "service.base_url must use http or https, got {}",
                parsed.scheme()
            ))
            .into());
        }

        if self.service.timeout_seconds == 0 {
            return Err(InsightHubError::Config(
                "service.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.workbench.history_display_limit == 0 {
            return Err(InsightHubError::Config(
                "workbench.history_display_limit must be greater than 0".to_string(),
            )
            .into());
        }

        if self.workbench.default_source.trim().is_empty() {
            return Err(InsightHubError::Config(
                "workbench.default_source cannot be empty".to_string(),
            )
            .into());
        }

        if self.credentials.backend == CredentialBackend::Keyring
            && self.credentials.service_name.trim().is_empty()
        {
            return Err(InsightHubError::Config(
                "credentials.service_name cannot be empty for the keyring backend".to_string(),
            )
            .into());
        }

        Ok(())
    }
}
