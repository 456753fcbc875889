//! Configuration management for the JIRA API client.
//!
//! This module handles loading, saving, and validating the client
//! configuration. Configuration comes from environment variables first and
//! falls back to a JSON file under the user's home directory.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Environment variable holding the JIRA base URL.
pub const ENV_BASE_URL: &str = "JIRA_BASE_URL";

/// Environment variable holding the account email.
pub const ENV_EMAIL: &str = "JIRA_EMAIL";

/// Environment variable holding the API token.
pub const ENV_API_TOKEN: &str = "JIRA_API_TOKEN";

/// Environment variable overriding the request timeout, in seconds.
pub const ENV_TIMEOUT_SECS: &str = "JIRA_TIMEOUT_SECS";

/// Directory under the home directory where the config file lives.
const CONFIG_DIR: &str = ".jira-api";

/// Name of the configuration file.
const CONFIG_FILE: &str = "config.json";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration was found in the environment or on disk.
    #[error(
        "no configuration found: set {}, {} and {}, or create {}",
        ENV_BASE_URL,
        ENV_EMAIL,
        ENV_API_TOKEN,
        .0.display()
    )]
    Missing(PathBuf),

    /// The home directory could not be determined.
    #[error("could not determine the home directory")]
    NoHomeDir,

    /// A configuration value failed validation.
    #[error("invalid configuration: {0}")]
    ValidationError(String),

    /// Reading or writing the configuration file failed.
    #[error("configuration file error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid JSON.
    #[error("configuration file parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Connection settings for a JIRA Cloud instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JiraConfig {
    /// Base URL of the JIRA instance (e.g., "https://company.atlassian.net").
    pub base_url: String,

    /// Email address for authentication.
    pub email: String,

    /// API token for authentication.
    pub api_token: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl JiraConfig {
    /// Create a configuration with the default timeout.
    pub fn new(base_url: &str, email: &str, api_token: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            email: email.to_string(),
            api_token: api_token.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Load the configuration.
    ///
    /// Environment variables take precedence over the configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when neither source provides a
    /// configuration, naming the variables and the file path to create.
    pub fn load() -> Result<Self> {
        if let Some(config) = Self::from_env() {
            debug!("Loaded configuration from environment");
            return Ok(config);
        }

        let path = Self::config_path()?;
        if path.exists() {
            debug!(path = %path.display(), "Loading configuration file");
            return Self::load_file(&path);
        }

        Err(ConfigError::Missing(path))
    }

    /// Build a configuration from environment variables.
    ///
    /// Returns `None` unless all of [`ENV_BASE_URL`], [`ENV_EMAIL`] and
    /// [`ENV_API_TOKEN`] are set and non-empty. An unparseable
    /// [`ENV_TIMEOUT_SECS`] falls back to the default.
    pub fn from_env() -> Option<Self> {
        let base_url = non_empty_var(ENV_BASE_URL)?;
        let email = non_empty_var(ENV_EMAIL)?;
        let api_token = non_empty_var(ENV_API_TOKEN)?;

        let timeout_secs = env::var(ENV_TIMEOUT_SECS)
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Some(Self {
            base_url,
            email,
            api_token,
            timeout_secs,
        })
    }

    /// Load a configuration from a JSON file.
    pub fn load_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Save the configuration to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save the configuration to a specific path as pretty-printed JSON.
    ///
    /// Parent directories are created as needed. On Unix the file is made
    /// readable by the owner only, since it holds an API token.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }

        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Get the default configuration file path, `~/.jira-api/config.json`.
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Validate this configuration.
    ///
    /// Checks that:
    /// - The base URL is non-empty and starts with http:// or https://
    /// - The email has a valid format
    /// - The API token is non-empty
    /// - The timeout is at least one second
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError::ValidationError`] with details if validation
    /// fails.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "base URL cannot be empty".to_string(),
            ));
        }

        if !self.base_url.starts_with("https://") && !self.base_url.starts_with("http://") {
            return Err(ConfigError::ValidationError(format!(
                "base URL '{}' must start with http:// or https://",
                self.base_url
            )));
        }

        if self.email.is_empty() {
            return Err(ConfigError::ValidationError(
                "email cannot be empty".to_string(),
            ));
        }

        if !self.email.contains('@') {
            return Err(ConfigError::ValidationError(format!(
                "'{}' does not appear to be a valid email address",
                self.email
            )));
        }

        if self.api_token.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "API token cannot be empty".to_string(),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeout must be at least one second".to_string(),
            ));
        }

        Ok(())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}
