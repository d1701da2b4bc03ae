// Configuration File Support
//
// This module provides configuration file parsing for the onboard-review client.
// Supports TOML format with environment variable overrides.
// Configuration files are loaded from XDG config directory: ~/.config/onboard-review/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::usage::{AI_CHAT, CODE_REVIEW};

/// Default usage staleness window in seconds
pub const DEFAULT_USAGE_STALE_SECS: u64 = 30;

/// Default daily quota for code review submissions
pub const DEFAULT_CODE_REVIEW_LIMIT: u32 = 20;

/// Default daily quota for AI chat messages
pub const DEFAULT_AI_CHAT_LIMIT: u32 = 30;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Review service connection
    pub api: ApiConfig,

    /// Usage-limit tracking
    pub usage: UsageConfig,

    /// Persisted client state
    pub storage: StorageConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

/// Review service connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the review service (e.g. "https://review.example.com")
    pub base_url: String,

    /// Timeout in seconds for each request
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    /// Get request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Usage-limit tracker settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UsageConfig {
    /// A non-forced refresh within this many seconds of the last successful
    /// fetch is skipped
    pub stale_after_secs: u64,

    /// Fallback daily limits used when the usage fetch fails or omits a key
    pub default_limits: BTreeMap<String, u32>,
}

impl Default for UsageConfig {
    fn default() -> Self {
        let mut default_limits = BTreeMap::new();
        default_limits.insert(CODE_REVIEW.to_string(), DEFAULT_CODE_REVIEW_LIMIT);
        default_limits.insert(AI_CHAT.to_string(), DEFAULT_AI_CHAT_LIMIT);

        Self {
            stale_after_secs: DEFAULT_USAGE_STALE_SECS,
            default_limits,
        }
    }
}

impl UsageConfig {
    /// Get the staleness window
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}

/// Persisted client state settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `state.json`; platform data dir when unset
    pub state_dir: Option<String>,
}

impl StorageConfig {
    /// Resolve the state directory
    pub fn state_dir(&self) -> PathBuf {
        if let Some(dir) = &self.state_dir {
            return PathBuf::from(dir);
        }
        if let Some(proj_dirs) =
            directories::ProjectDirs::from("com", "onboard-review", "OnboardReview")
        {
            proj_dirs.data_dir().to_path_buf()
        } else {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("onboard-review")
        }
    }

    /// Path of the JSON state file
    pub fn state_file(&self) -> PathBuf {
        self.state_dir().join("state.json")
    }
}

impl Config {
    /// Load configuration from the default XDG config directory
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    /// If the config file does not exist, returns default configuration.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    ///
    /// Environment overrides are applied and the result is validated. A
    /// missing file yields defaults (still subject to overrides).
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file from {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file from {:?}", path))?;
            tracing::info!("Loaded configuration from {:?}", path);
            config
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            Self::default()
        };

        let config = config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path
    ///
    /// Returns `~/.config/onboard-review/config.toml` on Linux
    pub fn config_path() -> PathBuf {
        if let Some(proj_dirs) =
            directories::ProjectDirs::from("com", "onboard-review", "OnboardReview")
        {
            proj_dirs.config_dir().join("config.toml")
        } else {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home)
                .join(".config")
                .join("onboard-review")
                .join("config.toml")
        }
    }

    /// Apply environment variable overrides to the configuration
    ///
    /// Environment variables take precedence over config file values:
    /// - ONBOARD_REVIEW_LOG_LEVEL
    /// - ONBOARD_REVIEW_LOG_FORMAT
    /// - ONBOARD_REVIEW_API_URL
    /// - ONBOARD_REVIEW_API_TIMEOUT_SECS
    /// - ONBOARD_REVIEW_USAGE_STALE_SECS
    /// - ONBOARD_REVIEW_STATE_DIR
    fn apply_env_overrides(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("ONBOARD_REVIEW_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("ONBOARD_REVIEW_LOG_FORMAT") {
            self.logging.format = format;
        }

        if let Some(url) = lookup("ONBOARD_REVIEW_API_URL") {
            self.api.base_url = url;
        }
        if let Some(timeout) = lookup("ONBOARD_REVIEW_API_TIMEOUT_SECS") {
            if let Ok(timeout) = timeout.parse::<u64>() {
                if timeout > 0 {
                    self.api.timeout_secs = timeout;
                }
            }
        }

        if let Some(stale) = lookup("ONBOARD_REVIEW_USAGE_STALE_SECS") {
            if let Ok(stale) = stale.parse::<u64>() {
                self.usage.stale_after_secs = stale;
            }
        }

        if let Some(dir) = lookup("ONBOARD_REVIEW_STATE_DIR") {
            if !dir.is_empty() {
                self.storage.state_dir = Some(dir);
            }
        }

        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            ),
        }

        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" | "compact" => {}
            _ => anyhow::bail!(
                "Invalid log format: {}. Must be one of: json, pretty, compact",
                self.logging.format
            ),
        }

        if self.api.base_url.is_empty() {
            anyhow::bail!("API base URL must not be empty");
        }
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            anyhow::bail!(
                "API base URL must start with http:// or https://: {}",
                self.api.base_url
            );
        }
        if self.api.timeout_secs == 0 {
            anyhow::bail!("API timeout must be > 0");
        }

        for (feature, limit) in &self.usage.default_limits {
            if *limit == 0 {
                anyhow::bail!("Default limit for '{}' must be > 0", feature);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.api.base_url, "http://localhost:3000");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.usage.stale_after_secs, 30);
        assert_eq!(config.usage.default_limits.get("code_review"), Some(&20));
        assert_eq!(config.usage.default_limits.get("ai_chat"), Some(&30));
        assert!(config.storage.state_dir.is_none());
    }

    #[test]
    fn test_config_validation_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_base_url() {
        let mut config = Config::default();
        config.api.base_url = String::new();
        assert!(config.validate().is_err());

        config.api.base_url = "ftp://review.example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_timeout() {
        let mut config = Config::default();
        config.api.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_default_limit() {
        let mut config = Config::default();
        config.usage.default_limits.insert("ai_chat".to_string(), 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_valid_toml_config() {
        let temp_file = NamedTempFile::new().unwrap();
        let toml_content = r#"
[logging]
level = "debug"
format = "json"

[api]
base_url = "https://review.example.com"
timeout_secs = 10

[usage]
stale_after_secs = 60

[usage.default_limits]
code_review = 5
ai_chat = 50

[storage]
state_dir = "/var/lib/onboard-review"
"#;
        fs::write(temp_file.path(), toml_content).unwrap();

        let content = fs::read_to_string(temp_file.path()).unwrap();
        let config: Config = toml::from_str(&content).unwrap();
        let config = config.apply_overrides(no_env);

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.api.base_url, "https://review.example.com");
        assert_eq!(config.api.timeout(), Duration::from_secs(10));
        assert_eq!(config.usage.stale_after(), Duration::from_secs(60));
        assert_eq!(config.usage.default_limits.get("code_review"), Some(&5));
        assert_eq!(
            config.storage.state_file(),
            PathBuf::from("/var/lib/onboard-review/state.json")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_invalid_toml_config() {
        let temp_file = NamedTempFile::new().unwrap();
        let toml_content = r#"
[logging
level = "debug"
"#;

        fs::write(temp_file.path(), toml_content).unwrap();

        let config = Config::load_from_path(temp_file.path());
        assert!(config.is_err());
    }

    #[test]
    fn test_config_partial_toml() {
        let config: Config = toml::from_str(
            r#"
[api]
base_url = "https://review.example.com"
"#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://review.example.com");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.usage.default_limits.len(), 2);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("ONBOARD_REVIEW_LOG_LEVEL", "debug"),
            ("ONBOARD_REVIEW_LOG_FORMAT", "json"),
            ("ONBOARD_REVIEW_API_URL", "https://staging.example.com"),
            ("ONBOARD_REVIEW_API_TIMEOUT_SECS", "5"),
            ("ONBOARD_REVIEW_USAGE_STALE_SECS", "0"),
            ("ONBOARD_REVIEW_STATE_DIR", "/tmp/onboard"),
        ]
        .into_iter()
        .collect();

        let config =
            Config::default().apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.api.base_url, "https://staging.example.com");
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.usage.stale_after_secs, 0);
        assert_eq!(config.storage.state_dir.as_deref(), Some("/tmp/onboard"));
    }

    #[test]
    fn test_env_overrides_invalid_values() {
        let env: HashMap<&str, &str> = [
            ("ONBOARD_REVIEW_API_TIMEOUT_SECS", "0"),
            ("ONBOARD_REVIEW_USAGE_STALE_SECS", "soon"),
            ("ONBOARD_REVIEW_STATE_DIR", ""),
        ]
        .into_iter()
        .collect();

        let config =
            Config::default().apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        // Should keep defaults for invalid values
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.usage.stale_after_secs, 30);
        assert!(config.storage.state_dir.is_none());
    }

    #[test]
    fn test_config_path() {
        let path = Config::config_path();
        assert!(path.ends_with("config.toml"));
    }

    #[test]
    fn test_state_file_name() {
        let storage = StorageConfig::default();
        assert!(storage.state_file().ends_with("state.json"));
    }

    #[test]
    fn test_valid_log_levels() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            let mut config = Config::default();
            config.logging.level = level.to_string();
            assert!(config.validate().is_ok(), "Log level {} should be valid", level);
        }
    }
}
