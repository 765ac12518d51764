//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `wecare.toml` in the working directory unless another path is
//! given on the command line. Every field has a default so the file is
//! optional. Environment variables take precedence over file values.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use wecare_app::sync_bus::DEFAULT_CHANNEL;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Cross-context sync settings.
    pub sync: SyncConfig,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Sync bus and list cache settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Broadcast channel name shared by all contexts.
    pub channel: String,
    /// Delay before a list reload triggered by a sync event.
    pub debounce_ms: u64,
}

impl Config {
    /// Load configuration from `path` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if the resulting configuration is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("WECARE_DATABASE_URL") {
            self.database.url = val;
        }
        if let Ok(val) = std::env::var("WECARE_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Some(ms) = std::env::var("WECARE_SYNC_DEBOUNCE_MS")
            .ok()
            .and_then(|val| val.parse().ok())
        {
            self.sync.debounce_ms = ms;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "database url must not be empty".to_string(),
            ));
        }
        if self.sync.channel.trim().is_empty() {
            return Err(ConfigError::Validation(
                "sync channel must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    /// Debounce delay of the list cache.
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.sync.debounce_ms)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:wecare.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "wecare=info,wecare_app=info,wecare_adapter_storage_sqlite_sqlx=info"
                .to_string(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL.to_string(),
            debounce_ms: 100,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.database_url(), "sqlite:wecare.db?mode=rwc");
        assert_eq!(config.sync.channel, "patient-channel");
        assert_eq!(config.debounce(), Duration::from_millis(100));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [database]
            url = 'sqlite:test.db'

            [logging]
            filter = 'debug'

            [sync]
            channel = 'ward-7'
            debounce_ms = 250
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.database.url, "sqlite:test.db");
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.sync.channel, "ward-7");
        assert_eq!(config.debounce(), Duration::from_millis(250));
    }

    #[test]
    fn should_parse_partial_toml_with_defaults() {
        let toml = "
            [sync]
            debounce_ms = 10
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.sync.debounce_ms, 10);
        assert_eq!(config.sync.channel, "patient-channel");
        assert_eq!(config.database.url, "sqlite:wecare.db?mode=rwc");
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file(Path::new("nonexistent.toml")).unwrap();
        assert_eq!(config.sync.debounce_ms, 100);
    }

    #[test]
    fn should_reject_empty_channel() {
        let mut config = Config::default();
        config.sync.channel = "  ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn should_reject_empty_database_url() {
        let mut config = Config::default();
        config.database.url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }
}
