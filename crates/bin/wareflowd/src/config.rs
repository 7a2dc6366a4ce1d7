//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `wareflow.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use serde::Deserialize;

use wareflow_app::config::EngineConfig;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Engine tuning.
    pub engine: EngineSection,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Engine tuning knobs (see [`EngineConfig`] for semantics).
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Seconds between scheduler polls.
    pub poll_interval_secs: u64,
    /// Seconds a claimed job may sit before the janitor reclaims it.
    pub claim_lease_secs: u64,
    /// Maximum `trigger_rule` chain depth.
    pub max_chain_depth: u32,
    /// Per-action deadline in seconds.
    pub action_timeout_secs: u64,
    /// Upper bound on concurrently executing actions.
    pub max_concurrent_actions: usize,
}

impl Config {
    /// Load configuration from `wareflow.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if a
    /// value fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("wareflow.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("WAREFLOW_DATABASE_URL") {
            self.database.url = val;
        }
        if let Ok(val) = std::env::var("WAREFLOW_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("WAREFLOW_POLL_INTERVAL_SECS") {
            if let Ok(secs) = val.parse() {
                self.engine.poll_interval_secs = secs;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.poll_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "poll interval must be non-zero".to_string(),
            ));
        }
        if self.engine.max_chain_depth == 0 {
            return Err(ConfigError::Validation(
                "max chain depth must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    /// Translate the engine section into the engine's own config type.
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            poll_interval: Duration::from_secs(self.engine.poll_interval_secs),
            claim_lease: Duration::from_secs(self.engine.claim_lease_secs),
            max_chain_depth: self.engine.max_chain_depth,
            action_timeout: Duration::from_secs(self.engine.action_timeout_secs),
            max_concurrent_actions: self.engine.max_concurrent_actions,
            ..EngineConfig::default()
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:wareflow.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "wareflowd=info,wareflow_app=info".to_string(),
        }
    }
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            claim_lease_secs: 300,
            max_chain_depth: 5,
            action_timeout_secs: 30,
            max_concurrent_actions: 8,
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
