//! Application configuration
//!
//! Loaded from a TOML file (default `~/.config/showtime/config.toml`).
//! A missing file is created with defaults; missing keys fall back to
//! their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::ReservationPolicy;
use crate::infrastructure::DatabaseConfig;

/// Environment variable selecting the config file
pub const CONFIG_ENV: &str = "SHOWTIME_CONFIG";

/// `database.url` value selecting the in-memory store
pub const MEMORY_STORE_URL: &str = "memory";

/// Longest hold a reservation may be given (one day)
pub const MAX_HOLD_DURATION_SECS: u64 = 86_400;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Default config location: `<config dir>/showtime/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("showtime")
        .join("config.toml")
}

/// Config path from `SHOWTIME_CONFIG`, else the default location.
pub fn config_path_from_env() -> PathBuf {
    std::env::var(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_config_path())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseSection,
    pub reservations: ReservationConfig,
    pub payments: PaymentConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub api_host: String,
    pub api_port: u16,
    /// Seconds to wait for in-flight work on shutdown
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_host: "0.0.0.0".to_string(),
            api_port: 8080,
            shutdown_timeout: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// SeaORM URL, or `memory` for the in-memory store
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        let path = dirs_next::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("showtime")
            .join("showtime.db");
        Self {
            url: format!("sqlite://{}?mode=rwc", path.display()),
            max_connections: 5,
        }
    }
}

impl DatabaseSection {
    pub fn uses_memory_store(&self) -> bool {
        self.url.eq_ignore_ascii_case(MEMORY_STORE_URL)
    }

    pub fn to_database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
        }
    }

    /// Directory that has to exist before SQLite can create the file.
    pub fn sqlite_parent_dir(&self) -> Option<PathBuf> {
        let path = self.url.strip_prefix("sqlite://")?;
        let path = path.split('?').next().unwrap_or(path);
        if path.is_empty() || path.contains(":memory:") {
            return None;
        }
        Path::new(path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReservationConfig {
    /// How long locked seats are held for payment
    pub hold_duration_secs: u64,
    /// Reclaimer tick
    pub sweep_interval_secs: u64,
    /// Seed a demo showing on an empty store at startup
    pub seed_demo_showing: bool,
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            hold_duration_secs: 300,
            sweep_interval_secs: 60,
            seed_demo_showing: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
    /// Simulated gateway answer for `/payments/checkout`
    pub approve_all: bool,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self { approve_all: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `showtime=debug,info`
    pub level: String,
    /// `plain` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "plain".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, writing a default file first if none exists.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            return Ok(config);
        }

        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&raw).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let body = toml::to_string_pretty(self)?;
        fs::write(path, body).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.api_port == 0 {
            return Err(ConfigError::Invalid("server.api_port must be > 0".into()));
        }
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Invalid("database.url must not be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be > 0".into(),
            ));
        }
        if self.reservations.hold_duration_secs == 0 {
            return Err(ConfigError::Invalid(
                "reservations.hold_duration_secs must be > 0".into(),
            ));
        }
        if self.reservations.hold_duration_secs > MAX_HOLD_DURATION_SECS {
            return Err(ConfigError::Invalid(format!(
                "reservations.hold_duration_secs must be <= {}",
                MAX_HOLD_DURATION_SECS
            )));
        }
        if self.reservations.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "reservations.sweep_interval_secs must be > 0".into(),
            ));
        }
        match self.logging.format.to_lowercase().as_str() {
            "plain" | "json" => Ok(()),
            other => Err(ConfigError::Invalid(format!(
                "logging.format must be `plain` or `json`, got `{}`",
                other
            ))),
        }
    }

    /// Hold duration, clamped to [`MAX_HOLD_DURATION_SECS`] for configs
    /// built in code without going through [`AppConfig::validate`].
    pub fn reservation_policy(&self) -> ReservationPolicy {
        let secs = self
            .reservations
            .hold_duration_secs
            .min(MAX_HOLD_DURATION_SECS);
        ReservationPolicy {
            hold_duration: chrono::TimeDelta::try_seconds(secs as i64)
                .unwrap_or_else(|| chrono::TimeDelta::days(1)),
        }
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.reservations.sweep_interval_secs)
    }

    pub fn api_address(&self) -> String {
        format!("{}:{}", self.server.api_host, self.server.api_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [server]
            api_port = 9090

            [reservations]
            hold_duration_secs = 120
            "#,
        )
        .unwrap();

        assert_eq!(config.server.api_port, 9090);
        assert_eq!(config.server.api_host, "0.0.0.0");
        assert_eq!(config.reservations.sweep_interval_secs, 60);
        assert_eq!(
            config.reservation_policy().hold_duration,
            chrono::Duration::minutes(2)
        );
    }

    #[test]
    fn default_policy_holds_for_five_minutes() {
        assert_eq!(
            AppConfig::default().reservation_policy(),
            ReservationPolicy::default()
        );
    }

    #[test]
    fn rejects_zero_hold() {
        let err = AppConfig::from_toml("[reservations]\nhold_duration_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_hold_longer_than_a_day() {
        let err = AppConfig::from_toml("[reservations]\nhold_duration_secs = 86401\n").unwrap_err();
        assert!(err.to_string().contains("hold_duration_secs"));

        let err = AppConfig::from_toml("[reservations]\nhold_duration_secs = 9000000000000000000\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let config = AppConfig::from_toml("[reservations]\nhold_duration_secs = 86400\n").unwrap();
        assert_eq!(config.reservation_policy().hold_duration, chrono::Duration::days(1));
    }

    #[test]
    fn unvalidated_huge_hold_is_clamped() {
        let mut config = AppConfig::default();
        config.reservations.hold_duration_secs = u64::MAX;
        assert_eq!(
            config.reservation_policy().hold_duration,
            chrono::Duration::seconds(MAX_HOLD_DURATION_SECS as i64)
        );
    }

    #[test]
    fn rejects_unknown_log_format() {
        let err = AppConfig::from_toml("[logging]\nformat = \"xml\"\n").unwrap_err();
        assert!(err.to_string().contains("logging.format"));
    }

    #[test]
    fn memory_url_selects_memory_store() {
        let config = AppConfig::from_toml("[database]\nurl = \"memory\"\n").unwrap();
        assert!(config.database.uses_memory_store());
        assert!(!AppConfig::default().database.uses_memory_store());
    }

    #[test]
    fn sqlite_parent_dir_is_extracted() {
        let section = DatabaseSection {
            url: "sqlite:///var/lib/showtime/showtime.db?mode=rwc".into(),
            max_connections: 1,
        };
        assert_eq!(
            section.sqlite_parent_dir(),
            Some(PathBuf::from("/var/lib/showtime"))
        );

        let memory = DatabaseSection {
            url: "sqlite::memory:".into(),
            max_connections: 1,
        };
        assert_eq!(memory.sqlite_parent_dir(), None);
    }

    #[test]
    fn load_creates_missing_file_and_round_trips() {
        let dir = std::env::temp_dir().join(format!("showtime-config-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.toml");

        let created = AppConfig::load(&path).unwrap();
        assert!(path.exists());
        assert_eq!(AppConfig::load(&path).unwrap(), created);

        fs::remove_dir_all(&dir).ok();
    }
}
