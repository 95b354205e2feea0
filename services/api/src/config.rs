//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use axum::http::HeaderValue;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;
use ub_reader_core::history::DEFAULT_HISTORY_LIMIT;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    /// Directory imported at startup when its publication is not stored yet.
    pub content_dir: Option<PathBuf>,
    pub history_limit: usize,
    pub session_ttl_days: i64,
    pub cors_origin: HeaderValue,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // --- Load Server and Database Settings ---
        let bind_address_str = lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| "sqlite://ub_reader.db?mode=rwc".to_string());

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Reader Settings ---
        let content_dir = lookup("CONTENT_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from);

        let history_limit = parse_number(&lookup, "HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT)?;
        if history_limit == 0 {
            return Err(ConfigError::InvalidValue(
                "HISTORY_LIMIT".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let session_ttl_days = parse_number(&lookup, "SESSION_TTL_DAYS", 30)?;
        if session_ttl_days <= 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_DAYS".to_string(),
                "must be positive".to_string(),
            ));
        }

        let cors_origin_str =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());
        let cors_origin = cors_origin_str.parse::<HeaderValue>().map_err(|e| {
            ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string())
        })?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            content_dir,
            history_limit,
            session_ttl_days,
            cors_origin,
        })
    }
}

fn parse_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config(&[]).unwrap();
        assert_eq!(config.bind_address.port(), 3000);
        assert_eq!(config.database_url, "sqlite://ub_reader.db?mode=rwc");
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.history_limit, 50);
        assert_eq!(config.session_ttl_days, 30);
        assert!(config.content_dir.is_none());
    }

    #[test]
    fn invalid_values_are_reported_by_name() {
        for (name, value) in [
            ("BIND_ADDRESS", "nowhere"),
            ("RUST_LOG", "chatty"),
            ("HISTORY_LIMIT", "lots"),
            ("HISTORY_LIMIT", "0"),
            ("SESSION_TTL_DAYS", "-1"),
        ] {
            match config(&[(name, value)]) {
                Err(ConfigError::InvalidValue(var, _)) => assert_eq!(var, name),
                other => panic!("{}={} gave {:?}", name, value, other),
            }
        }
    }

    #[test]
    fn content_dir_is_optional() {
        let config = config(&[("CONTENT_DIR", "./content"), ("HISTORY_LIMIT", "10")]).unwrap();
        assert_eq!(config.content_dir, Some(PathBuf::from("./content")));
        assert_eq!(config.history_limit, 10);
    }
}
