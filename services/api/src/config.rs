//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub database_max_connections: u32,
    pub log_level: Level,
    pub cors_origin: String,
    pub refresh_interval: Duration,
    pub currency_suffix: String,
    pub session_ttl_days: i64,
    pub document_page_lines: usize,
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
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server and Database Settings ---
        let bind_address = parse_or(&lookup, "BIND_ADDRESS", "0.0.0.0:3000".parse().ok())?;

        let database_url =
            lookup("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let database_max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", Some(5))?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        // --- Dashboard Settings ---
        let refresh_secs: u64 = parse_or(&lookup, "REFRESH_INTERVAL_SECS", Some(60))?;
        if refresh_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "REFRESH_INTERVAL_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let currency_suffix = lookup("CURRENCY_SUFFIX").unwrap_or_else(|| "OMR".to_string());
        let session_ttl_days = parse_or(&lookup, "SESSION_TTL_DAYS", Some(30))?;
        let document_page_lines = parse_or(&lookup, "DOCUMENT_PAGE_LINES", Some(50))?;

        Ok(Self {
            bind_address,
            database_url,
            database_max_connections,
            log_level,
            cors_origin,
            refresh_interval: Duration::from_secs(refresh_secs),
            currency_suffix,
            session_ttl_days,
            document_page_lines,
        })
    }
}

/// Parses `key` if set, otherwise falls back to `default`.
fn parse_or<F, T>(lookup: &F, key: &str, default: Option<T>) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => default.ok_or_else(|| ConfigError::MissingVar(key.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/dashboard")]).unwrap();
        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.refresh_interval, Duration::from_secs(60));
        assert_eq!(config.currency_suffix, "OMR");
        assert_eq!(config.session_ttl_days, 30);
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    fn database_url_is_required() {
        assert!(matches!(config_from(&[]), Err(ConfigError::MissingVar(v)) if v == "DATABASE_URL"));
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = config_from(&[
            ("DATABASE_URL", "postgres://localhost/dashboard"),
            ("REFRESH_INTERVAL_SECS", "soon"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(v, _) if v == "REFRESH_INTERVAL_SECS"));

        let err = config_from(&[
            ("DATABASE_URL", "postgres://localhost/dashboard"),
            ("REFRESH_INTERVAL_SECS", "0"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(v, _) if v == "REFRESH_INTERVAL_SECS"));
    }
}
