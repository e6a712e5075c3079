//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::projection::ProjectionLifecycle;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL; the in-memory store is used when absent
    pub database_url: Option<String>,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// When dashboard snapshots are updated
    pub projection_lifecycle: ProjectionLifecycle,

    /// Catch-up interval for deferred projections
    pub projection_catch_up_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let database_max_connections = lookup("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let port = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        let projection_lifecycle = lookup("PROJECTION_LIFECYCLE")
            .unwrap_or_else(|| "inline".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PROJECTION_LIFECYCLE"))?;

        let catch_up_secs: u64 = lookup("PROJECTION_CATCH_UP_SECS")
            .unwrap_or_else(|| "30".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PROJECTION_CATCH_UP_SECS"))?;
        if catch_up_secs == 0 {
            return Err(ConfigError::InvalidValue("PROJECTION_CATCH_UP_SECS"));
        }

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            projection_lifecycle,
            projection_catch_up_interval: Duration::from_secs(catch_up_secs),
        })
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert!(config.database_url.is_none());
        assert_eq!(config.database_max_connections, 10);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3000);
        assert_eq!(config.projection_lifecycle, ProjectionLifecycle::Inline);
        assert_eq!(config.projection_catch_up_interval, Duration::from_secs(30));
        assert_eq!(config.environment, "development");
    }

    #[test]
    fn test_deferred_lifecycle() {
        let config = load(&[
            ("PROJECTION_LIFECYCLE", "deferred"),
            ("PROJECTION_CATCH_UP_SECS", "5"),
            ("DATABASE_URL", "postgres://localhost/dashboard"),
        ])
        .unwrap();
        assert_eq!(config.projection_lifecycle, ProjectionLifecycle::Deferred);
        assert_eq!(config.projection_catch_up_interval, Duration::from_secs(5));
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/dashboard")
        );
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("PORT", "eighty")]),
            Err(ConfigError::InvalidValue("PORT"))
        ));
        assert!(matches!(
            load(&[("PROJECTION_LIFECYCLE", "eventually")]),
            Err(ConfigError::InvalidValue("PROJECTION_LIFECYCLE"))
        ));
        assert!(matches!(
            load(&[("PROJECTION_CATCH_UP_SECS", "0")]),
            Err(ConfigError::InvalidValue("PROJECTION_CATCH_UP_SECS"))
        ));
    }

    #[test]
    fn test_blank_database_url_means_in_memory() {
        let config = load(&[("DATABASE_URL", "  ")]).unwrap();
        assert!(config.database_url.is_none());
    }
}
