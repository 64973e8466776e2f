//! Inventory server configuration
//!
//! Loaded from environment variables (a `.env` file is read first by the
//! binary). Every value has a development default.

use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Which cache backend fronts product reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    /// In-process map, no external service
    Memory,
    /// Networked Redis
    Redis,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(CacheBackend::Memory),
            "redis" => Ok(CacheBackend::Redis),
            other => Err(format!("expected memory or redis, got {other}")),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment: development | staging | production
    pub environment: String,
    /// SQLite URL or path, e.g. `sqlite:data/inventory.db`
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    /// SQLite busy_timeout: how long a writer waits for the lock
    pub db_busy_timeout: Duration,
    pub cache_backend: CacheBackend,
    pub redis_url: String,
    /// Bound on every single cache call
    pub cache_timeout: Duration,
    /// TTL for cached rows and lists
    pub cache_ttl: Duration,
    /// TTL for cached not-found markers
    pub cache_not_found_ttl: Duration,
    /// Per-request deadline applied by the service layer
    pub request_timeout: Duration,
    pub log_level: String,
    /// Daily rolling log files go here when set
    pub log_dir: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".into(),
            database_url: "sqlite:inventory.db".into(),
            db_max_connections: 10,
            db_acquire_timeout: Duration::from_secs(5),
            db_busy_timeout: Duration::from_secs(5),
            cache_backend: CacheBackend::Memory,
            redis_url: "redis://127.0.0.1:6379".into(),
            cache_timeout: Duration::from_secs(3),
            cache_ttl: Duration::from_secs(5 * 60),
            cache_not_found_ttl: Duration::from_secs(60),
            request_timeout: Duration::from_secs(10),
            log_level: "info".into(),
            log_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Self {
            environment: get("ENVIRONMENT").unwrap_or(defaults.environment),
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            db_max_connections: positive(
                "DB_MAX_CONNECTIONS",
                get("DB_MAX_CONNECTIONS"),
                defaults.db_max_connections,
            )?,
            db_acquire_timeout: millis_or(
                "DB_ACQUIRE_TIMEOUT_MS",
                get("DB_ACQUIRE_TIMEOUT_MS"),
                defaults.db_acquire_timeout,
            )?,
            db_busy_timeout: millis_or(
                "DB_BUSY_TIMEOUT_MS",
                get("DB_BUSY_TIMEOUT_MS"),
                defaults.db_busy_timeout,
            )?,
            cache_backend: parse_or(
                "CACHE_BACKEND",
                get("CACHE_BACKEND"),
                defaults.cache_backend,
            )?,
            redis_url: get("REDIS_URL").unwrap_or(defaults.redis_url),
            cache_timeout: millis_or(
                "CACHE_TIMEOUT_MS",
                get("CACHE_TIMEOUT_MS"),
                defaults.cache_timeout,
            )?,
            cache_ttl: secs_or("CACHE_TTL_SECS", get("CACHE_TTL_SECS"), defaults.cache_ttl)?,
            cache_not_found_ttl: secs_or(
                "CACHE_NOT_FOUND_TTL_SECS",
                get("CACHE_NOT_FOUND_TTL_SECS"),
                defaults.cache_not_found_ttl,
            )?,
            request_timeout: millis_or(
                "REQUEST_TIMEOUT_MS",
                get("REQUEST_TIMEOUT_MS"),
                defaults.request_timeout,
            )?,
            log_level: get("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_dir: get("LOG_DIR"),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}

fn millis_or(
    name: &'static str,
    raw: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    positive(name, raw, default.as_millis() as u64).map(Duration::from_millis)
}

fn secs_or(
    name: &'static str,
    raw: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    positive(name, raw, default.as_secs()).map(Duration::from_secs)
}

/// Like [`parse_or`], but zero is rejected
fn positive<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Default + PartialEq,
    T::Err: std::fmt::Display,
{
    let value = parse_or(name, raw.clone(), default)?;
    if value == T::default() {
        return Err(ConfigError::Invalid {
            name,
            value: raw.unwrap_or_default(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.cache_backend, CacheBackend::Memory);
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.cache_not_found_ttl, Duration::from_secs(60));
        assert_eq!(config.db_max_connections, 10);
        assert!(config.log_dir.is_none());
        assert!(!config.is_production());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("ENVIRONMENT", "production"),
            ("DATABASE_URL", "sqlite:/var/lib/inv.db"),
            ("CACHE_BACKEND", "Redis"),
            ("REDIS_URL", "redis://cache:6379/1"),
            ("CACHE_TIMEOUT_MS", "250"),
            ("CACHE_TTL_SECS", "30"),
            ("REQUEST_TIMEOUT_MS", "1500"),
            ("LOG_DIR", "/var/log/inv"),
        ])
        .unwrap();
        assert!(config.is_production());
        assert_eq!(config.database_url, "sqlite:/var/lib/inv.db");
        assert_eq!(config.cache_backend, CacheBackend::Redis);
        assert_eq!(config.redis_url, "redis://cache:6379/1");
        assert_eq!(config.cache_timeout, Duration::from_millis(250));
        assert_eq!(config.cache_ttl, Duration::from_secs(30));
        assert_eq!(config.request_timeout, Duration::from_millis(1500));
        assert_eq!(config.log_dir.as_deref(), Some("/var/log/inv"));
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = config_from(&[("LOG_DIR", "  "), ("DB_MAX_CONNECTIONS", "")]).unwrap();
        assert!(config.log_dir.is_none());
        assert_eq!(config.db_max_connections, 10);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = config_from(&[("DB_MAX_CONNECTIONS", "many")]).unwrap_err();
        assert!(err.to_string().contains("DB_MAX_CONNECTIONS"));
        assert!(config_from(&[("CACHE_BACKEND", "memcached")]).is_err());
        assert!(config_from(&[("CACHE_TTL_SECS", "0")]).is_err());
        assert!(config_from(&[("REQUEST_TIMEOUT_MS", "-1")]).is_err());
    }

    #[test]
    fn test_zero_connections_rejected() {
        let err = config_from(&[("DB_MAX_CONNECTIONS", "0")]).unwrap_err();
        assert!(err.to_string().contains("DB_MAX_CONNECTIONS"));
        let config = config_from(&[("DB_MAX_CONNECTIONS", "1")]).unwrap();
        assert_eq!(config.db_max_connections, 1);
    }
}
