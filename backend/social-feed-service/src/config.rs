/// Configuration management for the social feed service
///
/// Everything comes from environment variables; `main` loads `.env` first.
use anyhow::{bail, Context, Result};
use std::str::FromStr;

use crate::pagination::PaginationConfig;
use crate::services::analytics::{AnalyticsConfig, Window};

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub storage: StorageBackend,
    /// Only present for the postgres backend
    pub database: Option<DatabaseConfig>,
    pub pagination: PaginationConfig,
    pub analytics: AnalyticsConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => bail!("unknown STORAGE_BACKEND '{}' (expected postgres or memory)", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let storage: StorageBackend = env_or("STORAGE_BACKEND", "postgres").parse()?;

        let database = match storage {
            StorageBackend::Postgres => Some(DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .context("DATABASE_URL must be set for the postgres backend")?,
                max_connections: parse_env_or_default("DB_MAX_CONNECTIONS", 20)?,
                min_connections: parse_env_or_default("DB_MIN_CONNECTIONS", 5)?,
                acquire_timeout_secs: parse_env_or_default("DB_ACQUIRE_TIMEOUT_SECS", 10)?,
            }),
            StorageBackend::Memory => None,
        };

        let pagination = PaginationConfig {
            default_limit: parse_env_or_default("PAGINATION_DEFAULT_LIMIT", 20)?,
            max_limit: parse_env_or_default("PAGINATION_MAX_LIMIT", 100)?,
            notification_default_limit: parse_env_or_default("NOTIFICATION_DEFAULT_LIMIT", 50)?,
        };
        if pagination.default_limit == 0 || pagination.default_limit > pagination.max_limit {
            bail!(
                "PAGINATION_DEFAULT_LIMIT must be between 1 and PAGINATION_MAX_LIMIT ({})",
                pagination.max_limit
            );
        }

        let defaults = AnalyticsConfig::default();
        let analytics = AnalyticsConfig {
            signup_days: window_from_env("SIGNUP_DAYS", defaults.signup_days)?,
            activity_days: window_from_env("ACTIVITY_DAYS", defaults.activity_days)?,
            retention_weeks: window_from_env("RETENTION_WEEKS", defaults.retention_weeks)?,
            top_agents: window_from_env("TOP_AGENTS", defaults.top_agents)?,
        };

        Ok(Config {
            app: AppConfig {
                env: env_or("APP_ENV", "development"),
                host: env_or("APP_HOST", "0.0.0.0"),
                port: parse_env_or_default("PORT", 8080)?,
            },
            storage,
            database,
            pagination,
            analytics,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}

/// `ANALYTICS_<NAME>_DEFAULT` / `ANALYTICS_<NAME>_MAX`
fn window_from_env(name: &str, fallback: Window) -> Result<Window> {
    let window = Window::new(
        parse_env_or_default(&format!("ANALYTICS_{}_DEFAULT", name), fallback.default)?,
        parse_env_or_default(&format!("ANALYTICS_{}_MAX", name), fallback.max)?,
    );
    if window.default == 0 || window.default > window.max {
        bail!("ANALYTICS_{}_DEFAULT must be between 1 and ANALYTICS_{}_MAX", name, name);
    }
    Ok(window)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_backend_parsing() {
        assert_eq!("postgres".parse::<StorageBackend>().unwrap(), StorageBackend::Postgres);
        assert_eq!(" Memory ".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert!("redis".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_parse_env_or_default_uses_default_when_unset() {
        let value: u32 = parse_env_or_default("SOCIAL_FEED_TEST_UNSET_KEY", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_parse_env_or_default_rejects_garbage() {
        std::env::set_var("SOCIAL_FEED_TEST_BAD_NUMBER", "twelve");
        let result: Result<u32> = parse_env_or_default("SOCIAL_FEED_TEST_BAD_NUMBER", 1);
        assert!(result.is_err());
        std::env::remove_var("SOCIAL_FEED_TEST_BAD_NUMBER");
    }

    #[test]
    fn test_analytics_window_defaults() {
        let cfg = AnalyticsConfig::default();
        assert_eq!(cfg.signup_days, Window::new(30, 365));
        assert_eq!(cfg.activity_days, Window::new(14, 90));
        assert_eq!(cfg.retention_weeks, Window::new(8, 52));
        assert_eq!(cfg.top_agents, Window::new(10, 50));
    }

    #[test]
    fn test_window_from_env_falls_back() {
        let window = window_from_env("SOCIAL_FEED_TEST_UNSET", Window::new(3, 9)).unwrap();
        assert_eq!(window, Window::new(3, 9));
    }
}
