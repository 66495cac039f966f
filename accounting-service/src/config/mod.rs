//! Configuration module for accounting-service.

use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct AccountingConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Upload size and read-size bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitsConfig {
    pub max_upload_bytes: usize,
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub default_list_limit: u32,
    pub max_list_limit: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 20 * 1024 * 1024,
            default_page_size: 50,
            max_page_size: 500,
            default_list_limit: 200,
            max_list_limit: 1000,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl LimitsConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
            default_page_size: env_or("DEFAULT_PAGE_SIZE", defaults.default_page_size),
            max_page_size: env_or("MAX_PAGE_SIZE", defaults.max_page_size),
            default_list_limit: env_or("DEFAULT_LIST_LIMIT", defaults.default_list_limit),
            max_list_limit: env_or("MAX_LIST_LIMIT", defaults.max_list_limit),
        }
    }
}

impl AccountingConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "accounting-service".to_string()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").map_err(|_| {
                    AppError::ConfigError(anyhow::anyhow!("DATABASE_URL is required"))
                })?,
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
                min_connections: env_or("DATABASE_MIN_CONNECTIONS", 2),
            },
            limits: LimitsConfig::from_env(),
        })
    }
}
