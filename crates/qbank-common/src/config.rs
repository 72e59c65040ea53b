//! Environment-backed configuration helpers
//!
//! Database connection settings plus small parsing helpers that the binaries
//! use to read typed values from `std::env`.

use crate::error::{QbankError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// Database Configuration Constants
// ============================================================================

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

impl DbConfig {
    /// Build a configuration for `url` with default pool settings
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
            connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
        }
    }

    /// Load database settings from the environment
    ///
    /// Environment variables:
    /// - `DATABASE_URL`: connection string (required)
    /// - `DB_MAX_CONNECTIONS`: pool size
    /// - `DB_CONNECT_TIMEOUT`: acquire timeout in seconds
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| QbankError::MissingEnv("DATABASE_URL".to_string()))?;

        let config = Self {
            url,
            max_connections: env_or("DB_MAX_CONNECTIONS", DEFAULT_DATABASE_MAX_CONNECTIONS)?,
            connect_timeout_secs: env_or(
                "DB_CONNECT_TIMEOUT",
                DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(QbankError::config("Database URL cannot be empty"));
        }

        if self.max_connections == 0 {
            return Err(QbankError::config(
                "Database max_connections must be greater than 0",
            ));
        }

        Ok(())
    }
}

/// Read `name` from the environment and parse it, falling back to `default`
/// when the variable is unset.
///
/// A variable that is set but cannot be parsed is an error rather than a
/// silent fallback.
pub fn env_or<T: FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(value) => value.trim().parse().map_err(|_| QbankError::InvalidEnv {
            name: name.to_string(),
            value,
        }),
        Err(_) => Ok(default),
    }
}

/// Read an optional string variable, treating empty values as unset
pub fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
