//! Ingestion settings read from the environment

use qbank_common::config::{env_opt, env_or, DbConfig};
use qbank_common::{QbankError, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::coordinator::{
    RunOptions, DEFAULT_LISTING_ATTEMPTS, DEFAULT_LISTING_BACKOFF, DEFAULT_PROGRESS_EVERY,
};
use crate::record::RecordKind;
use crate::source::leetcode::{DEFAULT_BASE_URL, DEFAULT_HTTP_TIMEOUT_SECS};

/// Default name of the metadata collection
pub const DEFAULT_METADATA_COLLECTION: &str = "question_metadata";

/// Deadline for one record fetch; 0 disables it
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    /// `None` when running without a database (dry runs)
    pub database: Option<DbConfig>,
    pub source_url: String,
    pub http_timeout_secs: u64,
    pub solutions_dir: Option<PathBuf>,
    pub metadata_collection: String,
    pub fetch_concurrency: usize,
    pub fetch_timeout_secs: u64,
    pub progress_every: u64,
    pub listing_attempts: u32,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            database: None,
            source_url: DEFAULT_BASE_URL.to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            solutions_dir: None,
            metadata_collection: DEFAULT_METADATA_COLLECTION.to_string(),
            fetch_concurrency: 1,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            progress_every: DEFAULT_PROGRESS_EVERY,
            listing_attempts: DEFAULT_LISTING_ATTEMPTS,
        }
    }
}

impl IngestConfig {
    /// Load settings from the environment
    ///
    /// Environment variables:
    /// - `DATABASE_URL`, `DB_MAX_CONNECTIONS`, `DB_CONNECT_TIMEOUT`
    /// - `QBANK_SOURCE_URL`, `QBANK_HTTP_TIMEOUT_SECS`
    /// - `QBANK_SOLUTIONS_DIR`
    /// - `QBANK_METADATA_COLLECTION`
    /// - `QBANK_FETCH_CONCURRENCY`, `QBANK_FETCH_TIMEOUT_SECS` (0 disables)
    /// - `QBANK_PROGRESS_EVERY`, `QBANK_LISTING_ATTEMPTS`
    pub fn from_env(require_database: bool) -> Result<Self> {
        let database = if require_database {
            Some(DbConfig::from_env()?)
        } else {
            None
        };

        let defaults = Self::default();
        let config = Self {
            database,
            source_url: env_opt("QBANK_SOURCE_URL").unwrap_or(defaults.source_url),
            http_timeout_secs: env_or("QBANK_HTTP_TIMEOUT_SECS", defaults.http_timeout_secs)?,
            solutions_dir: env_opt("QBANK_SOLUTIONS_DIR").map(PathBuf::from),
            metadata_collection: env_opt("QBANK_METADATA_COLLECTION")
                .unwrap_or(defaults.metadata_collection),
            fetch_concurrency: env_or("QBANK_FETCH_CONCURRENCY", defaults.fetch_concurrency)?,
            fetch_timeout_secs: env_or("QBANK_FETCH_TIMEOUT_SECS", defaults.fetch_timeout_secs)?,
            progress_every: env_or("QBANK_PROGRESS_EVERY", defaults.progress_every)?,
            listing_attempts: env_or("QBANK_LISTING_ATTEMPTS", defaults.listing_attempts)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch_concurrency == 0 {
            return Err(QbankError::config(
                "QBANK_FETCH_CONCURRENCY must be greater than 0",
            ));
        }
        if self.listing_attempts == 0 {
            return Err(QbankError::config(
                "QBANK_LISTING_ATTEMPTS must be greater than 0",
            ));
        }
        if self.http_timeout_secs == 0 {
            return Err(QbankError::config(
                "QBANK_HTTP_TIMEOUT_SECS must be greater than 0",
            ));
        }
        if let Some(db) = &self.database {
            db.validate()?;
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        (self.fetch_timeout_secs > 0).then(|| Duration::from_secs(self.fetch_timeout_secs))
    }

    /// Run options for a collection of `kind`, with env overrides applied
    pub fn run_options(&self, kind: RecordKind) -> RunOptions {
        RunOptions {
            fetch_concurrency: self.fetch_concurrency,
            fetch_timeout: self.fetch_timeout(),
            progress_every: self.progress_every,
            listing_attempts: self.listing_attempts,
            listing_backoff: DEFAULT_LISTING_BACKOFF,
            ..RunOptions::for_kind(kind)
        }
    }
}
