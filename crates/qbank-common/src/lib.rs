//! qbank Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling, logging, and configuration used by the qbank
//! workspace members.
//!
//! # Overview
//!
//! - **Error Handling**: [`QbankError`] and the [`Result`] alias
//! - **Logging**: `tracing` subscriber setup driven by `LOG_*` variables
//! - **Configuration**: database connection settings read from the environment
//!
//! # Example
//!
//! ```no_run
//! use qbank_common::config::DbConfig;
//! use qbank_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&LogConfig::from_env()?)?;
//!     let db = DbConfig::from_env()?;
//!     tracing::info!(max_connections = db.max_connections, "Database configured");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{QbankError, Result};
