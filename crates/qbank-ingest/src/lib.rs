//! qbank Ingest Library
//!
//! Incremental ingestion of coding-interview questions into a document store.
//! Each record is stored at most once per collection; a rerun over the same
//! source only adds what is new.
//!
//! # Pipeline
//!
//! - [`catalog`]: keys already stored, loaded once per run
//! - [`source`]: candidate listing and record fetch (LeetCode API, solution trees)
//! - [`fetcher`]: per-candidate fetch with timeout and key check
//! - [`batch`]: bounded batches of accepted records
//! - [`writer`]: batch writes that survive duplicate keys
//! - [`index`]: unique index on the collection's key fields
//! - [`coordinator`]: runs the above and reports statistics
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use qbank_ingest::{
//!     Collection, Language, MemoryDocumentStore, RunCoordinator, SolutionDirectoryProvider,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let provider = SolutionDirectoryProvider::for_language("./solutions", Language::Python);
//!     let store = Arc::new(MemoryDocumentStore::new());
//!
//!     let report = RunCoordinator::new(
//!         Collection::solutions(Language::Python),
//!         Arc::new(provider),
//!         store,
//!     )
//!     .run()
//!     .await;
//!
//!     println!("{}", report.stats);
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod coverage;
pub mod error;
pub mod fetcher;
pub mod index;
pub mod normalize;
pub mod progress;
pub mod record;
pub mod source;
pub mod store;
pub mod writer;

pub use coordinator::{RunCoordinator, RunOptions, RunReport, RunState, RunStats};
pub use error::{FetchError, IngestError, SourceError, StoreError};
pub use record::{Collection, Key, Language, MetadataRecord, Record, RecordKind, SolutionRecord};
pub use source::{Candidate, LeetCodeProvider, Locator, SolutionDirectoryProvider, SourceProvider};
pub use store::{DocumentStore, MemoryDocumentStore, PgDocumentStore, WriteResult};
