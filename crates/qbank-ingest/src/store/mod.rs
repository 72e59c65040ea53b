//! Document store interface
//!
//! The pipeline needs three things from persistence: a unique index on a
//! collection's key fields, the set of keys already stored, and an unordered
//! insert-many that reports duplicate-key conflicts per record instead of
//! failing the whole call.
//!
//! Backends:
//! - [`postgres::PgDocumentStore`]: JSONB documents in PostgreSQL
//! - [`memory::MemoryDocumentStore`]: in-process, for tests and dry runs

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::collections::{BTreeSet, HashSet};

use crate::error::StoreError;
use crate::record::{Collection, Key, Record};

pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

/// Per-record outcome of one insert-many call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteResult {
    /// Records newly stored
    pub inserted: u64,
    /// Keys rejected by the uniqueness constraint
    pub conflicts: BTreeSet<Key>,
    /// Records rejected for any other reason, with the store's message
    pub other_errors: Vec<(Key, String)>,
}

impl WriteResult {
    /// Number of records this result accounts for
    pub fn attempted(&self) -> u64 {
        self.inserted + self.conflicts.len() as u64 + self.other_errors.len() as u64
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name for logs
    fn backend(&self) -> &str;

    /// Create the unique index on the collection's key fields if missing
    async fn ensure_unique_index(&self, collection: &Collection) -> Result<(), StoreError>;

    /// Keys of every document currently stored in `collection`
    async fn existing_keys(&self, collection: &Collection) -> Result<HashSet<Key>, StoreError>;

    /// Insert all `records`, continuing past individual failures.
    ///
    /// Returns `Err` only when the operation as a whole could not be carried
    /// out; [`StoreError::Unavailable`] marks a connection-level failure.
    async fn insert_many(
        &self,
        collection: &Collection,
        records: &[Record],
    ) -> Result<WriteResult, StoreError>;
}
