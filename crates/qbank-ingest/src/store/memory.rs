//! In-process document store
//!
//! Behaves like the PostgreSQL backend for everything the pipeline observes:
//! unique indexes reject duplicate keys per record, other records in the same
//! call still land. Fault injection hooks let tests reject individual keys or
//! take the store offline.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;

use super::{DocumentStore, WriteResult};
use crate::error::StoreError;
use crate::record::{Collection, Key, Record};

#[derive(Debug, Default)]
struct CollectionState {
    unique_index: bool,
    documents: Vec<Value>,
    keys: HashSet<Key>,
}

#[derive(Debug)]
pub struct MemoryDocumentStore {
    collections: Mutex<HashMap<String, CollectionState>>,
    rejected: Mutex<HashSet<Key>>,
    unavailable: AtomicBool,
    /// Successful insert calls allowed before the store goes offline
    inserts_before_outage: AtomicUsize,
    insert_calls: AtomicUsize,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
            rejected: Mutex::new(HashSet::new()),
            unavailable: AtomicBool::new(false),
            inserts_before_outage: AtomicUsize::new(usize::MAX),
            insert_calls: AtomicUsize::new(0),
        }
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later insert of `key` fail with a validation error
    pub async fn reject_key(&self, key: Key) {
        self.rejected.lock().await.insert(key);
    }

    /// Simulate the store going offline (or coming back)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Go offline after `calls` more successful insert calls
    pub fn fail_after_inserts(&self, calls: usize) {
        self.inserts_before_outage.store(calls, Ordering::SeqCst);
    }

    /// Number of `insert_many` calls received, including failed ones
    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub async fn documents(&self, collection: &Collection) -> Vec<Value> {
        self.collections
            .lock()
            .await
            .get(collection.name())
            .map(|state| state.documents.clone())
            .unwrap_or_default()
    }

    pub async fn count(&self, collection: &Collection) -> usize {
        self.collections
            .lock()
            .await
            .get(collection.name())
            .map_or(0, |state| state.documents.len())
    }

    pub async fn has_unique_index(&self, collection: &Collection) -> bool {
        self.collections
            .lock()
            .await
            .get(collection.name())
            .is_some_and(|state| state.unique_index)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "memory store is offline".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn backend(&self) -> &str {
        "memory"
    }

    async fn ensure_unique_index(&self, collection: &Collection) -> Result<(), StoreError> {
        self.check_available()?;
        let mut collections = self.collections.lock().await;
        collections
            .entry(collection.name().to_string())
            .or_default()
            .unique_index = true;
        Ok(())
    }

    async fn existing_keys(&self, collection: &Collection) -> Result<HashSet<Key>, StoreError> {
        self.check_available()?;
        Ok(self
            .collections
            .lock()
            .await
            .get(collection.name())
            .map(|state| state.keys.clone())
            .unwrap_or_default())
    }

    async fn insert_many(
        &self,
        collection: &Collection,
        records: &[Record],
    ) -> Result<WriteResult, StoreError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);

        let allowed = self.inserts_before_outage.load(Ordering::SeqCst);
        if allowed == 0 {
            self.set_unavailable(true);
        } else if allowed != usize::MAX {
            self.inserts_before_outage.store(allowed - 1, Ordering::SeqCst);
        }
        self.check_available()?;

        let mut result = WriteResult::default();

        // Serialize up front; a bad record is reported on its own
        let mut documents = Vec::with_capacity(records.len());
        for record in records {
            match record.to_document() {
                Ok(doc) => documents.push((record.key(), doc)),
                Err(e) => result.other_errors.push((record.key(), e.to_string())),
            }
        }

        let rejected = self.rejected.lock().await;
        let mut collections = self.collections.lock().await;
        let state = collections.entry(collection.name().to_string()).or_default();

        for (key, doc) in documents {
            if rejected.contains(&key) {
                result
                    .other_errors
                    .push((key, "document failed validation".to_string()));
                continue;
            }
            if state.unique_index && state.keys.contains(&key) {
                result.conflicts.insert(key);
                continue;
            }
            state.documents.push(doc);
            state.keys.insert(key);
            result.inserted += 1;
        }

        Ok(result)
    }
}
