//! Snapshot of the keys already stored in a collection

use std::collections::HashSet;
use tracing::info;

use crate::error::IngestError;
use crate::record::{Collection, Key};
use crate::store::DocumentStore;

/// Point-in-time set of stored keys, read once before enumeration.
///
/// Records inserted by concurrent writers after the snapshot are not seen
/// here; the store's unique index still rejects them.
#[derive(Debug, Clone, Default)]
pub struct KeyCatalog {
    keys: HashSet<Key>,
}

impl KeyCatalog {
    pub async fn load(
        store: &dyn DocumentStore,
        collection: &Collection,
    ) -> Result<Self, IngestError> {
        let keys = store.existing_keys(collection).await?;
        info!(
            collection = %collection,
            existing = keys.len(),
            "Loaded key catalog"
        );
        Ok(Self { keys })
    }

    pub fn from_keys(keys: impl IntoIterator<Item = Key>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
