//! Uniqueness constraint on a collection's key fields

use std::sync::Arc;
use tracing::{debug, info};

use crate::error::IngestError;
use crate::record::Collection;
use crate::store::DocumentStore;

/// Makes sure the store enforces key uniqueness before anything is written
pub struct IndexGuarantor {
    store: Arc<dyn DocumentStore>,
}

impl IndexGuarantor {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Idempotent; safe to call at the start of every run
    pub async fn ensure(&self, collection: &Collection) -> Result<(), IngestError> {
        let fields = collection.kind().key_fields();
        debug!(collection = %collection, ?fields, "Ensuring unique index");

        self.store.ensure_unique_index(collection).await?;

        info!(
            collection = %collection,
            backend = self.store.backend(),
            "Unique index on {} ensured",
            fields.join(", ")
        );
        Ok(())
    }
}
