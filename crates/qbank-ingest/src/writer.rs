//! Persists completed batches

use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::batch::Batch;
use crate::error::IngestError;
use crate::record::Collection;
use crate::store::{DocumentStore, WriteResult};

/// Writes one batch per call, turning per-record failures into counts.
///
/// Duplicate-key conflicts and other per-record rejections never abort the
/// batch. Only a store that cannot be reached at all is reported as an error.
pub struct BatchWriter {
    store: Arc<dyn DocumentStore>,
}

impl BatchWriter {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn write(
        &self,
        collection: &Collection,
        batch: &Batch,
    ) -> Result<WriteResult, IngestError> {
        if batch.is_empty() {
            return Ok(WriteResult::default());
        }

        let result = match self.store.insert_many(collection, batch.records()).await {
            Ok(result) => result,
            Err(e) if e.is_unavailable() => {
                error!(
                    collection = %collection,
                    batch_size = batch.len(),
                    error = %e,
                    "Store unavailable while writing batch"
                );
                return Err(IngestError::StoreUnavailable(e.to_string()));
            },
            Err(e) => {
                // The store refused the call as a whole; nothing from this batch landed
                let message = e.to_string();
                warn!(
                    collection = %collection,
                    batch_size = batch.len(),
                    error = %message,
                    "Batch rejected by store"
                );
                WriteResult {
                    other_errors: batch.keys().map(|key| (key, message.clone())).collect(),
                    ..WriteResult::default()
                }
            },
        };

        for key in &result.conflicts {
            debug!(collection = %collection, key = %key, "Duplicate key, record skipped");
        }
        for (key, message) in &result.other_errors {
            warn!(collection = %collection, key = %key, error = %message, "Record not written");
        }
        debug!(
            collection = %collection,
            inserted = result.inserted,
            conflicts = result.conflicts.len(),
            other_errors = result.other_errors.len(),
            "Batch written"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchAccumulator;
    use crate::record::{Key, Language, Record, SolutionRecord};
    use crate::store::MemoryDocumentStore;

    fn solution(qid: u32) -> Record {
        Record::Solution(SolutionRecord {
            qid,
            code: vec!["print(1)".to_string()],
            language: Language::Python,
        })
    }

    fn batch_of(qids: &[u32]) -> Batch {
        let mut acc = BatchAccumulator::new(1000).unwrap();
        for qid in qids {
            assert!(acc.append(solution(*qid)).is_none());
        }
        acc.drain().unwrap()
    }

    fn key(qid: u32) -> Key {
        Key::Solution {
            qid,
            language: Language::Python,
        }
    }

    #[tokio::test]
    async fn test_conflicts_are_counted_not_fatal() {
        let store = Arc::new(MemoryDocumentStore::new());
        let collection = Collection::solutions(Language::Python);
        store.ensure_unique_index(&collection).await.unwrap();
        let writer = BatchWriter::new(store.clone());

        writer.write(&collection, &batch_of(&[2])).await.unwrap();
        let result = writer
            .write(&collection, &batch_of(&[1, 2, 3]))
            .await
            .unwrap();

        assert_eq!(result.inserted, 2);
        assert_eq!(result.conflicts.into_iter().collect::<Vec<_>>(), vec![key(2)]);
        assert_eq!(store.count(&collection).await, 3);
    }

    #[tokio::test]
    async fn test_other_errors_keep_their_keys() {
        let store = Arc::new(MemoryDocumentStore::new());
        let collection = Collection::solutions(Language::Python);
        store.reject_key(key(7)).await;
        let writer = BatchWriter::new(store);

        let result = writer
            .write(&collection, &batch_of(&[6, 7, 8]))
            .await
            .unwrap();

        assert_eq!(result.inserted, 2);
        assert_eq!(result.other_errors.len(), 1);
        assert_eq!(result.other_errors[0].0, key(7));
    }

    #[tokio::test]
    async fn test_unavailable_store_is_fatal() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.set_unavailable(true);
        let writer = BatchWriter::new(store);

        let err = writer
            .write(&Collection::solutions(Language::Python), &batch_of(&[1]))
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::StoreUnavailable(_)));
    }
}
