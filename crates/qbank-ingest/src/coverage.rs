//! Compare stored keys with the keys a source offers

use std::collections::HashSet;
use std::fmt;
use tracing::info;

use crate::error::IngestError;
use crate::record::{Collection, Key};
use crate::store::DocumentStore;

/// How much of the expected key universe a collection holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageReport {
    pub collection: String,
    /// Expected keys present in the store
    pub stored: usize,
    pub expected: usize,
    /// Expected keys not yet stored, ascending
    pub missing: Vec<Key>,
}

impl CoverageReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

impl fmt::Display for CoverageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}/{} stored, {} missing",
            self.collection,
            self.stored,
            self.expected,
            self.missing.len()
        )
    }
}

pub async fn verify(
    store: &dyn DocumentStore,
    collection: &Collection,
    expected: impl IntoIterator<Item = Key>,
) -> Result<CoverageReport, IngestError> {
    let existing = store.existing_keys(collection).await?;
    let expected: HashSet<Key> = expected.into_iter().collect();

    let mut missing: Vec<Key> = expected.difference(&existing).copied().collect();
    missing.sort();

    let report = CoverageReport {
        collection: collection.name().to_string(),
        stored: expected.len() - missing.len(),
        expected: expected.len(),
        missing,
    };
    info!(
        collection = %collection,
        stored = report.stored,
        expected = report.expected,
        missing = report.missing.len(),
        "Coverage verified"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Language, Record, SolutionRecord};
    use crate::store::MemoryDocumentStore;

    fn key(qid: u32) -> Key {
        Key::Solution {
            qid,
            language: Language::Cpp,
        }
    }

    #[tokio::test]
    async fn test_missing_keys_are_sorted() {
        let store = MemoryDocumentStore::new();
        let collection = Collection::solutions(Language::Cpp);
        let records: Vec<Record> = [2, 4]
            .into_iter()
            .map(|qid| {
                Record::Solution(SolutionRecord {
                    qid,
                    code: vec!["int main() {}".into()],
                    language: Language::Cpp,
                })
            })
            .collect();
        store.insert_many(&collection, &records).await.unwrap();

        let report = verify(&store, &collection, [5, 4, 3, 2, 1].map(key))
            .await
            .unwrap();

        assert_eq!(report.stored, 2);
        assert_eq!(report.expected, 5);
        assert_eq!(report.missing, vec![key(1), key(3), key(5)]);
        assert!(!report.is_complete());
        assert_eq!(report.to_string(), "cpp_solutions: 2/5 stored, 3 missing");
    }

    #[tokio::test]
    async fn test_unexpected_stored_keys_are_ignored() {
        let store = MemoryDocumentStore::new();
        let collection = Collection::solutions(Language::Cpp);
        store
            .insert_many(
                &collection,
                &[Record::Solution(SolutionRecord {
                    qid: 99,
                    code: vec!["// extra".into()],
                    language: Language::Cpp,
                })],
            )
            .await
            .unwrap();

        let report = verify(&store, &collection, [key(1)]).await.unwrap();

        assert_eq!(report.stored, 0);
        assert_eq!(report.missing, vec![key(1)]);
    }
}
