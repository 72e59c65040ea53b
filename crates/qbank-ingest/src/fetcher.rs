//! Retrieves record bodies for accepted candidates

use std::sync::Arc;
use std::time::Duration;

use crate::error::FetchError;
use crate::record::Record;
use crate::source::{Candidate, SourceProvider};

/// Wraps a provider's fetch with an optional deadline and a key check.
///
/// Any failure, including a timeout or a record whose key does not match
/// the candidate, comes back as a [`FetchError`] for that candidate.
#[derive(Clone)]
pub struct RecordFetcher {
    provider: Arc<dyn SourceProvider>,
    timeout: Option<Duration>,
}

impl RecordFetcher {
    pub fn new(provider: Arc<dyn SourceProvider>) -> Self {
        Self {
            provider,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn fetch(&self, candidate: &Candidate) -> Result<Record, FetchError> {
        let fetched = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.provider.fetch(candidate))
                .await
                .map_err(|_| {
                    FetchError::new(candidate.key, format!("timed out after {limit:?}"))
                })?,
            None => self.provider.fetch(candidate).await,
        };

        let record = fetched?;
        if record.key() != candidate.key {
            return Err(FetchError::new(
                candidate.key,
                format!("source returned record {} instead", record.key()),
            ));
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::record::{Key, Language, SolutionRecord};
    use crate::source::Locator;
    use async_trait::async_trait;
    use std::path::PathBuf;

    /// Answers every fetch with a fixed qid after an optional delay
    struct FixedProvider {
        qid: u32,
        delay: Duration,
    }

    #[async_trait]
    impl SourceProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn list_candidates(&self) -> Result<Vec<Candidate>, SourceError> {
            Ok(vec![])
        }

        async fn fetch(&self, _candidate: &Candidate) -> Result<Record, FetchError> {
            tokio::time::sleep(self.delay).await;
            Ok(Record::Solution(SolutionRecord {
                qid: self.qid,
                code: vec!["x = 1".into()],
                language: Language::Python,
            }))
        }
    }

    fn candidate(qid: u32) -> Candidate {
        Candidate::new(
            Key::Solution {
                qid,
                language: Language::Python,
            },
            Locator::Directories(vec![PathBuf::from(format!("{qid}. Problem"))]),
        )
    }

    #[tokio::test]
    async fn test_fetch_passes_matching_record_through() {
        let fetcher = RecordFetcher::new(Arc::new(FixedProvider {
            qid: 5,
            delay: Duration::ZERO,
        }));
        let record = fetcher.fetch(&candidate(5)).await.unwrap();
        assert_eq!(record.key(), candidate(5).key);
    }

    #[tokio::test]
    async fn test_mismatched_key_is_a_fetch_error() {
        let fetcher = RecordFetcher::new(Arc::new(FixedProvider {
            qid: 6,
            delay: Duration::ZERO,
        }));
        let err = fetcher.fetch(&candidate(5)).await.unwrap_err();
        assert_eq!(err.key, candidate(5).key);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_times_out() {
        let fetcher = RecordFetcher::new(Arc::new(FixedProvider {
            qid: 5,
            delay: Duration::from_secs(60),
        }))
        .with_timeout(Some(Duration::from_secs(1)));

        let err = fetcher.fetch(&candidate(5)).await.unwrap_err();
        assert!(err.cause.contains("timed out"));
    }
}
