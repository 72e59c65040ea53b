//! Shared helpers for qbank-ingest integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use qbank_ingest::source::{Candidate, Locator, SourceProvider};
use qbank_ingest::{FetchError, Key, MetadataRecord, Record, RecordKind, RunOptions, SourceError};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,qbank_ingest=debug,sqlx=warn")),
        )
        .with_test_writer()
        .try_init();
}

pub fn metadata(qid: u32) -> MetadataRecord {
    MetadataRecord {
        qid,
        title: format!("Problem {qid}"),
        slug: format!("problem-{qid}"),
        difficulty: "Easy".to_string(),
        hints: vec![],
        companies: vec![],
        topics: vec!["Array".to_string()],
        similar_questions: vec![],
        code_stub: BTreeMap::new(),
        question_body: format!("Statement of problem {qid}"),
        is_premium_question: false,
    }
}

pub fn question(qid: u32) -> Key {
    Key::Question { qid }
}

/// Metadata run options with no listing backoff
pub fn options(batch_size: usize) -> RunOptions {
    RunOptions {
        batch_size,
        listing_backoff: Duration::ZERO,
        ..RunOptions::for_kind(RecordKind::Metadata)
    }
}

/// In-memory question source with scripted failures
#[derive(Default)]
pub struct ScriptedProvider {
    candidates: Vec<Candidate>,
    failing: HashSet<Key>,
    delays: HashMap<Key, Duration>,
    listing_failures: AtomicUsize,
    listing_calls: AtomicUsize,
    fetched: Mutex<Vec<Key>>,
}

impl ScriptedProvider {
    /// Offer metadata candidates for `qids`, in the given order
    pub fn questions(qids: impl IntoIterator<Item = u32>) -> Self {
        Self {
            candidates: qids
                .into_iter()
                .map(|qid| Candidate::new(question(qid), Locator::Slug(format!("problem-{qid}"))))
                .collect(),
            ..Self::default()
        }
    }

    pub fn fail_fetch(mut self, qid: u32) -> Self {
        self.failing.insert(question(qid));
        self
    }

    pub fn delay_fetch(mut self, qid: u32, delay: Duration) -> Self {
        self.delays.insert(question(qid), delay);
        self
    }

    /// Fail the first `times` listing calls
    pub fn fail_listing(self, times: usize) -> Self {
        self.listing_failures.store(times, Ordering::SeqCst);
        self
    }

    pub fn listing_calls(&self) -> usize {
        self.listing_calls.load(Ordering::SeqCst)
    }

    /// Keys passed to `fetch`, in call order
    pub fn fetched(&self) -> Vec<Key> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn list_candidates(&self) -> Result<Vec<Candidate>, SourceError> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.listing_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.listing_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(SourceError::Payload("listing endpoint returned 503".into()));
        }
        Ok(self.candidates.clone())
    }

    async fn fetch(&self, candidate: &Candidate) -> Result<Record, FetchError> {
        self.fetched.lock().unwrap().push(candidate.key);
        if let Some(delay) = self.delays.get(&candidate.key) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(&candidate.key) {
            return Err(FetchError::new(candidate.key, "question page returned 500"));
        }
        Ok(Record::Metadata(metadata(candidate.key.qid())))
    }
}
