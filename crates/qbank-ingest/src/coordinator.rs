//! Run coordinator
//!
//! Drives one ingestion run for one collection:
//!
//! 1. Ensure the unique index on the collection's key fields
//! 2. Load the catalog of keys already stored
//! 3. List candidates from the source (retried a bounded number of times)
//! 4. For each candidate in listing order: skip known keys, fetch the rest,
//!    append fetched records to the batch accumulator and write every batch
//!    as soon as it fills
//! 5. Write the final partial batch and report
//!
//! Fetches may overlap (`fetch_concurrency`), but outcomes are consumed in
//! candidate order and all statistics and batches are handled on the
//! coordinator's own task.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

use crate::batch::{default_batch_size, Batch, BatchAccumulator};
use crate::catalog::KeyCatalog;
use crate::error::{FetchError, IngestError};
use crate::fetcher::RecordFetcher;
use crate::index::IndexGuarantor;
use crate::progress::create_run_progress;
use crate::record::{Collection, Key, Record, RecordKind};
use crate::source::{CandidateEnumerator, SourceProvider};
use crate::store::{DocumentStore, WriteResult};
use crate::writer::BatchWriter;

// ============================================================================
// Run Defaults
// ============================================================================

/// Listing calls made before the source is declared unavailable
pub const DEFAULT_LISTING_ATTEMPTS: u32 = 3;

/// Pause between listing attempts
pub const DEFAULT_LISTING_BACKOFF: Duration = Duration::from_secs(2);

/// Candidates between progress log lines
pub const DEFAULT_PROGRESS_EVERY: u64 = 100;

/// Tunables for a single run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub batch_size: usize,
    /// Fetches allowed in flight at once; 1 means strictly sequential
    pub fetch_concurrency: usize,
    pub fetch_timeout: Option<Duration>,
    pub listing_attempts: u32,
    pub listing_backoff: Duration,
    /// Log a progress line every N candidates; 0 disables it
    pub progress_every: u64,
    /// Consider at most this many candidates
    pub limit: Option<usize>,
    pub show_progress: bool,
}

impl RunOptions {
    pub fn for_kind(kind: RecordKind) -> Self {
        Self {
            batch_size: default_batch_size(kind),
            fetch_concurrency: 1,
            fetch_timeout: None,
            listing_attempts: DEFAULT_LISTING_ATTEMPTS,
            listing_backoff: DEFAULT_LISTING_BACKOFF,
            progress_every: DEFAULT_PROGRESS_EVERY,
            limit: None,
            show_progress: false,
        }
    }
}

// ============================================================================
// Run State & Statistics
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    IndexEnsured,
    Enumerating,
    Filtering,
    Fetching,
    Accumulating,
    Flushing,
    Reporting,
    Done,
    Aborted,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::IndexEnsured => "index_ensured",
            RunState::Enumerating => "enumerating",
            RunState::Filtering => "filtering",
            RunState::Fetching => "fetching",
            RunState::Accumulating => "accumulating",
            RunState::Flushing => "flushing",
            RunState::Reporting => "reporting",
            RunState::Done => "done",
            RunState::Aborted => "aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Aborted)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters for one run; only the coordinator mutates them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub candidates_seen: u64,
    pub skipped_duplicate: u64,
    pub fetched_ok: u64,
    pub fetch_failed: u64,
    pub inserted: u64,
    pub insert_conflicts: u64,
    pub insert_other_errors: u64,
    /// Fetched records never written because the run aborted
    pub abandoned: u64,
}

impl RunStats {
    /// Candidates with a final outcome
    pub fn accounted(&self) -> u64 {
        self.inserted
            + self.skipped_duplicate
            + self.fetch_failed
            + self.insert_conflicts
            + self.insert_other_errors
            + self.abandoned
    }

    /// Every candidate seen ended in exactly one outcome
    pub fn is_balanced(&self) -> bool {
        self.accounted() == self.candidates_seen
    }

    pub fn record_write(&mut self, result: &WriteResult) {
        self.inserted += result.inserted;
        self.insert_conflicts += result.conflicts.len() as u64;
        self.insert_other_errors += result.other_errors.len() as u64;
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "seen={} skipped={} fetched={} fetch_failed={} inserted={} conflicts={} other_errors={} abandoned={}",
            self.candidates_seen,
            self.skipped_duplicate,
            self.fetched_ok,
            self.fetch_failed,
            self.inserted,
            self.insert_conflicts,
            self.insert_other_errors,
            self.abandoned
        )
    }
}

/// Outcome of a run; produced whether the run finished or aborted
#[derive(Debug)]
pub struct RunReport {
    pub collection: String,
    pub stats: RunStats,
    pub final_state: RunState,
    pub error: Option<IngestError>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.completed_at - self.started_at
    }

    pub fn into_result(self) -> Result<RunStats, IngestError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.stats),
        }
    }
}

// ============================================================================
// Coordinator
// ============================================================================

enum CandidateOutcome {
    Known(Key),
    Fetched(Record),
    Failed(FetchError),
}

pub struct RunCoordinator {
    collection: Collection,
    provider: Arc<dyn SourceProvider>,
    store: Arc<dyn DocumentStore>,
    options: RunOptions,
    state: RunState,
    stats: RunStats,
}

impl RunCoordinator {
    pub fn new(
        collection: Collection,
        provider: Arc<dyn SourceProvider>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        let options = RunOptions::for_kind(collection.kind());
        Self {
            collection,
            provider,
            store,
            options,
            state: RunState::Idle,
            stats: RunStats::default(),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Run to completion. Never fails: fatal errors end up in the report
    /// next to the statistics gathered before the abort.
    pub async fn run(mut self) -> RunReport {
        let started_at = Utc::now();
        info!(
            collection = %self.collection,
            provider = self.provider.name(),
            backend = self.store.backend(),
            batch_size = self.options.batch_size,
            fetch_concurrency = self.options.fetch_concurrency,
            "Starting ingestion run"
        );

        let outcome = self.execute().await;
        self.transition(RunState::Reporting);

        if !self.stats.is_balanced() {
            warn!(
                collection = %self.collection,
                accounted = self.stats.accounted(),
                seen = self.stats.candidates_seen,
                "Run statistics do not balance"
            );
        }

        let error = match outcome {
            Ok(()) => {
                self.transition(RunState::Done);
                info!(collection = %self.collection, stats = %self.stats, "Ingestion run complete");
                None
            },
            Err(e) => {
                self.transition(RunState::Aborted);
                error!(
                    collection = %self.collection,
                    stats = %self.stats,
                    error = %e,
                    "Ingestion run aborted"
                );
                Some(e)
            },
        };

        RunReport {
            collection: self.collection.name().to_string(),
            stats: self.stats,
            final_state: self.state,
            error,
            started_at,
            completed_at: Utc::now(),
        }
    }

    async fn execute(&mut self) -> Result<(), IngestError> {
        let mut accumulator = BatchAccumulator::new(self.options.batch_size)?;

        IndexGuarantor::new(self.store.clone())
            .ensure(&self.collection)
            .await?;
        self.transition(RunState::IndexEnsured);

        let catalog = KeyCatalog::load(self.store.as_ref(), &self.collection).await?;
        let enumerator = self.open_listing().await?;
        self.transition(RunState::Enumerating);

        let limit = self.options.limit.unwrap_or(usize::MAX);
        let total = enumerator.total().min(limit);
        let progress = if self.options.show_progress {
            create_run_progress(total as u64, self.collection.name())
        } else {
            ProgressBar::hidden()
        };

        let fetcher = RecordFetcher::new(self.provider.clone())
            .with_timeout(self.options.fetch_timeout);
        let writer = BatchWriter::new(self.store.clone());

        let catalog = &catalog;
        let fetcher = &fetcher;
        let mut outcomes = stream::iter(enumerator.take(limit))
            .map(move |candidate| async move {
                if catalog.contains(&candidate.key) {
                    return CandidateOutcome::Known(candidate.key);
                }
                match fetcher.fetch(&candidate).await {
                    Ok(record) => CandidateOutcome::Fetched(record),
                    Err(e) => CandidateOutcome::Failed(e),
                }
            })
            .buffered(self.options.fetch_concurrency.max(1));

        while let Some(outcome) = outcomes.next().await {
            self.stats.candidates_seen += 1;
            self.transition(RunState::Filtering);

            match outcome {
                CandidateOutcome::Known(key) => {
                    trace!(key = %key, "Already stored, skipping");
                    self.stats.skipped_duplicate += 1;
                },
                CandidateOutcome::Failed(e) => {
                    self.transition(RunState::Fetching);
                    warn!(collection = %self.collection, key = %e.key, cause = %e.cause, "Fetch failed");
                    self.stats.fetch_failed += 1;
                },
                CandidateOutcome::Fetched(record) => {
                    self.transition(RunState::Fetching);
                    self.stats.fetched_ok += 1;
                    self.transition(RunState::Accumulating);
                    if let Some(batch) = accumulator.append(record) {
                        let pending = accumulator.len();
                        self.flush(&writer, batch, pending).await?;
                    }
                },
            }

            progress.inc(1);
            if self.options.progress_every > 0
                && self.stats.candidates_seen % self.options.progress_every == 0
            {
                info!(
                    collection = %self.collection,
                    total = total,
                    stats = %self.stats,
                    "Ingestion progress"
                );
            }
        }

        self.transition(RunState::Flushing);
        if let Some(batch) = accumulator.drain() {
            self.flush(&writer, batch, 0).await?;
        }
        progress.finish_and_clear();

        Ok(())
    }

    /// Write one batch and fold the result into the stats. On a fatal store
    /// error the batch and `pending` buffered records are counted as abandoned.
    async fn flush(
        &mut self,
        writer: &BatchWriter,
        batch: Batch,
        pending: usize,
    ) -> Result<(), IngestError> {
        self.transition(RunState::Flushing);
        match writer.write(&self.collection, &batch).await {
            Ok(result) => {
                self.stats.record_write(&result);
                Ok(())
            },
            Err(e) => {
                self.stats.abandoned += (batch.len() + pending) as u64;
                Err(e)
            },
        }
    }

    async fn open_listing(&self) -> Result<CandidateEnumerator, IngestError> {
        let attempts = self.options.listing_attempts.max(1);
        let mut attempt = 1;
        loop {
            match CandidateEnumerator::open(self.provider.as_ref()).await {
                Ok(enumerator) => return Ok(enumerator),
                Err(e) if attempt < attempts => {
                    warn!(
                        provider = self.provider.name(),
                        attempt,
                        attempts,
                        error = %e,
                        "Candidate listing failed, retrying"
                    );
                    tokio::time::sleep(self.options.listing_backoff).await;
                    attempt += 1;
                },
                Err(e) => return Err(e),
            }
        }
    }

    fn transition(&mut self, next: RunState) {
        if self.state != next {
            debug!(collection = %self.collection, from = %self.state, to = %next, "Run state");
            self.state = next;
        }
    }
}
