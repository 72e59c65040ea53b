//! Record sources
//!
//! A source is asked once for the list of candidates it can offer, then for
//! the full body of each candidate the pipeline decides to keep.

pub mod leetcode;
pub mod solutions;

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use tracing::info;

use crate::error::{FetchError, IngestError, SourceError};
use crate::record::{Key, Record};

pub use leetcode::LeetCodeProvider;
pub use solutions::SolutionDirectoryProvider;

/// Where a provider finds a candidate's body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Question slug on the problem site
    Slug(String),
    /// Every directory of one problem in a solutions tree, in path order
    Directories(Vec<PathBuf>),
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Slug(slug) => f.write_str(slug),
            Locator::Directories(dirs) => {
                for (i, dir) in dirs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", dir.display())?;
                }
                Ok(())
            },
        }
    }
}

/// An identifier the source offers, before its body is fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub key: Key,
    pub locator: Locator,
}

impl Candidate {
    pub fn new(key: Key, locator: Locator) -> Self {
        Self { key, locator }
    }
}

#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Short provider name for logs
    fn name(&self) -> &str;

    /// Every candidate the source currently offers, in source order
    async fn list_candidates(&self) -> Result<Vec<Candidate>, SourceError>;

    /// Build the full record for `candidate`
    async fn fetch(&self, candidate: &Candidate) -> Result<Record, FetchError>;
}

/// Finite, single-pass sequence of candidates from one listing call
#[derive(Debug)]
pub struct CandidateEnumerator {
    total: usize,
    candidates: std::vec::IntoIter<Candidate>,
}

impl CandidateEnumerator {
    /// Perform the listing call. No retry happens here.
    pub async fn open(provider: &dyn SourceProvider) -> Result<Self, IngestError> {
        let candidates = provider.list_candidates().await?;
        info!(
            provider = provider.name(),
            candidates = candidates.len(),
            "Candidate listing retrieved"
        );
        Ok(Self::from_candidates(candidates))
    }

    pub fn from_candidates(candidates: Vec<Candidate>) -> Self {
        Self {
            total: candidates.len(),
            candidates: candidates.into_iter(),
        }
    }

    /// Size of the listing, regardless of how much has been consumed
    pub fn total(&self) -> usize {
        self.total
    }
}

impl Iterator for CandidateEnumerator {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        self.candidates.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.candidates.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(qid: u32) -> Candidate {
        Candidate::new(Key::Question { qid }, Locator::Slug(format!("q-{qid}")))
    }

    #[test]
    fn test_enumerator_is_single_pass_in_listing_order() {
        let mut candidates = CandidateEnumerator::from_candidates(vec![
            candidate(3),
            candidate(1),
            candidate(2),
        ]);

        assert_eq!(candidates.total(), 3);
        let qids: Vec<u32> = candidates.by_ref().map(|c| c.key.qid()).collect();
        assert_eq!(qids, vec![3, 1, 2]);
        assert!(candidates.next().is_none());
        assert_eq!(candidates.total(), 3);
    }

    #[test]
    fn test_locator_display() {
        assert_eq!(Locator::Slug("two-sum".into()).to_string(), "two-sum");
        assert_eq!(
            Locator::Directories(vec![PathBuf::from("/data/1. Two Sum")]).to_string(),
            "/data/1. Two Sum"
        );
        assert_eq!(
            Locator::Directories(vec![
                PathBuf::from("/data/0001-0100/1. Two Sum"),
                PathBuf::from("/data/extra/1. Two Sum"),
            ])
            .to_string(),
            "/data/0001-0100/1. Two Sum, /data/extra/1. Two Sum"
        );
    }
}
