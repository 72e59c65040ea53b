//! Solutions from a local directory tree
//!
//! Each problem lives in a directory named `{id}. {title}` holding one or more
//! source files. Problem directories sit either directly under the root or one
//! level below it in range folders:
//!
//! ```text
//! solutions/
//!   1. Two Sum/two_sum.py
//!   0001-0100/
//!     2. Add Two Numbers/Solution.java
//! ```

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{Candidate, Locator, SourceProvider};
use crate::error::{FetchError, SourceError};
use crate::record::{Key, Language, Record, SolutionRecord};

pub struct SolutionDirectoryProvider {
    root: PathBuf,
    languages: Vec<Language>,
}

impl SolutionDirectoryProvider {
    /// Offer candidates for each of `languages` found under `root`
    pub fn new(root: impl Into<PathBuf>, languages: Vec<Language>) -> Self {
        Self {
            root: root.into(),
            languages,
        }
    }

    /// Offer candidates for a single language
    pub fn for_language(root: impl Into<PathBuf>, language: Language) -> Self {
        Self::new(root, vec![language])
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl SourceProvider for SolutionDirectoryProvider {
    fn name(&self) -> &str {
        "solutions-dir"
    }

    async fn list_candidates(&self) -> Result<Vec<Candidate>, SourceError> {
        let root = self.root.clone();
        let languages = self.languages.clone();

        tokio::task::spawn_blocking(move || scan_tree(&root, &languages))
            .await
            .map_err(|e| SourceError::Io(io::Error::other(e)))?
    }

    async fn fetch(&self, candidate: &Candidate) -> Result<Record, FetchError> {
        let key = candidate.key;
        let (Key::Solution { qid, language }, Locator::Directories(dirs)) =
            (key, &candidate.locator)
        else {
            return Err(FetchError::new(key, "not a solution candidate"));
        };

        let mut code = Vec::new();
        for dir in dirs {
            for path in language_files(dir, language)
                .await
                .map_err(|e| FetchError::new(key, format!("{}: {e}", dir.display())))?
            {
                match tokio::fs::read(&path).await {
                    Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => {
                        debug!(path = %path.display(), "Skipping empty solution file");
                    },
                    Ok(bytes) => code.push(String::from_utf8_lossy(&bytes).into_owned()),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Unreadable solution file");
                    },
                }
            }
        }

        if code.is_empty() {
            return Err(FetchError::new(
                key,
                format!("no readable {language} files in {}", candidate.locator),
            ));
        }

        Ok(Record::Solution(SolutionRecord {
            qid,
            code,
            language,
        }))
    }
}

/// Files of `language` directly inside `dir`, sorted by file name
async fn language_files(dir: &Path, language: Language) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
        if is_file && language_of(&path) == Some(language) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Walk the tree and emit one candidate per (question id, language) pair that
/// has at least one file, sorted by key.
///
/// A question id may appear in more than one range folder; its directories
/// are merged into a single candidate. Unreadable folders below the root are
/// logged and skipped.
fn scan_tree(root: &Path, languages: &[Language]) -> Result<Vec<Candidate>, SourceError> {
    let mut problems: BTreeMap<Key, Vec<PathBuf>> = BTreeMap::new();

    for entry in std::fs::read_dir(root)? {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                warn!(root = %root.display(), error = %e, "Skipping unreadable entry");
                continue;
            },
        };
        if !path.is_dir() {
            continue;
        }
        if let Some(qid) = problem_id(&path) {
            collect_problem(&path, qid, languages, &mut problems);
            continue;
        }
        // Range folder; look one level deeper
        let nested_entries = match std::fs::read_dir(&path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable folder");
                continue;
            },
        };
        for nested in nested_entries {
            let nested = match nested {
                Ok(entry) => entry.path(),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable entry");
                    continue;
                },
            };
            if !nested.is_dir() {
                continue;
            }
            match problem_id(&nested) {
                Some(qid) => collect_problem(&nested, qid, languages, &mut problems),
                None => debug!(path = %nested.display(), "Ignoring non-problem directory"),
            }
        }
    }

    Ok(problems
        .into_iter()
        .map(|(key, mut dirs)| {
            dirs.sort();
            if dirs.len() > 1 {
                debug!(key = %key, directories = dirs.len(), "Merging problem directories");
            }
            Candidate::new(key, Locator::Directories(dirs))
        })
        .collect())
}

fn collect_problem(
    dir: &Path,
    qid: u32,
    languages: &[Language],
    problems: &mut BTreeMap<Key, Vec<PathBuf>>,
) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "Skipping unreadable problem directory");
            return;
        },
    };

    let mut present = BTreeSet::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() {
            present.extend(language_of(&path));
        }
    }

    for language in languages.iter().filter(|l| present.contains(*l)) {
        problems
            .entry(Key::Solution {
                qid,
                language: *language,
            })
            .or_default()
            .push(dir.to_path_buf());
    }
}

/// Question id from a directory named like `42. Trapping Rain Water`
fn problem_id(dir: &Path) -> Option<u32> {
    let name = dir.file_name()?.to_str()?;
    let (digits, _) = name.split_once('.')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn language_of(path: &Path) -> Option<Language> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(Language::from_extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_problem_id() {
        assert_eq!(problem_id(Path::new("/x/42. Trapping Rain Water")), Some(42));
        assert_eq!(problem_id(Path::new("0001. Two Sum")), Some(1));
        assert_eq!(problem_id(Path::new("0001-0100")), None);
        assert_eq!(problem_id(Path::new("notes.d")), None);
        assert_eq!(problem_id(Path::new(". hidden")), None);
    }

    #[test]
    fn test_language_of() {
        assert_eq!(language_of(Path::new("a/solution.py")), Some(Language::Python));
        assert_eq!(language_of(Path::new("a/Main.JAVA")), Some(Language::Java));
        assert_eq!(language_of(Path::new("a/README.md")), None);
        assert_eq!(language_of(Path::new("a/Makefile")), None);
    }
}
