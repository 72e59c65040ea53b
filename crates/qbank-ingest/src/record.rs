//! Record model
//!
//! Two fixed record shapes share nothing beyond their key, so they are kept as
//! a tagged [`Record`] enum with a common [`Record::key`] accessor. The stored
//! document for each shape is the plain serde serialization of its struct.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Solution language, selected by source file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "Python")]
    Python,
    #[serde(rename = "Java")]
    Java,
    #[serde(rename = "C++")]
    Cpp,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Python, Language::Java, Language::Cpp];

    /// Map a file extension (without the dot) to a language
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "py" => Some(Language::Python),
            "java" => Some(Language::Java),
            "cpp" => Some(Language::Cpp),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Language::Python => "py",
            Language::Java => "java",
            Language::Cpp => "cpp",
        }
    }

    /// Tag stored in the `language` field of solution documents
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Python => "Python",
            Language::Java => "Java",
            Language::Cpp => "C++",
        }
    }

    /// Collection that holds this language's solutions unless overridden
    pub fn default_collection(self) -> &'static str {
        match self {
            Language::Python => "python_solutions",
            Language::Java => "java_solutions",
            Language::Cpp => "cpp_solutions",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(Language::Python),
            "java" => Ok(Language::Java),
            "cpp" | "c++" => Ok(Language::Cpp),
            other => Err(format!(
                "unknown language '{other}' (expected python, java or cpp)"
            )),
        }
    }
}

/// Collection-scoped identity of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Question { qid: u32 },
    Solution { qid: u32, language: Language },
}

impl Key {
    pub fn qid(&self) -> u32 {
        match self {
            Key::Question { qid } | Key::Solution { qid, .. } => *qid,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Question { qid } => write!(f, "{qid}"),
            Key::Solution { qid, language } => write!(f, "{qid}/{language}"),
        }
    }
}

/// The two record shapes the pipeline knows how to store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Metadata,
    Solution,
}

impl RecordKind {
    /// Document fields that together form the unique key
    pub fn key_fields(self) -> &'static [&'static str] {
        match self {
            RecordKind::Metadata => &["qid"],
            RecordKind::Solution => &["qid", "language"],
        }
    }

    /// Rebuild a [`Key`] from a stored document (or a projection holding at
    /// least the key fields). Returns `None` for documents without a usable key.
    pub fn key_from_document(self, doc: &Value) -> Option<Key> {
        let qid = doc.get("qid")?.as_u64().and_then(|q| u32::try_from(q).ok())?;
        match self {
            RecordKind::Metadata => Some(Key::Question { qid }),
            RecordKind::Solution => {
                let language = doc.get("language")?.as_str()?.parse().ok()?;
                Some(Key::Solution { qid, language })
            },
        }
    }
}

/// A named target collection in the document store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Collection {
    name: String,
    kind: RecordKind,
}

impl Collection {
    pub fn new(name: impl Into<String>, kind: RecordKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn metadata(name: impl Into<String>) -> Self {
        Self::new(name, RecordKind::Metadata)
    }

    /// The default collection for `language`'s solutions
    pub fn solutions(language: Language) -> Self {
        Self::new(language.default_collection(), RecordKind::Solution)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Problem metadata scraped from the question source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub qid: u32,
    pub title: String,
    pub slug: String,
    pub difficulty: String,
    /// Hints, already normalized to plain text
    pub hints: Vec<String>,
    pub companies: Vec<String>,
    pub topics: Vec<String>,
    /// Slugs of related questions
    pub similar_questions: Vec<String>,
    /// Template code keyed by language slug
    pub code_stub: BTreeMap<String, String>,
    /// Problem statement, normalized to plain text
    pub question_body: String,
    pub is_premium_question: bool,
}

/// All solution fragments for one question in one language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionRecord {
    pub qid: u32,
    pub code: Vec<String>,
    pub language: Language,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Metadata(MetadataRecord),
    Solution(SolutionRecord),
}

impl Record {
    pub fn key(&self) -> Key {
        match self {
            Record::Metadata(m) => Key::Question { qid: m.qid },
            Record::Solution(s) => Key::Solution {
                qid: s.qid,
                language: s.language,
            },
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Metadata(_) => RecordKind::Metadata,
            Record::Solution(_) => RecordKind::Solution,
        }
    }

    /// The JSON document persisted for this record
    pub fn to_document(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl From<MetadataRecord> for Record {
    fn from(record: MetadataRecord) -> Self {
        Record::Metadata(record)
    }
}

impl From<SolutionRecord> for Record {
    fn from(record: SolutionRecord) -> Self {
        Record::Solution(record)
    }
}
