//! Problem metadata from the LeetCode web API
//!
//! Listing comes from the public problem index (`/api/problems/all/`), detail
//! from the `questionData` GraphQL query. Statement and hint HTML is reduced to
//! plain text with [`clean_text`].

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

use super::{Candidate, Locator, SourceProvider};
use crate::error::{FetchError, SourceError};
use crate::normalize::clean_text;
use crate::record::{Key, MetadataRecord, Record};

/// Default problem site
pub const DEFAULT_BASE_URL: &str = "https://leetcode.com";

/// Default per-request timeout in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = concat!("qbank-ingest/", env!("CARGO_PKG_VERSION"));

const QUESTION_QUERY: &str = r#"query questionData($titleSlug: String!) {
  question(titleSlug: $titleSlug) {
    questionFrontendId
    title
    titleSlug
    difficulty
    isPaidOnly
    content
    hints
    topicTags { name }
    similarQuestions
    codeSnippets { langSlug code }
    companyTagStats
  }
}"#;

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ProblemIndex {
    stat_status_pairs: Vec<ProblemEntry>,
}

#[derive(Debug, Deserialize)]
struct ProblemEntry {
    stat: ProblemStat,
}

#[derive(Debug, Deserialize)]
struct ProblemStat {
    frontend_question_id: Option<Value>,
    #[serde(rename = "question__title_slug")]
    title_slug: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<QuestionData>,
}

#[derive(Debug, Deserialize)]
struct QuestionData {
    question: Option<QuestionDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionDetail {
    question_frontend_id: Option<String>,
    title: Option<String>,
    title_slug: Option<String>,
    difficulty: Option<String>,
    is_paid_only: Option<bool>,
    content: Option<String>,
    hints: Option<Vec<String>>,
    topic_tags: Option<Vec<TopicTag>>,
    similar_questions: Option<String>,
    code_snippets: Option<Vec<CodeSnippet>>,
    company_tag_stats: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TopicTag {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CodeSnippet {
    lang_slug: String,
    code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimilarQuestion {
    title_slug: String,
}

// ============================================================================
// Provider
// ============================================================================

pub struct LeetCodeProvider {
    client: Client,
    base_url: String,
}

impl LeetCodeProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn question_detail(&self, slug: &str) -> Result<Option<QuestionDetail>, reqwest::Error> {
        let body = json!({
            "operationName": "questionData",
            "query": QUESTION_QUERY,
            "variables": { "titleSlug": slug },
        });

        let response: GraphQlResponse = self
            .client
            .post(format!("{}/graphql", self.base_url))
            .header("Referer", format!("{}/problems/{}/", self.base_url, slug))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.data.and_then(|data| data.question))
    }
}

#[async_trait]
impl SourceProvider for LeetCodeProvider {
    fn name(&self) -> &str {
        "leetcode"
    }

    async fn list_candidates(&self) -> Result<Vec<Candidate>, SourceError> {
        let url = format!("{}/api/problems/all/", self.base_url);
        debug!(url = %url, "Requesting problem index");

        let index: ProblemIndex = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(candidates_from_index(index))
    }

    async fn fetch(&self, candidate: &Candidate) -> Result<Record, FetchError> {
        let key = candidate.key;
        let Locator::Slug(slug) = &candidate.locator else {
            return Err(FetchError::new(
                key,
                format!("expected a question slug, got {}", candidate.locator),
            ));
        };

        let detail = self
            .question_detail(slug)
            .await
            .map_err(|e| FetchError::new(key, e))?
            .ok_or_else(|| FetchError::new(key, format!("question '{slug}' not found")))?;

        build_metadata(slug, detail)
            .map(Record::Metadata)
            .map_err(|cause| FetchError::new(key, cause))
    }
}

/// Turn the problem index into candidates sorted by question id.
/// Entries without a usable id or slug are skipped.
fn candidates_from_index(index: ProblemIndex) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = index
        .stat_status_pairs
        .into_iter()
        .filter_map(|entry| {
            let qid = entry.stat.frontend_question_id.as_ref().and_then(parse_qid);
            match (qid, entry.stat.title_slug) {
                (Some(qid), Some(slug)) if !slug.is_empty() => Some(Candidate::new(
                    Key::Question { qid },
                    Locator::Slug(slug),
                )),
                (_, slug) => {
                    warn!(slug = ?slug, "Skipping index entry without id or slug");
                    None
                },
            }
        })
        .collect();

    candidates.sort_by_key(|c| c.key.qid());
    candidates
}

/// The index reports ids as numbers, occasionally as numeric strings
fn parse_qid(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|q| u32::try_from(q).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn build_metadata(slug: &str, detail: QuestionDetail) -> Result<MetadataRecord, String> {
    let qid = detail
        .question_frontend_id
        .as_deref()
        .ok_or("missing questionFrontendId")?
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid questionFrontendId: {e}"))?;
    let title = detail.title.ok_or("missing title")?;

    let similar_questions = match detail.similar_questions.as_deref() {
        Some(raw) if !raw.trim().is_empty() => serde_json::from_str::<Vec<SimilarQuestion>>(raw)
            .map_err(|e| format!("malformed similarQuestions: {e}"))?
            .into_iter()
            .map(|q| q.title_slug)
            .collect(),
        _ => Vec::new(),
    };

    let companies = match detail.company_tag_stats.as_deref() {
        Some(raw) if !raw.trim().is_empty() => company_names(raw)?,
        _ => Vec::new(),
    };

    let code_stub: BTreeMap<String, String> = detail
        .code_snippets
        .unwrap_or_default()
        .into_iter()
        .map(|snippet| (snippet.lang_slug, snippet.code))
        .collect();

    Ok(MetadataRecord {
        qid,
        title,
        slug: detail.title_slug.unwrap_or_else(|| slug.to_string()),
        difficulty: detail.difficulty.unwrap_or_default(),
        hints: detail
            .hints
            .unwrap_or_default()
            .iter()
            .map(|hint| clean_text(hint))
            .collect(),
        companies,
        topics: detail
            .topic_tags
            .unwrap_or_default()
            .into_iter()
            .map(|tag| tag.name)
            .collect(),
        similar_questions,
        code_stub,
        question_body: detail.content.as_deref().map(clean_text).unwrap_or_default(),
        is_premium_question: detail.is_paid_only.unwrap_or(false),
    })
}

/// Company names from `companyTagStats`, a JSON object of buckets each holding
/// `[{ "name": ... }]`. Names keep first-seen order without repeats.
fn company_names(raw: &str) -> Result<Vec<String>, String> {
    let stats: Value =
        serde_json::from_str(raw).map_err(|e| format!("malformed companyTagStats: {e}"))?;

    let mut names: Vec<String> = Vec::new();
    let buckets = stats.as_object().into_iter().flat_map(|map| map.values());
    for bucket in buckets {
        for tag in bucket.as_array().into_iter().flatten() {
            if let Some(name) = tag.get("name").and_then(Value::as_str) {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
    }
    Ok(names)
}
