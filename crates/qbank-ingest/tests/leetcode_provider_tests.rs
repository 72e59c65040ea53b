//! LeetCode provider against a mocked problem site

mod common;

use common::{init_tracing, options};
use qbank_ingest::source::{Candidate, Locator, SourceProvider};
use qbank_ingest::{
    Collection, Key, LeetCodeProvider, MemoryDocumentStore, Record, RunCoordinator, RunOptions,
    RunState,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn problem_index() -> Value {
    json!({
        "num_total": 3,
        "stat_status_pairs": [
            { "stat": { "frontend_question_id": 2, "question__title_slug": "add-two-numbers" }, "paid_only": false },
            { "stat": { "frontend_question_id": 1, "question__title_slug": "two-sum" }, "paid_only": false },
            { "stat": { "frontend_question_id": 3, "question__title_slug": "longest-substring-without-repeating-characters" }, "paid_only": false }
        ]
    })
}

fn question_payload(id: &str, title: &str, slug: &str) -> Value {
    json!({
        "data": {
            "question": {
                "questionFrontendId": id,
                "title": title,
                "titleSlug": slug,
                "difficulty": "Medium",
                "isPaidOnly": false,
                "content": "<p>Return <code>true</code> if <em>n</em> &lt;= 10<sup>5</sup>.</p>",
                "hints": ["Think about <strong>two pointers</strong>."],
                "topicTags": [{ "name": "Linked List" }, { "name": "Math" }],
                "similarQuestions": "[{\"title\":\"Multiply Strings\",\"titleSlug\":\"multiply-strings\",\"difficulty\":\"Medium\"}]",
                "codeSnippets": [
                    { "langSlug": "cpp", "code": "class Solution {};" },
                    { "langSlug": "python3", "code": "class Solution:" }
                ],
                "companyTagStats": null
            }
        }
    })
}

async fn mount_question(server: &MockServer, slug: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({ "variables": { "titleSlug": slug } })))
        .respond_with(response)
        .mount(server)
        .await;
}

fn provider(server: &MockServer) -> LeetCodeProvider {
    LeetCodeProvider::new(server.uri(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_listing_is_sorted_by_question_id() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/problems/all/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(problem_index()))
        .mount(&server)
        .await;

    let candidates = provider(&server).list_candidates().await.unwrap();

    let qids: Vec<u32> = candidates.iter().map(|c| c.key.qid()).collect();
    assert_eq!(qids, vec![1, 2, 3]);
    assert_eq!(candidates[1].locator, Locator::Slug("add-two-numbers".into()));
}

#[tokio::test]
async fn test_listing_server_error_is_reported() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/problems/all/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    assert!(provider(&server).list_candidates().await.is_err());
}

#[tokio::test]
async fn test_fetch_builds_normalized_metadata() {
    init_tracing();
    let server = MockServer::start().await;
    mount_question(
        &server,
        "add-two-numbers",
        ResponseTemplate::new(200).set_body_json(question_payload(
            "2",
            "Add Two Numbers",
            "add-two-numbers",
        )),
    )
    .await;

    let candidate = Candidate::new(
        Key::Question { qid: 2 },
        Locator::Slug("add-two-numbers".into()),
    );
    let Record::Metadata(record) = provider(&server).fetch(&candidate).await.unwrap() else {
        panic!("expected a metadata record");
    };

    assert_eq!(record.qid, 2);
    assert_eq!(record.title, "Add Two Numbers");
    assert_eq!(record.question_body, "Return true if n <= 10^5.");
    assert_eq!(record.hints, vec!["Think about two pointers."]);
    assert_eq!(record.topics, vec!["Linked List", "Math"]);
    assert_eq!(record.similar_questions, vec!["multiply-strings"]);
    assert_eq!(record.code_stub.len(), 2);
    assert!(record.companies.is_empty());
}

#[tokio::test]
async fn test_fetch_null_question_is_a_fetch_error() {
    init_tracing();
    let server = MockServer::start().await;
    mount_question(
        &server,
        "gone",
        ResponseTemplate::new(200).set_body_json(json!({ "data": { "question": null } })),
    )
    .await;

    let candidate = Candidate::new(Key::Question { qid: 9 }, Locator::Slug("gone".into()));
    let err = provider(&server).fetch(&candidate).await.unwrap_err();

    assert_eq!(err.key, Key::Question { qid: 9 });
    assert!(err.cause.contains("not found"));
}

#[tokio::test]
async fn test_fetch_timeout_is_a_fetch_error() {
    init_tracing();
    let server = MockServer::start().await;
    mount_question(
        &server,
        "slow",
        ResponseTemplate::new(200)
            .set_body_json(question_payload("4", "Slow", "slow"))
            .set_delay(Duration::from_secs(2)),
    )
    .await;

    let provider = LeetCodeProvider::new(server.uri(), Duration::from_millis(200)).unwrap();
    let candidate = Candidate::new(Key::Question { qid: 4 }, Locator::Slug("slow".into()));

    assert!(provider.fetch(&candidate).await.is_err());
}

#[tokio::test]
async fn test_metadata_run_against_mocked_site() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/problems/all/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(problem_index()))
        .mount(&server)
        .await;
    mount_question(
        &server,
        "two-sum",
        ResponseTemplate::new(200).set_body_json(question_payload("1", "Two Sum", "two-sum")),
    )
    .await;
    mount_question(
        &server,
        "add-two-numbers",
        ResponseTemplate::new(200).set_body_json(question_payload(
            "2",
            "Add Two Numbers",
            "add-two-numbers",
        )),
    )
    .await;
    mount_question(
        &server,
        "longest-substring-without-repeating-characters",
        ResponseTemplate::new(500),
    )
    .await;

    let store = Arc::new(MemoryDocumentStore::new());
    let collection = Collection::metadata("question_metadata");
    let report = RunCoordinator::new(collection.clone(), Arc::new(provider(&server)), store.clone())
        .with_options(RunOptions {
            fetch_concurrency: 2,
            ..options(100)
        })
        .run()
        .await;

    assert_eq!(report.final_state, RunState::Done);
    assert_eq!(report.stats.candidates_seen, 3);
    assert_eq!(report.stats.inserted, 2);
    assert_eq!(report.stats.fetch_failed, 1);

    let docs = store.documents(&collection).await;
    assert_eq!(docs[0]["slug"], json!("two-sum"));
    assert_eq!(docs[1]["question_body"], json!("Return true if n <= 10^5."));
}
