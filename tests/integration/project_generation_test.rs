//! Project Generation Integration Tests

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use repo_weaver::commands::new_project;
use repo_weaver::services::workflows::{EventSink, ProjectGenerationRequest};

use crate::support::{Harness, PRIMARY_MODEL};

#[tokio::test]
async fn test_new_project_creates_repository_and_files() {
    let harness = Harness::start().await;
    Mock::given(method("POST"))
        .and(path("/user/repos"))
        .and(body_partial_json(json!({"name": "todo", "private": true, "auto_init": true})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 7,
            "name": "todo",
            "full_name": "octocat/todo",
            "owner": {"login": "octocat"},
            "default_branch": "main",
            "private": true
        })))
        .expect(1)
        .mount(&harness.github)
        .await;
    harness
        .structured_reply(
            PRIMARY_MODEL,
            json!({"files": [
                {"path": "index.html", "description": "Entry page"},
                {"path": "app.js", "description": "Todo logic"}
            ]}),
        )
        .await;
    harness
        .stream_reply(PRIMARY_MODEL, &["```\n", "// generated\n", "```"])
        .await;
    harness.accept_commits().await;

    let summary = new_project(
        &harness.state,
        EventSink::disabled(),
        ProjectGenerationRequest {
            repo_name: "todo".to_string(),
            prompt: "A tiny todo app".to_string(),
            private: true,
        },
    )
    .await
    .into_result()
    .unwrap();

    assert_eq!(summary.repository.full_name, "octocat/todo");
    assert_eq!((summary.succeeded, summary.failed), (2, 0));

    let writes = harness.github_requests("PUT").await;
    assert_eq!(writes.len(), 2);
    for (_, body) in &writes {
        assert_eq!(body["branch"], "main");
        assert!(body.get("sha").is_none());
        assert!(body["message"].as_str().unwrap().starts_with("AI Create: "));
    }
    let mut committed = harness.committed_files().await;
    committed.sort();
    assert_eq!(committed[0].0, "/repos/octocat/todo/contents/app.js");
    assert_eq!(committed[0].1, "// generated");
}

#[tokio::test]
async fn test_unusable_plan_stops_before_any_file() {
    let harness = Harness::start().await;
    Mock::given(method("POST"))
        .and(path("/user/repos"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 7,
            "name": "todo",
            "full_name": "octocat/todo",
            "owner": {"login": "octocat"},
            "default_branch": "main"
        })))
        .mount(&harness.github)
        .await;
    // Every model answers with a plan missing its `files` field.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "{\"layout\": []}"}]}}]
        })))
        .mount(&harness.gemini)
        .await;

    let response = new_project(
        &harness.state,
        EventSink::disabled(),
        ProjectGenerationRequest {
            repo_name: "todo".to_string(),
            prompt: "A tiny todo app".to_string(),
            private: false,
        },
    )
    .await;

    assert_eq!(response.error.as_deref(), Some("Failed to generate project plan."));
    assert!(harness.github_requests("PUT").await.is_empty());
}
