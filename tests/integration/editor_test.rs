//! Editor Integration Tests
//!
//! Single-file AI edit with commit, then branch creation and a pull request.

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use repo_weaver::commands::{ai_edit_file, create_branch, create_pull_request, EditFileRequest};
use repo_weaver::services::workflows::{AlertKind, EventSink, WorkflowEvent};
use repo_weaver_core::{FileKey, RepoRef};
use tokio::sync::mpsc;

use crate::support::{Harness, PRIMARY_MODEL};

#[tokio::test]
async fn test_ai_edit_commits_against_the_fetched_sha() {
    let harness = Harness::start().await;
    harness
        .mount_repository("octocat/web", &[("src/app.ts", "let x = 1")])
        .await;
    harness.accept_commits().await;
    harness
        .stream_reply(PRIMARY_MODEL, &["const ", "x = 1;"])
        .await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let result = ai_edit_file(
        &harness.state,
        EventSink::new(tx),
        EditFileRequest {
            file: FileKey::parse("octocat/web::src/app.ts").unwrap(),
            branch: None,
            instruction: "use const".to_string(),
            commit_message: Some("Use const".to_string()),
        },
    )
    .await
    .into_result()
    .unwrap();

    assert_eq!(result.content, "const x = 1;");
    assert_eq!(result.committed_sha.as_deref(), Some("new-sha"));

    let writes = harness.github_requests("PUT").await;
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].0, "/repos/octocat/web/contents/src/app.ts");
    assert_eq!(writes[0].1["sha"], "blob0");
    assert_eq!(writes[0].1["message"], "Use const");

    let mut alerts = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let WorkflowEvent::Alert { kind, message } = event {
            alerts.push((kind, message));
        }
    }
    assert_eq!(
        alerts,
        vec![(AlertKind::Success, "Changes committed successfully!".to_string())]
    );
}

#[tokio::test]
async fn test_branch_from_default_then_pull_request() {
    let harness = Harness::start().await;
    harness
        .mount_repository("octocat/web", &[("index.html", "<html></html>")])
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/octocat/web/git/refs"))
        .and(body_partial_json(json!({"ref": "refs/heads/feature", "sha": "tip-main"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"ref": "refs/heads/feature"})))
        .expect(1)
        .mount(&harness.github)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/octocat/web/pulls"))
        .and(body_partial_json(json!({"head": "feature", "base": "main"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 99,
            "number": 5,
            "html_url": "https://github.com/octocat/web/pull/5",
            "title": "Add feature",
            "state": "open"
        })))
        .expect(1)
        .mount(&harness.github)
        .await;
    let repo = RepoRef::parse("octocat/web").unwrap();

    let branch = create_branch(
        &harness.state,
        EventSink::disabled(),
        repo.clone(),
        None,
        "feature".to_string(),
    )
    .await
    .into_result()
    .unwrap();
    assert_eq!(branch, "feature");

    let pr = create_pull_request(
        &harness.state,
        EventSink::disabled(),
        repo,
        "feature".to_string(),
        "Add feature".to_string(),
        "Adds the feature".to_string(),
    )
    .await
    .into_result()
    .unwrap();
    assert_eq!(pr.number, 5);
    assert_eq!(pr.html_url, "https://github.com/octocat/web/pull/5");
}
