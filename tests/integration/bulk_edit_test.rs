//! Bulk Edit Integration Tests
//!
//! A bulk edit over HTTP: files are read from GitHub, rewritten by Gemini
//! (falling back when the primary model is down), sanitized and committed.

use repo_weaver::commands::{bulk_edit, BulkEditArgs};
use repo_weaver::models::job::JobStatus;
use repo_weaver::services::workflows::EventSink;
use repo_weaver_core::FileKey;

use crate::support::{Harness, BACKUP_MODEL, PRIMARY_MODEL};

fn key(raw: &str) -> FileKey {
    FileKey::parse(raw).unwrap()
}

#[tokio::test]
async fn test_bulk_edit_falls_back_and_commits_sanitized_content() {
    let harness = Harness::start().await;
    harness
        .mount_repository("octocat/web", &[("a.ts", "let x = 1"), ("b.ts", "let y = 2")])
        .await;
    harness.accept_commits().await;
    harness.model_down(PRIMARY_MODEL).await;
    harness
        .stream_reply(BACKUP_MODEL, &["```ts\n", "const x=1;\n", "```"])
        .await;

    let summary = bulk_edit(
        &harness.state,
        EventSink::disabled(),
        BulkEditArgs {
            instruction: "use const".to_string(),
            files: vec![key("octocat/web::a.ts"), key("octocat/web::b.ts")],
            branch: None,
        },
    )
    .await
    .into_result()
    .unwrap();

    assert_eq!((summary.succeeded, summary.failed), (2, 0));
    assert!(summary.jobs.iter().all(|j| j.status() == JobStatus::Success));

    let mut committed = harness.committed_files().await;
    committed.sort();
    assert_eq!(
        committed,
        vec![
            ("/repos/octocat/web/contents/a.ts".to_string(), "const x=1;".to_string()),
            ("/repos/octocat/web/contents/b.ts".to_string(), "const x=1;".to_string()),
        ]
    );
    assert_eq!(harness.model_calls(PRIMARY_MODEL).await, 2);
    assert_eq!(harness.model_calls(BACKUP_MODEL).await, 2);
}

#[tokio::test]
async fn test_bulk_edit_fails_jobs_when_every_model_is_down() {
    let harness = Harness::start().await;
    harness
        .mount_repository("octocat/web", &[("a.ts", "let x = 1")])
        .await;
    harness.accept_commits().await;
    harness.model_down(PRIMARY_MODEL).await;
    harness.model_down(BACKUP_MODEL).await;

    let summary = bulk_edit(
        &harness.state,
        EventSink::disabled(),
        BulkEditArgs {
            instruction: "use const".to_string(),
            files: vec![key("octocat/web::a.ts")],
            branch: None,
        },
    )
    .await
    .into_result()
    .unwrap();

    assert_eq!((summary.succeeded, summary.failed), (0, 1));
    assert_eq!(summary.jobs[0].error(), Some("All AI models failed."));
    assert!(harness.committed_files().await.is_empty());
}
