//! Settings Integration Tests
//!
//! Configuration survives a reopen of the config file and invalid updates
//! are rejected without touching it.

use repo_weaver::commands::{get_settings, reset_settings, update_settings};
use repo_weaver::storage::ConfigService;
use repo_weaver::{AppConfig, AppState, SettingsUpdate};

async fn state_at(path: &std::path::Path) -> AppState {
    let state = AppState::new();
    state
        .initialize_with(ConfigService::open(path).unwrap())
        .await;
    state
}

#[tokio::test]
async fn test_settings_persist_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    let state = state_at(&path).await;
    let updated = update_settings(
        &state,
        SettingsUpdate {
            expansion_concurrency: Some(2),
            workflow_poll_timeout_secs: Some(None),
            ..Default::default()
        },
    )
    .await
    .into_result()
    .unwrap();
    assert_eq!(updated.expansion_concurrency, 2);

    let reopened = state_at(&path).await;
    let config = get_settings(&reopened).await.into_result().unwrap();
    assert_eq!(config.expansion_concurrency, 2);
    assert_eq!(config.workflow_poll_timeout_secs, None);

    let reset = reset_settings(&reopened).await.into_result().unwrap();
    assert_eq!(reset, AppConfig::default());
}

#[tokio::test]
async fn test_invalid_update_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let state = state_at(&path).await;
    let before = std::fs::read_to_string(&path).unwrap();

    let response = update_settings(
        &state,
        SettingsUpdate {
            github_api_base: Some("ftp://example.com".to_string()),
            ..Default::default()
        },
    )
    .await;

    assert!(!response.success);
    assert!(response
        .error
        .unwrap()
        .starts_with("Validation error: github_api_base must be an http(s) URL"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}
