//! Settings Commands
//!
//! Commands for reading and updating application settings.

use crate::models::response::CommandResponse;
use crate::models::settings::{AppConfig, SettingsUpdate};
use crate::state::AppState;

/// Get current application settings
pub async fn get_settings(state: &AppState) -> CommandResponse<AppConfig> {
    state.get_config().await.into()
}

/// Update application settings with a partial update
pub async fn update_settings(
    state: &AppState,
    update: SettingsUpdate,
) -> CommandResponse<AppConfig> {
    state.update_config(update).await.into()
}

/// Restore the default settings
pub async fn reset_settings(state: &AppState) -> CommandResponse<AppConfig> {
    state.reset_config().await.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ConfigService;

    #[tokio::test]
    async fn test_invalid_update_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new();
        state
            .initialize_with(ConfigService::open(dir.path().join("config.json")).unwrap())
            .await;

        let response = update_settings(
            &state,
            SettingsUpdate {
                primary_models: Some(vec![]),
                fallback_models: Some(vec![]),
                ..Default::default()
            },
        )
        .await;
        assert!(!response.success);

        let current = get_settings(&state).await.into_result().unwrap();
        assert_eq!(current, AppConfig::default());
    }
}
