//! Health Check Commands

use crate::models::response::{CommandResponse, HealthResponse};
use crate::state::AppState;

/// Report which parts of the backend are ready
pub async fn get_health(state: &AppState) -> CommandResponse<HealthResponse> {
    let mut health = HealthResponse::default();

    health.config = state.is_config_healthy();
    health.model_backend = state.has_model_backend().await;
    health.vcs = state.has_vcs().await;

    health.status = if health.config && health.model_backend && health.vcs {
        "healthy".to_string()
    } else {
        "degraded".to_string()
    };

    CommandResponse::ok(health)
}
