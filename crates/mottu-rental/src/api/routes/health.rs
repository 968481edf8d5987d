//! Health check endpoint

use crate::{
    api::{error::ApiError, types::HealthCheckResponse},
    server::AppState,
};
use axum::{extract::State, Json};
use tracing::error;

pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthCheckResponse>, ApiError> {
    if let Err(e) = state.store.health_check().await {
        error!("Store health check failed: {}", e);
        return Err(ApiError::ServiceUnavailable);
    }

    Ok(Json(HealthCheckResponse {
        status: "healthy".to_string(),
        storage: "ok".to_string(),
        timestamp: chrono::Utc::now(),
    }))
}
