use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use crate::app_state::AppState;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    storage: String,
}

#[utoipa::path(
    get,
    path = "/healthz",
    tag = "health",
    responses(
        (status = 200, description = "Storage reachable", body = HealthResponse),
        (status = 503, description = "Storage unreachable")
    )
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    match state.store.ping().await {
        Ok(()) => Ok(Json(HealthResponse {
            status: "OK".to_string(),
            storage: "healthy".to_string(),
        })),
        Err(err) => {
            error!(error = %err, "storage health check failed");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
