use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use recap_storage::RecapRecord;
use serde_json::json;
use tokio::time::Instant;

use crate::error::ApiError;
use crate::metrics::PROMETHEUS_CONTENT_TYPE;
use crate::server::AppState;
use crate::service::HealthFailure;

/// `GET /api/user-data`: the signed caller's recap.
pub async fn get_user_data(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RecapRecord>, ApiError> {
    let deadline = Instant::now() + state.request_timeout;
    match state.service.get_recap(&headers, Some(deadline)).await? {
        Some(record) => Ok(Json(record)),
        None => Err(ApiError::NotFound),
    }
}

/// `GET /health`: store, then cache.
pub async fn health(State(state): State<AppState>) -> Response {
    match state.service.check_health().await {
        Ok(()) => {
            let body = json!({
                "status": "ok",
                "services": {
                    state.service.store_name(): "up",
                    state.service.cache_name(): "up",
                },
            });
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(failure) => {
            let (backend, message) = match failure {
                HealthFailure::Store { backend, error } => (backend, error.to_string()),
                HealthFailure::Cache { backend, error } => (backend, error.to_string()),
            };
            tracing::warn!(backend, error = %message, "health check failed");
            let body = json!({ "status": "error", backend: message });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

/// `GET /metrics`: Prometheus text exposition.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        state.metrics.render(),
    )
}
