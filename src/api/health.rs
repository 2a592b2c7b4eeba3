use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    timestamp: chrono::DateTime<chrono::Utc>,
    models_loaded: usize,
    weights_set: bool,
}

/// GET /api/health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let service = state.forecast.read().await;
    let models_loaded = service.model_names().len();
    let weights_set = !service.ensemble().weights().is_empty();

    Json(HealthResponse {
        status: if models_loaded > 0 && weights_set {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        timestamp: chrono::Utc::now(),
        models_loaded,
        weights_set,
    })
}
