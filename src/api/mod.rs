pub mod error;
pub mod forecast;
pub mod health;
pub mod scenarios;

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{config::Config, state::AppState};

pub fn router(state: AppState, cfg: &Config) -> Router {
    let api = Router::new()
        .route("/health", get(health::health_check))
        .route("/forecast/volume", post(forecast::forecast_volume))
        .route("/forecast/price", post(forecast::forecast_price))
        .route("/forecast/occupancy", post(forecast::forecast_occupancy))
        .route("/scenarios", get(scenarios::list_scenarios))
        .route("/scenarios/events", get(scenarios::list_events))
        .route("/scenarios/simulate", post(scenarios::simulate_scenario))
        .route("/scenarios/compare", post(scenarios::compare_scenarios))
        .with_state(state);

    let mut router = Router::new().route("/", get(root)).nest("/api", api);

    if cfg.server.enable_cors {
        use tower_http::cors::{AllowOrigin, CorsLayer};
        let origins: Vec<axum::http::HeaderValue> = cfg
            .server
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        let cors = CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
            .allow_headers([axum::http::header::CONTENT_TYPE]);
        router = router.layer(cors);
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(axum::extract::DefaultBodyLimit::max(1024 * 1024))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    cfg.server.request_timeout_secs,
                ))),
        )
        .layer(TraceLayer::new_for_http())
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Rental Market Forecasting API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "operational",
        "endpoints": {
            "forecast_volume": "/api/forecast/volume",
            "forecast_price": "/api/forecast/price",
            "forecast_occupancy": "/api/forecast/occupancy",
            "scenarios": "/api/scenarios",
        }
    }))
}
