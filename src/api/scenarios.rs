use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::error::ApiError;
use crate::domain::Quarter;
use crate::scenario::events::EventDefinition;
use crate::scenario::simulator::{
    CustomShock, ImpactSummary, ScenarioDefinition, ScenarioTemplate,
};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CustomShockRequest {
    /// Period label, e.g. `2024-Q3`.
    pub period: String,
    /// Impact as a decimal fraction.
    #[validate(range(min = -1.0, max = 2.0))]
    pub impact: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ScenarioRequest {
    /// ID of a predefined scenario; overrides the custom fields below.
    pub scenario_id: Option<String>,
    pub scenario_name: Option<String>,
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    #[validate(nested)]
    pub custom_shocks: Vec<CustomShockRequest>,
    /// Forecast horizon in quarters.
    #[validate(range(min = 1, max = 12))]
    #[serde(default = "default_horizon")]
    pub horizon: u32,
    #[serde(default = "default_base_model")]
    pub base_model: String,
}

fn default_horizon() -> u32 {
    4
}

fn default_base_model() -> String {
    crate::forecast::service::ENSEMBLE_MODEL.to_string()
}

#[derive(Debug, Serialize)]
pub struct ScenarioResponse {
    pub scenario_name: String,
    pub base_forecast: Vec<f64>,
    pub adjusted_forecast: Vec<f64>,
    pub total_impact_pct: Vec<f64>,
    pub summary: ImpactSummary,
    pub periods: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CompareRequest {
    pub scenario_ids: Vec<String>,
    #[validate(range(min = 1, max = 12))]
    #[serde(default = "default_horizon")]
    pub horizon: u32,
}

/// GET /api/scenarios - predefined scenario templates.
pub async fn list_scenarios(State(state): State<AppState>) -> Json<Vec<ScenarioTemplate>> {
    Json(state.scenarios.templates().to_vec())
}

/// GET /api/scenarios/events - the exogenous event catalog.
pub async fn list_events(State(state): State<AppState>) -> Json<Vec<EventDefinition>> {
    Json(state.scenarios.catalog().definitions().to_vec())
}

/// POST /api/scenarios/simulate
///
/// Runs a baseline forecast and overlays either a predefined scenario or a
/// caller-assembled combination of events and custom shocks.
pub async fn simulate_scenario(
    State(state): State<AppState>,
    Json(req): Json<ScenarioRequest>,
) -> Result<Json<ScenarioResponse>, ApiError> {
    req.validate()?;

    let scenario = resolve_scenario(&state, &req)?;
    let response = run_scenario(&state, scenario, req.horizon as usize, &req.base_model).await?;
    Ok(Json(response))
}

/// POST /api/scenarios/compare - side-by-side runs of predefined scenarios.
pub async fn compare_scenarios(
    State(state): State<AppState>,
    Json(req): Json<CompareRequest>,
) -> Result<Json<Vec<ScenarioResponse>>, ApiError> {
    req.validate()?;

    let mut results = Vec::with_capacity(req.scenario_ids.len());
    for id in &req.scenario_ids {
        let scenario = state.scenarios.template(id)?.to_definition();
        let base_model = default_base_model();
        results.push(run_scenario(&state, scenario, req.horizon as usize, &base_model).await?);
    }
    Ok(Json(results))
}

fn resolve_scenario(
    state: &AppState,
    req: &ScenarioRequest,
) -> Result<ScenarioDefinition, ApiError> {
    if let Some(id) = &req.scenario_id {
        return Ok(state.scenarios.template(id)?.to_definition());
    }

    let mut events = Vec::with_capacity(req.events.len());
    for name in &req.events {
        events.push(state.scenarios.event_from_name(name)?);
    }

    let mut custom_shocks = Vec::with_capacity(req.custom_shocks.len());
    for shock in &req.custom_shocks {
        let period: Quarter = shock
            .period
            .parse()
            .map_err(|err: crate::domain::QuarterParseError| ApiError::BadRequest(err.to_string()))?;
        custom_shocks.push(CustomShock {
            period,
            impact: shock.impact,
        });
    }

    Ok(ScenarioDefinition {
        name: req
            .scenario_name
            .clone()
            .unwrap_or_else(|| "Custom Scenario".to_string()),
        events,
        custom_shocks,
    })
}

async fn run_scenario(
    state: &AppState,
    scenario: ScenarioDefinition,
    horizon: usize,
    base_model: &str,
) -> Result<ScenarioResponse, ApiError> {
    let base = {
        let service = state.forecast.read().await;
        service.forecast_volume(horizon, base_model, false).forecast
    };

    let periods = state.cfg.market.history_end.next_quarters(horizon);
    let outcome = state.scenarios.simulate(&base, &periods, &scenario)?;

    Ok(ScenarioResponse {
        scenario_name: outcome.scenario_name,
        base_forecast: outcome.base_forecast,
        adjusted_forecast: outcome.adjusted_forecast,
        total_impact_pct: outcome.total_impact_pct,
        summary: outcome.summary,
        periods: periods.iter().map(Quarter::to_string).collect(),
    })
}
