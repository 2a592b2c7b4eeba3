use axum::{extract::State, Json};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::error::ApiError;
use crate::domain::RoomType;
use crate::state::AppState;

/// Single forecast data point.
#[derive(Debug, Serialize)]
pub struct ForecastPoint {
    /// Time period label, e.g. `2024-Q1` or `2024-01`.
    pub period: String,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ci_lower: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ci_upper: Option<f64>,
}

// Volume

#[derive(Debug, Deserialize, Validate)]
pub struct VolumeForecastRequest {
    /// Number of quarters to forecast.
    #[validate(range(min = 1, max = 12))]
    #[serde(default = "default_volume_horizon")]
    pub horizon: u32,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_true")]
    pub include_confidence: bool,
}

fn default_volume_horizon() -> u32 {
    4
}

fn default_model() -> String {
    crate::forecast::service::ENSEMBLE_MODEL.to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct VolumeForecastResponse {
    pub forecast: Vec<ForecastPoint>,
    pub model_used: String,
    pub source: String,
}

/// POST /api/forecast/volume
pub async fn forecast_volume(
    State(state): State<AppState>,
    Json(req): Json<VolumeForecastRequest>,
) -> Result<Json<VolumeForecastResponse>, ApiError> {
    req.validate()?;

    let horizon = req.horizon as usize;
    let service = state.forecast.read().await;
    let result = service.forecast_volume(horizon, &req.model, req.include_confidence);

    // The growth-projection fallback always carries bounds; only surface
    // them when the caller asked for confidence intervals.
    let (ci_lower, ci_upper) = if req.include_confidence {
        (result.ci_lower, result.ci_upper)
    } else {
        (None, None)
    };

    let periods = state.cfg.market.history_end.next_quarters(horizon);
    let forecast = periods
        .iter()
        .enumerate()
        .map(|(i, quarter)| ForecastPoint {
            period: quarter.to_string(),
            value: result.forecast[i],
            ci_lower: ci_lower.as_ref().map(|l| l[i]),
            ci_upper: ci_upper.as_ref().map(|u| u[i]),
        })
        .collect();

    Ok(Json(VolumeForecastResponse {
        forecast,
        model_used: req.model,
        source: result.source,
    }))
}

// Price

#[derive(Debug, Deserialize, Validate)]
pub struct PriceForecastRequest {
    pub room_type: RoomType,
    pub neighborhood: String,
    #[validate(range(min = 0, max = 10))]
    pub bedrooms: u32,
    #[validate(range(min = 0.0, max = 10.0))]
    pub bathrooms: Option<f64>,
    #[validate(range(min = 1, max = 16))]
    pub accommodates: Option<u32>,
    #[serde(default)]
    pub amenities: Vec<String>,
    /// Number of months to forecast.
    #[validate(range(min = 1, max = 24))]
    #[serde(default = "default_price_horizon")]
    pub horizon: u32,
}

fn default_price_horizon() -> u32 {
    12
}

#[derive(Debug, Serialize)]
pub struct PriceForecastResponse {
    pub forecast: Vec<ForecastPoint>,
    pub current_avg: f64,
    pub recommended_price: f64,
    pub trend: String,
    pub seasonality_factor: f64,
}

/// POST /api/forecast/price
pub async fn forecast_price(
    State(state): State<AppState>,
    Json(req): Json<PriceForecastRequest>,
) -> Result<Json<PriceForecastResponse>, ApiError> {
    req.validate()?;

    let horizon = req.horizon as usize;
    let service = state.forecast.read().await;
    let outlook = service.forecast_price(req.room_type, req.bedrooms, req.amenities.len(), horizon);

    let forecast = month_labels(&state, horizon)
        .into_iter()
        .enumerate()
        .map(|(i, period)| ForecastPoint {
            period,
            value: outlook.forecast[i],
            ci_lower: Some(outlook.ci_lower[i]),
            ci_upper: Some(outlook.ci_upper[i]),
        })
        .collect();

    Ok(Json(PriceForecastResponse {
        forecast,
        current_avg: outlook.current_avg,
        recommended_price: outlook.recommended_price,
        trend: outlook.trend.to_string(),
        seasonality_factor: outlook.seasonality_factor,
    }))
}

// Occupancy

#[derive(Debug, Deserialize, Validate)]
pub struct OccupancyForecastRequest {
    pub room_type: RoomType,
    pub neighborhood: String,
    #[validate(range(min = 0, max = 10))]
    pub bedrooms: u32,
    #[validate(range(min = 0.0, max = 10.0))]
    pub bathrooms: Option<f64>,
    #[validate(range(min = 1, max = 16))]
    pub accommodates: Option<u32>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[validate(range(min = 1.0))]
    pub price: f64,
    /// Number of months to forecast.
    #[validate(range(min = 1, max = 12))]
    #[serde(default = "default_occupancy_horizon")]
    pub horizon: u32,
}

fn default_occupancy_horizon() -> u32 {
    6
}

#[derive(Debug, Serialize)]
pub struct OccupancyPoint {
    /// Month in `YYYY-MM` format.
    pub month: String,
    pub occupancy_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct OccupancyForecastResponse {
    pub forecast: Vec<OccupancyPoint>,
    pub expected_bookings_per_month: f64,
    pub revenue_estimate: f64,
}

/// POST /api/forecast/occupancy
pub async fn forecast_occupancy(
    State(state): State<AppState>,
    Json(req): Json<OccupancyForecastRequest>,
) -> Result<Json<OccupancyForecastResponse>, ApiError> {
    req.validate()?;

    let horizon = req.horizon as usize;
    let service = state.forecast.read().await;
    let outlook = service.forecast_occupancy(req.price, horizon);

    let forecast = month_labels(&state, horizon)
        .into_iter()
        .zip(&outlook.rates)
        .map(|(month, rate)| OccupancyPoint {
            month,
            occupancy_rate: (rate * 1000.0).round() / 1000.0,
        })
        .collect();

    Ok(Json(OccupancyForecastResponse {
        forecast,
        expected_bookings_per_month: outlook.bookings_per_month,
        revenue_estimate: outlook.revenue_estimate,
    }))
}

/// Month labels starting at the first month after the configured history
/// end, `YYYY-MM`.
fn month_labels(state: &AppState, horizon: usize) -> Vec<String> {
    let start = state.cfg.market.history_end.next().start_date();
    let base = start.year() * 12 + start.month0() as i32;
    (0..horizon as i32)
        .map(|i| {
            let total = base + i;
            format!("{:04}-{:02}", total.div_euclid(12), total.rem_euclid(12) + 1)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_request_defaults() {
        let req: VolumeForecastRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.horizon, 4);
        assert_eq!(req.model, "ensemble");
        assert!(req.include_confidence);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_volume_request_rejects_out_of_range_horizon() {
        let req: VolumeForecastRequest = serde_json::from_str(r#"{"horizon": 13}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_room_type_wire_names() {
        let req: PriceForecastRequest = serde_json::from_str(
            r#"{"room_type": "Entire home/apt", "neighborhood": "Venice", "bedrooms": 2}"#,
        )
        .unwrap();
        assert_eq!(req.room_type, RoomType::EntireHome);
        assert_eq!(req.horizon, 12);
    }
}
