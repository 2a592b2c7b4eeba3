//! Forecast value types shared between models, the ensemble, and the service.

use serde::{Deserialize, Serialize};

/// A point forecast paired with equal-length confidence bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalForecast {
    pub forecast: Vec<f64>,
    pub ci_lower: Vec<f64>,
    pub ci_upper: Vec<f64>,
}

impl IntervalForecast {
    pub fn len(&self) -> usize {
        self.forecast.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forecast.is_empty()
    }
}

/// A volume forecast as served to callers, with optional bounds and the
/// source that produced it (e.g. "ensemble", "growth_projection").
#[derive(Debug, Clone, Serialize)]
pub struct VolumeForecast {
    pub forecast: Vec<f64>,
    pub ci_lower: Option<Vec<f64>>,
    pub ci_upper: Option<Vec<f64>>,
    pub source: String,
}

impl VolumeForecast {
    pub fn point(forecast: Vec<f64>, source: impl Into<String>) -> Self {
        Self {
            forecast,
            ci_lower: None,
            ci_upper: None,
            source: source.into(),
        }
    }

    pub fn with_intervals(intervals: IntervalForecast, source: impl Into<String>) -> Self {
        Self {
            forecast: intervals.forecast,
            ci_lower: Some(intervals.ci_lower),
            ci_upper: Some(intervals.ci_upper),
            source: source.into(),
        }
    }
}
