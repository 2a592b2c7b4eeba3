//! Forecast Metrics and Evaluation
//!
//! Accuracy metrics (RMSE, MAE, MAPE) used to score individual models and
//! to derive performance-based ensemble weights.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// True values this close to zero are excluded from the MAPE mean.
const MAPE_ZERO_EPS: f64 = 1e-6;

/// Forecast accuracy metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetrics {
    /// Root Mean Square Error
    pub rmse: f64,
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Absolute Percentage Error (%)
    pub mape: f64,
}

/// Per-model metric scores, keyed by model name.
pub type PerformanceRecord = BTreeMap<String, ForecastMetrics>;

impl ForecastMetrics {
    /// Calculate metrics from actual and predicted values.
    ///
    /// Periods whose true value is (near-)zero are excluded from the MAPE
    /// mean; they still count toward RMSE and MAE. A series with no nonzero
    /// true values has no defined MAPE and is rejected.
    pub fn calculate(actual: &[f64], predicted: &[f64]) -> Result<Self, MetricsError> {
        if actual.len() != predicted.len() {
            return Err(MetricsError::DimensionMismatch {
                actual: actual.len(),
                predicted: predicted.len(),
            });
        }
        if actual.is_empty() {
            return Err(MetricsError::EmptyData);
        }

        let n = actual.len() as f64;
        let mut abs_sum = 0.0;
        let mut sq_sum = 0.0;
        let mut pct_sum = 0.0;
        let mut pct_count = 0usize;

        for (a, p) in actual.iter().zip(predicted.iter()) {
            let error = a - p;
            abs_sum += error.abs();
            sq_sum += error * error;
            if a.abs() > MAPE_ZERO_EPS {
                pct_sum += (error / a).abs() * 100.0;
                pct_count += 1;
            }
        }

        if pct_count == 0 {
            return Err(MetricsError::UndefinedMape);
        }

        Ok(Self {
            rmse: (sq_sum / n).sqrt(),
            mae: abs_sum / n,
            mape: pct_sum / pct_count as f64,
        })
    }
}

impl fmt::Display for ForecastMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RMSE={:.3}, MAE={:.3}, MAPE={:.2}%",
            self.rmse, self.mae, self.mape
        )
    }
}

/// Metric used to rank models, e.g. when auto-weighting the ensemble.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MetricKind {
    Rmse,
    Mae,
    Mape,
}

impl MetricKind {
    pub fn select(&self, metrics: &ForecastMetrics) -> f64 {
        match self {
            Self::Rmse => metrics.rmse,
            Self::Mae => metrics.mae,
            Self::Mape => metrics.mape,
        }
    }
}

/// Forecast metrics calculation errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum MetricsError {
    #[error("Dimension mismatch: actual={actual}, predicted={predicted}")]
    DimensionMismatch { actual: usize, predicted: usize },

    #[error("Empty data provided")]
    EmptyData,

    #[error("MAPE is undefined: every true value is zero")]
    UndefinedMape,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_forecast() {
        let actual = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let predicted = vec![1.0, 2.0, 3.0, 4.0, 5.0];

        let metrics = ForecastMetrics::calculate(&actual, &predicted).unwrap();

        assert_eq!(metrics.rmse, 0.0);
        assert_eq!(metrics.mae, 0.0);
        assert_eq!(metrics.mape, 0.0);
    }

    #[test]
    fn test_known_values() {
        let actual = vec![100.0, 200.0];
        let predicted = vec![110.0, 190.0];

        let metrics = ForecastMetrics::calculate(&actual, &predicted).unwrap();

        assert!((metrics.mae - 10.0).abs() < 1e-9);
        assert!((metrics.rmse - 10.0).abs() < 1e-9);
        // (10/100 + 10/200) / 2 * 100 = 7.5%
        assert!((metrics.mape - 7.5).abs() < 1e-9);
    }

    #[test]
    fn test_dimension_mismatch() {
        let result = ForecastMetrics::calculate(&[1.0, 2.0, 3.0], &[1.0, 2.0]);
        assert!(matches!(
            result,
            Err(MetricsError::DimensionMismatch { actual: 3, predicted: 2 })
        ));
    }

    #[test]
    fn test_empty_data() {
        let result = ForecastMetrics::calculate(&[], &[]);
        assert!(matches!(result, Err(MetricsError::EmptyData)));
    }

    #[test]
    fn test_zero_true_value_excluded_from_mape() {
        let actual = vec![0.0, 100.0];
        let predicted = vec![10.0, 110.0];

        let metrics = ForecastMetrics::calculate(&actual, &predicted).unwrap();

        // Both points count for MAE/RMSE, only the nonzero one for MAPE.
        assert!((metrics.mae - 10.0).abs() < 1e-9);
        assert!((metrics.mape - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_zero_series_rejected() {
        let result = ForecastMetrics::calculate(&[0.0, 0.0], &[1.0, 2.0]);
        assert!(matches!(result, Err(MetricsError::UndefinedMape)));
    }

    #[test]
    fn test_metric_kind_select_and_parse() {
        let metrics = ForecastMetrics {
            rmse: 1.0,
            mae: 2.0,
            mape: 3.0,
        };
        assert_eq!(MetricKind::Rmse.select(&metrics), 1.0);
        assert_eq!(MetricKind::Mae.select(&metrics), 2.0);
        assert_eq!(MetricKind::Mape.select(&metrics), 3.0);
        assert_eq!("mape".parse::<MetricKind>().unwrap(), MetricKind::Mape);
    }
}
