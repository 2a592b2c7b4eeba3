//! Volume Model Adapters
//!
//! Every forecasting technique sits behind the same [`VolumeModel`] trait so
//! the ensemble never needs to know which concrete method backs a name.
//! Adapters that need trailing history keep their own window from `fit`.
//!
//! The shipped implementations are simple statistical baselines; heavier
//! external models plug in through the same trait.

use serde::{Deserialize, Serialize};

use crate::domain::IntervalForecast;

/// Uniform capability set of a forecasting model.
pub trait VolumeModel: Send + Sync {
    /// Train on a historical series, oldest first.
    fn fit(&mut self, series: &[f64]) -> Result<(), ModelError>;

    /// Point forecast for the next `steps` periods.
    fn predict(&self, steps: usize) -> Result<Vec<f64>, ModelError>;

    /// Point forecast plus confidence bounds at significance `alpha`
    /// (alpha = 0.05 gives a 95% interval).
    fn predict_with_intervals(
        &self,
        steps: usize,
        alpha: f64,
    ) -> Result<IntervalForecast, ModelError>;
}

/// Model adapter errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ModelError {
    #[error("model has not been fitted")]
    NotFitted,

    #[error("insufficient history: need at least {needed} observations, got {got}")]
    InsufficientHistory { needed: usize, got: usize },
}

/// Repeats the observation from one season earlier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalNaiveModel {
    season: usize,
    history: Vec<f64>,
    residual_sigma: f64,
}

impl SeasonalNaiveModel {
    pub fn new(season: usize) -> Self {
        assert!(season >= 1, "season length must be positive");
        Self {
            season,
            history: Vec::new(),
            residual_sigma: 0.0,
        }
    }

    pub fn quarterly() -> Self {
        Self::new(4)
    }
}

impl VolumeModel for SeasonalNaiveModel {
    fn fit(&mut self, series: &[f64]) -> Result<(), ModelError> {
        if series.len() < self.season {
            return Err(ModelError::InsufficientHistory {
                needed: self.season,
                got: series.len(),
            });
        }
        let residuals: Vec<f64> = (self.season..series.len())
            .map(|t| series[t] - series[t - self.season])
            .collect();
        self.residual_sigma = std_dev(&residuals);
        self.history = series.to_vec();
        Ok(())
    }

    fn predict(&self, steps: usize) -> Result<Vec<f64>, ModelError> {
        if self.history.is_empty() {
            return Err(ModelError::NotFitted);
        }
        let offset = self.history.len() - self.season;
        Ok((0..steps)
            .map(|i| self.history[offset + i % self.season])
            .collect())
    }

    fn predict_with_intervals(
        &self,
        steps: usize,
        alpha: f64,
    ) -> Result<IntervalForecast, ModelError> {
        Ok(banded(self.predict(steps)?, self.residual_sigma, alpha))
    }
}

/// Double exponential smoothing (level + trend).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoltLinearModel {
    alpha: f64,
    beta: f64,
    level: Option<f64>,
    trend: f64,
    residual_sigma: f64,
}

impl HoltLinearModel {
    pub fn new(alpha: f64, beta: f64) -> Self {
        Self {
            alpha: alpha.clamp(0.01, 0.99),
            beta: beta.clamp(0.01, 0.99),
            level: None,
            trend: 0.0,
            residual_sigma: 0.0,
        }
    }
}

impl VolumeModel for HoltLinearModel {
    fn fit(&mut self, series: &[f64]) -> Result<(), ModelError> {
        if series.len() < 2 {
            return Err(ModelError::InsufficientHistory {
                needed: 2,
                got: series.len(),
            });
        }

        let mut level = series[0];
        let mut trend = series[1] - series[0];
        let mut residuals = Vec::with_capacity(series.len() - 1);

        for &y in &series[1..] {
            let one_step = level + trend;
            residuals.push(y - one_step);
            let new_level = self.alpha * y + (1.0 - self.alpha) * one_step;
            trend = self.beta * (new_level - level) + (1.0 - self.beta) * trend;
            level = new_level;
        }

        self.level = Some(level);
        self.trend = trend;
        self.residual_sigma = std_dev(&residuals);
        Ok(())
    }

    fn predict(&self, steps: usize) -> Result<Vec<f64>, ModelError> {
        let level = self.level.ok_or(ModelError::NotFitted)?;
        Ok((1..=steps)
            .map(|h| level + h as f64 * self.trend)
            .collect())
    }

    fn predict_with_intervals(
        &self,
        steps: usize,
        alpha: f64,
    ) -> Result<IntervalForecast, ModelError> {
        Ok(banded(self.predict(steps)?, self.residual_sigma, alpha))
    }
}

/// Random walk with drift: extends the line from the first to the last
/// observation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriftModel {
    last: Option<f64>,
    slope: f64,
    residual_sigma: f64,
}

impl DriftModel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VolumeModel for DriftModel {
    fn fit(&mut self, series: &[f64]) -> Result<(), ModelError> {
        if series.len() < 2 {
            return Err(ModelError::InsufficientHistory {
                needed: 2,
                got: series.len(),
            });
        }
        let n = series.len();
        self.slope = (series[n - 1] - series[0]) / (n - 1) as f64;
        let residuals: Vec<f64> = (1..n)
            .map(|t| series[t] - (series[t - 1] + self.slope))
            .collect();
        self.residual_sigma = std_dev(&residuals);
        self.last = Some(series[n - 1]);
        Ok(())
    }

    fn predict(&self, steps: usize) -> Result<Vec<f64>, ModelError> {
        let last = self.last.ok_or(ModelError::NotFitted)?;
        Ok((1..=steps).map(|h| last + h as f64 * self.slope).collect())
    }

    fn predict_with_intervals(
        &self,
        steps: usize,
        alpha: f64,
    ) -> Result<IntervalForecast, ModelError> {
        Ok(banded(self.predict(steps)?, self.residual_sigma, alpha))
    }
}

/// Symmetric band around a point forecast from the in-sample residual
/// spread. Lower bounds clamp at zero; listing counts cannot go negative.
fn banded(forecast: Vec<f64>, sigma: f64, alpha: f64) -> IntervalForecast {
    let margin = z_score(1.0 - alpha) * sigma;
    let ci_lower = forecast.iter().map(|v| (v - margin).max(0.0)).collect();
    let ci_upper = forecast.iter().map(|v| v + margin).collect();
    IntervalForecast {
        forecast,
        ci_lower,
        ci_upper,
    }
}

/// Z-score for a confidence level (assumes normal residuals).
fn z_score(confidence: f64) -> f64 {
    match confidence {
        c if c >= 0.99 => 2.576,
        c if c >= 0.95 => 1.96,
        c if c >= 0.90 => 1.645,
        c if c >= 0.80 => 1.282,
        _ => 1.0,
    }
}

fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}
