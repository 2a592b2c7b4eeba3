//! Ensemble Combiner
//!
//! Blends the point and interval forecasts of named volume models with a
//! weighted average. Weights are either set explicitly (and must sum to
//! 1.0) or derived from held-out performance by inverse-error weighting.
//!
//! A model that fails inside a prediction call is logged and excluded from
//! that call only; its weight stays. When every weighted model fails the
//! call fails loudly instead of returning a degenerate zero forecast.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::domain::IntervalForecast;
use crate::forecast::metrics::{ForecastMetrics, MetricKind, PerformanceRecord};
use crate::forecast::models::VolumeModel;

/// Maximum drift from 1.0 a weight set may have before it is rejected or
/// the combined output is renormalized.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Ensemble errors; all client-correctable except where noted.
#[derive(Debug, thiserror::Error)]
pub enum EnsembleError {
    #[error("weights must sum to 1.0, got {sum}")]
    WeightSum { sum: f64 },

    #[error("model '{name}' is not registered in the ensemble")]
    UnknownModel { name: String },

    #[error("model '{model}' has a zero {metric} score, inverse weighting is undefined")]
    ZeroScore { model: String, metric: MetricKind },

    #[error("performance record is empty")]
    EmptyRecord,

    #[error("no model weights are set")]
    NoWeights,

    #[error("no valid predictions obtained")]
    NoValidPredictions,
}

/// Persisted ensemble configuration: the weight map and the performance
/// record it was derived from. Model parameters persist separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleSnapshot {
    pub weights: BTreeMap<String, f64>,
    pub performance_metrics: PerformanceRecord,
}

#[derive(Default)]
pub struct EnsembleForecaster {
    models: BTreeMap<String, Box<dyn VolumeModel>>,
    weights: BTreeMap<String, f64>,
    performance: PerformanceRecord,
}

impl EnsembleForecaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or overwrite) a model, optionally assigning its weight.
    pub fn add_model(
        &mut self,
        name: impl Into<String>,
        model: Box<dyn VolumeModel>,
        weight: Option<f64>,
    ) {
        let name = name.into();
        if let Some(w) = weight {
            self.weights.insert(name.clone(), w);
        }
        self.models.insert(name, model);
    }

    pub fn model(&self, name: &str) -> Option<&dyn VolumeModel> {
        self.models.get(name).map(|m| m.as_ref())
    }

    pub fn model_names(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    pub fn weights(&self) -> &BTreeMap<String, f64> {
        &self.weights
    }

    pub fn performance(&self) -> &PerformanceRecord {
        &self.performance
    }

    /// Replace the weight map. All-or-nothing: the current weights are
    /// untouched unless the new set validates.
    pub fn set_weights(&mut self, weights: BTreeMap<String, f64>) -> Result<(), EnsembleError> {
        let sum: f64 = weights.values().sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(EnsembleError::WeightSum { sum });
        }
        for name in weights.keys() {
            if !self.models.contains_key(name) {
                return Err(EnsembleError::UnknownModel { name: name.clone() });
            }
        }
        self.weights = weights;
        Ok(())
    }

    /// Derive weights from recorded performance: lower error, higher weight.
    /// Covers exactly the models present in the record and sums to 1.0.
    pub fn auto_weight_by_performance(
        &mut self,
        record: &PerformanceRecord,
        metric: MetricKind,
    ) -> Result<(), EnsembleError> {
        if record.is_empty() {
            return Err(EnsembleError::EmptyRecord);
        }

        let mut inverses = BTreeMap::new();
        for (name, metrics) in record {
            if !self.models.contains_key(name) {
                return Err(EnsembleError::UnknownModel { name: name.clone() });
            }
            let score = metric.select(metrics);
            if score == 0.0 {
                return Err(EnsembleError::ZeroScore {
                    model: name.clone(),
                    metric,
                });
            }
            inverses.insert(name.clone(), 1.0 / score);
        }

        let total: f64 = inverses.values().sum();
        let weights: BTreeMap<String, f64> =
            inverses.into_iter().map(|(n, inv)| (n, inv / total)).collect();

        for (name, weight) in &weights {
            info!(model = %name, weight, basis = %metric, "auto-weighted ensemble member");
        }
        self.weights = weights;
        Ok(())
    }

    /// Weighted ensemble point forecast for `steps` periods.
    pub fn predict_volume(&self, steps: usize) -> Result<Vec<f64>, EnsembleError> {
        if self.weights.is_empty() {
            return Err(EnsembleError::NoWeights);
        }

        let mut combined = vec![0.0; steps];
        let mut total_weight = 0.0;
        let mut used = 0usize;

        for (name, &weight) in &self.weights {
            let Some(model) = self.models.get(name) else {
                continue;
            };
            match model.predict(steps) {
                Ok(prediction) => {
                    for (acc, p) in combined.iter_mut().zip(&prediction) {
                        *acc += weight * p;
                    }
                    total_weight += weight;
                    used += 1;
                }
                Err(err) => {
                    warn!(model = %name, error = %err, "prediction failed, excluding model from this call");
                }
            }
        }

        if used == 0 {
            return Err(EnsembleError::NoValidPredictions);
        }
        renormalize(&mut combined, total_weight);
        Ok(combined)
    }

    /// Weighted ensemble forecast with confidence bounds; point, lower, and
    /// upper sequences accumulate independently under the same weights and
    /// the same renormalization policy as [`Self::predict_volume`].
    pub fn predict_with_intervals(
        &self,
        steps: usize,
        alpha: f64,
    ) -> Result<IntervalForecast, EnsembleError> {
        if self.weights.is_empty() {
            return Err(EnsembleError::NoWeights);
        }

        let mut forecast = vec![0.0; steps];
        let mut ci_lower = vec![0.0; steps];
        let mut ci_upper = vec![0.0; steps];
        let mut total_weight = 0.0;
        let mut used = 0usize;

        for (name, &weight) in &self.weights {
            let Some(model) = self.models.get(name) else {
                continue;
            };
            match model.predict_with_intervals(steps, alpha) {
                Ok(bands) => {
                    for i in 0..steps {
                        forecast[i] += weight * bands.forecast[i];
                        ci_lower[i] += weight * bands.ci_lower[i];
                        ci_upper[i] += weight * bands.ci_upper[i];
                    }
                    total_weight += weight;
                    used += 1;
                }
                Err(err) => {
                    warn!(model = %name, error = %err, "interval prediction failed, excluding model from this call");
                }
            }
        }

        if used == 0 {
            return Err(EnsembleError::NoValidPredictions);
        }
        renormalize(&mut forecast, total_weight);
        renormalize(&mut ci_lower, total_weight);
        renormalize(&mut ci_upper, total_weight);
        Ok(IntervalForecast {
            forecast,
            ci_lower,
            ci_upper,
        })
    }

    /// Fit every model on `train`, forecast the test horizon, and score it.
    /// Per-model failures are logged and omitted from the record, never
    /// fatal to the batch.
    pub fn evaluate_models(&mut self, train: &[f64], test: &[f64]) -> PerformanceRecord {
        let mut record = PerformanceRecord::new();

        for (name, model) in &mut self.models {
            if let Err(err) = model.fit(train) {
                warn!(model = %name, error = %err, "fit failed, omitting from evaluation");
                continue;
            }
            let prediction = match model.predict(test.len()) {
                Ok(p) => p,
                Err(err) => {
                    warn!(model = %name, error = %err, "prediction failed, omitting from evaluation");
                    continue;
                }
            };
            match ForecastMetrics::calculate(test, &prediction) {
                Ok(metrics) => {
                    info!(model = %name, %metrics, "model evaluated");
                    record.insert(name.clone(), metrics);
                }
                Err(err) => {
                    warn!(model = %name, error = %err, "scoring failed, omitting from evaluation");
                }
            }
        }

        self.performance = record.clone();
        record
    }

    /// Fit every registered model on the full series, e.g. before serving.
    pub fn fit_all(&mut self, series: &[f64]) {
        for (name, model) in &mut self.models {
            if let Err(err) = model.fit(series) {
                warn!(model = %name, error = %err, "fit failed");
            }
        }
    }

    pub fn snapshot(&self) -> EnsembleSnapshot {
        EnsembleSnapshot {
            weights: self.weights.clone(),
            performance_metrics: self.performance.clone(),
        }
    }

    /// Persist weights and performance as JSON.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        fs::write(path, json)
            .with_context(|| format!("writing ensemble snapshot to {}", path.display()))?;
        info!(path = %path.display(), "ensemble configuration saved");
        Ok(())
    }

    /// Restore a persisted snapshot onto this ensemble. The weight set is
    /// validated against the currently registered models.
    pub fn restore(&mut self, path: &Path) -> anyhow::Result<()> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("reading ensemble snapshot from {}", path.display()))?;
        let snapshot: EnsembleSnapshot = serde_json::from_str(&json)?;
        self.set_weights(snapshot.weights)?;
        self.performance = snapshot.performance_metrics;
        Ok(())
    }
}

fn renormalize(values: &mut [f64], total_weight: f64) {
    if total_weight > 0.0 && (total_weight - 1.0).abs() > WEIGHT_TOLERANCE {
        for v in values.iter_mut() {
            *v /= total_weight;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::models::ModelError;
    use proptest::prelude::*;

    /// Returns a fixed forecast regardless of history.
    struct StubModel {
        values: Vec<f64>,
    }

    impl StubModel {
        fn boxed(values: Vec<f64>) -> Box<dyn VolumeModel> {
            Box::new(Self { values })
        }
    }

    impl VolumeModel for StubModel {
        fn fit(&mut self, _series: &[f64]) -> Result<(), ModelError> {
            Ok(())
        }

        fn predict(&self, steps: usize) -> Result<Vec<f64>, ModelError> {
            Ok(self.values.iter().copied().cycle().take(steps).collect())
        }

        fn predict_with_intervals(
            &self,
            steps: usize,
            _alpha: f64,
        ) -> Result<IntervalForecast, ModelError> {
            let forecast = self.predict(steps)?;
            Ok(IntervalForecast {
                ci_lower: forecast.iter().map(|v| v - 1.0).collect(),
                ci_upper: forecast.iter().map(|v| v + 1.0).collect(),
                forecast,
            })
        }
    }

    /// Fails every prediction call.
    struct BrokenModel;

    impl VolumeModel for BrokenModel {
        fn fit(&mut self, _series: &[f64]) -> Result<(), ModelError> {
            Ok(())
        }

        fn predict(&self, _steps: usize) -> Result<Vec<f64>, ModelError> {
            Err(ModelError::NotFitted)
        }

        fn predict_with_intervals(
            &self,
            _steps: usize,
            _alpha: f64,
        ) -> Result<IntervalForecast, ModelError> {
            Err(ModelError::NotFitted)
        }
    }

    fn weights(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(n, w)| (n.to_string(), *w)).collect()
    }

    #[test]
    fn test_set_weights_rejects_bad_sum() {
        let mut ensemble = EnsembleForecaster::new();
        ensemble.add_model("a", StubModel::boxed(vec![1.0]), None);

        let result = ensemble.set_weights(weights(&[("a", 0.9)]));
        assert!(matches!(result, Err(EnsembleError::WeightSum { .. })));
        assert!(ensemble.weights().is_empty());
    }

    #[test]
    fn test_set_weights_rejects_unknown_model() {
        let mut ensemble = EnsembleForecaster::new();
        ensemble.add_model("a", StubModel::boxed(vec![1.0]), None);

        let result = ensemble.set_weights(weights(&[("a", 0.5), ("ghost", 0.5)]));
        assert!(matches!(result, Err(EnsembleError::UnknownModel { name }) if name == "ghost"));
        assert!(ensemble.weights().is_empty());
    }

    #[test]
    fn test_set_weights_accepts_within_tolerance() {
        let mut ensemble = EnsembleForecaster::new();
        ensemble.add_model("a", StubModel::boxed(vec![1.0]), None);

        ensemble
            .set_weights(weights(&[("a", 1.0 + 5e-7)]))
            .unwrap();
        assert_eq!(ensemble.weights().len(), 1);
    }

    #[test]
    fn test_auto_weight_inverse_error() {
        let mut ensemble = EnsembleForecaster::new();
        ensemble.add_model("a", StubModel::boxed(vec![1.0]), None);
        ensemble.add_model("b", StubModel::boxed(vec![1.0]), None);

        let mut record = PerformanceRecord::new();
        record.insert("a".into(), ForecastMetrics { rmse: 0.0, mae: 0.0, mape: 10.0 });
        record.insert("b".into(), ForecastMetrics { rmse: 0.0, mae: 0.0, mape: 20.0 });

        ensemble
            .auto_weight_by_performance(&record, MetricKind::Mape)
            .unwrap();

        let w = ensemble.weights();
        assert!((w["a"] - 2.0 / 3.0).abs() < 1e-9);
        assert!((w["b"] - 1.0 / 3.0).abs() < 1e-9);
        assert!(w["a"] > w["b"]);
        assert!((w.values().sum::<f64>() - 1.0).abs() < WEIGHT_TOLERANCE);
    }

    #[test]
    fn test_auto_weight_rejects_zero_score() {
        let mut ensemble = EnsembleForecaster::new();
        ensemble.add_model("a", StubModel::boxed(vec![1.0]), None);
        ensemble.add_model("perfect", StubModel::boxed(vec![1.0]), None);

        let mut record = PerformanceRecord::new();
        record.insert("a".into(), ForecastMetrics { rmse: 0.0, mae: 0.0, mape: 10.0 });
        record.insert("perfect".into(), ForecastMetrics { rmse: 0.0, mae: 0.0, mape: 0.0 });

        let result = ensemble.auto_weight_by_performance(&record, MetricKind::Mape);
        assert!(matches!(result, Err(EnsembleError::ZeroScore { model, .. }) if model == "perfect"));
        assert!(ensemble.weights().is_empty());
    }

    #[test]
    fn test_predict_volume_combines_weighted() {
        let mut ensemble = EnsembleForecaster::new();
        ensemble.add_model("a", StubModel::boxed(vec![10.0, 20.0]), Some(0.5));
        ensemble.add_model("b", StubModel::boxed(vec![30.0, 40.0]), Some(0.5));

        let combined = ensemble.predict_volume(2).unwrap();
        assert_eq!(combined, vec![20.0, 30.0]);
    }

    #[test]
    fn test_predict_volume_renormalizes_around_failure() {
        let mut ensemble = EnsembleForecaster::new();
        ensemble.add_model("ok", StubModel::boxed(vec![10.0, 20.0]), Some(0.5));
        ensemble.add_model("broken", Box::new(BrokenModel), Some(0.5));

        // The survivor's 0.5-weighted sum divided by 0.5 recovers its raw
        // forecast.
        let combined = ensemble.predict_volume(2).unwrap();
        assert_eq!(combined, vec![10.0, 20.0]);
    }

    #[test]
    fn test_predict_volume_without_weights() {
        let mut ensemble = EnsembleForecaster::new();
        ensemble.add_model("a", StubModel::boxed(vec![1.0]), None);

        assert!(matches!(
            ensemble.predict_volume(2),
            Err(EnsembleError::NoWeights)
        ));
    }

    #[test]
    fn test_predict_volume_fails_loud_when_all_models_fail() {
        let mut ensemble = EnsembleForecaster::new();
        ensemble.add_model("b1", Box::new(BrokenModel), Some(0.5));
        ensemble.add_model("b2", Box::new(BrokenModel), Some(0.5));

        assert!(matches!(
            ensemble.predict_volume(2),
            Err(EnsembleError::NoValidPredictions)
        ));
    }

    #[test]
    fn test_predict_with_intervals_combines_and_renormalizes() {
        let mut ensemble = EnsembleForecaster::new();
        ensemble.add_model("a", StubModel::boxed(vec![10.0]), Some(0.5));
        ensemble.add_model("broken", Box::new(BrokenModel), Some(0.5));

        let bands = ensemble.predict_with_intervals(2, 0.05).unwrap();
        // Same renormalization policy as the point path.
        assert_eq!(bands.forecast, vec![10.0, 10.0]);
        assert_eq!(bands.ci_lower, vec![9.0, 9.0]);
        assert_eq!(bands.ci_upper, vec![11.0, 11.0]);
    }

    #[test]
    fn test_predict_with_intervals_fails_loud() {
        let mut ensemble = EnsembleForecaster::new();
        ensemble.add_model("broken", Box::new(BrokenModel), Some(1.0));

        assert!(matches!(
            ensemble.predict_with_intervals(2, 0.05),
            Err(EnsembleError::NoValidPredictions)
        ));
    }

    #[test]
    fn test_evaluate_models_skips_failing_member() {
        let mut ensemble = EnsembleForecaster::new();
        ensemble.add_model("ok", StubModel::boxed(vec![10.0, 20.0]), None);
        ensemble.add_model("broken", Box::new(BrokenModel), None);

        let record = ensemble.evaluate_models(&[1.0, 2.0, 3.0], &[10.0, 20.0]);
        assert!(record.contains_key("ok"));
        assert!(!record.contains_key("broken"));
        assert_eq!(record["ok"].mae, 0.0);
    }

    proptest! {
        /// Inverse-error weights always normalize to 1.0 and preserve the
        /// better-model-gets-more ordering.
        #[test]
        fn prop_auto_weights_normalized(scores in proptest::collection::vec(0.1f64..1000.0, 2..6)) {
            let mut ensemble = EnsembleForecaster::new();
            let mut record = PerformanceRecord::new();
            for (i, score) in scores.iter().enumerate() {
                let name = format!("m{i}");
                ensemble.add_model(&name, StubModel::boxed(vec![1.0]), None);
                record.insert(name, ForecastMetrics { rmse: *score, mae: *score, mape: *score });
            }

            ensemble.auto_weight_by_performance(&record, MetricKind::Mape).unwrap();
            let weights = ensemble.weights();

            let sum: f64 = weights.values().sum();
            prop_assert!((sum - 1.0).abs() < 1e-9);
            for (i, a) in scores.iter().enumerate() {
                for (j, b) in scores.iter().enumerate() {
                    if a < b {
                        let wi = weights[&format!("m{}", i)];
                        let wj = weights[&format!("m{}", j)];
                        prop_assert!(wi >= wj);
                    }
                }
            }
        }
    }
}
