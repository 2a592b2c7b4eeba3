//! Application state wiring.
//!
//! Everything the request handlers need is constructed once here and passed
//! by reference; there are no lazily-initialised globals. The ensemble sits
//! behind a `RwLock`: predictions take read locks, and any weight-mutating
//! maintenance must take the write lock.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::Config;
use crate::forecast::ensemble::EnsembleForecaster;
use crate::forecast::models::{DriftModel, HoltLinearModel, SeasonalNaiveModel};
use crate::forecast::service::ForecastService;
use crate::scenario::simulator::ScenarioSimulator;

const ENSEMBLE_SNAPSHOT_FILE: &str = "ensemble_volume.json";

#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub forecast: Arc<RwLock<ForecastService>>,
    pub scenarios: Arc<ScenarioSimulator>,
}

impl AppState {
    pub fn new(cfg: Config) -> Result<Self> {
        let ensemble = warm_up_ensemble(&cfg)?;
        let service = ForecastService::new(
            ensemble,
            cfg.fallback.clone(),
            cfg.pricing.clone(),
            cfg.occupancy.clone(),
            cfg.ensemble.interval_alpha,
        );

        Ok(Self {
            cfg,
            forecast: Arc::new(RwLock::new(service)),
            scenarios: Arc::new(ScenarioSimulator::new()),
        })
    }
}

/// Build the model registry, score it on a holdout split, weight it, and
/// fit everything on the full history. Previously persisted weights take
/// precedence over a fresh auto-weighting.
fn warm_up_ensemble(cfg: &Config) -> Result<EnsembleForecaster> {
    let series = &cfg.market.seed_volumes;
    let holdout = cfg.ensemble.holdout_quarters;
    anyhow::ensure!(
        series.len() > holdout + 4,
        "seed volume history too short: {} quarters with a {} quarter holdout",
        series.len(),
        holdout,
    );

    let mut ensemble = EnsembleForecaster::new();
    ensemble.add_model("seasonal_naive", Box::new(SeasonalNaiveModel::quarterly()), None);
    ensemble.add_model("holt_linear", Box::new(HoltLinearModel::new(0.4, 0.2)), None);
    ensemble.add_model("drift", Box::new(DriftModel::new()), None);

    let (train, test) = series.split_at(series.len() - holdout);
    let record = ensemble.evaluate_models(train, test);

    let snapshot_path = snapshot_path(&cfg.ensemble.models_dir);
    if snapshot_path.exists() {
        ensemble
            .restore(&snapshot_path)
            .with_context(|| format!("restoring ensemble from {}", snapshot_path.display()))?;
        info!(path = %snapshot_path.display(), "restored persisted ensemble weights");
    } else {
        ensemble.auto_weight_by_performance(&record, cfg.ensemble.auto_weight_metric)?;
        if let Err(err) = persist_snapshot(&ensemble, &cfg.ensemble.models_dir, &snapshot_path) {
            warn!(error = %err, "could not persist ensemble snapshot");
        }
    }

    ensemble.fit_all(series);
    Ok(ensemble)
}

fn snapshot_path(models_dir: &str) -> PathBuf {
    Path::new(models_dir).join(ENSEMBLE_SNAPSHOT_FILE)
}

fn persist_snapshot(
    ensemble: &EnsembleForecaster,
    models_dir: &str,
    path: &Path,
) -> Result<()> {
    fs::create_dir_all(models_dir)?;
    ensemble.save(path)
}
