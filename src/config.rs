use anyhow::Result;
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::Deserialize;
use std::net::SocketAddr;

use crate::domain::Quarter;
use crate::forecast::metrics::MetricKind;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub market: MarketConfig,
    pub ensemble: EnsembleConfig,
    pub fallback: FallbackConfig,
    pub pricing: PricingConfig,
    pub occupancy: OccupancyConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    pub name: String,
    /// Last quarter covered by `seed_volumes`; forecasts start at its successor.
    pub history_end: Quarter,
    pub seed_volumes: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnsembleConfig {
    pub models_dir: String,
    pub auto_weight_metric: MetricKind,
    pub holdout_quarters: usize,
    pub interval_alpha: f64,
}

/// Naive compounding-growth projection used when a requested model is
/// unavailable or fails.
#[derive(Debug, Clone, Deserialize)]
pub struct FallbackConfig {
    pub base_volume: f64,
    pub quarterly_growth: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    pub base_nightly_price: f64,
    pub bedroom_premium: f64,
    pub amenity_premium: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OccupancyConfig {
    pub base_rate: f64,
    pub market_avg_price: f64,
    pub price_sensitivity: f64,
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("RMF__").split("__"));
        Ok(figment.extract()?)
    }
}
