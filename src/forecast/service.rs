//! Forecast Service
//!
//! Request-facing dispatch over the ensemble and its individual members.
//! A forecast request never hard-fails: when the requested model is missing
//! or errors, the service downgrades to a deterministic compounding-growth
//! projection. Price and occupancy outlooks are deterministic placeholder
//! formulas pending dedicated per-listing models.

use serde::Serialize;
use tracing::warn;

use crate::config::{FallbackConfig, OccupancyConfig, PricingConfig};
use crate::domain::{IntervalForecast, RoomType, VolumeForecast};
use crate::forecast::ensemble::EnsembleForecaster;

/// Model name that dispatches to the combined ensemble forecast.
pub const ENSEMBLE_MODEL: &str = "ensemble";

/// Bound width of the growth-projection fallback.
const FALLBACK_BAND: f64 = 0.05;

/// Monthly nightly-price seasonality, January first.
const PRICE_SEASONAL_FACTORS: [f64; 12] = [
    1.0, 0.95, 1.05, 1.1, 1.15, 1.2, 1.25, 1.2, 1.1, 1.05, 1.0, 0.95,
];

/// Monthly occupancy seasonality.
const OCCUPANCY_SEASONAL_FACTORS: [f64; 6] = [0.95, 1.0, 1.05, 1.1, 1.15, 1.1];

const DAYS_PER_MONTH: f64 = 30.0;

pub struct ForecastService {
    ensemble: EnsembleForecaster,
    fallback: FallbackConfig,
    pricing: PricingConfig,
    occupancy: OccupancyConfig,
    interval_alpha: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceOutlook {
    pub forecast: Vec<f64>,
    pub ci_lower: Vec<f64>,
    pub ci_upper: Vec<f64>,
    pub current_avg: f64,
    pub recommended_price: f64,
    pub trend: &'static str,
    pub seasonality_factor: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OccupancyOutlook {
    pub rates: Vec<f64>,
    pub bookings_per_month: f64,
    pub revenue_estimate: f64,
}

impl ForecastService {
    pub fn new(
        ensemble: EnsembleForecaster,
        fallback: FallbackConfig,
        pricing: PricingConfig,
        occupancy: OccupancyConfig,
        interval_alpha: f64,
    ) -> Self {
        Self {
            ensemble,
            fallback,
            pricing,
            occupancy,
            interval_alpha,
        }
    }

    pub fn ensemble(&self) -> &EnsembleForecaster {
        &self.ensemble
    }

    pub fn ensemble_mut(&mut self) -> &mut EnsembleForecaster {
        &mut self.ensemble
    }

    pub fn model_names(&self) -> Vec<String> {
        self.ensemble.model_names()
    }

    /// Forecast listing volume for the next `horizon` quarters using the
    /// named model, falling back to the growth projection on any failure.
    pub fn forecast_volume(
        &self,
        horizon: usize,
        model: &str,
        include_intervals: bool,
    ) -> VolumeForecast {
        if model == ENSEMBLE_MODEL {
            let result = if include_intervals {
                self.ensemble
                    .predict_with_intervals(horizon, self.interval_alpha)
                    .map(|bands| VolumeForecast::with_intervals(bands, ENSEMBLE_MODEL))
            } else {
                self.ensemble
                    .predict_volume(horizon)
                    .map(|forecast| VolumeForecast::point(forecast, ENSEMBLE_MODEL))
            };
            return result.unwrap_or_else(|err| {
                warn!(error = %err, "ensemble forecast failed, using growth projection");
                self.growth_projection(horizon)
            });
        }

        let Some(handle) = self.ensemble.model(model) else {
            warn!(model, "unknown model requested, using growth projection");
            return self.growth_projection(horizon);
        };

        let result = if include_intervals {
            handle
                .predict_with_intervals(horizon, self.interval_alpha)
                .map(|bands| VolumeForecast::with_intervals(bands, model))
        } else {
            handle
                .predict(horizon)
                .map(|forecast| VolumeForecast::point(forecast, model))
        };
        result.unwrap_or_else(|err| {
            warn!(model, error = %err, "model forecast failed, using growth projection");
            self.growth_projection(horizon)
        })
    }

    /// Deterministic compounding-growth projection with a ±5% band.
    pub fn growth_projection(&self, horizon: usize) -> VolumeForecast {
        let base = self.fallback.base_volume;
        let growth = self.fallback.quarterly_growth;
        let forecast: Vec<f64> = (1..=horizon)
            .map(|i| base * (1.0 + growth).powi(i as i32))
            .collect();
        let bands = IntervalForecast {
            ci_lower: forecast.iter().map(|v| v * (1.0 - FALLBACK_BAND)).collect(),
            ci_upper: forecast.iter().map(|v| v * (1.0 + FALLBACK_BAND)).collect(),
            forecast,
        };
        VolumeForecast::with_intervals(bands, "growth_projection")
    }

    /// Nightly-price outlook for a listing over `horizon` months.
    pub fn forecast_price(
        &self,
        room_type: RoomType,
        bedrooms: u32,
        amenities: usize,
        horizon: usize,
    ) -> PriceOutlook {
        let mut base = self.pricing.base_nightly_price * room_type.price_multiplier();
        base += bedrooms as f64 * self.pricing.bedroom_premium;
        base += amenities as f64 * self.pricing.amenity_premium;

        let forecast: Vec<f64> = (0..horizon)
            .map(|i| base * PRICE_SEASONAL_FACTORS[i % 12])
            .collect();

        let first = PRICE_SEASONAL_FACTORS[0];
        let last = PRICE_SEASONAL_FACTORS[11];
        let max = PRICE_SEASONAL_FACTORS.iter().cloned().fold(f64::MIN, f64::max);
        let min = PRICE_SEASONAL_FACTORS.iter().cloned().fold(f64::MAX, f64::min);

        PriceOutlook {
            ci_lower: forecast.iter().map(|p| p * 0.9).collect(),
            ci_upper: forecast.iter().map(|p| p * 1.1).collect(),
            forecast,
            current_avg: base,
            recommended_price: base * 1.05,
            trend: if last > first { "increasing" } else { "stable" },
            seasonality_factor: max / min,
        }
    }

    /// Occupancy-rate outlook over `horizon` months, with bookings and
    /// revenue estimates at the given nightly price.
    pub fn forecast_occupancy(&self, price: f64, horizon: usize) -> OccupancyOutlook {
        let price_ratio = price / self.occupancy.market_avg_price;
        let adjustment =
            (1.0 - (price_ratio - 1.0) * self.occupancy.price_sensitivity).clamp(0.3, 1.0);
        let base = self.occupancy.base_rate * adjustment;

        let rates: Vec<f64> = (0..horizon)
            .map(|i| base * OCCUPANCY_SEASONAL_FACTORS[i % OCCUPANCY_SEASONAL_FACTORS.len()])
            .collect();

        let avg = if rates.is_empty() {
            0.0
        } else {
            rates.iter().sum::<f64>() / rates.len() as f64
        };
        let bookings_per_month = DAYS_PER_MONTH * avg;

        OccupancyOutlook {
            rates,
            bookings_per_month,
            revenue_estimate: bookings_per_month * price,
        }
    }
}
