//! Scenario Simulator
//!
//! Turns enabled exogenous events over a forecast horizon into per-period
//! impact features, composes them additively with custom shocks, and applies
//! the total impact multiplicatively to a baseline forecast.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::domain::Quarter;
use crate::scenario::events::{EventCatalog, EventDefinition, ExogenousEventType};

/// Scenario errors; client-correctable inputs except [`Self::HorizonMismatch`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScenarioError {
    #[error("scenario '{id}' not found")]
    UnknownScenario { id: String },

    #[error("unknown event type '{name}'")]
    UnknownEvent { name: String },

    #[error("forecast length {forecast} does not match horizon length {periods}")]
    HorizonMismatch { forecast: usize, periods: usize },
}

/// A one-off adjustment to a single forecast period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomShock {
    pub period: Quarter,
    /// Signed fraction, e.g. -0.2 for a 20% drop in that period.
    pub impact: f64,
}

/// A scenario to simulate: enabled events plus ad hoc shocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    pub name: String,
    pub events: Vec<ExogenousEventType>,
    pub custom_shocks: Vec<CustomShock>,
}

/// A predefined scenario template, matched by `id`.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub events: Vec<ExogenousEventType>,
    pub custom_shocks: Vec<CustomShock>,
}

impl ScenarioTemplate {
    pub fn to_definition(&self) -> ScenarioDefinition {
        ScenarioDefinition {
            name: self.name.to_string(),
            events: self.events.clone(),
            custom_shocks: self.custom_shocks.clone(),
        }
    }
}

/// Per-event impact columns over a forecast horizon.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureFrame {
    pub periods: Vec<Quarter>,
    pub columns: BTreeMap<ExogenousEventType, Vec<f64>>,
}

impl FeatureFrame {
    /// Additive composition across events.
    pub fn total_impact(&self) -> Vec<f64> {
        let mut total = vec![0.0; self.periods.len()];
        for column in self.columns.values() {
            for (acc, v) in total.iter_mut().zip(column) {
                *acc += v;
            }
        }
        total
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImpactSummary {
    pub avg_impact_pct: f64,
    pub max_negative_impact_pct: f64,
    pub max_positive_impact_pct: f64,
    pub events_included: Vec<ExogenousEventType>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioOutcome {
    pub scenario_name: String,
    pub base_forecast: Vec<f64>,
    pub adjusted_forecast: Vec<f64>,
    pub total_impact_pct: Vec<f64>,
    pub summary: ImpactSummary,
}

pub struct ScenarioSimulator {
    catalog: EventCatalog,
    templates: Vec<ScenarioTemplate>,
}

impl ScenarioSimulator {
    pub fn new() -> Self {
        Self {
            catalog: EventCatalog::new(),
            templates: predefined_templates(),
        }
    }

    pub fn catalog(&self) -> &EventCatalog {
        &self.catalog
    }

    pub fn event_info(&self, event_type: ExogenousEventType) -> &EventDefinition {
        self.catalog.definition(event_type)
    }

    /// Resolve a caller-supplied event name; unknown names are a client
    /// error, not an internal fault.
    pub fn event_from_name(&self, name: &str) -> Result<ExogenousEventType, ScenarioError> {
        name.parse().map_err(|_| ScenarioError::UnknownEvent {
            name: name.to_string(),
        })
    }

    pub fn templates(&self) -> &[ScenarioTemplate] {
        &self.templates
    }

    pub fn template(&self, id: &str) -> Result<&ScenarioTemplate, ScenarioError> {
        self.templates
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| ScenarioError::UnknownScenario { id: id.to_string() })
    }

    /// One impact column per enabled event: `severity_or_intensity ×
    /// impact_multiplier` where a period falls in a historical interval or
    /// matches the seasonal pattern, else 0.
    ///
    /// When an interval and a seasonal entry both apply to a period, the
    /// value with the larger magnitude wins; later intervals of the same
    /// event overwrite earlier ones.
    pub fn exogenous_features(
        &self,
        periods: &[Quarter],
        events: &[ExogenousEventType],
    ) -> FeatureFrame {
        let mut columns = BTreeMap::new();

        for &event_type in events {
            let def = self.catalog.definition(event_type);
            let column = periods
                .iter()
                .map(|quarter| event_impact(def, *quarter))
                .collect();
            columns.insert(event_type, column);
        }

        FeatureFrame {
            periods: periods.to_vec(),
            columns,
        }
    }

    /// Overlay a scenario on a baseline forecast.
    ///
    /// Event impacts compose additively per period; each custom shock
    /// adjusts only its declared period (a shock outside the horizon is
    /// ignored). The total impact applies multiplicatively:
    /// `adjusted[i] = base[i] * (1 + total_impact[i])`.
    pub fn simulate(
        &self,
        base_forecast: &[f64],
        periods: &[Quarter],
        scenario: &ScenarioDefinition,
    ) -> Result<ScenarioOutcome, ScenarioError> {
        if base_forecast.len() != periods.len() {
            return Err(ScenarioError::HorizonMismatch {
                forecast: base_forecast.len(),
                periods: periods.len(),
            });
        }

        let frame = self.exogenous_features(periods, &scenario.events);
        let mut total_impact = frame.total_impact();

        for shock in &scenario.custom_shocks {
            match periods.iter().position(|q| *q == shock.period) {
                Some(i) => total_impact[i] += shock.impact,
                None => {
                    debug!(period = %shock.period, impact = shock.impact, "custom shock outside forecast horizon, ignored");
                }
            }
        }

        let adjusted_forecast: Vec<f64> = base_forecast
            .iter()
            .zip(&total_impact)
            .map(|(base, impact)| base * (1.0 + impact))
            .collect();

        let (avg, min, max) = if total_impact.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            (
                total_impact.iter().sum::<f64>() / total_impact.len() as f64,
                total_impact.iter().cloned().fold(f64::INFINITY, f64::min),
                total_impact.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            )
        };

        Ok(ScenarioOutcome {
            scenario_name: scenario.name.clone(),
            base_forecast: base_forecast.to_vec(),
            adjusted_forecast,
            total_impact_pct: total_impact.iter().map(|i| i * 100.0).collect(),
            summary: ImpactSummary {
                avg_impact_pct: avg * 100.0,
                max_negative_impact_pct: min * 100.0,
                max_positive_impact_pct: max * 100.0,
                events_included: scenario.events.clone(),
            },
        })
    }
}

impl Default for ScenarioSimulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Impact of one event on one period: `severity_or_intensity ×
/// impact_multiplier` when the period's start date falls inside a
/// historical interval or its quarter matches the seasonal pattern, else 0.
/// Later intervals overwrite earlier ones; between an interval and a
/// seasonal entry, the larger magnitude wins.
fn event_impact(def: &EventDefinition, quarter: Quarter) -> f64 {
    let date = quarter.start_date();

    let mut interval_value = 0.0;
    for p in &def.historical_periods {
        if date >= p.start && date <= p.end {
            interval_value = p.severity * def.impact_multiplier;
        }
    }

    let seasonal_value = def
        .seasonal_pattern
        .map(|pattern| pattern[(quarter.quarter() - 1) as usize] * def.impact_multiplier)
        .unwrap_or(0.0);

    if seasonal_value.abs() > interval_value.abs() {
        seasonal_value
    } else {
        interval_value
    }
}

fn predefined_templates() -> Vec<ScenarioTemplate> {
    vec![
        ScenarioTemplate {
            id: "optimistic",
            name: "Optimistic Growth",
            description: "Major events drive tourism, no major disruptions",
            events: vec![ExogenousEventType::MajorEvent],
            custom_shocks: vec![],
        },
        ScenarioTemplate {
            id: "baseline",
            name: "Baseline (Status Quo)",
            description: "Normal market conditions",
            events: vec![],
            custom_shocks: vec![],
        },
        ScenarioTemplate {
            id: "pessimistic",
            name: "Pessimistic (Multiple Disruptions)",
            description: "Economic downturn plus wildfires and extreme weather",
            events: vec![
                ExogenousEventType::EconomicRecession,
                ExogenousEventType::Wildfire,
                ExogenousEventType::ExtremeWeather,
            ],
            custom_shocks: vec![],
        },
        ScenarioTemplate {
            id: "wildfire_season",
            name: "Severe Wildfire Season",
            description: "Extended wildfire season affecting the metro area",
            events: vec![ExogenousEventType::Wildfire],
            custom_shocks: vec![
                CustomShock { period: Quarter::new(2024, 3), impact: -0.35 },
                CustomShock { period: Quarter::new(2024, 4), impact: -0.20 },
            ],
        },
        ScenarioTemplate {
            id: "olympics_2028",
            name: "2028 Olympics",
            description: "Surge in demand around the 2028 Olympics",
            events: vec![ExogenousEventType::MajorEvent],
            custom_shocks: vec![
                CustomShock { period: Quarter::new(2028, 2), impact: 0.6 },
                CustomShock { period: Quarter::new(2028, 3), impact: 0.8 },
            ],
        },
        ScenarioTemplate {
            id: "regulatory_crackdown",
            name: "Strict Regulation",
            description: "New laws restrict short-term rentals",
            events: vec![ExogenousEventType::RegulatoryChange],
            custom_shocks: vec![
                CustomShock { period: Quarter::new(2024, 1), impact: -0.30 },
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quarters(start: Quarter, n: usize) -> Vec<Quarter> {
        let mut out = vec![start];
        out.extend(start.next_quarters(n - 1));
        out
    }

    fn empty_scenario() -> ScenarioDefinition {
        ScenarioDefinition {
            name: "empty".into(),
            events: vec![],
            custom_shocks: vec![],
        }
    }

    #[test]
    fn test_templates_idempotent() {
        let sim = ScenarioSimulator::new();
        let first: Vec<&str> = sim.templates().iter().map(|t| t.id).collect();
        let second: Vec<&str> = sim.templates().iter().map(|t| t.id).collect();
        assert_eq!(first, second);
        assert_eq!(
            first,
            vec![
                "optimistic",
                "baseline",
                "pessimistic",
                "wildfire_season",
                "olympics_2028",
                "regulatory_crackdown"
            ]
        );
    }

    #[test]
    fn test_unknown_template_and_event() {
        let sim = ScenarioSimulator::new();
        assert!(matches!(
            sim.template("apocalypse"),
            Err(ScenarioError::UnknownScenario { .. })
        ));
        assert!(matches!(
            sim.event_from_name("volcano"),
            Err(ScenarioError::UnknownEvent { .. })
        ));
        assert_eq!(
            sim.event_from_name("wildfire").unwrap(),
            ExogenousEventType::Wildfire
        );
    }

    #[test]
    fn test_empty_scenario_is_identity() {
        let sim = ScenarioSimulator::new();
        let base = vec![100.0, 200.0, 300.0, 400.0];
        let periods = quarters(Quarter::new(2024, 1), 4);

        let outcome = sim.simulate(&base, &periods, &empty_scenario()).unwrap();

        assert_eq!(outcome.adjusted_forecast, base);
        assert_eq!(outcome.total_impact_pct, vec![0.0; 4]);
        assert_eq!(outcome.summary.avg_impact_pct, 0.0);
        assert!(outcome.summary.events_included.is_empty());
    }

    #[test]
    fn test_custom_shock_applies_only_to_its_period() {
        let sim = ScenarioSimulator::new();
        let base = vec![100.0; 4];
        let periods = quarters(Quarter::new(2024, 1), 4);
        let scenario = ScenarioDefinition {
            name: "one shock".into(),
            events: vec![],
            custom_shocks: vec![CustomShock {
                period: Quarter::new(2024, 3),
                impact: -0.2,
            }],
        };

        let outcome = sim.simulate(&base, &periods, &scenario).unwrap();

        // Only 2024-Q3 (index 2) takes the hit.
        assert_eq!(outcome.adjusted_forecast, vec![100.0, 100.0, 80.0, 100.0]);
        assert_eq!(outcome.summary.max_negative_impact_pct, -20.0);
    }

    #[test]
    fn test_custom_shock_outside_horizon_ignored() {
        let sim = ScenarioSimulator::new();
        let base = vec![100.0; 2];
        let periods = quarters(Quarter::new(2024, 1), 2);
        let scenario = ScenarioDefinition {
            name: "late shock".into(),
            events: vec![],
            custom_shocks: vec![CustomShock {
                period: Quarter::new(2030, 1),
                impact: 0.9,
            }],
        };

        let outcome = sim.simulate(&base, &periods, &scenario).unwrap();
        assert_eq!(outcome.adjusted_forecast, base);
    }

    #[test]
    fn test_historical_interval_feature_values() {
        let sim = ScenarioSimulator::new();
        // 2020-Q2 sits inside the first pandemic interval (severity 0.8).
        let periods = vec![Quarter::new(2020, 2), Quarter::new(2024, 2)];
        let frame =
            sim.exogenous_features(&periods, &[ExogenousEventType::Pandemic]);

        let column = &frame.columns[&ExogenousEventType::Pandemic];
        assert!((column[0] - 0.8 * -0.6).abs() < 1e-12);
        assert_eq!(column[1], 0.0);
    }

    #[test]
    fn test_seasonal_pattern_feature_values() {
        let sim = ScenarioSimulator::new();
        let periods = quarters(Quarter::new(2025, 1), 4);
        let frame =
            sim.exogenous_features(&periods, &[ExogenousEventType::ExtremeWeather]);

        let column = &frame.columns[&ExogenousEventType::ExtremeWeather];
        // Q3 heat waves carry the strongest intensity.
        assert!((column[2] - 0.5 * -0.15).abs() < 1e-12);
        assert!((column[0] - 0.3 * -0.15).abs() < 1e-12);
    }

    #[test]
    fn test_overlapping_interval_and_seasonal_takes_larger_magnitude() {
        use chrono::NaiveDate;
        use crate::scenario::events::HistoricalPeriod;

        let def = EventDefinition {
            event_type: ExogenousEventType::ExtremeWeather,
            name: "synthetic",
            description: "interval and seasonal pattern covering the same period",
            impact_multiplier: -0.5,
            historical_periods: vec![HistoricalPeriod {
                start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
                severity: 0.2,
            }],
            seasonal_pattern: Some([0.9, 0.0, 0.0, 0.0]),
            affected_neighborhoods: vec![],
        };

        // Q1 2024: interval gives 0.2 * -0.5 = -0.1, seasonal gives
        // 0.9 * -0.5 = -0.45; the seasonal value has the larger magnitude.
        assert!((event_impact(&def, Quarter::new(2024, 1)) - -0.45).abs() < 1e-12);
        // Q2 2024: seasonal intensity is 0, the interval value stands.
        assert!((event_impact(&def, Quarter::new(2024, 2)) - -0.1).abs() < 1e-12);
        // Outside both: zero.
        assert_eq!(event_impact(&def, Quarter::new(2026, 2)), 0.0);
    }

    #[test]
    fn test_later_interval_overwrites_earlier() {
        let sim = ScenarioSimulator::new();
        // 2020-Q2 start (Apr 1) is inside only the first pandemic interval;
        // 2022-Q1 start is inside only the second. Severities differ.
        let frame = sim.exogenous_features(
            &[Quarter::new(2020, 2), Quarter::new(2022, 1)],
            &[ExogenousEventType::Pandemic],
        );
        let column = &frame.columns[&ExogenousEventType::Pandemic];
        assert!((column[0] - 0.8 * -0.6).abs() < 1e-12);
        assert!((column[1] - 0.4 * -0.6).abs() < 1e-12);
    }

    #[test]
    fn test_events_compose_additively() {
        let sim = ScenarioSimulator::new();
        // 2020-Q2: pandemic (0.8 * -0.6) and recession (0.7 * -0.4) overlap.
        let periods = vec![Quarter::new(2020, 2)];
        let scenario = ScenarioDefinition {
            name: "double hit".into(),
            events: vec![
                ExogenousEventType::Pandemic,
                ExogenousEventType::EconomicRecession,
            ],
            custom_shocks: vec![],
        };

        let outcome = sim.simulate(&[1000.0], &periods, &scenario).unwrap();
        let expected_impact = 0.8 * -0.6 + 0.7 * -0.4;
        assert!((outcome.total_impact_pct[0] - expected_impact * 100.0).abs() < 1e-9);
        assert!((outcome.adjusted_forecast[0] - 1000.0 * (1.0 + expected_impact)).abs() < 1e-9);
    }

    #[test]
    fn test_horizon_mismatch_rejected() {
        let sim = ScenarioSimulator::new();
        let periods = quarters(Quarter::new(2024, 1), 3);
        let result = sim.simulate(&[1.0, 2.0], &periods, &empty_scenario());
        assert!(matches!(
            result,
            Err(ScenarioError::HorizonMismatch { forecast: 2, periods: 3 })
        ));
    }

    #[test]
    fn test_template_scenario_end_to_end() {
        let sim = ScenarioSimulator::new();
        let template = sim.template("wildfire_season").unwrap();
        let scenario = template.to_definition();

        let periods = quarters(Quarter::new(2024, 1), 4);
        let base = vec![100.0; 4];
        let outcome = sim.simulate(&base, &periods, &scenario).unwrap();

        // Q3 and Q4 carry the template's shocks; Q1/Q2 are untouched since
        // no wildfire interval covers 2024.
        assert_eq!(outcome.adjusted_forecast[0], 100.0);
        assert_eq!(outcome.adjusted_forecast[1], 100.0);
        assert!((outcome.adjusted_forecast[2] - 65.0).abs() < 1e-9);
        assert!((outcome.adjusted_forecast[3] - 80.0).abs() < 1e-9);
    }
}
