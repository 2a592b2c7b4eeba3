//! Exogenous Event Catalog
//!
//! External factors modeled as percentage shocks to the baseline forecast.
//! The catalog is defined once at startup and read-only thereafter.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// External event categories that can perturb the market.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExogenousEventType {
    Pandemic,
    Wildfire,
    ExtremeWeather,
    EconomicRecession,
    MajorEvent,
    RegulatoryChange,
}

/// A past occurrence of an event with its observed severity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Severity in [0, 1]; scales the event's impact multiplier.
    pub severity: f64,
}

/// Full definition of an event type.
#[derive(Debug, Clone, Serialize)]
pub struct EventDefinition {
    pub event_type: ExogenousEventType,
    pub name: &'static str,
    pub description: &'static str,
    /// Signed impact at full severity, e.g. -0.6 for a 60% drop.
    pub impact_multiplier: f64,
    pub historical_periods: Vec<HistoricalPeriod>,
    /// Intensity in [0, 1] per calendar quarter (Q1..Q4), for events that
    /// recur seasonally rather than in dated episodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seasonal_pattern: Option<[f64; 4]>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub affected_neighborhoods: Vec<&'static str>,
}

/// Immutable catalog with one definition per event type.
pub struct EventCatalog {
    definitions: [EventDefinition; 6],
}

impl EventCatalog {
    pub fn new() -> Self {
        Self {
            // Indexed by `ExogenousEventType as usize`; keep declaration
            // order in sync with the enum.
            definitions: [
                EventDefinition {
                    event_type: ExogenousEventType::Pandemic,
                    name: "Pandemic",
                    description: "Pandemic travel restrictions suppressing short-term rental demand",
                    impact_multiplier: -0.6,
                    historical_periods: vec![
                        period(2020, 3, 2021, 6, 0.8),
                        period(2021, 7, 2022, 12, 0.4),
                    ],
                    seasonal_pattern: None,
                    affected_neighborhoods: vec![],
                },
                EventDefinition {
                    event_type: ExogenousEventType::Wildfire,
                    name: "Wildfire Season",
                    description: "Major wildfire events affecting the metro area",
                    impact_multiplier: -0.3,
                    historical_periods: vec![
                        period(2020, 8, 2020, 10, 0.6),
                        period(2023, 7, 2023, 8, 0.4),
                    ],
                    seasonal_pattern: None,
                    affected_neighborhoods: vec!["Malibu", "Topanga", "Hollywood Hills"],
                },
                EventDefinition {
                    event_type: ExogenousEventType::ExtremeWeather,
                    name: "Extreme Weather",
                    description: "Heat waves, storms, atmospheric rivers",
                    impact_multiplier: -0.15,
                    historical_periods: vec![],
                    seasonal_pattern: Some([0.3, 0.2, 0.5, 0.2]),
                    affected_neighborhoods: vec![],
                },
                EventDefinition {
                    event_type: ExogenousEventType::EconomicRecession,
                    name: "Economic Recession",
                    description: "Economic downturn reducing travel spending",
                    impact_multiplier: -0.4,
                    historical_periods: vec![
                        period(2008, 1, 2009, 12, 0.9),
                        period(2020, 3, 2020, 6, 0.7),
                    ],
                    seasonal_pattern: None,
                    affected_neighborhoods: vec![],
                },
                EventDefinition {
                    event_type: ExogenousEventType::MajorEvent,
                    name: "Major Events",
                    description: "Olympics, festivals, and other large events driving tourism",
                    impact_multiplier: 0.5,
                    historical_periods: vec![period(2028, 7, 2028, 8, 1.0)],
                    seasonal_pattern: None,
                    affected_neighborhoods: vec![],
                },
                EventDefinition {
                    event_type: ExogenousEventType::RegulatoryChange,
                    name: "Regulation Changes",
                    description: "Laws restricting or enabling short-term rentals",
                    impact_multiplier: -0.25,
                    historical_periods: vec![period(2019, 1, 2019, 12, 0.6)],
                    seasonal_pattern: None,
                    affected_neighborhoods: vec![],
                },
            ],
        }
    }

    pub fn definition(&self, event_type: ExogenousEventType) -> &EventDefinition {
        &self.definitions[event_type as usize]
    }

    pub fn definitions(&self) -> &[EventDefinition] {
        &self.definitions
    }
}

impl Default for EventCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Month-granular interval: first day of the start month through the last
/// day of the end month.
fn period(start_y: i32, start_m: u32, end_y: i32, end_m: u32, severity: f64) -> HistoricalPeriod {
    HistoricalPeriod {
        start: month_start(start_y, start_m),
        end: month_end(end_y, end_m),
        severity,
    }
}

fn month_start(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).expect("valid calendar month")
}

fn month_end(year: i32, month: u32) -> NaiveDate {
    let next = if month == 12 {
        month_start(year + 1, 1)
    } else {
        month_start(year, month + 1)
    };
    next.pred_opt().expect("valid calendar month")
}
