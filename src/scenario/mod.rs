//! Scenario simulation: exogenous event catalog and the simulator that
//! overlays event impacts and custom shocks on a baseline forecast.

pub mod events;
pub mod simulator;

pub use events::*;
pub use simulator::*;
