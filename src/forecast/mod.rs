//! Forecasting core: error metrics, volume models, the weighted ensemble,
//! and the request-facing forecast service.

pub mod ensemble;
pub mod metrics;
pub mod models;
pub mod service;

pub use ensemble::*;
pub use metrics::*;
pub use models::*;
pub use service::*;
