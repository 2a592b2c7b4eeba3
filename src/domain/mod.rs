pub mod forecast;
pub mod period;

pub use forecast::*;
pub use period::*;

use serde::{Deserialize, Serialize};

/// Listing room types as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomType {
    #[serde(rename = "Entire home/apt")]
    EntireHome,
    #[serde(rename = "Private room")]
    PrivateRoom,
    #[serde(rename = "Hotel room")]
    HotelRoom,
    #[serde(rename = "Shared room")]
    SharedRoom,
}

impl RoomType {
    /// Relative price level vs. the market baseline.
    pub fn price_multiplier(&self) -> f64 {
        match self {
            Self::EntireHome => 1.5,
            Self::PrivateRoom => 0.7,
            Self::HotelRoom | Self::SharedRoom => 1.0,
        }
    }
}
