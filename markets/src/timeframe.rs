//! Candle timeframe vocabulary used across the analytics pipeline.

use derive_more::Display;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Deserialize, Serialize)]
pub enum Timeframe {
    #[display("M1")]
    M1,
    #[display("M5")]
    M5,
    #[display("M15")]
    M15,
    #[display("M30")]
    M30,
    #[display("H1")]
    H1,
    #[display("H4")]
    H4,
    #[display("D1")]
    D1,
}

impl Timeframe {
    pub fn minutes(self) -> i64 {
        match self {
            Timeframe::M1 => 1,
            Timeframe::M5 => 5,
            Timeframe::M15 => 15,
            Timeframe::M30 => 30,
            Timeframe::H1 => 60,
            Timeframe::H4 => 240,
            Timeframe::D1 => 1440,
        }
    }
}
