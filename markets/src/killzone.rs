//! Named trading-session windows (GLOSSARY "Killzone").

use chrono::{DateTime, Timelike, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Deserialize, Serialize)]
pub enum Killzone {
    Asian,
    London,
    #[display("New York")]
    NewYork,
    Overlap,
    Off,
}

impl Killzone {
    /// Classifies a UTC instant into a killzone using conventional ICT
    /// session hours. Overlap is the London/New York overlap window.
    pub fn classify(now: DateTime<Utc>) -> Self {
        match now.hour() {
            0..=6 => Killzone::Asian,
            7..=11 => Killzone::London,
            12..=15 => Killzone::Overlap,
            16..=20 => Killzone::NewYork,
            _ => Killzone::Off,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn classifies_overlap_window() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 13, 0, 0).unwrap();
        assert_eq!(Killzone::classify(at), Killzone::Overlap);
    }
}
