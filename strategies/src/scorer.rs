//! Pattern-confluence scoring capability (SPEC §10 "PatternScorer").
//!
//! `confluence-analytics`'s `ConfluenceEngine` is generic over this trait so
//! concrete detection algorithms can be swapped in without touching the
//! analytics pipeline. Concrete ICT pattern-recognition math is an explicit
//! abstraction point here (§1 Non-goals) — this crate ships the contract
//! and a neutral default, not a detector.

use crate::types::{PatternConfluence, PatternConfluences, PatternKind};
use confluence_instrument::Candle;

/// Scores a candle window for ICT-style pattern confluences.
pub trait PatternScorer: Send + Sync {
    fn score(&self, candles: &[Candle]) -> PatternConfluences;
}

/// Default collaborator: reports a single fixed low-confidence neutral
/// confluence rather than nothing, so downstream overall-strength math
/// never special-cases "no scorer configured" as "fully confident".
#[derive(Debug, Default, Clone, Copy)]
pub struct NeutralPatternScorer;

impl PatternScorer for NeutralPatternScorer {
    fn score(&self, candles: &[Candle]) -> PatternConfluences {
        if candles.is_empty() {
            return PatternConfluences::empty();
        }
        let mut confluences = PatternConfluences::empty();
        confluences.push(PatternConfluence::new(PatternKind::OrderBlock, 10.0, None));
        confluences
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn candle() -> Candle {
        Candle {
            time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            volume: None,
        }
    }

    #[test]
    fn neutral_scorer_reports_low_confidence_on_nonempty_window() {
        let result = NeutralPatternScorer.score(&[candle()]);
        assert_eq!(result.overall_strength(), 10.0);
    }

    #[test]
    fn neutral_scorer_reports_nothing_on_empty_window() {
        let result = NeutralPatternScorer.score(&[]);
        assert!(result.confluences.is_empty());
    }
}
