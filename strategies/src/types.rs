//! Pattern vocabulary scored by a [`crate::PatternScorer`] (GLOSSARY "FVG",
//! "Order Block", "BOS", "CHoCH", "liquidity sweep").

use serde::{Deserialize, Serialize};

/// The ICT pattern families a scorer may detect in a candle window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum PatternKind {
    FairValueGap,
    OrderBlock,
    BreakOfStructure,
    ChangeOfCharacter,
    LiquiditySweep,
}

/// One detected pattern instance, scored 0-100 by strength.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PatternConfluence {
    pub kind: PatternKind,
    pub strength: f64,
    pub price_level: Option<f64>,
}

impl PatternConfluence {
    pub fn new(kind: PatternKind, strength: f64, price_level: Option<f64>) -> Self {
        Self {
            kind,
            strength: strength.clamp(0.0, 100.0),
            price_level,
        }
    }
}

/// All confluences a scorer found in one window, plus their combined
/// strength. `confluence-analytics` folds this into its overall score.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PatternConfluences {
    pub confluences: Vec<PatternConfluence>,
}

impl PatternConfluences {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn push(&mut self, confluence: PatternConfluence) {
        self.confluences.push(confluence);
    }

    /// Mean strength across all detected confluences, 0 if none were found.
    pub fn overall_strength(&self) -> f64 {
        if self.confluences.is_empty() {
            return 0.0;
        }
        self.confluences.iter().map(|c| c.strength).sum::<f64>() / self.confluences.len() as f64
    }

    pub fn contains(&self, kind: PatternKind) -> bool {
        self.confluences.iter().any(|c| c.kind == kind)
    }
}
