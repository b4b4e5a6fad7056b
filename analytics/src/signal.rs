//! Signal synthesizer: gates confluence + structure + learning confidence
//! into a trade setup (§4.4.3).

use crate::types::{
    ConfluenceAnalysis, MarketBias, PrimarySignal, SetupQuality, StructureAnalysis, TradeSetup,
};
use confluence_core::mint_id;

/// Combines a confluence analysis, a structure analysis, and the
/// learning system's confidence for the detected pattern kind into a
/// `Buy`/`Sell`/`Wait`/`Avoid` trade setup.
#[derive(Debug, Clone, Copy)]
pub struct SignalSynthesizer {
    threshold: f64,
}

impl SignalSynthesizer {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// `current_price` anchors the setup's entry/sl/tp; `learning_confidence`
    /// is the learning system's confidence for the pattern kind the
    /// confluence analysis scored highest.
    pub fn synthesize(
        &self,
        confluence: &ConfluenceAnalysis,
        structure: &StructureAnalysis,
        learning_confidence: f64,
        current_price: f64,
    ) -> TradeSetup {
        let gated = confluence.overall_strength >= self.threshold
            && structure.phase_confidence >= self.threshold
            && learning_confidence >= self.threshold;

        let primary_signal = if !gated {
            PrimarySignal::Wait
        } else {
            match confluence.market_bias {
                MarketBias::Bullish => PrimarySignal::Buy,
                MarketBias::Bearish => PrimarySignal::Sell,
                MarketBias::Neutral => PrimarySignal::Avoid,
            }
        };

        let (entry, sl, tp, reward_risk) =
            compute_levels(primary_signal, structure, current_price);

        TradeSetup {
            id: mint_id("setup"),
            symbol: confluence.symbol.clone(),
            timeframe: confluence.timeframe,
            primary_signal,
            setup_quality: quality_from_strength(confluence.overall_strength, structure.phase_confidence),
            entry,
            sl,
            tp,
            reward_risk,
            timestamp: chrono::Utc::now(),
        }
    }
}

fn compute_levels(
    signal: PrimarySignal,
    structure: &StructureAnalysis,
    current_price: f64,
) -> (f64, f64, f64, f64) {
    if !matches!(signal, PrimarySignal::Buy | PrimarySignal::Sell) {
        return (current_price, current_price, current_price, 0.0);
    }

    let support = structure
        .support_levels
        .iter()
        .map(|level| level.price)
        .fold(None, |acc: Option<f64>, price| match acc {
            Some(best) if (best - current_price).abs() < (price - current_price).abs() => Some(best),
            _ => Some(price),
        });
    let resistance = structure
        .resistance_levels
        .iter()
        .map(|level| level.price)
        .fold(None, |acc: Option<f64>, price| match acc {
            Some(best) if (best - current_price).abs() < (price - current_price).abs() => Some(best),
            _ => Some(price),
        });

    let (sl, tp) = match signal {
        PrimarySignal::Buy => (
            support.unwrap_or(current_price * 0.99),
            resistance.unwrap_or(current_price * 1.02),
        ),
        PrimarySignal::Sell => (
            resistance.unwrap_or(current_price * 1.01),
            support.unwrap_or(current_price * 0.98),
        ),
        _ => unreachable!("gated above to Buy/Sell only"),
    };

    let risk = (current_price - sl).abs().max(f64::EPSILON);
    let reward = (tp - current_price).abs();
    (current_price, sl, tp, reward / risk)
}

fn quality_from_strength(overall_strength: f64, phase_confidence: f64) -> SetupQuality {
    let combined = (overall_strength + phase_confidence) / 2.0;
    if combined >= 85.0 {
        SetupQuality::Excellent
    } else if combined >= 70.0 {
        SetupQuality::Good
    } else if combined >= 50.0 {
        SetupQuality::Fair
    } else {
        SetupQuality::Poor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confluence_instrument::{Symbol, Timeframe};

    fn confluence(bias: MarketBias, strength: f64) -> ConfluenceAnalysis {
        ConfluenceAnalysis {
            id: "c1".into(),
            symbol: Symbol::new("EURUSD"),
            timeframe: Timeframe::M5,
            overall_strength: strength,
            pattern_confluences: Vec::new(),
            market_bias: bias,
            timestamp: chrono::Utc::now(),
        }
    }

    fn structure(phase_confidence: f64) -> StructureAnalysis {
        StructureAnalysis {
            id: "s1".into(),
            symbol: Symbol::new("EURUSD"),
            timeframe: Timeframe::M5,
            current_phase: crate::types::StructurePhase::Unknown,
            trend_direction: crate::types::TrendDirection::Bullish,
            structure_points: Vec::new(),
            support_levels: Vec::new(),
            resistance_levels: Vec::new(),
            recent_breaks: Vec::new(),
            phase_confidence,
            trend_strength: 0.0,
            next_key_level: None,
            expected_direction: None,
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn gate_blocks_below_threshold() {
        let synthesizer = SignalSynthesizer::new(65.0);
        let setup = synthesizer.synthesize(&confluence(MarketBias::Bullish, 40.0), &structure(80.0), 90.0, 1.1000);
        assert_eq!(setup.primary_signal, PrimarySignal::Wait);
    }

    #[test]
    fn gate_passes_with_bullish_bias_emits_buy() {
        let synthesizer = SignalSynthesizer::new(65.0);
        let setup = synthesizer.synthesize(&confluence(MarketBias::Bullish, 80.0), &structure(80.0), 90.0, 1.1000);
        assert_eq!(setup.primary_signal, PrimarySignal::Buy);
        assert!(setup.reward_risk > 0.0);
    }

    #[test]
    fn gate_passes_with_neutral_bias_emits_avoid() {
        let synthesizer = SignalSynthesizer::new(65.0);
        let setup = synthesizer.synthesize(&confluence(MarketBias::Neutral, 80.0), &structure(80.0), 90.0, 1.1000);
        assert_eq!(setup.primary_signal, PrimarySignal::Avoid);
    }
}
