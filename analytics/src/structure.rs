//! Market structure engine: swing-point detection, trend/phase
//! classification, and support/resistance clustering (§4.4.2).

use crate::types::{
    StructureAnalysis, StructureBreak, StructurePhase, StructurePoint, StructurePointKind,
    SrLevel, SrSide, TrendDirection,
};
use confluence_core::mint_id;
use confluence_instrument::{Candle, CandleWindow};
use confluence_pattern::PatternKind;

#[derive(Debug, Clone)]
pub struct StructureEngineConfig {
    pub swing_point_k: usize,
    pub trend_lookback_swings: usize,
    pub trend_dominance_multiple: f64,
    pub sr_cluster_band_pct: f64,
    pub sr_min_touches: u32,
    pub sr_levels_per_side: usize,
}

/// Detects swing points, classifies trend and phase, and clusters
/// support/resistance from a candle window (§4.4.2).
#[derive(Debug, Clone)]
pub struct MarketStructureEngine {
    config: StructureEngineConfig,
}

impl MarketStructureEngine {
    pub fn new(config: StructureEngineConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, window: &CandleWindow) -> StructureAnalysis {
        let candles = &window.candles;
        let swing_highs = detect_swing_highs(candles, self.config.swing_point_k);
        let swing_lows = detect_swing_lows(candles, self.config.swing_point_k);

        let structure_points = classify_points(&swing_highs, &swing_lows, self.config.sr_cluster_band_pct);
        let (trend_direction, trend_strength) = classify_trend(
            &structure_points,
            self.config.trend_lookback_swings,
            self.config.trend_dominance_multiple,
        );
        let (current_phase, phase_confidence) = classify_phase(candles, &structure_points);

        let resistance_levels = cluster_levels(
            &swing_highs,
            SrSide::Resistance,
            self.config.sr_cluster_band_pct,
            self.config.sr_min_touches,
            self.config.sr_levels_per_side,
        );
        let support_levels = cluster_levels(
            &swing_lows,
            SrSide::Support,
            self.config.sr_cluster_band_pct,
            self.config.sr_min_touches,
            self.config.sr_levels_per_side,
        );

        let recent_breaks = detect_breaks(candles, &structure_points);
        let last_close = candles.last().map(|c| c.close);
        let next_key_level = last_close
            .and_then(|close| nearest_level(close, &support_levels, &resistance_levels));
        let expected_direction = next_key_level.as_ref().map(|level| match level.side {
            SrSide::Support => TrendDirection::Bullish,
            SrSide::Resistance => TrendDirection::Bearish,
        });

        StructureAnalysis {
            id: mint_id("structure"),
            symbol: window.symbol.clone(),
            timeframe: window.timeframe,
            current_phase,
            trend_direction,
            structure_points,
            support_levels,
            resistance_levels,
            recent_breaks,
            phase_confidence,
            trend_strength,
            next_key_level,
            expected_direction,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// A swing point with the candle index it occurred at, so later passes can
/// reason about ordering.
#[derive(Debug, Clone, Copy)]
struct Swing {
    index: usize,
    price: f64,
    at: chrono::DateTime<chrono::Utc>,
}

fn detect_swing_highs(candles: &[Candle], k: usize) -> Vec<Swing> {
    detect_swings(candles, k, true)
}

fn detect_swing_lows(candles: &[Candle], k: usize) -> Vec<Swing> {
    detect_swings(candles, k, false)
}

fn detect_swings(candles: &[Candle], k: usize, highs: bool) -> Vec<Swing> {
    if candles.len() < 2 * k + 1 {
        return Vec::new();
    }
    let mut swings = Vec::new();
    for i in k..candles.len() - k {
        let pivot = if highs { candles[i].high } else { candles[i].low };
        let is_swing = (1..=k).all(|offset| {
            let left = if highs {
                candles[i - offset].high
            } else {
                candles[i - offset].low
            };
            let right = if highs {
                candles[i + offset].high
            } else {
                candles[i + offset].low
            };
            if highs {
                pivot > left && pivot > right
            } else {
                pivot < left && pivot < right
            }
        });
        if is_swing {
            swings.push(Swing {
                index: i,
                price: pivot,
                at: candles[i].time,
            });
        }
    }
    swings
}

fn within_band(a: f64, b: f64, band_pct: f64) -> bool {
    let reference = a.abs().max(b.abs()).max(f64::EPSILON);
    (a - b).abs() / reference <= band_pct
}

/// Classifies each swing against the previous swing of the same kind,
/// interleaving highs and lows in chronological order (§4.4.2 step 2).
fn classify_points(highs: &[Swing], lows: &[Swing], band_pct: f64) -> Vec<StructurePoint> {
    let mut points = Vec::new();
    let mut prev_high: Option<f64> = None;
    let mut prev_low: Option<f64> = None;

    let mut tagged: Vec<(usize, bool, Swing)> = highs
        .iter()
        .map(|s| (s.index, true, *s))
        .chain(lows.iter().map(|s| (s.index, false, *s)))
        .collect();
    tagged.sort_by_key(|(index, _, _)| *index);

    for (_, is_high, swing) in tagged {
        let kind = if is_high {
            let kind = match prev_high {
                Some(prev) if within_band(swing.price, prev, band_pct) => StructurePointKind::Eqh,
                Some(prev) if swing.price > prev => StructurePointKind::Hh,
                Some(_) => StructurePointKind::Lh,
                None => StructurePointKind::Hh,
            };
            prev_high = Some(swing.price);
            kind
        } else {
            let kind = match prev_low {
                Some(prev) if within_band(swing.price, prev, band_pct) => StructurePointKind::Eql,
                Some(prev) if swing.price < prev => StructurePointKind::Ll,
                Some(_) => StructurePointKind::Hl,
                None => StructurePointKind::Hl,
            };
            prev_low = Some(swing.price);
            kind
        };
        points.push(StructurePoint {
            kind,
            price: swing.price,
            at: swing.at,
        });
    }
    points
}

/// Trend from the last `lookback` swings: bullish signals are HH/HL,
/// bearish are LH/LL; `dominance_multiple` dominance flips the call,
/// otherwise the split is Sideways/Transitioning (§4.4.2 step 3).
fn classify_trend(
    points: &[StructurePoint],
    lookback: usize,
    dominance_multiple: f64,
) -> (TrendDirection, f64) {
    let recent = &points[points.len().saturating_sub(lookback)..];
    if recent.is_empty() {
        return (TrendDirection::Sideways, 0.0);
    }

    let bullish = recent
        .iter()
        .filter(|p| matches!(p.kind, StructurePointKind::Hh | StructurePointKind::Hl))
        .count() as f64;
    let bearish = recent
        .iter()
        .filter(|p| matches!(p.kind, StructurePointKind::Lh | StructurePointKind::Ll))
        .count() as f64;
    let total = recent.len() as f64;

    let direction = if bullish >= bearish * dominance_multiple && bullish > 0.0 {
        TrendDirection::Bullish
    } else if bearish >= bullish * dominance_multiple && bearish > 0.0 {
        TrendDirection::Bearish
    } else if (bullish - bearish).abs() < f64::EPSILON {
        TrendDirection::Sideways
    } else {
        TrendDirection::Transitioning
    };

    let strength = (bullish.max(bearish) / total * 100.0).min(100.0);
    (direction, strength)
}

/// Phase detection combines recent range vs average range and swing
/// density into a Wyckoff-style read, with a confidence scalar expressing
/// how strongly the heuristic's conditions held (§4.4.2 step 4).
fn classify_phase(candles: &[Candle], points: &[StructurePoint]) -> (StructurePhase, f64) {
    if candles.len() < 4 || points.len() < 2 {
        return (StructurePhase::Unknown, 0.0);
    }

    let ranges: Vec<f64> = candles.iter().map(Candle::range).collect();
    let avg_range = ranges.iter().sum::<f64>() / ranges.len() as f64;
    let recent_window = ranges.len().min(3);
    let recent_avg_range =
        ranges[ranges.len() - recent_window..].iter().sum::<f64>() / recent_window as f64;
    let range_ratio = if avg_range > f64::EPSILON {
        recent_avg_range / avg_range
    } else {
        1.0
    };

    let swing_density = points.len() as f64 / candles.len() as f64;

    let price_rising = candles.last().map(|c| c.close) > candles.first().map(|c| c.close);

    let (phase, confidence) = if range_ratio < 0.7 && swing_density < 0.3 {
        (StructurePhase::Accumulation, (0.7 - range_ratio).min(1.0) * 100.0)
    } else if range_ratio > 1.5 && swing_density > 0.4 {
        if price_rising {
            (StructurePhase::Distribution, ((range_ratio - 1.5) / 1.5).min(1.0) * 100.0)
        } else {
            (StructurePhase::Manipulation, ((range_ratio - 1.5) / 1.5).min(1.0) * 100.0)
        }
    } else if range_ratio < 1.1 {
        (StructurePhase::Rebalance, 50.0)
    } else {
        (StructurePhase::Unknown, 0.0)
    };

    (phase, confidence.clamp(0.0, 100.0))
}

fn cluster_levels(
    swings: &[Swing],
    side: SrSide,
    band_pct: f64,
    min_touches: u32,
    top_n: usize,
) -> Vec<SrLevel> {
    let mut clusters: Vec<(f64, u32)> = Vec::new();
    for swing in swings {
        if let Some(cluster) = clusters
            .iter_mut()
            .find(|(price, _)| within_band(*price, swing.price, band_pct))
        {
            cluster.0 = (cluster.0 * cluster.1 as f64 + swing.price) / (cluster.1 + 1) as f64;
            cluster.1 += 1;
        } else {
            clusters.push((swing.price, 1));
        }
    }

    let mut levels: Vec<SrLevel> = clusters
        .into_iter()
        .filter(|(_, touches)| *touches >= min_touches)
        .map(|(price, touches)| SrLevel {
            side,
            price,
            touches,
            strength: (touches as f64 * 25.0).min(100.0),
        })
        .collect();

    levels.sort_by(|a, b| b.strength.partial_cmp(&a.strength).unwrap());
    levels.truncate(top_n);
    levels
}

fn nearest_level(close: f64, support: &[SrLevel], resistance: &[SrLevel]) -> Option<SrLevel> {
    support
        .iter()
        .chain(resistance.iter())
        .min_by(|a, b| {
            (a.price - close)
                .abs()
                .partial_cmp(&(b.price - close).abs())
                .unwrap()
        })
        .copied()
}

/// Breaks of structure (a close beyond the most recent opposite-side
/// swing) and changes of character (a swing forming against the run of
/// swings immediately before it).
fn detect_breaks(candles: &[Candle], points: &[StructurePoint]) -> Vec<StructureBreak> {
    let mut breaks = Vec::new();

    for window in points.windows(2) {
        let (prev, current) = (window[0], window[1]);
        let prev_bullish = matches!(prev.kind, StructurePointKind::Hh | StructurePointKind::Hl);
        let current_bullish = matches!(
            current.kind,
            StructurePointKind::Hh | StructurePointKind::Hl
        );
        if prev_bullish != current_bullish {
            breaks.push(StructureBreak {
                kind: PatternKind::ChangeOfCharacter,
                at: current.at,
                price: current.price,
            });
        }
    }

    if let (Some(last_point), Some(last_candle)) = (points.last(), candles.last()) {
        let broke_up = last_candle.close > last_point.price
            && matches!(last_point.kind, StructurePointKind::Lh | StructurePointKind::Ll);
        let broke_down = last_candle.close < last_point.price
            && matches!(last_point.kind, StructurePointKind::Hh | StructurePointKind::Hl);
        if broke_up || broke_down {
            breaks.push(StructureBreak {
                kind: PatternKind::BreakOfStructure,
                at: last_candle.time,
                price: last_candle.close,
            });
        }
    }

    breaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use confluence_instrument::{Symbol, Timeframe};

    fn candles_zigzag() -> Vec<Candle> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let closes = [100.0, 101.0, 103.0, 102.0, 105.0, 104.0, 108.0, 107.0, 111.0];
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                time: base + Duration::minutes(i as i64),
                open: close - 0.5,
                high: close + 0.5,
                low: close - 1.0,
                close,
                volume: None,
            })
            .collect()
    }

    #[test]
    fn detects_bullish_trend_from_rising_zigzag() {
        let window = CandleWindow::new(Symbol::new("EURUSD"), Timeframe::M5, candles_zigzag());
        let engine = MarketStructureEngine::new(StructureEngineConfig {
            swing_point_k: 1,
            trend_lookback_swings: 6,
            trend_dominance_multiple: 1.5,
            sr_cluster_band_pct: 0.001,
            sr_min_touches: 2,
            sr_levels_per_side: 5,
        });
        let analysis = engine.analyze(&window);
        assert_eq!(analysis.trend_direction, TrendDirection::Bullish);
    }

    #[test]
    fn short_window_yields_unknown_phase() {
        let window = CandleWindow::new(
            Symbol::new("EURUSD"),
            Timeframe::M5,
            candles_zigzag()[..2].to_vec(),
        );
        let engine = MarketStructureEngine::new(StructureEngineConfig {
            swing_point_k: 2,
            trend_lookback_swings: 6,
            trend_dominance_multiple: 1.5,
            sr_cluster_band_pct: 0.001,
            sr_min_touches: 2,
            sr_levels_per_side: 5,
        });
        let analysis = engine.analyze(&window);
        assert_eq!(analysis.current_phase, StructurePhase::Unknown);
    }
}
