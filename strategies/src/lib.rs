#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! # Pattern
//!
//! ICT pattern-confluence scoring: the [`PatternScorer`] capability that
//! `confluence-analytics`'s `ConfluenceEngine` composes over, plus a
//! [`NeutralPatternScorer`] no-op default. Concrete ICT detection math
//! (fair value gaps, order blocks, liquidity sweeps) is an explicit
//! abstraction point left to the implementer (§1 Non-goals).

pub mod scorer;
pub mod types;

pub use scorer::{NeutralPatternScorer, PatternScorer};
pub use types::{PatternConfluence, PatternConfluences, PatternKind};
