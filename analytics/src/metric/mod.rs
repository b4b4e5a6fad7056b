//! Performance metrics reused verbatim from the platform's metric
//! vocabulary and folded into [`crate::learning::PatternPerformance`].

pub mod profit_factor;
pub mod win_rate;

pub use profit_factor::ProfitFactor;
pub use win_rate::WinRate;
