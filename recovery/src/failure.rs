//! The closed enumeration of failure kinds the recovery engine detects
//! and acts on (§4.2).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A detectable failure condition. Closed by design: the probe set and
/// the default action catalogue are both written against this exact
/// enumeration, so adding a new failure kind is a deliberate change to
/// both, not an open extension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum FailureKind {
    BrokerConnectionLost,
    InternetDisconnected,
    HighMemoryUsage,
    HighCPUUsage,
    DiskFull,
    TradingEngineStuck,
    MarketDataStale,
    OrderExecutionFailed,
    LowMarginLevel,
    SystemFreeze,
    LoggingFailure,
    DatabaseError,
}

impl FailureKind {
    pub const ALL: [FailureKind; 12] = [
        FailureKind::BrokerConnectionLost,
        FailureKind::InternetDisconnected,
        FailureKind::HighMemoryUsage,
        FailureKind::HighCPUUsage,
        FailureKind::DiskFull,
        FailureKind::TradingEngineStuck,
        FailureKind::MarketDataStale,
        FailureKind::OrderExecutionFailed,
        FailureKind::LowMarginLevel,
        FailureKind::SystemFreeze,
        FailureKind::LoggingFailure,
        FailureKind::DatabaseError,
    ];
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Probe outcome for a single failure kind on one detection-loop tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ProbeResult {
    Healthy,
    Bad(FailureKind),
    /// The probe's dependency was absent and the probe explicitly
    /// declines to guess (Design Note §9(c)): this is neither healthy
    /// nor failing, and does not add anything to `active_failures`.
    Unknown,
}
