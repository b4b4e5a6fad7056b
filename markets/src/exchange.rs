//! Venue identifier carried on configuration and persisted records —
//! which broker connection a symbol/signal/order belongs to. Distinct
//! from `confluence_broker::BrokerAdapter`: that trait is the live
//! connection, this is the static identifier naming one.

use confluence_macros::{DeExchange, SerExchange};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Identifies a trading venue a `BrokerAdapter` connects to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, serde::Deserialize, serde::Serialize)]
pub enum ExchangeId {
    /// Brazilian Stock Exchange (B3).
    B3,
    /// In-memory adapter for tests (`confluence_broker::mock::MockBrokerAdapter`).
    Mock,
    /// Historical-replay adapter for backtesting.
    Simulated,
    /// Binance cryptocurrency exchange.
    Binance,
    /// Coinbase cryptocurrency exchange.
    Coinbase,
    /// OKX cryptocurrency exchange.
    Okx,
    /// Bybit cryptocurrency exchange.
    Bybit,
    /// Kraken cryptocurrency exchange.
    Kraken,
}

impl ExchangeId {
    pub fn is_brazilian(&self) -> bool {
        matches!(self, ExchangeId::B3)
    }

    pub fn is_crypto(&self) -> bool {
        matches!(
            self,
            ExchangeId::Binance | ExchangeId::Coinbase | ExchangeId::Okx | ExchangeId::Bybit | ExchangeId::Kraken
        )
    }

    pub fn is_test(&self) -> bool {
        matches!(self, ExchangeId::Mock | ExchangeId::Simulated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeId::B3 => "B3",
            ExchangeId::Mock => "MOCK",
            ExchangeId::Simulated => "SIMULATED",
            ExchangeId::Binance => "BINANCE",
            ExchangeId::Coinbase => "COINBASE",
            ExchangeId::Okx => "OKX",
            ExchangeId::Bybit => "BYBIT",
            ExchangeId::Kraken => "KRAKEN",
        }
    }
}

impl FromStr for ExchangeId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "B3" => Ok(ExchangeId::B3),
            "MOCK" => Ok(ExchangeId::Mock),
            "SIMULATED" => Ok(ExchangeId::Simulated),
            "BINANCE" => Ok(ExchangeId::Binance),
            "COINBASE" => Ok(ExchangeId::Coinbase),
            "OKX" => Ok(ExchangeId::Okx),
            "BYBIT" => Ok(ExchangeId::Bybit),
            "KRAKEN" => Ok(ExchangeId::Kraken),
            _ => Err(()),
        }
    }
}

impl Display for ExchangeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for ExchangeId {
    fn from(s: &str) -> Self {
        s.parse().unwrap_or(ExchangeId::Mock)
    }
}

/// Metadata a venue marker type exposes about itself. `ExchangeId` is
/// the wire/config identifier; a type implementing `Exchange` is the
/// zero-sized marker a `BrokerAdapter` construction site can be generic
/// over when it needs venue-specific defaults (pip size, session
/// calendar) without threading `ExchangeId` through as a runtime value.
pub trait Exchange {
    fn id(&self) -> ExchangeId;
    fn name(&self) -> &'static str;
}

/// B3 (Brasil Bolsa Balcão) marker.
#[derive(Debug, Clone, DeExchange, SerExchange)]
pub struct B3Exchange;

impl B3Exchange {
    pub const ID: &'static str = "B3";
}

impl Exchange for B3Exchange {
    fn id(&self) -> ExchangeId {
        ExchangeId::B3
    }

    fn name(&self) -> &'static str {
        "Brasil Bolsa Balcão"
    }
}

/// `confluence_broker::mock::MockBrokerAdapter`'s venue marker.
#[derive(Debug, Clone, DeExchange, SerExchange)]
pub struct MockExchange;

impl MockExchange {
    pub const ID: &'static str = "MOCK";
}

impl Exchange for MockExchange {
    fn id(&self) -> ExchangeId {
        ExchangeId::Mock
    }

    fn name(&self) -> &'static str {
        "Mock Exchange"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_brazilian_and_crypto_venues() {
        assert!(ExchangeId::B3.is_brazilian());
        assert!(!ExchangeId::B3.is_crypto());
        assert!(ExchangeId::Binance.is_crypto());
        assert!(ExchangeId::Mock.is_test());
    }

    #[test]
    fn round_trips_through_its_canonical_string() {
        assert_eq!(ExchangeId::B3.to_string(), "B3");
        assert_eq!(ExchangeId::from_str("b3").unwrap(), ExchangeId::B3);
        assert!(ExchangeId::from_str("nonsense").is_err());
    }

    #[test]
    fn exchange_markers_report_their_id() {
        assert_eq!(B3Exchange.id(), ExchangeId::B3);
        assert_eq!(MockExchange.id(), ExchangeId::Mock);
    }
}
