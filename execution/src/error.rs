//! Errors a [`crate::adapter::BrokerAdapter`] or
//! [`crate::adapter::ExecutionAdapter`] implementation may report.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BrokerError {
    #[error("not connected to broker")]
    NotConnected,

    #[error("broker connection failed: {0}")]
    ConnectionFailed(String),

    #[error("unknown position ticket {0}")]
    UnknownTicket(String),

    #[error("order rejected: {0}")]
    OrderRejected(String),

    #[error("broker timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl From<BrokerError> for confluence_core::ConfluenceError {
    fn from(value: BrokerError) -> Self {
        confluence_core::ConfluenceError::Transient(value.to_string())
    }
}
