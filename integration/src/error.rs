//! Errors produced by the bus's channel and validation primitives.

use thiserror::Error;

/// Errors a [`crate::channel::Tx`] implementation or a [`crate::Validator`]
/// may report. Deliberately small: this crate has no protocol/transport
/// layer of its own (that is `confluence-broker`'s concern, §6); it only
/// needs to describe "the receiver is gone" and "the payload failed
/// validation".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("channel receiver dropped")]
    ChannelClosed,

    #[error("validation failed: {0}")]
    Invalid(String),
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for BusError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Self::ChannelClosed
    }
}
