//! # Core Error Types
//!
//! Central error type aggregating the failure modes of every layer of the
//! platform, matching the error taxonomy in the design: transient
//! operational errors, resource exhaustion, invariant violations, critical
//! trading errors, and fatal errors.
//!
//! Components never panic across their public boundary; they return
//! `Result<_, ConfluenceError>` (or a component-local error that converts
//! into it) and the caller decides how to route the failure — typically
//! into the recovery engine or a logged-and-continued invariant violation.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use confluence_core::error::ConfluenceError;
//!
//! fn handle(error: ConfluenceError) {
//!     match error {
//!         ConfluenceError::InvariantViolation(msg) => tracing::error!(%msg, "invariant violated"),
//!         ConfluenceError::Fatal(msg) => tracing::error!(%msg, "fatal, halting further starts"),
//!         other => tracing::warn!(%other, "transient failure"),
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Central error type for the Confluence platform core.
///
/// Aggregates the failure modes described in the error-handling design:
/// transient operational issues the recovery engine can act on,
/// resource exhaustion, invariant violations that fail an operation but
/// leave the system running, critical trading errors, and fatal errors
/// that halt further component starts.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Error)]
pub enum ConfluenceError {
    /// A component was registered twice, a record id collided within its
    /// category, or an outcome was written to an already-finalized record.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// A transient operational condition: network blip, stale market data,
    /// broker reconnect in progress. The recovery engine is expected to act.
    #[error("transient: {0}")]
    Transient(String),

    /// Resource exhaustion (memory/disk/CPU over threshold).
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Critical trading error: margin breach, execution failure, a signal
    /// that should never have passed the risk gate.
    #[error("critical trading error: {0}")]
    CriticalTrading(String),

    /// Unrecoverable storage corruption or a component that failed to
    /// initialize during `Start`. The coordinator halts further starts.
    #[error("fatal: {0}")]
    Fatal(String),

    /// The receiving half of an internal channel was dropped.
    #[error("channel receiver dropped")]
    ChannelClosed,

    /// A spawned task panicked or was cancelled before completion.
    #[error("join error: {0}")]
    Join(String),
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for ConfluenceError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Self::ChannelClosed
    }
}

impl From<tokio::task::JoinError> for ConfluenceError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Join(value.to_string())
    }
}

impl confluence_bus::Unrecoverable for ConfluenceError {
    /// `Fatal` halts further component starts; an invariant violation
    /// means a corrupt internal state machine. Everything else (transient,
    /// resource exhaustion, critical trading, channel/join) is the
    /// recovery engine's problem, not a reason to stop retrying.
    fn is_unrecoverable(&self) -> bool {
        matches!(self, ConfluenceError::Fatal(_) | ConfluenceError::InvariantViolation(_))
    }
}
