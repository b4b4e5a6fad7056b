#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments)]

//! # Bus
//!
//! Generic, transport-agnostic building blocks shared by the rest of
//! the platform: a [`Tx`](channel::Tx) abstraction over channel kinds,
//! the [`OneOrMany`](collection::one_or_many::OneOrMany) /
//! [`NoneOneOrMany`](collection::none_one_or_many::NoneOneOrMany)
//! collection newtypes, an [`IndexedStream`](stream::indexed::IndexedStream)
//! combinator, and the [`Validator`] / [`Transformer`] / [`Unrecoverable`]
//! / [`Terminal`] seams other crates implement against.
//!
//! This crate has no protocol, transport, or exchange-specific code of
//! its own — that lives in `confluence-broker` (§6/§8). It exists so
//! `confluence-analytics`'s event bus and `confluence-coordinator`'s
//! transition callbacks can be built on the same small vocabulary
//! instead of each inventing their own.

use crate::error::BusError;
use serde::{Deserialize, Serialize};

/// Errors produced by [`Tx`](channel::Tx) implementations and
/// [`Validator`]s.
pub mod error;

/// [`Tx`](channel::Tx) abstraction over different channel kinds, plus
/// utilities layered on top (`UnboundedTx`, `BoundedTx`,
/// `ChannelTxDroppable`).
pub mod channel;

pub mod collection;

/// Stream utilities (`IndexedStream`).
pub mod stream;

/// [`Validator`]s are capable of determining if their internal state
/// is satisfactory to fulfill some use case defined by the implementor.
pub trait Validator {
    /// Check if `Self` is valid for some use case.
    fn validate(self) -> Result<Self, BusError>
    where
        Self: Sized;
}

/// [`Transformer`]s are capable of transforming any `Input` into an
/// iterator of `Result<Self::Output, Self::Error>`s.
pub trait Transformer {
    type Error;
    type Input: for<'de> Deserialize<'de>;
    type Output;
    type OutputIter: IntoIterator<Item = Result<Self::Output, Self::Error>>;
    fn transform(&mut self, input: Self::Input) -> Self::OutputIter;
}

/// Determines if something is considered "unrecoverable", such as an
/// unrecoverable error.
///
/// Note that the meaning of [`Unrecoverable`] may vary depending on
/// the context.
pub trait Unrecoverable {
    fn is_unrecoverable(&self) -> bool;
}

/// Trait that communicates if something is terminal (e.g. requires
/// shutdown or restart).
pub trait Terminal {
    fn is_terminal(&self) -> bool;
}

/// Indicates an `Iterator` or `Stream` has ended.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize, Serialize,
)]
pub struct FeedEnded;
