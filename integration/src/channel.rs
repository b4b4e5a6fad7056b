//! [`Tx`] abstraction over different channel kinds, plus small
//! utilities layered on top (`ChannelTxDroppable`).

use crate::error::BusError;

/// Abstracts over a channel sender so callers can be generic over
/// bounded vs. unbounded, or over a test double.
pub trait Tx<Item> {
    fn send(&self, item: Item) -> Result<(), BusError>;
}

/// `Tx` for a [`tokio::sync::mpsc::UnboundedSender`].
#[derive(Debug, Clone)]
pub struct UnboundedTx<Item>(pub tokio::sync::mpsc::UnboundedSender<Item>);

impl<Item> UnboundedTx<Item> {
    pub fn new(tx: tokio::sync::mpsc::UnboundedSender<Item>) -> Self {
        Self(tx)
    }
}

impl<Item> Tx<Item> for UnboundedTx<Item> {
    fn send(&self, item: Item) -> Result<(), BusError> {
        self.0.send(item).map_err(|_| BusError::ChannelClosed)
    }
}

/// `Tx` for a bounded [`tokio::sync::mpsc::Sender`]. `try_send` is used
/// rather than the async `send` so this stays usable from synchronous
/// call sites (e.g. a panic-caught transition callback).
#[derive(Debug, Clone)]
pub struct BoundedTx<Item>(pub tokio::sync::mpsc::Sender<Item>);

impl<Item> BoundedTx<Item> {
    pub fn new(tx: tokio::sync::mpsc::Sender<Item>) -> Self {
        Self(tx)
    }
}

impl<Item> Tx<Item> for BoundedTx<Item> {
    fn send(&self, item: Item) -> Result<(), BusError> {
        use tokio::sync::mpsc::error::TrySendError;
        match self.0.try_send(item) {
            Ok(()) => Ok(()),
            Err(TrySendError::Closed(_)) => Err(BusError::ChannelClosed),
            Err(TrySendError::Full(_)) => Err(BusError::Invalid("channel full".to_string())),
        }
    }
}

/// Wraps a [`Tx`] that tears itself down permanently on the first
/// closed-channel error, so repeated sends after the receiver drops
/// become a cheap no-op rather than a repeated error path.
#[derive(Debug)]
pub struct ChannelTxDroppable<T> {
    tx: Option<T>,
}

impl<T> ChannelTxDroppable<T> {
    pub fn new(tx: T) -> Self {
        Self { tx: Some(tx) }
    }

    /// Sends via the inner `Tx` if it is still live. Silently drops the
    /// item once the channel has been observed closed.
    pub fn send<Item>(&mut self, item: Item)
    where
        T: Tx<Item>,
    {
        let Some(tx) = &self.tx else {
            return;
        };
        if let Err(error) = tx.send(item) {
            if matches!(error, BusError::ChannelClosed) {
                self.tx = None;
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_tx_reports_closed_receiver() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<u32>();
        drop(rx);
        let tx = UnboundedTx::new(tx);
        assert_eq!(tx.send(1), Err(BusError::ChannelClosed));
    }

    #[test]
    fn droppable_tx_goes_inert_after_first_closed_error() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<u32>();
        drop(rx);
        let mut droppable = ChannelTxDroppable::new(UnboundedTx::new(tx));
        assert!(!droppable.is_closed());
        droppable.send(1);
        assert!(droppable.is_closed());
        droppable.send(2);
        assert!(droppable.is_closed());
    }

    #[test]
    fn bounded_tx_sends_while_capacity_remains() {
        let (tx, mut rx) = tokio::sync::mpsc::channel::<u32>(1);
        let tx = BoundedTx::new(tx);
        assert!(tx.send(1).is_ok());
        assert!(rx.try_recv().is_ok());
    }
}
