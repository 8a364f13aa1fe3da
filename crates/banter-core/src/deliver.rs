//! Delivery seam between sessions and the transport layer.
//!
//! The transport supplies each session with an opaque callback that hands
//! an encoded frame to the peer. Delivery must be non-blocking; a callback
//! whose peer is already gone reports [`DeliveryFailure`], which callers in
//! this crate catch and discard so one unreachable peer never aborts
//! delivery to the rest of a room.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

/// A delivery callback could not hand the frame to its peer.
///
/// Never escalated and never retried: the frame is simply lost for that
/// recipient.
#[derive(Debug, Error)]
#[error("delivery failed: peer is gone")]
pub struct DeliveryFailure;

/// Transport-supplied delivery callback for one connection.
pub trait Deliver: Send + Sync {
    /// Hand one encoded frame to the peer.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryFailure`] if the underlying connection is gone.
    fn deliver(&self, frame: &str) -> Result<(), DeliveryFailure>;
}

impl<T: Deliver + ?Sized> Deliver for Arc<T> {
    fn deliver(&self, frame: &str) -> Result<(), DeliveryFailure> {
        (**self).deliver(frame)
    }
}

/// The standard transport outbox: an unbounded channel drained by the
/// connection's writer task. Send fails once the receiver side is dropped,
/// which is exactly the peer-is-gone condition.
impl Deliver for mpsc::UnboundedSender<String> {
    fn deliver(&self, frame: &str) -> Result<(), DeliveryFailure> {
        self.send(frame.to_owned()).map_err(|_| DeliveryFailure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_delivers_while_receiver_alive() {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        tx.deliver("frame").unwrap();
        assert_eq!(rx.try_recv().unwrap(), "frame");
    }

    #[test]
    fn test_sender_fails_after_receiver_dropped() {
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        drop(rx);
        assert!(tx.deliver("frame").is_err());
    }
}
