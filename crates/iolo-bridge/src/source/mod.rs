//! Inbound side: the kernel's IOPub broadcast channel.

mod zmq;

use std::future::Future;

use iolo_core::RawFrame;

pub use self::zmq::ZmqSource;

/// Errors from the subscription socket.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The channel ended cleanly; no more frames will arrive.
    #[error("subscription channel closed")]
    Closed,

    /// Transport failure while opening or reading.
    #[error("subscription I/O error: {0}")]
    Io(String),
}

/// A lazy, unbounded, non-restartable sequence of raw IOPub frames.
///
/// `next` waits until a frame is available. Implementations never drop
/// frames themselves.
pub trait SubscriptionSource: Send {
    fn next(&mut self) -> impl Future<Output = Result<RawFrame, SourceError>> + Send;
}
