//! Outbound side: the persistent connection notifications are relayed over.

mod stdout;
mod websocket;

use std::future::Future;

pub use stdout::StdoutSink;
pub use websocket::WebSocketSink;

/// Errors from the relay connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// Could not establish the connection.
    #[error("connection error: {0}")]
    Connect(String),

    /// Write failed or timed out; the document was not delivered.
    #[error("write error: {0}")]
    Write(String),

    /// Document exceeds the transport's frame-size limit.
    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },
}

impl SinkError {
    /// Whether the failure says something about the connection's health,
    /// as opposed to the one document being sent.
    pub const fn is_connection_failure(&self) -> bool {
        !matches!(self, Self::MessageTooLarge { .. })
    }
}

/// Accepts one encoded notification at a time.
pub trait RelaySink: Send {
    fn send(&mut self, document: &str) -> impl Future<Output = Result<(), SinkError>> + Send;

    /// Release the connection. Errors are logged, not returned.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}
