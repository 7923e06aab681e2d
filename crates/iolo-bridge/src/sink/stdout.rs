//! Newline-delimited JSON on stdout.

use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};

use super::{RelaySink, SinkError};

/// Writes each document as one line to a byte stream (stdout by default).
pub struct StdoutSink<W = Stdout> {
    writer: W,
}

impl StdoutSink<Stdout> {
    pub fn new() -> Self {
        Self {
            writer: tokio::io::stdout(),
        }
    }
}

impl Default for StdoutSink<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: AsyncWrite + Unpin + Send> StdoutSink<W> {
    pub const fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: AsyncWrite + Unpin + Send> RelaySink for StdoutSink<W> {
    async fn send(&mut self, document: &str) -> Result<(), SinkError> {
        let mut line = Vec::with_capacity(document.len() + 1);
        line.extend_from_slice(document.as_bytes());
        line.push(b'\n');
        self.writer
            .write_all(&line)
            .await
            .map_err(|e| SinkError::Write(e.to_string()))?;
        self.writer
            .flush()
            .await
            .map_err(|e| SinkError::Write(e.to_string()))
    }

    async fn close(&mut self) {
        if let Err(e) = self.writer.flush().await {
            tracing::debug!(error = %e, "Flushing stdout on close failed");
        }
    }
}
