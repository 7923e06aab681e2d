//! WebSocket hub connection.
//!
//! One long-lived connection; only the send direction is used. A failed
//! write drops the connection, and the next send re-dials the hub after a
//! backoff delay before writing.

use futures_util::SinkExt;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use super::{RelaySink, SinkError};
use crate::config::SinkConfig;

type HubStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Relay sink writing one text message per document to the hub.
pub struct WebSocketSink {
    url: Url,
    config: SinkConfig,
    stream: Option<HubStream>,
    /// Failed re-dials since the last successful write.
    reconnect_attempt: u32,
}

impl WebSocketSink {
    /// Dial the hub. Fails with [`SinkError::Connect`].
    pub async fn open(url: &Url, config: SinkConfig) -> Result<Self, SinkError> {
        let stream = dial(url, &config).await?;
        info!(hub = %url, "Connected to hub");
        Ok(Self {
            url: url.clone(),
            config,
            stream: Some(stream),
            reconnect_attempt: 0,
        })
    }

    pub const fn url(&self) -> &Url {
        &self.url
    }

    pub const fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn redial(&mut self) -> Result<HubStream, SinkError> {
        let delay = self.config.reconnect.delay_for_attempt(self.reconnect_attempt);
        warn!(
            hub = %self.url,
            attempt = self.reconnect_attempt,
            delay_ms = delay.as_millis(),
            "Reconnecting to hub"
        );
        sleep(delay).await;
        self.reconnect_attempt = self.reconnect_attempt.saturating_add(1);

        let stream = dial(&self.url, &self.config).await?;
        info!(hub = %self.url, "Reconnected to hub");
        Ok(stream)
    }
}

async fn dial(url: &Url, config: &SinkConfig) -> Result<HubStream, SinkError> {
    match timeout(
        config.connect_timeout,
        tokio_tungstenite::connect_async(url.as_str()),
    )
    .await
    {
        Ok(Ok((stream, response))) => {
            debug!(status = %response.status(), "Hub handshake complete");
            Ok(stream)
        }
        Ok(Err(e)) => Err(SinkError::Connect(e.to_string())),
        Err(_) => Err(SinkError::Connect(format!(
            "timed out after {}ms",
            config.connect_timeout.as_millis()
        ))),
    }
}

impl RelaySink for WebSocketSink {
    async fn send(&mut self, document: &str) -> Result<(), SinkError> {
        if document.len() > self.config.max_message_bytes {
            return Err(SinkError::MessageTooLarge {
                size: document.len(),
                max: self.config.max_message_bytes,
            });
        }

        let mut stream = match self.stream.take() {
            Some(stream) => stream,
            None => self.redial().await?,
        };

        let message = Message::Text(document.to_owned().into());
        match timeout(self.config.send_timeout, stream.send(message)).await {
            Ok(Ok(())) => {
                self.stream = Some(stream);
                self.reconnect_attempt = 0;
                Ok(())
            }
            // The stream is dropped here; the next send re-dials.
            Ok(Err(e)) => Err(SinkError::Write(e.to_string())),
            Err(_) => Err(SinkError::Write(format!(
                "timed out after {}ms",
                self.config.send_timeout.as_millis()
            ))),
        }
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.close(None).await {
                debug!(error = %e, "Error closing hub connection");
            }
            info!(hub = %self.url, "Hub connection closed");
        }
    }
}
