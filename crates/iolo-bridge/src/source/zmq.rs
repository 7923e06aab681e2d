//! ZeroMQ SUB socket source.
//!
//! A SUB socket does not end its receive stream when the publisher goes
//! away, so the socket monitor is watched alongside `recv`: losing the
//! publisher ends the channel.

use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use tracing::{debug, info};
use zeromq::{Socket, SocketEvent, SocketRecv, SubSocket, ZmqError};

use iolo_core::RawFrame;

use super::{SourceError, SubscriptionSource};

/// IOPub subscription over a ZeroMQ SUB socket.
pub struct ZmqSource {
    socket: SubSocket,
    /// Monitor events; `None` once the monitor stream has ended.
    events: Option<BoxStream<'static, SocketEvent>>,
    address: String,
}

impl ZmqSource {
    /// Connect to `address` and subscribe to `topic_filter` (`""` for all
    /// topics).
    pub async fn open(address: &str, topic_filter: &str) -> Result<Self, SourceError> {
        let mut socket = SubSocket::new();
        let events = socket.monitor().boxed();
        socket
            .connect(address)
            .await
            .map_err(|e| SourceError::Io(format!("connect {address}: {e}")))?;
        socket
            .subscribe(topic_filter)
            .await
            .map_err(|e| SourceError::Io(format!("subscribe {address}: {e}")))?;

        info!(address, topic_filter, "Subscribed to IOPub");
        Ok(Self {
            socket,
            events: Some(events),
            address: address.to_string(),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl SubscriptionSource for ZmqSource {
    async fn next(&mut self) -> Result<RawFrame, SourceError> {
        loop {
            let event = match self.events.as_mut() {
                Some(events) => tokio::select! {
                    biased;
                    received = self.socket.recv() => return receive(received),
                    event = events.next() => event,
                },
                None => return receive(self.socket.recv().await),
            };

            match event {
                Some(SocketEvent::Disconnected(_)) => {
                    info!(address = %self.address, "IOPub publisher disconnected");
                    return Err(SourceError::Closed);
                }
                Some(SocketEvent::Closed) => return Err(SourceError::Closed),
                Some(_) => debug!("IOPub socket event"),
                None => self.events = None,
            }
        }
    }
}

fn receive(received: Result<zeromq::ZmqMessage, ZmqError>) -> Result<RawFrame, SourceError> {
    match received {
        Ok(message) => {
            let parts: Vec<Vec<u8>> =
                message.into_vec().into_iter().map(|part| part.to_vec()).collect();
            debug!(parts = parts.len(), "Received IOPub frame");
            Ok(RawFrame::new(parts))
        }
        Err(ZmqError::NoMessage) => Err(SourceError::Closed),
        Err(e) => Err(SourceError::Io(e.to_string())),
    }
}
