//! The bridge state machine.

use std::future::Future;

use tracing::{debug, error, info, trace, warn};

use iolo_core::{ConnectionDescriptor, RawFrame, wire};

use super::state::{BridgeReport, BridgeState, BridgeStats, ShutdownReason};
use crate::config::BridgeConfig;
use crate::exit::StartupError;
use crate::sink::{RelaySink, SinkError};
use crate::source::{SourceError, SubscriptionSource};

/// Relays decoded IOPub notifications from a source to a sink.
///
/// Owns both transport handles exclusively. A bridge runs once; after
/// [`run`](Self::run) returns, both sides have been released.
pub struct Bridge<S, K> {
    descriptor: ConnectionDescriptor,
    source: S,
    sink: K,
    config: BridgeConfig,
    state: BridgeState,
    stats: BridgeStats,
    consecutive_failures: u32,
}

impl<S: SubscriptionSource, K: RelaySink> Bridge<S, K> {
    /// Assemble a bridge from already-open endpoints.
    pub const fn new(
        descriptor: ConnectionDescriptor,
        source: S,
        sink: K,
        config: BridgeConfig,
    ) -> Self {
        Self {
            descriptor,
            source,
            sink,
            config,
            state: BridgeState::Connecting,
            stats: BridgeStats {
                received: 0,
                forwarded: 0,
                dropped_decode: 0,
                dropped_sink: 0,
            },
            consecutive_failures: 0,
        }
    }

    /// Open the hub side, then the IOPub side.
    ///
    /// Either failure is fatal and maps to its own [`StartupError`]. If the
    /// subscription cannot be opened the already-open sink is closed.
    pub async fn connect<FK, FS>(
        descriptor: ConnectionDescriptor,
        config: BridgeConfig,
        open_sink: FK,
        open_source: FS,
    ) -> Result<Self, StartupError>
    where
        FK: Future<Output = Result<K, SinkError>>,
        FS: Future<Output = Result<S, SourceError>>,
    {
        let mut sink = open_sink.await.map_err(StartupError::HubConnect)?;
        let source = match open_source.await {
            Ok(source) => source,
            Err(e) => {
                sink.close().await;
                return Err(StartupError::Subscribe(e));
            }
        };
        Ok(Self::new(descriptor, source, sink, config))
    }

    pub const fn state(&self) -> BridgeState {
        self.state
    }

    pub const fn stats(&self) -> BridgeStats {
        self.stats
    }

    /// Relay until the source closes or the sink keeps failing.
    pub async fn run(self) -> BridgeReport {
        self.run_until(std::future::pending()).await
    }

    /// Relay until the source closes, the sink keeps failing, or `shutdown`
    /// completes. Shutdown is only observed while waiting for a frame; a
    /// frame already received is forwarded first.
    pub async fn run_until<F>(mut self, shutdown: F) -> BridgeReport
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        self.set_state(BridgeState::Streaming);
        info!(
            iopub = %self.descriptor.iopub_address(),
            kernel = self.descriptor.kernel_name().unwrap_or("unknown"),
            signed = self.descriptor.signer().is_some(),
            "Bridge streaming"
        );

        let reason = loop {
            let next = tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!("Shutdown requested");
                    break ShutdownReason::Signal;
                }
                next = self.source.next() => next,
            };

            let frame = match next {
                Ok(frame) => frame,
                Err(SourceError::Closed) => {
                    info!("IOPub channel closed");
                    break ShutdownReason::SourceClosed;
                }
                Err(SourceError::Io(e)) => {
                    error!(error = %e, "IOPub socket failed");
                    break ShutdownReason::SourceFailed(e);
                }
            };

            if let Some(reason) = self.forward(&frame).await {
                break reason;
            }
        };

        self.close(reason).await
    }

    /// Decode, encode and send one frame. Returns a shutdown reason when the
    /// failure budget is exhausted.
    ///
    /// Taking a frame returns a degraded bridge to `Streaming`; the failure
    /// count only resets on a successful send.
    async fn forward(&mut self, frame: &RawFrame) -> Option<ShutdownReason> {
        self.stats.received += 1;
        self.set_state(BridgeState::Streaming);

        let notification = match wire::decode(frame, &self.descriptor) {
            Ok(notification) => notification,
            Err(e) => {
                self.stats.dropped_decode += 1;
                warn!(error = %e, parts = frame.len(), "Dropping IOPub frame");
                return None;
            }
        };
        let msg_type = notification.msg_type();

        let document = match notification.to_document() {
            Ok(document) => document,
            Err(e) => {
                self.stats.dropped_decode += 1;
                warn!(error = %e, msg_type, "Dropping unencodable notification");
                return None;
            }
        };

        match self.sink.send(&document).await {
            Ok(()) => {
                self.stats.forwarded += 1;
                self.consecutive_failures = 0;
                trace!(msg_type, bytes = document.len(), "Forwarded notification");
            }
            Err(e) if !e.is_connection_failure() => {
                self.stats.dropped_sink += 1;
                warn!(error = %e, msg_type, "Dropping notification the hub cannot accept");
            }
            Err(e) => {
                self.stats.dropped_sink += 1;
                self.consecutive_failures += 1;
                self.set_state(BridgeState::Degraded);
                let max = self.config.max_consecutive_failures.max(1);
                warn!(
                    error = %e,
                    msg_type,
                    consecutive_failures = self.consecutive_failures,
                    max,
                    "Hub write failed, notification dropped"
                );
                if self.consecutive_failures >= max {
                    error!(
                        failures = self.consecutive_failures,
                        "Hub writes keep failing, closing bridge"
                    );
                    return Some(ShutdownReason::SustainedSinkFailure {
                        failures: self.consecutive_failures,
                    });
                }
            }
        }
        None
    }

    async fn close(mut self, reason: ShutdownReason) -> BridgeReport {
        self.set_state(BridgeState::Closed);
        self.sink.close().await;
        drop(self.source);

        info!(
            reason = ?reason,
            received = self.stats.received,
            forwarded = self.stats.forwarded,
            dropped_decode = self.stats.dropped_decode,
            dropped_sink = self.stats.dropped_sink,
            "Bridge closed"
        );
        BridgeReport {
            reason,
            stats: self.stats,
        }
    }

    fn set_state(&mut self, next: BridgeState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "Bridge state changed");
            self.state = next;
        }
    }
}

#[cfg(test)]
#[path = "relay_tests.rs"]
mod tests;
