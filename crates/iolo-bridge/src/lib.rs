//! iolo bridge library
//!
//! Relays a kernel's IOPub notifications to a hub:
//! - Subscription source over the kernel's ZeroMQ IOPub socket
//! - Relay sinks (WebSocket hub connection, NDJSON on stdout)
//! - The bridge loop and its failure policy
//! - Startup errors and process exit statuses

pub mod bridge;
pub mod config;
pub mod exit;
pub mod sink;
pub mod source;

pub use bridge::{Bridge, BridgeReport, BridgeState, BridgeStats, ShutdownReason};
pub use config::{BridgeConfig, ReconnectPolicy, SinkConfig};
pub use exit::{ExitStatus, StartupError};
