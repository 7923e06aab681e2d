//! Bridge lifecycle states and exit bookkeeping.

use std::fmt;

use crate::exit::ExitStatus;

/// Lifecycle of a bridge.
///
/// `Connecting → Streaming → (Degraded ⇄ Streaming) → Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Connecting,
    Streaming,
    /// At least the most recent sink write failed.
    Degraded,
    Closed,
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Streaming => "streaming",
            Self::Degraded => "degraded",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Why the bridge reached `Closed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The IOPub channel ended cleanly.
    SourceClosed,
    /// The IOPub socket failed.
    SourceFailed(String),
    /// The sink failed this many times in a row.
    SustainedSinkFailure { failures: u32 },
    /// A process signal asked the bridge to stop.
    Signal,
}

impl ShutdownReason {
    pub const fn exit_status(&self) -> ExitStatus {
        match self {
            Self::SourceClosed => ExitStatus::Success,
            Self::SourceFailed(_) => ExitStatus::InboundFailure,
            Self::SustainedSinkFailure { .. } => ExitStatus::SustainedOutboundFailure,
            Self::Signal => ExitStatus::Interrupted,
        }
    }
}

/// Per-run counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    pub received: u64,
    pub forwarded: u64,
    pub dropped_decode: u64,
    pub dropped_sink: u64,
}

/// Outcome of [`Bridge::run`](super::Bridge::run).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeReport {
    pub reason: ShutdownReason,
    pub stats: BridgeStats,
}

impl BridgeReport {
    pub const fn exit_status(&self) -> ExitStatus {
        self.reason.exit_status()
    }
}
