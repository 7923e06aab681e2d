//! Bridge and hub connection configuration.

use std::time::Duration;

/// Default hub endpoint.
pub const DEFAULT_HUB_URL: &str = "ws://127.0.0.1:8765/iopub";

/// Failure policy for the bridge loop.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Consecutive sink write failures tolerated before the bridge closes.
    pub max_consecutive_failures: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 3,
        }
    }
}

/// Configuration for the outbound hub connection.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Largest document the hub accepts in one message.
    pub max_message_bytes: usize,
    /// Upper bound on a single outbound write.
    pub send_timeout: Duration,
    /// Upper bound on dialing the hub.
    pub connect_timeout: Duration,
    /// Delay policy for re-dialing after a broken connection.
    pub reconnect: ReconnectPolicy,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            max_message_bytes: 16 * 1024 * 1024, // 16 MiB
            send_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// Exponential backoff reconnection policy.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Initial delay before first reconnect attempt.
    pub initial_delay: Duration,
    /// Maximum delay between reconnect attempts.
    pub max_delay: Duration,
    /// Multiplier applied to delay after each failed attempt.
    pub multiplier: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl ReconnectPolicy {
    /// No delay between attempts.
    pub const fn immediate() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_possible_wrap
    )]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.initial_delay.as_millis() as f64;
        let delay_ms = base_ms * self.multiplier.powi(attempt.min(64) as i32);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms as u64)
    }
}
