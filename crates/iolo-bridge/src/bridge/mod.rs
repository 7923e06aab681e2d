//! Bridge loop: IOPub frames in, hub documents out.
//!
//! Data flow:
//! ```text
//! SubscriptionSource::next → wire::decode → Notification::to_document → RelaySink::send
//! ```
//!
//! The loop is sequential, so documents reach the sink in the order frames
//! arrived. Undecodable frames are skipped; sink failures are tolerated up
//! to a bounded number in a row.

mod relay;
mod state;

pub use relay::Bridge;
pub use state::{BridgeReport, BridgeState, BridgeStats, ShutdownReason};
