//! Jupyter wire protocol for the IOPub broadcast channel.
//!
//! A delivery is a multipart message:
//!
//! ```text
//! [identities...] <IDS|MSG> signature header parent_header metadata content [buffers...]
//! ```
//!
//! This module splits such frames, verifies their signature and parses the
//! payload into a [`Notification`], tolerating unknown fields.

mod decoder;
mod encoder;
mod frame;
mod types;

pub use decoder::{DecodeError, decode};
pub use encoder::{encode, signed_frame};
pub use frame::{DELIMITER, RawFrame};
pub use types::{Header, Notification};
