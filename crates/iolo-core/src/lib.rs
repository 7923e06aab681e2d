//! `iolo` Core Library
//!
//! Shared functionality for the IOPub bridge:
//! - Kernel connection file parsing
//! - Jupyter wire protocol decoding and message signing
//! - Runtime directory resolution for connection files
//! - Common error types

pub mod connection;
pub mod error;
pub mod runtime;
pub mod signature;
pub mod tracing_init;
pub mod wire;

pub use connection::{Channel, ConnectionDescriptor, ConnectionFileError, Transport};
pub use error::{Error, Result};
pub use signature::{SignatureScheme, Signer};
pub use wire::{DecodeError, Header, Notification, RawFrame};
