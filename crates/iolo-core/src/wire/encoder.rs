//! Frame construction, the inverse of [`decode`](super::decode).
//!
//! The bridge itself only reads; these helpers exist for publishers in
//! tests and tooling that need correctly signed frames.

use serde_json::{Map, Value};

use super::frame::{DELIMITER, RawFrame};
use super::types::Notification;
use crate::connection::ConnectionDescriptor;
use crate::error::Result;

/// Assemble a frame from raw JSON payload parts, signing them with the
/// descriptor's key (an empty signature when the key is empty).
pub fn signed_frame(
    descriptor: &ConnectionDescriptor,
    identities: &[Vec<u8>],
    payload: [&[u8]; 4],
    buffers: Vec<Vec<u8>>,
) -> RawFrame {
    let signature = descriptor
        .signer()
        .map(|signer| signer.sign(&payload))
        .unwrap_or_default();

    let mut parts = Vec::with_capacity(identities.len() + 6 + buffers.len());
    parts.extend(identities.iter().cloned());
    parts.push(DELIMITER.to_vec());
    parts.push(signature.into_bytes());
    parts.extend(payload.iter().map(|part| part.to_vec()));
    parts.extend(buffers);
    RawFrame::new(parts)
}

/// Serialize a notification back into a signed wire frame.
pub fn encode(
    notification: &Notification,
    descriptor: &ConnectionDescriptor,
    identities: &[Vec<u8>],
) -> Result<RawFrame> {
    let header = serde_json::to_vec(&notification.header)?;
    let parent_header = match &notification.parent_header {
        Some(parent) => serde_json::to_vec(parent)?,
        None => serde_json::to_vec(&Value::Object(Map::new()))?,
    };
    let metadata = serde_json::to_vec(&notification.metadata)?;
    let content = serde_json::to_vec(&notification.content)?;

    Ok(signed_frame(
        descriptor,
        identities,
        [&header, &parent_header, &metadata, &content],
        notification.buffers.clone(),
    ))
}
