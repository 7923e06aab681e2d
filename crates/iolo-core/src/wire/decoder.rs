//! IOPub frame decoder.
//!
//! Tolerant reader: unknown header fields are preserved, metadata and content
//! are passed through as whatever JSON the kernel sent. Only the framing, the
//! signature, and the header object are strictly checked.

use serde_json::Value;
use tracing::trace;

use super::frame::RawFrame;
use super::types::{Header, Notification};
use crate::connection::ConnectionDescriptor;

/// Per-frame decode failures. Never fatal for the bridge.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("signature mismatch")]
    SignatureMismatch,

    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

/// Decode one raw IOPub delivery, verifying its signature against the
/// descriptor's key.
pub fn decode(
    frame: &RawFrame,
    descriptor: &ConnectionDescriptor,
) -> Result<Notification, DecodeError> {
    let delimiter = frame
        .delimiter_index()
        .ok_or_else(|| DecodeError::MalformedPayload("missing <IDS|MSG> delimiter".into()))?;
    let (identities, rest) = frame.parts().split_at(delimiter);

    let [_, signature, header, parent_header, metadata, content, buffers @ ..] = rest else {
        return Err(DecodeError::MalformedPayload(format!(
            "expected signature and 4 payload parts after delimiter, got {}",
            rest.len().saturating_sub(1)
        )));
    };

    trace!(
        identities = identities.len(),
        buffers = buffers.len(),
        "Split IOPub frame"
    );

    if let Some(signer) = descriptor.signer() {
        let signature =
            std::str::from_utf8(signature).map_err(|_| DecodeError::SignatureMismatch)?;
        let signed: [&[u8]; 4] = [header, parent_header, metadata, content];
        if !signer.verify(&signed, signature) {
            return Err(DecodeError::SignatureMismatch);
        }
    }

    let header = match parse_part("header", header)? {
        Value::Object(object) => Header::from_object(object),
        other => return Err(not_an_object("header", &other)),
    };
    if header.msg_type.is_empty() {
        return Err(DecodeError::MalformedPayload(
            "header has no msg_type".into(),
        ));
    }

    let parent_header = match parse_part("parent_header", parent_header)? {
        Value::Object(object) if object.is_empty() => None,
        Value::Object(object) => Some(Header::from_object(object)),
        other => return Err(not_an_object("parent_header", &other)),
    };

    let metadata = parse_part("metadata", metadata)?;
    let content = parse_part("content", content)?;

    Ok(Notification {
        header,
        parent_header,
        metadata,
        content,
        buffers: buffers.to_vec(),
    })
}

fn parse_part(name: &str, bytes: &[u8]) -> Result<Value, DecodeError> {
    serde_json::from_slice(bytes)
        .map_err(|e| DecodeError::MalformedPayload(format!("{name} is not valid JSON: {e}")))
}

fn not_an_object(name: &str, value: &Value) -> DecodeError {
    let kind = match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    };
    DecodeError::MalformedPayload(format!("{name} must be an object, got {kind}"))
}
