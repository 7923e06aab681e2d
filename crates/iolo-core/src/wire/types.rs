//! Decoded IOPub notification types.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::Result;

/// Message header (also used for the parent header).
///
/// Well-known string fields are lifted out; anything else the kernel sends
/// is kept in `extra` and serialized back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Header {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg_id: Option<String>,
    pub msg_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Header {
    /// Build a header from a JSON object. Fields of unexpected type stay in
    /// `extra`; a missing `msg_type` yields an empty string.
    pub fn from_object(mut object: Map<String, Value>) -> Self {
        let mut take = |name: &str| match object.get(name) {
            Some(Value::String(_)) => match object.remove(name) {
                Some(Value::String(s)) => Some(s),
                _ => None,
            },
            _ => None,
        };

        let msg_id = take("msg_id");
        let msg_type = take("msg_type").unwrap_or_default();
        let session = take("session");
        let username = take("username");
        let date = take("date");
        let version = take("version");

        Self {
            msg_id,
            msg_type,
            session,
            username,
            date,
            version,
            extra: object,
        }
    }

    /// Minimal header carrying only a message type.
    pub fn with_type(msg_type: impl Into<String>) -> Self {
        Self {
            msg_type: msg_type.into(),
            ..Self::default()
        }
    }
}

/// One decoded IOPub delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub header: Header,
    /// `None` when the kernel sent an empty parent header.
    pub parent_header: Option<Header>,
    pub metadata: Value,
    pub content: Value,
    pub buffers: Vec<Vec<u8>>,
}

impl Notification {
    pub fn msg_type(&self) -> &str {
        &self.header.msg_type
    }

    /// Encode as the JSON document relayed to the hub.
    ///
    /// ```json
    /// {"header":{..},"parent_header":{..},"metadata":{..},"content":{..},"buffers":["<base64>"]}
    /// ```
    pub fn to_document(&self) -> Result<String> {
        let buffers: Vec<String> = self.buffers.iter().map(|b| STANDARD.encode(b)).collect();
        let document = Document {
            header: &self.header,
            parent_header: ParentHeader(self.parent_header.as_ref()),
            metadata: &self.metadata,
            content: &self.content,
            buffers,
        };
        Ok(serde_json::to_string(&document)?)
    }
}

#[derive(Serialize)]
struct Document<'a> {
    header: &'a Header,
    parent_header: ParentHeader<'a>,
    metadata: &'a Value,
    content: &'a Value,
    buffers: Vec<String>,
}

/// Serializes an absent parent header as `{}`, as the protocol does.
struct ParentHeader<'a>(Option<&'a Header>);

impl Serialize for ParentHeader<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.0 {
            Some(header) => header.serialize(serializer),
            None => serializer.serialize_map(Some(0))?.end(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn header_lifts_known_fields_and_keeps_extras() {
        let header = Header::from_object(object(json!({
            "msg_id": "m1",
            "msg_type": "execute_result",
            "session": "s1",
            "username": "kernel",
            "date": "2024-01-01T00:00:00.000000Z",
            "version": "5.3",
            "subshell_id": null
        })));
        assert_eq!(header.msg_id.as_deref(), Some("m1"));
        assert_eq!(header.msg_type, "execute_result");
        assert_eq!(header.version.as_deref(), Some("5.3"));
        assert_eq!(header.extra.get("subshell_id"), Some(&Value::Null));
        assert_eq!(header.extra.len(), 1);
    }

    #[test]
    fn header_keeps_unexpected_types_in_extra() {
        let header = Header::from_object(object(json!({"msg_type": "status", "version": 5})));
        assert!(header.version.is_none());
        assert_eq!(header.extra.get("version"), Some(&json!(5)));

        let back = serde_json::to_value(&header).unwrap();
        assert_eq!(back, json!({"msg_type": "status", "version": 5}));
    }

    #[test]
    fn document_shape() {
        let notification = Notification {
            header: Header::with_type("display_data"),
            parent_header: None,
            metadata: json!({}),
            content: json!({"data": {"text/plain": "1"}}),
            buffers: vec![b"hi".to_vec()],
        };
        let doc: Value = serde_json::from_str(&notification.to_document().unwrap()).unwrap();
        assert_eq!(
            doc,
            json!({
                "header": {"msg_type": "display_data"},
                "parent_header": {},
                "metadata": {},
                "content": {"data": {"text/plain": "1"}},
                "buffers": ["aGk="]
            })
        );
    }

    #[test]
    fn document_includes_parent_header() {
        let mut parent = Header::with_type("execute_request");
        parent.msg_id = Some("req-1".into());
        let notification = Notification {
            header: Header::with_type("status"),
            parent_header: Some(parent),
            metadata: Value::Null,
            content: json!({"execution_state": "busy"}),
            buffers: Vec::new(),
        };
        let doc: Value = serde_json::from_str(&notification.to_document().unwrap()).unwrap();
        assert_eq!(doc["parent_header"]["msg_id"], "req-1");
        assert_eq!(doc["buffers"], json!([]));
        assert_eq!(notification.msg_type(), "status");
    }
}
