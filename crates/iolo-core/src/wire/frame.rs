//! Raw multipart frames as delivered by the subscription socket.

/// Part separating routing identities from the signed payload.
pub const DELIMITER: &[u8] = b"<IDS|MSG>";

/// One pub/sub delivery: an ordered list of byte parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFrame {
    parts: Vec<Vec<u8>>,
}

impl RawFrame {
    pub const fn new(parts: Vec<Vec<u8>>) -> Self {
        Self { parts }
    }

    pub fn parts(&self) -> &[Vec<u8>] {
        &self.parts
    }

    pub fn into_parts(self) -> Vec<Vec<u8>> {
        self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Total payload size in bytes, across all parts.
    pub fn byte_len(&self) -> usize {
        self.parts.iter().map(Vec::len).sum()
    }

    /// Position of the delimiter part, if present.
    pub fn delimiter_index(&self) -> Option<usize> {
        self.parts.iter().position(|part| part.as_slice() == DELIMITER)
    }
}

impl From<Vec<Vec<u8>>> for RawFrame {
    fn from(parts: Vec<Vec<u8>>) -> Self {
        Self::new(parts)
    }
}
