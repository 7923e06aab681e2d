//! HMAC message signing for the Jupyter wire protocol.
//!
//! A signed frame carries the hex digest of the four JSON payload parts
//! (header, parent header, metadata, content), concatenated in order with
//! no separators, keyed with the connection file's `key`.

use std::fmt;
use std::str::FromStr;

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};

/// Supported `signature_scheme` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    HmacSha256,
    HmacSha512,
}

impl SignatureScheme {
    /// Scheme name as written in connection files.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HmacSha256 => "hmac-sha256",
            Self::HmacSha512 => "hmac-sha512",
        }
    }
}

impl fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureScheme {
    type Err = UnsupportedScheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("hmac-sha256") {
            Ok(Self::HmacSha256)
        } else if s.eq_ignore_ascii_case("hmac-sha512") {
            Ok(Self::HmacSha512)
        } else {
            Err(UnsupportedScheme(s.to_string()))
        }
    }
}

/// Error returned for a `signature_scheme` this crate cannot verify.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported signature scheme: {0:?}")]
pub struct UnsupportedScheme(pub String);

/// Keyed signer/verifier for wire frames.
#[derive(Clone)]
pub struct Signer {
    scheme: SignatureScheme,
    key: Vec<u8>,
}

impl Signer {
    pub fn new(scheme: SignatureScheme, key: impl Into<Vec<u8>>) -> Self {
        Self {
            scheme,
            key: key.into(),
        }
    }

    pub const fn scheme(&self) -> SignatureScheme {
        self.scheme
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Compute the lowercase hex signature over `parts`.
    pub fn sign(&self, parts: &[&[u8]]) -> String {
        let digest = match self.scheme {
            SignatureScheme::HmacSha256 => compute::<Hmac<Sha256>>(&self.key, parts),
            SignatureScheme::HmacSha512 => compute::<Hmac<Sha512>>(&self.key, parts),
        };
        hex::encode(digest)
    }

    /// Check a received hex signature against `parts`.
    ///
    /// Hex case is ignored. The digest comparison is constant-time.
    pub fn verify(&self, parts: &[&[u8]], signature: &str) -> bool {
        let Ok(received) = hex::decode(signature) else {
            return false;
        };
        match self.scheme {
            SignatureScheme::HmacSha256 => verify::<Hmac<Sha256>>(&self.key, parts, &received),
            SignatureScheme::HmacSha512 => verify::<Hmac<Sha512>>(&self.key, parts, &received),
        }
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("scheme", &self.scheme)
            .field("key", &"<redacted>")
            .finish()
    }
}

fn keyed<M: Mac + KeyInit>(key: &[u8], parts: &[&[u8]]) -> Option<M> {
    // HMAC accepts keys of any length; this only fails for fixed-size MACs.
    let mut mac = <M as Mac>::new_from_slice(key).ok()?;
    for part in parts {
        mac.update(part);
    }
    Some(mac)
}

fn compute<M: Mac + KeyInit>(key: &[u8], parts: &[&[u8]]) -> Vec<u8> {
    keyed::<M>(key, parts)
        .map(|mac| mac.finalize().into_bytes().to_vec())
        .unwrap_or_default()
}

fn verify<M: Mac + KeyInit>(key: &[u8], parts: &[&[u8]], received: &[u8]) -> bool {
    keyed::<M>(key, parts).is_some_and(|mac| mac.verify_slice(received).is_ok())
}
