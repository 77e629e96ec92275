use std::fmt;

use md5::{Digest as _, Md5};

use crate::foundation::error::{PixcacheError, PixcacheResult};

/// Number of URL path segments a checksum is packed into.
pub const CHECKSUM_SEGMENTS: usize = 4;

const SEGMENT_LEN: usize = 8;
const CHECKSUM_LEN: usize = SEGMENT_LEN * CHECKSUM_SEGMENTS;

/// 128-bit integrity tag over a request's canonical inputs, as 32 lowercase hex characters.
///
/// This guards against callers requesting parameter combinations the server never produced a URL
/// for. It is an MD5 digest for byte compatibility with existing URLs, not an adversarial MAC.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Checksum(String);

impl Checksum {
    /// Digest the concatenation of `parts`, followed by `secret` when present.
    ///
    /// Absent inputs are simply not passed; the parts are joined without separators.
    pub fn compute<P: AsRef<[u8]>>(parts: &[P], secret: Option<&str>) -> Self {
        let mut hasher = Md5::new();
        for part in parts {
            hasher.update(part.as_ref());
        }
        if let Some(secret) = secret {
            hasher.update(secret.as_bytes());
        }
        Self(hex::encode(hasher.finalize()))
    }

    /// Parse a 32-character lowercase hex digest.
    pub fn from_hex(s: &str) -> PixcacheResult<Self> {
        if s.len() != CHECKSUM_LEN || !is_lower_hex(s) {
            return Err(PixcacheError::not_found("malformed checksum"));
        }
        Ok(Self(s.to_string()))
    }

    /// Hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Pack into path segments: each 8-character chunk reversed, chunks emitted last to first.
    pub fn to_segments(&self) -> [String; CHECKSUM_SEGMENTS] {
        let chunk = |i: usize| -> String {
            let start = (CHECKSUM_SEGMENTS - 1 - i) * SEGMENT_LEN;
            self.0[start..start + SEGMENT_LEN].chars().rev().collect()
        };
        [chunk(0), chunk(1), chunk(2), chunk(3)]
    }

    /// Exact inverse of [`Checksum::to_segments`].
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> PixcacheResult<Self> {
        if segments.len() != CHECKSUM_SEGMENTS {
            return Err(PixcacheError::not_found(format!(
                "checksum needs {CHECKSUM_SEGMENTS} segments, got {}",
                segments.len()
            )));
        }
        let mut out = String::with_capacity(CHECKSUM_LEN);
        for seg in segments.iter().rev() {
            let seg = seg.as_ref();
            if seg.len() != SEGMENT_LEN || !is_lower_hex(seg) {
                return Err(PixcacheError::not_found("malformed checksum segment"));
            }
            out.extend(seg.chars().rev());
        }
        Ok(Self(out))
    }

    /// Path form of [`Checksum::to_segments`], joined with `/`.
    pub fn to_path(&self) -> String {
        self.to_segments().join("/")
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Digest a canonical input tuple. See [`Checksum::compute`].
pub fn compute_checksum<P: AsRef<[u8]>>(parts: &[P], secret: Option<&str>) -> Checksum {
    Checksum::compute(parts, secret)
}

/// See [`Checksum::to_segments`].
pub fn encode_segments(checksum: &Checksum) -> [String; CHECKSUM_SEGMENTS] {
    checksum.to_segments()
}

/// See [`Checksum::from_segments`].
pub fn decode_segments<S: AsRef<str>>(segments: &[S]) -> PixcacheResult<Checksum> {
    Checksum::from_segments(segments)
}

/// Strict equality between a decoded checksum and one recomputed from the request inputs.
pub fn validate(candidate: &Checksum, recomputed: &Checksum) -> bool {
    candidate == recomputed
}

/// Lowercase hex of raw bytes.
pub fn hex_encode(bytes: impl AsRef<[u8]>) -> String {
    hex::encode(bytes)
}

/// Raw bytes from hex. Malformed input is a not-found condition.
pub fn hex_decode(s: &str) -> PixcacheResult<Vec<u8>> {
    hex::decode(s).map_err(|e| PixcacheError::not_found(format!("invalid hex: {e}")))
}

/// Smuggle an opaque token into a path segment: hex-encode, then reverse the characters.
pub fn encode_token(token: &str) -> String {
    hex_encode(token).chars().rev().collect()
}

/// Inverse of [`encode_token`].
pub fn decode_token(segment: &str) -> PixcacheResult<String> {
    let hex: String = segment.chars().rev().collect();
    let bytes = hex_decode(&hex)?;
    String::from_utf8(bytes).map_err(|_| PixcacheError::not_found("token is not utf-8"))
}

fn is_lower_hex(s: &str) -> bool {
    s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[cfg(test)]
#[path = "../../tests/unit/codec/checksum.rs"]
mod tests;
