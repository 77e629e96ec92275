use crate::{
    codec::checksum::{Checksum, hex_decode, hex_encode},
    foundation::error::{PixcacheError, PixcacheResult},
};

/// Largest accepted label payload, in ISO-8859-1 bytes.
pub const MAX_PAYLOAD_BYTES: usize = 256;

/// Text of a label request in its wire form: ISO-8859-1 bytes.
///
/// Labels travel hex-encoded in the query string, and their checksum is computed over these bytes,
/// so the single-byte form is the canonical one. Rendering uses [`CharacterPayload::text`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CharacterPayload {
    latin1: Vec<u8>,
}

impl CharacterPayload {
    /// Transcode caller text to ISO-8859-1.
    ///
    /// Characters outside ISO-8859-1 cannot be carried and are rejected.
    pub fn from_text(text: &str) -> PixcacheResult<Self> {
        let mut latin1 = Vec::with_capacity(text.len());
        for ch in text.chars() {
            let code = u32::from(ch);
            let byte = u8::try_from(code).map_err(|_| {
                PixcacheError::bad_request(format!(
                    "character U+{code:04X} is not representable in ISO-8859-1"
                ))
            })?;
            latin1.push(byte);
        }
        if latin1.len() > MAX_PAYLOAD_BYTES {
            return Err(PixcacheError::bad_request(format!(
                "label text exceeds {MAX_PAYLOAD_BYTES} bytes"
            )));
        }
        Ok(Self { latin1 })
    }

    /// Decode the hex query value of an incoming request.
    pub fn from_hex(hex: &str) -> PixcacheResult<Self> {
        let latin1 = hex_decode(hex)?;
        if latin1.len() > MAX_PAYLOAD_BYTES {
            return Err(PixcacheError::not_found(format!(
                "character data exceeds {MAX_PAYLOAD_BYTES} bytes"
            )));
        }
        Ok(Self { latin1 })
    }

    /// Raw ISO-8859-1 bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.latin1
    }

    /// Hex form used in the `t` query parameter.
    pub fn to_hex(&self) -> String {
        hex_encode(&self.latin1)
    }

    /// Text handed to label presets (ISO-8859-1 widened to Unicode).
    pub fn text(&self) -> String {
        self.latin1.iter().map(|&b| char::from(b)).collect()
    }

    /// Checksum binding this payload to a preset and format. Labels carry no secret.
    pub fn checksum(&self, preset: &str, format: &str) -> Checksum {
        Checksum::compute(
            &[self.latin1.as_slice(), preset.as_bytes(), format.as_bytes()],
            None,
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/codec/payload.rs"]
mod tests;
