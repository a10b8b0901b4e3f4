//! The file-metadata request body (`cmd 0x1B`) and its chunk-size ACK.

use crate::crc16::crc16_xmodem;
use crate::errors::{ProtocolError, Result};

/// Maximum length of the ASCII name embedded in a metadata body.
pub const MAX_NAME_LEN: usize = 11;

/// Default chunk size, used when the device's suggested size is absent or
/// out of the accepted range `(0, 4096]`.
pub const DEFAULT_CHUNK_SIZE: u16 = 490;

/// The `cmd 0x1B` metadata request body: size, whole-file CRC, two random
/// bytes, and a short ASCII name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataBody {
    /// Running session sequence byte at the time of this request.
    pub seq: u8,
    /// Total payload size in bytes.
    pub size: u32,
    /// CRC-16/XMODEM of the entire payload.
    pub crc: u16,
    /// Two bytes of randomness the device expects but does not validate
    /// against anything this workspace can observe.
    pub rand: [u8; 2],
    /// ASCII file name, at most [`MAX_NAME_LEN`] bytes.
    pub name: String,
}

impl MetadataBody {
    /// Build the metadata body for `payload`, computing its CRC directly
    /// rather than requiring the caller to precompute it.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidBody`] if `name` exceeds
    /// [`MAX_NAME_LEN`] ASCII bytes.
    pub fn new(seq: u8, payload: &[u8], rand: [u8; 2], name: &str) -> Result<Self> {
        if name.len() > MAX_NAME_LEN || !name.is_ascii() {
            return Err(ProtocolError::InvalidBody {
                what: "metadata name",
                expected: MAX_NAME_LEN,
                actual: name.len(),
            });
        }

        Ok(Self {
            seq,
            #[allow(clippy::cast_possible_truncation)]
            size: payload.len() as u32,
            crc: crc16_xmodem(payload),
            rand,
            name: name.to_owned(),
        })
    }

    /// Serialize to the wire layout: `[seq | size_b3..b0 | crc_hi crc_lo |
    /// rand rand | name[0..N] | 0x00]`.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(9 + self.name.len() + 1);
        out.push(self.seq);
        out.extend_from_slice(&self.size.to_be_bytes());
        out.extend_from_slice(&self.crc.to_be_bytes());
        out.extend_from_slice(&self.rand);
        out.extend_from_slice(self.name.as_bytes());
        out.push(0x00);
        out
    }
}

/// Pick the chunk size to adopt from the device's metadata-ACK suggestion,
/// falling back to [`DEFAULT_CHUNK_SIZE`] outside the accepted range.
#[must_use]
pub fn resolve_chunk_size(suggested: u16) -> u16 {
    if suggested > 0 && suggested <= 4096 { suggested } else { DEFAULT_CHUNK_SIZE }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_in_wire_order() {
        let body = MetadataBody::new(0x05, &[0u8; 15_647], [0x11, 0x22], "badge").unwrap();
        let bytes = body.to_bytes();
        assert_eq!(bytes[0], 0x05);
        assert_eq!(u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]), 15_647);
        assert_eq!([bytes[7], bytes[8]], [0x11, 0x22]);
        assert_eq!(&bytes[9..9 + 5], b"badge");
        assert_eq!(bytes[9 + 5], 0x00);
    }

    #[test]
    fn rejects_oversize_name() {
        let result = MetadataBody::new(0, &[], [0, 0], "this-name-is-too-long");
        assert!(result.is_err());
    }

    #[test]
    fn resolve_chunk_size_accepts_in_range_suggestion() {
        assert_eq!(resolve_chunk_size(1024), 1024);
        assert_eq!(resolve_chunk_size(4096), 4096);
    }

    #[test]
    fn resolve_chunk_size_falls_back_outside_range() {
        assert_eq!(resolve_chunk_size(0), DEFAULT_CHUNK_SIZE);
        assert_eq!(resolve_chunk_size(5000), DEFAULT_CHUNK_SIZE);
    }
}
