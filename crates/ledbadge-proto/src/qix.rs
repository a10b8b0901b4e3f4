//! 9E-framed packets: the sideband control-channel framing.
//!
//! Wire layout:
//! `9E | checksum(1) | flag(1) | cmd(1) | length(LE16) | payload[length]`
//!
//! The checksum is an additive checksum (sum mod 256) over every byte
//! following the checksum byte itself (flag, cmd, length, payload).

use bytes::{BufMut, Bytes};
use modular_bitfield::prelude::*;

use crate::errors::{ProtocolError, Result};

/// `9E` magic byte.
pub const MAGIC: u8 = 0x9E;

/// Minimum valid 9E frame length: magic + checksum + flag + cmd + 2-byte
/// length, zero-length payload.
pub const MIN_FRAME_LEN: usize = 6;

/// The 9E flag byte, modeled as sub-byte bitfields rather than manual
/// shift/mask arithmetic.
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QixFlags {
    /// Set when this frame is a request originating from the host.
    pub is_request: bool,
    /// Rolling 4-bit serial number correlating requests with responses.
    pub serial_number: B4,
    /// Set when the payload spans more than one 9E frame (unused by any
    /// opcode this workspace emits, but preserved for decode fidelity).
    pub is_long: bool,
    /// Set when the sender expects an explicit response frame.
    pub need_response: bool,
    /// Set when this frame is itself a response.
    pub is_response: bool,
}

impl QixFlags {
    /// Build the flags byte for a simple one-shot request that does not
    /// expect a reply (used by the best-effort bootstrap writes).
    #[must_use]
    pub fn fire_and_forget(serial_number: u8) -> Self {
        Self::new().with_is_request(true).with_serial_number(serial_number).with_need_response(false)
    }

    /// Build the flags byte for a request expecting a response.
    #[must_use]
    pub fn request(serial_number: u8) -> Self {
        Self::new().with_is_request(true).with_serial_number(serial_number).with_need_response(true)
    }
}

/// A decoded 9E frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QixFrame {
    /// Request/response/serial-number bitfield.
    pub flags: QixFlags,
    /// Opcode this frame carries.
    pub cmd: u8,
    /// Frame payload. `payload.len()` always equals the wire length field.
    pub payload: Bytes,
}

impl QixFrame {
    /// Construct a frame. The wire length field is derived from
    /// `payload.len()` at encode time.
    #[must_use]
    pub fn new(flags: QixFlags, cmd: u8, payload: impl Into<Bytes>) -> Self {
        Self { flags, cmd, payload: payload.into() }
    }

    /// Additive checksum over `flag, cmd, length(LE16), payload` — every
    /// byte that follows the checksum byte on the wire.
    fn checksum_over(flags: u8, cmd: u8, len_le: [u8; 2], payload: &[u8]) -> u8 {
        let mut sum: u32 = u32::from(flags) + u32::from(cmd) + u32::from(len_le[0]) + u32::from(len_le[1]);
        for &b in payload {
            sum += u32::from(b);
        }
        (sum % 256) as u8
    }

    /// Encode this frame onto the wire.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::PayloadTooLarge`] if the payload exceeds
    /// `u16::MAX`.
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        if self.payload.len() > usize::from(u16::MAX) {
            return Err(ProtocolError::PayloadTooLarge {
                size: self.payload.len(),
                max: usize::from(u16::MAX),
            });
        }

        let flags_byte = self.flags.into_bytes()[0];
        #[allow(clippy::cast_possible_truncation)] // bounds-checked above
        let len_le = (self.payload.len() as u16).to_le_bytes();
        let checksum = Self::checksum_over(flags_byte, self.cmd, len_le, &self.payload);

        dst.put_u8(MAGIC);
        dst.put_u8(checksum);
        dst.put_u8(flags_byte);
        dst.put_u8(self.cmd);
        dst.put_slice(&len_le);
        dst.put_slice(&self.payload);

        Ok(())
    }

    /// Encode this frame into a fresh buffer, returning the wire bytes.
    ///
    /// # Errors
    ///
    /// See [`QixFrame::encode`].
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = Vec::with_capacity(MIN_FRAME_LEN + self.payload.len());
        self.encode(&mut buf)?;
        Ok(Bytes::from(buf))
    }

    /// Decode one 9E frame from `bytes`.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::FrameTooShort`] if shorter than [`MIN_FRAME_LEN`]
    ///   or than the declared payload length demands.
    /// - [`ProtocolError::InvalidQixMagic`] if the magic byte isn't `9E`.
    /// - [`ProtocolError::ChecksumMismatch`] if the additive checksum
    ///   doesn't match.
    /// - [`ProtocolError::QixLengthMismatch`] if trailing bytes remain
    ///   after the declared payload.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MIN_FRAME_LEN {
            return Err(ProtocolError::FrameTooShort { expected: MIN_FRAME_LEN, actual: bytes.len() });
        }

        if bytes[0] != MAGIC {
            return Err(ProtocolError::InvalidQixMagic);
        }

        let declared_checksum = bytes[1];
        let flags_byte = bytes[2];
        let cmd = bytes[3];
        let len_le = [bytes[4], bytes[5]];
        let declared_len = u16::from_le_bytes(len_le) as usize;

        let expected_total = MIN_FRAME_LEN + declared_len;
        if bytes.len() < expected_total {
            return Err(ProtocolError::FrameTooShort { expected: expected_total, actual: bytes.len() });
        }
        if bytes.len() > expected_total {
            return Err(ProtocolError::QixLengthMismatch { declared: declared_len, actual: bytes.len() - 6 });
        }

        let payload = &bytes[6..expected_total];
        let computed_checksum = Self::checksum_over(flags_byte, cmd, len_le, payload);
        if computed_checksum != declared_checksum {
            return Err(ProtocolError::ChecksumMismatch {
                declared: declared_checksum,
                computed: computed_checksum,
            });
        }

        let flags = QixFlags::from_bytes([flags_byte]);

        Ok(Self { flags, cmd, payload: Bytes::copy_from_slice(payload) })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn arbitrary_flags() -> impl Strategy<Value = QixFlags> {
        (any::<bool>(), 0u8..16, any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
            |(is_request, serial, is_long, need_response, is_response)| {
                QixFlags::new()
                    .with_is_request(is_request)
                    .with_serial_number(serial)
                    .with_is_long(is_long)
                    .with_need_response(need_response)
                    .with_is_response(is_response)
            },
        )
    }

    proptest! {
        #[test]
        fn round_trip(
            flags in arbitrary_flags(),
            cmd in any::<u8>(),
            payload in prop::collection::vec(any::<u8>(), 0..256),
        ) {
            let frame = QixFrame::new(flags, cmd, payload);
            let wire = frame.to_bytes().expect("encode should succeed");
            let decoded = QixFrame::decode(&wire).expect("decode should succeed");
            prop_assert_eq!(decoded, frame);
        }

        #[test]
        fn checksum_covers_bytes_after_itself(
            flags in arbitrary_flags(),
            cmd in any::<u8>(),
            payload in prop::collection::vec(any::<u8>(), 0..256),
        ) {
            let frame = QixFrame::new(flags, cmd, payload);
            let wire = frame.to_bytes().unwrap();
            let declared_checksum = wire[1];
            let computed: u32 = wire[2..].iter().map(|&b| u32::from(b)).sum();
            prop_assert_eq!(declared_checksum, (computed % 256) as u8);
        }
    }

    #[test]
    fn rejects_bad_magic() {
        let frame = QixFrame::new(QixFlags::request(1), 0xC6, Vec::new());
        let mut wire = frame.to_bytes().unwrap().to_vec();
        wire[0] = 0x00;
        assert_eq!(QixFrame::decode(&wire), Err(ProtocolError::InvalidQixMagic));
    }

    #[test]
    fn rejects_corrupted_checksum() {
        let frame = QixFrame::new(QixFlags::request(1), 0xC6, vec![0x01]);
        let mut wire = frame.to_bytes().unwrap().to_vec();
        wire[1] ^= 0xFF;
        assert!(matches!(QixFrame::decode(&wire), Err(ProtocolError::ChecksumMismatch { .. })));
    }

    #[test]
    fn fixed_bootstrap_write_time_set_shape() {
        // "Time set" template from the bootstrap write table: flag=0x08
        // cmd=0x02, a 7-byte body of yr_lo yr_hi mo day 00 hr min. The
        // table's published checksum byte depends on the device's exact
        // checksum algorithm, which this workspace cannot independently
        // verify, so this test only pins the structural shape (magic,
        // flag, cmd, length) and recomputes the checksum rather than
        // asserting the literal published byte.
        let flags = QixFlags::from_bytes([0x08]);
        let payload = vec![0xE8, 0x07, 0x06, 0x02, 0x00, 0x0C, 0x22];
        let frame = QixFrame::new(flags, 0x02, payload.clone());
        let wire = frame.to_bytes().unwrap();
        assert_eq!(wire[0], MAGIC);
        assert_eq!(wire[2], 0x08);
        assert_eq!(wire[3], 0x02);
        assert_eq!(u16::from_le_bytes([wire[4], wire[5]]), payload.len() as u16);
        let decoded = QixFrame::decode(&wire).unwrap();
        assert_eq!(decoded.cmd, 0x02);
        assert_eq!(&decoded.payload[..], &payload[..]);
    }
}
