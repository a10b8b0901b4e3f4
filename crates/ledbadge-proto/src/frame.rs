//! FE-framed packets: the primary framing used on the data channel.
//!
//! Wire layout:
//! `FE DC BA | flag(1) | cmd(1) | length(BE16) | body[length] | EF`
//!
//! # Invariants
//!
//! - `length == body.len()`, enforced on both encode and decode.
//! - `flag` is one of `0x00` (response), `0x80` (notification/data), or
//!   `0xC0` (command); unrecognized values are preserved rather than
//!   rejected, since the decoder's job is structural validity, not opcode
//!   semantics (that lives in the notification bus / session layer).

use bytes::{BufMut, Bytes};

use crate::errors::{ProtocolError, Result};

/// `FE DC BA` magic prefix.
pub const MAGIC: [u8; 3] = [0xFE, 0xDC, 0xBA];

/// `EF` terminator byte.
pub const TERMINATOR: u8 = 0xEF;

/// Minimum valid FE frame length: 3 (magic) + 1 (flag) + 1 (cmd) + 2
/// (length) + 1 (terminator), with a zero-length body.
pub const MIN_FRAME_LEN: usize = 8;

/// Maximum body length representable in the 16-bit length field.
pub const MAX_BODY_LEN: usize = u16::MAX as usize;

/// Frame flag: who is speaking and what kind of traffic this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFlag {
    /// `0x00`: a response to a host-issued command.
    Response,
    /// `0x80`: an unsolicited notification or data push from the device.
    Notification,
    /// `0xC0`: a host-issued command.
    Command,
    /// Any other byte value. Preserved verbatim; the codec does not police
    /// opcode semantics.
    Other(u8),
}

impl FrameFlag {
    /// Raw wire value for this flag.
    #[must_use]
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Response => 0x00,
            Self::Notification => 0x80,
            Self::Command => 0xC0,
            Self::Other(b) => b,
        }
    }

    /// Classify a raw flag byte.
    #[must_use]
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => Self::Response,
            0x80 => Self::Notification,
            0xC0 => Self::Command,
            other => Self::Other(other),
        }
    }
}

/// A decoded FE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Response/notification/command classification.
    pub flag: FrameFlag,
    /// Opcode this frame carries.
    pub cmd: u8,
    /// Frame body. `body.len()` always equals the wire length field.
    pub body: Bytes,
}

impl Frame {
    /// Construct a frame. The wire length field is derived from
    /// `body.len()` at encode time, so it is never possible to construct a
    /// frame with a mismatched length.
    #[must_use]
    pub fn new(flag: FrameFlag, cmd: u8, body: impl Into<Bytes>) -> Self {
        Self { flag, cmd, body: body.into() }
    }

    /// Encode this frame onto the wire.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::PayloadTooLarge`] if the body exceeds
    /// [`MAX_BODY_LEN`] (the 16-bit length field cannot represent it).
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        if self.body.len() > MAX_BODY_LEN {
            return Err(ProtocolError::PayloadTooLarge { size: self.body.len(), max: MAX_BODY_LEN });
        }

        dst.put_slice(&MAGIC);
        dst.put_u8(self.flag.to_byte());
        dst.put_u8(self.cmd);
        #[allow(clippy::cast_possible_truncation)] // bounds-checked above
        dst.put_u16(self.body.len() as u16);
        dst.put_slice(&self.body);
        dst.put_u8(TERMINATOR);

        Ok(())
    }

    /// Encode this frame into a fresh buffer, returning the wire bytes.
    ///
    /// # Errors
    ///
    /// See [`Frame::encode`].
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = Vec::with_capacity(MIN_FRAME_LEN + self.body.len());
        self.encode(&mut buf)?;
        Ok(Bytes::from(buf))
    }

    /// Decode one FE frame from `bytes`.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::FrameTooShort`] if shorter than [`MIN_FRAME_LEN`]
    ///   or than the declared body length demands.
    /// - [`ProtocolError::InvalidFeMagic`] if the magic prefix doesn't
    ///   match.
    /// - [`ProtocolError::InvalidTerminator`] if the trailing byte isn't
    ///   `0xEF`.
    /// - [`ProtocolError::LengthMismatch`] if trailing bytes remain after
    ///   the declared body (the decoder requires an exact-length buffer,
    ///   matching the notification bus delivering one payload per
    ///   callback).
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MIN_FRAME_LEN {
            return Err(ProtocolError::FrameTooShort { expected: MIN_FRAME_LEN, actual: bytes.len() });
        }

        if bytes[0..3] != MAGIC {
            return Err(ProtocolError::InvalidFeMagic);
        }

        let flag = FrameFlag::from_byte(bytes[3]);
        let cmd = bytes[4];
        let declared_len = u16::from_be_bytes([bytes[5], bytes[6]]) as usize;

        let expected_total = MIN_FRAME_LEN + declared_len;
        if bytes.len() < expected_total {
            return Err(ProtocolError::FrameTooShort { expected: expected_total, actual: bytes.len() });
        }
        if bytes.len() > expected_total {
            return Err(ProtocolError::LengthMismatch {
                declared: declared_len,
                actual: bytes.len() - MIN_FRAME_LEN,
            });
        }

        let body_end = 7 + declared_len;
        let terminator = bytes[body_end];
        if terminator != TERMINATOR {
            return Err(ProtocolError::InvalidTerminator(terminator));
        }

        let body = Bytes::copy_from_slice(&bytes[7..body_end]);

        Ok(Self { flag, cmd, body })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn arbitrary_flag() -> impl Strategy<Value = FrameFlag> {
        prop_oneof![
            Just(FrameFlag::Response),
            Just(FrameFlag::Notification),
            Just(FrameFlag::Command),
            any::<u8>().prop_filter_map("avoid canonical flags", |b| {
                (![0x00, 0x80, 0xC0].contains(&b)).then_some(FrameFlag::Other(b))
            }),
        ]
    }

    proptest! {
        #[test]
        fn round_trip(
            flag in arbitrary_flag(),
            cmd in any::<u8>(),
            body in prop::collection::vec(any::<u8>(), 0..512),
        ) {
            let frame = Frame::new(flag, cmd, body);
            let wire = frame.to_bytes().expect("encode should succeed");
            let decoded = Frame::decode(&wire).expect("decode should succeed");
            prop_assert_eq!(decoded, frame);
        }
    }

    #[test]
    fn rejects_bad_magic() {
        let mut wire = Frame::new(FrameFlag::Response, 0x06, Vec::new()).to_bytes().unwrap().to_vec();
        wire[0] = 0x00;
        assert_eq!(Frame::decode(&wire), Err(ProtocolError::InvalidFeMagic));
    }

    #[test]
    fn rejects_bad_terminator() {
        let mut wire = Frame::new(FrameFlag::Response, 0x06, vec![1, 2, 3]).to_bytes().unwrap().to_vec();
        let last = wire.len() - 1;
        wire[last] = 0x00;
        assert_eq!(Frame::decode(&wire), Err(ProtocolError::InvalidTerminator(0x00)));
    }

    #[test]
    fn rejects_length_mismatch() {
        let mut wire = Frame::new(FrameFlag::Response, 0x06, vec![1, 2, 3]).to_bytes().unwrap().to_vec();
        wire[5] = 0x00;
        wire[6] = 0x02; // claim 2-byte body when buffer still carries 3 + terminator
        let result = Frame::decode(&wire);
        assert_eq!(result, Err(ProtocolError::LengthMismatch { declared: 2, actual: 3 }));
    }

    #[test]
    fn rejects_short_buffer() {
        let result = Frame::decode(&[0xFE, 0xDC, 0xBA]);
        assert_eq!(result, Err(ProtocolError::FrameTooShort { expected: MIN_FRAME_LEN, actual: 3 }));
    }

    #[test]
    fn window_ack_fixture_decodes() {
        // flag=0x80 (notification), cmd=0x1D, body = window ack #1 from the
        // canonical 5-window trace in the protocol's test vectors.
        let body = [0x01, 0x00, 0x0F, 0x50, 0x00, 0x00, 0x01, 0xEA];
        let frame = Frame::new(FrameFlag::Notification, 0x1D, body.to_vec());
        let wire = frame.to_bytes().unwrap();
        let decoded = Frame::decode(&wire).unwrap();
        assert_eq!(decoded.cmd, 0x1D);
        assert_eq!(&decoded.body[..], &body);
    }
}
