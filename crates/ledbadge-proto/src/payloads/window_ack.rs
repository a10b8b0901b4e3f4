//! Window ACK: the device-driven flow-control signal for the data loop.

use crate::errors::{ProtocolError, Result};

/// Byte length of a window-ACK body.
pub const WIRE_LEN: usize = 8;

/// A parsed window ACK, carried in an FE notification (`flag=0x80,
/// cmd=0x1D`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowAck {
    /// The ACK's own sequence number, as assigned by the device.
    pub wa_seq: u8,
    /// Device status byte. Non-zero is logged but does not by itself abort
    /// the transfer (only a later `SESSION_CLOSE` with non-zero status is
    /// terminal).
    pub status: u8,
    /// Maximum number of bytes the host may send before the next ACK.
    pub win_size: u16,
    /// Offset into the payload this window starts at.
    pub next_offset: u32,
}

impl WindowAck {
    /// A window ACK with `next_offset == 0` and `win_size` no larger than
    /// the negotiated chunk size signals the commit window: the payload's
    /// first `win_size` bytes are resent as the final chunk.
    #[must_use]
    pub fn is_commit(&self, chunk_size: u16) -> bool {
        self.next_offset == 0 && self.win_size <= chunk_size
    }

    /// Parse an 8-byte window-ACK body: `{wa_seq, status, win_size BE16,
    /// next_offset BE32}`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidBody`] if `body` is not exactly
    /// [`WIRE_LEN`] bytes.
    pub fn parse(body: &[u8]) -> Result<Self> {
        if body.len() != WIRE_LEN {
            return Err(ProtocolError::InvalidBody {
                what: "window ack",
                expected: WIRE_LEN,
                actual: body.len(),
            });
        }

        Ok(Self {
            wa_seq: body[0],
            status: body[1],
            win_size: u16::from_be_bytes([body[2], body[3]]),
            next_offset: u32::from_be_bytes([body[4], body[5], body[6], body[7]]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_canonical_five_window_trace() {
        let trace: [(&[u8], WindowAck); 5] = [
            (
                &[0x01, 0x00, 0x0F, 0x50, 0x00, 0x00, 0x01, 0xEA],
                WindowAck { wa_seq: 1, status: 0, win_size: 3920, next_offset: 490 },
            ),
            (
                &[0x02, 0x00, 0x0F, 0x50, 0x00, 0x00, 0x11, 0x3A],
                WindowAck { wa_seq: 2, status: 0, win_size: 3920, next_offset: 4410 },
            ),
            (
                &[0x03, 0x00, 0x0F, 0x50, 0x00, 0x00, 0x20, 0x8A],
                WindowAck { wa_seq: 3, status: 0, win_size: 3920, next_offset: 8330 },
            ),
            (
                &[0x04, 0x00, 0x0F, 0x50, 0x00, 0x00, 0x2F, 0xDA],
                WindowAck { wa_seq: 4, status: 0, win_size: 3920, next_offset: 12250 },
            ),
            (
                &[0x05, 0x00, 0x01, 0xEA, 0x00, 0x00, 0x00, 0x00],
                WindowAck { wa_seq: 5, status: 0, win_size: 490, next_offset: 0 },
            ),
        ];

        for (body, expected) in trace {
            assert_eq!(WindowAck::parse(body).unwrap(), expected);
        }
    }

    #[test]
    fn last_trace_entry_is_a_commit_window() {
        let ack = WindowAck::parse(&[0x05, 0x00, 0x01, 0xEA, 0x00, 0x00, 0x00, 0x00]).unwrap();
        assert!(ack.is_commit(490));
    }

    #[test]
    fn earlier_trace_entries_are_not_commit_windows() {
        let ack = WindowAck::parse(&[0x01, 0x00, 0x0F, 0x50, 0x00, 0x00, 0x01, 0xEA]).unwrap();
        assert!(!ack.is_commit(490));
    }

    #[test]
    fn rejects_wrong_length() {
        let result = WindowAck::parse(&[0x01, 0x00, 0x0F]);
        assert_eq!(result, Err(ProtocolError::InvalidBody { what: "window ack", expected: 8, actual: 3 }));
    }
}
