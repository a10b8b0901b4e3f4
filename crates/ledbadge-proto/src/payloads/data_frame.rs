//! Outbound data-frame body layout (`cmd 0x01`, `flag=0x80`).

use crate::crc16::crc16_xmodem;

/// Literal marker byte embedded in every data-frame body, distinct from
/// the FE `cmd` field that carries the same frame.
pub const MARKER: u8 = 0x1D;

/// Build one data-frame body: `[seq | 0x1D | slot | crc_hi | crc_lo |
/// chunk_bytes]`. The CRC covers only `chunk`, not the five header bytes.
#[must_use]
pub fn build(seq: u8, slot: u8, chunk: &[u8]) -> Vec<u8> {
    let crc = crc16_xmodem(chunk);
    let mut out = Vec::with_capacity(5 + chunk.len());
    out.push(seq);
    out.push(MARKER);
    out.push(slot);
    out.extend_from_slice(&crc.to_be_bytes());
    out.extend_from_slice(chunk);
    out
}
