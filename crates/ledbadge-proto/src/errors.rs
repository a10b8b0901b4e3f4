//! Frame/codec-level errors.
//!
//! Strongly-typed per-cause errors so callers can distinguish "garbage on
//! the wire" (log and keep scanning) from "this specific field is wrong"
//! without string matching.

use thiserror::Error;

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced by the FE and 9E codecs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Buffer shorter than the minimum frame size for this codec.
    #[error("frame too short: need at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Minimum required length.
        expected: usize,
        /// Actual buffer length.
        actual: usize,
    },

    /// FE frame magic bytes did not match `FE DC BA`.
    #[error("invalid FE magic")]
    InvalidFeMagic,

    /// FE frame terminator byte did not match `EF`.
    #[error("invalid FE terminator: {0:#04x}")]
    InvalidTerminator(u8),

    /// FE frame's declared length field did not match the actual body
    /// length.
    #[error("FE length mismatch: header declared {declared}, body has {actual}")]
    LengthMismatch {
        /// Length the header claims.
        declared: usize,
        /// Length the buffer actually contains.
        actual: usize,
    },

    /// 9E frame magic byte did not match `9E`.
    #[error("invalid 9E magic")]
    InvalidQixMagic,

    /// 9E frame's additive checksum did not match the computed value.
    #[error("9E checksum mismatch: header claims {declared:#04x}, computed {computed:#04x}")]
    ChecksumMismatch {
        /// Checksum byte read from the wire.
        declared: u8,
        /// Checksum computed over the remaining bytes.
        computed: u8,
    },

    /// 9E frame declared a payload length that does not fit in the
    /// remaining buffer.
    #[error("9E length mismatch: header declared {declared}, buffer has {actual} remaining")]
    QixLengthMismatch {
        /// Length the header claims.
        declared: usize,
        /// Bytes actually remaining in the buffer.
        actual: usize,
    },

    /// A fixed-layout body (window ACK, metadata ACK, ...) had the wrong
    /// size for its expected shape.
    #[error("invalid body for {what}: expected {expected} bytes, got {actual}")]
    InvalidBody {
        /// What was being parsed.
        what: &'static str,
        /// Expected byte length.
        expected: usize,
        /// Actual byte length.
        actual: usize,
    },

    /// Payload exceeds the protocol's maximum frame body size.
    #[error("payload too large: {size} bytes exceeds max {max}")]
    PayloadTooLarge {
        /// Size that was rejected.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },
}
