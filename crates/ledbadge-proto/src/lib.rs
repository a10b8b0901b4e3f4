//! FE and 9E frame codecs, CRC-16/XMODEM, and the fixed-shape bodies that
//! ride on top of them.
//!
//! This crate is the link-layer codec: it knows how to turn bytes into
//! `Frame`/`QixFrame` values and back, and how to interpret the few
//! binary body layouts (window ACK, metadata, data-frame header) the
//! upload protocol depends on. It has no notion of sessions, transports,
//! or timing — that lives in `ledbadge-core` and `ledbadge-client`.
//!
//! Both frame types here are raw fixed-layout binary rather than a
//! self-describing format: every field has a byte-exact position because
//! that's what the device's firmware expects on the wire.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod crc16;
pub mod errors;
pub mod frame;
pub mod opcodes;
pub mod payloads;
pub mod qix;

pub use crc16::{Crc16Xmodem, crc16_xmodem};
pub use errors::{ProtocolError, Result};
pub use frame::{Frame, FrameFlag};
pub use payloads::{MetadataBody, WindowAck};
pub use qix::{QixFlags, QixFrame};
