//! Fixed-shape FE body layouts.
//!
//! Unlike a CBOR-carrying protocol, every body here is a flat binary
//! layout the device expects byte-for-byte, so these are plain
//! struct-with-parse/build pairs rather than a serde-driven enum.

pub mod data_frame;
pub mod metadata;
pub mod window_ack;

pub use metadata::MetadataBody;
pub use window_ack::WindowAck;
