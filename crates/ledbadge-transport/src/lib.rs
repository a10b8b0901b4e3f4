//! Concrete `btleplug`-backed [`ledbadge_core::Transport`] adapter.
//!
//! Not part of the protocol core: `ledbadge-core` and `ledbadge-client`
//! depend only on the [`ledbadge_core::Endpoint`]/[`ledbadge_core::Transport`]
//! traits and are tested against an in-memory harness. This crate supplies
//! the one concrete implementation a CLI front-end needs to talk to a real
//! badge, resolving the GATT characteristic UUIDs and forwarding
//! notifications into the same `(NotifyEndpoint, Bytes)` channel the
//! in-memory harness uses.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod adapter;
mod error;
mod uuids;

pub use adapter::{BadgeLink, DEFAULT_SCAN_TIMEOUT, DeviceFilter, connect};
pub use error::{Result, TransportError};
