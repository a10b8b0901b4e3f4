//! Link-layer core: environment abstraction, transport, the notification
//! bus, connection state, and the auth handshake.
//!
//! Everything above the wire codecs (`ledbadge-proto`) and the cipher
//! (`ledbadge-crypto`) but below the upload session state machine
//! (`ledbadge-client`) lives here. This crate has no notion of files,
//! windows, or uploads — only "am I authenticated" and "can I wait for a
//! frame matching this predicate".

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod auth;
pub mod bus;
pub mod connection;
pub mod env;
pub mod error;
pub mod transport;

pub use auth::AuthEngine;
pub use bus::{NotificationBus, PathResponder, QueueItem};
pub use connection::{ConnectionState, QixSeq, RcspSeq};
pub use env::{BadgeEnv, SystemEnv};
pub use error::{CoreError, Result};
pub use transport::{Endpoint, NotifyEndpoint, Transport, WriteEndpoint};
