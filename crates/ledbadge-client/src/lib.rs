//! Upload session state machine, windowed data pump, and auxiliary RCSP ops
//! built on top of `ledbadge-core`'s transport, notification bus, and auth
//! handshake.
//!
//! Callers construct a [`ledbadge_core::Transport`]/
//! [`ledbadge_core::NotificationBus`] pair (one per BLE connection, from the
//! concrete adapter in `ledbadge-transport`), then drive an [`UploadSession`]
//! through its `upload` method. Everything below this crate (codecs, the
//! cipher, the transport, the bus, the auth handshake) lives in
//! `ledbadge-proto` and `ledbadge-core`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod clock;
pub mod config;
pub mod error;
pub mod pump;
pub mod rcsp;
pub mod session;

pub use clock::CivilTime;
pub use config::UploadConfig;
pub use error::{ClientError, Result};
pub use pump::{SessionSeq, WindowedDataPump};
pub use rcsp::{RcspClient, ScreenInfo};
pub use session::{CancelHandle, ProgressFn, UploadKind, UploadSession};
