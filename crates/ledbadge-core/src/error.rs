//! Transport, notification-bus, and auth-handshake level errors.

use std::time::Duration;

use ledbadge_crypto::CryptoError;
use ledbadge_proto::ProtocolError;
use thiserror::Error;

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors from the transport/bus/handshake layer.
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// A frame or checksum failed to decode.
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolError),

    /// The cipher layer could not produce an auth message (entropy failure).
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// The underlying transport is not present or not connected.
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    /// A wait on the notification bus exceeded its deadline.
    #[error("timeout waiting for {phase} after {elapsed:?}")]
    Timeout {
        /// Name of the phase or wait that timed out.
        phase: &'static str,
        /// How long the wait ran before giving up.
        elapsed: Duration,
    },

    /// The six-message mutual handshake did not complete successfully.
    #[error("auth handshake failed at step {step}")]
    AuthFailed {
        /// Which of the six handshake steps failed.
        step: u8,
    },
}

impl CoreError {
    /// `true` for errors a best-effort phase may swallow; `false` for
    /// errors that are always fatal regardless of phase criticality.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
