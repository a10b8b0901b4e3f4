//! Session-level errors: wraps [`CoreError`], adds upload-specific outcomes.

use ledbadge_core::CoreError;
use thiserror::Error;

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors from the upload session layer.
#[derive(Error, Debug, Clone)]
pub enum ClientError {
    /// Transport, notification-bus, or handshake failure below this layer.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A device ACK or `SESSION_CLOSE` carried a non-zero status byte.
    #[error("device reported non-zero status {code:#04x} during {phase}")]
    DeviceStatus {
        /// Phase name the status was observed in.
        phase: &'static str,
        /// The raw status byte.
        code: u8,
    },

    /// The host requested cancellation.
    #[error("upload cancelled during {phase}")]
    Cancelled {
        /// Phase the cancellation was observed in.
        phase: &'static str,
    },

    /// The payload exceeds the maximum upload size.
    #[error("payload of {len} bytes exceeds the {max}-byte limit")]
    SizeLimit {
        /// Actual payload length.
        len: usize,
        /// Configured maximum.
        max: usize,
    },

    /// The payload is empty; the device requires at least one chunk to open
    /// an upload session.
    #[error("payload is empty; the device requires at least one chunk")]
    EmptyPayload,
}

impl ClientError {
    /// `true` for errors that should abort the upload outright rather than
    /// being swallowed by a best-effort phase.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Core(core) if core.is_timeout())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn core_timeout_is_not_fatal() {
        let err = ClientError::Core(CoreError::Timeout { phase: "probe", elapsed: Duration::from_secs(1) });
        assert!(!err.is_fatal());
    }

    #[test]
    fn device_status_is_fatal() {
        let err = ClientError::DeviceStatus { phase: "session_close", code: 0x02 };
        assert!(err.is_fatal());
    }

    #[test]
    fn size_limit_is_fatal() {
        let err = ClientError::SizeLimit { len: 3_000_000, max: 2_000_000 };
        assert!(err.is_fatal());
    }
}
