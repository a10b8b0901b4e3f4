//! Upload-session configuration: timeouts, chunk-size bounds, and the
//! payload size limit. Every field defaults to the documented wire constant
//! of the protocol notes; only select fields are meant to be overridden by
//! a CLI front-end (chunk-size fallback), never the wire-level constants
//! (magic bytes, opcodes, key material), which stay compiled in.

use std::time::Duration;

/// Suggested chunk size the session falls back to when the device's
/// `Metadata` ACK proposes one outside `(0, 4096]`.
pub const DEFAULT_CHUNK_SIZE_FALLBACK: u16 = 490;

/// Upper bound a device-proposed chunk size must fall within to be honored
/// as-is.
pub const MAX_ACCEPTED_CHUNK_SIZE: u16 = 4096;

/// Maximum payload size accepted before Phase 1 begins.
pub const MAX_PAYLOAD_SIZE: usize = 2_000_000;

/// Timeout for RCSP request/ACK round trips (`SessionOpen`,
/// `TransferParams`, `Metadata`, and the auxiliary RCSP ops).
pub const DEFAULT_RCSP_ACK_TIMEOUT: Duration = Duration::from_secs(8);

/// Timeout for the device's first window ACK after `Metadata` succeeds.
pub const DEFAULT_INITIAL_WINDOW_ACK_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for each subsequent window ACK or completion frame in the data
/// loop.
pub const DEFAULT_WINDOW_COMPLETION_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for each step of the auth handshake (mirrored from
/// `ledbadge_core::auth`, surfaced here so callers can see the whole
/// timeout budget in one place).
pub const DEFAULT_HANDSHAKE_STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for best-effort 9E control writes (`InfoQuery`, `ConfigQuery`,
/// and the six bootstrap writes).
pub const DEFAULT_BEST_EFFORT_TIMEOUT: Duration = Duration::from_secs(3);

/// Configuration for one upload session. All fields have defaults matching
/// the protocol's documented constants; a CLI front-end may override
/// `chunk_size_fallback` for firmware variants that propose out-of-range
/// chunk sizes, but should leave the timeouts and size limit alone unless
/// it knows what it's doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadConfig {
    /// Chunk size used when the device's proposal is out of range.
    pub chunk_size_fallback: u16,
    /// Maximum payload size accepted before Phase 1 begins.
    pub max_payload_size: usize,
    /// RCSP request/ACK timeout.
    pub rcsp_ack_timeout: Duration,
    /// Initial window-ACK timeout.
    pub initial_window_ack_timeout: Duration,
    /// Timeout for subsequent window ACKs and completion frames.
    pub window_completion_timeout: Duration,
    /// Timeout for best-effort 9E writes.
    pub best_effort_timeout: Duration,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size_fallback: DEFAULT_CHUNK_SIZE_FALLBACK,
            max_payload_size: MAX_PAYLOAD_SIZE,
            rcsp_ack_timeout: DEFAULT_RCSP_ACK_TIMEOUT,
            initial_window_ack_timeout: DEFAULT_INITIAL_WINDOW_ACK_TIMEOUT,
            window_completion_timeout: DEFAULT_WINDOW_COMPLETION_TIMEOUT,
            best_effort_timeout: DEFAULT_BEST_EFFORT_TIMEOUT,
        }
    }
}

impl UploadConfig {
    /// Resolve the device's proposed chunk size against `(0, 4096]`,
    /// falling back to [`Self::chunk_size_fallback`] when out of range.
    #[must_use]
    pub fn resolve_chunk_size(&self, proposed: u16) -> u16 {
        if proposed > 0 && proposed <= MAX_ACCEPTED_CHUNK_SIZE {
            proposed
        } else {
            self.chunk_size_fallback
        }
    }
}
