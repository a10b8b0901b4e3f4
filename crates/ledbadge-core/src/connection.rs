//! Per-connection sequence counters and the authenticated flag.
//!
//! This is the "Connection state" of the data model: the two sequence
//! counters used by the auxiliary RCSP layer, and the flag the auth
//! handshake sets once. It holds no transport handles itself — those are
//! owned by [`crate::transport::Transport`] — only the small pieces of
//! state every op on top of the link needs to agree on.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// RCSP request sequence counter: wraps in `[1, 255]`, skipping `0` on
/// wraparound (`0` is reserved and never emitted as a request sequence).
#[derive(Debug, Default)]
pub struct RcspSeq(AtomicU8);

impl RcspSeq {
    /// Start a fresh counter. The first call to [`Self::next`] returns `1`.
    #[must_use]
    pub fn new() -> Self {
        Self(AtomicU8::new(0))
    }

    /// Allocate the next sequence number, wrapping `255 -> 1`.
    pub fn next(&self) -> u8 {
        loop {
            let current = self.0.load(Ordering::Relaxed);
            let next = if current >= 255 { 1 } else { current + 1 };
            if self
                .0
                .compare_exchange(current, next, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                return next;
            }
        }
    }
}

/// 9E control-channel serial number: wraps in `[0, 15]` (a 4-bit field).
#[derive(Debug, Default)]
pub struct QixSeq(AtomicU8);

impl QixSeq {
    /// Start a fresh counter. The first call to [`Self::next`] returns `0`.
    #[must_use]
    pub fn new() -> Self {
        Self(AtomicU8::new(0))
    }

    /// Allocate the next 4-bit serial number, wrapping `15 -> 0`.
    pub fn next(&self) -> u8 {
        loop {
            let current = self.0.load(Ordering::Relaxed);
            let next = if current >= 15 { 0 } else { current + 1 };
            if self
                .0
                .compare_exchange(current, next, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                return current;
            }
        }
    }
}

/// Shared connection-scoped state: the two sequence counters and the
/// authenticated flag the [`crate::auth::AuthEngine`] sets once per
/// connection.
#[derive(Debug, Default)]
pub struct ConnectionState {
    /// RCSP request sequence counter (auxiliary ops).
    pub rcsp_seq: RcspSeq,
    /// 9E control-channel serial number counter.
    pub qix_seq: QixSeq,
    authenticated: AtomicBool,
}

impl ConnectionState {
    /// Fresh, unauthenticated connection state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` once the auth handshake has completed successfully.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }

    /// Set by [`crate::auth::AuthEngine`] on handshake success. Idempotent.
    pub fn mark_authenticated(&self) {
        self.authenticated.store(true, Ordering::Release);
    }
}
