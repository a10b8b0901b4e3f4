//! Environment abstraction for deterministic testing.
//!
//! Decouples the protocol core from wall-clock time and OS randomness so the
//! handshake, session, and pump layers can be driven against a simulated
//! clock and a simulated transport without real BLE hardware or real waits.

use std::time::Duration;

/// Abstract environment providing time, async sleep, and randomness.
///
/// # Invariants
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards within one execution context.
/// - `random_bytes()` uses cryptographically secure entropy in production.
pub trait BadgeEnv: Clone + Send + Sync + 'static {
    /// The instant type used by this environment. Production uses
    /// `std::time::Instant`; simulation environments may use virtual time.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration. The only async method in this
    /// trait; protocol logic never calls it directly, only the driver loops
    /// in `ledbadge-client` do.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills `buffer` with random bytes (used for the two opaque random
    /// bytes embedded in the metadata body, not for cipher material — the
    /// crypto crate draws its own entropy for the auth handshake).
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Current wall-clock time as seconds since the Unix epoch, used to
    /// derive the badge-visible timestamp embedded in an upload's
    /// destination path.
    fn wall_clock_secs(&self) -> u64;
}

/// Production environment using system time, Tokio's async sleep, and the
/// OS CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl BadgeEnv for SystemEnv {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::getrandom(buffer).unwrap_or_else(|_| {
            // OS entropy failure on a supported platform should not happen;
            // fall back to zeros rather than panicking the upload.
            buffer.fill(0);
        });
    }

    #[allow(clippy::disallowed_methods)]
    fn wall_clock_secs(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}
