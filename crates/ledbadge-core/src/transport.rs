//! Transport abstraction: the four logical endpoints, generalized to
//! one write sink per direction and one fan-in stream of inbound
//! notifications.
//!
//! The core depends only on the [`Endpoint`] trait and [`Transport`]; GATT
//! discovery, characteristic UUIDs, and BLE reconnection policy live in the
//! (out-of-core) `ledbadge-transport` adapter crate.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{Mutex, mpsc};

use crate::error::{CoreError, Result};

/// Which physical write endpoint a write targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteEndpoint {
    /// Data-W (`AE01`): raw auth bytes, FE commands, FE data frames.
    Data,
    /// Ctrl-W (`FD02`/`FD04`): 9E control writes.
    Ctrl,
}

/// Which notify source an inbound payload arrived on. Ctrl-N is split into
/// three logical sub-channels (`FD01` info, `FD03` ready, `FD05`
/// other); the core only needs to know which one a frame rode in on to
/// route best-effort 9E waits correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyEndpoint {
    /// Data-N (`AE02`): FE responses and notifications.
    Data,
    /// Ctrl-N info sub-channel (`FD01`).
    CtrlInfo,
    /// Ctrl-N ready sub-channel (`FD03`).
    CtrlReady,
    /// Ctrl-N other sub-channel (`FD05`).
    CtrlOther,
}

/// One physical write-capable GATT characteristic, abstracted down to
/// "write these bytes" plus a hint about write-without-response support.
#[async_trait]
pub trait Endpoint: Send + Sync {
    /// Write `bytes` to the peer. Implementations should prefer
    /// write-without-response when [`Self::prefers_without_response`]
    /// returns `true`.
    async fn write(&self, bytes: &[u8]) -> Result<()>;

    /// `true` if this characteristic advertises write-without-response.
    fn prefers_without_response(&self) -> bool {
        true
    }
}

/// The shared transport: two write endpoints plus one fan-in stream of
/// inbound notifications across all four notify sources.
///
/// Writes on a single endpoint are serialized: the next write on that
/// endpoint only starts after the previous one resolves.
pub struct Transport {
    data_write: Arc<dyn Endpoint>,
    ctrl_write: Arc<dyn Endpoint>,
    data_write_lock: Mutex<()>,
    ctrl_write_lock: Mutex<()>,
    inbound: Mutex<Option<mpsc::Receiver<(NotifyEndpoint, Bytes)>>>,
}

impl Transport {
    /// Build a transport over the given write endpoints, returning it
    /// together with the producer half of the inbound channel. Callers
    /// (the `ledbadge-transport` BLE adapter, or a test harness) push
    /// `(NotifyEndpoint, Bytes)` pairs into the sender as notifications
    /// arrive; [`crate::bus::NotificationBus`] takes ownership of the
    /// receiver exactly once.
    #[must_use]
    pub fn new(
        data_write: Arc<dyn Endpoint>,
        ctrl_write: Arc<dyn Endpoint>,
    ) -> (Self, mpsc::Sender<(NotifyEndpoint, Bytes)>) {
        let (tx, rx) = mpsc::channel(256);
        let transport = Self {
            data_write,
            ctrl_write,
            data_write_lock: Mutex::new(()),
            ctrl_write_lock: Mutex::new(()),
            inbound: Mutex::new(Some(rx)),
        };
        (transport, tx)
    }

    /// Write `bytes` on the given logical endpoint, serialized against any
    /// other in-flight write on the same endpoint.
    ///
    /// # Errors
    ///
    /// Propagates whatever the underlying [`Endpoint::write`] returns.
    pub async fn write(&self, endpoint: WriteEndpoint, bytes: &[u8]) -> Result<()> {
        match endpoint {
            WriteEndpoint::Data => {
                let _guard = self.data_write_lock.lock().await;
                self.data_write.write(bytes).await
            },
            WriteEndpoint::Ctrl => {
                let _guard = self.ctrl_write_lock.lock().await;
                self.ctrl_write.write(bytes).await
            },
        }
    }

    /// Take ownership of the inbound notification receiver. Returns `None`
    /// if already taken (at most one [`crate::bus::NotificationBus`] may
    /// own it per connection).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Unavailable`] if the receiver was already taken.
    pub async fn take_inbound(&self) -> Result<mpsc::Receiver<(NotifyEndpoint, Bytes)>> {
        self.inbound
            .lock()
            .await
            .take()
            .ok_or_else(|| CoreError::Unavailable("inbound receiver already taken".to_owned()))
    }
}
