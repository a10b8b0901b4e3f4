//! NotificationBus: classifies incoming bytes, auto-acks device-initiated
//! commands, and dispatches frames to predicate-keyed waiters.
//!
//! Owns a single FIFO queue (cap 200, oldest evicted) fed by a background
//! task that drains [`Transport`]'s inbound channel. The bus never holds a
//! strong reference back to the session; it only needs a write capability
//! (itself, via `Arc<Transport>`, used purely as a write sink) to answer
//! device-initiated commands from inside the arrival callback, per the
//! "no cyclic ownership" design note.

use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use bytes::Bytes;
use ledbadge_proto::{Frame, FrameFlag, QixFrame, opcodes};
use tokio::sync::{Mutex, Notify};

use crate::{
    error::{CoreError, Result},
    transport::{NotifyEndpoint, Transport, WriteEndpoint},
};

/// Maximum number of queued items before the oldest is evicted.
pub const QUEUE_CAPACITY: usize = 200;

/// Interval the waiter loops re-check the queue at, bounding the worst-case
/// wakeup latency independent of `Notify`'s single-permit semantics when
/// more than one waiter is registered at a time.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// One item sitting in the bus's queue, tagged by which codec (if any)
/// successfully decoded it.
#[derive(Debug, Clone)]
pub enum QueueItem {
    /// Bytes that did not decode as an FE frame — handshake traffic.
    Raw(Bytes),
    /// A decoded FE frame from the data channel.
    Fe(Frame),
    /// A decoded 9E frame from one of the control notify sub-channels.
    Qix(NotifyEndpoint, QixFrame),
}

/// Builds the path-response body for a `FILE_COMPLETE` (`cmd 0x20`) fast
/// path reply, given the device's echoed sequence byte.
pub type PathResponder = dyn Fn(u8) -> Vec<u8> + Send + Sync;

#[derive(Default)]
struct FastPath {
    armed: AtomicBool,
    handled: AtomicBool,
    responder: Mutex<Option<Arc<PathResponder>>>,
}

/// Classifies inbound bytes, auto-acks device-initiated commands the
/// session doesn't handle explicitly, and serves predicate-keyed waiters.
pub struct NotificationBus {
    transport: Arc<Transport>,
    queue: Mutex<VecDeque<QueueItem>>,
    notify: Notify,
    fast_path: FastPath,
}

impl NotificationBus {
    /// Spawn the dispatcher over `transport`'s inbound channel. Panics
    /// (via the returned error) only if the channel was already taken by
    /// another bus on the same transport.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Unavailable`] if `transport`'s inbound receiver
    /// has already been taken.
    pub async fn spawn(transport: Arc<Transport>) -> Result<Arc<Self>> {
        let mut inbound = transport.take_inbound().await?;

        let bus = Arc::new(Self {
            transport,
            queue: Mutex::new(VecDeque::with_capacity(QUEUE_CAPACITY)),
            notify: Notify::new(),
            fast_path: FastPath::default(),
        });

        let dispatcher = bus.clone();
        tokio::spawn(async move {
            while let Some((source, bytes)) = inbound.recv().await {
                dispatcher.on_arrival(source, bytes).await;
            }
        });

        Ok(bus)
    }

    /// Arm the `cmd 0x20` fast-path auto-responder with a closure that
    /// builds the full path-response body from the device's echoed
    /// sequence byte. Disarmed automatically is NOT implied — callers must
    /// call [`Self::disarm_fast_path`] on every exit path (guaranteed
    /// release discipline).
    pub async fn arm_fast_path(&self, responder: Arc<PathResponder>) {
        *self.fast_path.responder.lock().await = Some(responder);
        self.fast_path.handled.store(false, Ordering::SeqCst);
        self.fast_path.armed.store(true, Ordering::SeqCst);
    }

    /// Disarm the fast-path auto-responder. Safe to call unconditionally.
    pub async fn disarm_fast_path(&self) {
        self.fast_path.armed.store(false, Ordering::SeqCst);
        *self.fast_path.responder.lock().await = None;
    }

    async fn on_arrival(&self, source: NotifyEndpoint, bytes: Bytes) {
        match source {
            NotifyEndpoint::Data => self.on_data_arrival(bytes).await,
            other => self.on_ctrl_arrival(other, bytes).await,
        }
    }

    async fn on_data_arrival(&self, bytes: Bytes) {
        let Ok(frame) = Frame::decode(&bytes) else {
            // Pre-auth handshake traffic is not FE-framed; anything else
            // that fails to decode is logged and dropped, not retried.
            tracing::debug!(len = bytes.len(), "data-channel bytes did not decode as an FE frame");
            self.push(QueueItem::Raw(bytes)).await;
            return;
        };

        if frame.flag == FrameFlag::Command {
            let device_initiated_reply_owned =
                !matches!(frame.cmd, opcodes::FE_FILE_COMPLETE | opcodes::FE_SESSION_CLOSE);

            if frame.cmd == opcodes::FE_FILE_COMPLETE && self.fast_path.armed.load(Ordering::SeqCst)
            {
                self.fire_fast_path(&frame).await;
            }

            if device_initiated_reply_owned {
                self.auto_ack(&frame).await;
                return;
            }
        }

        self.push(QueueItem::Fe(frame)).await;
    }

    async fn on_ctrl_arrival(&self, source: NotifyEndpoint, bytes: Bytes) {
        match QixFrame::decode(&bytes) {
            Ok(frame) => self.push(QueueItem::Qix(source, frame)).await,
            Err(err) => tracing::warn!(?source, %err, "control-channel bytes failed to decode"),
        }
    }

    async fn auto_ack(&self, frame: &Frame) {
        let device_seq = frame.body.first().copied().unwrap_or(0);
        let reply = Frame::new(FrameFlag::Response, frame.cmd, vec![0x00, device_seq]);
        let Ok(wire) = reply.to_bytes() else { return };
        if let Err(err) = self.transport.write(WriteEndpoint::Data, &wire).await {
            tracing::warn!(cmd = frame.cmd, %err, "auto-ack write failed");
        }
    }

    async fn fire_fast_path(&self, frame: &Frame) {
        if self.fast_path.handled.swap(true, Ordering::SeqCst) {
            return;
        }
        let Some(responder) = self.fast_path.responder.lock().await.clone() else { return };
        let device_seq = frame.body.first().copied().unwrap_or(0);
        let body = responder(device_seq);
        let reply = Frame::new(FrameFlag::Response, opcodes::FE_FILE_COMPLETE, body);
        let Ok(wire) = reply.to_bytes() else { return };
        if let Err(err) = self.transport.write(WriteEndpoint::Data, &wire).await {
            tracing::warn!(%err, "fast-path FILE_COMPLETE reply failed");
        }
    }

    async fn push(&self, item: QueueItem) {
        let mut queue = self.queue.lock().await;
        if queue.len() >= QUEUE_CAPACITY {
            queue.pop_front();
        }
        queue.push_back(item);
        drop(queue);
        self.notify.notify_one();
    }

    /// Wait up to `timeout` for the first raw (un-decoded) queue item
    /// matching `predicate`, used for pre-auth handshake traffic.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Timeout`] if no match arrives before the
    /// deadline.
    pub async fn wait_for_raw(
        &self,
        phase: &'static str,
        timeout: Duration,
        predicate: impl Fn(&[u8]) -> bool,
    ) -> Result<Bytes> {
        self.wait_for(phase, timeout, |item| match item {
            QueueItem::Raw(bytes) if predicate(bytes) => Some(bytes.clone()),
            _ => None,
        })
        .await
    }

    /// Wait up to `timeout` for the first FE frame matching `predicate`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Timeout`] if no match arrives before the
    /// deadline.
    pub async fn wait_for_frame(
        &self,
        phase: &'static str,
        timeout: Duration,
        predicate: impl Fn(&Frame) -> bool,
    ) -> Result<Frame> {
        self.wait_for(phase, timeout, |item| match item {
            QueueItem::Fe(frame) if predicate(frame) => Some(frame.clone()),
            _ => None,
        })
        .await
    }

    /// Wait up to `timeout` for the first 9E frame on `source` matching
    /// `predicate`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Timeout`] if no match arrives before the
    /// deadline.
    pub async fn wait_for_qix(
        &self,
        phase: &'static str,
        timeout: Duration,
        source: NotifyEndpoint,
        predicate: impl Fn(&QixFrame) -> bool,
    ) -> Result<QixFrame> {
        self.wait_for(phase, timeout, |item| match item {
            QueueItem::Qix(s, frame) if *s == source && predicate(frame) => Some(frame.clone()),
            _ => None,
        })
        .await
    }

    async fn wait_for<T>(
        &self,
        phase: &'static str,
        timeout: Duration,
        mut try_take: impl FnMut(&QueueItem) -> Option<T>,
    ) -> Result<T> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            {
                let mut queue = self.queue.lock().await;
                let position = queue.iter().position(|item| try_take(item).is_some());
                if let Some(index) = position {
                    let item = &queue[index];
                    if let Some(value) = try_take(item) {
                        queue.remove(index);
                        return Ok(value);
                    }
                }
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Err(CoreError::Timeout { phase, elapsed: timeout });
            }
            let remaining = deadline - now;
            let tick = remaining.min(POLL_INTERVAL);
            tokio::select! {
                () = self.notify.notified() => {}
                () = tokio::time::sleep(tick) => {}
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use ledbadge_proto::QixFlags;

    use super::*;
    use crate::transport::test_support::RecordingEndpoint;

    async fn harness() -> (Arc<NotificationBus>, Arc<RecordingEndpoint>, mpsc::Sender<(NotifyEndpoint, Bytes)>)
    {
        let data_ep = Arc::new(RecordingEndpoint::default());
        let ctrl_ep = Arc::new(RecordingEndpoint::default());
        let (transport, tx) = Transport::new(data_ep.clone(), ctrl_ep);
        let bus = NotificationBus::spawn(Arc::new(transport)).await.unwrap();
        (bus, data_ep, tx)
    }

    use tokio::sync::mpsc;

    #[tokio::test]
    async fn device_command_outside_explicit_set_is_auto_acked_not_enqueued() {
        let (bus, data_ep, tx) = harness().await;

        let frame = Frame::new(FrameFlag::Command, 0x06, vec![0x2A]);
        tx.send((NotifyEndpoint::Data, frame.to_bytes().unwrap())).await.unwrap();

        // Give the dispatcher task a chance to run.
        tokio::time::sleep(Duration::from_millis(10)).await;

        let result = bus.wait_for_frame("probe", Duration::from_millis(30), |f| f.cmd == 0x06).await;
        assert!(result.is_err(), "auto-acked commands must not be enqueued");

        let writes = data_ep.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        let decoded = Frame::decode(&writes[0]).unwrap();
        assert_eq!(decoded.flag, FrameFlag::Response);
        assert_eq!(decoded.cmd, 0x06);
        assert_eq!(&decoded.body[..], &[0x00, 0x2A]);
    }

    #[tokio::test]
    async fn window_ack_is_enqueued_not_auto_acked() {
        let (bus, data_ep, tx) = harness().await;

        let body = vec![0x01, 0x00, 0x0F, 0x50, 0x00, 0x00, 0x01, 0xEA];
        let frame = Frame::new(FrameFlag::Notification, 0x1D, body);
        tx.send((NotifyEndpoint::Data, frame.to_bytes().unwrap())).await.unwrap();

        let got =
            bus.wait_for_frame("window ack", Duration::from_millis(200), |f| f.cmd == 0x1D).await;
        assert!(got.is_ok());
        assert!(data_ep.writes.lock().unwrap().is_empty(), "no auto-ack for window acks");
    }

    #[tokio::test]
    async fn timeout_fires_when_nothing_matches() {
        let (bus, _data_ep, _tx) = harness().await;
        let result = bus.wait_for_frame("nothing", Duration::from_millis(30), |_| true).await;
        assert!(matches!(result, Err(CoreError::Timeout { .. })));
    }

    #[tokio::test]
    async fn fast_path_replies_immediately_and_still_enqueues() {
        let (bus, data_ep, tx) = harness().await;

        bus.arm_fast_path(Arc::new(|dev_seq: u8| vec![0x00, dev_seq, b'p', b'a', b't', b'h'])).await;

        let frame = Frame::new(FrameFlag::Command, opcodes::FE_FILE_COMPLETE, vec![0x06]);
        tx.send((NotifyEndpoint::Data, frame.to_bytes().unwrap())).await.unwrap();

        let enqueued = bus
            .wait_for_frame("file complete", Duration::from_millis(200), |f| {
                f.cmd == opcodes::FE_FILE_COMPLETE
            })
            .await
            .unwrap();
        assert_eq!(enqueued.cmd, opcodes::FE_FILE_COMPLETE);

        let writes = data_ep.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        let decoded = Frame::decode(&writes[0]).unwrap();
        assert_eq!(&decoded.body[..], &[0x00, 0x06, b'p', b'a', b't', b'h']);

        bus.disarm_fast_path().await;
    }

    #[tokio::test]
    async fn qix_frame_routes_by_source() {
        let (bus, _data_ep, tx) = harness().await;

        let frame = QixFrame::new(QixFlags::request(1), 0xC7, vec![0x01]);
        tx.send((NotifyEndpoint::CtrlInfo, frame.to_bytes().unwrap())).await.unwrap();

        let wrong_source = bus
            .wait_for_qix("info", Duration::from_millis(30), NotifyEndpoint::CtrlReady, |_| true)
            .await;
        assert!(wrong_source.is_err());

        let right_source = bus
            .wait_for_qix("info", Duration::from_millis(200), NotifyEndpoint::CtrlInfo, |f| {
                f.cmd == 0xC7
            })
            .await;
        assert!(right_source.is_ok());
    }

    #[tokio::test]
    async fn queue_evicts_oldest_past_capacity() {
        let (bus, _data_ep, tx) = harness().await;

        for i in 0..(QUEUE_CAPACITY + 10) {
            let frame =
                Frame::new(FrameFlag::Notification, 0x1D, vec![(i % 256) as u8, 0, 0, 0, 0, 0, 0, 0]);
            tx.send((NotifyEndpoint::Data, frame.to_bytes().unwrap())).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(50)).await;

        let queue = bus.queue.lock().await;
        assert_eq!(queue.len(), QUEUE_CAPACITY);
    }
}
