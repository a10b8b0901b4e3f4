//! The upload session state machine: connect through bootstrap, metadata,
//! driven by an async loop on top of [`ledbadge_core::Transport`] and
//! [`ledbadge_core::NotificationBus`].
//!
//! The phase transitions themselves are plain `match`-free sequential code
//! (there is exactly one path through an upload, no branching state graph to
//! speak of) but the two building blocks that decide *what bytes go on the
//! wire* — [`crate::pump::WindowedDataPump`] and the window-ACK/completion
//! wait predicates below — are pure functions over their inputs, kept
//! testable independent of any real transport. The only state this module
//! owns beyond those two is the running [`crate::pump::SessionSeq`] counter
//! and the [`CancelHandle`] flag, both plain values threaded through by hand
//! rather than hidden behind interior mutability.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use bytes::Bytes;
use ledbadge_core::{
    AuthEngine, BadgeEnv, ConnectionState, NotificationBus, Transport,
    bus::PathResponder,
    transport::{NotifyEndpoint, WriteEndpoint},
};
use ledbadge_proto::{Frame, FrameFlag, WindowAck, opcodes, payloads::MetadataBody};

use crate::{
    clock::CivilTime,
    config::UploadConfig,
    error::{ClientError, Result},
    pump::{SessionSeq, WindowedDataPump},
};

/// Progress callback: `(bytes_sent, total_bytes)`, invoked after every data
/// frame write during Phase 7.
pub type ProgressFn = dyn Fn(usize, usize) + Send + Sync;

/// Which kind of file is being uploaded. Only affects the metadata name and
/// the destination path's file extension; the wire protocol itself is
/// oblivious to content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// A single still image.
    Still,
    /// An animated sequence.
    Animation,
}

impl UploadKind {
    fn extension(self) -> &'static str {
        match self {
            Self::Still => "jpg",
            Self::Animation => "avi",
        }
    }

    fn metadata_name(self) -> &'static str {
        match self {
            Self::Still => "img",
            Self::Animation => "vid",
        }
    }
}

/// A shared, cloneable cancellation flag for one [`UploadSession`].
///
/// Cloning shares the same underlying flag: calling [`Self::cancel`] on any
/// clone is observed by every other clone and by the session itself.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// A fresh, not-yet-cancelled handle.
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// `true` once [`Self::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

fn check_status(phase: &'static str, body: &[u8]) -> Result<()> {
    match body.first() {
        Some(0x00) => Ok(()),
        Some(&code) => Err(ClientError::DeviceStatus { phase, code }),
        None => Err(ClientError::DeviceStatus { phase, code: 0xFF }),
    }
}

/// Build the UTF-16LE path-response body for a `FILE_COMPLETE` reply:
/// `[0x00, device_seq] + UTF-16LE("\u{555C}" + YYYYMMDDHHMMSS + "." + ext) +
/// [0x00, 0x00]`.
fn build_path_response(device_seq: u8, epoch_secs: u64, kind: UploadKind) -> Vec<u8> {
    let time = CivilTime::from_unix_secs(epoch_secs);
    let mut path = String::with_capacity(1 + 14 + 4);
    path.push('\u{555C}');
    path.push_str(&time.to_compact_string());
    path.push('.');
    path.push_str(kind.extension());

    let mut body = Vec::with_capacity(2 + path.len() * 2 + 2);
    body.push(0x00);
    body.push(device_seq);
    for unit in path.encode_utf16() {
        body.extend_from_slice(&unit.to_le_bytes());
    }
    body.extend_from_slice(&[0x00, 0x00]);
    body
}

/// Swallow any failure, logging it — used for the phases that are
/// best-effort (`InfoQuery`, `ConfigQuery`, and the 9E bootstrap writes).
/// Unlike [`crate::error::ClientError::is_fatal`], which distinguishes only
/// `Core::Timeout` from everything else, these phases can never abort the
/// upload at all: a dropped write or an unexpected reply shape is logged and
/// the session moves on to the next phase regardless.
fn best_effort<T>(phase: &'static str, result: Result<T>) {
    if let Err(err) = result {
        tracing::warn!(phase, %err, "best-effort phase did not complete cleanly, continuing");
    }
}

/// Drives one upload from an authenticated (or not-yet-authenticated)
/// connection through to `SESSION_CLOSE`.
///
/// One `UploadSession` is meant to be built per BLE connection and reused
/// across multiple uploads: the auth handshake inside [`Self::upload`] is a
/// no-op after the first successful run (see
/// [`ledbadge_core::ConnectionState::is_authenticated`]), and `SessionSeq` is
/// reset fresh at the start of every call.
pub struct UploadSession<E: BadgeEnv> {
    transport: Arc<Transport>,
    bus: Arc<NotificationBus>,
    connection: Arc<ConnectionState>,
    auth: AuthEngine,
    env: E,
    config: UploadConfig,
    cancel: CancelHandle,
}

impl<E: BadgeEnv> UploadSession<E> {
    /// Build a session over an already-constructed transport/bus pair.
    #[must_use]
    pub fn new(
        transport: Arc<Transport>,
        bus: Arc<NotificationBus>,
        connection: Arc<ConnectionState>,
        env: E,
        config: UploadConfig,
    ) -> Self {
        let auth = AuthEngine::new(transport.clone(), bus.clone());
        Self { transport, bus, connection, auth, env, config, cancel: CancelHandle::new() }
    }

    /// A cloneable handle a caller can use to request cancellation from
    /// another task while [`Self::upload`] is in flight.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Upload `payload` as `kind`, with no progress reporting.
    ///
    /// # Errors
    ///
    /// See [`Self::upload_with_progress`].
    pub async fn upload(&self, payload: impl Into<Bytes>, kind: UploadKind) -> Result<()> {
        self.upload_with_progress(payload, kind, None).await
    }

    /// Upload `payload` as `kind`, invoking `progress` after every data
    /// frame write.
    ///
    /// Returns `Ok(())` once `SESSION_CLOSE` reports success. A cancellation
    /// requested via [`Self::cancel_handle`] surfaces as
    /// [`ClientError::Cancelled`]; a non-zero device status at any
    /// acknowledged phase surfaces as [`ClientError::DeviceStatus`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SizeLimit`] or [`ClientError::EmptyPayload`]
    /// before any wire traffic if `payload` is out of bounds, and otherwise
    /// propagates whatever the first fatal phase failure produces.
    pub async fn upload_with_progress(
        &self,
        payload: impl Into<Bytes>,
        kind: UploadKind,
        progress: Option<Arc<ProgressFn>>,
    ) -> Result<()> {
        let payload = payload.into();
        if payload.len() > self.config.max_payload_size {
            return Err(ClientError::SizeLimit { len: payload.len(), max: self.config.max_payload_size });
        }
        if payload.is_empty() {
            return Err(ClientError::EmptyPayload);
        }

        self.check_cancel("authenticating")?;
        self.auth.authenticate(&self.connection).await?;

        self.check_cancel("reset_flag")?;
        let mut seq = SessionSeq::new();
        self.reset_flag().await;
        seq.set(0x01);

        self.check_cancel("control_bootstrap")?;
        self.control_bootstrap().await;

        self.check_cancel("info_query")?;
        best_effort(
            "info_query",
            self.fe_request(
                "info_query",
                opcodes::FE_INFO_QUERY,
                &mut seq,
                &[0xFF, 0xFF, 0xFF, 0xFF, 0x01],
                self.config.rcsp_ack_timeout,
            )
            .await,
        );

        self.check_cancel("config_query")?;
        best_effort(
            "config_query",
            self.fe_request(
                "config_query",
                opcodes::FE_CONFIG_QUERY,
                &mut seq,
                &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF],
                self.config.rcsp_ack_timeout,
            )
            .await,
        );

        self.check_cancel("ready_signal")?;
        self.ready_signal().await;

        self.check_cancel("session_open")?;
        let open_ack = self
            .fe_request("session_open", opcodes::FE_SESSION_OPEN, &mut seq, &[0x00], self.config.rcsp_ack_timeout)
            .await?;
        check_status("session_open", &open_ack.body)?;

        self.check_cancel("transfer_params")?;
        let params_ack = self
            .fe_request(
                "transfer_params",
                opcodes::FE_TRANSFER_PARAMS,
                &mut seq,
                &[0x00, 0x00, 0x00, 0x00, 0x02, 0x01],
                self.config.rcsp_ack_timeout,
            )
            .await?;
        check_status("transfer_params", &params_ack.body)?;

        self.check_cancel("metadata")?;
        let mut rand = [0u8; 2];
        self.env.random_bytes(&mut rand);
        let metadata_seq = seq.next();
        let metadata = MetadataBody::new(metadata_seq, &payload, rand, kind.metadata_name())
            .map_err(ledbadge_core::CoreError::from)?;
        let request = Frame::new(FrameFlag::Command, opcodes::FE_METADATA, metadata.to_bytes());
        let wire = request.to_bytes().map_err(ledbadge_core::CoreError::from)?;
        self.transport.write(WriteEndpoint::Data, &wire).await?;
        let metadata_ack = self
            .bus
            .wait_for_frame("metadata", self.config.rcsp_ack_timeout, |f| {
                f.cmd == opcodes::FE_METADATA && f.flag == FrameFlag::Response
            })
            .await?;
        check_status("metadata", &metadata_ack.body)?;
        let proposed_chunk = if metadata_ack.body.len() >= 4 {
            u16::from_be_bytes([metadata_ack.body[2], metadata_ack.body[3]])
        } else {
            0
        };
        let chunk_size = self.config.resolve_chunk_size(proposed_chunk);

        self.check_cancel("initial_window_ack")?;
        let first_ack_frame = self
            .bus
            .wait_for_frame("initial_window_ack", self.config.initial_window_ack_timeout, |f| {
                f.cmd == opcodes::FE_WINDOW_ACK && f.flag == FrameFlag::Notification
            })
            .await?;
        let first_ack = WindowAck::parse(&first_ack_frame.body).map_err(ledbadge_core::CoreError::from)?;

        let pump = WindowedDataPump::new(payload, chunk_size);

        let env = self.env.clone();
        let responder: Arc<PathResponder> =
            Arc::new(move |device_seq: u8| build_path_response(device_seq, env.wall_clock_secs(), kind));
        self.bus.arm_fast_path(responder).await;

        let outcome = self.run_transfer(pump, seq, first_ack, progress).await;
        self.bus.disarm_fast_path().await;
        outcome
    }

    fn check_cancel(&self, phase: &'static str) -> Result<()> {
        if self.cancel.is_cancelled() { Err(ClientError::Cancelled { phase }) } else { Ok(()) }
    }

    /// Phase 2: `ResetFlag`. Fixed literal body, best-effort — the session
    /// sets the running sequence counter to `1` regardless of whether an
    /// ACK is observed.
    async fn reset_flag(&self) {
        let request = Frame::new(FrameFlag::Command, opcodes::FE_RESET_FLAG, opcodes::RESET_FLAG_BODY.to_vec());
        let Ok(wire) = request.to_bytes() else {
            tracing::warn!("reset_flag frame failed to encode, continuing");
            return;
        };
        if let Err(err) = self.transport.write(WriteEndpoint::Data, &wire).await {
            tracing::warn!(%err, "reset_flag write failed, continuing");
            return;
        }
        let result =
            self.bus.wait_for_frame("reset_flag", self.config.best_effort_timeout, |f| f.cmd == opcodes::FE_RESET_FLAG).await;
        if result.is_err() {
            tracing::warn!("reset_flag ack not observed within timeout, continuing");
        }
    }

    /// Phase 3: the fire-and-forget 9E control writes (time set, display
    /// settings, heartbeat, and the four auxiliary bootstrap writes). None
    /// of these expect a reply.
    async fn control_bootstrap(&self) {
        let now = CivilTime::from_unix_secs(self.env.wall_clock_secs());
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let year = now.year as u16;
        let time_set = opcodes::bootstrap::time_set(year, now.month, now.day, now.hour, now.minute);

        let writes: [&[u8]; 7] = [
            &time_set[..],
            &opcodes::bootstrap::SETTINGS[..],
            &opcodes::bootstrap::HEARTBEAT[..],
            &opcodes::bootstrap::AUX_1[..],
            &opcodes::bootstrap::AUX_2[..],
            &opcodes::bootstrap::AUX_3[..],
            &opcodes::bootstrap::AUX_4[..],
        ];
        for bytes in writes {
            if let Err(err) = self.transport.write(WriteEndpoint::Ctrl, bytes).await {
                tracing::warn!(%err, "control bootstrap write failed, continuing");
            }
        }
    }

    /// Phase 6: `ReadySignal`. Requests device info (expects a `9E …C7…`
    /// reply on the info sub-channel) and prepares the device for a session
    /// (expects a `9E E6…` ready signal on the ready sub-channel). Both are
    /// best-effort with a short timeout.
    async fn ready_signal(&self) {
        if let Err(err) = self.transport.write(WriteEndpoint::Ctrl, &opcodes::bootstrap::INFO_REQUEST).await {
            tracing::warn!(%err, "info request write failed, continuing");
        } else {
            let result = self
                .bus
                .wait_for_qix("ready_signal_info", self.config.best_effort_timeout, NotifyEndpoint::CtrlInfo, |f| {
                    f.cmd == opcodes::QIX_RET_SCREEN_INFO
                })
                .await;
            if result.is_err() {
                tracing::warn!("device info reply not observed within timeout, continuing");
            }
        }

        if let Err(err) = self.transport.write(WriteEndpoint::Ctrl, &opcodes::bootstrap::PREPARE).await {
            tracing::warn!(%err, "prepare write failed, continuing");
        } else {
            let result = self
                .bus
                .wait_for_qix("ready_signal_prepare", self.config.best_effort_timeout, NotifyEndpoint::CtrlReady, |f| {
                    f.cmd == opcodes::QIX_READY_SIGNAL
                })
                .await;
            if result.is_err() {
                tracing::warn!("ready signal not observed within timeout, continuing");
            }
        }
    }

    /// Issue one sequence-stamped FE command (`[seq] + tail`) and wait for
    /// its matching response.
    async fn fe_request(
        &self,
        phase: &'static str,
        cmd: u8,
        seq: &mut SessionSeq,
        tail: &[u8],
        timeout: Duration,
    ) -> Result<Frame> {
        let allocated = seq.next();
        let mut body = Vec::with_capacity(1 + tail.len());
        body.push(allocated);
        body.extend_from_slice(tail);

        let request = Frame::new(FrameFlag::Command, cmd, body);
        let wire = request.to_bytes().map_err(ledbadge_core::CoreError::from)?;
        self.transport.write(WriteEndpoint::Data, &wire).await.map_err(ClientError::from)?;

        self.bus
            .wait_for_frame(phase, timeout, move |f| f.cmd == cmd && f.flag == FrameFlag::Response)
            .await
            .map_err(ClientError::from)
    }

    /// Phases 7-10: drive the windowed data pump against incoming window
    /// ACKs until the commit window is sent, then run the completion
    /// handshake.
    async fn run_transfer(
        &self,
        mut pump: WindowedDataPump,
        mut seq: SessionSeq,
        mut ack: WindowAck,
        progress: Option<Arc<ProgressFn>>,
    ) -> Result<()> {
        let total = pump.payload_len();
        let mut bytes_sent = 0usize;

        loop {
            self.check_cancel("data_transfer")?;
            let step = pump.on_window_ack(&ack, &mut seq);

            for body in &step.frame_bodies {
                self.check_cancel("data_transfer")?;
                let frame = Frame::new(FrameFlag::Notification, opcodes::FE_DATA, body.clone());
                let wire = frame.to_bytes().map_err(ledbadge_core::CoreError::from)?;
                self.transport.write(WriteEndpoint::Data, &wire).await?;

                bytes_sent = bytes_sent.saturating_add(body.len().saturating_sub(5));
                if let Some(cb) = &progress {
                    cb(bytes_sent, total);
                }
            }

            if step.is_commit {
                let file_complete = self
                    .bus
                    .wait_for_frame("file_complete", self.config.window_completion_timeout, |f| {
                        f.cmd == opcodes::FE_FILE_COMPLETE && f.flag == FrameFlag::Command
                    })
                    .await?;
                // Already answered by the fast-path responder; dequeuing it
                // here only keeps the bus from holding onto it.
                drop(file_complete);
                return self.await_session_close().await;
            }

            self.check_cancel("data_transfer")?;
            let next = self
                .bus
                .wait_for_frame("window_or_completion", self.config.window_completion_timeout, |f| {
                    (f.cmd == opcodes::FE_WINDOW_ACK && f.flag == FrameFlag::Notification)
                        || (f.cmd == opcodes::FE_FILE_COMPLETE && f.flag == FrameFlag::Command)
                        || (f.cmd == opcodes::FE_SESSION_CLOSE && f.flag == FrameFlag::Command)
                })
                .await?;

            if next.cmd == opcodes::FE_WINDOW_ACK {
                ack = WindowAck::parse(&next.body).map_err(ledbadge_core::CoreError::from)?;
            } else if next.cmd == opcodes::FE_FILE_COMPLETE {
                return self.await_session_close().await;
            } else {
                return self.reply_session_close(&next).await;
            }
        }
    }

    async fn await_session_close(&self) -> Result<()> {
        let frame = self
            .bus
            .wait_for_frame("session_close", self.config.window_completion_timeout, |f| {
                f.cmd == opcodes::FE_SESSION_CLOSE && f.flag == FrameFlag::Command
            })
            .await?;
        self.reply_session_close(&frame).await
    }

    /// Phase 10: reply to `SESSION_CLOSE` with `[0x00, device_seq]` and
    /// translate its status byte into the upload's final outcome.
    async fn reply_session_close(&self, frame: &Frame) -> Result<()> {
        let device_seq = frame.body.first().copied().unwrap_or(0);
        let status = frame.body.get(1).copied().unwrap_or(0xFF);

        let reply = Frame::new(FrameFlag::Response, opcodes::FE_SESSION_CLOSE, vec![0x00, device_seq]);
        let wire = reply.to_bytes().map_err(ledbadge_core::CoreError::from)?;
        self.transport.write(WriteEndpoint::Data, &wire).await?;

        if status == 0x00 {
            Ok(())
        } else {
            Err(ClientError::DeviceStatus { phase: "session_close", code: status })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;
    use ledbadge_core::transport::test_support::RecordingEndpoint;
    use tokio::sync::mpsc;

    use super::*;

    #[derive(Clone)]
    struct FixedEnv {
        epoch_secs: u64,
    }

    impl BadgeEnv for FixedEnv {
        type Instant = std::time::Instant;

        fn now(&self) -> Self::Instant {
            std::time::Instant::now()
        }

        fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            tokio::time::sleep(duration)
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            buffer.fill(0xAB);
        }

        fn wall_clock_secs(&self) -> u64 {
            self.epoch_secs
        }
    }

    async fn harness() -> (
        Arc<Transport>,
        Arc<NotificationBus>,
        Arc<RecordingEndpoint>,
        Arc<RecordingEndpoint>,
        mpsc::Sender<(NotifyEndpoint, Bytes)>,
    ) {
        let data_ep = Arc::new(RecordingEndpoint::default());
        let ctrl_ep = Arc::new(RecordingEndpoint::default());
        let (transport, tx) = Transport::new(data_ep.clone(), ctrl_ep.clone());
        let transport = Arc::new(transport);
        let bus = NotificationBus::spawn(transport.clone()).await.unwrap();
        (transport, bus, data_ep, ctrl_ep, tx)
    }

    fn decode_data_writes(data_ep: &RecordingEndpoint) -> Vec<Frame> {
        data_ep.writes.lock().unwrap().iter().filter_map(|bytes| Frame::decode(bytes).ok()).collect()
    }

    async fn wait_for_write_count(ep: &RecordingEndpoint, count: usize) {
        for _ in 0..500 {
            if ep.writes.lock().unwrap().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("write count {count} not reached");
    }

    /// Drives a full upload end to end against a simulated device task that
    /// completes the auth handshake, acks every bootstrap/negotiation
    /// command, serves one non-commit window plus a commit window, and
    /// closes the session successfully.
    #[tokio::test]
    async fn full_upload_completes_and_reports_success() {
        let (transport, bus, data_ep, _ctrl_ep, tx) = harness().await;
        let connection = Arc::new(ConnectionState::new());
        let env = FixedEnv { epoch_secs: 1_717_331_696 }; // 2024-06-02 12:34:56 UTC
        let session = UploadSession::new(transport, bus, connection, env, UploadConfig::default());

        let device = {
            let tx = tx.clone();
            let data_ep = data_ep.clone();
            tokio::spawn(async move {
                // Auth handshake.
                wait_for_write_count(&data_ep, 1).await;
                let mut device_hello = vec![0x01];
                device_hello.extend_from_slice(&[0u8; 16]);
                tx.send((NotifyEndpoint::Data, Bytes::from(device_hello))).await.unwrap();

                wait_for_write_count(&data_ep, 2).await;
                let challenge = [0x42u8; 16];
                let mut msg = vec![0x00];
                msg.extend_from_slice(&challenge);
                tx.send((NotifyEndpoint::Data, Bytes::from(msg))).await.unwrap();

                wait_for_write_count(&data_ep, 3).await;
                tx.send((NotifyEndpoint::Data, Bytes::from_static(b"\x02pass"))).await.unwrap();

                // ResetFlag ack (best-effort, content not validated).
                wait_for_write_count(&data_ep, 4).await;
                let ack = Frame::new(FrameFlag::Response, opcodes::FE_RESET_FLAG, vec![0x00]);
                tx.send((NotifyEndpoint::Data, ack.to_bytes().unwrap())).await.unwrap();

                // InfoQuery ack.
                wait_for_write_count(&data_ep, 5).await;
                let ack = Frame::new(FrameFlag::Response, opcodes::FE_INFO_QUERY, vec![0x00, 0x01]);
                tx.send((NotifyEndpoint::Data, ack.to_bytes().unwrap())).await.unwrap();

                // ConfigQuery ack.
                wait_for_write_count(&data_ep, 6).await;
                let ack = Frame::new(FrameFlag::Response, opcodes::FE_CONFIG_QUERY, vec![0x00, 0x02]);
                tx.send((NotifyEndpoint::Data, ack.to_bytes().unwrap())).await.unwrap();

                // SessionOpen ack.
                wait_for_write_count(&data_ep, 7).await;
                let ack = Frame::new(FrameFlag::Response, opcodes::FE_SESSION_OPEN, vec![0x00, 0x03]);
                tx.send((NotifyEndpoint::Data, ack.to_bytes().unwrap())).await.unwrap();

                // TransferParams ack.
                wait_for_write_count(&data_ep, 8).await;
                let ack = Frame::new(FrameFlag::Response, opcodes::FE_TRANSFER_PARAMS, vec![0x00, 0x04, 0x00, 0x01]);
                tx.send((NotifyEndpoint::Data, ack.to_bytes().unwrap())).await.unwrap();

                // Metadata ack, proposing a 490-byte chunk.
                wait_for_write_count(&data_ep, 9).await;
                let ack = Frame::new(FrameFlag::Response, opcodes::FE_METADATA, vec![0x00, 0x05, 0x01, 0xEA]);
                tx.send((NotifyEndpoint::Data, ack.to_bytes().unwrap())).await.unwrap();

                // First window ack: serve the whole 700-byte payload in one
                // non-commit window, then the device asks for the commit
                // resend of the first 490 bytes.
                let window_ack = Frame::new(
                    FrameFlag::Notification,
                    opcodes::FE_WINDOW_ACK,
                    vec![0x01, 0x00, 0x02, 0xBC, 0x00, 0x00, 0x00, 0x00],
                );
                tx.send((NotifyEndpoint::Data, window_ack.to_bytes().unwrap())).await.unwrap();

                // Two data frames expected for the first window (490 + 210
                // bytes, chunked at 490), so wait for 9+2=11 writes total.
                wait_for_write_count(&data_ep, 11).await;
                let commit_ack = Frame::new(
                    FrameFlag::Notification,
                    opcodes::FE_WINDOW_ACK,
                    vec![0x02, 0x00, 0x01, 0xEA, 0x00, 0x00, 0x00, 0x00],
                );
                tx.send((NotifyEndpoint::Data, commit_ack.to_bytes().unwrap())).await.unwrap();

                // Commit frame is write #12; the device then raises
                // FILE_COMPLETE and, after the fast path answers it,
                // SESSION_CLOSE with a success status.
                wait_for_write_count(&data_ep, 12).await;
                let file_complete = Frame::new(FrameFlag::Command, opcodes::FE_FILE_COMPLETE, vec![0x06]);
                tx.send((NotifyEndpoint::Data, file_complete.to_bytes().unwrap())).await.unwrap();

                // Fast path answers FILE_COMPLETE as write #13.
                wait_for_write_count(&data_ep, 13).await;
                let session_close = Frame::new(FrameFlag::Command, opcodes::FE_SESSION_CLOSE, vec![0x07, 0x00]);
                tx.send((NotifyEndpoint::Data, session_close.to_bytes().unwrap())).await.unwrap();
            })
        };

        let progress_calls = Arc::new(std::sync::Mutex::new(Vec::new()));
        let progress = {
            let progress_calls = progress_calls.clone();
            let cb: Arc<ProgressFn> = Arc::new(move |sent, total| {
                progress_calls.lock().unwrap().push((sent, total));
            });
            cb
        };

        let payload = vec![0xCDu8; 700];
        let result = session.upload_with_progress(payload, UploadKind::Still, Some(progress)).await;
        device.await.unwrap();

        assert!(result.is_ok(), "upload should complete: {result:?}");
        assert!(!progress_calls.lock().unwrap().is_empty(), "progress callback should fire");

        let writes = decode_data_writes(&data_ep);
        let file_complete_reply =
            writes.iter().find(|f| f.cmd == opcodes::FE_FILE_COMPLETE && f.flag == FrameFlag::Response).unwrap();
        assert_eq!(file_complete_reply.body[0], 0x00);
        assert_eq!(file_complete_reply.body[1], 0x06);
        let path_utf16: Vec<u16> = file_complete_reply.body[2..file_complete_reply.body.len() - 2]
            .chunks(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        let path = String::from_utf16(&path_utf16).unwrap();
        assert_eq!(path, "\u{555C}20240602123456.jpg");

        let session_close_reply =
            writes.iter().find(|f| f.cmd == opcodes::FE_SESSION_CLOSE && f.flag == FrameFlag::Response).unwrap();
        assert_eq!(&session_close_reply.body[..], &[0x00, 0x07]);
    }

    #[tokio::test]
    async fn non_zero_session_close_status_is_reported_as_device_status() {
        let (transport, bus, data_ep, _ctrl_ep, _tx) = harness().await;
        let connection = Arc::new(ConnectionState::new());
        connection.mark_authenticated();
        let env = FixedEnv { epoch_secs: 0 };
        let session = UploadSession::new(transport, bus.clone(), connection, env, UploadConfig::default());

        let frame = Frame::new(FrameFlag::Command, opcodes::FE_SESSION_CLOSE, vec![0x09, 0x02]);
        let result = session.reply_session_close(&frame).await;
        assert!(matches!(result, Err(ClientError::DeviceStatus { phase: "session_close", code: 0x02 })));

        let writes = decode_data_writes(&data_ep);
        assert_eq!(writes.len(), 1);
        assert_eq!(&writes[0].body[..], &[0x00, 0x09]);
    }

    #[tokio::test]
    async fn cancellation_before_authentication_short_circuits() {
        let (transport, bus, data_ep, _ctrl_ep, _tx) = harness().await;
        let connection = Arc::new(ConnectionState::new());
        let env = FixedEnv { epoch_secs: 0 };
        let session = UploadSession::new(transport, bus, connection, env, UploadConfig::default());
        session.cancel_handle().cancel();

        let result = session.upload(vec![0u8; 16], UploadKind::Still).await;
        assert!(matches!(result, Err(ClientError::Cancelled { phase: "authenticating" })));
        assert!(data_ep.writes.lock().unwrap().is_empty(), "no wire traffic once already cancelled");
    }

    #[tokio::test]
    async fn empty_payload_is_rejected_before_any_wire_traffic() {
        let (transport, bus, data_ep, _ctrl_ep, _tx) = harness().await;
        let connection = Arc::new(ConnectionState::new());
        let env = FixedEnv { epoch_secs: 0 };
        let session = UploadSession::new(transport, bus, connection, env, UploadConfig::default());

        let result = session.upload(Vec::new(), UploadKind::Still).await;
        assert!(matches!(result, Err(ClientError::EmptyPayload)));
        assert!(data_ep.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversize_payload_is_rejected_before_any_wire_traffic() {
        let (transport, bus, data_ep, _ctrl_ep, _tx) = harness().await;
        let connection = Arc::new(ConnectionState::new());
        let env = FixedEnv { epoch_secs: 0 };
        let config = UploadConfig { max_payload_size: 10, ..UploadConfig::default() };
        let session = UploadSession::new(transport, bus, connection, env, config);

        let result = session.upload(vec![0u8; 11], UploadKind::Still).await;
        assert!(matches!(result, Err(ClientError::SizeLimit { len: 11, max: 10 })));
        assert!(data_ep.writes.lock().unwrap().is_empty());
    }

    #[test]
    fn path_response_matches_documented_scenario() {
        let body = build_path_response(0x06, 1_717_331_696, UploadKind::Still);
        assert_eq!(body[0], 0x00);
        assert_eq!(body[1], 0x06);
        assert_eq!(&body[body.len() - 2..], &[0x00, 0x00]);

        let utf16: Vec<u16> = body[2..body.len() - 2].chunks(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
        let path = String::from_utf16(&utf16).unwrap();
        assert_eq!(path, "\u{555C}20240602123456.jpg");
    }

    #[test]
    fn path_response_uses_avi_extension_for_animation() {
        let body = build_path_response(0x01, 0, UploadKind::Animation);
        let utf16: Vec<u16> = body[2..body.len() - 2].chunks(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
        let path = String::from_utf16(&utf16).unwrap();
        assert!(path.ends_with(".avi"));
    }

    #[test]
    fn check_status_accepts_zero_and_rejects_nonzero() {
        assert!(check_status("probe", &[0x00, 0x01]).is_ok());
        assert!(matches!(
            check_status("probe", &[0x02]),
            Err(ClientError::DeviceStatus { phase: "probe", code: 0x02 })
        ));
        assert!(matches!(
            check_status("probe", &[]),
            Err(ClientError::DeviceStatus { phase: "probe", code: 0xFF })
        ));
    }
}
