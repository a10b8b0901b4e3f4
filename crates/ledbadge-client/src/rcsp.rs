//! Auxiliary RCSP operations: generic request/response over the data
//! endpoint (FE, `flag=0xC0`) plus the two 9E status queries on the
//! control endpoint.
//!
//! The distilled protocol notes this crate is built from name each FE
//! opcode's parameters but do not give a byte-exact TLV attribute layout
//! for `GetTargetInfo`/`GetSysInfo`/`StartFileBrowse`/`SmallFile` response
//! bodies (only that they carry "a TLV attribute list" or "directory
//! entries"). Rather than invent a layout with no capture to check it
//! against, these methods return the response body verbatim past its
//! leading status byte; callers that know their device's attribute
//! encoding can parse further. The two 9E ops and `GetTargetFeatureMap`
//! *are* given exact layouts and are decoded in full.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use ledbadge_core::{
    ConnectionState, NotificationBus, Transport,
    connection::RcspSeq,
    transport::{NotifyEndpoint, WriteEndpoint},
};
use ledbadge_proto::{Frame, FrameFlag, QixFlags, QixFrame, opcodes};

use crate::error::{ClientError, Result};

/// Generic request/response client for the auxiliary RCSP FE ops and the
/// two 9E status queries, sharing the connection's sequence counters.
pub struct RcspClient {
    transport: Arc<Transport>,
    bus: Arc<NotificationBus>,
    timeout: Duration,
}

impl RcspClient {
    /// Build a client over an already-authenticated transport/bus pair.
    #[must_use]
    pub fn new(transport: Arc<Transport>, bus: Arc<NotificationBus>, timeout: Duration) -> Self {
        Self { transport, bus, timeout }
    }

    async fn request(&self, seq: &RcspSeq, cmd: u8, params: &[u8]) -> Result<Bytes> {
        let allocated = seq.next();
        let mut body = Vec::with_capacity(1 + params.len());
        body.push(allocated);
        body.extend_from_slice(params);

        let request = Frame::new(FrameFlag::Command, cmd, body);
        let wire = request.to_bytes().map_err(ledbadge_core::CoreError::from)?;
        self.transport.write(WriteEndpoint::Data, &wire).await.map_err(ClientError::from)?;

        let reply = self
            .bus
            .wait_for_frame("rcsp request", self.timeout, |f| {
                f.cmd == cmd && f.flag == FrameFlag::Response
            })
            .await
            .map_err(ClientError::from)?;

        Ok(reply.body)
    }

    /// `0x02 GetTargetFeatureMap` — returns the device's 32-bit feature
    /// mask from the last four bytes of the response.
    ///
    /// # Errors
    ///
    /// Propagates transport/timeout errors.
    pub async fn get_target_feature_map(&self, seq: &RcspSeq) -> Result<u32> {
        let body = self.request(seq, opcodes::RCSP_GET_TARGET_FEATURE_MAP, &[]).await?;
        let tail = body.len().saturating_sub(4);
        let mask_bytes: [u8; 4] = body[tail..].try_into().unwrap_or([0; 4]);
        Ok(u32::from_be_bytes(mask_bytes))
    }

    /// `0x03 GetTargetInfo(mask, platform)` — returns the raw TLV
    /// attribute-list body past the leading status byte.
    ///
    /// # Errors
    ///
    /// Propagates transport/timeout errors.
    pub async fn get_target_info(&self, seq: &RcspSeq, mask: u32, platform: u8) -> Result<Bytes> {
        let mut params = Vec::with_capacity(5);
        params.extend_from_slice(&mask.to_be_bytes());
        params.push(platform);
        self.request(seq, opcodes::RCSP_GET_TARGET_INFO, &params).await
    }

    /// `0x07 GetSysInfo(function, mask)` — returns the raw TLV
    /// attribute-list body.
    ///
    /// # Errors
    ///
    /// Propagates transport/timeout errors.
    pub async fn get_sys_info(&self, seq: &RcspSeq, function: u8, mask: u32) -> Result<Bytes> {
        let mut params = Vec::with_capacity(5);
        params.push(function);
        params.extend_from_slice(&mask.to_be_bytes());
        self.request(seq, opcodes::RCSP_GET_SYS_INFO, &params).await
    }

    /// `0x0C StartFileBrowse` — returns the raw directory-entry body.
    ///
    /// # Errors
    ///
    /// Propagates transport/timeout errors.
    #[allow(clippy::too_many_arguments)]
    pub async fn start_file_browse(
        &self,
        seq: &RcspSeq,
        browse_type: u8,
        read_num: u8,
        start_index: u16,
        dev_handler: u32,
        path: &[u8],
    ) -> Result<Bytes> {
        let mut params = Vec::with_capacity(9 + path.len());
        params.push(browse_type);
        params.push(read_num);
        params.extend_from_slice(&start_index.to_be_bytes());
        params.extend_from_slice(&dev_handler.to_be_bytes());
        #[allow(clippy::cast_possible_truncation)]
        params.extend_from_slice(&(path.len() as u16).to_le_bytes());
        params.extend_from_slice(path);
        self.request(seq, opcodes::RCSP_START_FILE_BROWSE, &params).await
    }

    /// `0x0D StopFileBrowse`.
    ///
    /// # Errors
    ///
    /// Propagates transport/timeout errors.
    pub async fn stop_file_browse(&self, seq: &RcspSeq) -> Result<()> {
        self.request(seq, opcodes::RCSP_STOP_FILE_BROWSE, &[]).await?;
        Ok(())
    }

    /// `0x28 SmallFile` — query/read/delete the small-file KV store.
    /// `sub_op` is one of [`opcodes::SMALL_FILE_OP_QUERY`],
    /// [`opcodes::SMALL_FILE_OP_READ`], [`opcodes::SMALL_FILE_OP_DELETE`].
    ///
    /// # Errors
    ///
    /// Propagates transport/timeout errors.
    pub async fn small_file(&self, seq: &RcspSeq, sub_op: u8, file_type: u8, extra: &[u8]) -> Result<Bytes> {
        let mut params = Vec::with_capacity(2 + extra.len());
        params.push(sub_op);
        params.push(file_type);
        params.extend_from_slice(extra);
        self.request(seq, opcodes::RCSP_SMALL_FILE, &params).await
    }

    async fn qix_request(
        &self,
        serial: u8,
        cmd: u8,
        payload: &[u8],
        expect_cmd: u8,
        source: NotifyEndpoint,
    ) -> Result<QixFrame> {
        let request = QixFrame::new(QixFlags::request(serial), cmd, payload.to_vec());
        let wire = request.to_bytes().map_err(ledbadge_core::CoreError::from)?;
        self.transport.write(WriteEndpoint::Ctrl, &wire).await.map_err(ClientError::from)?;

        self.bus
            .wait_for_qix("qix request", self.timeout, source, |f| f.cmd == expect_cmd)
            .await
            .map_err(ClientError::from)
    }

    /// `0x29 ReqData(0x80)` → `0x27 RetBatteryData [status, level]`.
    ///
    /// # Errors
    ///
    /// Propagates transport/timeout errors.
    pub async fn req_data(&self, state: &ConnectionState) -> Result<(u8, u8)> {
        let serial = state.qix_seq.next();
        let frame = self
            .qix_request(
                serial,
                opcodes::QIX_REQ_DATA,
                &[0x80],
                opcodes::QIX_RET_BATTERY_DATA,
                NotifyEndpoint::CtrlOther,
            )
            .await?;
        if frame.payload.len() < 2 {
            return Err(ClientError::from(ledbadge_core::CoreError::Unavailable(
                "RetBatteryData body too short".to_owned(),
            )));
        }
        Ok((frame.payload[0], frame.payload[1]))
    }

    /// `0xC6 ReqScreenInfo(0x01)` → `0xC7 RetScreenInfo`.
    ///
    /// # Errors
    ///
    /// Propagates transport/timeout errors.
    pub async fn req_screen_info(&self, state: &ConnectionState) -> Result<ScreenInfo> {
        let serial = state.qix_seq.next();
        let frame = self
            .qix_request(
                serial,
                opcodes::QIX_REQ_SCREEN_INFO,
                &[0x01],
                opcodes::QIX_RET_SCREEN_INFO,
                NotifyEndpoint::CtrlInfo,
            )
            .await?;
        ScreenInfo::parse(&frame.payload).ok_or_else(|| {
            ClientError::from(ledbadge_core::CoreError::Unavailable("RetScreenInfo body too short".to_owned()))
        })
    }
}

/// Decoded `RetScreenInfo` (`9E …C7…`) payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenInfo {
    /// Screen width in pixels.
    pub width: u16,
    /// Screen height in pixels.
    pub height: u16,
    /// Picture-area width in pixels.
    pub picture_width: u16,
    /// Picture-area height in pixels.
    pub picture_height: u16,
    /// Available memory, in bytes.
    pub memory: u32,
}

impl ScreenInfo {
    fn parse(payload: &[u8]) -> Option<Self> {
        if payload.len() < 13 {
            return None;
        }
        Some(Self {
            width: u16::from_le_bytes([payload[1], payload[2]]),
            height: u16::from_le_bytes([payload[3], payload[4]]),
            picture_width: u16::from_le_bytes([payload[5], payload[6]]),
            picture_height: u16::from_le_bytes([payload[7], payload[8]]),
            memory: u32::from_le_bytes([payload[9], payload[10], payload[11], payload[12]]),
        })
    }
}
