//! FE command opcodes and the literal 9E bootstrap write templates.
//!
//! These are wire constants, not behavior — the session and pump layers
//! decide when to use them.

/// Reset the device's auth flag. Fixed literal body `02 00 01`.
pub const FE_RESET_FLAG: u8 = 0x06;
/// Device info query; response is a 125-byte body.
pub const FE_INFO_QUERY: u8 = 0x03;
/// Device config query; response is a 56-byte body.
pub const FE_CONFIG_QUERY: u8 = 0x07;
/// Open an upload session.
pub const FE_SESSION_OPEN: u8 = 0x21;
/// Negotiate transfer parameters.
pub const FE_TRANSFER_PARAMS: u8 = 0x27;
/// Send file metadata (size, CRC, name); response carries the chunk size.
pub const FE_METADATA: u8 = 0x1B;
/// Device-originated window ACK.
pub const FE_WINDOW_ACK: u8 = 0x1D;
/// Outbound data frame.
pub const FE_DATA: u8 = 0x01;
/// FILE_COMPLETE: device asks, host replies with the destination path.
pub const FE_FILE_COMPLETE: u8 = 0x20;
/// SESSION_CLOSE: device reports final status.
pub const FE_SESSION_CLOSE: u8 = 0x1C;

/// The literal 3-byte Phase-1 `ResetFlag` request body.
///
/// Captures occasionally show a 2-byte `00 01` variant; this workspace
/// always sends the documented 3-byte form.
pub const RESET_FLAG_BODY: [u8; 3] = [0x02, 0x00, 0x01];

/// RCSP request opcode: target feature map (32-bit mask response).
pub const RCSP_GET_TARGET_FEATURE_MAP: u8 = 0x02;
/// RCSP request opcode: target info (TLV attribute list response).
pub const RCSP_GET_TARGET_INFO: u8 = 0x03;
/// RCSP request opcode: system info (TLV attribute list response).
pub const RCSP_GET_SYS_INFO: u8 = 0x07;
/// RCSP request opcode: begin browsing a file listing.
pub const RCSP_START_FILE_BROWSE: u8 = 0x0C;
/// RCSP request opcode: stop browsing a file listing.
pub const RCSP_STOP_FILE_BROWSE: u8 = 0x0D;
/// RCSP request opcode: small-file KV store query/read/delete.
pub const RCSP_SMALL_FILE: u8 = 0x28;

/// Small-file sub-operation: query existence / size.
pub const SMALL_FILE_OP_QUERY: u8 = 0x00;
/// Small-file sub-operation: read contents.
pub const SMALL_FILE_OP_READ: u8 = 0x01;
/// Small-file sub-operation: delete.
pub const SMALL_FILE_OP_DELETE: u8 = 0x04;

/// 9E control opcode: request battery/data status.
pub const QIX_REQ_DATA: u8 = 0x29;
/// 9E control opcode: battery/data status response.
pub const QIX_RET_BATTERY_DATA: u8 = 0x27;
/// 9E control opcode: request screen info.
pub const QIX_REQ_SCREEN_INFO: u8 = 0xC6;
/// 9E control opcode: screen info response.
pub const QIX_RET_SCREEN_INFO: u8 = 0xC7;
/// 9E control opcode: bootstrap "prepare" write, sent on the control
/// endpoint while readying the device for a session.
pub const QIX_PREPARE: u8 = 0xDC;
/// 9E control opcode: the device's "ready" signal following a `PREPARE`
/// write, delivered on the ready notify sub-channel.
pub const QIX_READY_SIGNAL: u8 = 0xE6;

/// A literal 9E bootstrap write: fully pre-baked wire bytes, sent verbatim.
///
/// These six writes carry fixed bodies the device expects during
/// `ControlBootstrap`/`InfoQuery`/`ReadySignal`; only the time-set write is
/// parameterized (by the current date/time), the rest are constant.
pub mod bootstrap {
    /// `9E 20 08 16 01 00 01` — push default display settings.
    pub const SETTINGS: [u8; 7] = [0x9E, 0x20, 0x08, 0x16, 0x01, 0x00, 0x01];
    /// `9E B5 0B 29 01 00 80` — heartbeat.
    pub const HEARTBEAT: [u8; 7] = [0x9E, 0xB5, 0x0B, 0x29, 0x01, 0x00, 0x80];
    /// `9E D3 0B C6 01 00 01` — request device info (expects a `9E …C7…`
    /// notification on the info endpoint).
    pub const INFO_REQUEST: [u8; 7] = [0x9E, 0xD3, 0x0B, 0xC6, 0x01, 0x00, 0x01];
    /// `9E F4 0B DC 01 00 0C` — prepare (expects a `9E E6 …` ready signal on
    /// the ready endpoint).
    pub const PREPARE: [u8; 7] = [0x9E, 0xF4, 0x0B, 0xDC, 0x01, 0x00, 0x0C];
    /// `9E BD 0B 60 0D 00 03` — auxiliary bootstrap write.
    pub const AUX_1: [u8; 7] = [0x9E, 0xBD, 0x0B, 0x60, 0x0D, 0x00, 0x03];
    /// `9E 30 08 20 02 00 FF 07` — auxiliary bootstrap write.
    pub const AUX_2: [u8; 8] = [0x9E, 0x30, 0x08, 0x20, 0x02, 0x00, 0xFF, 0x07];
    /// `9E 2B 08 FF 02 00 22 00` — auxiliary bootstrap write.
    pub const AUX_3: [u8; 8] = [0x9E, 0x2B, 0x08, 0xFF, 0x02, 0x00, 0x22, 0x00];
    /// `9E 2D 08 FF 02 00 24 00` — auxiliary bootstrap write.
    pub const AUX_4: [u8; 8] = [0x9E, 0x2D, 0x08, 0xFF, 0x02, 0x00, 0x24, 0x00];

    /// Build the "time set" write for a given UTC date/time: `9E 45 08 02
    /// 07 00 [yr_lo yr_hi] [mo] [day] 00 [hr] [min]`.
    ///
    /// The leading `9E 45` magic/checksum pair is reproduced as published;
    /// the checksum byte is not recomputed here since the exact checksum
    /// algorithm used for this pre-baked template is not independently
    /// verifiable in this workspace (see `qix::QixFrame` for the checksum
    /// this workspace computes on frames it builds itself).
    #[must_use]
    pub fn time_set(year: u16, month: u8, day: u8, hour: u8, minute: u8) -> [u8; 13] {
        let [yr_lo, yr_hi] = year.to_le_bytes();
        [0x9E, 0x45, 0x08, 0x02, 0x07, 0x00, yr_lo, yr_hi, month, day, 0x00, hour, minute]
    }
}
