//! Windowed data transfer: pure transition logic for turning a device
//! window ACK into the data frames it authorizes, kept separate from the
//! async wait/write loop in [`crate::session`] so the framing and slot
//! arithmetic can be unit-tested without a transport or a clock.

use bytes::Bytes;
use ledbadge_proto::{WindowAck, payloads::data_frame};

/// Plain mod-256 running sequence shared by every FE request from the
/// first command after `ResetFlag` through the last data frame. Distinct
/// from [`ledbadge_core::RcspSeq`] (which skips zero and is scoped to the
/// auxiliary RCSP client): this counter never skips a value and is set
/// directly to `1` right after the `ResetFlag` write.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionSeq(u8);

impl SessionSeq {
    /// A fresh counter, value `0` (never emitted; `ResetFlag` uses a fixed
    /// literal body and then calls [`Self::set`]).
    #[must_use]
    pub fn new() -> Self {
        Self(0)
    }

    /// Jump directly to `value`, used once after the `ResetFlag` write.
    pub fn set(&mut self, value: u8) {
        self.0 = value;
    }

    /// Current value without consuming it (used to stamp the current
    /// request before advancing).
    #[must_use]
    pub fn current(&self) -> u8 {
        self.0
    }

    /// Consume the current value and advance, wrapping `255 -> 0`.
    pub fn next(&mut self) -> u8 {
        let value = self.0;
        self.0 = self.0.wrapping_add(1);
        value
    }
}

/// One step of the windowed transfer: the FE data-frame bodies to emit for
/// a single window ACK, in order.
#[derive(Debug, Clone, Default)]
pub struct PumpStep {
    /// Fully-built FE data-frame bodies (`[seq | 0x1D | slot | crc | chunk]`),
    /// ready to wrap in `Frame::new(FrameFlag::Notification, FE_DATA, body)`.
    pub frame_bodies: Vec<Vec<u8>>,
    /// Whether this step served a commit window (the final, confirming
    /// prefix resend).
    pub is_commit: bool,
}

/// Turns window ACKs into data frames against a fixed payload and
/// negotiated chunk size. Holds no transport or clock state.
#[derive(Debug)]
pub struct WindowedDataPump {
    payload: Bytes,
    chunk_size: u16,
    sent_noncommit_window: bool,
}

impl WindowedDataPump {
    /// Build a pump over `payload`, chunking at `chunk_size` bytes (the
    /// value the session adopted from the `Metadata` ACK).
    #[must_use]
    pub fn new(payload: Bytes, chunk_size: u16) -> Self {
        Self { payload, chunk_size, sent_noncommit_window: false }
    }

    /// Total payload length, used by the session to size the `Metadata`
    /// request body.
    #[must_use]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Process one window ACK, returning the data frames it authorizes and
    /// advancing `seq` once per frame.
    ///
    /// # Panics (debug only)
    ///
    /// In debug builds, panics if a commit window (`next_offset == 0,
    /// win_size <= chunk_size`) arrives before any non-commit window has
    /// been served for a payload that needed one — a payload no larger
    /// than one chunk legitimately commits on the very first window ACK,
    /// with no preceding tail window to have sent.
    pub fn on_window_ack(&mut self, ack: &WindowAck, seq: &mut SessionSeq) -> PumpStep {
        if ack.is_commit(self.chunk_size) {
            debug_assert!(
                self.sent_noncommit_window || self.payload.len() <= usize::from(self.chunk_size),
                "commit window must not arrive before any tail window has been sent"
            );
            let end = usize::from(ack.win_size).min(self.payload.len());
            let chunk = self.payload.slice(0..end);
            let body = data_frame::build(seq.next(), 0, &chunk);
            return PumpStep { frame_bodies: vec![body], is_commit: true };
        }

        self.sent_noncommit_window = true;
        let start = (ack.next_offset as usize).min(self.payload.len());
        let end = start.saturating_add(usize::from(ack.win_size)).min(self.payload.len());
        let window = self.payload.slice(start..end);

        let frame_bodies = window
            .chunks(usize::from(self.chunk_size).max(1))
            .enumerate()
            .map(|(index, chunk)| {
                #[allow(clippy::cast_possible_truncation)] // slot cycles 0..7 by construction
                let slot = (index % 8) as u8;
                data_frame::build(seq.next(), slot, chunk)
            })
            .collect();

        PumpStep { frame_bodies, is_commit: false }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn ack(wa_seq: u8, status: u8, win_size: u16, next_offset: u32) -> WindowAck {
        WindowAck { wa_seq, status, win_size, next_offset }
    }

    #[test]
    fn canonical_five_window_trace_produces_thirty_two_frames_with_final_commit() {
        let payload = vec![0xABu8; 15_647];
        let mut pump = WindowedDataPump::new(Bytes::from(payload), 490);
        let mut seq = SessionSeq::new();
        seq.set(0x06);

        let trace = [
            ack(1, 0, 3920, 490),
            ack(2, 0, 3920, 4410),
            ack(3, 0, 3920, 8330),
            ack(4, 0, 3920, 12250),
            ack(5, 0, 490, 0),
        ];

        let mut total_frames = 0;
        let mut last_seq: Option<u8> = None;
        for (i, a) in trace.iter().enumerate() {
            let step = pump.on_window_ack(a, &mut seq);
            total_frames += step.frame_bodies.len();
            if i == trace.len() - 1 {
                assert!(step.is_commit);
                assert_eq!(step.frame_bodies.len(), 1);
            } else {
                assert!(!step.is_commit);
            }
            for body in &step.frame_bodies {
                if let Some(prev) = last_seq {
                    assert_eq!(body[0], prev.wrapping_add(1));
                }
                last_seq = Some(body[0]);
            }
        }

        assert_eq!(total_frames, 32);
        assert_eq!(last_seq, Some(0x25), "commit frame seq must land on 0x25 per the documented trace");
    }

    #[test]
    fn slots_cycle_zero_through_seven_within_a_window() {
        let payload = vec![0u8; 3920];
        let mut pump = WindowedDataPump::new(Bytes::from(payload), 490);
        let mut seq = SessionSeq::new();

        let step = pump.on_window_ack(&ack(1, 0, 3920, 0), &mut seq);
        let slots: Vec<u8> = step.frame_bodies.iter().map(|b| b[2]).collect();
        assert_eq!(slots, vec![0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn each_frame_crc_covers_only_the_chunk() {
        let payload = (0..1200u32).map(|b| b as u8).collect::<Vec<_>>();
        let mut pump = WindowedDataPump::new(Bytes::from(payload.clone()), 500);
        let mut seq = SessionSeq::new();

        let step = pump.on_window_ack(&ack(1, 0, 1200, 0), &mut seq);
        let mut offset = 0usize;
        for body in &step.frame_bodies {
            let chunk = &body[5..];
            let declared_crc = u16::from_be_bytes([body[3], body[4]]);
            assert_eq!(declared_crc, ledbadge_proto::crc16_xmodem(chunk));
            assert_eq!(chunk, &payload[offset..offset + chunk.len()]);
            offset += chunk.len();
        }
        assert_eq!(offset, payload.len());
    }

    #[test]
    #[should_panic(expected = "commit window must not arrive before any tail window")]
    fn commit_window_before_any_tail_window_panics_in_debug() {
        let payload = vec![0u8; 980];
        let mut pump = WindowedDataPump::new(Bytes::from(payload), 490);
        let mut seq = SessionSeq::new();
        pump.on_window_ack(&ack(1, 0, 490, 0), &mut seq);
    }

    #[test]
    fn commit_window_first_and_only_is_accepted_for_single_chunk_payload() {
        let payload = vec![0u8; 300];
        let mut pump = WindowedDataPump::new(Bytes::from(payload), 490);
        let mut seq = SessionSeq::new();
        let step = pump.on_window_ack(&ack(1, 0, 300, 0), &mut seq);
        assert!(step.is_commit);
        assert_eq!(step.frame_bodies.len(), 1);
    }

    #[test]
    fn session_seq_wraps_without_skipping() {
        let mut seq = SessionSeq::new();
        seq.set(254);
        assert_eq!(seq.next(), 254);
        assert_eq!(seq.next(), 255);
        assert_eq!(seq.next(), 0);
        assert_eq!(seq.next(), 1);
    }

    proptest! {
        #[test]
        fn total_bytes_sent_across_a_full_run_covers_the_payload(
            chunk_size in 1u16..2000,
            extra in 1usize..20_000,
        ) {
            // `payload_len` strictly exceeds `chunk_size` so the first
            // window ack is never itself mistaken for a commit window.
            let payload_len = usize::from(chunk_size) + extra;
            let payload = vec![0x42u8; payload_len];
            let mut pump = WindowedDataPump::new(Bytes::from(payload), chunk_size);
            let mut seq = SessionSeq::new();

            let win_size = chunk_size.saturating_mul(8).max(1);
            let mut offset: usize = 0;
            let mut total = 0usize;

            loop {
                let remaining = payload_len - offset;
                #[allow(clippy::cast_possible_truncation)]
                let a = if offset != 0 && remaining <= usize::from(chunk_size) {
                    ack(0, 0, remaining as u16, 0)
                } else {
                    let this_win = usize::from(win_size).min(remaining) as u16;
                    ack(0, 0, this_win, offset as u32)
                };

                let step = pump.on_window_ack(&a, &mut seq);
                for body in &step.frame_bodies {
                    total += body.len() - 5;
                }

                if step.is_commit {
                    break;
                }
                offset += usize::from(a.win_size);
            }

            prop_assert!(total >= payload_len, "every byte must be covered at least once across windows");
        }
    }
}
