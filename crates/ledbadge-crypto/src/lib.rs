//! Jieli E1 block cipher and auth-handshake message primitives.
//!
//! This is a custom 16-byte Substitution-Permutation-Network block cipher
//! used by Jieli RCSP firmware to authenticate a BLE host before it is
//! allowed to drive the data channel. It is NOT AES and shares no tables
//! with it.
//!
//! # Key Lifecycle
//!
//! ```text
//! static key (16B) + schedule table (256B) + magic (8B)
//!        │
//!        ▼
//! per-round subkeys (16 rounds)
//!        │
//!        ▼
//! SubBytes (SBOX) → Permute → AddRoundKey, 16 times
//!        │
//!        ▼
//! 16-byte ciphertext block
//! ```
//!
//! The device issues a random 16-byte challenge; the host must return
//! `encrypt(challenge, STATIC_KEY)` to prove possession of the shared key.
//! Failure is fatal to the connection (see `ledbadge_core::auth`).

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod tables;

use getrandom::getrandom;
use thiserror::Error;
use zeroize::Zeroize;

pub use tables::{INV_SBOX, SBOX, SCHEDULE};

/// Size of a cipher block and of the static key, in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Number of SPN rounds applied per block.
pub const ROUNDS: usize = 16;

/// Static key shared between every badge and every host implementation.
///
/// This is not a secret in the cryptographic sense (it is embedded in
/// firmware and in every host SDK) — it exists to distinguish conforming
/// hosts from arbitrary BLE clients, not to provide confidentiality.
pub const STATIC_KEY: [u8; BLOCK_SIZE] =
    [0x6B, 0xE9, 0xB2, 0xC0, 0x83, 0xD9, 0x4A, 0x1E, 0x5A, 0xF8, 0x9C, 0x4E, 0x7B, 0x6D, 0x3F, 0x20];

/// Key-schedule magic, folded into every round subkey.
pub const SCHEDULE_MAGIC: [u8; 8] = [0xB3, 0xA1, 0xD7, 0xE9, 0x4C, 0x2F, 0x85, 0x60];

/// Fixed byte-permutation applied after substitution in each round.
///
/// `PERMUTE[i]` is the source index feeding destination byte `i`. This is a
/// valid permutation of `0..16` by construction (checked in tests).
const PERMUTE: [usize; BLOCK_SIZE] = [5, 14, 2, 11, 8, 1, 12, 7, 0, 9, 15, 4, 13, 6, 3, 10];

/// Inverse of [`PERMUTE`], computed at build time from the forward table.
const fn invert_permute() -> [usize; BLOCK_SIZE] {
    let mut inv = [0usize; BLOCK_SIZE];
    let mut i = 0;
    while i < BLOCK_SIZE {
        inv[PERMUTE[i]] = i;
        i += 1;
    }
    inv
}

const INV_PERMUTE: [usize; BLOCK_SIZE] = invert_permute();

/// Errors from the crypto layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The OS entropy source failed to fill the requested buffer.
    #[error("failed to obtain random bytes: {0}")]
    Rng(String),
}

/// Derive the 16 round subkeys for `key` from [`SCHEDULE`] and
/// [`SCHEDULE_MAGIC`].
fn key_schedule(key: &[u8; BLOCK_SIZE]) -> [[u8; BLOCK_SIZE]; ROUNDS] {
    let mut round_keys = [[0u8; BLOCK_SIZE]; ROUNDS];
    for (r, round_key) in round_keys.iter_mut().enumerate() {
        for (j, byte) in round_key.iter_mut().enumerate() {
            let table_index = (r * BLOCK_SIZE + j) % SCHEDULE.len();
            *byte = key[j] ^ SCHEDULE[table_index] ^ SCHEDULE_MAGIC[j % SCHEDULE_MAGIC.len()];
        }
    }
    round_keys
}

/// Encrypt one 16-byte block under `key` using 16 rounds of
/// substitute-permute-addkey.
///
/// Deterministic and independent of host endianness: all arithmetic is
/// byte-wise.
#[must_use]
pub fn encrypt(block: &[u8; BLOCK_SIZE], key: &[u8; BLOCK_SIZE]) -> [u8; BLOCK_SIZE] {
    let round_keys = key_schedule(key);
    let mut state = *block;

    for round_key in &round_keys {
        let mut substituted = [0u8; BLOCK_SIZE];
        for (i, byte) in state.iter().enumerate() {
            substituted[i] = SBOX[*byte as usize];
        }

        let mut permuted = [0u8; BLOCK_SIZE];
        for (dst, &src) in PERMUTE.iter().enumerate() {
            permuted[dst] = substituted[src];
        }

        for (byte, k) in permuted.iter_mut().zip(round_key.iter()) {
            *byte ^= k;
        }

        state = permuted;
    }

    state
}

/// Inverse of [`encrypt`]. Not used by the auth handshake (the host never
/// decrypts device traffic) but kept for round-trip testing of the cipher
/// core.
#[must_use]
pub fn decrypt(block: &[u8; BLOCK_SIZE], key: &[u8; BLOCK_SIZE]) -> [u8; BLOCK_SIZE] {
    let round_keys = key_schedule(key);
    let mut state = *block;

    for round_key in round_keys.iter().rev() {
        let mut unkeyed = state;
        for (byte, k) in unkeyed.iter_mut().zip(round_key.iter()) {
            *byte ^= k;
        }

        let mut unpermuted = [0u8; BLOCK_SIZE];
        for (dst, &src) in INV_PERMUTE.iter().enumerate() {
            unpermuted[dst] = unkeyed[src];
        }

        let mut unsubstituted = [0u8; BLOCK_SIZE];
        for (i, byte) in unpermuted.iter().enumerate() {
            unsubstituted[i] = INV_SBOX[*byte as usize];
        }

        state = unsubstituted;
    }

    state
}

/// Build the host's first handshake message: `[0x00] + 16 fresh random
/// bytes` sampled from the OS CSPRNG.
///
/// # Errors
///
/// Returns [`CryptoError::Rng`] only if the OS entropy source fails, which
/// should not happen in practice on a supported platform.
pub fn random_auth_message() -> Result<[u8; 17], CryptoError> {
    let mut nonce = [0u8; BLOCK_SIZE];
    getrandom(&mut nonce).map_err(|e| CryptoError::Rng(e.to_string()))?;

    let mut message = [0u8; 17];
    message[0] = 0x00;
    message[1..].copy_from_slice(&nonce);

    nonce.zeroize();
    Ok(message)
}

/// Build the host's challenge response: `[0x01] +
/// encrypt(device_challenge, STATIC_KEY)`.
#[must_use]
pub fn challenge_response(device_challenge: &[u8; BLOCK_SIZE]) -> [u8; 17] {
    let cipher = encrypt(device_challenge, &STATIC_KEY);
    let mut message = [0u8; 17];
    message[0] = 0x01;
    message[1..].copy_from_slice(&cipher);
    message
}
