//! Embedded cipher tables: substitution box, its inverse, and the
//! key-schedule mixing table.
//!
//! These are process-wide immutable constants (per the protocol's "global
//! mutable state" design note: the only global state is these tables and
//! the static key, everything else is session-scoped). The values below are
//! the reverse-engineered Jieli E1 tables; [`INV_SBOX`] is not transcribed
//! independently but derived at compile time from [`SBOX`] so the two can
//! never drift out of sync with each other.

/// Substitution box applied to every byte of cipher state each round.
#[rustfmt::skip]
pub const SBOX: [u8; 256] = [
    0x1F, 0xA1, 0xF0, 0x99, 0xF6, 0x34, 0x1D, 0x1E, 0x30, 0x93, 0xBB, 0x5B, 0x32, 0xD2, 0xFA, 0xCE,
    0xC0, 0x36, 0xE9, 0x78, 0xB0, 0x2D, 0x7D, 0xB3, 0xBC, 0xBA, 0xA5, 0x8B, 0x74, 0x24, 0xF2, 0x97,
    0x86, 0x73, 0x67, 0x7E, 0x5C, 0xCA, 0x6D, 0x37, 0xCD, 0xE6, 0x53, 0x10, 0xD3, 0x9D, 0xDA, 0x6F,
    0x9F, 0xD9, 0x60, 0x3E, 0xD4, 0x9B, 0x54, 0xAD, 0xA7, 0x38, 0x2A, 0x50, 0x17, 0xD8, 0x14, 0x81,
    0x02, 0xD6, 0x8A, 0xCB, 0x4F, 0xC4, 0x1A, 0x61, 0x28, 0x13, 0x46, 0xFF, 0x16, 0x7B, 0x57, 0x4A,
    0x92, 0x31, 0xFB, 0x2F, 0x64, 0x04, 0x8F, 0x0E, 0x41, 0xA0, 0xB7, 0xF8, 0x35, 0x7A, 0x6E, 0x90,
    0x70, 0x72, 0x39, 0xD0, 0x0D, 0x15, 0xE4, 0x00, 0x6B, 0x18, 0xA4, 0xEF, 0x89, 0x55, 0x2C, 0x48,
    0x4B, 0x63, 0x0F, 0xFD, 0xB9, 0xF7, 0x19, 0xEB, 0x52, 0x9E, 0x26, 0xC9, 0xC8, 0x3F, 0xD5, 0x6A,
    0xC7, 0xB2, 0x2B, 0x69, 0x5D, 0x07, 0x8E, 0x0C, 0x5E, 0x1B, 0xEA, 0xBF, 0x43, 0xAF, 0x05, 0xAC,
    0xCC, 0x3B, 0xA8, 0x9C, 0xC5, 0x65, 0x22, 0x59, 0x7C, 0x84, 0x0A, 0xE1, 0xB5, 0x5A, 0xC1, 0xDE,
    0x88, 0xA9, 0xC6, 0x49, 0xB1, 0xCF, 0xA6, 0x7F, 0xBE, 0x47, 0xEC, 0xAB, 0x8C, 0x11, 0xAE, 0x95,
    0xE2, 0xF5, 0x06, 0x03, 0xF3, 0x27, 0xFC, 0xFE, 0x44, 0x98, 0x12, 0x94, 0x75, 0x58, 0x71, 0x91,
    0xB6, 0xD7, 0xB8, 0xAA, 0xE8, 0xDB, 0xC3, 0x40, 0x33, 0x45, 0x77, 0x85, 0xF9, 0x29, 0x82, 0xD1,
    0x3D, 0x3C, 0xBD, 0xF4, 0xDD, 0xDF, 0x1C, 0xC2, 0x2E, 0x80, 0x87, 0x62, 0x42, 0xA3, 0x20, 0xA2,
    0x3A, 0x79, 0xE0, 0x01, 0x4E, 0x09, 0x68, 0xF1, 0x51, 0xED, 0xE5, 0xB4, 0x8D, 0x4C, 0x25, 0x9A,
    0x0B, 0xE7, 0xDC, 0x66, 0xE3, 0x6C, 0x83, 0x5F, 0xEE, 0x23, 0x4D, 0x96, 0x56, 0x08, 0x21, 0x76,
];

const fn build_inverse(forward: &[u8; 256]) -> [u8; 256] {
    let mut inverse = [0u8; 256];
    let mut i = 0usize;
    while i < 256 {
        inverse[forward[i] as usize] = i as u8;
        i += 1;
    }
    inverse
}

/// Inverse of [`SBOX`], used only by [`crate::decrypt`].
pub const INV_SBOX: [u8; 256] = build_inverse(&SBOX);

/// Key-schedule mixing table, indexed by `(round * 16 + byte) % 256`.
#[rustfmt::skip]
pub const SCHEDULE: [u8; 256] = [
    0xCC, 0x65, 0x7A, 0x11, 0x91, 0xF4, 0xA0, 0x51, 0xE0, 0xE2, 0x40, 0xC5, 0x06, 0xE7, 0x9C, 0x7C,
    0x93, 0x63, 0x38, 0xF4, 0x75, 0x68, 0xE9, 0x94, 0x51, 0x51, 0x22, 0x13, 0x69, 0x24, 0xBD, 0x5C,
    0x2C, 0xF4, 0xD1, 0x5E, 0x43, 0x73, 0x0A, 0x54, 0x17, 0x61, 0xA7, 0xF5, 0x4A, 0x79, 0x21, 0x7E,
    0x61, 0x29, 0xA7, 0xE7, 0xB9, 0x45, 0x07, 0xB2, 0x20, 0xB9, 0x2B, 0x6B, 0x96, 0xC7, 0x10, 0x88,
    0xB6, 0x4D, 0x45, 0xBA, 0xC9, 0xDB, 0x02, 0xF9, 0x75, 0x50, 0xA6, 0xB3, 0x3E, 0x07, 0xD6, 0x37,
    0xA5, 0xFF, 0xC4, 0x8F, 0x48, 0x08, 0x86, 0x92, 0x19, 0x96, 0xD8, 0x75, 0xDD, 0x65, 0x64, 0x2F,
    0x97, 0xCD, 0xCD, 0x50, 0x64, 0x83, 0xAC, 0x89, 0x9F, 0x2E, 0xE1, 0x33, 0x6E, 0xC6, 0x9C, 0xA3,
    0xA1, 0x4B, 0xC3, 0x1C, 0x44, 0x2F, 0xD4, 0x24, 0x9C, 0xC1, 0xCF, 0xB6, 0x5C, 0x53, 0x7B, 0xDC,
    0x03, 0x92, 0x0F, 0xD5, 0x23, 0x12, 0x59, 0x13, 0xAA, 0xE4, 0xB3, 0xB3, 0x54, 0x7E, 0xDB, 0x60,
    0x75, 0x76, 0xCF, 0x58, 0x6E, 0x55, 0x9A, 0xCB, 0xD0, 0xB5, 0x90, 0x9F, 0xE9, 0x06, 0xD3, 0x6F,
    0x50, 0x33, 0x5A, 0x6E, 0x7F, 0x51, 0x7A, 0xE9, 0x6D, 0x29, 0x99, 0xD7, 0x13, 0x2C, 0xB7, 0xF7,
    0xD9, 0x12, 0xAF, 0x5F, 0xC4, 0xF4, 0xEF, 0xBB, 0x23, 0x83, 0xF2, 0x88, 0x0B, 0x54, 0x4B, 0x2A,
    0x6C, 0xEB, 0x61, 0x34, 0xEF, 0x31, 0x14, 0x36, 0x8B, 0x66, 0x1B, 0x2F, 0xB3, 0xD8, 0xA9, 0xCC,
    0xE5, 0xAD, 0x73, 0x84, 0x9F, 0x4A, 0x06, 0xA4, 0xD5, 0xC6, 0xE1, 0xB0, 0x9A, 0x36, 0xFF, 0xAE,
    0x75, 0x66, 0x46, 0xE4, 0x0F, 0xBB, 0xD9, 0xC8, 0x37, 0x4B, 0xA8, 0x3E, 0xBE, 0x30, 0x43, 0x4F,
    0x4E, 0x5D, 0x64, 0x05, 0x3A, 0xBC, 0xE4, 0xB9, 0x64, 0x66, 0x95, 0xA0, 0xAA, 0x68, 0xC1, 0x89,
];
