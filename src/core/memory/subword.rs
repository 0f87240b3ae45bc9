// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Sub-word access to word-backed registers
//!
//! Most DSi control registers are 32 bits wide but can be read or written a
//! byte or halfword at a time. Fields are laid out little-endian, so byte 0
//! is bits 0-7 and halfword 1 is bits 16-31.

/// Extract byte `index` (0-3) of a word
#[inline(always)]
pub const fn read_sub_byte(word: u32, index: u32) -> u8 {
    (word >> (8 * (index & 3))) as u8
}

/// Extract halfword `index` (0-1) of a word
#[inline(always)]
pub const fn read_sub_half(word: u32, index: u32) -> u16 {
    (word >> (16 * (index & 1))) as u16
}

/// Replace byte `index` (0-3) of a word, leaving the other bytes intact
#[inline(always)]
pub const fn write_sub_byte(word: u32, index: u32, value: u8) -> u32 {
    let shift = 8 * (index & 3);
    (word & !(0xFF << shift)) | ((value as u32) << shift)
}
