// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! DSi AES engine register surface (ARM7 only)
//!
//! # Registers
//!
//! | Address               | Register           | Access |
//! |-----------------------|--------------------|--------|
//! | 0x04004400            | AES_CNT            | R/W    |
//! | 0x04004404            | AES_BLKCNT         | W      |
//! | 0x04004408            | AES_WRFIFO         | W      |
//! | 0x0400440C            | AES_RDFIFO         | R      |
//! | 0x04004420-0x0400442F | AES_IV             | W      |
//! | 0x04004430-0x0400443F | AES_MAC            | W      |
//! | 0x04004440-0x040044FF | AES_KEY0-3         | W      |
//!
//! The key area holds four slots of 0x30 bytes, each made of a 16-byte
//! normal key, key X and key Y, in that order.
//!
//! The cipher itself is an external collaborator behind [`AesEngine`].

/// Control register
pub const AES_CNT: u32 = 0x0400_4400;
/// Block count register
pub const AES_BLKCNT: u32 = 0x0400_4404;
/// Input FIFO
pub const AES_WRFIFO: u32 = 0x0400_4408;
/// Output FIFO
pub const AES_RDFIFO: u32 = 0x0400_440C;

/// IV register range
pub const AES_IV: std::ops::Range<u32> = 0x0400_4420..0x0400_4430;
/// MAC register range
pub const AES_MAC: std::ops::Range<u32> = 0x0400_4430..0x0400_4440;
/// Key slot range
pub const AES_KEYS: std::ops::Range<u32> = 0x0400_4440..0x0400_4500;

/// Bytes per key slot
const KEY_SLOT_SIZE: u32 = 0x30;

/// Key material held by a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Normal,
    X,
    Y,
}

/// Location of a key register write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRegister {
    /// Key slot (0-3)
    pub slot: usize,
    pub kind: KeyKind,
    /// Byte offset within the 16-byte key
    pub offset: u32,
}

impl KeyRegister {
    /// Decompose a byte offset into the key area (0x00-0xBF)
    ///
    /// # Example
    ///
    /// ```
    /// use dsirx::core::aes::{KeyKind, KeyRegister};
    ///
    /// let reg = KeyRegister::decode(0x30 + 0x14).unwrap();
    /// assert_eq!(reg.slot, 1);
    /// assert_eq!(reg.kind, KeyKind::X);
    /// assert_eq!(reg.offset, 4);
    /// ```
    pub fn decode(offset: u32) -> Option<Self> {
        // Offsets 0x30, 0x60 and 0x90 are the first normal-key word of slots
        // 1-3. Some emulators drop writes there; they are routed here.
        let slot = offset / KEY_SLOT_SIZE;
        if slot >= 4 {
            return None;
        }

        let within = offset % KEY_SLOT_SIZE;
        let kind = match within >> 4 {
            0 => KeyKind::Normal,
            1 => KeyKind::X,
            _ => KeyKind::Y,
        };
        Some(Self {
            slot: slot as usize,
            kind,
            offset: within & 0xF,
        })
    }
}

/// AES engine as seen by the register bus
///
/// `mask` selects the bytes of `value` being written.
pub trait AesEngine {
    fn read_cnt(&mut self) -> u32;
    fn read_output_fifo(&mut self) -> u32;
    fn write_cnt(&mut self, value: u32);
    fn write_block_count(&mut self, value: u32);
    fn write_input_fifo(&mut self, value: u32);
    fn write_iv(&mut self, offset: u32, value: u32, mask: u32);
    fn write_mac(&mut self, offset: u32, value: u32, mask: u32);
    fn write_key(&mut self, slot: usize, kind: KeyKind, offset: u32, value: u32, mask: u32);
    fn reset(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_slot_boundaries() {
        for slot in 0..4u32 {
            let base = slot * KEY_SLOT_SIZE;
            let normal = KeyRegister::decode(base).unwrap();
            assert_eq!(normal.slot, slot as usize);
            assert_eq!(normal.kind, KeyKind::Normal);
            assert_eq!(normal.offset, 0);

            let y = KeyRegister::decode(base + 0x2C).unwrap();
            assert_eq!(y.slot, slot as usize);
            assert_eq!(y.kind, KeyKind::Y);
            assert_eq!(y.offset, 0xC);
        }
    }

    #[test]
    fn test_decode_exact_slot_start() {
        // 0x30 is the first byte of slot 1, not the tail of slot 0
        let reg = KeyRegister::decode(0x30).unwrap();
        assert_eq!(reg.slot, 1);
        assert_eq!(reg.kind, KeyKind::Normal);
    }

    #[test]
    fn test_decode_covers_whole_key_area() {
        let len = AES_KEYS.end - AES_KEYS.start;
        for offset in (0..len).step_by(4) {
            assert!(KeyRegister::decode(offset).is_some());
        }
        assert!(KeyRegister::decode(len).is_none());
    }
}
