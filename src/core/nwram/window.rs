// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Per-CPU new-WRAM windows (MBK6-MBK8)
//!
//! Each CPU configures, for every bank, the address range the bank appears
//! at and how many low slot-index bits of the address are significant.
//!
//! ```text
//! MBK6 (bank A):   28-20 end  | 13-12 size | 11-4 start    (64KB units)
//! MBK7/8 (B, C):   28-19 end  | 13-12 size | 11-3 start    (32KB units)
//! ```
//!
//! Addresses are relative to 0x03000000; `end` is exclusive.

use super::bank::Bank;
use serde::{Deserialize, Serialize};

/// Base of the shared WRAM address region
pub const NWRAM_REGION_BASE: u32 = 0x0300_0000;

/// Decoded window of one bank for one CPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WindowDescriptor {
    /// First address inside the window
    pub start: u32,
    /// First address past the window
    pub end: u32,
    /// Mask applied to the slot index derived from the address
    pub mask: u32,
}

impl WindowDescriptor {
    /// Decode a raw MBK6/MBK7/MBK8 value for `bank`
    pub fn decode(bank: Bank, raw: u32) -> Self {
        let size_code = (raw >> 12) & 0x3;
        match bank {
            Bank::A => Self {
                start: NWRAM_REGION_BASE + (((raw >> 4) & 0xFF) << 16),
                end: NWRAM_REGION_BASE + (((raw >> 20) & 0x1FF) << 16),
                mask: match size_code {
                    0 | 1 => 0x0,
                    2 => 0x1,
                    3 => 0x3,
                    _ => 0x0,
                },
            },
            Bank::B | Bank::C => Self {
                start: NWRAM_REGION_BASE + (((raw >> 3) & 0x1FF) << 15),
                end: NWRAM_REGION_BASE + (((raw >> 19) & 0x3FF) << 15),
                mask: match size_code {
                    0 => 0x0,
                    1 => 0x1,
                    2 => 0x3,
                    3 => 0x7,
                    _ => 0x0,
                },
            },
        }
    }

    /// Check whether `addr` lies inside the window
    #[inline(always)]
    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.start && addr < self.end
    }

    /// Slot index selected by `addr` inside a window of `bank`
    #[inline(always)]
    pub fn slot_index(&self, bank: Bank, addr: u32) -> usize {
        ((addr >> bank.segment_shift()) & self.mask) as usize
    }

    /// Check that the mask can only select existing slots of `bank`
    pub fn is_well_formed(&self, bank: Bank) -> bool {
        (self.mask as usize) < bank.slot_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_bank_a() {
        // start 0x03000000, end 0x03040000, size code 3
        let w = WindowDescriptor::decode(Bank::A, 0x0040_3000);
        assert_eq!(w.start, 0x0300_0000);
        assert_eq!(w.end, 0x0304_0000);
        assert_eq!(w.mask, 0x3);

        // start field = 0x08 -> 0x03080000
        let w = WindowDescriptor::decode(Bank::A, 0x00C0_2080);
        assert_eq!(w.start, 0x0308_0000);
        assert_eq!(w.end, 0x030C_0000);
        assert_eq!(w.mask, 0x1);
    }

    #[test]
    fn test_bank_a_size_codes() {
        let masks: Vec<u32> = (0..4)
            .map(|code| WindowDescriptor::decode(Bank::A, code << 12).mask)
            .collect();
        assert_eq!(masks, vec![0, 0, 1, 3]);
    }

    #[test]
    fn test_bank_bc_size_codes() {
        for bank in [Bank::B, Bank::C] {
            let masks: Vec<u32> = (0..4)
                .map(|code| WindowDescriptor::decode(bank, code << 12).mask)
                .collect();
            assert_eq!(masks, vec![0, 1, 3, 7]);
        }
    }

    #[test]
    fn test_decode_bank_bc_fields() {
        // start field 0x10 (32KB units) -> 0x03080000, end field 0x18 -> 0x030C0000
        let raw = (0x18 << 19) | (0x3 << 12) | (0x10 << 3);
        let w = WindowDescriptor::decode(Bank::B, raw);
        assert_eq!(w.start, 0x0308_0000);
        assert_eq!(w.end, 0x030C_0000);
        assert_eq!(w.mask, 0x7);
    }

    #[test]
    fn test_contains_end_exclusive() {
        let w = WindowDescriptor::decode(Bank::A, 0x0040_3000);
        assert!(w.contains(0x0300_0000));
        assert!(w.contains(0x0303_FFFF));
        assert!(!w.contains(0x0304_0000));
        assert!(!w.contains(0x02FF_FFFF));
    }

    #[test]
    fn test_empty_window_contains_nothing() {
        let w = WindowDescriptor::decode(Bank::C, 0);
        assert_eq!(w.start, w.end);
        assert!(!w.contains(0x0300_0000));
    }

    #[test]
    fn test_slot_index_aliasing() {
        // Two-slot window over a four-segment range: slots alias every 128KB
        let w = WindowDescriptor::decode(Bank::A, 0x0040_2000);
        assert_eq!(w.slot_index(Bank::A, 0x0300_0000), 0);
        assert_eq!(w.slot_index(Bank::A, 0x0301_0000), 1);
        assert_eq!(w.slot_index(Bank::A, 0x0302_0000), 0);
        assert_eq!(w.slot_index(Bank::A, 0x0303_0000), 1);
    }

    #[test]
    fn test_masks_always_well_formed() {
        for bank in Bank::ALL {
            for code in 0..4u32 {
                assert!(WindowDescriptor::decode(bank, code << 12).is_well_formed(bank));
            }
        }
    }
}
