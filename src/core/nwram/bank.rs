// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! New-WRAM bank store
//!
//! Three 256KB physical RAM banks, split into fixed-size segments. A segment
//! is the unit the slot mapper assigns to a CPU mapping table.
//!
//! | Bank | Size  | Segments | Segment size |
//! |------|-------|----------|--------------|
//! | A    | 256KB | 4        | 64KB         |
//! | B    | 256KB | 8        | 32KB         |
//! | C    | 256KB | 8        | 32KB         |
//!
//! The store has no access control of its own. Callers address it by
//! `(bank, offset)` pairs resolved through the mapping tables, and all
//! multi-byte accesses are little-endian.

use serde::{Deserialize, Serialize};

/// Size of every new-WRAM bank in bytes
pub const BANK_SIZE: usize = 0x40000;

/// One of the three new-WRAM banks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bank {
    A,
    B,
    C,
}

impl Bank {
    /// All banks in window priority order
    pub const ALL: [Bank; 3] = [Bank::A, Bank::B, Bank::C];

    /// Number of owner tables a descriptor can target (ARM9, ARM7, and DSP for B/C)
    pub const MAX_OWNERS: usize = 3;

    /// Largest slot count of any owner table
    pub const MAX_SLOTS: usize = 8;

    #[inline(always)]
    pub const fn index(self) -> usize {
        match self {
            Bank::A => 0,
            Bank::B => 1,
            Bank::C => 2,
        }
    }

    /// Number of segments in this bank
    #[inline(always)]
    pub const fn segment_count(self) -> usize {
        match self {
            Bank::A => 4,
            Bank::B | Bank::C => 8,
        }
    }

    /// log2 of the segment size, also the address shift selecting a slot
    #[inline(always)]
    pub const fn segment_shift(self) -> u32 {
        match self {
            Bank::A => 16,
            Bank::B | Bank::C => 15,
        }
    }

    #[inline(always)]
    pub const fn segment_size(self) -> usize {
        1 << self.segment_shift()
    }

    /// Mask selecting the offset within one segment
    #[inline(always)]
    pub const fn segment_mask(self) -> u32 {
        (1 << self.segment_shift()) - 1
    }

    /// Number of owner tables descriptors of this bank can target
    pub const fn owner_count(self) -> usize {
        match self {
            Bank::A => 2,
            Bank::B | Bank::C => 3,
        }
    }

    /// Number of slots in each owner table of this bank
    pub const fn slot_count(self) -> usize {
        match self {
            Bank::A => 4,
            Bank::B | Bank::C => 8,
        }
    }

    /// Byte offset of a segment within the bank
    #[inline(always)]
    pub const fn segment_offset(self, segment: usize) -> usize {
        segment << self.segment_shift()
    }

    pub const fn letter(self) -> char {
        match self {
            Bank::A => 'A',
            Bank::B => 'B',
            Bank::C => 'C',
        }
    }
}

/// Physical storage for the three new-WRAM banks
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankStore {
    banks: [Vec<u8>; 3],
}

impl BankStore {
    /// Create a zero-filled bank store
    pub fn new() -> Self {
        Self {
            banks: [
                vec![0u8; BANK_SIZE],
                vec![0u8; BANK_SIZE],
                vec![0u8; BANK_SIZE],
            ],
        }
    }

    /// Zero all three banks
    pub fn clear(&mut self) {
        for bank in &mut self.banks {
            bank.fill(0);
        }
    }

    /// Raw contents of a bank
    pub fn bank(&self, bank: Bank) -> &[u8] {
        &self.banks[bank.index()]
    }

    /// Mutable raw contents of a bank
    pub fn bank_mut(&mut self, bank: Bank) -> &mut [u8] {
        &mut self.banks[bank.index()]
    }

    /// Check that every bank has the fixed device size
    ///
    /// Only deserialized stores can violate this.
    pub fn is_well_formed(&self) -> bool {
        self.banks.iter().all(|b| b.len() == BANK_SIZE)
    }

    #[inline(always)]
    pub fn read8(&self, bank: Bank, offset: usize) -> u8 {
        self.banks[bank.index()][offset]
    }

    #[inline(always)]
    pub fn read16(&self, bank: Bank, offset: usize) -> u16 {
        let mem = &self.banks[bank.index()];
        u16::from_le_bytes([mem[offset], mem[offset + 1]])
    }

    #[inline(always)]
    pub fn read32(&self, bank: Bank, offset: usize) -> u32 {
        let mem = &self.banks[bank.index()];
        u32::from_le_bytes([
            mem[offset],
            mem[offset + 1],
            mem[offset + 2],
            mem[offset + 3],
        ])
    }

    #[inline(always)]
    pub fn write8(&mut self, bank: Bank, offset: usize, value: u8) {
        self.banks[bank.index()][offset] = value;
    }

    #[inline(always)]
    pub fn write16(&mut self, bank: Bank, offset: usize, value: u16) {
        self.banks[bank.index()][offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    #[inline(always)]
    pub fn write32(&mut self, bank: Bank, offset: usize, value: u32) {
        self.banks[bank.index()][offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }
}

impl Default for BankStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BankStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BankStore")
            .field("bank_size", &BANK_SIZE)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bank_geometry() {
        for bank in Bank::ALL {
            assert_eq!(bank.segment_count() * bank.segment_size(), BANK_SIZE);
            assert!(bank.slot_count() <= Bank::MAX_SLOTS);
            assert!(bank.owner_count() <= Bank::MAX_OWNERS);
        }
        assert_eq!(Bank::A.segment_size(), 0x10000);
        assert_eq!(Bank::B.segment_size(), 0x8000);
        assert_eq!(Bank::C.segment_mask(), 0x7FFF);
        assert_eq!(Bank::A.segment_offset(3), 0x30000);
        assert_eq!(Bank::B.segment_offset(7), 0x38000);
    }

    #[test]
    fn test_read_write_little_endian() {
        let mut store = BankStore::new();
        store.write32(Bank::B, 0x100, 0x12345678);
        assert_eq!(store.read8(Bank::B, 0x100), 0x78);
        assert_eq!(store.read8(Bank::B, 0x103), 0x12);
        assert_eq!(store.read16(Bank::B, 0x102), 0x1234);

        store.write16(Bank::C, 0x3FFFE, 0xBEEF);
        assert_eq!(store.bank(Bank::C)[0x3FFFE], 0xEF);
        assert_eq!(store.bank(Bank::C)[0x3FFFF], 0xBE);
    }

    #[test]
    fn test_banks_are_independent() {
        let mut store = BankStore::new();
        store.write8(Bank::A, 0, 0xAA);
        assert_eq!(store.read8(Bank::B, 0), 0);
        assert_eq!(store.read8(Bank::C, 0), 0);
    }

    #[test]
    fn test_clear() {
        let mut store = BankStore::new();
        store.bank_mut(Bank::A).fill(0xFF);
        store.clear();
        assert!(store.bank(Bank::A).iter().all(|&b| b == 0));
        assert!(store.is_well_formed());
    }
}
