// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Slot descriptors and per-owner mapping tables
//!
//! Every new-WRAM segment has an 8-bit descriptor (MBK1-MBK5 bytes):
//!
//! ```text
//! Bank A:    7  | 6-4 | 3-2  | 1 | 0
//!            En |  -  | Slot | - | Owner (0=ARM9, 1=ARM7)
//!
//! Bank B/C:  7  | 6-5 | 4-2  | 1-0
//!            En |  -  | Slot | Owner (0=ARM9, 1=ARM7, 2/3=DSP)
//! ```
//!
//! For banks B and C, owner 3 aliases owner 2: bit 0 is cleared whenever
//! bit 1 is set, so raw values `0x82` and `0x83` select the same cell.
//!
//! A mapping table cell holds the segment number currently occupying it, or
//! `None` when unmapped. Cells only ever name segments of their own bank.

use super::bank::Bank;
use serde::{Deserialize, Serialize};

/// Descriptor enable bit
pub const DESCRIPTOR_ENABLE: u8 = 0x80;

/// Bit in the write-protect register (MBK9) guarding a segment
#[inline(always)]
pub const fn write_protect_bit(bank: Bank, segment: usize) -> u32 {
    let base = match bank {
        Bank::A => 0,
        Bank::B => 8,
        Bank::C => 16,
    };
    1 << (base + segment)
}

/// Writable bits of the write-protect register
pub const WRITE_PROTECT_MASK: u32 = 0x00FF_FF0F;

/// Decoded target of an enabled descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotAssignment {
    /// Owner table index (0 = ARM9, 1 = ARM7, 2 = DSP)
    pub owner: usize,
    /// Cell index within the owner table
    pub slot: usize,
}

/// Raw 8-bit segment descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SlotDescriptor(pub u8);

impl SlotDescriptor {
    #[inline(always)]
    pub const fn is_enabled(self) -> bool {
        self.0 & DESCRIPTOR_ENABLE != 0
    }

    /// Decode the (owner, slot) cell this descriptor targets in `bank`
    ///
    /// Returns `None` for disabled descriptors.
    pub const fn decode(self, bank: Bank) -> Option<SlotAssignment> {
        if !self.is_enabled() {
            return None;
        }

        let raw = self.0;
        match bank {
            Bank::A => Some(SlotAssignment {
                owner: (raw & 0x01) as usize,
                slot: ((raw >> 2) & 0x3) as usize,
            }),
            Bank::B | Bank::C => {
                let raw = if raw & 0x02 != 0 { raw & 0xFE } else { raw };
                Some(SlotAssignment {
                    owner: (raw & 0x03) as usize,
                    slot: ((raw >> 2) & 0x7) as usize,
                })
            }
        }
    }
}

/// Mapping tables of one bank, indexed `[owner][slot]`
pub type OwnerTables = [[Option<u8>; Bank::MAX_SLOTS]; Bank::MAX_OWNERS];

/// Mapping tables of all three banks
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MappingTables {
    tables: [OwnerTables; 3],
}

impl MappingTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unmap every cell
    pub fn clear(&mut self) {
        self.tables = Default::default();
    }

    /// Segment occupying a cell, if any
    #[inline(always)]
    pub fn get(&self, bank: Bank, owner: usize, slot: usize) -> Option<u8> {
        self.tables[bank.index()][owner][slot]
    }

    /// All owner tables of a bank
    pub fn bank(&self, bank: Bank) -> &OwnerTables {
        &self.tables[bank.index()]
    }

    /// Point a cell at a segment, replacing any previous occupant
    pub(super) fn set(&mut self, bank: Bank, cell: SlotAssignment, segment: u8) {
        self.tables[bank.index()][cell.owner][cell.slot] = Some(segment);
    }

    /// Unmap a cell only if `segment` still occupies it
    ///
    /// Returns `true` when the cell was cleared.
    pub(super) fn clear_if_occupied_by(
        &mut self,
        bank: Bank,
        cell: SlotAssignment,
        segment: u8,
    ) -> bool {
        let entry = &mut self.tables[bank.index()][cell.owner][cell.slot];
        if *entry == Some(segment) {
            *entry = None;
            true
        } else {
            false
        }
    }

    /// Check that every cell names an existing segment of its bank
    pub fn is_well_formed(&self) -> bool {
        Bank::ALL.iter().all(|&bank| {
            self.tables[bank.index()].iter().all(|owner| {
                owner
                    .iter()
                    .flatten()
                    .all(|&segment| (segment as usize) < bank.segment_count())
            })
        })
    }
}
