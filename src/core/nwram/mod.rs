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

//! DSi new-WRAM (NWRAM) bank switching unit
//!
//! The new-WRAM consists of three 256KB banks (A, B, C). Each segment of a
//! bank is assigned to an (owner, slot) cell through its descriptor byte, and
//! each CPU opens a window per bank in the 0x03000000 region. An access
//! inside a window selects a slot from the address bits and reaches whatever
//! segment currently occupies that slot.
//!
//! # MBK Registers
//!
//! | Index | Address    | Contents                              | Shared |
//! |-------|------------|---------------------------------------|--------|
//! | 0     | 0x04004040 | MBK1: bank A descriptors 0-3          | yes    |
//! | 1     | 0x04004044 | MBK2: bank B descriptors 0-3          | yes    |
//! | 2     | 0x04004048 | MBK3: bank B descriptors 4-7          | yes    |
//! | 3     | 0x0400404C | MBK4: bank C descriptors 0-3          | yes    |
//! | 4     | 0x04004050 | MBK5: bank C descriptors 4-7          | yes    |
//! | 5     | 0x04004054 | MBK6: bank A window                   | no     |
//! | 6     | 0x04004058 | MBK7: bank B window                   | no     |
//! | 7     | 0x0400405C | MBK8: bank C window                   | no     |
//! | 8     | 0x04004060 | MBK9: write protect                   | yes    |
//!
//! Shared registers hold the same value in both CPU views. Window registers
//! are private to each CPU.
//!
//! # Example
//!
//! ```
//! use dsirx::core::nwram::{Bank, NewWram, WindowLookup};
//! use dsirx::core::Cpu;
//!
//! let mut nwram = NewWram::new();
//! nwram.set_window(Cpu::Arm9, Bank::A, 0x0040_3000);
//! nwram.assign_segment(Bank::A, 2, 0x80);
//!
//! assert_eq!(
//!     nwram.lookup(Cpu::Arm9, 0x0300_0010),
//!     WindowLookup::Mapped { bank: Bank::A, offset: 0x20010 }
//! );
//! ```

use crate::core::Cpu;
use serde::{Deserialize, Serialize};

mod bank;
mod slot;
mod window;

pub use bank::{Bank, BankStore, BANK_SIZE};
pub use slot::{
    write_protect_bit, MappingTables, OwnerTables, SlotAssignment, SlotDescriptor,
    DESCRIPTOR_ENABLE, WRITE_PROTECT_MASK,
};
pub use window::{WindowDescriptor, NWRAM_REGION_BASE};

/// Number of MBK registers per CPU view
pub const MBK_COUNT: usize = 9;

/// Index of the write-protect register (MBK9)
pub const MBK_WRITE_PROTECT: usize = 8;

/// Index of the first window register (MBK6)
pub const MBK_WINDOW_BASE: usize = 5;

/// Result of resolving an address against a CPU's windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowLookup {
    /// Address lies outside every window
    Miss,
    /// Address hits a window whose selected slot is empty
    OpenBus,
    /// Address resolves to a byte offset inside a bank
    Mapped { bank: Bank, offset: usize },
}

/// New-WRAM state: bank contents, MBK registers, windows and mapping tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWram {
    /// Physical bank contents
    store: BankStore,

    /// MBK1-MBK9 as seen by each CPU, indexed `[cpu][register]`
    mbk: [[u32; MBK_COUNT]; 2],

    /// Decoded windows, indexed `[cpu][bank]`
    windows: [[WindowDescriptor; 3]; 2],

    /// Segment occupying each (owner, slot) cell
    tables: MappingTables,
}

impl NewWram {
    /// Create a new-WRAM unit with zeroed banks and every mapping disabled
    pub fn new() -> Self {
        Self {
            store: BankStore::new(),
            mbk: [[0; MBK_COUNT]; 2],
            windows: [[WindowDescriptor::default(); 3]; 2],
            tables: MappingTables::new(),
        }
    }

    /// Return to the power-on state
    ///
    /// Zeroes the banks and disables every descriptor, window and mapping.
    pub fn reset(&mut self) {
        self.store.clear();
        self.mbk = [[0; MBK_COUNT]; 2];
        self.windows = [[WindowDescriptor::default(); 3]; 2];
        self.tables.clear();
    }

    /// MBK register and byte shift holding the descriptor of a segment
    #[inline(always)]
    const fn descriptor_location(bank: Bank, segment: usize) -> (usize, u32) {
        match bank {
            Bank::A => (0, 8 * segment as u32),
            Bank::B => (1 + (segment >> 2), 8 * (segment & 3) as u32),
            Bank::C => (3 + (segment >> 2), 8 * (segment & 3) as u32),
        }
    }

    /// Current raw descriptor of a segment
    pub fn descriptor(&self, bank: Bank, segment: usize) -> SlotDescriptor {
        if segment >= bank.segment_count() {
            return SlotDescriptor::default();
        }
        let (index, shift) = Self::descriptor_location(bank, segment);
        SlotDescriptor((self.mbk[0][index] >> shift) as u8)
    }

    /// Assign a segment to the cell named by `descriptor`
    ///
    /// Write-protected segments and unchanged descriptors are left alone. The
    /// cell the old descriptor occupied is only cleared if it still points at
    /// this segment; the new cell is overwritten unconditionally.
    pub fn assign_segment(&mut self, bank: Bank, segment: usize, descriptor: u8) {
        if segment >= bank.segment_count() {
            return;
        }

        if self.mbk[0][MBK_WRITE_PROTECT] & write_protect_bit(bank, segment) != 0 {
            log::warn!(
                "NWRAM-{} segment {} is write-protected (MBK9={:08X}), descriptor {:02X} ignored",
                bank.letter(),
                segment,
                self.mbk[0][MBK_WRITE_PROTECT],
                descriptor
            );
            return;
        }

        let old = self.descriptor(bank, segment);
        let new = SlotDescriptor(descriptor);
        if old == new {
            return;
        }

        let (index, shift) = Self::descriptor_location(bank, segment);
        let word = crate::core::memory::write_sub_byte(self.mbk[0][index], shift / 8, descriptor);
        self.mbk[0][index] = word;
        self.mbk[1][index] = word;

        let segment_id = segment as u8;
        if let Some(cell) = old.decode(bank) {
            self.tables.clear_if_occupied_by(bank, cell, segment_id);
        }
        if let Some(cell) = new.decode(bank) {
            self.tables.set(bank, cell, segment_id);
        }

        log::trace!(
            "NWRAM-{} segment {} descriptor {:02X} -> {:02X}",
            bank.letter(),
            segment,
            old.0,
            descriptor
        );
    }

    /// Reconfigure one bank window of one CPU from a raw MBK6-MBK8 value
    pub fn set_window(&mut self, cpu: Cpu, bank: Bank, raw: u32) {
        let index = MBK_WINDOW_BASE + bank.index();
        if self.mbk[cpu.index()][index] == raw {
            return;
        }
        self.mbk[cpu.index()][index] = raw;

        let window = WindowDescriptor::decode(bank, raw);
        log::debug!(
            "NWRAM-{}: {} range {:08X}-{:08X}, size {}",
            bank.letter(),
            cpu,
            window.start,
            window.end,
            (raw >> 12) & 0x3
        );
        self.windows[cpu.index()][bank.index()] = window;
    }

    /// Current window of one bank for one CPU
    pub fn window(&self, cpu: Cpu, bank: Bank) -> WindowDescriptor {
        self.windows[cpu.index()][bank.index()]
    }

    /// Write-protect register (MBK9)
    pub fn write_protect(&self) -> u32 {
        self.mbk[0][MBK_WRITE_PROTECT]
    }

    /// Store the write-protect register in both CPU views
    pub fn set_write_protect(&mut self, value: u32) {
        let value = value & WRITE_PROTECT_MASK;
        self.mbk[0][MBK_WRITE_PROTECT] = value;
        self.mbk[1][MBK_WRITE_PROTECT] = value;
    }

    /// Raw MBK register as seen by `cpu`
    ///
    /// Out-of-range indices read as zero.
    #[inline(always)]
    pub fn mbk(&self, cpu: Cpu, index: usize) -> u32 {
        self.mbk[cpu.index()].get(index).copied().unwrap_or(0)
    }

    /// Mapping tables of every bank
    pub fn tables(&self) -> &MappingTables {
        &self.tables
    }

    /// Physical bank storage
    pub fn store(&self) -> &BankStore {
        &self.store
    }

    /// Mutable physical bank storage
    pub fn store_mut(&mut self) -> &mut BankStore {
        &mut self.store
    }

    /// Resolve `addr` against the windows of `cpu`
    ///
    /// Windows are tested in bank order A, B, C; the first window containing
    /// the address decides the outcome.
    #[inline]
    pub fn lookup(&self, cpu: Cpu, addr: u32) -> WindowLookup {
        let windows = &self.windows[cpu.index()];
        for bank in Bank::ALL {
            let window = &windows[bank.index()];
            if !window.contains(addr) {
                continue;
            }

            let slot = window.slot_index(bank, addr);
            return match self.tables.get(bank, cpu.index(), slot) {
                Some(segment) => WindowLookup::Mapped {
                    bank,
                    offset: bank.segment_offset(segment as usize)
                        | (addr & bank.segment_mask()) as usize,
                },
                None => WindowLookup::OpenBus,
            };
        }
        WindowLookup::Miss
    }

    /// Apply the new-WRAM settings a boot loader hands over
    ///
    /// `mbk` holds MBK1-MBK5, the ARM9 MBK6-MBK8, the ARM7 MBK6-MBK8 and
    /// MBK9, in that order.
    pub fn apply_boot_settings(&mut self, mbk: &[u32; 12]) {
        self.set_write_protect(0);

        for segment in 0..4 {
            self.assign_segment(Bank::A, segment, (mbk[0] >> (8 * segment)) as u8);
        }
        for segment in 0..8 {
            let word = mbk[1 + (segment >> 2)];
            self.assign_segment(Bank::B, segment, (word >> (8 * (segment & 3))) as u8);
        }
        for segment in 0..8 {
            let word = mbk[3 + (segment >> 2)];
            self.assign_segment(Bank::C, segment, (word >> (8 * (segment & 3))) as u8);
        }

        for bank in Bank::ALL {
            self.set_window(Cpu::Arm9, bank, mbk[5 + bank.index()]);
            self.set_window(Cpu::Arm7, bank, mbk[8 + bank.index()]);
        }

        self.set_write_protect(mbk[11]);
    }

    /// Check invariants a deserialized state must satisfy
    pub fn is_well_formed(&self) -> bool {
        self.store.is_well_formed()
            && self.tables.is_well_formed()
            && Cpu::ALL.iter().all(|&cpu| {
                Bank::ALL
                    .iter()
                    .all(|&bank| self.window(cpu, bank).is_well_formed(bank))
            })
    }
}

impl Default for NewWram {
    fn default() -> Self {
        Self::new()
    }
}
