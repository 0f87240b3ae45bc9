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

//! Memory region identification
//!
//! The two CPUs decode the top address bits differently. The ARM9 decodes
//! whole 16MB regions; the ARM7 decodes 8MB halves, so only the lower half of
//! its 0x03xxxxxx region is shared WRAM (the upper half is its private WRAM,
//! handled by the base bus).

use super::Bus;
use crate::core::base::{BaseBus, FastRegion, MAIN_RAM_SIZE};
use crate::core::Cpu;

/// Region an access is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryRegion {
    /// Shared WRAM region, resolved through the new-WRAM windows
    SharedWram,
    /// Memory-mapped I/O registers
    IO,
    /// Anything else, forwarded to the base bus
    Base,
}

/// Bulk region a caller may access directly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemRegion {
    /// Which backing buffer to use
    pub region: FastRegion,
    /// Mask applied to an address to get the offset into the buffer
    pub mask: u32,
}

/// Shared WRAM region code
pub const SHARED_WRAM_REGION: u32 = 0x0300_0000;

/// I/O region code
pub const IO_REGION: u32 = 0x0400_0000;

/// Address bits decoded to select a region
#[inline(always)]
pub const fn region_mask(cpu: Cpu) -> u32 {
    match cpu {
        Cpu::Arm9 => 0xFF00_0000,
        Cpu::Arm7 => 0xFF80_0000,
    }
}

/// Identify the region an access by `cpu` at `addr` belongs to
///
/// # Example
///
/// ```
/// use dsirx::core::memory::{identify_region, MemoryRegion};
/// use dsirx::core::Cpu;
///
/// assert_eq!(identify_region(Cpu::Arm9, 0x0380_0000), MemoryRegion::SharedWram);
/// assert_eq!(identify_region(Cpu::Arm7, 0x0380_0000), MemoryRegion::Base);
/// assert_eq!(identify_region(Cpu::Arm7, 0x0400_4040), MemoryRegion::IO);
/// ```
#[inline(always)]
pub const fn identify_region(cpu: Cpu, addr: u32) -> MemoryRegion {
    match addr & region_mask(cpu) {
        SHARED_WRAM_REGION => MemoryRegion::SharedWram,
        IO_REGION => MemoryRegion::IO,
        _ => MemoryRegion::Base,
    }
}

impl<B: BaseBus> Bus<B> {
    /// Describe the bulk region containing `addr`, if any
    ///
    /// Callers may access the returned region directly through
    /// [`Bus::fast_region`] instead of the per-access entry points.
    ///
    /// # Arguments
    ///
    /// * `cpu` - CPU issuing the access
    /// * `addr` - Address being accessed
    /// * `write` - Whether the access is a write
    ///
    /// # Returns
    ///
    /// `None` when the address must go through the per-access path
    pub fn describe_region(&self, cpu: Cpu, addr: u32, write: bool) -> Option<MemRegion> {
        let main_ram = MemRegion {
            region: FastRegion::MainRam,
            mask: (MAIN_RAM_SIZE - 1) as u32,
        };

        match cpu {
            Cpu::Arm9 => {
                if addr & 0xFF00_0000 == 0x0200_0000 {
                    return Some(main_ram);
                }
                if addr & 0xFFFF_0000 == 0xFFFF_0000 && !write {
                    return Some(MemRegion {
                        region: FastRegion::Arm9Firmware,
                        mask: 0xFFFF,
                    });
                }
                None
            }
            Cpu::Arm7 => match addr & 0xFF80_0000 {
                0x0200_0000 | 0x0280_0000 => Some(main_ram),
                _ => None,
            },
        }
    }

    /// Backing bytes of a region returned by [`Bus::describe_region`]
    pub fn fast_region(&self, region: MemRegion) -> &[u8] {
        self.base.region(region.region)
    }

    /// Mutable backing bytes of a writable region
    pub fn fast_region_mut(&mut self, region: MemRegion) -> Option<&mut [u8]> {
        self.base.region_mut(region.region)
    }
}
