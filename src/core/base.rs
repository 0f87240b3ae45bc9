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

//! Base system memory bus
//!
//! Everything the DSi-specific dispatch does not claim (main RAM, firmware
//! ROMs, the NDS-compatible I/O registers) is forwarded to a [`BaseBus`].
//! [`FlatBaseBus`] is a minimal implementation holding main RAM and the two
//! firmware images; unmapped memory and unhandled I/O read as zero.
//!
//! # Memory Map
//!
//! | Address Range          | CPU  | Region          | Size  | Access |
//! |------------------------|------|-----------------|-------|--------|
//! | 0x00000000-0x0000FFFF  | ARM7 | ARM7 firmware   | 64KB  | R only |
//! | 0x02000000-0x02FFFFFF  | both | Main RAM        | 16MB  | R/W    |
//! | 0xFFFF0000-0xFFFFFFFF  | ARM9 | ARM9 firmware   | 64KB  | R only |

use crate::core::firmware::FirmwareImage;
use crate::core::Cpu;

/// Main RAM size (16MB)
pub const MAIN_RAM_SIZE: usize = 16 * 1024 * 1024;

/// Bulk regions that callers may access directly, bypassing per-access dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FastRegion {
    /// Main RAM (read/write)
    MainRam,
    /// ARM9 boot firmware (read only)
    Arm9Firmware,
    /// ARM7 boot firmware (read only)
    Arm7Firmware,
}

/// Memory and I/O handler for addresses outside new-WRAM and DSi registers
///
/// All methods receive addresses already aligned to the access width.
pub trait BaseBus {
    fn read8(&mut self, cpu: Cpu, addr: u32) -> u8;
    fn read16(&mut self, cpu: Cpu, addr: u32) -> u16;
    fn read32(&mut self, cpu: Cpu, addr: u32) -> u32;
    fn write8(&mut self, cpu: Cpu, addr: u32, value: u8);
    fn write16(&mut self, cpu: Cpu, addr: u32, value: u16);
    fn write32(&mut self, cpu: Cpu, addr: u32, value: u32);

    /// Fallback for I/O registers the DSi multiplexer does not handle
    fn io_read8(&mut self, cpu: Cpu, addr: u32) -> u8;
    fn io_read16(&mut self, cpu: Cpu, addr: u32) -> u16;
    fn io_read32(&mut self, cpu: Cpu, addr: u32) -> u32;
    fn io_write8(&mut self, cpu: Cpu, addr: u32, value: u8);
    fn io_write16(&mut self, cpu: Cpu, addr: u32, value: u16);
    fn io_write32(&mut self, cpu: Cpu, addr: u32, value: u32);

    /// Backing bytes of a bulk region
    fn region(&self, region: FastRegion) -> &[u8];

    /// Mutable backing bytes of a bulk region, `None` for read-only regions
    fn region_mut(&mut self, region: FastRegion) -> Option<&mut [u8]>;

    /// Return volatile memory to its power-on state
    fn reset(&mut self) {}
}

/// Flat base bus: main RAM plus both firmware ROMs
pub struct FlatBaseBus {
    /// Main RAM (16MB), mirrored through 0x02000000-0x02FFFFFF
    main_ram: Vec<u8>,

    /// ARM9 firmware at 0xFFFF0000
    arm9_firmware: FirmwareImage,

    /// ARM7 firmware at 0x00000000
    arm7_firmware: FirmwareImage,
}

impl FlatBaseBus {
    /// Main RAM region code
    const MAIN_RAM_BASE: u32 = 0x0200_0000;

    /// ARM9 firmware base address
    const ARM9_FIRMWARE_BASE: u32 = 0xFFFF_0000;

    /// ARM7 firmware end address (exclusive)
    const ARM7_FIRMWARE_END: u32 = 0x0001_0000;

    /// Create a base bus with zeroed RAM and trap firmware images
    pub fn new() -> Self {
        Self {
            main_ram: vec![0u8; MAIN_RAM_SIZE],
            arm9_firmware: FirmwareImage::trap(),
            arm7_firmware: FirmwareImage::trap(),
        }
    }

    /// Install the boot firmware of one CPU
    pub fn set_firmware(&mut self, cpu: Cpu, image: FirmwareImage) {
        match cpu {
            Cpu::Arm9 => self.arm9_firmware = image,
            Cpu::Arm7 => self.arm7_firmware = image,
        }
    }

    /// Boot firmware of one CPU
    pub fn firmware(&self, cpu: Cpu) -> &FirmwareImage {
        match cpu {
            Cpu::Arm9 => &self.arm9_firmware,
            Cpu::Arm7 => &self.arm7_firmware,
        }
    }

    #[inline(always)]
    fn main_ram_offset(addr: u32) -> Option<usize> {
        if addr & 0xFF00_0000 == Self::MAIN_RAM_BASE {
            Some(addr as usize & (MAIN_RAM_SIZE - 1))
        } else {
            None
        }
    }

    #[inline(always)]
    fn firmware_for(&self, cpu: Cpu, addr: u32) -> Option<&FirmwareImage> {
        match cpu {
            Cpu::Arm9 if addr >= Self::ARM9_FIRMWARE_BASE => Some(&self.arm9_firmware),
            Cpu::Arm7 if addr < Self::ARM7_FIRMWARE_END => Some(&self.arm7_firmware),
            _ => None,
        }
    }
}

impl Default for FlatBaseBus {
    fn default() -> Self {
        Self::new()
    }
}

impl BaseBus for FlatBaseBus {
    fn read8(&mut self, cpu: Cpu, addr: u32) -> u8 {
        if let Some(o) = Self::main_ram_offset(addr) {
            return self.main_ram[o];
        }
        if let Some(fw) = self.firmware_for(cpu, addr) {
            return fw.read8(addr);
        }
        log::trace!("{} open bus read8 at 0x{:08X}", cpu, addr);
        0
    }

    fn read16(&mut self, cpu: Cpu, addr: u32) -> u16 {
        if let Some(o) = Self::main_ram_offset(addr & !1) {
            return u16::from_le_bytes([self.main_ram[o], self.main_ram[o + 1]]);
        }
        if let Some(fw) = self.firmware_for(cpu, addr) {
            return fw.read16(addr);
        }
        log::trace!("{} open bus read16 at 0x{:08X}", cpu, addr);
        0
    }

    fn read32(&mut self, cpu: Cpu, addr: u32) -> u32 {
        if let Some(o) = Self::main_ram_offset(addr & !3) {
            let ram = &self.main_ram;
            return u32::from_le_bytes([ram[o], ram[o + 1], ram[o + 2], ram[o + 3]]);
        }
        if let Some(fw) = self.firmware_for(cpu, addr) {
            return fw.read32(addr);
        }
        log::trace!("{} open bus read32 at 0x{:08X}", cpu, addr);
        0
    }

    fn write8(&mut self, cpu: Cpu, addr: u32, value: u8) {
        match Self::main_ram_offset(addr) {
            Some(o) => self.main_ram[o] = value,
            None => log::trace!("{} dropped write8 0x{:02X} at 0x{:08X}", cpu, value, addr),
        }
    }

    fn write16(&mut self, cpu: Cpu, addr: u32, value: u16) {
        match Self::main_ram_offset(addr & !1) {
            Some(o) => self.main_ram[o..o + 2].copy_from_slice(&value.to_le_bytes()),
            None => log::trace!("{} dropped write16 0x{:04X} at 0x{:08X}", cpu, value, addr),
        }
    }

    fn write32(&mut self, cpu: Cpu, addr: u32, value: u32) {
        match Self::main_ram_offset(addr & !3) {
            Some(o) => self.main_ram[o..o + 4].copy_from_slice(&value.to_le_bytes()),
            None => log::trace!("{} dropped write32 0x{:08X} at 0x{:08X}", cpu, value, addr),
        }
    }

    fn io_read8(&mut self, cpu: Cpu, addr: u32) -> u8 {
        log::trace!("{} unhandled I/O read8 at 0x{:08X}", cpu, addr);
        0
    }

    fn io_read16(&mut self, cpu: Cpu, addr: u32) -> u16 {
        log::trace!("{} unhandled I/O read16 at 0x{:08X}", cpu, addr);
        0
    }

    fn io_read32(&mut self, cpu: Cpu, addr: u32) -> u32 {
        log::trace!("{} unhandled I/O read32 at 0x{:08X}", cpu, addr);
        0
    }

    fn io_write8(&mut self, cpu: Cpu, addr: u32, value: u8) {
        log::trace!("{} unhandled I/O write8 0x{:02X} at 0x{:08X}", cpu, value, addr);
    }

    fn io_write16(&mut self, cpu: Cpu, addr: u32, value: u16) {
        log::trace!("{} unhandled I/O write16 0x{:04X} at 0x{:08X}", cpu, value, addr);
    }

    fn io_write32(&mut self, cpu: Cpu, addr: u32, value: u32) {
        log::trace!("{} unhandled I/O write32 0x{:08X} at 0x{:08X}", cpu, value, addr);
    }

    fn region(&self, region: FastRegion) -> &[u8] {
        match region {
            FastRegion::MainRam => &self.main_ram,
            FastRegion::Arm9Firmware => self.arm9_firmware.as_bytes(),
            FastRegion::Arm7Firmware => self.arm7_firmware.as_bytes(),
        }
    }

    fn region_mut(&mut self, region: FastRegion) -> Option<&mut [u8]> {
        match region {
            FastRegion::MainRam => Some(&mut self.main_ram),
            FastRegion::Arm9Firmware | FastRegion::Arm7Firmware => None,
        }
    }

    fn reset(&mut self) {
        // Firmware is ROM and survives reset
        self.main_ram.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::firmware::TRAP_INSTRUCTION;

    #[test]
    fn test_main_ram_mirrors() {
        let mut base = FlatBaseBus::new();
        base.write32(Cpu::Arm9, 0x0200_0100, 0xCAFEBABE);
        assert_eq!(base.read32(Cpu::Arm7, 0x0200_0100), 0xCAFEBABE);
        assert_eq!(base.read16(Cpu::Arm9, 0x0200_0102), 0xCAFE);
        assert_eq!(base.read8(Cpu::Arm9, 0x0200_0100), 0xBE);
        assert_eq!(base.region(FastRegion::MainRam)[0x100], 0xBE);
    }

    #[test]
    fn test_firmware_visible_per_cpu() {
        let mut base = FlatBaseBus::new();
        assert_eq!(base.read32(Cpu::Arm9, 0xFFFF_0000), TRAP_INSTRUCTION);
        assert_eq!(base.read32(Cpu::Arm7, 0x0000_0000), TRAP_INSTRUCTION);
        // ARM9 sees nothing at 0, ARM7 nothing at 0xFFFF0000
        assert_eq!(base.read32(Cpu::Arm9, 0x0000_0000), 0);
        assert_eq!(base.read32(Cpu::Arm7, 0xFFFF_0000), 0);
    }

    #[test]
    fn test_firmware_is_read_only() {
        let mut base = FlatBaseBus::new();
        base.write32(Cpu::Arm9, 0xFFFF_0000, 0);
        assert_eq!(base.read32(Cpu::Arm9, 0xFFFF_0000), TRAP_INSTRUCTION);
        assert!(base.region_mut(FastRegion::Arm9Firmware).is_none());
        assert!(base.region_mut(FastRegion::MainRam).is_some());
    }

    #[test]
    fn test_unmapped_and_io_read_zero() {
        let mut base = FlatBaseBus::new();
        assert_eq!(base.read32(Cpu::Arm9, 0x0800_0000), 0);
        assert_eq!(base.io_read32(Cpu::Arm7, 0x0400_0130), 0);
        assert_eq!(base.io_read8(Cpu::Arm9, 0x0400_0247), 0);
    }

    #[test]
    fn test_reset_clears_ram_keeps_firmware() {
        let mut base = FlatBaseBus::new();
        base.write8(Cpu::Arm7, 0x02FF_FFFF, 0x5A);
        base.reset();
        assert_eq!(base.read8(Cpu::Arm7, 0x02FF_FFFF), 0);
        assert_eq!(base.firmware(Cpu::Arm9).read32(0), TRAP_INSTRUCTION);
    }
}
