// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! I/O Port Operations Module
//!
//! This module handles the DSi-specific memory-mapped registers. The two
//! CPUs see different register sets at overlapping addresses:
//!
//! - **SCFG**: read-only system identification constants (both CPUs)
//! - **MBK1-MBK9**: new-WRAM descriptors, windows and write protect (both
//!   CPUs read their own view; ARM9 assigns segments; each CPU sets its own
//!   windows; ARM7 sets write protect)
//! - **NDMA**: global control and the four channels owned by the CPU
//! - **AES**, **I2C**, **SD/MMC**, **SDIO**, **IE2/IF2**, **Console ID**:
//!   ARM7 only
//!
//! Addresses not handled here fall through to the base bus I/O handlers.

use super::subword::{read_sub_byte, read_sub_half};
use super::Bus;
use crate::core::aes::{self, KeyRegister};
use crate::core::base::BaseBus;
use crate::core::dma::Ndma;
use crate::core::i2c::{I2C_CNT, I2C_DATA};
use crate::core::nwram::Bank;
use crate::core::sdhost::{SdHost, SdPort};
use crate::core::Cpu;
use std::cell::RefCell;
use std::rc::Rc;

/// SCFG_A9ROM / SCFG_A7ROM
const SCFG_ROM: u32 = 0x0400_4000;
/// SCFG_A7ROM upper byte (ARM7)
const SCFG_ROM_HI: u32 = 0x0400_4001;
/// SCFG_CLK
const SCFG_CLK: u32 = 0x0400_4004;
/// SCFG_JTAG (ARM7)
const SCFG_JTAG: u32 = 0x0400_4006;
/// SCFG_EXT
const SCFG_EXT: u32 = 0x0400_4008;
/// SCFG_MC
const SCFG_MC: u32 = 0x0400_4010;

/// First MBK register (MBK1)
const MBK_BASE: u32 = 0x0400_4040;
/// Last byte of the MBK registers (end of MBK9)
const MBK_LAST: u32 = 0x0400_4063;
/// Last byte of the segment descriptors (end of MBK5)
const MBK_DESCRIPTOR_LAST: u32 = 0x0400_4053;
/// Bank window registers
const MBK6: u32 = 0x0400_4054;
const MBK7: u32 = 0x0400_4058;
const MBK8: u32 = 0x0400_405C;
/// Write protect register
const MBK9: u32 = 0x0400_4060;

/// Secondary interrupt enable (ARM7)
const IE2: u32 = 0x0400_0218;
/// Secondary interrupt flags (ARM7)
const IF2: u32 = 0x0400_021C;

/// Console ID (8 bytes, ARM7)
const CONSOLE_ID: u32 = 0x0400_4D00;
const CONSOLE_ID_LAST: u32 = 0x0400_4D07;
/// Console ID flag register, reads as zero
const CONSOLE_ID_FLAG: u32 = 0x0400_4D08;

/// ARM9 SCFG_EXT value: extended features enabled
const ARM9_SCFG_EXT: u32 = 0x8307_F100;
/// ARM7 SCFG_EXT value
const ARM7_SCFG_EXT: u32 = 0x8000_0000;
/// ARM7 SCFG_CLK value
const ARM7_SCFG_CLK: u16 = 0x0187;

/// Bank and segment described by a descriptor byte offset (0x00-0x13)
#[inline(always)]
fn descriptor_segment(offset: u32) -> (Bank, usize) {
    match offset {
        0..=3 => (Bank::A, offset as usize),
        4..=11 => (Bank::B, (offset - 4) as usize),
        _ => (Bank::C, (offset - 12) as usize),
    }
}

impl<B: BaseBus> Bus<B> {
    /// MBK register index and byte lane of an address in 0x04004040-0x04004063
    #[inline(always)]
    fn mbk_location(addr: u32) -> (usize, u32) {
        let offset = addr - MBK_BASE;
        ((offset / 4) as usize, offset & 3)
    }

    /// Assign one segment from a descriptor byte written at `addr`
    fn write_descriptor_byte(&mut self, addr: u32, value: u8) {
        let (bank, segment) = descriptor_segment(addr - MBK_BASE);
        self.nwram.assign_segment(bank, segment, value);
    }

    /// Store a window register for `cpu`
    fn write_window(&mut self, cpu: Cpu, addr: u32, value: u32) {
        let bank = match addr {
            MBK6 => Bank::A,
            MBK7 => Bank::B,
            _ => Bank::C,
        };
        self.nwram.set_window(cpu, bank, value);
    }

    /// Console ID shifted so the byte at `addr` is the lowest
    ///
    /// Callers truncate to their access width.
    #[inline(always)]
    fn console_id_at(&self, addr: u32) -> u64 {
        self.console_id >> (8 * (addr - CONSOLE_ID))
    }

    pub(super) fn read_io_port8(&mut self, cpu: Cpu, addr: u32) -> u8 {
        match cpu {
            Cpu::Arm9 => self.arm9_read_io8(addr),
            Cpu::Arm7 => self.arm7_read_io8(addr),
        }
    }

    pub(super) fn read_io_port16(&mut self, cpu: Cpu, addr: u32) -> u16 {
        match cpu {
            Cpu::Arm9 => self.arm9_read_io16(addr),
            Cpu::Arm7 => self.arm7_read_io16(addr),
        }
    }

    pub(super) fn read_io_port32(&mut self, cpu: Cpu, addr: u32) -> u32 {
        match cpu {
            Cpu::Arm9 => self.arm9_read_io32(addr),
            Cpu::Arm7 => self.arm7_read_io32(addr),
        }
    }

    pub(super) fn write_io_port8(&mut self, cpu: Cpu, addr: u32, value: u8) {
        match cpu {
            Cpu::Arm9 => self.arm9_write_io8(addr, value),
            Cpu::Arm7 => self.arm7_write_io8(addr, value),
        }
    }

    pub(super) fn write_io_port16(&mut self, cpu: Cpu, addr: u32, value: u16) {
        match cpu {
            Cpu::Arm9 => self.arm9_write_io16(addr, value),
            Cpu::Arm7 => self.arm7_write_io16(addr, value),
        }
    }

    pub(super) fn write_io_port32(&mut self, cpu: Cpu, addr: u32, value: u32) {
        match cpu {
            Cpu::Arm9 => self.arm9_write_io32(addr, value),
            Cpu::Arm7 => self.arm7_write_io32(addr, value),
        }
    }

    // ARM9 register set

    fn arm9_read_io8(&mut self, addr: u32) -> u8 {
        match addr {
            SCFG_ROM => 0x01,
            MBK_BASE..=MBK_LAST => {
                let (index, lane) = Self::mbk_location(addr);
                read_sub_byte(self.nwram.mbk(Cpu::Arm9, index), lane)
            }
            _ => self.base.io_read8(Cpu::Arm9, addr),
        }
    }

    fn arm9_read_io16(&mut self, addr: u32) -> u16 {
        match addr {
            SCFG_CLK => 0x0000,
            MBK_BASE..=MBK_LAST => {
                let (index, lane) = Self::mbk_location(addr);
                read_sub_half(self.nwram.mbk(Cpu::Arm9, index), lane >> 1)
            }
            _ => self.base.io_read16(Cpu::Arm9, addr),
        }
    }

    fn arm9_read_io32(&mut self, addr: u32) -> u32 {
        match addr {
            SCFG_EXT => ARM9_SCFG_EXT,
            SCFG_MC => 0x0000_0001,
            MBK_BASE..=MBK_LAST => self.nwram.mbk(Cpu::Arm9, Self::mbk_location(addr).0),
            Ndma::GLOBAL_CONTROL => self.ndma.read_control(Cpu::Arm9),
            a if (Ndma::CHANNEL_BASE..Ndma::CHANNEL_END).contains(&a) => {
                self.ndma.read_channel(Cpu::Arm9, a)
            }
            _ => self.base.io_read32(Cpu::Arm9, addr),
        }
    }

    fn arm9_write_io8(&mut self, addr: u32, value: u8) {
        match addr {
            MBK_BASE..=MBK_DESCRIPTOR_LAST => self.write_descriptor_byte(addr, value),
            _ => self.base.io_write8(Cpu::Arm9, addr, value),
        }
    }

    fn arm9_write_io16(&mut self, addr: u32, value: u16) {
        match addr {
            MBK_BASE..=MBK_DESCRIPTOR_LAST => {
                for (i, byte) in value.to_le_bytes().into_iter().enumerate() {
                    self.write_descriptor_byte(addr + i as u32, byte);
                }
            }
            _ => self.base.io_write16(Cpu::Arm9, addr, value),
        }
    }

    fn arm9_write_io32(&mut self, addr: u32, value: u32) {
        match addr {
            MBK_BASE..=MBK_DESCRIPTOR_LAST => {
                for (i, byte) in value.to_le_bytes().into_iter().enumerate() {
                    self.write_descriptor_byte(addr + i as u32, byte);
                }
            }
            MBK6 | MBK7 | MBK8 => self.write_window(Cpu::Arm9, addr, value),
            Ndma::GLOBAL_CONTROL => self.ndma.write_control(Cpu::Arm9, value),
            a if (Ndma::CHANNEL_BASE..Ndma::CHANNEL_END).contains(&a) => {
                self.ndma.write_channel(Cpu::Arm9, a, value)
            }
            _ => self.base.io_write32(Cpu::Arm9, addr, value),
        }
    }

    // ARM7 register set

    fn arm7_read_io8(&mut self, addr: u32) -> u8 {
        match addr {
            SCFG_ROM | SCFG_ROM_HI => 0x01,
            MBK_BASE..=MBK_LAST => {
                let (index, lane) = Self::mbk_location(addr);
                read_sub_byte(self.nwram.mbk(Cpu::Arm7, index), lane)
            }
            I2C_DATA => match &self.i2c {
                Some(i2c) => i2c.borrow_mut().read_data(),
                None => {
                    log::warn!("I2C_DATA access before i2c initialized");
                    0
                }
            },
            I2C_CNT => match &self.i2c {
                Some(i2c) => i2c.borrow_mut().read_cnt(),
                None => {
                    log::warn!("I2C_CNT access before i2c initialized");
                    0
                }
            },
            CONSOLE_ID..=CONSOLE_ID_LAST => self.console_id_at(addr) as u8,
            CONSOLE_ID_FLAG => 0,
            _ => self.base.io_read8(Cpu::Arm7, addr),
        }
    }

    fn arm7_read_io16(&mut self, addr: u32) -> u16 {
        match addr {
            IE2 => self.irq2.read_enable() as u16,
            IF2 => self.irq2.read_flags() as u16,
            SCFG_CLK => ARM7_SCFG_CLK,
            SCFG_JTAG => 0x0000,
            MBK_BASE..=MBK_LAST => {
                let (index, lane) = Self::mbk_location(addr);
                read_sub_half(self.nwram.mbk(Cpu::Arm7, index), lane >> 1)
            }
            CONSOLE_ID..=CONSOLE_ID_LAST => self.console_id_at(addr) as u16,
            CONSOLE_ID_FLAG => 0,
            _ => match SdPort::from_addr(addr) {
                Some(port) => self.sd_read16(port, addr),
                None => self.base.io_read16(Cpu::Arm7, addr),
            },
        }
    }

    fn arm7_read_io32(&mut self, addr: u32) -> u32 {
        match addr {
            IE2 => self.irq2.read_enable(),
            IF2 => self.irq2.read_flags(),
            SCFG_EXT => ARM7_SCFG_EXT,
            MBK_BASE..=MBK_LAST => self.nwram.mbk(Cpu::Arm7, Self::mbk_location(addr).0),
            Ndma::GLOBAL_CONTROL => self.ndma.read_control(Cpu::Arm7),
            a if (Ndma::CHANNEL_BASE..Ndma::CHANNEL_END).contains(&a) => {
                self.ndma.read_channel(Cpu::Arm7, a)
            }
            aes::AES_CNT => match &self.aes {
                Some(engine) => engine.borrow_mut().read_cnt(),
                None => {
                    log::warn!("AES_CNT access before aes initialized");
                    0
                }
            },
            aes::AES_RDFIFO => match &self.aes {
                Some(engine) => engine.borrow_mut().read_output_fifo(),
                None => {
                    log::warn!("AES_RDFIFO access before aes initialized");
                    0
                }
            },
            CONSOLE_ID..=CONSOLE_ID_LAST => self.console_id_at(addr) as u32,
            CONSOLE_ID_FLAG => 0,
            _ => match SdPort::from_addr(addr) {
                Some(port) if addr == port.fifo32() => self.sd_read_fifo32(port),
                Some(port) => {
                    let lo = self.sd_read16(port, addr) as u32;
                    let hi = self.sd_read16(port, addr + 2) as u32;
                    lo | (hi << 16)
                }
                None => self.base.io_read32(Cpu::Arm7, addr),
            },
        }
    }

    fn arm7_write_io8(&mut self, addr: u32, value: u8) {
        match addr {
            I2C_DATA => match &self.i2c {
                Some(i2c) => i2c.borrow_mut().write_data(value),
                None => log::warn!("I2C_DATA write before i2c initialized"),
            },
            I2C_CNT => match &self.i2c {
                Some(i2c) => i2c.borrow_mut().write_cnt(value),
                None => log::warn!("I2C_CNT write before i2c initialized"),
            },
            _ => self.base.io_write8(Cpu::Arm7, addr, value),
        }
    }

    fn arm7_write_io16(&mut self, addr: u32, value: u16) {
        match addr {
            IE2 => {
                self.irq2.write_enable(value as u32);
                self.update_irq2();
            }
            IF2 => {
                self.irq2.acknowledge(value as u32);
                self.update_irq2();
            }
            _ => match SdPort::from_addr(addr) {
                Some(port) => self.sd_write16(port, addr, value),
                None => self.base.io_write16(Cpu::Arm7, addr, value),
            },
        }
    }

    fn arm7_write_io32(&mut self, addr: u32, value: u32) {
        match addr {
            IE2 => {
                self.irq2.write_enable(value);
                self.update_irq2();
            }
            IF2 => {
                self.irq2.acknowledge(value);
                self.update_irq2();
            }
            MBK6 | MBK7 | MBK8 => self.write_window(Cpu::Arm7, addr, value),
            MBK9 => self.nwram.set_write_protect(value),
            Ndma::GLOBAL_CONTROL => self.ndma.write_control(Cpu::Arm7, value),
            a if (Ndma::CHANNEL_BASE..Ndma::CHANNEL_END).contains(&a) => {
                self.ndma.write_channel(Cpu::Arm7, a, value)
            }
            aes::AES_CNT | aes::AES_BLKCNT | aes::AES_WRFIFO => self.aes_write32(addr, value),
            a if aes::AES_IV.contains(&a)
                || aes::AES_MAC.contains(&a)
                || aes::AES_KEYS.contains(&a) =>
            {
                self.aes_write32(a, value)
            }
            _ => match SdPort::from_addr(addr) {
                Some(port) if addr == port.fifo32() => self.sd_write_fifo32(port, value),
                Some(port) => {
                    self.sd_write16(port, addr, value as u16);
                    self.sd_write16(port, addr + 2, (value >> 16) as u16);
                }
                None => self.base.io_write32(Cpu::Arm7, addr, value),
            },
        }
    }

    // Peripheral helpers

    fn aes_write32(&mut self, addr: u32, value: u32) {
        let Some(engine) = &self.aes else {
            log::warn!("AES write at 0x{:08X} before aes initialized", addr);
            return;
        };
        let mut engine = engine.borrow_mut();

        match addr {
            aes::AES_CNT => engine.write_cnt(value),
            aes::AES_BLKCNT => engine.write_block_count(value),
            aes::AES_WRFIFO => engine.write_input_fifo(value),
            a if aes::AES_IV.contains(&a) => {
                engine.write_iv(a - aes::AES_IV.start, value, 0xFFFF_FFFF)
            }
            a if aes::AES_MAC.contains(&a) => {
                engine.write_mac(a - aes::AES_MAC.start, value, 0xFFFF_FFFF)
            }
            a => {
                if let Some(key) = KeyRegister::decode(a - aes::AES_KEYS.start) {
                    engine.write_key(key.slot, key.kind, key.offset, value, 0xFFFF_FFFF);
                }
            }
        }
    }

    fn sd_host(&self, port: SdPort) -> Option<&Rc<RefCell<dyn SdHost>>> {
        match port {
            SdPort::Sdmmc => self.sdmmc.as_ref(),
            SdPort::Sdio => self.sdio.as_ref(),
        }
    }

    fn sd_read16(&self, port: SdPort, addr: u32) -> u16 {
        match self.sd_host(port) {
            Some(host) => host.borrow_mut().read(addr),
            None => {
                log::warn!("{} access before {} initialized", port.name(), port.name());
                0
            }
        }
    }

    fn sd_write16(&self, port: SdPort, addr: u32, value: u16) {
        match self.sd_host(port) {
            Some(host) => host.borrow_mut().write(addr, value),
            None => log::warn!("{} write before {} initialized", port.name(), port.name()),
        }
    }

    fn sd_read_fifo32(&self, port: SdPort) -> u32 {
        match self.sd_host(port) {
            Some(host) => host.borrow_mut().read_fifo32(),
            None => {
                log::warn!("{} FIFO access before {} initialized", port.name(), port.name());
                0
            }
        }
    }

    fn sd_write_fifo32(&self, port: SdPort, value: u32) {
        match self.sd_host(port) {
            Some(host) => host.borrow_mut().write_fifo32(value),
            None => log::warn!("{} FIFO write before {} initialized", port.name(), port.name()),
        }
    }
}
