// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! SD host controller register surface (ARM7 only)
//!
//! The DSi has two identical SD host controllers with natively 16-bit
//! registers: one for the SD card slot and eMMC (SD/MMC), one for the
//! wireless module (SDIO). A 32-bit CPU access is split into two 16-bit
//! accesses at `addr` and `addr + 2`, except at the 32-bit data FIFO which
//! is accessed as one word.

use std::ops::Range;

/// One of the two SD host controllers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SdPort {
    /// SD card and eMMC
    Sdmmc,
    /// Wireless module
    Sdio,
}

impl SdPort {
    pub const ALL: [SdPort; 2] = [SdPort::Sdmmc, SdPort::Sdio];

    /// Register window of this controller
    pub const fn range(self) -> Range<u32> {
        match self {
            SdPort::Sdmmc => 0x0400_4800..0x0400_4A00,
            SdPort::Sdio => 0x0400_4A00..0x0400_4C00,
        }
    }

    /// Address of the 32-bit data FIFO
    pub const fn fifo32(self) -> u32 {
        match self {
            SdPort::Sdmmc => 0x0400_490C,
            SdPort::Sdio => 0x0400_4B0C,
        }
    }

    /// Controller whose window contains `addr`
    pub fn from_addr(addr: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|port| port.range().contains(&addr))
    }

    pub const fn name(self) -> &'static str {
        match self {
            SdPort::Sdmmc => "SDMMC",
            SdPort::Sdio => "SDIO",
        }
    }
}

/// SD host controller as seen by the register bus
pub trait SdHost {
    fn read(&mut self, addr: u32) -> u16;
    fn write(&mut self, addr: u32, value: u16);
    fn read_fifo32(&mut self) -> u32;
    fn write_fifo32(&mut self, value: u32);
    fn reset(&mut self);
}
