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

//! DSi secondary interrupt registers (ARM7)
//!
//! The DSi adds a second bank of interrupt sources for its new peripherals.
//! Only the ARM7 can reach it.
//!
//! ## Registers
//!
//! - **IE2** (0x04000218): Secondary interrupt enable (R/W)
//!   - 1 = interrupt enabled, 0 = interrupt masked
//!
//! - **IF2** (0x0400021C): Secondary interrupt flags (R/W)
//!   - Reading returns current interrupt flags
//!   - Writing 1 to a bit acknowledges that interrupt (clears the bit)
//!   - Writing 0 to a bit has no effect
//!
//! After every IE2/IF2 write the external interrupt line is recomputed.
//!
//! ## Interrupt Sources (Bit Positions)
//!
//! ```text
//! Bit  | Source        | Description
//! -----|---------------|----------------------------------
//! 0-2  | GPIO18        | GPIO18 pins 0-2
//! 3    | -             | Not used
//! 4-7  | GPIO33        | GPIO33 pins 0-3 (headphone, power button, ...)
//! 8    | SDMMC         | SD/MMC controller
//! 9    | SDMMC_DATA1   | SD/MMC data line 1
//! 10   | SDIO          | SDIO (wireless) controller
//! 11   | SDIO_DATA1    | SDIO data line 1
//! 12   | AES           | AES engine
//! 13   | I2C           | I2C bus
//! 14   | MIC_EXT       | Microphone extended
//! ```

use crate::core::Cpu;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Secondary interrupt sources (IE2/IF2 bits)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Irq2: u32 {
        const GPIO18_0 = 1 << 0;
        const GPIO18_1 = 1 << 1;
        const GPIO18_2 = 1 << 2;
        const GPIO33_0 = 1 << 4;
        const GPIO33_1 = 1 << 5;
        const GPIO33_2 = 1 << 6;
        const GPIO33_3 = 1 << 7;
        const SDMMC = 1 << 8;
        const SDMMC_DATA1 = 1 << 9;
        const SDIO = 1 << 10;
        const SDIO_DATA1 = 1 << 11;
        const AES = 1 << 12;
        const I2C = 1 << 13;
        const MIC_EXT = 1 << 14;
    }
}

/// Writable bits of IE2 and IF2
pub const IRQ2_MASK: u32 = 0x7FF7;

/// Interrupt line of the CPU cores
///
/// Called after every IE2/IF2 write with whether a secondary interrupt is
/// both enabled and flagged.
pub trait IrqLine {
    fn update_irq(&mut self, cpu: Cpu, secondary_pending: bool);
}

/// IE2/IF2 register pair
///
/// # Example
///
/// ```
/// use dsirx::core::interrupt::{Irq2, SecondaryInterrupts};
///
/// let mut irq = SecondaryInterrupts::new();
/// irq.request(Irq2::AES);
/// assert!(!irq.is_pending());
///
/// irq.write_enable(Irq2::AES.bits());
/// assert!(irq.is_pending());
///
/// // Write 1 to clear
/// irq.acknowledge(Irq2::AES.bits());
/// assert!(!irq.is_pending());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SecondaryInterrupts {
    /// IE2 (0x04000218)
    enable: u32,

    /// IF2 (0x0400021C)
    flags: u32,
}

impl SecondaryInterrupts {
    /// Create with all sources masked and no flags raised
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise interrupt flags
    pub fn request(&mut self, irq: Irq2) {
        self.flags |= irq.bits() & IRQ2_MASK;
        log::trace!("IRQ2 requested: {:?}, IF2=0x{:04X}", irq, self.flags);
    }

    /// Acknowledge interrupts (write 1 to clear bits)
    pub fn acknowledge(&mut self, value: u32) {
        self.flags &= !(value & IRQ2_MASK);
        log::trace!("IRQ2 acknowledged, IF2=0x{:04X}", self.flags);
    }

    /// Check whether any enabled interrupt is flagged
    pub fn is_pending(&self) -> bool {
        self.enable & self.flags != 0
    }

    pub fn read_enable(&self) -> u32 {
        self.enable
    }

    pub fn write_enable(&mut self, value: u32) {
        self.enable = value & IRQ2_MASK;
        log::debug!("IE2 set: 0x{:04X}", self.enable);
    }

    pub fn read_flags(&self) -> u32 {
        self.flags
    }

    /// Sources currently flagged
    pub fn flagged(&self) -> Irq2 {
        Irq2::from_bits_truncate(self.flags)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_initializes_to_zero() {
        let irq = SecondaryInterrupts::new();
        assert_eq!(irq.read_enable(), 0);
        assert_eq!(irq.read_flags(), 0);
        assert!(!irq.is_pending());
    }

    #[test]
    fn test_mask_covers_all_sources() {
        assert_eq!(Irq2::all().bits(), IRQ2_MASK);
    }

    #[test]
    fn test_enable_masked() {
        let mut irq = SecondaryInterrupts::new();
        irq.write_enable(0xFFFF_FFFF);
        assert_eq!(irq.read_enable(), 0x7FF7);
    }

    #[test]
    fn test_acknowledge_clears_only_written_ones() {
        let mut irq = SecondaryInterrupts::new();
        irq.request(Irq2::SDMMC | Irq2::I2C | Irq2::GPIO33_1);

        irq.acknowledge(Irq2::I2C.bits());
        assert_eq!(irq.flagged(), Irq2::SDMMC | Irq2::GPIO33_1);

        // Writing zero leaves flags alone
        irq.acknowledge(0);
        assert_eq!(irq.flagged(), Irq2::SDMMC | Irq2::GPIO33_1);
    }

    #[test]
    fn test_pending_requires_enable_and_flag() {
        let mut irq = SecondaryInterrupts::new();
        irq.write_enable(Irq2::SDIO.bits());
        irq.request(Irq2::AES);
        assert!(!irq.is_pending());
        irq.request(Irq2::SDIO);
        assert!(irq.is_pending());
    }

    #[test]
    fn test_reset() {
        let mut irq = SecondaryInterrupts::new();
        irq.write_enable(IRQ2_MASK);
        irq.request(Irq2::all());
        irq.reset();
        assert_eq!(irq, SecondaryInterrupts::new());
    }
}
