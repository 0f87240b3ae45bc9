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

//! Memory bus implementation for the DSi
//!
//! The Bus is the entry point for every memory access made by either CPU.
//! It resolves shared WRAM accesses through the new-WRAM windows, routes
//! I/O accesses to the DSi register multiplexer, and forwards everything
//! else to the base bus.
//!
//! # Memory Map
//!
//! | Address Range          | Region        | Handling                      |
//! |------------------------|---------------|-------------------------------|
//! | 0x03000000-0x03FFFFFF  | Shared WRAM   | New-WRAM windows (ARM9)       |
//! | 0x03000000-0x037FFFFF  | Shared WRAM   | New-WRAM windows (ARM7)       |
//! | 0x04000000-0x04FFFFFF  | I/O Ports     | DSi registers, then base I/O  |
//! | everything else        | Base          | [`BaseBus`]                   |
//!
//! # Access Width
//!
//! Halfword and word accesses are aligned down to their natural width.
//! Accesses never fail: unmapped shared WRAM reads as zero and writes to it
//! are dropped.
//!
//! # Example
//!
//! ```
//! use dsirx::core::memory::Bus;
//! use dsirx::core::Cpu;
//!
//! let mut bus = Bus::new();
//!
//! // Window A for the ARM9: 0x03000000-0x03040000, two aliasing 64KB slots
//! bus.write32(Cpu::Arm9, 0x04004054, 0x0040_2000);
//! // Bank A segment 0 -> ARM9 slot 0
//! bus.write8(Cpu::Arm9, 0x04004040, 0x80);
//!
//! bus.write32(Cpu::Arm9, 0x03000000, 0x11223344);
//! assert_eq!(bus.read32(Cpu::Arm9, 0x03000000), 0x11223344);
//! assert_eq!(bus.read32(Cpu::Arm9, 0x03020000), 0x11223344);
//! assert_eq!(bus.read32(Cpu::Arm9, 0x03010000), 0);
//! ```

use crate::core::aes::AesEngine;
use crate::core::base::{BaseBus, FlatBaseBus};
use crate::core::dma::Ndma;
use crate::core::i2c::I2cBus;
use crate::core::interrupt::{Irq2, IrqLine, SecondaryInterrupts};
use crate::core::error::Result;
use crate::core::nwram::{NewWram, WindowLookup};
use crate::core::savestate::{self, BusSnapshot};
use crate::core::sdhost::{SdHost, SdPort};
use crate::core::Cpu;
use std::cell::RefCell;
use std::rc::Rc;

// Sub-modules
mod io_ports;
mod region;
mod subword;


// Re-export public types
pub use region::{identify_region, region_mask, MemRegion, MemoryRegion, IO_REGION, SHARED_WRAM_REGION};
pub use subword::{read_sub_byte, read_sub_half, write_sub_byte};

/// Memory bus for both DSi CPUs
///
/// Owns the new-WRAM unit and the DSi register state, and holds shared
/// references to the peripheral collaborators. Accessing a peripheral that
/// was never attached logs a warning and behaves as open bus.
pub struct Bus<B: BaseBus = FlatBaseBus> {
    /// Base bus for main RAM, firmware and NDS-compatible I/O
    base: B,

    /// New-WRAM banks, MBK registers and mapping tables
    nwram: NewWram,

    /// NDMA global control and channels
    ndma: Ndma,

    /// IE2/IF2 (ARM7)
    irq2: SecondaryInterrupts,

    /// Console ID exposed at 0x04004D00
    console_id: u64,

    /// AES engine reference (shared via Rc<RefCell>)
    aes: Option<Rc<RefCell<dyn AesEngine>>>,

    /// SD/MMC controller reference (shared via Rc<RefCell>)
    sdmmc: Option<Rc<RefCell<dyn SdHost>>>,

    /// SDIO controller reference (shared via Rc<RefCell>)
    sdio: Option<Rc<RefCell<dyn SdHost>>>,

    /// I2C bus reference (shared via Rc<RefCell>)
    i2c: Option<Rc<RefCell<dyn I2cBus>>>,

    /// CPU interrupt line, recomputed after IE2/IF2 writes
    irq_line: Option<Rc<RefCell<dyn IrqLine>>>,
}

impl Bus<FlatBaseBus> {
    /// Create a new Bus over a [`FlatBaseBus`]
    ///
    /// All new-WRAM windows start disabled, so shared WRAM reads reach the
    /// base bus until a window is configured.
    pub fn new() -> Self {
        Self::with_base(FlatBaseBus::new())
    }
}

impl Default for Bus<FlatBaseBus> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: BaseBus> Bus<B> {
    /// Create a Bus forwarding unhandled accesses to `base`
    pub fn with_base(base: B) -> Self {
        Self {
            base,
            nwram: NewWram::new(),
            ndma: Ndma::new(),
            irq2: SecondaryInterrupts::new(),
            console_id: 0,
            aes: None,
            sdmmc: None,
            sdio: None,
            i2c: None,
            irq_line: None,
        }
    }

    /// Set AES engine reference for memory-mapped I/O
    pub fn set_aes(&mut self, aes: Rc<RefCell<dyn AesEngine>>) {
        self.aes = Some(aes);
    }

    /// Set SD host controller reference for one port
    ///
    /// # Arguments
    ///
    /// * `port` - Which controller window the host serves
    /// * `host` - Shared reference to the controller
    pub fn set_sd_host(&mut self, port: SdPort, host: Rc<RefCell<dyn SdHost>>) {
        match port {
            SdPort::Sdmmc => self.sdmmc = Some(host),
            SdPort::Sdio => self.sdio = Some(host),
        }
    }

    /// Set I2C bus reference for memory-mapped I/O
    pub fn set_i2c(&mut self, i2c: Rc<RefCell<dyn I2cBus>>) {
        self.i2c = Some(i2c);
    }

    /// Set the interrupt line notified after IE2/IF2 writes
    pub fn set_irq_line(&mut self, irq_line: Rc<RefCell<dyn IrqLine>>) {
        self.irq_line = Some(irq_line);
    }

    pub fn set_console_id(&mut self, console_id: u64) {
        self.console_id = console_id;
    }

    pub fn console_id(&self) -> u64 {
        self.console_id
    }

    pub fn base(&self) -> &B {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut B {
        &mut self.base
    }

    pub fn nwram(&self) -> &NewWram {
        &self.nwram
    }

    pub fn nwram_mut(&mut self) -> &mut NewWram {
        &mut self.nwram
    }

    pub fn ndma(&self) -> &Ndma {
        &self.ndma
    }

    pub fn ndma_mut(&mut self) -> &mut Ndma {
        &mut self.ndma
    }

    pub fn irq2(&self) -> &SecondaryInterrupts {
        &self.irq2
    }

    /// Advance the NDMA channels owned by `cpu`
    pub fn run_ndmas(&self, cpu: Cpu) {
        self.ndma.run(cpu);
    }

    /// Check whether any NDMA channel owned by `cpu` is transferring
    pub fn ndmas_running(&self, cpu: Cpu) -> bool {
        self.ndma.running(cpu)
    }

    /// Signal NDMA startup event `mode` to the channels owned by `cpu`
    pub fn check_ndmas(&self, cpu: Cpu, mode: u32) {
        self.ndma.check(cpu, mode);
    }

    /// Signal the end of NDMA startup event `mode` to the channels owned by `cpu`
    pub fn stop_ndmas(&self, cpu: Cpu, mode: u32) {
        self.ndma.stop(cpu, mode);
    }

    /// Raise secondary interrupts on behalf of a peripheral
    pub fn request_irq2(&mut self, irq: Irq2) {
        self.irq2.request(irq);
        self.update_irq2();
    }

    /// Recompute the ARM7 interrupt line from IE2/IF2
    fn update_irq2(&self) {
        if let Some(irq_line) = &self.irq_line {
            irq_line
                .borrow_mut()
                .update_irq(Cpu::Arm7, self.irq2.is_pending());
        } else {
            log::warn!("IE2/IF2 update before irq_line initialized");
        }
    }

    /// Reset the bus to its power-on state
    ///
    /// Clears new-WRAM (banks, registers, windows, tables), NDMA, IE2/IF2
    /// and base RAM, and resets every attached peripheral. The console ID
    /// and firmware are preserved.
    pub fn reset(&mut self) {
        self.base.reset();
        self.nwram.reset();
        self.ndma.reset();
        self.irq2.reset();

        if let Some(aes) = &self.aes {
            aes.borrow_mut().reset();
        }
        if let Some(sdmmc) = &self.sdmmc {
            sdmmc.borrow_mut().reset();
        }
        if let Some(sdio) = &self.sdio {
            sdio.borrow_mut().reset();
        }
        if let Some(i2c) = &self.i2c {
            i2c.borrow_mut().reset();
        }
    }

    /// Serialize the bus state into a save state
    ///
    /// Covers new-WRAM, NDMA global control, IE2/IF2 and the console ID.
    /// Attached peripherals and the base bus keep their own state.
    ///
    /// # Errors
    ///
    /// Returns `EmulatorError::SaveState` if encoding fails.
    pub fn save_state(&self) -> Result<Vec<u8>> {
        savestate::encode(&BusSnapshot {
            nwram: self.nwram.clone(),
            ndma_control: self.ndma.control_registers(),
            irq2: self.irq2,
            console_id: self.console_id,
        })
    }

    /// Restore the bus state from a save state
    ///
    /// The bus is left untouched if the data is rejected.
    ///
    /// # Errors
    ///
    /// Returns `EmulatorError::SaveState` if the data is corrupt, was
    /// written by another format version, or describes malformed banks.
    pub fn load_state(&mut self, data: &[u8]) -> Result<()> {
        let (header, snapshot) = savestate::decode(data)?;

        self.nwram = snapshot.nwram;
        self.ndma.set_control_registers(snapshot.ndma_control);
        self.irq2 = snapshot.irq2;
        self.console_id = snapshot.console_id;

        log::info!("Loaded save state written {}", header.created);
        Ok(())
    }

    /// Read 8-bit value
    ///
    /// # Arguments
    ///
    /// * `cpu` - CPU issuing the access
    /// * `addr` - Address to read from
    pub fn read8(&mut self, cpu: Cpu, addr: u32) -> u8 {
        match identify_region(cpu, addr) {
            MemoryRegion::SharedWram => match self.nwram.lookup(cpu, addr) {
                WindowLookup::Mapped { bank, offset } => self.nwram.store().read8(bank, offset),
                WindowLookup::OpenBus => 0,
                WindowLookup::Miss => self.base.read8(cpu, addr),
            },
            MemoryRegion::IO => self.read_io_port8(cpu, addr),
            MemoryRegion::Base => self.base.read8(cpu, addr),
        }
    }

    /// Read 16-bit value (little-endian, aligned down to 2 bytes)
    pub fn read16(&mut self, cpu: Cpu, addr: u32) -> u16 {
        let addr = addr & !1;
        match identify_region(cpu, addr) {
            MemoryRegion::SharedWram => match self.nwram.lookup(cpu, addr) {
                WindowLookup::Mapped { bank, offset } => self.nwram.store().read16(bank, offset),
                WindowLookup::OpenBus => 0,
                WindowLookup::Miss => self.base.read16(cpu, addr),
            },
            MemoryRegion::IO => self.read_io_port16(cpu, addr),
            MemoryRegion::Base => self.base.read16(cpu, addr),
        }
    }

    /// Read 32-bit value (little-endian, aligned down to 4 bytes)
    pub fn read32(&mut self, cpu: Cpu, addr: u32) -> u32 {
        let addr = addr & !3;
        match identify_region(cpu, addr) {
            MemoryRegion::SharedWram => match self.nwram.lookup(cpu, addr) {
                WindowLookup::Mapped { bank, offset } => self.nwram.store().read32(bank, offset),
                WindowLookup::OpenBus => 0,
                WindowLookup::Miss => self.base.read32(cpu, addr),
            },
            MemoryRegion::IO => self.read_io_port32(cpu, addr),
            MemoryRegion::Base => self.base.read32(cpu, addr),
        }
    }

    /// Write 8-bit value
    ///
    /// # Arguments
    ///
    /// * `cpu` - CPU issuing the access
    /// * `addr` - Address to write to
    /// * `value` - Value to write
    pub fn write8(&mut self, cpu: Cpu, addr: u32, value: u8) {
        match identify_region(cpu, addr) {
            MemoryRegion::SharedWram => match self.nwram.lookup(cpu, addr) {
                WindowLookup::Mapped { bank, offset } => {
                    self.nwram.store_mut().write8(bank, offset, value)
                }
                WindowLookup::OpenBus => {}
                WindowLookup::Miss => self.base.write8(cpu, addr, value),
            },
            MemoryRegion::IO => self.write_io_port8(cpu, addr, value),
            MemoryRegion::Base => self.base.write8(cpu, addr, value),
        }
    }

    /// Write 16-bit value (little-endian, aligned down to 2 bytes)
    pub fn write16(&mut self, cpu: Cpu, addr: u32, value: u16) {
        let addr = addr & !1;
        match identify_region(cpu, addr) {
            MemoryRegion::SharedWram => match self.nwram.lookup(cpu, addr) {
                WindowLookup::Mapped { bank, offset } => {
                    self.nwram.store_mut().write16(bank, offset, value)
                }
                WindowLookup::OpenBus => {}
                WindowLookup::Miss => self.base.write16(cpu, addr, value),
            },
            MemoryRegion::IO => self.write_io_port16(cpu, addr, value),
            MemoryRegion::Base => self.base.write16(cpu, addr, value),
        }
    }

    /// Write 32-bit value (little-endian, aligned down to 4 bytes)
    pub fn write32(&mut self, cpu: Cpu, addr: u32, value: u32) {
        let addr = addr & !3;
        match identify_region(cpu, addr) {
            MemoryRegion::SharedWram => match self.nwram.lookup(cpu, addr) {
                WindowLookup::Mapped { bank, offset } => {
                    self.nwram.store_mut().write32(bank, offset, value)
                }
                WindowLookup::OpenBus => {}
                WindowLookup::Miss => self.base.write32(cpu, addr, value),
            },
            MemoryRegion::IO => self.write_io_port32(cpu, addr, value),
            MemoryRegion::Base => self.base.write32(cpu, addr, value),
        }
    }
}

impl<B: BaseBus> std::fmt::Debug for Bus<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bus")
            .field("nwram", &self.nwram)
            .field("ndma", &self.ndma)
            .field("irq2", &self.irq2)
            .field("console_id", &format_args!("{:016X}", self.console_id))
            .finish_non_exhaustive()
    }
}
