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

//! DSi NDMA (new DMA) register surface
//!
//! The DSi has eight NDMA channels, four owned by each CPU. Both CPUs see
//! their own four channels at the same addresses.
//!
//! # Channels
//!
//! | CPU  | Channels | Base Address |
//! |------|----------|--------------|
//! | ARM9 | 0-3      | 0x04004104   |
//! | ARM7 | 4-7      | 0x04004104   |
//!
//! # Channel Registers
//!
//! Each channel occupies 0x1C bytes of 32-bit registers:
//!
//! | Offset | Register        | Write mask  |
//! |--------|-----------------|-------------|
//! | +0x00  | Source address  | 0xFFFFFFFC  |
//! | +0x04  | Dest address    | 0xFFFFFFFC  |
//! | +0x08  | Total length    | 0x0FFFFFFF  |
//! | +0x0C  | Block length    | 0x00FFFFFF  |
//! | +0x10  | Sub-block timer | 0x0003FFFF  |
//! | +0x14  | Fill data       | none        |
//! | +0x18  | Control         | (channel)   |
//!
//! # Global Registers
//!
//! - **NDMAGCNT** (0x04004100): per-CPU global control, write mask 0x800F0000
//!
//! The transfer state machine lives behind [`NdmaChannel`]. This module only
//! routes register accesses and scheduler events to it.

use crate::core::Cpu;
use std::cell::RefCell;
use std::rc::Rc;

/// Register of one NDMA channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NdmaRegister {
    Source,
    Destination,
    TotalLength,
    BlockLength,
    SubblockTimer,
    FillData,
    Control,
}

impl NdmaRegister {
    /// Registers in address order
    pub const ALL: [NdmaRegister; 7] = [
        NdmaRegister::Source,
        NdmaRegister::Destination,
        NdmaRegister::TotalLength,
        NdmaRegister::BlockLength,
        NdmaRegister::SubblockTimer,
        NdmaRegister::FillData,
        NdmaRegister::Control,
    ];

    /// Decode a byte offset within a channel block
    pub fn from_offset(offset: u32) -> Option<Self> {
        if offset & 3 != 0 {
            return None;
        }
        Self::ALL.get((offset / 4) as usize).copied()
    }

    /// Bits stored when the register is written
    pub const fn write_mask(self) -> u32 {
        match self {
            NdmaRegister::Source | NdmaRegister::Destination => 0xFFFF_FFFC,
            NdmaRegister::TotalLength => 0x0FFF_FFFF,
            NdmaRegister::BlockLength => 0x00FF_FFFF,
            NdmaRegister::SubblockTimer => 0x0003_FFFF,
            NdmaRegister::FillData | NdmaRegister::Control => 0xFFFF_FFFF,
        }
    }
}

/// One NDMA channel as seen by the register bus and the scheduler
pub trait NdmaChannel {
    fn read_register(&self, reg: NdmaRegister) -> u32;

    /// Store a non-control register (value already masked)
    fn write_register(&mut self, reg: NdmaRegister, value: u32);

    /// Write the control register, possibly starting or stopping a transfer
    fn write_control(&mut self, value: u32);

    /// Advance an active transfer
    fn run(&mut self);

    fn is_running(&self) -> bool;

    /// Start the transfer if it waits for startup `mode`
    fn start_if_needed(&mut self, mode: u32);

    /// Stop the transfer if it was started by `mode`
    fn stop_if_needed(&mut self, mode: u32);

    fn reset(&mut self);
}

/// Register-only NDMA channel
///
/// Holds the register file and tracks the start/stop protocol without moving
/// any data. Used until a transfer engine is attached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NdmaRegisterFile {
    registers: [u32; 7],
    running: bool,
}

impl NdmaRegisterFile {
    /// Channel enable bit of the control register
    const CNT_ENABLE: u32 = 1 << 31;

    /// Startup mode selecting an immediate start
    const MODE_IMMEDIATE: u32 = 0x10;

    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    fn control(&self) -> u32 {
        self.registers[6]
    }

    #[inline(always)]
    fn startup_mode(&self) -> u32 {
        (self.control() >> 24) & 0x1F
    }
}

impl NdmaChannel for NdmaRegisterFile {
    fn read_register(&self, reg: NdmaRegister) -> u32 {
        self.registers[reg as usize]
    }

    fn write_register(&mut self, reg: NdmaRegister, value: u32) {
        self.registers[reg as usize] = value;
    }

    fn write_control(&mut self, value: u32) {
        let was_enabled = self.control() & Self::CNT_ENABLE != 0;
        self.registers[6] = value;

        if value & Self::CNT_ENABLE == 0 {
            self.running = false;
        } else if !was_enabled && self.startup_mode() == Self::MODE_IMMEDIATE {
            self.running = true;
        }
    }

    fn run(&mut self) {
        if self.running {
            // No data path: complete immediately
            self.running = false;
            self.registers[6] &= !Self::CNT_ENABLE;
        }
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn start_if_needed(&mut self, mode: u32) {
        if self.control() & Self::CNT_ENABLE != 0 && self.startup_mode() == mode {
            self.running = true;
        }
    }

    fn stop_if_needed(&mut self, mode: u32) {
        if self.running && self.startup_mode() == mode {
            self.running = false;
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Shared handle to an NDMA channel
pub type SharedNdmaChannel = Rc<RefCell<dyn NdmaChannel>>;

/// NDMA controller: per-CPU global control plus eight channels
///
/// # Example
///
/// ```
/// use dsirx::core::dma::Ndma;
/// use dsirx::core::Cpu;
///
/// let mut ndma = Ndma::new();
/// ndma.write_channel(Cpu::Arm7, 0x0400410C, 0xFFFF_FFFF);
/// assert_eq!(ndma.read_channel(Cpu::Arm7, 0x0400410C), 0x0FFF_FFFF);
/// assert_eq!(ndma.read_channel(Cpu::Arm9, 0x0400410C), 0);
/// ```
pub struct Ndma {
    /// NDMAGCNT for ARM9 and ARM7
    control: [u32; 2],

    /// Channels 0-3 (ARM9) and 4-7 (ARM7)
    channels: [SharedNdmaChannel; 8],
}

impl Ndma {
    /// Global control register address
    pub const GLOBAL_CONTROL: u32 = 0x0400_4100;

    /// First channel register address
    pub const CHANNEL_BASE: u32 = 0x0400_4104;

    /// Size of one channel's register block
    pub const CHANNEL_STRIDE: u32 = 0x1C;

    /// End of the channel register blocks (exclusive)
    pub const CHANNEL_END: u32 = Self::CHANNEL_BASE + 4 * Self::CHANNEL_STRIDE;

    /// Writable bits of the global control register
    pub const GLOBAL_CONTROL_MASK: u32 = 0x800F_0000;

    /// Channels per CPU
    pub const CHANNELS_PER_CPU: usize = 4;

    /// Create a controller with register-only channels
    pub fn new() -> Self {
        Self {
            control: [0; 2],
            channels: std::array::from_fn(|_| {
                Rc::new(RefCell::new(NdmaRegisterFile::new())) as SharedNdmaChannel
            }),
        }
    }

    /// Replace channel `index` (0-7) with an external implementation
    pub fn attach_channel(&mut self, index: usize, channel: SharedNdmaChannel) {
        if let Some(slot) = self.channels.get_mut(index) {
            *slot = channel;
        } else {
            log::warn!("NDMA channel {} does not exist", index);
        }
    }

    /// Channel `index` (0-7)
    pub fn channel(&self, index: usize) -> Option<SharedNdmaChannel> {
        self.channels.get(index).cloned()
    }

    fn cpu_channels(&self, cpu: Cpu) -> &[SharedNdmaChannel] {
        let first = cpu.index() * Self::CHANNELS_PER_CPU;
        &self.channels[first..first + Self::CHANNELS_PER_CPU]
    }

    /// Decode a channel register address into (channel index, register)
    pub fn decode(cpu: Cpu, addr: u32) -> Option<(usize, NdmaRegister)> {
        if !(Self::CHANNEL_BASE..Self::CHANNEL_END).contains(&addr) {
            return None;
        }
        let offset = addr - Self::CHANNEL_BASE;
        let local = (offset / Self::CHANNEL_STRIDE) as usize;
        let reg = NdmaRegister::from_offset(offset % Self::CHANNEL_STRIDE)?;
        Some((cpu.index() * Self::CHANNELS_PER_CPU + local, reg))
    }

    pub fn read_control(&self, cpu: Cpu) -> u32 {
        self.control[cpu.index()]
    }

    pub fn write_control(&mut self, cpu: Cpu, value: u32) {
        self.control[cpu.index()] = value & Self::GLOBAL_CONTROL_MASK;
        log::trace!("{} NDMAGCNT = 0x{:08X}", cpu, self.control[cpu.index()]);
    }

    /// Read a channel register of `cpu`
    pub fn read_channel(&self, cpu: Cpu, addr: u32) -> u32 {
        match Self::decode(cpu, addr) {
            Some((index, reg)) => self.channels[index].borrow().read_register(reg),
            None => {
                log::warn!("Invalid NDMA register address 0x{:08X}", addr);
                0
            }
        }
    }

    /// Write a channel register of `cpu`, applying its write mask
    pub fn write_channel(&mut self, cpu: Cpu, addr: u32, value: u32) {
        let Some((index, reg)) = Self::decode(cpu, addr) else {
            log::warn!("Invalid NDMA register address 0x{:08X}", addr);
            return;
        };

        let mut channel = self.channels[index].borrow_mut();
        match reg {
            NdmaRegister::Control => channel.write_control(value),
            _ => channel.write_register(reg, value & reg.write_mask()),
        }
        log::trace!("NDMA{} {:?} = 0x{:08X}", index, reg, value);
    }

    /// Advance the transfers of every channel owned by `cpu`, in channel order
    pub fn run(&self, cpu: Cpu) {
        for channel in self.cpu_channels(cpu) {
            channel.borrow_mut().run();
        }
    }

    /// Check whether any channel owned by `cpu` is transferring
    pub fn running(&self, cpu: Cpu) -> bool {
        self.cpu_channels(cpu)
            .iter()
            .any(|channel| channel.borrow().is_running())
    }

    /// Signal startup event `mode` to every channel owned by `cpu`
    pub fn check(&self, cpu: Cpu, mode: u32) {
        for channel in self.cpu_channels(cpu) {
            channel.borrow_mut().start_if_needed(mode);
        }
    }

    /// Signal the end of startup event `mode` to every channel owned by `cpu`
    pub fn stop(&self, cpu: Cpu, mode: u32) {
        for channel in self.cpu_channels(cpu) {
            channel.borrow_mut().stop_if_needed(mode);
        }
    }

    /// Global control registers of both CPUs (for save states)
    pub fn control_registers(&self) -> [u32; 2] {
        self.control
    }

    pub fn set_control_registers(&mut self, control: [u32; 2]) {
        self.control = [
            control[0] & Self::GLOBAL_CONTROL_MASK,
            control[1] & Self::GLOBAL_CONTROL_MASK,
        ];
    }

    /// Clear global control and reset every channel
    pub fn reset(&mut self) {
        self.control = [0; 2];
        for channel in &self.channels {
            channel.borrow_mut().reset();
        }
    }
}

impl Default for Ndma {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Ndma {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ndma")
            .field("control", &self.control)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Channel recording every scheduler event it receives
    #[derive(Default)]
    struct EventLog {
        events: Vec<String>,
    }

    struct LoggingChannel {
        id: usize,
        log: Rc<RefCell<EventLog>>,
        running: bool,
    }

    impl NdmaChannel for LoggingChannel {
        fn read_register(&self, _reg: NdmaRegister) -> u32 {
            0
        }
        fn write_register(&mut self, reg: NdmaRegister, value: u32) {
            self.log
                .borrow_mut()
                .events
                .push(format!("{}:{:?}={:08X}", self.id, reg, value));
        }
        fn write_control(&mut self, value: u32) {
            self.log
                .borrow_mut()
                .events
                .push(format!("{}:cnt={:08X}", self.id, value));
        }
        fn run(&mut self) {
            self.log.borrow_mut().events.push(format!("{}:run", self.id));
        }
        fn is_running(&self) -> bool {
            self.running
        }
        fn start_if_needed(&mut self, mode: u32) {
            self.log
                .borrow_mut()
                .events
                .push(format!("{}:start{}", self.id, mode));
        }
        fn stop_if_needed(&mut self, mode: u32) {
            self.log
                .borrow_mut()
                .events
                .push(format!("{}:stop{}", self.id, mode));
        }
        fn reset(&mut self) {
            self.log.borrow_mut().events.push(format!("{}:reset", self.id));
        }
    }

    fn logging_ndma() -> (Ndma, Rc<RefCell<EventLog>>) {
        let log = Rc::new(RefCell::new(EventLog::default()));
        let mut ndma = Ndma::new();
        for id in 0..8 {
            ndma.attach_channel(
                id,
                Rc::new(RefCell::new(LoggingChannel {
                    id,
                    log: log.clone(),
                    running: id == 6,
                })),
            );
        }
        (ndma, log)
    }

    #[test]
    fn test_register_offsets() {
        assert_eq!(NdmaRegister::from_offset(0x00), Some(NdmaRegister::Source));
        assert_eq!(NdmaRegister::from_offset(0x14), Some(NdmaRegister::FillData));
        assert_eq!(NdmaRegister::from_offset(0x18), Some(NdmaRegister::Control));
        assert_eq!(NdmaRegister::from_offset(0x1C), None);
        assert_eq!(NdmaRegister::from_offset(0x02), None);
    }

    #[test]
    fn test_decode_channel_addresses() {
        assert_eq!(
            Ndma::decode(Cpu::Arm9, 0x0400_4104),
            Some((0, NdmaRegister::Source))
        );
        assert_eq!(
            Ndma::decode(Cpu::Arm9, 0x0400_411C),
            Some((0, NdmaRegister::Control))
        );
        assert_eq!(
            Ndma::decode(Cpu::Arm9, 0x0400_4120),
            Some((1, NdmaRegister::Source))
        );
        assert_eq!(
            Ndma::decode(Cpu::Arm7, 0x0400_4170),
            Some((7, NdmaRegister::Control))
        );
        assert_eq!(Ndma::decode(Cpu::Arm7, 0x0400_4174), None);
        assert_eq!(Ndma::decode(Cpu::Arm7, 0x0400_4100), None);
    }

    #[test]
    fn test_write_masks() {
        let mut ndma = Ndma::new();
        let values = [
            (0x0400_4104, 0xFFFF_FFFF),
            (0x0400_4108, 0xFFFF_FFFF),
            (0x0400_410C, 0x0FFF_FFFF),
            (0x0400_4110, 0x00FF_FFFF),
            (0x0400_4114, 0x0003_FFFF),
            (0x0400_4118, 0xFFFF_FFFF),
        ];
        for (addr, _) in values {
            ndma.write_channel(Cpu::Arm9, addr, 0xFFFF_FFFF);
        }
        assert_eq!(ndma.read_channel(Cpu::Arm9, 0x0400_4104), 0xFFFF_FFFC);
        assert_eq!(ndma.read_channel(Cpu::Arm9, 0x0400_4108), 0xFFFF_FFFC);
        for (addr, expected) in values.iter().skip(2) {
            assert_eq!(ndma.read_channel(Cpu::Arm9, *addr), *expected);
        }
    }

    #[test]
    fn test_channels_are_per_cpu() {
        let mut ndma = Ndma::new();
        ndma.write_channel(Cpu::Arm9, 0x0400_4104, 0x0200_0000);
        ndma.write_channel(Cpu::Arm7, 0x0400_4104, 0x0300_0000);
        assert_eq!(ndma.read_channel(Cpu::Arm9, 0x0400_4104), 0x0200_0000);
        assert_eq!(ndma.read_channel(Cpu::Arm7, 0x0400_4104), 0x0300_0000);
        assert_eq!(
            ndma.channel(4).unwrap().borrow().read_register(NdmaRegister::Source),
            0x0300_0000
        );
    }

    #[test]
    fn test_global_control_masked() {
        let mut ndma = Ndma::new();
        ndma.write_control(Cpu::Arm7, 0xFFFF_FFFF);
        assert_eq!(ndma.read_control(Cpu::Arm7), 0x800F_0000);
        assert_eq!(ndma.read_control(Cpu::Arm9), 0);
    }

    #[test]
    fn test_control_goes_through_write_control() {
        let (mut ndma, log) = logging_ndma();
        ndma.write_channel(Cpu::Arm7, 0x0400_4104 + 0x1C + 0x18, 0x9000_0000);
        ndma.write_channel(Cpu::Arm7, 0x0400_4104 + 0x08, 0xFFFF_FFFF);
        assert_eq!(
            log.borrow().events,
            vec!["5:cnt=90000000", "4:TotalLength=0FFFFFFF"]
        );
    }

    #[test]
    fn test_scheduler_helpers_visit_cpu_channels_in_order() {
        let (ndma, log) = logging_ndma();
        ndma.run(Cpu::Arm9);
        ndma.check(Cpu::Arm7, 3);
        ndma.stop(Cpu::Arm7, 3);
        assert_eq!(
            log.borrow().events,
            vec![
                "0:run", "1:run", "2:run", "3:run", "4:start3", "5:start3", "6:start3",
                "7:start3", "4:stop3", "5:stop3", "6:stop3", "7:stop3",
            ]
        );
        assert!(!ndma.running(Cpu::Arm9));
        assert!(ndma.running(Cpu::Arm7));
    }

    #[test]
    fn test_register_file_immediate_start() {
        let mut ch = NdmaRegisterFile::new();
        ch.write_control(0x9000_0000); // enable, immediate
        assert!(ch.is_running());
        ch.run();
        assert!(!ch.is_running());
        assert_eq!(ch.read_register(NdmaRegister::Control), 0x1000_0000);
    }

    #[test]
    fn test_register_file_event_start_stop() {
        let mut ch = NdmaRegisterFile::new();
        ch.write_control(0x8400_0000); // enable, startup mode 4
        assert!(!ch.is_running());
        ch.start_if_needed(2);
        assert!(!ch.is_running());
        ch.start_if_needed(4);
        assert!(ch.is_running());
        ch.stop_if_needed(4);
        assert!(!ch.is_running());
    }

    #[test]
    fn test_reset() {
        let mut ndma = Ndma::new();
        ndma.write_control(Cpu::Arm9, 0x8000_0000);
        ndma.write_channel(Cpu::Arm9, 0x0400_4118, 0x1234);
        ndma.reset();
        assert_eq!(ndma.read_control(Cpu::Arm9), 0);
        assert_eq!(ndma.read_channel(Cpu::Arm9, 0x0400_4118), 0);
    }
}
