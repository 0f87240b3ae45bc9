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

//! Core emulation components

use serde::{Deserialize, Serialize};

pub mod aes;
pub mod base;
pub mod config;
pub mod dma;
pub mod error;
pub mod firmware;
pub mod i2c;
pub mod interrupt;
pub mod memory;
pub mod nwram;
pub mod savestate;
pub mod sdhost;

#[cfg(test)]
pub(crate) mod test_log;

pub use error::{EmulatorError, Result};

/// Processor issuing a memory access
///
/// The DSi has two independent CPU cores. They see the same new-WRAM banks
/// through separate windows and mapping tables, and different register sets
/// at overlapping MMIO addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cpu {
    /// ARM946E-S main processor
    Arm9,
    /// ARM7TDMI sub processor (owns most DSi peripherals)
    Arm7,
}

impl Cpu {
    /// Both processors, ARM9 first
    pub const ALL: [Cpu; 2] = [Cpu::Arm9, Cpu::Arm7];

    /// Table index of this processor (ARM9 = 0, ARM7 = 1)
    #[inline(always)]
    pub const fn index(self) -> usize {
        match self {
            Cpu::Arm9 => 0,
            Cpu::Arm7 => 1,
        }
    }

    /// Short display name, e.g. "ARM9"
    pub const fn name(self) -> &'static str {
        match self {
            Cpu::Arm9 => "ARM9",
            Cpu::Arm7 => "ARM7",
        }
    }
}

impl std::fmt::Display for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
