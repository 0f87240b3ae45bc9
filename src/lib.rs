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

//! dsirx: DSi new-WRAM and register bus core
//!
//! This crate provides the memory-mapping and bus-dispatch core of a DSi
//! emulator: the reconfigurable new-WRAM (NWRAM) bank switching unit and the
//! memory-mapped register bus that the ARM9 and ARM7 use to reach it and the
//! DSi peripheral controllers.
//!
//! # Architecture
//!
//! The emulator core is organized into the following modules:
//!
//! - [`core`]: Core emulation components (NWRAM, Bus, peripheral surfaces)
//!
//! # Example
//!
//! ```
//! use dsirx::core::memory::Bus;
//! use dsirx::core::Cpu;
//!
//! let mut bus = Bus::new();
//!
//! // Window A for the ARM9: 0x03000000-0x03040000, four 64KB slots
//! bus.write32(Cpu::Arm9, 0x04004054, 0x0040_3000);
//! // Bank A segment 0 -> ARM9 slot 0
//! bus.write8(Cpu::Arm9, 0x04004040, 0x80);
//!
//! bus.write32(Cpu::Arm9, 0x03000000, 0x11223344);
//! assert_eq!(bus.read32(Cpu::Arm9, 0x03000000), 0x11223344);
//! ```
//!
//! # Modules
//!
//! - [`core::nwram`]: Bank store, slot mapper and window configurator
//! - [`core::memory`]: Per-CPU access dispatch and register bus multiplexer
//! - [`core::base`]: Base system memory bus collaborator
//! - [`core::dma`], [`core::aes`], [`core::sdhost`], [`core::i2c`],
//!   [`core::interrupt`]: Register surfaces of the DSi peripherals
//!
//! # Error Handling
//!
//! CPU-issued accesses never fail. Host-side operations (firmware loading,
//! configuration, save states) return [`core::error::Result<T>`] which is an
//! alias for `Result<T, EmulatorError>`.

pub mod core;

// Re-export commonly used types
pub use core::error::{EmulatorError, Result};
pub use core::Cpu;
