// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! I2C bus register surface (ARM7 only)
//!
//! - **I2C_DATA** (0x04004500): 8-bit data register
//! - **I2C_CNT** (0x04004501): 8-bit control register
//!
//! The devices on the bus (power management, camera) are external.

/// Data register
pub const I2C_DATA: u32 = 0x0400_4500;

/// Control register
pub const I2C_CNT: u32 = 0x0400_4501;

/// I2C bus as seen by the register bus
pub trait I2cBus {
    fn read_data(&mut self) -> u8;
    fn read_cnt(&mut self) -> u8;
    fn write_data(&mut self, value: u8);
    fn write_cnt(&mut self, value: u8);
    fn reset(&mut self);
}
