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

//! Error types for host-side emulator operations
//!
//! CPU-issued memory and register accesses never produce errors: unmapped
//! addresses read as open bus and malformed register values decode to a
//! deterministic state. The errors below only cover operations driven by
//! the host (loading firmware, reading configuration, save states).

use thiserror::Error;

/// Result type alias for emulator operations
pub type Result<T> = std::result::Result<T, EmulatorError>;

/// Errors raised by host-side emulator operations
#[derive(Debug, Error)]
pub enum EmulatorError {
    /// Firmware image file could not be opened
    #[error("firmware image not found: {0}")]
    FirmwareNotFound(String),

    /// Firmware image has the wrong size
    #[error("invalid firmware size: expected {expected} bytes, got {got} bytes")]
    InvalidFirmwareSize { expected: usize, got: usize },

    /// Underlying file I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be read, parsed or written
    #[error("configuration error: {0}")]
    Config(String),

    /// Save state could not be encoded or is malformed
    #[error("save state error: {0}")]
    SaveState(String),
}
