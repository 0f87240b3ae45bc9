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

//! Save state format
//!
//! A save state is a [`SaveStateHeader`] followed by a [`BusSnapshot`],
//! both encoded with bincode's standard configuration. The header is
//! decoded and checked on its own first, so a state written by a newer
//! format version is rejected before its body is interpreted.

use crate::core::error::{EmulatorError, Result};
use crate::core::interrupt::SecondaryInterrupts;
use crate::core::nwram::NewWram;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Magic bytes at the start of every save state
pub const SAVE_STATE_MAGIC: [u8; 8] = *b"DSIRXSS\0";

/// Current save state format version
pub const SAVE_STATE_VERSION: u32 = 1;

/// Upper bound on the decoded size of a save state (4MB)
const DECODE_LIMIT: usize = 4 * 1024 * 1024;

/// Save state header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveStateHeader {
    pub magic: [u8; 8],
    pub version: u32,
    /// When the state was written
    pub created: DateTime<Utc>,
}

impl SaveStateHeader {
    /// Header for a state written now
    pub fn now() -> Self {
        Self {
            magic: SAVE_STATE_MAGIC,
            version: SAVE_STATE_VERSION,
            created: Utc::now(),
        }
    }
}

/// Persisted bus state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusSnapshot {
    /// Banks, MBK views, windows and mapping tables
    pub nwram: NewWram,
    /// NDMA global control, indexed by CPU
    pub ndma_control: [u32; 2],
    /// IE2/IF2
    pub irq2: SecondaryInterrupts,
    pub console_id: u64,
}

fn config() -> impl bincode::config::Config {
    bincode::config::standard().with_limit::<DECODE_LIMIT>()
}

/// Encode a snapshot behind a fresh header
///
/// # Errors
///
/// Returns `EmulatorError::SaveState` if encoding fails.
pub fn encode(snapshot: &BusSnapshot) -> Result<Vec<u8>> {
    let mut data = bincode::serde::encode_to_vec(SaveStateHeader::now(), config())
        .map_err(|e| EmulatorError::SaveState(format!("Failed to encode header: {}", e)))?;
    let body = bincode::serde::encode_to_vec(snapshot, config())
        .map_err(|e| EmulatorError::SaveState(format!("Failed to encode state: {}", e)))?;
    data.extend_from_slice(&body);
    Ok(data)
}

/// Decode and validate a save state
///
/// # Errors
///
/// Returns `EmulatorError::SaveState` if the data is truncated or corrupt,
/// carries the wrong magic or version, or describes banks of the wrong
/// size.
pub fn decode(data: &[u8]) -> Result<(SaveStateHeader, BusSnapshot)> {
    let (header, header_len): (SaveStateHeader, usize) =
        bincode::serde::decode_from_slice(data, config())
            .map_err(|e| EmulatorError::SaveState(format!("Failed to decode header: {}", e)))?;

    if header.magic != SAVE_STATE_MAGIC {
        return Err(EmulatorError::SaveState("Bad magic".to_string()));
    }
    if header.version != SAVE_STATE_VERSION {
        return Err(EmulatorError::SaveState(format!(
            "Unsupported version {} (expected {})",
            header.version, SAVE_STATE_VERSION
        )));
    }

    let (snapshot, _): (BusSnapshot, usize) =
        bincode::serde::decode_from_slice(&data[header_len..], config())
            .map_err(|e| EmulatorError::SaveState(format!("Failed to decode state: {}", e)))?;

    if !snapshot.nwram.is_well_formed() {
        return Err(EmulatorError::SaveState(
            "Malformed new-WRAM state".to_string(),
        ));
    }

    Ok((header, snapshot))
}
