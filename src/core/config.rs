// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Emulator configuration
//!
//! Configuration is stored as TOML:
//!
//! ```toml
//! console_id = 0x08A1_5000_0123_4567
//!
//! [firmware]
//! arm9 = "bios9i.bin"
//! arm7 = "bios7i.bin"
//!
//! [nwram]
//! mbk = [0x8C888480, 0x8D898581, 0x8C888480, 0, 0, 0x00403000,
//!        0x00300000, 0x00300000, 0x00403000, 0x0030_0000, 0x0030_0000, 0x00FFFF0F]
//! ```
//!
//! The `nwram` table holds the new-WRAM settings a boot loader hands over
//! (see [`NewWram::apply_boot_settings`](crate::core::nwram::NewWram::apply_boot_settings)).

use crate::core::error::{EmulatorError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Paths of the two boot firmware images
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwarePaths {
    pub arm9: PathBuf,
    pub arm7: PathBuf,
}

impl Default for FirmwarePaths {
    fn default() -> Self {
        Self {
            arm9: PathBuf::from("bios9i.bin"),
            arm7: PathBuf::from("bios7i.bin"),
        }
    }
}

/// New-WRAM settings applied at boot
///
/// `mbk` holds MBK1-MBK5, the ARM9 MBK6-MBK8, the ARM7 MBK6-MBK8 and MBK9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootNwram {
    pub mbk: [u32; 12],
}

/// Top-level emulator configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DsiConfig {
    /// Console ID exposed to the ARM7
    #[serde(default)]
    pub console_id: u64,

    #[serde(default)]
    pub firmware: FirmwarePaths,

    /// Boot new-WRAM settings, if any
    #[serde(default)]
    pub nwram: Option<BootNwram>,
}

impl DsiConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns `EmulatorError::Config` if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            EmulatorError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| EmulatorError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)
            .map_err(|e| EmulatorError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents).map_err(|e| {
            EmulatorError::Config(format!("Failed to write {}: {}", path.display(), e))
        })
    }

    /// Load configuration, falling back to defaults on any failure
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load(path.as_ref()).unwrap_or_else(|e| {
            log::info!("Using default config ({})", e);
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_when_tables_missing() {
        let config = DsiConfig::from_toml("console_id = 7").unwrap();
        assert_eq!(config.console_id, 7);
        assert_eq!(config.firmware, FirmwarePaths::default());
        assert!(config.nwram.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let config = DsiConfig::from_toml(
            r#"
            console_id = 0x0102030405060708

            [firmware]
            arm9 = "fw/arm9.bin"
            arm7 = "fw/arm7.bin"

            [nwram]
            mbk = [0x8C888480, 0, 0, 0, 0, 0x00403000, 0, 0, 0, 0, 0, 0x0F]
            "#,
        )
        .unwrap();

        assert_eq!(config.console_id, 0x0102_0304_0506_0708);
        assert_eq!(config.firmware.arm9, PathBuf::from("fw/arm9.bin"));
        let nwram = config.nwram.unwrap();
        assert_eq!(nwram.mbk[0], 0x8C88_8480);
        assert_eq!(nwram.mbk[5], 0x0040_3000);
        assert_eq!(nwram.mbk[11], 0x0F);
    }

    #[test]
    fn test_wrong_mbk_length_rejected() {
        let err = DsiConfig::from_toml("[nwram]\nmbk = [1, 2, 3]").unwrap_err();
        assert!(matches!(err, EmulatorError::Config(_)));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dsirx.toml");

        let config = DsiConfig {
            firmware: FirmwarePaths {
                arm9: PathBuf::from("a9.bin"),
                arm7: PathBuf::from("a7.bin"),
            },
            console_id: 0x08A1_5000_0000_0001,
            nwram: Some(BootNwram { mbk: [3; 12] }),
        };
        config.save(&path).unwrap();

        assert_eq!(DsiConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(
            DsiConfig::load(&path),
            Err(EmulatorError::Config(_))
        ));
        assert_eq!(DsiConfig::load_or_default(&path), DsiConfig::default());
    }
}
