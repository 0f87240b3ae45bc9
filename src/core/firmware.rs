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

//! Boot firmware images
//!
//! Each CPU boots from its own 64KB firmware ROM. The ARM9 image is visible
//! at 0xFFFF0000, the ARM7 image at 0x00000000.
//!
//! When an image cannot be loaded, execution can still continue from a
//! placeholder image: a zeroed ROM whose first 16 words hold an undefined
//! instruction, so a CPU starting from it traps immediately instead of
//! running through zeroes.

use crate::core::error::{EmulatorError, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Size of each boot firmware image (64KB)
pub const FIRMWARE_SIZE: usize = 0x10000;

/// Undefined ARM instruction used to fill placeholder images
pub const TRAP_INSTRUCTION: u32 = 0xE7FF_DEFF;

/// Number of trap words at the start of a placeholder image
const TRAP_WORDS: usize = 16;

/// A 64KB boot firmware ROM image
#[derive(Clone, PartialEq, Eq)]
pub struct FirmwareImage {
    data: Vec<u8>,
}

impl FirmwareImage {
    /// Placeholder image: zeroes with a trap instruction in the first 16 words
    ///
    /// # Example
    ///
    /// ```
    /// use dsirx::core::firmware::{FirmwareImage, TRAP_INSTRUCTION};
    ///
    /// let image = FirmwareImage::trap();
    /// assert_eq!(image.read32(0), TRAP_INSTRUCTION);
    /// assert_eq!(image.read32(0x40), 0);
    /// ```
    pub fn trap() -> Self {
        let mut data = vec![0u8; FIRMWARE_SIZE];
        for word in data.chunks_exact_mut(4).take(TRAP_WORDS) {
            word.copy_from_slice(&TRAP_INSTRUCTION.to_le_bytes());
        }
        Self { data }
    }

    /// Build an image from raw bytes
    ///
    /// # Errors
    ///
    /// Returns `EmulatorError::InvalidFirmwareSize` unless `data` is exactly
    /// 64KB.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        if data.len() != FIRMWARE_SIZE {
            return Err(EmulatorError::InvalidFirmwareSize {
                expected: FIRMWARE_SIZE,
                got: data.len(),
            });
        }
        Ok(Self { data })
    }

    /// Load an image from a file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the firmware dump
    ///
    /// # Errors
    ///
    /// - `EmulatorError::FirmwareNotFound` if the file cannot be opened
    /// - `EmulatorError::InvalidFirmwareSize` if the file is not 64KB
    /// - `EmulatorError::Io` if reading fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)
            .map_err(|_| EmulatorError::FirmwareNotFound(path.display().to_string()))?;

        let metadata = file.metadata()?;
        if metadata.len() != FIRMWARE_SIZE as u64 {
            return Err(EmulatorError::InvalidFirmwareSize {
                expected: FIRMWARE_SIZE,
                got: metadata.len() as usize,
            });
        }

        let mut data = vec![0u8; FIRMWARE_SIZE];
        file.read_exact(&mut data)?;
        Ok(Self { data })
    }

    /// Load up to 64KB from a file, zero-filling a short dump
    ///
    /// Bytes past 64KB are ignored.
    ///
    /// # Errors
    ///
    /// - `EmulatorError::FirmwareNotFound` if the file cannot be opened
    /// - `EmulatorError::InvalidFirmwareSize` if the file is empty
    /// - `EmulatorError::Io` if reading fails
    pub fn load_partial<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|_| EmulatorError::FirmwareNotFound(path.display().to_string()))?;

        let mut data = Vec::with_capacity(FIRMWARE_SIZE);
        file.take(FIRMWARE_SIZE as u64).read_to_end(&mut data)?;
        if data.is_empty() {
            return Err(EmulatorError::InvalidFirmwareSize {
                expected: FIRMWARE_SIZE,
                got: 0,
            });
        }

        if data.len() < FIRMWARE_SIZE {
            log::warn!(
                "Firmware {} is only {} bytes, zero-filling to {}",
                path.display(),
                data.len(),
                FIRMWARE_SIZE
            );
            data.resize(FIRMWARE_SIZE, 0);
        }
        Ok(Self { data })
    }

    /// Load an image, falling back to [`FirmwareImage::trap`] on any failure
    ///
    /// Short dumps are accepted as in [`FirmwareImage::load_partial`].
    pub fn load_or_trap<P: AsRef<Path>>(path: P) -> Self {
        match Self::load_partial(path.as_ref()) {
            Ok(image) => {
                log::info!("Loaded firmware image {}", path.as_ref().display());
                image
            }
            Err(e) => {
                log::warn!(
                    "Failed to load firmware {}: {}; using trap image",
                    path.as_ref().display(),
                    e
                );
                Self::trap()
            }
        }
    }

    /// Raw image bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[inline(always)]
    pub fn read8(&self, offset: u32) -> u8 {
        self.data[offset as usize & (FIRMWARE_SIZE - 1)]
    }

    #[inline(always)]
    pub fn read16(&self, offset: u32) -> u16 {
        let o = offset as usize & (FIRMWARE_SIZE - 2);
        u16::from_le_bytes([self.data[o], self.data[o + 1]])
    }

    #[inline(always)]
    pub fn read32(&self, offset: u32) -> u32 {
        let o = offset as usize & (FIRMWARE_SIZE - 4);
        u32::from_le_bytes([
            self.data[o],
            self.data[o + 1],
            self.data[o + 2],
            self.data[o + 3],
        ])
    }
}

impl Default for FirmwareImage {
    fn default() -> Self {
        Self::trap()
    }
}

impl std::fmt::Debug for FirmwareImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirmwareImage")
            .field("entry", &format_args!("{:08X}", self.read32(0)))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_trap_image_layout() {
        let image = FirmwareImage::trap();
        assert_eq!(image.as_bytes().len(), FIRMWARE_SIZE);
        for word in 0..TRAP_WORDS as u32 {
            assert_eq!(image.read32(word * 4), TRAP_INSTRUCTION);
        }
        assert_eq!(image.read32(TRAP_WORDS as u32 * 4), 0);
        assert_eq!(image.read8(0), 0xFF);
        assert_eq!(image.read16(2), 0xE7FF);
    }

    #[test]
    fn test_load_valid_image() {
        let mut file = NamedTempFile::new().unwrap();
        let mut data = vec![0u8; FIRMWARE_SIZE];
        data[0..4].copy_from_slice(&0xEA00_0006u32.to_le_bytes());
        file.write_all(&data).unwrap();

        let image = FirmwareImage::load(file.path()).unwrap();
        assert_eq!(image.read32(0), 0xEA00_0006);
    }

    #[test]
    fn test_load_wrong_size() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 100]).unwrap();

        let err = FirmwareImage::load(file.path()).unwrap_err();
        assert!(matches!(
            err,
            EmulatorError::InvalidFirmwareSize {
                expected: FIRMWARE_SIZE,
                got: 100
            }
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FirmwareImage::load(dir.path().join("bios7i.bin")).unwrap_err();
        assert!(matches!(err, EmulatorError::FirmwareNotFound(_)));
    }

    #[test]
    fn test_load_or_trap_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let image = FirmwareImage::load_or_trap(dir.path().join("missing.bin"));
        assert_eq!(image, FirmwareImage::trap());
    }

    #[test]
    fn test_load_or_trap_pads_short_dump() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&0xEA00_0006u32.to_le_bytes()).unwrap();
        file.write_all(&[0xAA; 4]).unwrap();

        let image = FirmwareImage::load_or_trap(file.path());
        assert_eq!(image.as_bytes().len(), FIRMWARE_SIZE);
        assert_eq!(image.read32(0), 0xEA00_0006);
        assert_eq!(image.read32(4), 0xAAAA_AAAA);
        assert_eq!(image.read32(8), 0);
    }

    #[test]
    fn test_load_partial_truncates_long_dump() {
        let mut file = NamedTempFile::new().unwrap();
        let mut data = vec![0x11u8; FIRMWARE_SIZE];
        data.extend_from_slice(&[0x22; 16]);
        file.write_all(&data).unwrap();

        let image = FirmwareImage::load_partial(file.path()).unwrap();
        assert_eq!(image.as_bytes(), &data[..FIRMWARE_SIZE]);
    }

    #[test]
    fn test_load_or_trap_rejects_empty_file() {
        let file = NamedTempFile::new().unwrap();
        assert!(matches!(
            FirmwareImage::load_partial(file.path()),
            Err(EmulatorError::InvalidFirmwareSize { got: 0, .. })
        ));
        assert_eq!(FirmwareImage::load_or_trap(file.path()), FirmwareImage::trap());
    }

    #[test]
    fn test_from_bytes() {
        assert!(FirmwareImage::from_bytes(vec![0; FIRMWARE_SIZE]).is_ok());
        assert!(FirmwareImage::from_bytes(vec![0; 3]).is_err());
    }

    #[test]
    fn test_reads_wrap_and_align() {
        let image = FirmwareImage::trap();
        assert_eq!(image.read32(0x1_0000), TRAP_INSTRUCTION);
        assert_eq!(image.read32(0x3), TRAP_INSTRUCTION);
    }
}
