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

//! BIOS ROM image holder
//!
//! The BIOS is a fixed 512 KiB image loaded once from a file and never
//! modified afterwards. The bus maps it at physical 0x1FC00000 and the
//! CPU collaborator fetches its reset vector from it.

use crate::core::error::{EmulatorError, Result};
use std::fs::File;
use std::io::Read;

/// BIOS image size (512 KiB)
pub const BIOS_SIZE: usize = 512 * 1024;

/// Immutable 512 KiB BIOS ROM image
///
/// # Example
///
/// ```no_run
/// use ember_core::core::bios::Bios;
///
/// let bios = Bios::new("SCPH1001.BIN").unwrap();
/// let reset_vector = bios.read32(0).unwrap();
/// ```
#[derive(Debug)]
pub struct Bios {
    data: Box<[u8; BIOS_SIZE]>,
}

impl Bios {
    /// Load a BIOS image from a file
    ///
    /// The file must be exactly 512 KiB.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the BIOS file
    ///
    /// # Errors
    ///
    /// - `BiosNotFound` if the file cannot be opened
    /// - `InvalidBiosSize` if the file is not exactly 512 KiB
    /// - `IoError` if reading fails
    pub fn new(path: &str) -> Result<Self> {
        let mut file =
            File::open(path).map_err(|_| EmulatorError::BiosNotFound(path.to_string()))?;

        let metadata = file.metadata()?;
        if metadata.len() != BIOS_SIZE as u64 {
            return Err(EmulatorError::InvalidBiosSize {
                expected: BIOS_SIZE,
                got: metadata.len() as usize,
            });
        }

        let mut data = Box::new([0u8; BIOS_SIZE]);
        file.read_exact(&mut data[..])?;

        log::info!("Loaded BIOS image from {}", path);

        Ok(Self { data })
    }

    /// Build a BIOS directly from a byte slice (test helper)
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is longer than the BIOS size.
    #[cfg(test)]
    pub(crate) fn from_bytes(bytes: &[u8]) -> Self {
        assert!(bytes.len() <= BIOS_SIZE);
        let mut data = Box::new([0u8; BIOS_SIZE]);
        data[..bytes.len()].copy_from_slice(bytes);
        Self { data }
    }

    /// Read a 32-bit little-endian word at the given byte offset
    ///
    /// # Errors
    ///
    /// Returns `AddressOutOfRange` if `offset + 4` exceeds the image.
    pub fn read32(&self, offset: u32) -> Result<u32> {
        let offset = offset as usize;
        if offset + 4 > BIOS_SIZE {
            return Err(EmulatorError::AddressOutOfRange {
                offset: offset as u32,
                size: BIOS_SIZE as u32,
            });
        }
        let bytes = [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ];
        Ok(u32::from_le_bytes(bytes))
    }

    /// Read a 16-bit little-endian halfword at the given byte offset
    pub fn read16(&self, offset: u32) -> Result<u16> {
        let offset = offset as usize;
        if offset + 2 > BIOS_SIZE {
            return Err(EmulatorError::AddressOutOfRange {
                offset: offset as u32,
                size: BIOS_SIZE as u32,
            });
        }
        let bytes = [self.data[offset], self.data[offset + 1]];
        Ok(u16::from_le_bytes(bytes))
    }

    /// Read a byte at the given offset
    pub fn read8(&self, offset: u32) -> Result<u8> {
        self.data
            .get(offset as usize)
            .copied()
            .ok_or(EmulatorError::AddressOutOfRange {
                offset,
                size: BIOS_SIZE as u32,
            })
    }
}
