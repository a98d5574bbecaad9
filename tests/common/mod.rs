// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Shared fixtures for integration tests

use std::io::Write;
use tempfile::NamedTempFile;

/// Raw sector size in bytes
pub const SECTOR_SIZE: usize = 2352;

/// Sync pattern opening every raw Data sector
pub const SYNC_PATTERN: [u8; 12] = [
    0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00,
];

/// Write a 512 KiB BIOS image whose first bytes are `head`
pub fn make_bios(head: &[u8]) -> NamedTempFile {
    let mut image = vec![0u8; 512 * 1024];
    image[..head.len()].copy_from_slice(head);

    let mut file = tempfile::Builder::new().suffix(".rom").tempfile().unwrap();
    file.write_all(&image).unwrap();
    file.flush().unwrap();
    file
}

/// Write a BIN image from raw sectors
pub fn make_bin(sectors: &[Vec<u8>]) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".bin").tempfile().unwrap();
    for sector in sectors {
        assert_eq!(sector.len(), SECTOR_SIZE);
        file.write_all(sector).unwrap();
    }
    file.flush().unwrap();
    file
}

/// A well-formed Data sector with a marker byte at offset 16
pub fn data_sector(marker: u8) -> Vec<u8> {
    let mut sector = vec![0u8; SECTOR_SIZE];
    sector[..SYNC_PATTERN.len()].copy_from_slice(&SYNC_PATTERN);
    sector[16] = marker;
    sector
}
