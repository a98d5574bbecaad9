// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! BIOS loading and reset-vector fetch through the bus

mod common;

use ember_core::core::error::EmulatorError;
use ember_core::core::system::System;

#[test]
fn bios_boot_read() {
    let bios = common::make_bios(&[0x13, 0x00, 0x00, 0x0B]);

    let mut system = System::new();
    system.load_bios(bios.path().to_str().unwrap()).unwrap();

    // The CPU collaborator fetches its first instruction word via KSEG1
    assert_eq!(system.bus().read32(0xBFC00000).unwrap(), 0x0B000013);

    // The same word is visible through every mirror segment
    assert_eq!(system.bus().read32(0x9FC00000).unwrap(), 0x0B000013);
    assert_eq!(system.bus().read32(0x1FC00000).unwrap(), 0x0B000013);
}

#[test]
fn bios_survives_system_reset() {
    let bios = common::make_bios(&[0xAA, 0xBB, 0xCC, 0xDD]);

    let mut system = System::new();
    system.load_bios(bios.path().to_str().unwrap()).unwrap();
    system.reset();

    assert_eq!(system.bus().read32(0xBFC00000).unwrap(), 0xDDCCBBAA);
}

#[test]
fn undersized_bios_rejected() {
    let mut file = tempfile::Builder::new().suffix(".rom").tempfile().unwrap();
    std::io::Write::write_all(&mut file, &[0u8; 4096]).unwrap();

    let mut system = System::new();
    let err = system.load_bios(file.path().to_str().unwrap()).unwrap_err();
    assert!(matches!(err, EmulatorError::InvalidBiosSize { .. }));
}

#[test]
fn missing_bios_rejected() {
    let mut system = System::new();
    let err = system.load_bios("/nonexistent/bios.rom").unwrap_err();
    assert!(matches!(err, EmulatorError::BiosNotFound(_)));
}
