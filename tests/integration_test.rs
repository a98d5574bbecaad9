// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! End-to-end scenarios across the bus, DMA engine, GPU and disc reader

mod common;

use ember_core::core::cdrom::CdromPosition;
use ember_core::core::system::System;

#[test]
fn ram_wraparound_through_segments() {
    let mut system = System::new();

    system.bus_mut().write32(0x001FFFFC, 0xDEADBEEF).unwrap();

    assert_eq!(system.bus().read32(0x001FFFFC).unwrap(), 0xDEADBEEF);

    // KSEG0 mirror of the same physical word
    assert_eq!(
        system.bus().read32(0x80000000 + 0x001FFFFC).unwrap(),
        0xDEADBEEF
    );
}

#[test]
fn otc_dma_clear_builds_ordering_table() {
    let mut system = System::new();

    // Channel 6: base 0x00100000, 4 words, backward, manual, enable+trigger
    system.bus_mut().write32(0x1F8010E0, 0x00100000).unwrap();
    system.bus_mut().write32(0x1F8010E4, 0x00000004).unwrap();
    system.bus_mut().write32(0x1F8010E8, 0x11000003).unwrap();

    assert_eq!(system.bus().read32(0x000FFFFC).unwrap(), 0x00FFFFFF);
    assert_eq!(system.bus().read32(0x000FFFF8).unwrap(), 0x000FFFFC);
    assert_eq!(system.bus().read32(0x000FFFF4).unwrap(), 0x000FFFF8);
    assert_eq!(system.bus().read32(0x000FFFF0).unwrap(), 0x000FFFF4);
}

#[test]
fn flat_triangle_through_gp0() {
    let mut system = System::new();

    // Open the drawing area, then draw the red triangle (0,0) (2,0) (0,2)
    system.bus_mut().write32(0x1F801810, 0xE3000000).unwrap();
    system
        .bus_mut()
        .write32(0x1F801810, 0xE4000000 | (511 << 10) | 1023)
        .unwrap();

    system.bus_mut().write32(0x1F801810, 0x200000FF).unwrap();
    system.bus_mut().write32(0x1F801810, 0x00000000).unwrap();
    system.bus_mut().write32(0x1F801810, 0x00000002).unwrap();
    system.bus_mut().write32(0x1F801810, 0x00020000).unwrap();

    let gpu = system.gpu();
    let gpu = gpu.borrow();
    assert_eq!(gpu.vram_read16(0, 0), 0x001F);
    assert_eq!(gpu.vram_read16(1, 0), 0x001F);
    assert_eq!(gpu.vram_read16(0, 1), 0x001F);

    // Excluded by the top-left rule for this winding
    assert_eq!(gpu.vram_read16(1, 1), 0x0000);
}

#[test]
fn cdrom_data_sector_read() {
    let bin = common::make_bin(&[common::data_sector(0xAA)]);

    let mut system = System::new();
    system.load_disc(bin.path().to_str().unwrap()).unwrap();

    let sector = system
        .disk_mut()
        .read(CdromPosition::new(0, 2, 0))
        .unwrap();

    assert_eq!(sector.len(), common::SECTOR_SIZE);
    assert_eq!(&sector[..12], &common::SYNC_PATTERN[..]);
    assert_eq!(sector[16], 0xAA);
}

#[test]
fn gpu_linked_list_dma_pushes_packet() {
    let mut system = System::new();

    let next = 0x00002000;
    // One-word packet at 0x1000, then the end sentinel at `next`.
    // The payload sets the GPU drawing offset so the push is observable.
    system
        .bus_mut()
        .write32(0x00001000, 0x01000000 + next)
        .unwrap();
    system
        .bus_mut()
        .write32(0x00001004, 0xE5000000 | 55)
        .unwrap();
    system.bus_mut().write32(next, 0x00FFFFFF).unwrap();

    // Channel 2: linked list, from RAM, enabled
    system.bus_mut().write32(0x1F8010A0, 0x00001000).unwrap();
    system.bus_mut().write32(0x1F8010A8, 0x01000401).unwrap();

    assert_eq!(system.gpu().borrow().draw_offset(), (55, 0));

    // Channel released after the walk terminated on the sentinel
    let chcr = system.bus().read32(0x1F8010A8).unwrap();
    assert_eq!(chcr & 0x01000000, 0);
}

#[test]
fn dma_interrupt_master_flag_through_bus() {
    let mut system = System::new();

    // Master enable + OTC channel enable
    system.bus_mut().write32(0x1F8010F4, 0x00C00000).unwrap();

    system.bus_mut().write32(0x1F8010E0, 0x00001000).unwrap();
    system.bus_mut().write32(0x1F8010E4, 0x00000008).unwrap();
    system.bus_mut().write32(0x1F8010E8, 0x11000003).unwrap();

    let dicr = system.bus().read32(0x1F8010F4).unwrap();
    assert_ne!(dicr & (1 << 30), 0, "OTC flag");
    assert_ne!(dicr & (1 << 31), 0, "master flag");
    assert!(system.dma().borrow().irq_pending());

    // Acknowledge: write 1 to the flag clears it and the master flag
    system.bus_mut().write32(0x1F8010F4, 0x40C00000).unwrap();
    let dicr = system.bus().read32(0x1F8010F4).unwrap();
    assert_eq!(dicr & (1 << 30), 0);
    assert_eq!(dicr & (1 << 31), 0);
}

#[test]
fn image_upload_then_textured_draw() {
    let mut system = System::new();

    // Open the drawing area
    system.bus_mut().write32(0x1F801810, 0xE3000000).unwrap();
    system
        .bus_mut()
        .write32(0x1F801810, 0xE4000000 | (511 << 10) | 1023)
        .unwrap();

    // Upload one white texel to the 15-bit page base at (192, 0)
    system.bus_mut().write32(0x1F801810, 0xA0000000).unwrap();
    system.bus_mut().write32(0x1F801810, 0x000000C0).unwrap();
    system.bus_mut().write32(0x1F801810, 0x00010001).unwrap();
    system.bus_mut().write32(0x1F801810, 0x00007FFF).unwrap();

    // Textured flat triangle sampling that texel everywhere
    let page: u32 = 3 | (2 << 7);
    system.bus_mut().write32(0x1F801810, 0x24808080).unwrap();
    system.bus_mut().write32(0x1F801810, 0x00000000).unwrap();
    system.bus_mut().write32(0x1F801810, 0x00000000).unwrap();
    system.bus_mut().write32(0x1F801810, 0x00000008).unwrap();
    system.bus_mut().write32(0x1F801810, page << 16).unwrap();
    system.bus_mut().write32(0x1F801810, 0x00080000).unwrap();
    system.bus_mut().write32(0x1F801810, 0x00000000).unwrap();

    assert_eq!(system.gpu().borrow().vram_read16(1, 1), 0x7FFF);
}
