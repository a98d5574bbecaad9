// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! VRAM access tests

use super::super::*;

#[test]
fn test_vram_read_write() {
    let mut gpu = Gpu::new();

    gpu.vram_write16(0, 0, 0x1234);
    gpu.vram_write16(1023, 511, 0x5678);

    assert_eq!(gpu.vram_read16(0, 0), 0x1234);
    assert_eq!(gpu.vram_read16(1023, 511), 0x5678);
}

#[test]
fn test_vram_out_of_range_access() {
    let mut gpu = Gpu::new();

    // Out-of-range writes are dropped, reads return 0
    gpu.vram_write16(1024, 0, 0xFFFF);
    gpu.vram_write16(0, 512, 0xFFFF);
    gpu.vram_write16(-1, 0, 0xFFFF);

    assert_eq!(gpu.vram_read16(1024, 0), 0);
    assert_eq!(gpu.vram_read16(0, 512), 0);
    assert_eq!(gpu.vram_read16(-1, -1), 0);
}

#[test]
fn test_vram_buffer_dimensions() {
    let gpu = Gpu::new();
    assert_eq!(gpu.vram().len(), VRAM_WIDTH * VRAM_HEIGHT);
}

#[test]
fn test_gpuread_advances_through_rectangle() {
    let mut gpu = Gpu::new();

    for i in 0..4u16 {
        gpu.vram_write16(200 + i as i32, 50, 0x1000 + i);
    }

    // Latch a 4x1 rectangle at (200, 50)
    gpu.gp0(0xC000_0000);
    gpu.gp0(50 << 16 | 200);
    gpu.gp0(1 << 16 | 4);

    let first = gpu.gpuread();
    assert_eq!(first & 0xFFFF, 0x1000);
    assert_eq!(first >> 16, 0x1001);

    let second = gpu.gpuread();
    assert_eq!(second & 0xFFFF, 0x1002);
    assert_eq!(second >> 16, 0x1003);
}
