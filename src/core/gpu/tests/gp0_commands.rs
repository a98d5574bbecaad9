// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! GP0 command assembly and transfer commands

use super::super::*;

#[test]
fn test_nop_and_clear_cache_take_no_arguments() {
    let mut gpu = Gpu::new();

    gpu.gp0(0x0000_0000);
    gpu.gp0(0x0100_0000);

    // State machine is still idle: an environment word executes directly
    gpu.gp0(0xE500_0000 | 7);
    assert_eq!(gpu.draw_offset(), (7, 0));
}

#[test]
fn test_fill_rectangle() {
    let mut gpu = Gpu::new();

    // Fill a 16x2 rectangle at (16, 8) with red
    gpu.gp0(0x0200_00FF);
    gpu.gp0(8 << 16 | 16);
    gpu.gp0(2 << 16 | 16);

    assert_eq!(gpu.vram_read16(16, 8), 0x001F);
    assert_eq!(gpu.vram_read16(31, 9), 0x001F);
    assert_eq!(gpu.vram_read16(32, 8), 0);
    assert_eq!(gpu.vram_read16(16, 10), 0);
}

#[test]
fn test_cpu_to_vram_transfer() {
    let mut gpu = Gpu::new();

    // 2x2 rectangle at (10, 10)
    gpu.gp0(0xA000_0000);
    gpu.gp0(10 << 16 | 10);
    gpu.gp0(2 << 16 | 2);

    gpu.gp0(0xAAAA_BBBB);
    gpu.gp0(0xCCCC_DDDD);

    assert_eq!(gpu.vram_read16(10, 10), 0xBBBB);
    assert_eq!(gpu.vram_read16(11, 10), 0xAAAA);
    assert_eq!(gpu.vram_read16(10, 11), 0xDDDD);
    assert_eq!(gpu.vram_read16(11, 11), 0xCCCC);
}

#[test]
fn test_cpu_to_vram_transfer_releases_state_machine() {
    let mut gpu = Gpu::new();

    gpu.gp0(0xA000_0000);
    gpu.gp0(0);
    gpu.gp0(1 << 16 | 1);
    gpu.gp0(0x0000_7FFF);

    // Transfer finished, next word decodes as a fresh command
    gpu.gp0(0xE500_0000 | 3);
    assert_eq!(gpu.draw_offset(), (3, 0));
    assert_eq!(gpu.vram_read16(0, 0), 0x7FFF);
}

#[test]
fn test_vram_to_cpu_transfer_via_gpuread() {
    let mut gpu = Gpu::new();

    gpu.vram_write16(100, 100, 0x1234);
    gpu.vram_write16(101, 100, 0x5678);

    gpu.gp0(0xC000_0000);
    gpu.gp0(100 << 16 | 100);
    gpu.gp0(1 << 16 | 2);

    let word = gpu.gpuread();
    assert_eq!(word & 0xFFFF, 0x1234);
    assert_eq!((word >> 16) & 0xFFFF, 0x5678);
}

#[test]
fn test_vram_to_vram_copy() {
    let mut gpu = Gpu::new();

    gpu.vram_write16(0, 0, 0x000A);
    gpu.vram_write16(1, 0, 0x000B);
    gpu.vram_write16(0, 1, 0x000C);
    gpu.vram_write16(1, 1, 0x000D);

    // Copy the 2x2 block at (0,0) to (64, 32)
    gpu.gp0(0x8000_0000);
    gpu.gp0(0);
    gpu.gp0(32 << 16 | 64);
    gpu.gp0(2 << 16 | 2);

    assert_eq!(gpu.vram_read16(64, 32), 0x000A);
    assert_eq!(gpu.vram_read16(65, 32), 0x000B);
    assert_eq!(gpu.vram_read16(64, 33), 0x000C);
    assert_eq!(gpu.vram_read16(65, 33), 0x000D);
}

#[test]
fn test_polygon_argument_counting() {
    let mut gpu = super::gpu_with_full_draw_area();

    // Flat triangle needs exactly command + 3 vertices
    gpu.gp0(0x2000_00FF);
    gpu.gp0(0x0000_0000);
    assert_eq!(gpu.vram_read16(0, 0), 0); // not yet issued
    gpu.gp0(0x0000_0004);
    assert_eq!(gpu.vram_read16(0, 0), 0); // still waiting
    gpu.gp0(0x0004_0000);
    assert_eq!(gpu.vram_read16(0, 0), 0x001F); // issued on the last word
}

#[test]
fn test_poly_line_terminator() {
    let mut gpu = super::gpu_with_full_draw_area();

    // Opaque flat poly-line through three points, then the terminator
    gpu.gp0(0x4800_FFFF);
    gpu.gp0(0x0000_0000);
    gpu.gp0(0x0000_0008);
    gpu.gp0(0x0008_0008);
    gpu.gp0(0x5555_5555);

    // Line pixels drawn
    assert_ne!(gpu.vram_read16(4, 0), 0);
    assert_ne!(gpu.vram_read16(8, 4), 0);

    // State machine idle again
    gpu.gp0(0xE500_0000 | 9);
    assert_eq!(gpu.draw_offset(), (9, 0));
}
