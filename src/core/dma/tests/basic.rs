// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! DMA register file and interrupt register tests

use super::super::*;
use crate::core::memory::Ram;

#[test]
fn test_control_register_reset_value() {
    let dma = Dma::new();
    assert_eq!(dma.read_reg(0x70), 0x0765_4321);
}

#[test]
fn test_channel_registers_read_back() {
    let mut dma = Dma::new();

    for channel in 0..7u32 {
        let base = channel * 16;
        assert_eq!(dma.read_reg(base), 0, "channel {} MADR", channel);
        assert_eq!(dma.read_reg(base + 4), 0, "channel {} BCR", channel);
        assert_eq!(dma.read_reg(base + 8), 0, "channel {} CHCR", channel);
    }

    dma.write_reg(0x20, 0x0012_3456); // GPU MADR
    dma.write_reg(0x24, 0x0004_0010); // GPU BCR
    assert_eq!(dma.read_reg(0x20), 0x0012_3456);
    assert_eq!(dma.read_reg(0x24), 0x0004_0010);
}

#[test]
fn test_madr_masked_to_24_bits() {
    let mut dma = Dma::new();

    dma.write_reg(0x00, 0xFFFF_FFFF);
    assert_eq!(dma.read_reg(0x00), 0x00FF_FFFF);
}

#[test]
fn test_write_reg_reports_activation() {
    let mut dma = Dma::new();

    // Manual sync mode without the trigger bit: not active
    assert_eq!(dma.write_reg(0x68, 0x0100_0000), None);

    // Adding the trigger makes the channel active
    assert_eq!(dma.write_reg(0x68, 0x1100_0000), Some(DmaPort::Otc));

    // Request sync mode activates on enable alone
    assert_eq!(dma.write_reg(0x28, 0x0100_0200), Some(DmaPort::Gpu));
}

#[test]
fn test_interrupt_register_force_bit() {
    let mut dma = Dma::new();

    dma.write_reg(0x74, 1 << 15);
    let dicr = dma.read_reg(0x74);

    assert_ne!(dicr & (1 << 15), 0);
    assert_ne!(dicr & (1 << 31), 0, "force must drive the master flag");
}

#[test]
fn test_interrupt_flags_write_one_to_clear() {
    let mut dma = Dma::new();
    let mut ram = Ram::new();

    // Enable GPU channel interrupts plus the master enable, then finish
    // a transfer to set the GPU flag
    dma.write_reg(0x74, (1 << 18) | (1 << 23));
    dma.write_reg(0x60, 0x1000);
    dma.write_reg(0x64, 1);
    dma.write_reg(0x68, 0x1100_0002);
    dma.run_transfer(DmaPort::Otc, &mut ram, None);

    // OTC flag (bit 30) is not enabled, so it stays clear
    assert_eq!(dma.read_reg(0x74) & (1 << 30), 0);

    dma.write_reg(0x74, (1 << 22) | (1 << 23));
    dma.write_reg(0x68, 0x1100_0002);
    dma.run_transfer(DmaPort::Otc, &mut ram, None);

    let dicr = dma.read_reg(0x74);
    assert_ne!(dicr & (1 << 30), 0, "OTC flag should be set");
    assert_ne!(dicr & (1 << 31), 0, "master flag should be set");

    // Writing 0 to the flag bits preserves them
    dma.write_reg(0x74, (1 << 22) | (1 << 23));
    assert_ne!(dma.read_reg(0x74) & (1 << 30), 0);

    // Writing 1 clears exactly that flag
    dma.write_reg(0x74, (1 << 22) | (1 << 23) | (1 << 30));
    assert_eq!(dma.read_reg(0x74) & (1 << 30), 0);
    assert_eq!(dma.read_reg(0x74) & (1 << 31), 0);
}

#[test]
fn test_master_flag_composition() {
    let mut reg = InterruptRegister::default();

    // Flag without its enable does not raise the master flag
    reg.write(1 << 23);
    reg.set_port_flag(DmaPort::Gpu);
    assert!(!reg.master_flag());

    // Enable + flag + master enable raises it
    reg.write((1 << 18) | (1 << 23));
    reg.set_port_flag(DmaPort::Gpu);
    assert!(reg.master_flag());

    // Without the master enable it stays low
    reg.write(1 << 18);
    reg.set_port_flag(DmaPort::Gpu);
    assert!(!reg.master_flag());
}

#[test]
fn test_irq_edge_reported_once() {
    let mut dma = Dma::new();
    let mut ram = Ram::new();

    dma.write_reg(0x74, (1 << 22) | (1 << 23));
    dma.write_reg(0x60, 0x1000);
    dma.write_reg(0x64, 1);
    dma.write_reg(0x68, 0x1100_0002);
    dma.run_transfer(DmaPort::Otc, &mut ram, None);

    assert!(dma.irq_pending());
    assert!(dma.take_irq());
    assert!(!dma.irq_pending());

    // The flag is still set, so finishing another transfer is not a new edge
    dma.write_reg(0x68, 0x1100_0002);
    dma.run_transfer(DmaPort::Otc, &mut ram, None);
    assert!(!dma.irq_pending());
}

#[test]
fn test_channel_control_accessors() {
    let mut control = ChannelControl::default();
    control.set_word(0x1100_0403);

    assert_eq!(control.transfer_direction(), TransferDirection::FromRam);
    assert_eq!(control.memory_address_step(), MemoryAddressStep::Backward);
    assert_eq!(control.sync_mode(), SyncMode::LinkedList);
    assert!(control.enable());
    assert!(control.manual_trigger());
    assert!(!control.chopping_enable());
}
