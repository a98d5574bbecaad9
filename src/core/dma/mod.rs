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

//! DMA (Direct Memory Access) Controller
//!
//! This module implements the DMA controller, which moves bulk data between
//! RAM and peripherals without CPU intervention.
//!
//! # DMA Channels
//!
//! | Channel | Device      | Base Address |
//! |---------|-------------|--------------|
//! | 0       | MDEC In     | 0x1F801080   |
//! | 1       | MDEC Out    | 0x1F801090   |
//! | 2       | GPU         | 0x1F8010A0   |
//! | 3       | CD-ROM      | 0x1F8010B0   |
//! | 4       | SPU         | 0x1F8010C0   |
//! | 5       | PIO         | 0x1F8010D0   |
//! | 6       | OTC         | 0x1F8010E0   |
//!
//! Each channel has three registers: the memory address (+0x0), the block
//! control (+0x4) and the channel control (+0x8). The global control
//! register sits at +0x70 and the interrupt register at +0x74 (relative to
//! 0x1F801080).
//!
//! # Transfer Modes
//!
//! - **Manual** (sync 0): whole block at once, started by the manual trigger
//!   bit. Used by CD-ROM and OTC.
//! - **Request** (sync 1): `block_size * block_count` words, synced to device
//!   requests. Used by MDEC, SPU and GPU image data.
//! - **Linked list** (sync 2): walks GP0 command packets in RAM. GPU only.
//!
//! # References
//!
//! - [PSX-SPX: DMA Controller](http://problemkaputt.de/psx-spx.htm#dmacontroller)

use crate::core::error::DmaError;
use crate::core::gpu::Gpu;
use crate::core::memory::{Ram, RAM_ADDR_MASK};

#[cfg(test)]
mod tests;

/// End-of-table marker written by the ordering table clear
const OT_END_MARKER: u32 = 0x00FF_FFFF;

/// Iteration cap for linked-list walks, bounds malformed lists
const LINKED_LIST_ITERATION_CAP: u32 = 1 << 20;

/// The seven DMA ports, one per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaPort {
    /// Macroblock decoder input
    MdecIn = 0,
    /// Macroblock decoder output
    MdecOut = 1,
    /// Graphics Processing Unit
    Gpu = 2,
    /// CD-ROM drive
    CdRom = 3,
    /// Sound Processing Unit
    Spu = 4,
    /// Extension port
    Pio = 5,
    /// Ordering table clear
    Otc = 6,
}

impl DmaPort {
    /// Map a channel index (0-6) to its port
    pub fn from_index(index: usize) -> Option<DmaPort> {
        match index {
            0 => Some(DmaPort::MdecIn),
            1 => Some(DmaPort::MdecOut),
            2 => Some(DmaPort::Gpu),
            3 => Some(DmaPort::CdRom),
            4 => Some(DmaPort::Spu),
            5 => Some(DmaPort::Pio),
            6 => Some(DmaPort::Otc),
            _ => None,
        }
    }

    /// Channel index of this port
    #[inline(always)]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Short device name for log output
    pub fn name(self) -> &'static str {
        match self {
            DmaPort::MdecIn => "MDECin",
            DmaPort::MdecOut => "MDECout",
            DmaPort::Gpu => "GPU",
            DmaPort::CdRom => "CD-ROM",
            DmaPort::Spu => "SPU",
            DmaPort::Pio => "PIO",
            DmaPort::Otc => "OTC",
        }
    }
}

/// Transfer direction (channel control bit 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    /// Device to RAM
    ToRam = 0,
    /// RAM to device
    FromRam = 1,
}

/// Memory address step (channel control bit 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryAddressStep {
    /// +4 per word
    Forward = 0,
    /// -4 per word
    Backward = 1,
}

/// Transfer synchronization mode (channel control bits 9-10)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Whole block at once, started by the manual trigger bit
    Manual = 0,
    /// Blocks synced to device requests
    Request = 1,
    /// Linked list of GP0 packets (GPU only)
    LinkedList = 2,
    /// Reserved encoding (3)
    Reserved = 3,
}

/// Typed accessors over the channel control word
///
/// Bit layout:
/// - Bit 0: transfer direction (0=to RAM, 1=from RAM)
/// - Bit 1: memory address step (0=forward, 1=backward)
/// - Bit 8: chopping enable
/// - Bits 9-10: sync mode
/// - Bits 16-18: chopping DMA window size
/// - Bits 20-22: chopping CPU window size
/// - Bit 24: enable (start/busy)
/// - Bit 28: manual trigger
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelControl {
    word: u32,
}

impl ChannelControl {
    const DIRECTION: u32 = 1 << 0;
    const ADDRESS_STEP: u32 = 1 << 1;
    const CHOPPING_ENABLE: u32 = 1 << 8;
    const SYNC_MODE_SHIFT: u32 = 9;
    const CHOPPING_DMA_SHIFT: u32 = 16;
    const CHOPPING_CPU_SHIFT: u32 = 20;
    const ENABLE: u32 = 1 << 24;
    const MANUAL_TRIGGER: u32 = 1 << 28;

    /// Raw register word
    #[inline(always)]
    pub fn word(self) -> u32 {
        self.word
    }

    /// Replace the raw register word
    #[inline(always)]
    pub fn set_word(&mut self, value: u32) {
        self.word = value;
    }

    /// Transfer direction (bit 0)
    #[inline(always)]
    pub fn transfer_direction(self) -> TransferDirection {
        if self.word & Self::DIRECTION != 0 {
            TransferDirection::FromRam
        } else {
            TransferDirection::ToRam
        }
    }

    /// Memory address step (bit 1)
    #[inline(always)]
    pub fn memory_address_step(self) -> MemoryAddressStep {
        if self.word & Self::ADDRESS_STEP != 0 {
            MemoryAddressStep::Backward
        } else {
            MemoryAddressStep::Forward
        }
    }

    /// Chopping enable (bit 8)
    #[inline(always)]
    pub fn chopping_enable(self) -> bool {
        self.word & Self::CHOPPING_ENABLE != 0
    }

    /// Chopping DMA window size (bits 16-18)
    #[inline(always)]
    pub fn chopping_dma_window_size(self) -> u32 {
        (self.word >> Self::CHOPPING_DMA_SHIFT) & 0x7
    }

    /// Chopping CPU window size (bits 20-22)
    #[inline(always)]
    pub fn chopping_cpu_window_size(self) -> u32 {
        (self.word >> Self::CHOPPING_CPU_SHIFT) & 0x7
    }

    /// Sync mode (bits 9-10)
    #[inline(always)]
    pub fn sync_mode(self) -> SyncMode {
        match (self.word >> Self::SYNC_MODE_SHIFT) & 0x3 {
            0 => SyncMode::Manual,
            1 => SyncMode::Request,
            2 => SyncMode::LinkedList,
            _ => SyncMode::Reserved,
        }
    }

    /// Enable / busy flag (bit 24)
    #[inline(always)]
    pub fn enable(self) -> bool {
        self.word & Self::ENABLE != 0
    }

    /// Manual trigger flag (bit 28)
    #[inline(always)]
    pub fn manual_trigger(self) -> bool {
        self.word & Self::MANUAL_TRIGGER != 0
    }

    /// Clear enable and manual trigger when a transfer completes
    fn finish(&mut self) {
        self.word &= !(Self::ENABLE | Self::MANUAL_TRIGGER);
    }
}

/// Typed accessors over the interrupt register (0x74)
///
/// Bit layout:
/// - Bit 15: force IRQ
/// - Bits 16-22: per-channel IRQ enable
/// - Bit 23: master IRQ enable
/// - Bits 24-30: sticky per-channel flags (write 1 to clear)
/// - Bit 31: master flag, computed on read
#[derive(Debug, Clone, Copy, Default)]
pub struct InterruptRegister {
    word: u32,
}

impl InterruptRegister {
    const FORCE: u32 = 1 << 15;
    const ENABLE_SHIFT: u32 = 16;
    const MASTER_ENABLE: u32 = 1 << 23;
    const FLAG_SHIFT: u32 = 24;

    /// Register word with the computed master flag in bit 31
    pub fn word(self) -> u32 {
        let mut word = self.word & 0x7FFF_FFFF;
        if self.master_flag() {
            word |= 1 << 31;
        }
        word
    }

    /// Apply a CPU write: bits 0-23 are stored, flag bits are write-1-to-clear
    pub fn write(&mut self, value: u32) {
        self.word = (self.word & 0x7F00_0000) | (value & 0x00FF_FFFF);

        let clear = (value >> Self::FLAG_SHIFT) & 0x7F;
        self.word &= !(clear << Self::FLAG_SHIFT);
    }

    /// Whether the per-channel IRQ enable bit for `port` is set
    pub fn is_port_enabled(self, port: DmaPort) -> bool {
        self.word & (1 << (Self::ENABLE_SHIFT + port.index() as u32)) != 0
    }

    /// Set the sticky flag for `port`
    pub fn set_port_flag(&mut self, port: DmaPort) {
        self.word |= 1 << (Self::FLAG_SHIFT + port.index() as u32);
    }

    /// Master flag: `force | (master_enable & OR(flags & enables))`
    pub fn master_flag(self) -> bool {
        let force = self.word & Self::FORCE != 0;
        let master_enable = self.word & Self::MASTER_ENABLE != 0;
        let enables = (self.word >> Self::ENABLE_SHIFT) & 0x7F;
        let flags = (self.word >> Self::FLAG_SHIFT) & 0x7F;

        force || (master_enable && (flags & enables) != 0)
    }
}

/// A single DMA channel
#[derive(Debug, Clone, Copy, Default)]
pub struct DmaChannel {
    /// Channel control register (+0x8)
    control: ChannelControl,

    /// Block control register (+0x4)
    ///
    /// Interpreted per sync mode: low halfword is the word count in Manual
    /// mode or the block size in Request mode, high halfword is the block
    /// count in Request mode. Unused by linked lists.
    block_control: u32,

    /// Memory address register (+0x0), 24 usable bits
    base_addr: u32,
}

impl DmaChannel {
    /// A channel is active when enabled and, in Manual mode, triggered
    #[inline(always)]
    pub fn active(&self) -> bool {
        let triggered = match self.control.sync_mode() {
            SyncMode::Manual => self.control.manual_trigger(),
            _ => true,
        };
        self.control.enable() && triggered
    }

    /// Channel control accessors
    pub fn control(&self) -> ChannelControl {
        self.control
    }

    /// Word-aligned base address in RAM
    pub fn base_addr(&self) -> u32 {
        self.base_addr
    }

    /// Total words to move, per the current sync mode
    fn transfer_word_count(&self) -> u32 {
        match self.control.sync_mode() {
            SyncMode::Manual => self.block_control & 0xFFFF,
            SyncMode::Request => {
                let block_size = self.block_control & 0xFFFF;
                let block_count = (self.block_control >> 16) & 0xFFFF;
                block_size * block_count
            }
            SyncMode::LinkedList | SyncMode::Reserved => 0,
        }
    }
}

/// DMA controller with seven channels
///
/// Transfers run to completion inside [`Dma::run_transfer`]; the bus calls
/// it whenever a register write leaves a channel in the active state.
///
/// # Examples
///
/// ```
/// use ember_core::core::dma::Dma;
///
/// let dma = Dma::new();
/// assert_eq!(dma.read_reg(0x70), 0x07654321);
/// ```
pub struct Dma {
    /// The 7 channels (MDEC In/Out, GPU, CD-ROM, SPU, PIO, OTC)
    channels: [DmaChannel; 7],

    /// DMA control register (+0x70), channel priorities
    control: u32,

    /// DMA interrupt register (+0x74)
    interrupt: InterruptRegister,

    /// Set on a 0-to-1 transition of the interrupt master flag; the CPU
    /// collaborator consumes it via [`Dma::take_irq`]
    irq_pending: bool,
}

impl Dma {
    /// Create a new DMA controller with all channels idle
    pub fn new() -> Self {
        Self {
            channels: [DmaChannel::default(); 7],
            control: 0x0765_4321, // Reset priority ordering
            interrupt: InterruptRegister::default(),
            irq_pending: false,
        }
    }

    /// Read a DMA register
    ///
    /// `offset` is relative to the register file base 0x1F801080:
    /// `16*channel + {0, 4, 8}` for the per-channel registers, 0x70 for
    /// control and 0x74 for the interrupt register.
    pub fn read_reg(&self, offset: u32) -> u32 {
        match offset {
            0x00..=0x6F => {
                let channel = &self.channels[(offset >> 4) as usize];
                match offset & 0xF {
                    0x0 => channel.base_addr,
                    0x4 => channel.block_control,
                    0x8 => channel.control.word(),
                    _ => {
                        log::warn!("Unhandled DMA register read at offset 0x{:02X}", offset);
                        0
                    }
                }
            }
            0x70 => self.control,
            0x74 => self.interrupt.word(),
            _ => {
                log::warn!("Unhandled DMA register read at offset 0x{:02X}", offset);
                0
            }
        }
    }

    /// Write a DMA register
    ///
    /// Returns the port whose channel the write left in the active state,
    /// if any; the caller is expected to run the transfer immediately.
    pub fn write_reg(&mut self, offset: u32, value: u32) -> Option<DmaPort> {
        match offset {
            0x00..=0x6F => {
                let index = (offset >> 4) as usize;
                let port = DmaPort::from_index(index)?;
                let channel = &mut self.channels[index];

                match offset & 0xF {
                    0x0 => {
                        channel.base_addr = value & 0x00FF_FFFF;
                        log::trace!("DMA{} MADR = 0x{:08X}", index, channel.base_addr);
                    }
                    0x4 => {
                        channel.block_control = value;
                        log::trace!("DMA{} BCR = 0x{:08X}", index, value);
                    }
                    0x8 => {
                        channel.control.set_word(value);
                        log::trace!("DMA{} CHCR = 0x{:08X}", index, value);
                    }
                    _ => {
                        log::warn!(
                            "Unhandled DMA register write at offset 0x{:02X} = 0x{:08X}",
                            offset,
                            value
                        );
                        return None;
                    }
                }

                if self.channels[index].active() {
                    Some(port)
                } else {
                    None
                }
            }
            0x70 => {
                self.control = value;
                log::trace!("DPCR = 0x{:08X}", value);
                None
            }
            0x74 => {
                self.interrupt.write(value);
                log::trace!("DICR = 0x{:08X}", self.interrupt.word());
                None
            }
            _ => {
                log::warn!(
                    "Unhandled DMA register write at offset 0x{:02X} = 0x{:08X}",
                    offset,
                    value
                );
                None
            }
        }
    }

    /// Channel state, for collaborators and tests
    pub fn channel(&self, port: DmaPort) -> &DmaChannel {
        &self.channels[port.index()]
    }

    /// Whether an interrupt edge is waiting for the CPU collaborator
    pub fn irq_pending(&self) -> bool {
        self.irq_pending
    }

    /// Consume the pending interrupt edge
    pub fn take_irq(&mut self) -> bool {
        std::mem::take(&mut self.irq_pending)
    }

    /// Run an active channel's transfer to completion
    ///
    /// Dispatches on the channel's sync mode. Errors abort the transfer,
    /// deactivate the channel and are logged; they do not propagate (the
    /// console keeps running).
    pub fn run_transfer(&mut self, port: DmaPort, ram: &mut Ram, gpu: Option<&mut Gpu>) {
        let control = self.channels[port.index()].control;
        log::debug!(
            "DMA{} transfer: addr=0x{:08X} bcr=0x{:08X} chcr=0x{:08X}",
            port.index(),
            self.channels[port.index()].base_addr,
            self.channels[port.index()].block_control,
            control.word()
        );

        match control.sync_mode() {
            SyncMode::Manual | SyncMode::Request => self.do_block_transfer(port, ram, gpu),
            SyncMode::LinkedList => {
                if let Err(err) = self.do_linked_list_transfer(port, ram, gpu) {
                    log::error!("DMA{} linked-list transfer aborted: {}", port.index(), err);
                    self.abort_transfer(port);
                }
            }
            SyncMode::Reserved => {
                log::error!(
                    "DMA{}: invalid sync mode {}",
                    port.index(),
                    (control.word() >> 9) & 0x3
                );
                self.channels[port.index()].control.finish();
            }
        }
    }

    /// Manual / Request mode word burst
    fn do_block_transfer(&mut self, port: DmaPort, ram: &mut Ram, mut gpu: Option<&mut Gpu>) {
        let channel = self.channels[port.index()];

        let step: u32 = match channel.control.memory_address_step() {
            MemoryAddressStep::Forward => 4,
            MemoryAddressStep::Backward => 4u32.wrapping_neg(),
        };
        let words = channel.transfer_word_count();
        let direction = channel.control.transfer_direction();
        let mut addr = channel.base_addr & RAM_ADDR_MASK;

        log::debug!(
            "Starting DMA block transfer: {} {} RAM, {} words",
            port.name(),
            match direction {
                TransferDirection::ToRam => "to",
                TransferDirection::FromRam => "from",
            },
            words
        );

        if port == DmaPort::Otc {
            // The ordering table clear never touches a device; its words are
            // synthesized. The first word written is the end-of-table marker,
            // each later entry links to the entry written just before it.
            for i in 0..words {
                addr = addr.wrapping_add(step) & RAM_ADDR_MASK;
                let word = if i == 0 {
                    OT_END_MARKER
                } else {
                    addr.wrapping_add(4) & RAM_ADDR_MASK
                };
                ram.dma_write32(addr, word);
            }
        } else {
            for _ in 0..words {
                match direction {
                    TransferDirection::FromRam => {
                        let word = ram.dma_read32(addr);
                        match port {
                            DmaPort::Gpu => match gpu.as_deref_mut() {
                                Some(gpu) => gpu.gp0(word),
                                None => log::warn!("GPU DMA with no GPU attached"),
                            },
                            _ => log::warn!(
                                "DMA transfer of word 0x{:08X} to unimplemented port {}",
                                word,
                                port.name()
                            ),
                        }
                    }
                    TransferDirection::ToRam => {
                        let word = match port {
                            DmaPort::Gpu => match gpu.as_deref_mut() {
                                Some(gpu) => gpu.gpuread(),
                                None => {
                                    log::warn!("GPU DMA with no GPU attached");
                                    0
                                }
                            },
                            _ => {
                                log::warn!(
                                    "DMA transfer from unimplemented port {}",
                                    port.name()
                                );
                                0
                            }
                        };
                        ram.dma_write32(addr, word);
                    }
                }
                addr = addr.wrapping_add(step) & RAM_ADDR_MASK;
            }
        }

        self.transfer_finished(port);
    }

    /// Linked-list transfer: walk GP0 packets in RAM and feed them to the GPU
    fn do_linked_list_transfer(
        &mut self,
        port: DmaPort,
        ram: &mut Ram,
        gpu: Option<&mut Gpu>,
    ) -> Result<(), DmaError> {
        let channel = self.channels[port.index()];

        if port != DmaPort::Gpu
            || channel.control.transfer_direction() != TransferDirection::FromRam
        {
            return Err(DmaError::InvalidSyncMode {
                channel: port.index(),
                mode: SyncMode::LinkedList as u32,
            });
        }

        let gpu = match gpu {
            Some(gpu) => gpu,
            None => {
                log::warn!("GPU linked-list DMA with no GPU attached");
                self.transfer_finished(port);
                return Ok(());
            }
        };

        let mut addr = channel.base_addr & RAM_ADDR_MASK;

        log::debug!("Starting DMA linked list transfer: RAM to GPU");

        for _ in 0..LINKED_LIST_ITERATION_CAP {
            let header = ram.dma_read32(addr);
            let word_count = header >> 24;

            if word_count > 0 {
                log::trace!("GPU packet at 0x{:08X} ({} words)", addr, word_count);
            }

            for i in 1..=word_count {
                let word = ram.dma_read32(addr.wrapping_add(4 * i) & RAM_ADDR_MASK);
                gpu.gp0(word);
            }

            // The hardware only checks bit 23 of the next pointer,
            // not the whole end marker
            if header & 0x0080_0000 != 0 {
                self.transfer_finished(port);
                return Ok(());
            }

            addr = header & RAM_ADDR_MASK;
        }

        Err(DmaError::Runaway { address: addr })
    }

    /// Complete a transfer: deactivate the channel and raise its flag
    /// when enabled in the interrupt register
    fn transfer_finished(&mut self, port: DmaPort) {
        self.channels[port.index()].control.finish();

        if self.interrupt.is_port_enabled(port) {
            let was_set = self.interrupt.master_flag();
            self.interrupt.set_port_flag(port);
            if !was_set && self.interrupt.master_flag() {
                self.irq_pending = true;
            }
        }
    }

    /// Abort a failed transfer: deactivate the channel and raise its flag
    /// unconditionally so the CPU collaborator can observe the fault
    fn abort_transfer(&mut self, port: DmaPort) {
        self.channels[port.index()].control.finish();

        let was_set = self.interrupt.master_flag();
        self.interrupt.set_port_flag(port);
        if !was_set && self.interrupt.master_flag() {
            self.irq_pending = true;
        }
    }
}

impl Default for Dma {
    fn default() -> Self {
        Self::new()
    }
}
