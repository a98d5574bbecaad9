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

//! System integration module
//!
//! Ties the core components together: the bus (owning RAM and BIOS), the
//! DMA controller, the GPU and the disc drive. The CPU interpreter is an
//! external collaborator that drives the system through [`System::bus_mut`].
//!
//! Execution is single-threaded and cooperative: every bus access, DMA
//! transfer and draw command runs to completion before control returns, so
//! ordering is total and deterministic.

use super::cdrom::CdromDisk;
use super::dma::Dma;
use super::error::{CdRomError, Result};
use super::gpu::Gpu;
use super::memory::Bus;
use std::cell::RefCell;
use std::rc::Rc;

/// PlayStation system
///
/// # Example
///
/// ```no_run
/// use ember_core::core::system::System;
///
/// let mut system = System::new();
/// system.load_bios("SCPH1001.BIN").unwrap();
/// system.load_disc("game.bin").unwrap();
///
/// // The reset vector the CPU collaborator will fetch
/// let entry = system.bus().read32(0xBFC00000).unwrap();
/// ```
pub struct System {
    /// Memory bus, owns RAM and the BIOS image
    bus: Bus,

    /// GPU (shared with the bus for memory-mapped access)
    gpu: Rc<RefCell<Gpu>>,

    /// DMA controller (shared with the bus for memory-mapped access)
    dma: Rc<RefCell<Dma>>,

    /// Disc drive media
    disk: CdromDisk,
}

impl System {
    /// Create a system with all components in their reset state
    pub fn new() -> Self {
        let gpu = Rc::new(RefCell::new(Gpu::new()));
        let dma = Rc::new(RefCell::new(Dma::new()));

        let mut bus = Bus::new();
        bus.set_gpu(Rc::clone(&gpu));
        bus.set_dma(Rc::clone(&dma));

        Self {
            bus,
            gpu,
            dma,
            disk: CdromDisk::new(),
        }
    }

    /// Load the BIOS image
    ///
    /// # Errors
    ///
    /// `BiosNotFound` when the file is missing, `InvalidBiosSize` when it
    /// is not exactly 512 KiB.
    pub fn load_bios(&mut self, path: &str) -> Result<()> {
        self.bus.load_bios(path)
    }

    /// Load a disc image, BIN or CUE by file extension
    pub fn load_disc(&mut self, path: &str) -> std::result::Result<(), CdRomError> {
        let is_cue = path
            .rsplit('.')
            .next()
            .map(|ext| ext.eq_ignore_ascii_case("cue"))
            .unwrap_or(false);

        if is_cue {
            self.disk.init_from_cue(path)
        } else {
            self.disk.init_from_bin(path)
        }
    }

    /// Reset volatile state, simulating a power cycle
    ///
    /// RAM clears, the GPU registers reset, loaded BIOS and disc stay.
    pub fn reset(&mut self) {
        self.bus.reset();
        self.gpu.borrow_mut().reset();
    }

    /// Memory bus
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Mutable memory bus, the CPU collaborator's access path
    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    /// Shared handle to the GPU
    pub fn gpu(&self) -> Rc<RefCell<Gpu>> {
        Rc::clone(&self.gpu)
    }

    /// Shared handle to the DMA controller
    pub fn dma(&self) -> Rc<RefCell<Dma>> {
        Rc::clone(&self.dma)
    }

    /// Disc drive media
    pub fn disk(&self) -> &CdromDisk {
        &self.disk
    }

    /// Mutable disc drive media
    pub fn disk_mut(&mut self) -> &mut CdromDisk {
        &mut self.disk
    }
}

impl Default for System {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_wiring_routes_gpu_registers() {
        let mut system = System::new();

        // GPUSTAT is reachable through the bus
        let status = system.bus().read32(0x1F801814).unwrap();
        assert_ne!(status & (1 << 26), 0);

        // GP1 display enable lands in the GPU
        system.bus_mut().write32(0x1F801814, 0x0300_0000).unwrap();
        let status = system.bus().read32(0x1F801814).unwrap();
        assert_eq!(status & (1 << 23), 0);
    }

    #[test]
    fn test_system_wiring_routes_dma_registers() {
        let mut system = System::new();

        assert_eq!(system.bus().read32(0x1F8010F0).unwrap(), 0x0765_4321);

        system.bus_mut().write32(0x1F8010A0, 0x1234).unwrap();
        assert_eq!(system.bus().read32(0x1F8010A0).unwrap(), 0x1234);
    }

    #[test]
    fn test_dma_register_write_runs_transfer() {
        let mut system = System::new();

        // OTC clear: 4 words backward from 0x00100000
        system.bus_mut().write32(0x1F8010E0, 0x0010_0000).unwrap();
        system.bus_mut().write32(0x1F8010E4, 4).unwrap();
        system.bus_mut().write32(0x1F8010E8, 0x1100_0003).unwrap();

        // The transfer completed before the register write returned
        assert_eq!(system.bus().read32(0x000F_FFFC).unwrap(), 0x00FF_FFFF);
        assert_eq!(system.bus().read32(0x000F_FFF8).unwrap(), 0x000F_FFFC);

        let chcr = system.bus().read32(0x1F8010E8).unwrap();
        assert_eq!(chcr & 0x0100_0000, 0, "channel must deactivate");
    }

    #[test]
    fn test_gpu_linked_list_dma_through_bus() {
        let mut system = System::new();

        let next = 0x2000;
        system
            .bus_mut()
            .write32(0x1000, 0x0100_0000 | next)
            .unwrap();
        system.bus_mut().write32(0x1004, 0xE500_0000 | 33).unwrap();
        system.bus_mut().write32(next, 0x00FF_FFFF).unwrap();

        system.bus_mut().write32(0x1F8010A0, 0x1000).unwrap();
        system.bus_mut().write32(0x1F8010A8, 0x0100_0401).unwrap();

        // The packet word reached GP0 and executed
        assert_eq!(system.gpu().borrow().draw_offset(), (33, 0));
    }

    #[test]
    fn test_reset_clears_ram_keeps_bios() {
        let mut system = System::new();

        system.bus_mut().write32(0x1000, 0xDEAD_BEEF).unwrap();
        system.reset();
        assert_eq!(system.bus().read32(0x1000).unwrap(), 0);
    }

    #[test]
    fn test_load_disc_dispatches_on_extension() {
        let mut system = System::new();

        // Missing files surface as disc load errors either way
        assert!(system.load_disc("/nonexistent/game.cue").is_err());
        assert!(system.load_disc("/nonexistent/game.bin").is_err());
    }
}
