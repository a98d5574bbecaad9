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

//! Core emulation components
//!
//! This module contains the hardware components that make up the core
//! simulation substrate:
//! - BIOS image holder (512 KiB, read-only)
//! - Memory bus (RAM, BIOS, memory-mapped I/O routing)
//! - DMA controller (7 channels, block and linked-list transfers)
//! - GPU (VRAM, GP0/GP1 command processing, software rasterizer)
//! - CD-ROM disc reader (BIN/CUE images, 2352-byte raw sectors)
//! - System integration

pub mod bios;
pub mod cdrom;
pub mod dma;
pub mod error;
pub mod gpu;
pub mod memory;
pub mod system;

// Re-export commonly used types
pub use bios::Bios;
pub use cdrom::{CdromDisk, CdromPosition};
pub use dma::Dma;
pub use error::{CdRomError, EmulatorError, GpuError, Result};
pub use gpu::Gpu;
pub use memory::{Bus, Ram};
pub use system::System;
