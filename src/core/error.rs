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

//! Emulator error types
use std::fmt;

/// Result type for emulator operations
pub type Result<T> = std::result::Result<T, EmulatorError>;

/// Direction of a memory access that failed on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOp {
    /// Read access
    Read,
    /// Write access
    Write,
}

impl fmt::Display for AccessOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessOp::Read => write!(f, "read"),
            AccessOp::Write => write!(f, "write"),
        }
    }
}

/// Emulator error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmulatorError {
    /// Unaligned memory access error
    UnalignedAccess {
        /// The address that was accessed
        address: u32,
        /// The size of the access in bytes (2 for 16-bit, 4 for 32-bit)
        size: u32,
    },

    /// Access to an address no component claims
    BusError {
        /// The address that was accessed
        address: u32,
        /// Access width in bytes
        width: u32,
        /// Whether the access was a read or a write
        op: AccessOp,
    },

    /// Offset outside a fixed-size memory image
    AddressOutOfRange {
        /// The offset that was accessed
        offset: u32,
        /// Size of the image in bytes
        size: u32,
    },

    /// I/O error (file operations)
    IoError {
        /// Error message
        message: String,
    },

    /// BIOS file could not be found or opened
    BiosNotFound(String),

    /// BIOS has an unexpected size
    InvalidBiosSize {
        /// Expected size in bytes
        expected: usize,
        /// Actual size in bytes
        got: usize,
    },

    /// DMA controller error
    Dma(DmaError),

    /// CD-ROM subsystem error
    CdRom(CdRomError),

    /// GPU command decoding error
    Gpu(GpuError),
}

/// DMA controller error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DmaError {
    /// Channel control requests a sync mode the channel does not support
    InvalidSyncMode {
        /// Channel index (0-6)
        channel: usize,
        /// Raw sync mode bits
        mode: u32,
    },

    /// Linked-list walk exceeded the iteration cap
    Runaway {
        /// Address of the last packet header visited
        address: u32,
    },
}

/// CD-ROM subsystem error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CdRomError {
    /// Disc image could not be loaded
    DiscLoadError(String),

    /// A Data sector did not start with the sync pattern,
    /// or an Audio sector did
    SyncPatternMismatch {
        /// LBA of the offending sector
        lba: u32,
    },

    /// Read position is past the end of the track
    ReadPastEnd {
        /// LBA of the requested sector
        lba: u32,
        /// Frame count of the track
        frame_count: u32,
    },

    /// No track covers the requested position
    NoTrack,
}

/// GPU command decoding error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    /// GP0 opcode has no handler
    UnhandledCommand(u32),

    /// GP0 packet is shorter than its decoded argument count
    MalformedPacket {
        /// Opcode byte of the packet
        opcode: u8,
        /// Number of words expected
        expected: usize,
        /// Number of words present
        got: usize,
    },
}

impl fmt::Display for EmulatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmulatorError::UnalignedAccess { address, size } => {
                write!(
                    f,
                    "Unaligned {}-bit access at address 0x{:08X}",
                    size * 8,
                    address
                )
            }
            EmulatorError::BusError { address, width, op } => {
                write!(
                    f,
                    "Bus error: {}-bit {} at unmapped address 0x{:08X}",
                    width * 8,
                    op,
                    address
                )
            }
            EmulatorError::AddressOutOfRange { offset, size } => {
                write!(
                    f,
                    "Offset 0x{:08X} out of range for {}-byte image",
                    offset, size
                )
            }
            EmulatorError::IoError { message } => {
                write!(f, "I/O error: {}", message)
            }
            EmulatorError::BiosNotFound(path) => {
                write!(f, "BIOS file not found: {}", path)
            }
            EmulatorError::InvalidBiosSize { expected, got } => {
                write!(
                    f,
                    "Invalid BIOS size: expected {} bytes, got {} bytes",
                    expected, got
                )
            }
            EmulatorError::Dma(e) => write!(f, "DMA error: {}", e),
            EmulatorError::CdRom(e) => write!(f, "CD-ROM error: {}", e),
            EmulatorError::Gpu(e) => write!(f, "GPU error: {}", e),
        }
    }
}

impl fmt::Display for DmaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DmaError::InvalidSyncMode { channel, mode } => {
                write!(f, "Invalid sync mode {} for channel {}", mode, channel)
            }
            DmaError::Runaway { address } => {
                write!(
                    f,
                    "Linked-list iteration cap exceeded at 0x{:08X}",
                    address
                )
            }
        }
    }
}

impl fmt::Display for CdRomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CdRomError::DiscLoadError(msg) => write!(f, "Disc load failed: {}", msg),
            CdRomError::SyncPatternMismatch { lba } => {
                write!(f, "Sync pattern mismatch in sector at LBA {}", lba)
            }
            CdRomError::ReadPastEnd { lba, frame_count } => {
                write!(
                    f,
                    "Read at LBA {} past end of track ({} frames)",
                    lba, frame_count
                )
            }
            CdRomError::NoTrack => write!(f, "No track loaded"),
        }
    }
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::UnhandledCommand(cmd) => {
                write!(f, "Unhandled GP0 command 0x{:08X}", cmd)
            }
            GpuError::MalformedPacket {
                opcode,
                expected,
                got,
            } => {
                write!(
                    f,
                    "Malformed GP0 packet (op 0x{:02X}): expected {} words, got {}",
                    opcode, expected, got
                )
            }
        }
    }
}

impl std::error::Error for EmulatorError {}
impl std::error::Error for DmaError {}
impl std::error::Error for CdRomError {}
impl std::error::Error for GpuError {}

impl From<std::io::Error> for EmulatorError {
    fn from(err: std::io::Error) -> Self {
        EmulatorError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for CdRomError {
    fn from(err: std::io::Error) -> Self {
        CdRomError::DiscLoadError(err.to_string())
    }
}

impl From<DmaError> for EmulatorError {
    fn from(err: DmaError) -> Self {
        EmulatorError::Dma(err)
    }
}

impl From<CdRomError> for EmulatorError {
    fn from(err: CdRomError) -> Self {
        EmulatorError::CdRom(err)
    }
}

impl From<GpuError> for EmulatorError {
    fn from(err: GpuError) -> Self {
        EmulatorError::Gpu(err)
    }
}
