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

//! GPU (Graphics Processing Unit)
//!
//! The GPU owns the 1 MiB VRAM framebuffer (1024x512 16-bit pixels) and
//! the GP0/GP1 command machinery. GP0 words arrive one at a time (from the
//! CPU collaborator or the DMA engine), are queued until a complete command
//! is assembled, and then dispatched to the software rasterizer or to the
//! VRAM transfer state machine.
//!
//! # Registers
//!
//! | Address    | Write | Read    |
//! |------------|-------|---------|
//! | 0x1F801810 | GP0   | GPUREAD |
//! | 0x1F801814 | GP1   | GPUSTAT |

pub mod primitives;
mod render;

#[cfg(test)]
mod tests;

pub use primitives::{
    BlendMode, Color, CommandFlags, DrawCommand, LineCommand, Palette, PolygonCommand, Position,
    QuadTriangleIndex, RectSize, RectangleCommand, Shading, Size, TexCoord, TextureDepth,
    TextureInfo, TextureMode, TexturePage, MAX_GP0_CMD_LEN,
};

use crate::core::error::GpuError;

/// VRAM width in 16-bit pixels
pub const VRAM_WIDTH: usize = 1024;

/// VRAM height in lines
pub const VRAM_HEIGHT: usize = 512;

/// What the GP0 state machine is currently assembling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gp0CommandKind {
    /// Waiting for a fresh command word
    None,
    /// Polygon draw (0x20-0x3F)
    DrawPolygon,
    /// Line draw (0x40-0x5F)
    DrawLine,
    /// Rectangle draw (0x60-0x7F)
    DrawRectangle,
    /// Fill rectangle in VRAM (0x02)
    FillRectangle,
    /// Copy rectangle CPU to VRAM (0xA0), collecting the two setup words
    CopyCpuToVram,
    /// Copy rectangle CPU to VRAM, now receiving image data words
    CopyCpuToVramTransferring,
    /// Copy rectangle VRAM to CPU (0xC0)
    CopyVramToCpu,
    /// Copy rectangle VRAM to VRAM (0x80)
    CopyVramToVram,
}

/// In-flight VRAM transfer rectangle
#[derive(Debug, Clone, Copy, Default)]
struct VramTransfer {
    x: u16,
    y: u16,
    x_start: u16,
    width: u16,
    height: u16,
}

/// GPU with VRAM, draw environment state and the GP0/GP1 command decoders
///
/// # Examples
///
/// ```
/// use ember_core::core::gpu::Gpu;
///
/// let mut gpu = Gpu::new();
///
/// // Flat red triangle covering the VRAM origin
/// gpu.gp0(0x2000_00FF);
/// gpu.gp0(0x0000_0000);
/// gpu.gp0(0x0000_0020);
/// gpu.gp0(0x0020_0000);
///
/// assert_ne!(gpu.vram_read16(0, 0), 0);
/// ```
pub struct Gpu {
    /// VRAM as 1024x512 16-bit pixels
    vram: Vec<u16>,

    /// GPUSTAT backing word
    status: u32,

    /// GP0(E1h) draw mode word (texture page base, depth, rect flips)
    draw_mode: u32,

    /// GP0(E2h) texture window word
    tex_window: u32,

    /// GP0(E3h) drawing area top left (x, y)
    drawing_area_top_left: (u16, u16),

    /// GP0(E4h) drawing area bottom right (x, y)
    drawing_area_bottom_right: (u16, u16),

    /// GP0(E5h) drawing offset, sign-extended to 11 bits
    drawing_offset: (i16, i16),

    /// GP1(05h) display area start word
    display_area: u32,

    /// GP1(06h) horizontal display range word
    hdisplay_range: u32,

    /// GP1(07h) vertical display range word
    vdisplay_range: u32,

    /// Kind of the command currently being assembled
    gp0_kind: Gp0CommandKind,

    /// Words of the command being assembled (command word first)
    gp0_cmd: Vec<u32>,

    /// Number of argument words the command needs
    gp0_arg_count: usize,

    /// Argument words received so far
    gp0_arg_index: usize,

    /// CPU<->VRAM transfer rectangle state
    transfer: VramTransfer,

    /// Every word pushed through GP0, for assertions in tests
    #[cfg(test)]
    pub(crate) gp0_words: Vec<u32>,
}

impl Gpu {
    /// GPUSTAT reset value
    const STATUS_RESET: u32 = 0x1480_2000;

    /// Create a GPU with zeroed VRAM and reset register state
    pub fn new() -> Self {
        Self {
            vram: vec![0u16; VRAM_WIDTH * VRAM_HEIGHT],
            status: Self::STATUS_RESET,
            draw_mode: 0,
            tex_window: 0,
            drawing_area_top_left: (0, 0),
            drawing_area_bottom_right: (0, 0),
            drawing_offset: (0, 0),
            display_area: 0,
            hdisplay_range: 0,
            vdisplay_range: 0,
            gp0_kind: Gp0CommandKind::None,
            gp0_cmd: Vec::with_capacity(MAX_GP0_CMD_LEN),
            gp0_arg_count: 0,
            gp0_arg_index: 0,
            transfer: VramTransfer::default(),
            #[cfg(test)]
            gp0_words: Vec::new(),
        }
    }

    /// Reset register state, preserving VRAM contents
    pub fn reset(&mut self) {
        self.gp1_soft_reset();
    }

    /// Read a GPU register: 0 = GPUREAD, 4 = GPUSTAT
    pub fn read_reg(&mut self, offset: u32) -> u32 {
        match offset {
            0 => self.gpuread(),
            4 => self.status(),
            _ => {
                log::warn!("Unhandled GPU register read at offset 0x{:X}", offset);
                0
            }
        }
    }

    /// Write a GPU register: 0 = GP0, 4 = GP1
    pub fn write_reg(&mut self, offset: u32, value: u32) {
        match offset {
            0 => self.gp0(value),
            4 => self.gp1(value),
            _ => log::warn!(
                "Unhandled GPU register write at offset 0x{:X} = 0x{:08X}",
                offset,
                value
            ),
        }
    }

    /// GPUSTAT value
    ///
    /// The ready bits (26-28) are hardcoded set: this core completes every
    /// command synchronously, so the GPU is always ready for more.
    pub fn status(&self) -> u32 {
        let mut status = self.status;
        status |= 1 << 26; // Ready to receive command word
        status |= 1 << 27; // Ready to send VRAM to CPU
        status |= 1 << 28; // Ready to receive DMA block
        status
    }

    /// Current drawing area as (min_x, min_y, max_x, max_y), inclusive
    pub fn draw_area(&self) -> (i32, i32, i32, i32) {
        (
            self.drawing_area_top_left.0 as i32,
            self.drawing_area_top_left.1 as i32,
            self.drawing_area_bottom_right.0 as i32,
            self.drawing_area_bottom_right.1 as i32,
        )
    }

    /// Current drawing offset
    pub fn draw_offset(&self) -> (i16, i16) {
        self.drawing_offset
    }

    /// GP0(E2h) texture window word, for the presentation collaborator
    pub fn texture_window(&self) -> u32 {
        self.tex_window
    }

    /// GP1(05h) display area word, for the presentation collaborator
    pub fn display_area(&self) -> u32 {
        self.display_area
    }

    /// GP1(06h/07h) display range words, for the presentation collaborator
    pub fn display_ranges(&self) -> (u32, u32) {
        (self.hdisplay_range, self.vdisplay_range)
    }

    /// Semi-transparency operator from the current draw mode
    pub fn blend_mode(&self) -> BlendMode {
        BlendMode::from_bits(((self.draw_mode >> 5) & 0x3) as u8)
    }

    /// Read a VRAM pixel; out-of-range coordinates read as 0
    pub fn vram_read16(&self, x: i32, y: i32) -> u16 {
        if !(0..VRAM_WIDTH as i32).contains(&x) || !(0..VRAM_HEIGHT as i32).contains(&y) {
            return 0;
        }
        self.vram[y as usize * VRAM_WIDTH + x as usize]
    }

    /// Write a VRAM pixel; out-of-range coordinates are dropped
    pub fn vram_write16(&mut self, x: i32, y: i32, value: u16) {
        if !(0..VRAM_WIDTH as i32).contains(&x) || !(0..VRAM_HEIGHT as i32).contains(&y) {
            return;
        }
        self.vram[y as usize * VRAM_WIDTH + x as usize] = value;
    }

    /// Write a VRAM pixel with coordinates wrapped into the framebuffer
    fn vram_write16_wrapped(&mut self, x: u16, y: u16, value: u16) {
        let x = x as usize % VRAM_WIDTH;
        let y = y as usize % VRAM_HEIGHT;
        self.vram[y * VRAM_WIDTH + x] = value;
    }

    /// Full framebuffer, for the presentation collaborator
    pub fn vram(&self) -> &[u16] {
        &self.vram
    }

    /// Push one word into the GP0 command FIFO
    ///
    /// Commands assemble across calls; once the decoded argument count is
    /// reached the command executes synchronously. Undecodable opcodes are
    /// logged and dropped, they never abort the machine.
    pub fn gp0(&mut self, word: u32) {
        #[cfg(test)]
        self.gp0_words.push(word);

        if self.gp0_kind == Gp0CommandKind::None {
            self.start_gp0_command(word);
            return;
        }

        self.gp0_arg_index += 1;

        if self.gp0_kind == Gp0CommandKind::CopyCpuToVramTransferring {
            self.cpu_to_vram_data(word);
            return;
        }

        self.gp0_cmd.push(word);

        let mut command_issued = self.gp0_arg_index == self.gp0_arg_count;

        // Poly-lines claim the maximum length and stop at a terminator word
        if self.gp0_arg_count == MAX_GP0_CMD_LEN - 1
            && !command_issued
            && (word == 0x5555_5555 || word == 0x5000_5000)
        {
            command_issued = true;
        }

        if command_issued {
            let kind = self.gp0_kind;
            self.gp0_kind = Gp0CommandKind::None;
            self.run_gp0_command(kind);
        }
    }

    /// Decode the first word of a GP0 command
    fn start_gp0_command(&mut self, word: u32) {
        self.gp0_cmd.clear();
        self.gp0_cmd.push(word);
        self.gp0_arg_index = 0;
        self.gp0_arg_count = 0;

        let opcode = (word >> 24) as u8;

        match opcode {
            0x00 => {} // Nop
            0x01 => {} // Clear texture cache (no cache emulated)
            0x02 => {
                self.gp0_kind = Gp0CommandKind::FillRectangle;
                self.gp0_arg_count = 2;
            }
            0x1F => self.status |= 1 << 24, // GPU IRQ request
            0x20..=0x7F => {
                if let Some(command) = DrawCommand::decode(opcode) {
                    self.gp0_kind = match command {
                        DrawCommand::Polygon(_) => Gp0CommandKind::DrawPolygon,
                        DrawCommand::Line(_) => Gp0CommandKind::DrawLine,
                        DrawCommand::Rectangle(_) => Gp0CommandKind::DrawRectangle,
                    };
                    self.gp0_arg_count = command.arg_count();
                }
            }
            0x80 => {
                self.gp0_kind = Gp0CommandKind::CopyVramToVram;
                self.gp0_arg_count = 3;
            }
            0xA0 => {
                self.gp0_kind = Gp0CommandKind::CopyCpuToVram;
                self.gp0_arg_count = 2;
            }
            0xC0 => {
                self.gp0_kind = Gp0CommandKind::CopyVramToCpu;
                self.gp0_arg_count = 2;
            }
            0xE1 => self.gp0_draw_mode(word),
            0xE2 => self.tex_window = word,
            0xE3 => {
                self.drawing_area_top_left = Self::decode_drawing_area(word);
            }
            0xE4 => {
                self.drawing_area_bottom_right = Self::decode_drawing_area(word);
            }
            0xE5 => self.gp0_drawing_offset(word),
            0xE6 => self.gp0_mask_bit(word),
            _ => {
                // Unknown opcodes may carry arguments we cannot count, so
                // dropping the word is the safest recovery
                log::error!("{}", GpuError::UnhandledCommand(word));
            }
        }
    }

    /// Execute a fully assembled GP0 command
    fn run_gp0_command(&mut self, kind: Gp0CommandKind) {
        let opcode = (self.gp0_cmd[0] >> 24) as u8;

        match kind {
            Gp0CommandKind::DrawPolygon => {
                if let Some(DrawCommand::Polygon(polygon)) = DrawCommand::decode(opcode) {
                    self.draw_polygon(polygon);
                }
            }
            Gp0CommandKind::DrawLine => {
                if let Some(DrawCommand::Line(line)) = DrawCommand::decode(opcode) {
                    self.draw_line_command(line);
                }
            }
            Gp0CommandKind::DrawRectangle => {
                if let Some(DrawCommand::Rectangle(rectangle)) = DrawCommand::decode(opcode) {
                    self.draw_rectangle(rectangle);
                }
            }
            Gp0CommandKind::FillRectangle => self.fill_rectangle(),
            Gp0CommandKind::CopyCpuToVram => self.copy_cpu_to_vram_setup(),
            Gp0CommandKind::CopyVramToCpu => self.copy_vram_to_cpu_setup(),
            Gp0CommandKind::CopyVramToVram => self.copy_vram_to_vram(),
            Gp0CommandKind::CopyCpuToVramTransferring | Gp0CommandKind::None => {}
        }
    }

    /// Handle a GP1 control word
    pub fn gp1(&mut self, word: u32) {
        let opcode = (word >> 24) & 0xFF;

        match opcode {
            0x00 => self.gp1_soft_reset(),
            0x01 => self.gp1_command_buffer_reset(),
            0x02 => self.status &= !(1 << 24), // Acknowledge GPU IRQ
            0x03 => {
                // Display enable: GPUSTAT.23 (0=enabled, 1=disabled)
                self.status = (self.status & !(1 << 23)) | ((word & 1) << 23);
            }
            0x04 => {
                // DMA direction: GPUSTAT.29-30
                self.status = (self.status & !(0x3 << 29)) | ((word & 0x3) << 29);
            }
            0x05 => self.display_area = word,
            0x06 => self.hdisplay_range = word,
            0x07 => self.vdisplay_range = word,
            0x08 => {
                // Display mode: GPUSTAT.17-22 from bits 0-5, GPUSTAT.16 from
                // bit 6, GPUSTAT.14 from bit 7
                self.status = (self.status & !(0x3F << 17)) | ((word & 0x3F) << 17);
                self.status = (self.status & !(1 << 16)) | (((word >> 6) & 1) << 16);
                self.status = (self.status & !(1 << 14)) | (((word >> 7) & 1) << 14);
            }
            _ => log::warn!("Unhandled GP1 command: 0x{:08X}", word),
        }
    }

    fn gp1_soft_reset(&mut self) {
        self.status = Self::STATUS_RESET;
        self.draw_mode = 0;
        self.tex_window = 0;
        self.drawing_area_top_left = (0, 0);
        self.drawing_area_bottom_right = (0, 0);
        self.drawing_offset = (0, 0);
        self.display_area = 0;
        self.hdisplay_range = 0;
        self.vdisplay_range = 0;
        self.gp1_command_buffer_reset();
    }

    fn gp1_command_buffer_reset(&mut self) {
        self.gp0_cmd.clear();
        self.gp0_kind = Gp0CommandKind::None;
        self.gp0_arg_count = 0;
        self.gp0_arg_index = 0;
    }

    /// GP0(E1h): draw mode word, mirrored into GPUSTAT bits 0-10 and 15
    fn gp0_draw_mode(&mut self, word: u32) {
        self.draw_mode = word;

        self.status = (self.status & !0x7FF) | (word & 0x7FF);
        self.status = (self.status & !(1 << 15)) | (((word >> 11) & 1) << 15);
    }

    /// GP0(E3h/E4h): 10-bit x, 9-bit y packed drawing area corner
    fn decode_drawing_area(word: u32) -> (u16, u16) {
        ((word & 0x3FF) as u16, ((word >> 10) & 0x1FF) as u16)
    }

    /// GP0(E5h): drawing offset, two signed 11-bit fields
    fn gp0_drawing_offset(&mut self, word: u32) {
        let x = (((word & 0x7FF) as i16) << 5) >> 5;
        let y = ((((word >> 11) & 0x7FF) as i16) << 5) >> 5;
        self.drawing_offset = (x, y);
    }

    /// GP0(E6h): mask bit settings, mirrored into GPUSTAT bits 11-12
    fn gp0_mask_bit(&mut self, word: u32) {
        self.status = (self.status & !(1 << 11)) | ((word & 1) << 11);
        self.status = (self.status & !(1 << 12)) | (((word >> 1) & 1) << 12);
    }

    /// GP0(02h): fill a rectangle in VRAM, wrapping at the edges
    fn fill_rectangle(&mut self) {
        let color = Color::from_u32(self.gp0_cmd[0]).to_rgb15();
        let start = Position::from_u32_fill(self.gp0_cmd[1]);
        let size = Size::from_u32_fill(self.gp0_cmd[2]);

        for y in start.y..start.y + size.height {
            for x in start.x..start.x + size.width {
                self.vram_write16_wrapped(x as u16, y as u16, color);
            }
        }
    }

    /// Latch a transfer rectangle; returns its size in pixels rounded up
    /// to a whole number of 32-bit words
    fn setup_vram_transfer(&mut self, pos_word: u32, size_word: u32) -> u32 {
        self.transfer.x = (pos_word & 0x3FF) as u16;
        self.transfer.y = ((pos_word >> 16) & 0x1FF) as u16;
        self.transfer.x_start = self.transfer.x;

        self.transfer.width = ((((size_word & 0xFFFF) as u16).wrapping_sub(1)) & 0x3FF) + 1;
        self.transfer.height = (((((size_word >> 16) & 0xFFFF) as u16).wrapping_sub(1)) & 0x1FF) + 1;

        let pixel_count = self.transfer.width as u32 * self.transfer.height as u32;
        (pixel_count + 1) & !1
    }

    /// Advance the transfer cursor one pixel in row-major order
    fn advance_vram_transfer(&mut self) {
        if self.transfer.width == 0 {
            return;
        }
        if self.transfer.x - self.transfer.x_start == self.transfer.width - 1 {
            self.transfer.x = self.transfer.x_start;
            self.transfer.y += 1;
        } else {
            self.transfer.x += 1;
        }
    }

    /// GP0(A0h): switch GP0 into image-data mode for the coming words
    fn copy_cpu_to_vram_setup(&mut self) {
        let pixel_count = self.setup_vram_transfer(self.gp0_cmd[1], self.gp0_cmd[2]);

        self.gp0_arg_index = 0;
        self.gp0_arg_count = (pixel_count / 2) as usize;
        self.gp0_kind = Gp0CommandKind::CopyCpuToVramTransferring;

        log::debug!(
            "Copying rect (x:{} y:{} w:{} h:{}) from CPU to VRAM",
            self.transfer.x,
            self.transfer.y,
            self.transfer.width,
            self.transfer.height
        );
    }

    /// One image-data word: two 16-bit pixels into the transfer rectangle
    fn cpu_to_vram_data(&mut self, word: u32) {
        for half in [word as u16, (word >> 16) as u16] {
            let (x, y) = (self.transfer.x, self.transfer.y);
            self.vram_write16_wrapped(x, y, half);
            self.advance_vram_transfer();
        }

        if self.gp0_arg_index == self.gp0_arg_count {
            self.gp0_kind = Gp0CommandKind::None;
        }
    }

    /// GP0(C0h): latch a rectangle for GPUREAD to stream out
    fn copy_vram_to_cpu_setup(&mut self) {
        let pixel_count = self.setup_vram_transfer(self.gp0_cmd[1], self.gp0_cmd[2]);

        log::debug!(
            "Copying rect (x:{} y:{} w:{} h:{} count:{} hw) from VRAM to CPU",
            self.transfer.x,
            self.transfer.y,
            self.transfer.width,
            self.transfer.height,
            pixel_count
        );
    }

    /// GP0(80h): VRAM to VRAM rectangle copy
    fn copy_vram_to_vram(&mut self) {
        let dest_word = self.gp0_cmd[2];
        let mut dest_x = (dest_word & 0xFFFF) as u16;
        let mut dest_y = ((dest_word >> 16) & 0xFFFF) as u16;
        let dest_x_start = dest_x;

        let mut pixel_count = self.setup_vram_transfer(self.gp0_cmd[1], self.gp0_cmd[3]);

        while pixel_count > 0 {
            let word = self.vram_read16(self.transfer.x as i32, self.transfer.y as i32);
            self.vram_write16_wrapped(dest_x, dest_y, word);
            self.advance_vram_transfer();

            if dest_x - dest_x_start == self.transfer.width - 1 {
                dest_x = dest_x_start;
                dest_y += 1;
            } else {
                dest_x += 1;
            }
            pixel_count -= 1;
        }
    }

    /// GPUREAD: two pixels of the latched VRAM-to-CPU rectangle per word
    pub fn gpuread(&mut self) -> u32 {
        let mut word = self.vram_read16(self.transfer.x as i32, self.transfer.y as i32) as u32;
        self.advance_vram_transfer();
        word |= (self.vram_read16(self.transfer.x as i32, self.transfer.y as i32) as u32) << 16;
        self.advance_vram_transfer();
        word
    }
}

impl Default for Gpu {
    fn default() -> Self {
        Self::new()
    }
}
