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

//! Software Rasterizer
//!
//! Converts assembled GP0 draw commands into pixels in VRAM. Triangles are
//! filled with the half-space (edge function) algorithm in pure integer
//! arithmetic: every candidate pixel of the clipped bounding box is tested
//! against the three edge functions, and the same barycentric weights feed
//! Gouraud color interpolation and texture coordinate interpolation.
//!
//! # Fill rule
//!
//! Boundary pixels are included only when they lie on a top or left edge,
//! so two triangles sharing an edge never write the same pixel twice.
//!
//! # Render paths
//!
//! The pixel loop is monomorphized over the render kind (shaded, 4-bit
//! paletted, 8-bit paletted, 16-bit direct) so no per-pixel branch on the
//! texture format survives to the inner loop.
//!
//! # References
//!
//! - [A Parallel Algorithm for Polygon Rasterization (Pineda)](https://dl.acm.org/doi/10.1145/54852.378457)
//! - [Scratchapixel: Rasterization](https://www.scratchapixel.com/lessons/3d-basic-rendering/rasterization-practical-implementation)

use super::super::primitives::{
    BlendMode, Color, CommandFlags, LineCommand, Palette, PolygonCommand, Position,
    QuadTriangleIndex, RectangleCommand, Shading, Size, TexCoord, TextureDepth, TextureInfo,
    TextureMode, TexturePage,
};
use super::super::Gpu;
use crate::core::error::GpuError;

/// Render path selectors, used as const generic parameters
const SHADED: u8 = 0;
const TEX_P4: u8 = 1;
const TEX_P8: u8 = 2;
const TEX_D16: u8 = 3;

/// Unnormalized barycentric weights of one pixel
#[derive(Debug, Clone, Copy)]
struct Barycentric {
    a: i32,
    b: i32,
    c: i32,
}

/// Edge function: signed area of the triangle (a, b, p)
///
/// Positive when p lies to the left of the directed edge a->b under the
/// VRAM coordinate convention (y grows downward).
#[inline(always)]
fn edge(a: Position, b: Position, px: i32, py: i32) -> i32 {
    (b.x as i32 - a.x as i32) * (py - a.y as i32) - (b.y as i32 - a.y as i32) * (px - a.x as i32)
}

/// Whether the directed edge a->b owns its boundary pixels
///
/// With counter-clockwise winding enforced, the top and left edges of a
/// triangle are exactly those running upward, or exactly horizontal and
/// running right.
#[inline(always)]
fn is_top_left(a: Position, b: Position) -> bool {
    let dx = b.x as i32 - a.x as i32;
    let dy = b.y as i32 - a.y as i32;
    dy < 0 || (dy == 0 && dx > 0)
}

/// Modulate a sampled texel with the command color: `(tex * mod) >> 7`,
/// saturating per channel, mask bit preserved
#[inline(always)]
fn modulate(texel: u16, color: Color) -> u16 {
    let r = (((texel & 0x1F) as u32 * color.r as u32) >> 7).min(31) as u16;
    let g = ((((texel >> 5) & 0x1F) as u32 * color.g as u32) >> 7).min(31) as u16;
    let b = ((((texel >> 10) & 0x1F) as u32 * color.b as u32) >> 7).min(31) as u16;
    (texel & 0x8000) | (b << 10) | (g << 5) | r
}

impl Gpu {
    /// Draw an assembled polygon command
    ///
    /// Quads are rasterized as two triangles, (v0,v1,v2) and (v1,v2,v3),
    /// with the texture info rebound to the active triangle's UVs.
    pub(in crate::core::gpu) fn draw_polygon(&mut self, polygon: PolygonCommand) {
        let (positions, colors, mut tex_info) = match self.extract_polygon_data(polygon) {
            Ok(data) => data,
            Err(err) => {
                log::error!("{}", err);
                return;
            }
        };
        let flags = polygon.flags();

        tex_info.update_active_triangle(QuadTriangleIndex::First);
        self.draw_triangle(
            [positions[0], positions[1], positions[2]],
            [colors[0], colors[1], colors[2]],
            &tex_info,
            flags,
        );

        if polygon.is_quad() {
            tex_info.update_active_triangle(QuadTriangleIndex::Second);
            self.draw_triangle(
                [positions[1], positions[2], positions[3]],
                [colors[1], colors[2], colors[3]],
                &tex_info,
                flags,
            );
        }
    }

    /// Decode a polygon packet into positions, colors and texture state
    ///
    /// Word layout per vertex: one position word; if texture mapped, one
    /// texcoord word whose high half carries the palette (vertex 0) or the
    /// texture page (vertex 1); under Gouraud shading every vertex after
    /// the first is preceded by its color word. The command word supplies
    /// the first (or only) color. Positions get the drawing offset applied.
    fn extract_polygon_data(
        &self,
        polygon: PolygonCommand,
    ) -> Result<([Position; 4], [Color; 4], TextureInfo), GpuError> {
        let words = &self.gp0_cmd;
        let expected = polygon.arg_count() + 1;
        if words.len() < expected {
            return Err(GpuError::MalformedPacket {
                opcode: (words[0] >> 24) as u8,
                expected,
                got: words.len(),
            });
        }

        let flags = polygon.flags();
        let (dx, dy) = self.drawing_offset;

        let mut positions = [Position::default(); 4];
        let mut colors = [Color::default(); 4];
        let mut tex_info = TextureInfo::default();

        let base_color = Color::from_u32(words[0]);
        tex_info.color = base_color;

        let mut index = 1;
        for vertex in 0..polygon.vertex_count() {
            colors[vertex] = if flags.shading() == Shading::Gouraud && vertex > 0 {
                let color = Color::from_u32(words[index]);
                index += 1;
                color
            } else {
                base_color
            };

            positions[vertex] = Position::from_u32(words[index]).with_offset(dx, dy);
            index += 1;

            if flags.texture_mapped() {
                tex_info.uv[vertex] = TexCoord::from_u32(words[index]);
                match vertex {
                    0 => tex_info.palette = Palette::from_u32(words[index]),
                    1 => tex_info.page = TexturePage::from_u32(words[index]),
                    _ => {}
                }
                index += 1;
            }
        }

        Ok((positions, colors, tex_info))
    }

    /// Draw an assembled rectangle command
    ///
    /// Rectangles decode like a flat polygon of two triangles with UVs
    /// stepped pixel-wise from the base texcoord; the texture page comes
    /// from the global draw mode rather than the packet.
    pub(in crate::core::gpu) fn draw_rectangle(&mut self, rectangle: RectangleCommand) {
        let words = &self.gp0_cmd;
        let expected = rectangle.arg_count() + 1;
        if words.len() < expected {
            log::error!(
                "{}",
                GpuError::MalformedPacket {
                    opcode: (words[0] >> 24) as u8,
                    expected,
                    got: words.len(),
                }
            );
            return;
        }

        let flags = rectangle.flags();
        let (dx, dy) = self.drawing_offset;

        let color = Color::from_u32(words[0]);
        let base = Position::from_u32(words[1]);

        let mut index = 2;
        let mut tex_info = TextureInfo {
            color,
            page: TexturePage::from_draw_mode(self.draw_mode),
            ..Default::default()
        };

        let base_uv = if flags.texture_mapped() {
            tex_info.palette = Palette::from_u32(words[index]);
            let uv = TexCoord::from_u32(words[index]);
            index += 1;
            uv
        } else {
            TexCoord::default()
        };

        let size = if rectangle.is_variable_sized() {
            Size::from_u32(words[index])
        } else {
            rectangle.static_size()
        };
        if size.width <= 0 || size.height <= 0 {
            return;
        }

        let corner = |cx: i16, cy: i16| {
            Position {
                x: base.x.wrapping_add(cx),
                y: base.y.wrapping_add(cy),
            }
            .with_offset(dx, dy)
        };
        let positions = [
            corner(0, 0),
            corner(size.width, 0),
            corner(0, size.height),
            corner(size.width, size.height),
        ];

        tex_info.uv = [
            base_uv,
            base_uv.offset(size.width, 0),
            base_uv.offset(0, size.height),
            base_uv.offset(size.width, size.height),
        ];

        let colors = [color; 3];

        tex_info.update_active_triangle(QuadTriangleIndex::First);
        self.draw_triangle(
            [positions[0], positions[1], positions[2]],
            colors,
            &tex_info,
            flags,
        );

        tex_info.update_active_triangle(QuadTriangleIndex::Second);
        self.draw_triangle(
            [positions[1], positions[2], positions[3]],
            colors,
            &tex_info,
            flags,
        );
    }

    /// Draw an assembled line command
    ///
    /// Segments are walked with Bresenham's algorithm and clipped to the
    /// drawing area. Gouraud line colors are not interpolated; the first
    /// vertex color paints the whole line.
    pub(in crate::core::gpu) fn draw_line_command(&mut self, line: LineCommand) {
        let words = &self.gp0_cmd;
        if words.len() < 3 {
            log::error!(
                "{}",
                GpuError::MalformedPacket {
                    opcode: (words[0] >> 24) as u8,
                    expected: 3,
                    got: words.len(),
                }
            );
            return;
        }

        let flags = line.flags();
        let (dx, dy) = self.drawing_offset;
        let color = Color::from_u32(words[0]).to_rgb15();

        // Gouraud poly-lines interleave a color word before each vertex
        // after the first; poly-lines end on a terminator word.
        let stride = if flags.shading() == Shading::Gouraud {
            2
        } else {
            1
        };

        let mut points = Vec::new();
        points.push(Position::from_u32(words[1]).with_offset(dx, dy));

        let mut index = 1 + stride;
        while index < words.len() {
            let word = words[index];
            if word == 0x5555_5555 || word == 0x5000_5000 {
                break;
            }
            points.push(Position::from_u32(word).with_offset(dx, dy));
            index += stride;
        }

        for pair in points.windows(2) {
            self.draw_line_segment(pair[0], pair[1], color);
        }
    }

    /// Bresenham line walk clipped to the drawing area
    fn draw_line_segment(&mut self, p0: Position, p1: Position, color: u16) {
        let (clip_min_x, clip_min_y, clip_max_x, clip_max_y) = self.draw_area();

        let (mut x, mut y) = (p0.x as i32, p0.y as i32);
        let (x1, y1) = (p1.x as i32, p1.y as i32);

        let dx = (x1 - x).abs();
        let dy = -(y1 - y).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sy = if y < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            if x >= clip_min_x && x <= clip_max_x && y >= clip_min_y && y <= clip_max_y {
                self.vram_write16(x, y, color);
            }

            if x == x1 && y == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Dispatch one triangle to the pixel path for its render kind
    fn draw_triangle(
        &mut self,
        positions: [Position; 3],
        colors: [Color; 3],
        tex_info: &TextureInfo,
        flags: CommandFlags,
    ) {
        if flags.texture_mapped() {
            match tex_info.page.color_depth() {
                TextureDepth::T4Bit => {
                    self.fill_triangle::<TEX_P4>(positions, colors, tex_info, flags)
                }
                TextureDepth::T8Bit => {
                    self.fill_triangle::<TEX_P8>(positions, colors, tex_info, flags)
                }
                TextureDepth::T15Bit => {
                    self.fill_triangle::<TEX_D16>(positions, colors, tex_info, flags)
                }
            }
        } else {
            self.fill_triangle::<SHADED>(positions, colors, tex_info, flags)
        }
    }

    /// Half-space triangle fill
    ///
    /// Degenerate triangles are skipped; clockwise triangles are rewound
    /// by swapping vertices 1 and 2 (attributes follow their vertices).
    /// The candidate box is the triangle's bounding box clipped to the
    /// drawing area.
    fn fill_triangle<const KIND: u8>(
        &mut self,
        mut positions: [Position; 3],
        mut colors: [Color; 3],
        tex_info: &TextureInfo,
        flags: CommandFlags,
    ) {
        let mut uv = tex_info.uv_active;

        let mut area = edge(
            positions[0],
            positions[1],
            positions[2].x as i32,
            positions[2].y as i32,
        );
        if area == 0 {
            return;
        }
        if area < 0 {
            positions.swap(1, 2);
            colors.swap(1, 2);
            uv.swap(1, 2);
            area = -area;
        }

        let (clip_min_x, clip_min_y, clip_max_x, clip_max_y) = self.draw_area();

        let min_x = (positions[0].x.min(positions[1].x).min(positions[2].x) as i32).max(clip_min_x);
        let max_x = (positions[0].x.max(positions[1].x).max(positions[2].x) as i32).min(clip_max_x);
        let min_y = (positions[0].y.min(positions[1].y).min(positions[2].y) as i32).max(clip_min_y);
        let max_y = (positions[0].y.max(positions[1].y).max(positions[2].y) as i32).min(clip_max_y);

        let blend = if flags.texture_mapped() {
            tex_info.page.blend_mode()
        } else {
            self.blend_mode()
        };

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let w0 = edge(positions[1], positions[2], x, y);
                let w1 = edge(positions[2], positions[0], x, y);
                let w2 = edge(positions[0], positions[1], x, y);

                if w0 < 0 || w1 < 0 || w2 < 0 {
                    continue;
                }

                // Top-left fill rule on boundary pixels
                if (w0 == 0 && !is_top_left(positions[1], positions[2]))
                    || (w1 == 0 && !is_top_left(positions[2], positions[0]))
                    || (w2 == 0 && !is_top_left(positions[0], positions[1]))
                {
                    continue;
                }

                self.draw_pixel::<KIND>(
                    x,
                    y,
                    &colors,
                    &uv,
                    tex_info,
                    Barycentric {
                        a: w0,
                        b: w1,
                        c: w2,
                    },
                    area,
                    flags,
                    blend,
                );
            }
        }
    }

    /// Shade and write one covered pixel
    #[allow(clippy::too_many_arguments)]
    #[inline(always)]
    fn draw_pixel<const KIND: u8>(
        &mut self,
        x: i32,
        y: i32,
        colors: &[Color; 3],
        uv: &[TexCoord; 3],
        tex_info: &TextureInfo,
        bar: Barycentric,
        area: i32,
        flags: CommandFlags,
        blend: BlendMode,
    ) {
        let out;
        let semi_transparent;

        if KIND == SHADED {
            let r = ((colors[0].r as i32 * bar.a
                + colors[1].r as i32 * bar.b
                + colors[2].r as i32 * bar.c)
                / area) as u8;
            let g = ((colors[0].g as i32 * bar.a
                + colors[1].g as i32 * bar.b
                + colors[2].g as i32 * bar.c)
                / area) as u8;
            let b = ((colors[0].b as i32 * bar.a
                + colors[1].b as i32 * bar.b
                + colors[2].b as i32 * bar.c)
                / area) as u8;

            out = Color { r, g, b }.to_rgb15();
            semi_transparent = flags.semi_transparency();
        } else {
            let tx = (uv[0].u as i32 * bar.a + uv[1].u as i32 * bar.b + uv[2].u as i32 * bar.c)
                / area;
            let ty = (uv[0].v as i32 * bar.a + uv[1].v as i32 * bar.b + uv[2].v as i32 * bar.c)
                / area;

            let texel = match KIND {
                TEX_P4 => self.sample_texel_4bit(tex_info, tx, ty),
                TEX_P8 => self.sample_texel_8bit(tex_info, tx, ty),
                _ => self.sample_texel_16bit(tex_info, tx, ty),
            };

            // All-zero texels are fully transparent
            if texel == 0 {
                return;
            }

            // Textured pixels only blend when the texel's mask bit is set
            semi_transparent = flags.semi_transparency() && (texel & 0x8000) != 0;

            out = match flags.texture_mode() {
                TextureMode::Blended => modulate(texel, tex_info.color),
                TextureMode::Raw => texel,
            };
        }

        let out = if semi_transparent {
            let background = self.vram_read16(x, y);
            (out & 0x8000) | blend.blend(background, out)
        } else {
            out
        };

        self.vram_write16(x, y, out);
    }

    /// Sample a 4-bit paletted texel: four indices per VRAM word
    fn sample_texel_4bit(&self, tex_info: &TextureInfo, tx: i32, ty: i32) -> u16 {
        let word_x = (tex_info.page.base_x() as i32 + tx / 4) & 0x3FF;
        let word_y = (tex_info.page.base_y() as i32 + ty) & 0x1FF;
        let word = self.vram_read16(word_x, word_y);

        let index = (word >> ((tx & 3) * 4)) & 0xF;

        self.vram_read16(
            (tex_info.palette.x() + index) as i32,
            tex_info.palette.y() as i32,
        )
    }

    /// Sample an 8-bit paletted texel: two indices per VRAM word
    fn sample_texel_8bit(&self, tex_info: &TextureInfo, tx: i32, ty: i32) -> u16 {
        let word_x = (tex_info.page.base_x() as i32 + tx / 2) & 0x3FF;
        let word_y = (tex_info.page.base_y() as i32 + ty) & 0x1FF;
        let word = self.vram_read16(word_x, word_y);

        let index = (word >> ((tx & 1) * 8)) & 0xFF;

        self.vram_read16(
            (tex_info.palette.x() + index) as i32,
            tex_info.palette.y() as i32,
        )
    }

    /// Sample a 15-bit direct color texel
    fn sample_texel_16bit(&self, tex_info: &TextureInfo, tx: i32, ty: i32) -> u16 {
        let word_x = (tex_info.page.base_x() as i32 + tx) & 0x3FF;
        let word_y = (tex_info.page.base_y() as i32 + ty) & 0x1FF;
        self.vram_read16(word_x, word_y)
    }
}
