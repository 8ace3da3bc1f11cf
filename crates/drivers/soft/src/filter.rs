//! Post-processing presets the software backend can "load" as a shader.
//!
//! There is no shader compiler here; a preset is picked by the file stem of
//! the path handed to `set_shader` (`scanlines.glsl`, `crt-monitor.slang`,
//! ...).

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SoftFilter {
    #[default]
    None,
    /// Darken every other output row
    Scanlines,
    /// Horizontal colour bleed between neighbours
    Phosphor,
    /// Phosphor followed by softer scanlines and a slight lift on lit rows
    CrtMonitor,
}

impl SoftFilter {
    pub fn name(&self) -> &str {
        match self {
            SoftFilter::None => "None",
            SoftFilter::Scanlines => "Scanlines",
            SoftFilter::Phosphor => "Phosphor",
            SoftFilter::CrtMonitor => "CRT Monitor",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            SoftFilter::None => SoftFilter::Scanlines,
            SoftFilter::Scanlines => SoftFilter::Phosphor,
            SoftFilter::Phosphor => SoftFilter::CrtMonitor,
            SoftFilter::CrtMonitor => SoftFilter::None,
        }
    }

    /// Preset named by the file stem of `path`, case-insensitive
    pub fn from_path(path: &Path) -> Option<Self> {
        let stem = path.file_stem()?.to_str()?.to_ascii_lowercase();
        match stem.as_str() {
            "none" | "stock" => Some(SoftFilter::None),
            "scanlines" => Some(SoftFilter::Scanlines),
            "phosphor" => Some(SoftFilter::Phosphor),
            "crt-monitor" | "crt_monitor" | "crt" => Some(SoftFilter::CrtMonitor),
            _ => None,
        }
    }

    /// Filter a `width` x `height` block of ARGB pixels in place
    pub fn apply(&self, buffer: &mut [u32], width: usize, height: usize) {
        match self {
            SoftFilter::None => {}
            SoftFilter::Scanlines => scale_rows(buffer, width, height, 1, 0.6),
            SoftFilter::Phosphor => apply_phosphor(buffer, width, height),
            SoftFilter::CrtMonitor => {
                apply_phosphor(buffer, width, height);
                scale_rows(buffer, width, height, 1, 0.7);
                scale_rows(buffer, width, height, 0, 1.05);
            }
        }
    }
}

#[inline]
fn unpack_rgb(color: u32) -> (u8, u8, u8) {
    (
        ((color >> 16) & 0xFF) as u8,
        ((color >> 8) & 0xFF) as u8,
        (color & 0xFF) as u8,
    )
}

#[inline]
fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    0xFF00_0000 | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
}

#[inline]
fn blend_colors(color1: u32, color2: u32, ratio: f32) -> u32 {
    let (r1, g1, b1) = unpack_rgb(color1);
    let (r2, g2, b2) = unpack_rgb(color2);
    let mix = |a: u8, b: u8| (a as f32 * (1.0 - ratio) + b as f32 * ratio) as u8;
    pack_rgb(mix(r1, r2), mix(g1, g2), mix(b1, b2))
}

/// Multiply the rows with `y % 2 == parity` by `factor`, saturating
fn scale_rows(buffer: &mut [u32], width: usize, height: usize, parity: usize, factor: f32) {
    let scale = |c: u8| (c as f32 * factor).min(255.0) as u8;
    for y in (parity..height).step_by(2) {
        let Some(row) = buffer.get_mut(y * width..(y + 1) * width) else {
            break;
        };
        for px in row {
            let (r, g, b) = unpack_rgb(*px);
            *px = pack_rgb(scale(r), scale(g), scale(b));
        }
    }
}

fn apply_phosphor(buffer: &mut [u32], width: usize, height: usize) {
    let source = buffer.to_vec();
    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            if idx >= buffer.len() {
                return;
            }
            let mut blended = source[idx];
            if x > 0 {
                blended = blend_colors(blended, source[idx - 1], 0.15);
            }
            if x + 1 < width {
                blended = blend_colors(blended, source[idx + 1], 0.15);
            }
            buffer[idx] = blended;
        }
    }
}
