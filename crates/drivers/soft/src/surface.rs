//! ARGB pixel surface the software backend draws into.

use video_core::types::{PixelFormat, Rotation, TextureImage};
use video_core::viewport::Viewport;

pub const CLEAR_COLOR: u32 = 0xFF00_0000;

/// A frame as the backend keeps it: raw bytes plus their layout
#[derive(Debug, Clone, Default)]
pub struct SourceFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub pitch: usize,
    pub format: PixelFormat,
}

impl SourceFrame {
    /// Copy `data` in, reusing the existing allocation.
    pub fn store(&mut self, data: &[u8], width: u32, height: u32, pitch: usize, format: PixelFormat) {
        self.data.clear();
        self.data.extend_from_slice(data);
        self.width = width;
        self.height = height;
        self.pitch = pitch;
        self.format = format;
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Pixel at (x, y) as 0xAARRGGBB. Out-of-range reads are black.
    pub fn argb_at(&self, x: u32, y: u32) -> u32 {
        let bpp = self.format.bytes_per_pixel();
        let offset = y as usize * self.pitch + x as usize * bpp;
        match self.data.get(offset..offset + bpp) {
            Some(bytes) => self.format.to_argb(bytes),
            None => CLEAR_COLOR,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Surface {
    pixels: Vec<u32>,
    width: u32,
    height: u32,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: vec![CLEAR_COLOR; width as usize * height as usize],
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels
            .resize(width as usize * height as usize, CLEAR_COLOR);
        self.clear(CLEAR_COLOR);
    }

    pub fn clear(&mut self, color: u32) {
        self.pixels.fill(color);
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Nearest-neighbour scale of `source` into the viewport rectangle.
    ///
    /// Rotation turns the picture counter-clockwise in 90 degree steps.
    pub fn blit(&mut self, source: &SourceFrame, vp: &Viewport, rotation: Rotation) {
        if source.is_empty() || vp.is_empty() {
            return;
        }
        let (src_w, src_h) = (source.width as u64, source.height as u64);
        let (vp_w, vp_h) = (vp.width as u64, vp.height as u64);

        for dy in 0..vp.height {
            let Some(ty) = self.target_row(vp, dy) else {
                continue;
            };
            for dx in 0..vp.width {
                let Some(tx) = self.target_col(vp, dx) else {
                    continue;
                };
                let (fx, fy) = (dx as u64, dy as u64);
                let (sx, sy) = match rotation {
                    Rotation::Deg0 => (fx * src_w / vp_w, fy * src_h / vp_h),
                    Rotation::Deg90 => (
                        src_w - 1 - (fy * src_w / vp_h).min(src_w - 1),
                        fx * src_h / vp_w,
                    ),
                    Rotation::Deg180 => (
                        src_w - 1 - (fx * src_w / vp_w).min(src_w - 1),
                        src_h - 1 - (fy * src_h / vp_h).min(src_h - 1),
                    ),
                    Rotation::Deg270 => (
                        fy * src_w / vp_h,
                        src_h - 1 - (fx * src_h / vp_w).min(src_h - 1),
                    ),
                };
                let color = source.argb_at(sx.min(src_w - 1) as u32, sy.min(src_h - 1) as u32);
                self.pixels[ty * self.width as usize + tx] = color;
            }
        }
    }

    /// Scale an ARGB texture into `rect`, blending by its alpha times `alpha`.
    pub fn draw_texture(&mut self, texture: &TextureImage, rect: &Viewport, alpha: f32) {
        if texture.width == 0 || texture.height == 0 || rect.is_empty() {
            return;
        }
        let alpha = alpha.clamp(0.0, 1.0);
        for dy in 0..rect.height {
            let Some(ty) = self.target_row(rect, dy) else {
                continue;
            };
            let sy = (dy as u64 * texture.height as u64 / rect.height as u64) as usize;
            for dx in 0..rect.width {
                let Some(tx) = self.target_col(rect, dx) else {
                    continue;
                };
                let sx = (dx as u64 * texture.width as u64 / rect.width as u64) as usize;
                let Some(&src) = texture.pixels.get(sy * texture.width as usize + sx) else {
                    continue;
                };
                let src_alpha = ((src >> 24) & 0xFF) as f32 / 255.0 * alpha;
                let idx = ty * self.width as usize + tx;
                self.pixels[idx] = blend(self.pixels[idx], src, src_alpha);
            }
        }
    }

    /// Region of the surface as packed BGR24, top row first.
    pub fn read_bgr24(&self, rect: &Viewport, out: &mut [u8]) -> bool {
        let needed = rect.width as usize * rect.height as usize * 3;
        if rect.is_empty() || out.len() < needed {
            return false;
        }
        let mut offset = 0;
        for y in 0..rect.height {
            for x in 0..rect.width {
                let px = rect.x + x as i32;
                let py = rect.y + y as i32;
                let color = if px < 0 || py < 0 {
                    CLEAR_COLOR
                } else {
                    self.pixel(px as u32, py as u32).unwrap_or(CLEAR_COLOR)
                };
                out[offset] = (color & 0xFF) as u8;
                out[offset + 1] = ((color >> 8) & 0xFF) as u8;
                out[offset + 2] = ((color >> 16) & 0xFF) as u8;
                offset += 3;
            }
        }
        true
    }

    /// Copy of `rect` clipped to the surface, with its clipped size
    pub fn copy_region(&self, rect: &Viewport) -> Option<(Vec<u32>, usize, usize)> {
        let x0 = rect.x.max(0) as u32;
        let y0 = rect.y.max(0) as u32;
        let x1 = (rect.x as i64 + rect.width as i64).min(self.width as i64);
        let y1 = (rect.y as i64 + rect.height as i64).min(self.height as i64);
        if x1 <= x0 as i64 || y1 <= y0 as i64 {
            return None;
        }
        let (w, h) = ((x1 - x0 as i64) as usize, (y1 - y0 as i64) as usize);
        let mut out = Vec::with_capacity(w * h);
        for y in y0 as usize..y0 as usize + h {
            let row = y * self.width as usize + x0 as usize;
            out.extend_from_slice(&self.pixels[row..row + w]);
        }
        Some((out, w, h))
    }

    /// Write back a region produced by [`copy_region`](Self::copy_region)
    pub fn write_region(&mut self, rect: &Viewport, pixels: &[u32], w: usize, h: usize) {
        let x0 = rect.x.max(0) as usize;
        let y0 = rect.y.max(0) as usize;
        for row in 0..h {
            let dst = (y0 + row) * self.width as usize + x0;
            self.pixels[dst..dst + w].copy_from_slice(&pixels[row * w..row * w + w]);
        }
    }

    fn target_row(&self, rect: &Viewport, dy: u32) -> Option<usize> {
        let y = rect.y as i64 + dy as i64;
        (y >= 0 && y < self.height as i64).then_some(y as usize)
    }

    fn target_col(&self, rect: &Viewport, dx: u32) -> Option<usize> {
        let x = rect.x as i64 + dx as i64;
        (x >= 0 && x < self.width as i64).then_some(x as usize)
    }
}

/// Mix `src` over `dst`; `alpha` 0.0 keeps `dst`, 1.0 takes `src`.
#[inline]
pub fn blend(dst: u32, src: u32, alpha: f32) -> u32 {
    let mix = |shift: u32| {
        let d = ((dst >> shift) & 0xFF) as f32;
        let s = ((src >> shift) & 0xFF) as f32;
        ((d * (1.0 - alpha) + s * alpha).round() as u32).min(0xFF)
    };
    0xFF00_0000 | (mix(16) << 16) | (mix(8) << 8) | mix(0)
}

/// Menu textures arrive either as XRGB8888 or packed RGBA4444.
pub fn decode_texture_frame(frame: &[u8], rgb32: bool, width: u32, height: u32) -> Option<TextureImage> {
    let count = width as usize * height as usize;
    let bpp = if rgb32 { 4 } else { 2 };
    if count == 0 || frame.len() < count * bpp {
        return None;
    }
    let pixels = frame
        .chunks_exact(bpp)
        .take(count)
        .map(|px| {
            if rgb32 {
                u32::from_ne_bytes([px[0], px[1], px[2], px[3]])
            } else {
                let v = u16::from_ne_bytes([px[0], px[1]]) as u32;
                let expand = |n: u32| (n << 4) | n;
                let r = expand((v >> 12) & 0xF);
                let g = expand((v >> 8) & 0xF);
                let b = expand((v >> 4) & 0xF);
                let a = expand(v & 0xF);
                (a << 24) | (r << 16) | (g << 8) | b
            }
        })
        .collect();
    Some(TextureImage {
        width,
        height,
        pixels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xrgb_source(width: u32, height: u32, pitch: usize, color: impl Fn(u32, u32) -> u32) -> SourceFrame {
        let mut data = vec![0u8; pitch * height as usize];
        for y in 0..height {
            for x in 0..width {
                let offset = y as usize * pitch + x as usize * 4;
                data[offset..offset + 4].copy_from_slice(&color(x, y).to_ne_bytes());
            }
        }
        let mut frame = SourceFrame::default();
        frame.store(&data, width, height, pitch, PixelFormat::Xrgb8888);
        frame
    }

    #[test]
    fn test_blit_respects_pitch_padding() {
        // 2x2 red picture in rows padded to 16 bytes
        let source = xrgb_source(2, 2, 16, |_, _| 0x00FF_0000);
        let mut surface = Surface::new(4, 4);
        surface.blit(&source, &Viewport::full(4, 4), Rotation::Deg0);
        assert!(surface.pixels().iter().all(|&p| p == 0xFFFF_0000));
    }

    #[test]
    fn test_blit_letterboxed_viewport() {
        let source = xrgb_source(1, 1, 4, |_, _| 0x0000_FF00);
        let mut surface = Surface::new(4, 4);
        let vp = Viewport {
            x: 1,
            y: 0,
            width: 2,
            height: 4,
            full_width: 4,
            full_height: 4,
        };
        surface.blit(&source, &vp, Rotation::Deg0);
        assert_eq!(surface.pixel(0, 0), Some(CLEAR_COLOR));
        assert_eq!(surface.pixel(1, 0), Some(0xFF00_FF00));
        assert_eq!(surface.pixel(2, 3), Some(0xFF00_FF00));
        assert_eq!(surface.pixel(3, 3), Some(CLEAR_COLOR));
    }

    #[test]
    fn test_blit_rotation() {
        // Left column white, right column black
        let source = xrgb_source(2, 2, 8, |x, _| if x == 0 { 0xFFFFFF } else { 0 });
        let mut surface = Surface::new(2, 2);

        surface.blit(&source, &Viewport::full(2, 2), Rotation::Deg180);
        assert_eq!(surface.pixel(0, 0), Some(0xFF00_0000));
        assert_eq!(surface.pixel(1, 0), Some(0xFFFF_FFFF));

        // Counter-clockwise quarter turn: the left column ends up at the bottom
        surface.blit(&source, &Viewport::full(2, 2), Rotation::Deg90);
        assert_eq!(surface.pixel(0, 0), Some(0xFF00_0000));
        assert_eq!(surface.pixel(0, 1), Some(0xFFFF_FFFF));
        assert_eq!(surface.pixel(1, 1), Some(0xFFFF_FFFF));
    }

    #[test]
    fn test_read_bgr24_order() {
        let mut surface = Surface::new(2, 1);
        surface.clear(0xFF11_2233);
        let mut out = [0u8; 6];
        assert!(surface.read_bgr24(&Viewport::full(2, 1), &mut out));
        assert_eq!(out, [0x33, 0x22, 0x11, 0x33, 0x22, 0x11]);
        assert!(!surface.read_bgr24(&Viewport::full(2, 1), &mut [0u8; 5]));
    }

    #[test]
    fn test_blend_extremes() {
        assert_eq!(blend(0xFF00_0000, 0xFFFF_FFFF, 0.0), 0xFF00_0000);
        assert_eq!(blend(0xFF00_0000, 0xFFFF_FFFF, 1.0), 0xFFFF_FFFF);
        let mid = blend(0xFF00_0000, 0xFFC8_C8C8, 0.5);
        assert_eq!(mid & 0xFF, 100);
    }

    #[test]
    fn test_decode_rgba4444() {
        let texel = 0xF00Fu16.to_ne_bytes();
        let image = decode_texture_frame(&texel, false, 1, 1).expect("one texel");
        assert_eq!(image.pixels[0], 0xFFFF_0000);
        assert!(decode_texture_frame(&texel, true, 1, 1).is_none());
    }
}
