//! Moving colour-bar test pattern, rendered in whatever pixel format the
//! run is configured for, into rows padded past the visible width.

use video_core::types::{pixel_alignment, PixelFormat};

const BARS: [u32; 8] = [
    0xFFFF_FFFF,
    0xFFFF_FF00,
    0xFF00_FFFF,
    0xFF00_FF00,
    0xFFFF_00FF,
    0xFFFF_0000,
    0xFF00_00FF,
    0xFF00_0000,
];

/// Rows are padded to this many bytes
const ROW_ALIGN: usize = 64;

pub struct TestPattern {
    width: u32,
    height: u32,
    pitch: usize,
    format: PixelFormat,
    buffer: Vec<u8>,
}

impl TestPattern {
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let row_bytes = width as usize * format.bytes_per_pixel();
        let pitch = row_bytes.div_ceil(ROW_ALIGN).max(1) * ROW_ALIGN;
        Self {
            width,
            height,
            pitch,
            format,
            buffer: vec![0; pitch * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pitch(&self) -> usize {
        self.pitch
    }

    pub fn alignment(&self) -> usize {
        pixel_alignment(self.pitch)
    }

    /// Bars scroll one pixel per frame; a white line sweeps down the picture.
    pub fn render(&mut self, frame: u64) -> &[u8] {
        let bpp = self.format.bytes_per_pixel();
        let bar_width = (self.width as u64 / BARS.len() as u64).max(1);
        let sweep = (frame % self.height.max(1) as u64) as u32;

        for y in 0..self.height {
            let row = &mut self.buffer[y as usize * self.pitch..][..self.width as usize * bpp];
            for (x, px) in row.chunks_exact_mut(bpp).enumerate() {
                let color = if y == sweep {
                    0xFFFF_FFFF
                } else {
                    let bar = ((x as u64 + frame) / bar_width) as usize % BARS.len();
                    BARS[bar]
                };
                encode(self.format, color, px);
            }
        }
        &self.buffer
    }
}

/// Pack 0xAARRGGBB into one pixel of `format`, native endian
pub fn encode(format: PixelFormat, argb: u32, out: &mut [u8]) {
    let r = (argb >> 16) & 0xFF;
    let g = (argb >> 8) & 0xFF;
    let b = argb & 0xFF;
    match format {
        PixelFormat::Xrgb8888 => out.copy_from_slice(&(argb & 0x00FF_FFFF).to_ne_bytes()),
        PixelFormat::Rgb565 => {
            let v = ((r >> 3) << 11) | ((g >> 2) << 5) | (b >> 3);
            out.copy_from_slice(&(v as u16).to_ne_bytes());
        }
        PixelFormat::Rgb1555 => {
            let v = ((r >> 3) << 10) | ((g >> 3) << 5) | (b >> 3);
            out.copy_from_slice(&(v as u16).to_ne_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_are_padded_and_aligned() {
        let pattern = TestPattern::new(100, 10, PixelFormat::Rgb565);
        assert_eq!(pattern.pitch(), 256);
        assert_eq!(pattern.alignment(), 8);
        let pattern = TestPattern::new(320, 240, PixelFormat::Xrgb8888);
        assert_eq!(pattern.pitch(), 1280);
    }

    #[test]
    fn test_saturated_colours_survive_encoding() {
        for format in [PixelFormat::Xrgb8888, PixelFormat::Rgb565, PixelFormat::Rgb1555] {
            let mut px = vec![0u8; format.bytes_per_pixel()];
            for color in BARS {
                encode(format, color, &mut px);
                assert_eq!(format.to_argb(&px), color, "{:?}", format);
            }
        }
    }

    #[test]
    fn test_bars_scroll() {
        let mut pattern = TestPattern::new(16, 4, PixelFormat::Xrgb8888);
        let first = pattern.render(0)[4..8].to_vec();
        let second = pattern.render(2)[4..8].to_vec();
        // Row 1 (not swept on these frames): bar 0 then bar 1
        let row1 = |p: &mut TestPattern, frame| {
            let pitch = p.pitch();
            p.render(frame)[pitch..pitch + 4].to_vec()
        };
        assert_eq!(row1(&mut pattern, 0), 0x00FF_FFFFu32.to_ne_bytes());
        assert_eq!(row1(&mut pattern, 2), 0x00FF_FF00u32.to_ne_bytes());
        assert_ne!(first, second);
    }
}
