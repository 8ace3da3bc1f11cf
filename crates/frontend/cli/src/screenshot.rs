use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{bail, Context, Result};

/// Write a packed BGR24 image (top row first) as an RGB PNG.
pub fn write_png(path: &Path, width: u32, height: u32, bgr: &[u8]) -> Result<()> {
    let expected = width as usize * height as usize * 3;
    if width == 0 || height == 0 || bgr.len() < expected {
        bail!(
            "screenshot buffer holds {} bytes, {}x{} needs {}",
            bgr.len(),
            width,
            height,
            expected
        );
    }

    let rgb: Vec<u8> = bgr[..expected]
        .chunks_exact(3)
        .flat_map(|px| [px[2], px[1], px[0]])
        .collect();

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&rgb)?;
    Ok(())
}
