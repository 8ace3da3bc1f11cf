//! Input overlay images composited over the picture.

use video_core::driver::Overlayable;
use video_core::types::TextureImage;
use video_core::viewport::Viewport;

use crate::surface::Surface;

/// Normalized rectangle, (0,0) top-left to (1,1) bottom-right
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl NormRect {
    pub const FULL: NormRect = NormRect {
        x: 0.0,
        y: 0.0,
        w: 1.0,
        h: 1.0,
    };

    fn to_viewport(self, area: &Viewport) -> Viewport {
        Viewport {
            x: area.x + (self.x * area.width as f32).round() as i32,
            y: area.y + (self.y * area.height as f32).round() as i32,
            width: (self.w * area.width as f32).round().max(0.0) as u32,
            height: (self.h * area.height as f32).round().max(0.0) as u32,
            full_width: area.full_width,
            full_height: area.full_height,
        }
    }
}

#[derive(Debug, Clone)]
struct OverlayImage {
    texture: TextureImage,
    tex: NormRect,
    vertex: NormRect,
    alpha: f32,
}

#[derive(Debug, Default)]
pub struct Overlay {
    images: Vec<OverlayImage>,
    enabled: bool,
    full_screen: bool,
}

impl Overlay {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Draw every image onto `surface`, relative to the viewport unless the
    /// overlay spans the full screen.
    pub fn composite(&self, surface: &mut Surface, vp: &Viewport) {
        if !self.enabled {
            return;
        }
        let area = if self.full_screen {
            Viewport::full(surface.width(), surface.height())
        } else {
            *vp
        };
        for image in &self.images {
            if image.alpha <= 0.0 {
                continue;
            }
            let cropped = crop(&image.texture, image.tex);
            surface.draw_texture(&cropped, &image.vertex.to_viewport(&area), image.alpha);
        }
    }
}

/// Sub-image of `texture` covered by the normalized `rect`
fn crop(texture: &TextureImage, rect: NormRect) -> TextureImage {
    if rect == NormRect::FULL {
        return texture.clone();
    }
    let x0 = ((rect.x.clamp(0.0, 1.0) * texture.width as f32) as u32).min(texture.width);
    let y0 = ((rect.y.clamp(0.0, 1.0) * texture.height as f32) as u32).min(texture.height);
    let w = ((rect.w.max(0.0) * texture.width as f32).round() as u32).min(texture.width - x0);
    let h = ((rect.h.max(0.0) * texture.height as f32).round() as u32).min(texture.height - y0);

    let mut pixels = Vec::with_capacity(w as usize * h as usize);
    for y in y0..y0 + h {
        let row = (y * texture.width) as usize;
        pixels.extend_from_slice(&texture.pixels[row + x0 as usize..row + (x0 + w) as usize]);
    }
    TextureImage {
        width: w,
        height: h,
        pixels,
    }
}

impl Overlayable for Overlay {
    fn enable(&mut self, state: bool) {
        self.enabled = state;
    }

    fn load(&mut self, images: &[TextureImage]) -> bool {
        if images
            .iter()
            .any(|image| image.pixels.len() < image.width as usize * image.height as usize)
        {
            return false;
        }
        self.images = images
            .iter()
            .map(|texture| OverlayImage {
                texture: texture.clone(),
                tex: NormRect::FULL,
                vertex: NormRect::FULL,
                alpha: 1.0,
            })
            .collect();
        true
    }

    fn tex_geom(&mut self, image: usize, x: f32, y: f32, w: f32, h: f32) {
        if let Some(entry) = self.images.get_mut(image) {
            entry.tex = NormRect { x, y, w, h };
        }
    }

    fn vertex_geom(&mut self, image: usize, x: f32, y: f32, w: f32, h: f32) {
        if let Some(entry) = self.images.get_mut(image) {
            entry.vertex = NormRect { x, y, w, h };
        }
    }

    fn full_screen(&mut self, enable: bool) {
        self.full_screen = enable;
    }

    fn set_alpha(&mut self, image: usize, alpha: f32) {
        if let Some(entry) = self.images.get_mut(image) {
            entry.alpha = alpha;
        }
    }
}
