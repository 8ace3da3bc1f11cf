//! Viewport geometry and aspect ratio policy.
//!
//! The engine owns the aspect table, the active policy, the core-reported
//! geometry and the user's custom viewport. Backends get a finished
//! [`Viewport`] from it; they never do aspect math themselves.

use serde::{Deserialize, Serialize};

use crate::aspect::{AspectRatio, AspectRatioTable};
use crate::config::VideoConfig;
use crate::logging::{log, LogCategory, LogLevel};
use crate::types::Rotation;

/// Output rectangle inside a surface.
///
/// `x`, `y`, `width`, `height` describe where content is drawn;
/// `full_width` and `full_height` the whole surface. The content rectangle
/// always lies inside the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub full_width: u32,
    pub full_height: u32,
}

impl Viewport {
    /// Content covering the whole surface
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
            full_width: width,
            full_height: height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains_content(&self) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.x as u64 + self.width as u64 <= self.full_width as u64
            && self.y as u64 + self.height as u64 <= self.full_height as u64
    }

    /// Pull the content rectangle back inside the surface
    pub fn clamp_to_surface(&mut self) {
        self.x = self.x.clamp(0, self.full_width as i32);
        self.y = self.y.clamp(0, self.full_height as i32);
        self.width = self.width.min(self.full_width - self.x as u32);
        self.height = self.height.min(self.full_height - self.y as u32);
    }
}

/// Base geometry a core reports for its output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameGeometry {
    pub base_width: u32,
    pub base_height: u32,
    pub max_width: u32,
    pub max_height: u32,
    /// 0 or negative when the core leaves it to the frontend
    pub aspect_ratio: f32,
}

impl Default for GameGeometry {
    fn default() -> Self {
        Self {
            base_width: 320,
            base_height: 240,
            max_width: 320,
            max_height: 240,
            aspect_ratio: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemTiming {
    pub fps: f64,
    pub sample_rate: f64,
}

impl Default for SystemTiming {
    fn default() -> Self {
        Self {
            fps: 60.0,
            sample_rate: 48000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SystemAvInfo {
    pub geometry: GameGeometry,
    pub timing: SystemTiming,
}

/// Pointer position in the two logical coordinate spaces input consumers
/// use. Each axis runs from -0x7fff to 0x7fff; -0x8000 means outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerCoords {
    pub x: i16,
    pub y: i16,
    pub screen_x: i16,
    pub screen_y: i16,
}

const COORD_MAX: i64 = 0x7fff;
const COORD_OUTSIDE: i16 = -0x8000;

fn scale_axis(pos: i64, extent: i64) -> i16 {
    let scaled = (2 * pos * COORD_MAX) / extent - COORD_MAX;
    if !(-COORD_MAX..=COORD_MAX).contains(&scaled) {
        COORD_OUTSIDE
    } else {
        scaled as i16
    }
}

/// Map a window-space pointer position into content-relative and
/// screen-relative logical coordinates.
///
/// Returns `None` when the viewport has no area to map into.
pub fn translate_coord_viewport(vp: &Viewport, mouse_x: i32, mouse_y: i32) -> Option<PointerCoords> {
    if vp.full_width == 0 || vp.full_height == 0 || vp.width == 0 || vp.height == 0 {
        return None;
    }

    let screen_x = scale_axis(mouse_x as i64, vp.full_width as i64);
    let screen_y = scale_axis(mouse_y as i64, vp.full_height as i64);
    let x = scale_axis(mouse_x as i64 - vp.x as i64, vp.width as i64);
    let y = scale_axis(mouse_y as i64 - vp.y as i64, vp.height as i64);

    Some(PointerCoords {
        x,
        y,
        screen_x,
        screen_y,
    })
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

fn usable_aspect(value: f32) -> Option<f32> {
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Aspect policy state plus the viewport math built on it.
#[derive(Debug, Clone)]
pub struct ViewportEngine {
    table: AspectRatioTable,
    policy: AspectRatio,
    aspect_ratio: f32,
    av_info: SystemAvInfo,
    custom: Viewport,
    keep_aspect: bool,
    scale_integer: bool,
    /// Configured ratio; negative means derive it from the core
    config_aspect: f32,
    aspect_ratio_auto: bool,
}

impl Default for ViewportEngine {
    fn default() -> Self {
        Self::from_config(&VideoConfig::default())
    }
}

impl ViewportEngine {
    pub fn from_config(config: &VideoConfig) -> Self {
        let mut engine = Self {
            table: AspectRatioTable::default(),
            policy: config.aspect_ratio_idx,
            aspect_ratio: 4.0 / 3.0,
            av_info: SystemAvInfo::default(),
            custom: config.custom_viewport,
            keep_aspect: config.force_aspect,
            scale_integer: config.scale_integer,
            config_aspect: config.aspect_ratio,
            aspect_ratio_auto: config.aspect_ratio_auto,
        };
        engine.set_aspect_ratio(config.aspect_ratio_idx);
        engine
    }

    pub fn table(&self) -> &AspectRatioTable {
        &self.table
    }

    pub fn policy(&self) -> AspectRatio {
        self.policy
    }

    pub fn keep_aspect(&self) -> bool {
        self.keep_aspect
    }

    pub fn set_keep_aspect(&mut self, keep: bool) {
        self.keep_aspect = keep;
    }

    pub fn scale_integer(&self) -> bool {
        self.scale_integer
    }

    pub fn set_scale_integer(&mut self, enable: bool) {
        self.scale_integer = enable;
    }

    pub fn system_av_info(&self) -> &SystemAvInfo {
        &self.av_info
    }

    /// New core geometry; the special table entries follow it
    pub fn set_system_av_info(&mut self, info: SystemAvInfo) {
        self.av_info = info;
        self.set_aspect_ratio(self.policy);
    }

    /// Current aspect ratio value in use
    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn set_aspect_ratio_value(&mut self, value: f32) {
        self.aspect_ratio = value;
    }

    /// Aspect of the core's content with square pixels
    pub fn native_aspect(&self) -> f32 {
        let geom = &self.av_info.geometry;
        if let Some(aspect) = usable_aspect(geom.aspect_ratio) {
            return aspect;
        }
        if geom.base_width == 0 || geom.base_height == 0 {
            return 1.0;
        }
        geom.base_width as f32 / geom.base_height as f32
    }

    pub fn set_viewport_config(&mut self) {
        let value = if self.config_aspect < 0.0 {
            let geom = &self.av_info.geometry;
            match usable_aspect(geom.aspect_ratio) {
                Some(aspect) if self.aspect_ratio_auto => aspect,
                _ => geom.base_width.max(1) as f32 / geom.base_height.max(1) as f32,
            }
        } else {
            self.config_aspect
        };
        self.table.set_value(AspectRatio::Config, value);
    }

    pub fn set_viewport_square_pixel(&mut self) {
        let geom = &self.av_info.geometry;
        let (width, height) = (geom.base_width, geom.base_height);
        if width == 0 || height == 0 {
            return;
        }
        let divisor = gcd(width, height);
        let (aspect_x, aspect_y) = (width / divisor, height / divisor);
        self.table.set_name(
            AspectRatio::SquarePixel,
            format!("1:1 PAR ({}:{} DAR)", aspect_x, aspect_y),
        );
        self.table
            .set_value(AspectRatio::SquarePixel, aspect_x as f32 / aspect_y as f32);
    }

    pub fn set_viewport_core(&mut self) {
        let geom = self.av_info.geometry;
        if geom.base_width == 0 || geom.base_height == 0 {
            return;
        }
        let value = usable_aspect(geom.aspect_ratio)
            .unwrap_or(geom.base_width as f32 / geom.base_height as f32);
        self.table.set_value(AspectRatio::Core, value);
    }

    pub fn custom(&self) -> &Viewport {
        &self.custom
    }

    pub fn set_custom(&mut self, vp: Viewport) {
        self.custom = vp;
    }

    pub fn reset_custom_viewport(&mut self) {
        self.custom = Viewport::default();
    }

    /// Switch policy, refresh its table entry and adopt its value.
    ///
    /// `Custom` and `Full` carry no ratio of their own; the current value
    /// is kept for them.
    pub fn set_aspect_ratio(&mut self, policy: AspectRatio) {
        match policy {
            AspectRatio::SquarePixel => self.set_viewport_square_pixel(),
            AspectRatio::Core => self.set_viewport_core(),
            AspectRatio::Config => self.set_viewport_config(),
            _ => {}
        }
        self.policy = policy;
        if let Some(value) = usable_aspect(self.table.value(policy)) {
            self.aspect_ratio = value;
        }
        log(LogCategory::Viewport, LogLevel::Debug, || {
            format!(
                "aspect policy {} -> {:.4}",
                self.table.get(policy).name,
                self.aspect_ratio
            )
        });
    }

    /// Largest whole-number scale of the core's base size that fits
    /// `width` x `height`, centred.
    ///
    /// A zero or non-finite `aspect_ratio` falls back to the native content
    /// aspect. When not even a 1x copy fits, the full area is used unscaled.
    pub fn get_scaled_integer(
        &self,
        vp: &mut Viewport,
        width: u32,
        height: u32,
        aspect_ratio: f32,
        keep_aspect: bool,
    ) {
        let mut padding_x = 0;
        let mut padding_y = 0;

        if self.policy == AspectRatio::Custom {
            if !self.custom.is_empty() {
                padding_x = width.saturating_sub(self.custom.width);
                padding_y = height.saturating_sub(self.custom.height);
            }
        } else {
            let base_height = self.av_info.geometry.base_height.max(1);
            let aspect = usable_aspect(aspect_ratio).unwrap_or_else(|| self.native_aspect());
            let base_width = ((base_height as f32 * aspect).round() as u32).max(1);

            if width >= base_width && height >= base_height {
                if keep_aspect {
                    let scale = (width / base_width).min(height / base_height);
                    padding_x = width - base_width * scale;
                    padding_y = height - base_height * scale;
                } else {
                    padding_x = width % base_width;
                    padding_y = height % base_height;
                }
            }
        }

        vp.width = width - padding_x;
        vp.height = height - padding_y;
        vp.x = (padding_x / 2) as i32;
        vp.y = (padding_y / 2) as i32;
        vp.full_width = width;
        vp.full_height = height;
    }

    /// Derived viewport for a surface of `full_width` x `full_height`.
    pub fn compute(
        &self,
        full_width: u32,
        full_height: u32,
        rotation: Rotation,
        allow_rotate: bool,
        force_full: bool,
    ) -> Viewport {
        let mut vp = Viewport::full(full_width, full_height);
        if force_full || self.policy == AspectRatio::Full || vp.is_empty() {
            return vp;
        }

        let mut desired = usable_aspect(self.aspect_ratio).unwrap_or_else(|| self.native_aspect());
        if allow_rotate && rotation.is_sideways() {
            desired = 1.0 / desired;
        }

        if self.scale_integer {
            self.get_scaled_integer(&mut vp, full_width, full_height, desired, self.keep_aspect);
            return vp;
        }
        if !self.keep_aspect {
            return vp;
        }

        if self.policy == AspectRatio::Custom {
            if !self.custom.is_empty() {
                vp.x = self.custom.x;
                vp.y = self.custom.y;
                vp.width = self.custom.width;
                vp.height = self.custom.height;
                vp.clamp_to_surface();
            }
            return vp;
        }

        let device = full_width as f32 / full_height as f32;
        if (device - desired).abs() < 0.0001 {
            return vp;
        }
        if device > desired {
            let delta = (desired / device - 1.0) / 2.0 + 0.5;
            vp.x = (full_width as f32 * (0.5 - delta)).round() as i32;
            vp.width = (2.0 * full_width as f32 * delta).round() as u32;
        } else {
            let delta = (device / desired - 1.0) / 2.0 + 0.5;
            vp.y = (full_height as f32 * (0.5 - delta)).round() as i32;
            vp.height = (2.0 * full_height as f32 * delta).round() as u32;
        }
        vp.clamp_to_surface();
        vp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_for(base_width: u32, base_height: u32) -> ViewportEngine {
        let mut engine = ViewportEngine::default();
        engine.set_system_av_info(SystemAvInfo {
            geometry: GameGeometry {
                base_width,
                base_height,
                max_width: base_width,
                max_height: base_height,
                aspect_ratio: 0.0,
            },
            timing: SystemTiming::default(),
        });
        engine
    }

    #[test]
    fn test_square_pixel_integer_scale() {
        let mut engine = engine_for(320, 240);
        engine.set_aspect_ratio(AspectRatio::SquarePixel);
        assert_eq!(engine.table().get(AspectRatio::SquarePixel).name, "1:1 PAR (4:3 DAR)");

        let mut vp = Viewport::default();
        engine.get_scaled_integer(&mut vp, 1280, 960, engine.aspect_ratio(), true);
        assert_eq!(vp.width, 1280);
        assert_eq!(vp.height, 960);
        assert_eq!((vp.x, vp.y), (0, 0));
        assert_eq!(vp.width / 320, 4);
    }

    #[test]
    fn test_scaled_integer_centres_remainder() {
        let engine = engine_for(256, 224);
        let mut vp = Viewport::default();
        engine.get_scaled_integer(&mut vp, 1920, 1080, 256.0 / 224.0, true);
        // 1080 / 224 = 4, 1920 / 256 = 7 -> scale 4
        assert_eq!((vp.width, vp.height), (1024, 896));
        assert_eq!((vp.x, vp.y), (448, 92));
        assert!(vp.contains_content());
    }

    #[test]
    fn test_scaled_integer_is_idempotent_and_contained() {
        let engine = engine_for(320, 240);
        for &(w, h) in &[(1280u32, 960u32), (1366, 768), (300, 200), (641, 481), (1, 1)] {
            for &aspect in &[0.0f32, f32::NAN, 4.0 / 3.0, 16.0 / 9.0, 0.01] {
                for &keep in &[true, false] {
                    let mut a = Viewport::default();
                    let mut b = Viewport::default();
                    engine.get_scaled_integer(&mut a, w, h, aspect, keep);
                    engine.get_scaled_integer(&mut b, w, h, aspect, keep);
                    assert_eq!(a, b);
                    assert!(a.contains_content(), "{:?} not contained", a);
                }
            }
        }
    }

    #[test]
    fn test_scaled_integer_zero_aspect_uses_native() {
        let engine = engine_for(320, 240);
        let mut zero = Viewport::default();
        let mut native = Viewport::default();
        engine.get_scaled_integer(&mut zero, 1000, 800, 0.0, true);
        engine.get_scaled_integer(&mut native, 1000, 800, 320.0 / 240.0, true);
        assert_eq!(zero, native);
        assert_eq!((zero.width, zero.height), (960, 720));
    }

    #[test]
    fn test_scaled_integer_too_small_uses_full_area() {
        let engine = engine_for(320, 240);
        let mut vp = Viewport::default();
        engine.get_scaled_integer(&mut vp, 200, 150, 4.0 / 3.0, true);
        assert_eq!(vp, Viewport::full(200, 150));
    }

    #[test]
    fn test_scaled_integer_custom_policy_uses_custom_size() {
        let mut engine = engine_for(320, 240);
        engine.set_aspect_ratio(AspectRatio::Custom);
        engine.set_custom(Viewport {
            x: 10,
            y: 10,
            width: 640,
            height: 480,
            full_width: 0,
            full_height: 0,
        });
        let mut vp = Viewport::default();
        engine.get_scaled_integer(&mut vp, 800, 600, 0.0, true);
        assert_eq!((vp.x, vp.y, vp.width, vp.height), (80, 60, 640, 480));
    }

    #[test]
    fn test_compute_pillarbox_and_letterbox() {
        let mut engine = engine_for(320, 240);
        engine.set_aspect_ratio(AspectRatio::Ratio4x3);

        let wide = engine.compute(1920, 1080, Rotation::Deg0, true, false);
        assert_eq!((wide.x, wide.y, wide.width, wide.height), (240, 0, 1440, 1080));

        let tall = engine.compute(800, 800, Rotation::Deg0, true, false);
        assert_eq!((tall.x, tall.y, tall.width, tall.height), (0, 100, 800, 600));

        let full = engine.compute(1920, 1080, Rotation::Deg0, true, true);
        assert_eq!(full, Viewport::full(1920, 1080));
    }

    #[test]
    fn test_compute_rotation_inverts_aspect() {
        let mut engine = engine_for(320, 240);
        engine.set_aspect_ratio(AspectRatio::Ratio4x3);
        let vp = engine.compute(1200, 900, Rotation::Deg90, true, false);
        // 3:4 content in a 4:3 surface
        assert_eq!((vp.width, vp.height), (675, 900));
        assert!(vp.contains_content());

        let ignored = engine.compute(1200, 900, Rotation::Deg90, false, false);
        assert_eq!(ignored, Viewport::full(1200, 900));
    }

    #[test]
    fn test_compute_custom_is_clamped() {
        let mut engine = engine_for(320, 240);
        engine.set_aspect_ratio(AspectRatio::Custom);
        engine.set_custom(Viewport {
            x: 600,
            y: 0,
            width: 400,
            height: 300,
            full_width: 0,
            full_height: 0,
        });
        let vp = engine.compute(800, 600, Rotation::Deg0, false, false);
        assert_eq!((vp.x, vp.width), (600, 200));
        assert!(vp.contains_content());

        engine.reset_custom_viewport();
        assert!(engine.custom().is_empty());
    }

    #[test]
    fn test_core_and_config_policies() {
        let mut engine = engine_for(256, 240);
        engine.set_aspect_ratio(AspectRatio::Core);
        assert!((engine.aspect_ratio() - 256.0 / 240.0).abs() < 1e-6);

        // Config with a negative configured value derives from the core
        engine.set_aspect_ratio(AspectRatio::Config);
        assert!((engine.aspect_ratio() - 256.0 / 240.0).abs() < 1e-6);
    }

    #[test]
    fn test_translate_corners_invert_forward_mapping() {
        let vp = Viewport {
            x: 240,
            y: 0,
            width: 1440,
            height: 1080,
            full_width: 1920,
            full_height: 1080,
        };
        let forward = |rx: i64, ry: i64| -> (i32, i32) {
            let wx = vp.x as i64 + (rx + COORD_MAX) * vp.width as i64 / (2 * COORD_MAX);
            let wy = vp.y as i64 + (ry + COORD_MAX) * vp.height as i64 / (2 * COORD_MAX);
            (wx as i32, wy as i32)
        };

        for &(rx, ry) in &[(-0x7fff, -0x7fff), (0x7fff, -0x7fff), (-0x7fff, 0x7fff), (0x7fff, 0x7fff)] {
            let (wx, wy) = forward(rx, ry);
            let coords = translate_coord_viewport(&vp, wx, wy).expect("viewport has area");
            assert!((coords.x as i64 - rx).abs() <= 64, "x {} vs {}", coords.x, rx);
            assert!((coords.y as i64 - ry).abs() <= 64, "y {} vs {}", coords.y, ry);
        }
    }

    #[test]
    fn test_translate_out_of_bounds_and_screen_space() {
        let vp = Viewport {
            x: 100,
            y: 0,
            width: 200,
            height: 200,
            full_width: 400,
            full_height: 200,
        };
        let coords = translate_coord_viewport(&vp, 50, 100).expect("viewport has area");
        assert_eq!(coords.x, -0x8000);
        assert!(coords.screen_x > -0x7fff && coords.screen_x < 0);
        assert_eq!(coords.screen_y, 0);

        let far = translate_coord_viewport(&vp, i32::MIN, i32::MAX).expect("viewport has area");
        assert_eq!((far.x, far.y), (-0x8000, -0x8000));
        assert_eq!((far.screen_x, far.screen_y), (-0x8000, -0x8000));

        assert!(translate_coord_viewport(&Viewport::default(), 10, 10).is_none());
    }
}
