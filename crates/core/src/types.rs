//! Value types passed between the application, the facade and backends.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::aspect::AspectRatio;
use crate::viewport::Viewport;

/// Textures handed to backends never exceed `SCALE_BASE * input_scale`
/// pixels on a side.
pub const SCALE_BASE: u32 = 256;

/// Pixel layouts a frame may arrive in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 0RRRRRGGGGGBBBBB, native endian. The format a core gets until it asks
    /// for something else.
    #[default]
    Rgb1555,
    /// AAAAAAAARRRRRRRRGGGGGGGGBBBBBBBB, native endian, alpha ignored.
    Xrgb8888,
    /// RRRRRGGGGGGBBBBB, native endian.
    Rgb565,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Xrgb8888 => 4,
            PixelFormat::Rgb1555 | PixelFormat::Rgb565 => 2,
        }
    }

    pub fn is_32bit(self) -> bool {
        self == PixelFormat::Xrgb8888
    }

    /// Decode one pixel into 0xAARRGGBB with full alpha
    pub fn to_argb(self, bytes: &[u8]) -> u32 {
        match self {
            PixelFormat::Xrgb8888 => {
                let v = u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                0xFF00_0000 | (v & 0x00FF_FFFF)
            }
            PixelFormat::Rgb565 => {
                let v = u16::from_ne_bytes([bytes[0], bytes[1]]) as u32;
                let r = (v >> 11) & 0x1F;
                let g = (v >> 5) & 0x3F;
                let b = v & 0x1F;
                0xFF00_0000
                    | (((r << 3) | (r >> 2)) << 16)
                    | (((g << 2) | (g >> 4)) << 8)
                    | ((b << 3) | (b >> 2))
            }
            PixelFormat::Rgb1555 => {
                let v = u16::from_ne_bytes([bytes[0], bytes[1]]) as u32;
                let r = (v >> 10) & 0x1F;
                let g = (v >> 5) & 0x1F;
                let b = v & 0x1F;
                0xFF00_0000
                    | (((r << 3) | (r >> 2)) << 16)
                    | (((g << 3) | (g >> 2)) << 8)
                    | ((b << 3) | (b >> 2))
            }
        }
    }
}

/// Output rotation in 90 degree steps (counter-clockwise).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Any index is accepted; it wraps modulo four.
    pub fn from_index(index: u32) -> Self {
        match index % 4 {
            0 => Rotation::Deg0,
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            _ => Rotation::Deg270,
        }
    }

    pub fn index(self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 1,
            Rotation::Deg180 => 2,
            Rotation::Deg270 => 3,
        }
    }

    /// 90 and 270 degrees swap the output axes
    pub fn is_sideways(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

/// Everything a backend needs to bring up a display mode.
///
/// Built once per mode-set; backends only read it.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayModeRequest {
    /// Window width. 0 with `fullscreen` means the desktop width.
    pub width: u32,
    /// Window height. 0 with `fullscreen` means the desktop height.
    pub height: u32,
    pub fullscreen: bool,
    pub vsync: bool,
    /// Keep the output at the configured aspect ratio
    pub force_aspect: bool,
    pub swap_interval: u32,
    /// Bilinear filtering instead of nearest
    pub smooth: bool,
    /// Maximum frame size is `SCALE_BASE * input_scale` on both axes
    pub input_scale: u32,
    /// 32-bit XRGB8888 input instead of a 16-bit packed format
    pub rgb32: bool,
    pub font_enable: bool,
    /// Native handle of a surface to embed into, when there is one
    pub parent: Option<usize>,
}

impl Default for DisplayModeRequest {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fullscreen: false,
            vsync: true,
            force_aspect: true,
            swap_interval: 1,
            smooth: false,
            input_scale: 1,
            rgb32: false,
            font_enable: true,
            parent: None,
        }
    }
}

impl DisplayModeRequest {
    /// Largest frame edge the backend has to be able to accept
    pub fn max_texture_size(&self) -> u32 {
        SCALE_BASE * self.input_scale.max(1)
    }

    /// True when the backend should size itself to the desktop
    pub fn wants_desktop_size(&self) -> bool {
        self.fullscreen && (self.width == 0 || self.height == 0)
    }
}

/// Pixel payload of a frame submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameData<'a> {
    /// Fresh CPU-side pixels, `pitch` bytes per row.
    Cpu(&'a [u8]),
    /// No new data; redraw whatever was shown last.
    Dupe,
    /// The core rendered into the hardware framebuffer; no CPU copy exists.
    Hardware,
}

impl FrameData<'_> {
    pub fn is_dupe(&self) -> bool {
        matches!(self, FrameData::Dupe)
    }
}

/// One call's worth of frame data as a backend sees it.
#[derive(Debug, Clone, Copy)]
pub struct FrameSubmission<'a> {
    pub data: FrameData<'a>,
    pub width: u32,
    pub height: u32,
    /// Bytes between scanlines; may exceed `width * bpp`
    pub pitch: usize,
    pub frame_count: u64,
    /// Text to draw over the picture. Never changes output dimensions.
    pub message: Option<&'a str>,
}

/// Context bundle that accompanies every frame.
///
/// The application fills in the runtime flags; the facade stamps the fields
/// it owns (pixel format, viewport, counters) right before dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameInfo {
    pub refresh_rate: f32,
    pub frame_count: u64,
    pub fps_show: bool,
    pub fps_text: String,
    pub width: u32,
    pub height: u32,

    pub pixel_format: PixelFormat,
    pub aspect_ratio: AspectRatio,
    pub scale_integer: bool,
    pub viewport: Viewport,
    pub use_rgba: bool,

    pub shared_context: bool,
    pub black_frame_insertion: bool,
    pub hard_sync: bool,
    pub hard_sync_frames: u32,
    pub max_swapchain_images: u32,
    pub post_filter_record: bool,
    pub fullscreen: bool,
    pub windowed_fullscreen: bool,
    pub monitor_index: u32,

    pub font_enable: bool,
    pub font_msg_pos_x: f32,
    pub font_msg_pos_y: f32,
    pub font_msg_color: [f32; 3],

    pub libretro_running: bool,
    pub runloop_is_paused: bool,
    pub runloop_is_idle: bool,
    pub runloop_is_slowmotion: bool,
    pub menu_is_alive: bool,
    pub menu_wallpaper_opacity: f32,
}

impl Default for FrameInfo {
    fn default() -> Self {
        Self {
            refresh_rate: 60.0,
            frame_count: 0,
            fps_show: false,
            fps_text: String::new(),
            width: 0,
            height: 0,
            pixel_format: PixelFormat::default(),
            aspect_ratio: AspectRatio::default(),
            scale_integer: false,
            viewport: Viewport::default(),
            use_rgba: false,
            shared_context: false,
            black_frame_insertion: false,
            hard_sync: false,
            hard_sync_frames: 0,
            max_swapchain_images: 3,
            post_filter_record: false,
            fullscreen: false,
            windowed_fullscreen: true,
            monitor_index: 0,
            font_enable: true,
            font_msg_pos_x: 0.05,
            font_msg_pos_y: 0.05,
            font_msg_color: [1.0, 1.0, 0.0],
            libretro_running: true,
            runloop_is_paused: false,
            runloop_is_idle: false,
            runloop_is_slowmotion: false,
            menu_is_alive: false,
            menu_wallpaper_opacity: 0.3,
        }
    }
}

/// Outcome of a frame dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// The backend accepted the frame. Threaded backends may not have shown
    /// it yet.
    Presented,
    /// Nothing was dispatched: no active driver, stub mode, or a redraw was
    /// requested before any frame was cached.
    Skipped,
    /// The backend refused the frame. Retry next iteration.
    Failed,
}

impl FrameStatus {
    pub fn is_presented(self) -> bool {
        self == FrameStatus::Presented
    }
}

/// Copy of the current raw frame, owned by whoever asked for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub pitch: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureFilter {
    #[default]
    Linear,
    Nearest,
    MipmapLinear,
    MipmapNearest,
}

/// Decoded RGBA image used for menu textures and overlays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    /// 0xAARRGGBB, row-major, tightly packed
    pub pixels: Vec<u32>,
}

impl TextureImage {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width * height) as usize],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShaderType {
    #[default]
    None,
    Cg,
    Glsl,
    Slang,
}

/// What a backend reports about its loaded shader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderInfo {
    pub kind: ShaderType,
    pub path: Option<PathBuf>,
    pub passes: u32,
}

/// Styling for an OSD message pushed through the poke interface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OsdParams {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
    /// 0xAARRGGBB
    pub color: u32,
    pub full_screen: bool,
}

impl Default for OsdParams {
    fn default() -> Self {
        Self {
            x: 0.05,
            y: 0.05,
            scale: 1.0,
            color: 0xFFFF_FF00,
            full_screen: false,
        }
    }
}

/// Backend-owned memory a core may render into directly.
#[derive(Debug)]
pub struct SoftwareFramebuffer<'a> {
    pub data: &'a mut [u8],
    pub width: u32,
    pub height: u32,
    pub pitch: usize,
    pub format: PixelFormat,
}

/// Kind of native display handle stored alongside the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayType {
    #[default]
    None,
    X11,
    Wayland,
    Win32,
    Cocoa,
}

/// Native handles backends publish for collaborators (input, menus).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplayHandles {
    pub display: usize,
    pub window: usize,
    pub display_type: DisplayType,
}

/// Largest power-of-two row alignment (up to 8) that `pitch` satisfies.
pub fn pixel_alignment(pitch: usize) -> usize {
    if pitch & 1 != 0 {
        1
    } else if pitch & 2 != 0 {
        2
    } else if pitch & 4 != 0 {
        4
    } else {
        8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_alignment() {
        assert_eq!(pixel_alignment(641), 1);
        assert_eq!(pixel_alignment(642), 2);
        assert_eq!(pixel_alignment(644), 4);
        assert_eq!(pixel_alignment(1280), 8);
        assert_eq!(pixel_alignment(0), 8);
    }

    #[test]
    fn test_pixel_format_decode() {
        let white565 = 0xFFFFu16.to_ne_bytes();
        assert_eq!(PixelFormat::Rgb565.to_argb(&white565), 0xFFFF_FFFF);

        let red1555 = 0x7C00u16.to_ne_bytes();
        assert_eq!(PixelFormat::Rgb1555.to_argb(&red1555), 0xFFFF_0000);

        let green = 0x0000_FF00u32.to_ne_bytes();
        assert_eq!(PixelFormat::Xrgb8888.to_argb(&green), 0xFF00_FF00);
    }

    #[test]
    fn test_rotation_wraps() {
        assert_eq!(Rotation::from_index(5), Rotation::Deg90);
        assert_eq!(Rotation::from_index(3).index(), 3);
        assert!(Rotation::Deg270.is_sideways());
        assert!(!Rotation::Deg180.is_sideways());
    }

    #[test]
    fn test_mode_request_limits() {
        let mode = DisplayModeRequest {
            input_scale: 2,
            ..Default::default()
        };
        assert_eq!(mode.max_texture_size(), 512);

        let desktop = DisplayModeRequest {
            width: 0,
            height: 0,
            fullscreen: true,
            ..Default::default()
        };
        assert!(desktop.wants_desktop_size());
        assert!(!DisplayModeRequest::default().wants_desktop_size());
    }
}
