//! CPU software backend.
//!
//! Frames are decoded from whatever pixel format the core uses, scaled
//! nearest-neighbour into the derived viewport of an in-memory ARGB surface,
//! optionally filtered, and composited with the menu texture and input
//! overlay. Nothing is shown on a real screen; the surface can be read back,
//! which is what the headless frontend and the tests do.

mod filter;
mod overlay;
mod surface;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use video_core::aspect::AspectRatio;
use video_core::driver::{
    DriverFactory, InitContext, InputDriver, Overlayable, Pokeable, RawFrameReader,
    ShaderLoader, VideoDriver, ViewportReader,
};
use video_core::error::VideoError;
use video_core::logging::{log, LogCategory, LogLevel};
use video_core::types::{
    FrameData, FrameInfo, FrameSubmission, OsdParams, PixelFormat, RawFrame, Rotation,
    ShaderInfo, ShaderType, SoftwareFramebuffer, TextureFilter, TextureId, TextureImage,
};
use video_core::viewport::Viewport;

pub use filter::SoftFilter;
pub use overlay::{NormRect, Overlay};
pub use surface::{SourceFrame, Surface, CLEAR_COLOR};

pub const SOFT_IDENT: &str = "soft";
pub const SOFT_DESKTOP_SIZE: (u32, u32) = (1920, 1080);
/// Largest surface edge the backend agrees to allocate
pub const MAX_SURFACE_EDGE: u32 = 8192;

/// Output sizes `video_output_prev`/`video_output_next` step through
pub const OUTPUT_SIZES: [(u32, u32); 6] = [
    (640, 480),
    (800, 600),
    (1024, 768),
    (1280, 720),
    (1280, 960),
    (1920, 1080),
];

/// Input side of the headless window: no devices, just counts polls.
#[derive(Debug, Default)]
pub struct SoftInput {
    polls: u64,
}

impl SoftInput {
    pub fn polls(&self) -> u64 {
        self.polls
    }
}

impl InputDriver for SoftInput {
    fn ident(&self) -> &'static str {
        "soft_input"
    }

    fn poll(&mut self) {
        self.polls += 1;
    }
}

pub struct SoftDriverFactory {
    desktop: (u32, u32),
    with_input: bool,
}

impl SoftDriverFactory {
    pub fn new() -> Self {
        Self {
            desktop: SOFT_DESKTOP_SIZE,
            with_input: true,
        }
    }

    pub fn with_desktop_size(mut self, width: u32, height: u32) -> Self {
        self.desktop = (width, height);
        self
    }

    /// Skip installing [`SoftInput`] during init
    pub fn without_input(mut self) -> Self {
        self.with_input = false;
        self
    }
}

impl Default for SoftDriverFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl DriverFactory for SoftDriverFactory {
    fn ident(&self) -> &'static str {
        SOFT_IDENT
    }

    fn init(&self, ctx: &mut InitContext<'_>) -> Result<Box<dyn VideoDriver>, VideoError> {
        if ctx.hw.is_hw_context() {
            return Err(VideoError::init_failed(
                SOFT_IDENT,
                "hardware rendering contexts are not supported",
            ));
        }

        let (width, height) = if ctx.mode.wants_desktop_size() {
            self.desktop
        } else {
            (ctx.mode.width, ctx.mode.height)
        };
        if width == 0 || height == 0 {
            return Err(VideoError::init_failed(
                SOFT_IDENT,
                format!("windowed mode needs a size, got {}x{}", width, height),
            ));
        }
        if width > MAX_SURFACE_EDGE || height > MAX_SURFACE_EDGE {
            return Err(VideoError::init_failed(
                SOFT_IDENT,
                format!("{}x{} exceeds the {} pixel surface limit", width, height, MAX_SURFACE_EDGE),
            ));
        }

        if self.with_input && ctx.input.is_none() {
            *ctx.input = Some(Box::new(SoftInput::default()));
        }

        log(LogCategory::Driver, LogLevel::Info, || {
            format!(
                "soft: {}x{} surface, max texture {}, {}",
                width,
                height,
                ctx.mode.max_texture_size(),
                if ctx.mode.rgb32 { "32-bit" } else { "16-bit" }
            )
        });

        Ok(Box::new(SoftDriver::new(
            width,
            height,
            ctx.mode.max_texture_size(),
            ctx.mode.smooth,
            !ctx.mode.vsync,
            self.desktop,
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct MenuTextureState {
    enabled: bool,
    full_screen: bool,
    alpha: f32,
}

pub struct SoftDriver {
    surface: Surface,
    viewport: Viewport,
    rotation: Rotation,
    source: SourceFrame,
    max_texture: u32,
    desktop: (u32, u32),
    nonblock: bool,
    smooth: bool,
    screensaver_suppressed: bool,
    aspect: AspectRatio,
    filter: SoftFilter,
    shader_path: Option<PathBuf>,
    textures: HashMap<TextureId, TextureImage>,
    next_texture: u64,
    menu: Option<TextureImage>,
    menu_state: MenuTextureState,
    osd: Option<(String, OsdParams)>,
    last_message: Option<String>,
    mouse_visible: bool,
    mouse_grabbed: bool,
    state_dirty: bool,
    software_fb: Vec<u8>,
    overlay: Overlay,
    presented: u64,
}

impl SoftDriver {
    fn new(
        width: u32,
        height: u32,
        max_texture: u32,
        smooth: bool,
        nonblock: bool,
        desktop: (u32, u32),
    ) -> Self {
        Self {
            surface: Surface::new(width, height),
            viewport: Viewport::full(width, height),
            rotation: Rotation::Deg0,
            source: SourceFrame::default(),
            max_texture,
            desktop,
            nonblock,
            smooth,
            screensaver_suppressed: false,
            aspect: AspectRatio::default(),
            filter: SoftFilter::None,
            shader_path: None,
            textures: HashMap::new(),
            next_texture: 1,
            menu: None,
            menu_state: MenuTextureState {
                enabled: false,
                full_screen: false,
                alpha: 1.0,
            },
            osd: None,
            last_message: None,
            mouse_visible: true,
            mouse_grabbed: false,
            state_dirty: false,
            software_fb: Vec::new(),
            overlay: Overlay::default(),
            presented: 0,
        }
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }

    pub fn last_message(&self) -> Option<&str> {
        self.last_message.as_deref()
    }

    pub fn filter(&self) -> SoftFilter {
        self.filter
    }

    pub fn is_mouse_visible(&self) -> bool {
        self.mouse_visible
    }

    pub fn is_mouse_grabbed(&self) -> bool {
        self.mouse_grabbed
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        self.surface.resize(width, height);
        // The facade notices the new size on the next frame and re-derives
        self.viewport = Viewport::full(width, height);
        log(LogCategory::Driver, LogLevel::Info, || {
            format!("soft: surface resized to {}x{}", width, height)
        });
    }

    fn step_output(&mut self, forward: bool) -> bool {
        let current = (self.surface.width(), self.surface.height());
        let area = |(w, h): (u32, u32)| w as u64 * h as u64;
        let target = if forward {
            OUTPUT_SIZES
                .iter()
                .copied()
                .find(|&size| area(size) > area(current))
        } else {
            OUTPUT_SIZES
                .iter()
                .rev()
                .copied()
                .find(|&size| area(size) < area(current))
        };
        match target {
            Some((width, height)) => {
                self.resize_surface(width, height);
                true
            }
            None => false,
        }
    }

    fn render(&mut self) {
        self.surface.clear(CLEAR_COLOR);

        let menu_fullscreen = self.menu_state.enabled && self.menu_state.full_screen;
        if !menu_fullscreen {
            self.surface.blit(&self.source, &self.viewport, self.rotation);
            if self.filter != SoftFilter::None {
                if let Some((mut region, w, h)) = self.surface.copy_region(&self.viewport) {
                    self.filter.apply(&mut region, w, h);
                    self.surface.write_region(&self.viewport, &region, w, h);
                }
            }
        }

        if self.menu_state.enabled {
            if let Some(menu) = &self.menu {
                let rect = if self.menu_state.full_screen {
                    Viewport::full(self.surface.width(), self.surface.height())
                } else {
                    self.viewport
                };
                self.surface.draw_texture(menu, &rect, self.menu_state.alpha);
            }
        }

        self.overlay.composite(&mut self.surface, &self.viewport);
        self.presented += 1;
    }
}

impl VideoDriver for SoftDriver {
    fn ident(&self) -> &'static str {
        SOFT_IDENT
    }

    fn frame(&mut self, frame: &FrameSubmission<'_>, info: &FrameInfo) -> bool {
        match frame.data {
            FrameData::Cpu(data) => {
                if frame.width > self.max_texture || frame.height > self.max_texture {
                    log(LogCategory::Frame, LogLevel::Warn, || {
                        format!(
                            "soft: {}x{} frame exceeds max texture size {}",
                            frame.width, frame.height, self.max_texture
                        )
                    });
                    return false;
                }
                self.source
                    .store(data, frame.width, frame.height, frame.pitch, info.pixel_format);
            }
            // No GPU here: a hardware frame can only mean the core drew into
            // the software framebuffer handed out through poke.
            FrameData::Hardware => {
                if self.software_fb.is_empty() {
                    return false;
                }
                let fb = std::mem::take(&mut self.software_fb);
                self.source.store(
                    &fb,
                    frame.width,
                    frame.height,
                    frame.width as usize * 4,
                    PixelFormat::Xrgb8888,
                );
                self.software_fb = fb;
            }
            FrameData::Dupe => {}
        }

        if let Some(msg) = frame.message {
            self.last_message = Some(msg.to_string());
        }
        self.render();
        true
    }

    fn set_nonblock_state(&mut self, nonblock: bool) {
        self.nonblock = nonblock;
    }

    fn alive(&self) -> bool {
        true
    }

    fn focus(&self) -> bool {
        true
    }

    fn suppress_screensaver(&mut self, enable: bool) -> bool {
        self.screensaver_suppressed = enable;
        true
    }

    fn has_windowed(&self) -> bool {
        true
    }

    fn set_viewport(
        &mut self,
        width: u32,
        height: u32,
        _force_full: bool,
        _allow_rotate: bool,
        viewport: &Viewport,
    ) {
        if (width, height) != (self.surface.width(), self.surface.height())
            && width > 0
            && height > 0
            && width <= MAX_SURFACE_EDGE
            && height <= MAX_SURFACE_EDGE
        {
            self.surface.resize(width, height);
        }
        self.viewport = *viewport;
    }

    fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = rotation;
    }

    fn viewport_info(&self) -> Viewport {
        self.viewport
    }

    fn poke(&mut self) -> Option<&mut dyn Pokeable> {
        Some(self)
    }

    fn overlay(&mut self) -> Option<&mut dyn Overlayable> {
        Some(&mut self.overlay)
    }

    fn viewport_reader(&mut self) -> Option<&mut dyn ViewportReader> {
        Some(self)
    }

    fn raw_frame_reader(&mut self) -> Option<&mut dyn RawFrameReader> {
        Some(self)
    }

    fn shader_loader(&mut self) -> Option<&mut dyn ShaderLoader> {
        Some(self)
    }
}

impl ViewportReader for SoftDriver {
    fn read_viewport(&mut self, buffer: &mut [u8], _is_idle: bool) -> bool {
        self.surface.read_bgr24(&self.viewport, buffer)
    }
}

impl RawFrameReader for SoftDriver {
    fn read_frame_raw(&mut self) -> Option<RawFrame> {
        if self.source.is_empty() {
            return None;
        }
        Some(RawFrame {
            data: self.source.data.clone(),
            width: self.source.width,
            height: self.source.height,
            pitch: self.source.pitch,
        })
    }
}

impl ShaderLoader for SoftDriver {
    fn set_shader(&mut self, kind: ShaderType, path: Option<&Path>) -> bool {
        let Some(path) = path.filter(|_| kind != ShaderType::None) else {
            self.filter = SoftFilter::None;
            self.shader_path = None;
            return true;
        };
        match SoftFilter::from_path(path) {
            Some(filter) => {
                log(LogCategory::Driver, LogLevel::Info, || {
                    format!("soft: filter preset {}", filter.name())
                });
                self.filter = filter;
                self.shader_path = Some(path.to_path_buf());
                true
            }
            None => {
                log(LogCategory::Driver, LogLevel::Warn, || {
                    format!("soft: no filter preset matches {}", path.display())
                });
                false
            }
        }
    }
}

impl Pokeable for SoftDriver {
    fn load_texture(
        &mut self,
        image: &TextureImage,
        _threaded: bool,
        _filter: TextureFilter,
    ) -> Option<TextureId> {
        let expected = image.width as usize * image.height as usize;
        if expected == 0 || image.pixels.len() < expected {
            return None;
        }
        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(id, image.clone());
        log(LogCategory::Poke, LogLevel::Debug, || {
            format!("soft: texture {:?} loaded ({}x{})", id, image.width, image.height)
        });
        Some(id)
    }

    fn unload_texture(&mut self, id: TextureId) {
        self.textures.remove(&id);
    }

    fn set_video_mode(&mut self, width: u32, height: u32, fullscreen: bool) -> bool {
        let (width, height) = if fullscreen && (width == 0 || height == 0) {
            self.desktop
        } else {
            (width, height)
        };
        if width == 0 || height == 0 || width > MAX_SURFACE_EDGE || height > MAX_SURFACE_EDGE {
            return false;
        }
        self.resize_surface(width, height);
        true
    }

    fn set_filtering(&mut self, _index: u32, smooth: bool) {
        self.smooth = smooth;
        self.state_dirty = true;
    }

    fn video_output_size(&self) -> Option<(u32, u32)> {
        Some((self.surface.width(), self.surface.height()))
    }

    fn video_output_prev(&mut self) -> bool {
        self.step_output(false)
    }

    fn video_output_next(&mut self) -> bool {
        self.step_output(true)
    }

    fn set_aspect_ratio(&mut self, policy: AspectRatio) {
        self.aspect = policy;
        self.state_dirty = true;
    }

    fn apply_state_changes(&mut self) {
        if std::mem::take(&mut self.state_dirty) {
            log(LogCategory::Poke, LogLevel::Debug, || {
                format!("soft: state applied (aspect {:?}, smooth {})", self.aspect, self.smooth)
            });
        }
    }

    fn set_texture_frame(&mut self, frame: &[u8], rgb32: bool, width: u32, height: u32, alpha: f32) {
        self.menu = surface::decode_texture_frame(frame, rgb32, width, height);
        self.menu_state.alpha = alpha;
    }

    fn set_texture_enable(&mut self, enable: bool, full_screen: bool) {
        self.menu_state.enabled = enable;
        self.menu_state.full_screen = full_screen;
    }

    fn set_osd_msg(&mut self, msg: &str, params: &OsdParams) {
        self.osd = Some((msg.to_string(), *params));
        self.last_message = Some(msg.to_string());
    }

    fn show_mouse(&mut self, state: bool) {
        self.mouse_visible = state;
    }

    fn grab_mouse_toggle(&mut self) {
        self.mouse_grabbed = !self.mouse_grabbed;
    }

    fn current_shader(&self) -> Option<ShaderInfo> {
        let path = self.shader_path.clone()?;
        Some(ShaderInfo {
            kind: ShaderType::Glsl,
            path: Some(path),
            passes: 1,
        })
    }

    fn current_software_framebuffer(
        &mut self,
        width: u32,
        height: u32,
    ) -> Option<SoftwareFramebuffer<'_>> {
        if width == 0 || height == 0 || width > self.max_texture || height > self.max_texture {
            return None;
        }
        let pitch = width as usize * 4;
        self.software_fb.resize(pitch * height as usize, 0);
        Some(SoftwareFramebuffer {
            data: &mut self.software_fb,
            width,
            height,
            pitch,
            format: PixelFormat::Xrgb8888,
        })
    }
}
