//! The contract every video backend implements.
//!
//! # Design
//!
//! Backends differ wildly in what they can do, so the contract is split:
//!
//! ```text
//! DriverFactory::init -> Box<dyn VideoDriver>
//!                          ├─ poke()             -> Pokeable
//!                          ├─ overlay()          -> Overlayable
//!                          ├─ viewport_reader()  -> ViewportReader
//!                          ├─ raw_frame_reader() -> RawFrameReader
//!                          └─ shader_loader()    -> ShaderLoader
//! ```
//!
//! A backend that lacks a capability simply keeps the default accessor,
//! which returns `None`. Callers never see a half-implemented interface;
//! inside `Pokeable` the individual members still default to "absent"
//! because backends routinely implement only a handful of them.

use std::path::Path;

use crate::aspect::AspectRatio;
use crate::error::VideoError;
use crate::hw_context::{HwContext, HwRenderInterface};
use crate::types::{
    DisplayModeRequest, FrameInfo, FrameSubmission, OsdParams, RawFrame, Rotation, ShaderInfo,
    ShaderType, SoftwareFramebuffer, TextureFilter, TextureId, TextureImage,
};
use crate::viewport::Viewport;

/// An input driver a backend brings up together with its window.
pub trait InputDriver: Send {
    fn ident(&self) -> &'static str;

    fn poll(&mut self) {}
}

/// Everything a backend may look at or touch while initializing.
pub struct InitContext<'a> {
    pub mode: &'a DisplayModeRequest,
    /// Read the cache-context request and acknowledge it once honoured
    pub hw: &'a mut HwContext,
    /// Backends with a coupled input subsystem install it here
    pub input: &'a mut Option<Box<dyn InputDriver>>,
}

/// Catalog entry: knows its name and how to create an instance.
pub trait DriverFactory: Send + Sync {
    /// Human-readable identifier, also the configuration name
    fn ident(&self) -> &'static str;

    /// Bring up a display for `ctx.mode`.
    ///
    /// An error means "unusable, try the next one"; nothing global may be
    /// left half-initialized.
    fn init(&self, ctx: &mut InitContext<'_>) -> Result<Box<dyn VideoDriver>, VideoError>;
}

/// A live backend instance. Dropping it frees it.
pub trait VideoDriver: Send {
    fn ident(&self) -> &'static str;

    /// Present one frame.
    ///
    /// `FrameData::Dupe` means "show the previous frame again". An overlay
    /// message never changes the output size.
    fn frame(&mut self, frame: &FrameSubmission<'_>, info: &FrameInfo) -> bool;

    /// `true` turns vsync waiting off (fast-forward). Best effort.
    fn set_nonblock_state(&mut self, nonblock: bool);

    /// Is the window still open?
    fn alive(&self) -> bool;

    /// Does the window have input focus?
    fn focus(&self) -> bool;

    fn suppress_screensaver(&mut self, enable: bool) -> bool;

    fn has_windowed(&self) -> bool {
        false
    }

    /// The drawable surface changed size or the caller wants a different
    /// viewport layout. `viewport` is what the aspect engine derived for it.
    fn set_viewport(
        &mut self,
        width: u32,
        height: u32,
        force_full: bool,
        allow_rotate: bool,
        viewport: &Viewport,
    );

    fn set_rotation(&mut self, rotation: Rotation);

    fn viewport_info(&self) -> Viewport;

    /// Threaded backends only promise that a frame was accepted on return,
    /// not that it was displayed.
    fn is_threaded(&self) -> bool {
        false
    }

    /// Reports (once) that the GPU context was lost since the last call.
    fn take_context_loss(&mut self) -> bool {
        false
    }

    fn poke(&mut self) -> Option<&mut dyn Pokeable> {
        None
    }

    fn overlay(&mut self) -> Option<&mut dyn Overlayable> {
        None
    }

    fn viewport_reader(&mut self) -> Option<&mut dyn ViewportReader> {
        None
    }

    fn raw_frame_reader(&mut self) -> Option<&mut dyn RawFrameReader> {
        None
    }

    fn shader_loader(&mut self) -> Option<&mut dyn ShaderLoader> {
        None
    }
}

/// Screenshot support.
pub trait ViewportReader {
    /// Fill `buffer` with the viewport as packed 24-bit BGR, top row first.
    /// `buffer` must hold `width * height * 3` bytes of the viewport.
    fn read_viewport(&mut self, buffer: &mut [u8], is_idle: bool) -> bool;
}

/// Copy-out of the last frame in the pixel format it was submitted in.
pub trait RawFrameReader {
    fn read_frame_raw(&mut self) -> Option<RawFrame>;
}

pub trait ShaderLoader {
    /// `None` unloads the current shader.
    fn set_shader(&mut self, kind: ShaderType, path: Option<&Path>) -> bool;
}

/// Extra controls a backend may expose. Every member defaults to absent.
pub trait Pokeable {
    fn load_texture(
        &mut self,
        _image: &TextureImage,
        _threaded: bool,
        _filter: TextureFilter,
    ) -> Option<TextureId> {
        None
    }

    fn unload_texture(&mut self, _id: TextureId) {}

    fn set_video_mode(&mut self, _width: u32, _height: u32, _fullscreen: bool) -> bool {
        false
    }

    fn set_filtering(&mut self, _index: u32, _smooth: bool) {}

    fn video_output_size(&self) -> Option<(u32, u32)> {
        None
    }

    /// Step to the previous output resolution
    fn video_output_prev(&mut self) -> bool {
        false
    }

    /// Step to the next output resolution
    fn video_output_next(&mut self) -> bool {
        false
    }

    /// Handle of the framebuffer object a hardware core renders into
    fn current_framebuffer(&self) -> Option<usize> {
        None
    }

    fn proc_address(&self, _sym: &str) -> Option<usize> {
        None
    }

    fn set_aspect_ratio(&mut self, _policy: AspectRatio) {}

    /// Apply pending state changes (filtering, aspect) in one go
    fn apply_state_changes(&mut self) {}

    /// Menu texture shown on top of, or instead of, the game picture
    fn set_texture_frame(&mut self, _frame: &[u8], _rgb32: bool, _width: u32, _height: u32, _alpha: f32) {}

    fn set_texture_enable(&mut self, _enable: bool, _full_screen: bool) {}

    fn set_osd_msg(&mut self, _msg: &str, _params: &OsdParams) {}

    fn show_mouse(&mut self, _state: bool) {}

    fn grab_mouse_toggle(&mut self) {}

    fn current_shader(&self) -> Option<ShaderInfo> {
        None
    }

    fn current_software_framebuffer(
        &mut self,
        _width: u32,
        _height: u32,
    ) -> Option<SoftwareFramebuffer<'_>> {
        None
    }

    fn hw_render_interface(&self) -> Option<HwRenderInterface> {
        None
    }
}

/// On-screen input overlay (touch controls and the like).
pub trait Overlayable {
    fn enable(&mut self, state: bool);

    fn load(&mut self, images: &[TextureImage]) -> bool;

    /// Texture coordinates of `image`, normalized
    fn tex_geom(&mut self, image: usize, x: f32, y: f32, w: f32, h: f32);

    /// Screen placement of `image`, normalized
    fn vertex_geom(&mut self, image: usize, x: f32, y: f32, w: f32, h: f32);

    fn full_screen(&mut self, enable: bool);

    fn set_alpha(&mut self, image: usize, alpha: f32);
}

/// Which optional capabilities the active backend offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DriverCapabilities {
    pub poke: bool,
    pub overlay: bool,
    pub viewport_read: bool,
    pub raw_frame_read: bool,
    pub shader: bool,
    pub hw_render: bool,
}

impl DriverCapabilities {
    pub fn probe(driver: &mut dyn VideoDriver) -> Self {
        let hw_render = driver
            .poke()
            .is_some_and(|poke| poke.hw_render_interface().is_some());
        Self {
            poke: driver.poke().is_some(),
            overlay: driver.overlay().is_some(),
            viewport_read: driver.viewport_reader().is_some(),
            raw_frame_read: driver.raw_frame_reader().is_some(),
            shader: driver.shader_loader().is_some(),
            hw_render,
        }
    }
}
