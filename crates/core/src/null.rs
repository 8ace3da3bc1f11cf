//! Backend that accepts everything and draws nothing.
//!
//! Useful as the last catalog entry (headless runs keep going when nothing
//! else comes up) and for exercising the facade.

use crate::driver::{DriverFactory, InitContext, VideoDriver};
use crate::error::VideoError;
use crate::types::{FrameInfo, FrameSubmission, Rotation};
use crate::viewport::Viewport;

pub const NULL_DESKTOP_SIZE: (u32, u32) = (1920, 1080);

pub struct NullDriverFactory {
    ident: &'static str,
    desktop: (u32, u32),
}

impl NullDriverFactory {
    pub fn new() -> Self {
        Self::named("null")
    }

    /// Same behaviour under another name
    pub fn named(ident: &'static str) -> Self {
        Self {
            ident,
            desktop: NULL_DESKTOP_SIZE,
        }
    }

    pub fn with_desktop_size(mut self, width: u32, height: u32) -> Self {
        self.desktop = (width, height);
        self
    }
}

impl Default for NullDriverFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl DriverFactory for NullDriverFactory {
    fn ident(&self) -> &'static str {
        self.ident
    }

    fn init(&self, ctx: &mut InitContext<'_>) -> Result<Box<dyn VideoDriver>, VideoError> {
        let (width, height) = if ctx.mode.wants_desktop_size() {
            self.desktop
        } else {
            (ctx.mode.width, ctx.mode.height)
        };
        Ok(Box::new(NullDriver {
            ident: self.ident,
            viewport: Viewport::full(width, height),
            nonblock: !ctx.mode.vsync,
            rotation: Rotation::Deg0,
        }))
    }
}

pub struct NullDriver {
    ident: &'static str,
    viewport: Viewport,
    nonblock: bool,
    rotation: Rotation,
}

impl NullDriver {
    pub fn is_nonblock(&self) -> bool {
        self.nonblock
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }
}

impl VideoDriver for NullDriver {
    fn ident(&self) -> &'static str {
        self.ident
    }

    fn frame(&mut self, _frame: &FrameSubmission<'_>, _info: &FrameInfo) -> bool {
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

    fn suppress_screensaver(&mut self, _enable: bool) -> bool {
        false
    }

    fn has_windowed(&self) -> bool {
        true
    }

    fn set_viewport(
        &mut self,
        _width: u32,
        _height: u32,
        _force_full: bool,
        _allow_rotate: bool,
        viewport: &Viewport,
    ) {
        self.viewport = *viewport;
    }

    fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = rotation;
    }

    fn viewport_info(&self) -> Viewport {
        self.viewport
    }
}
