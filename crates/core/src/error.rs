//! Error types for the video layer.
//!
//! Only conditions the caller has to act on are errors. A missing optional
//! capability is not one: the facade degrades to a default instead. A
//! failed frame is not one either; it comes back as
//! [`FrameStatus::Failed`](crate::FrameStatus) and the caller simply carries
//! on with the next frame.

use thiserror::Error;

use crate::hw_context::HwContextError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VideoError {
    /// One backend could not be brought up; the facade moves on to the next.
    #[error("video driver \"{ident}\" failed to initialize: {reason}")]
    DriverInitFailed { ident: &'static str, reason: String },

    /// Every catalog entry failed. There is no renderable output.
    #[error("no usable video driver (tried: {tried})")]
    NoDriverAvailable { tried: String },

    #[error("no video driver is active")]
    NoActiveDriver,

    #[error("frame buffer of {len} bytes is too small for {width}x{height} with pitch {pitch}")]
    InvalidFrame {
        len: usize,
        width: u32,
        height: u32,
        pitch: usize,
    },

    #[error(transparent)]
    HwContext(#[from] HwContextError),
}

impl VideoError {
    /// Shorthand used by backends when refusing a mode request
    pub fn init_failed(ident: &'static str, reason: impl Into<String>) -> Self {
        VideoError::DriverInitFailed {
            ident,
            reason: reason.into(),
        }
    }
}
