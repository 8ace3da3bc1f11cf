//! Video output abstraction: a catalog of display backends, a facade that
//! routes frames and queries to whichever one is active, and the viewport
//! and aspect logic shared by all of them.

pub mod aspect;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod hw_context;
pub mod logging;
pub mod monitor;
pub mod null;
pub mod types;
pub mod viewport;

pub use aspect::{AspectRatio, AspectRatioTable};
pub use cache::FrameCache;
pub use catalog::DriverCatalog;
pub use config::VideoConfig;
pub use context::{VideoContext, VideoStatus};
pub use driver::{
    DriverCapabilities, DriverFactory, InitContext, InputDriver, Overlayable, Pokeable,
    RawFrameReader, ShaderLoader, VideoDriver, ViewportReader,
};
pub use error::VideoError;
pub use hw_context::{HwContext, HwContextPhase, HwRenderCallback};
pub use types::{
    DisplayModeRequest, FrameData, FrameInfo, FrameStatus, FrameSubmission, PixelFormat, Rotation,
};
pub use viewport::{SystemAvInfo, Viewport};
