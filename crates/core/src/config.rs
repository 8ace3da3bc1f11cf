//! Display preferences handed to the video layer.
//!
//! Where the file lives is the frontend's business; this module defines the
//! shape, the defaults and the JSON form.

use serde::{Deserialize, Serialize};

use crate::aspect::AspectRatio;
use crate::viewport::Viewport;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Preferred driver ident; the rest of the catalog is tried after it
    pub driver: String,
    pub fullscreen: bool,
    /// Fullscreen size, 0 means desktop resolution
    pub fullscreen_width: u32,
    pub fullscreen_height: u32,
    pub windowed_fullscreen: bool,
    /// Window size as a multiple of the core's base size
    pub window_scale: f32,
    pub vsync: bool,
    pub swap_interval: u32,
    pub smooth: bool,
    pub force_aspect: bool,
    pub scale_integer: bool,
    pub aspect_ratio_idx: AspectRatio,
    /// Ratio for the `Config` policy; negative derives it from the core
    pub aspect_ratio: f32,
    /// Prefer the core-reported ratio when deriving the `Config` value
    pub aspect_ratio_auto: bool,
    pub custom_viewport: Viewport,
    /// Rotation index applied on top of whatever the core asks for
    pub rotation: u32,
    pub refresh_rate: f32,
    pub font_enable: bool,
    pub fps_show: bool,
    pub gpu_record: bool,
    pub hard_sync: bool,
    pub hard_sync_frames: u32,
    pub black_frame_insertion: bool,
    pub max_swapchain_images: u32,
    pub monitor_index: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            driver: "soft".to_string(),
            fullscreen: false,
            fullscreen_width: 0,
            fullscreen_height: 0,
            windowed_fullscreen: true,
            window_scale: 3.0,
            vsync: true,
            swap_interval: 1,
            smooth: false,
            force_aspect: true,
            scale_integer: false,
            aspect_ratio_idx: AspectRatio::Core,
            aspect_ratio: -1.0,
            aspect_ratio_auto: false,
            custom_viewport: Viewport::default(),
            rotation: 0,
            refresh_rate: 59.94,
            font_enable: true,
            fps_show: false,
            gpu_record: false,
            hard_sync: false,
            hard_sync_frames: 0,
            black_frame_insertion: false,
            max_swapchain_images: 3,
            monitor_index: 0,
        }
    }
}

impl VideoConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let config =
            VideoConfig::from_json(r#"{ "driver": "null", "scale_integer": true }"#).expect("parse");
        assert_eq!(config.driver, "null");
        assert!(config.scale_integer);
        assert_eq!(config.aspect_ratio_idx, AspectRatio::Core);
        assert!(config.vsync);
    }

    #[test]
    fn test_aspect_policy_serializes_by_name() {
        let config = VideoConfig {
            aspect_ratio_idx: AspectRatio::SquarePixel,
            ..Default::default()
        };
        let json = config.to_json().expect("serialize");
        assert!(json.contains("\"SquarePixel\""));
    }
}
