use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use video_core::VideoConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub video: VideoConfig,
    /// Directory screenshots go to when only a file name is given
    #[serde(default)]
    pub screenshot_dir: Option<String>,
    /// Level for the video layer's own logger ("off" .. "trace")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            video: VideoConfig::default(),
            screenshot_dir: None,
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Get the config file path relative to the executable
    pub fn config_path() -> PathBuf {
        let mut path = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));
        path.push("config.json");
        path
    }

    /// Load settings from config.json, falling back to defaults on error
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!(
                        "Failed to parse {}: {}. Using defaults.",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            // File doesn't exist or can't be read
            Err(_) => Self::default(),
        }
    }

    /// Save settings to config.json immediately
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Where a screenshot named `name` should be written
    pub fn screenshot_path(&self, name: &str) -> PathBuf {
        let name = Path::new(name);
        match &self.screenshot_dir {
            Some(dir) if name.parent().map_or(true, |p| p.as_os_str().is_empty()) => {
                Path::new(dir).join(name)
            }
            _ => name.to_path_buf(),
        }
    }
}
