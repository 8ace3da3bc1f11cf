//! Logging through the video facade with the soft backend.
//!
//! The log configuration is process-global, so everything that touches the
//! log file lives in a single test.

use std::fs;
use std::thread;
use std::time::{Duration, Instant};

use video_core::logging::{LogCategory, LogConfig, LogLevel};
use video_core::null::NullDriverFactory;
use video_core::{DisplayModeRequest, DriverCatalog, VideoConfig, VideoContext};
use video_soft::SoftDriverFactory;

fn wait_for_lines(path: &std::path::Path, needles: &[&str]) -> String {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        let text = fs::read_to_string(path).unwrap_or_default();
        if needles.iter().all(|n| text.contains(n)) || Instant::now() > deadline {
            return text;
        }
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn test_driver_lifecycle_is_logged_to_file() {
    let path = std::env::temp_dir().join(format!("vidout-log-{}.txt", std::process::id()));
    let _ = fs::remove_file(&path);

    let config = LogConfig::global();
    config.set_level(LogCategory::Driver, LogLevel::Info);
    config.set_log_file(path.clone()).expect("log file opens");

    let mut video = VideoContext::new(
        DriverCatalog::new(vec![
            Box::new(SoftDriverFactory::new()),
            Box::new(NullDriverFactory::new()),
        ]),
        VideoConfig {
            driver: "vulkan".to_string(),
            ..Default::default()
        },
    );
    video
        .init(&DisplayModeRequest {
            width: 640,
            height: 480,
            ..Default::default()
        })
        .expect("soft comes up");
    video.destroy();

    let text = wait_for_lines(
        &path,
        &["couldn't find video driver \"vulkan\"", "\"soft\" active", "\"soft\" freed"],
    );
    config.clear_log_file();
    config.reset();
    let _ = fs::remove_file(&path);

    assert!(text.contains("[Driver] Warn: couldn't find video driver \"vulkan\", available: soft|null"));
    assert!(text.contains("video driver \"soft\" active at 640x480"));
    assert!(text.contains("video driver \"soft\" freed"));
}

#[test]
fn test_disabled_categories_stay_quiet() {
    let config = LogConfig::global();
    assert!(!config.should_log(LogCategory::Poke, LogLevel::Trace));
    assert!(!config.should_log(LogCategory::Monitor, LogLevel::Off));
}
