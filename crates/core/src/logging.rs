//! Centralized logging for the video output layer.
//!
//! Per-frame code paths must never pay for formatting when logging is off,
//! so every message goes through [`log`] with a lazily evaluated closure.
//!
//! # Architecture
//!
//! - **LogConfig**: process-wide configuration held in atomics
//! - **LogLevel**: Off < Error < Warn < Info < Debug < Trace
//! - **LogCategory**: Driver, Frame, Viewport, HwContext, Poke, Monitor
//! - **log()**: single entry point, rate limited per category
//!
//! Messages go to stderr unless a log file is configured, in which case a
//! background thread performs the file I/O so the frame loop never blocks
//! on disk.
//!
//! # Usage
//!
//! ```rust
//! use video_core::logging::{log, LogCategory, LogLevel};
//!
//! log(LogCategory::Driver, LogLevel::Info, || {
//!     format!("video driver \"{}\" initialized", "soft")
//! });
//! ```

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Sender};
use std::sync::{Mutex, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

/// Log level for controlling verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    /// Parse log level from string (case-insensitive)
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "off" | "0" => Some(LogLevel::Off),
            "error" | "err" | "1" => Some(LogLevel::Error),
            "warn" | "warning" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    fn from_u8(val: u8) -> Self {
        match val {
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            5 => LogLevel::Trace,
            _ => LogLevel::Off,
        }
    }
}

/// Log category for the parts of the video layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// Driver selection, init and teardown
    Driver,
    /// Per-frame dispatch and the frame cache
    Frame,
    /// Viewport and aspect ratio computation
    Viewport,
    /// Hardware render context negotiation
    HwContext,
    /// Optional poke/overlay interface calls
    Poke,
    /// Frame timing and refresh-rate statistics
    Monitor,
}

const CATEGORY_COUNT: usize = 6;

impl LogCategory {
    pub const ALL: [LogCategory; CATEGORY_COUNT] = [
        LogCategory::Driver,
        LogCategory::Frame,
        LogCategory::Viewport,
        LogCategory::HwContext,
        LogCategory::Poke,
        LogCategory::Monitor,
    ];

    fn index(self) -> usize {
        match self {
            LogCategory::Driver => 0,
            LogCategory::Frame => 1,
            LogCategory::Viewport => 2,
            LogCategory::HwContext => 3,
            LogCategory::Poke => 4,
            LogCategory::Monitor => 5,
        }
    }

    /// Parse a category name as used on the command line
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "driver" => Some(LogCategory::Driver),
            "frame" => Some(LogCategory::Frame),
            "viewport" => Some(LogCategory::Viewport),
            "hw" | "hwcontext" | "hw_context" => Some(LogCategory::HwContext),
            "poke" => Some(LogCategory::Poke),
            "monitor" => Some(LogCategory::Monitor),
            _ => None,
        }
    }
}

/// Sliding-window rate limiter, one window per category.
struct RateLimiter {
    max_logs_per_second: AtomicUsize,
    window_duration: Duration,
    state: Mutex<[WindowState; CATEGORY_COUNT]>,
}

#[derive(Default)]
struct WindowState {
    timestamps: VecDeque<Instant>,
    dropped: usize,
    last_drop_report: Option<Instant>,
}

impl RateLimiter {
    fn new(max_logs_per_second: usize) -> Self {
        Self {
            max_logs_per_second: AtomicUsize::new(max_logs_per_second),
            window_duration: Duration::from_secs(1),
            state: Mutex::new(Default::default()),
        }
    }

    fn set_max_logs_per_second(&self, max: usize) {
        self.max_logs_per_second.store(max, Ordering::Relaxed);
    }

    fn get_max_logs_per_second(&self) -> usize {
        self.max_logs_per_second.load(Ordering::Relaxed)
    }

    /// Returns (allowed, dropped_count) where dropped_count is Some(n) if
    /// the caller should report drops
    fn should_allow(&self, category: LogCategory) -> (bool, Option<usize>) {
        let now = Instant::now();
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let window = &mut state[category.index()];

        while let Some(&front) = window.timestamps.front() {
            if now.duration_since(front) > self.window_duration {
                window.timestamps.pop_front();
            } else {
                break;
            }
        }

        if window.timestamps.len() < self.get_max_logs_per_second() {
            window.timestamps.push_back(now);
            if window.dropped > 0 {
                let dropped = std::mem::take(&mut window.dropped);
                window.last_drop_report = Some(now);
                return (true, Some(dropped));
            }
            return (true, None);
        }

        window.dropped += 1;
        let should_report = match window.last_drop_report {
            None => true,
            Some(last) => now.duration_since(last) >= Duration::from_secs(1),
        };
        if should_report {
            let dropped = std::mem::take(&mut window.dropped);
            window.last_drop_report = Some(now);
            (false, Some(dropped))
        } else {
            (false, None)
        }
    }
}

/// Global logging configuration
pub struct LogConfig {
    global_level: AtomicU8,
    category_levels: [AtomicU8; CATEGORY_COUNT],
    log_sender: Mutex<Option<Sender<String>>>,
    file_logging_enabled: AtomicBool,
    rate_limiter: RateLimiter,
}

impl LogConfig {
    /// All logging disabled, 60 logs/second per category
    fn new() -> Self {
        Self {
            global_level: AtomicU8::new(LogLevel::Off as u8),
            category_levels: Default::default(),
            log_sender: Mutex::new(None),
            file_logging_enabled: AtomicBool::new(false),
            rate_limiter: RateLimiter::new(60),
        }
    }

    /// Get the global singleton instance
    pub fn global() -> &'static Self {
        static INSTANCE: OnceLock<LogConfig> = OnceLock::new();
        INSTANCE.get_or_init(LogConfig::new)
    }

    pub fn set_global_level(&self, level: LogLevel) {
        self.global_level.store(level as u8, Ordering::Relaxed);
    }

    pub fn get_global_level(&self) -> LogLevel {
        LogLevel::from_u8(self.global_level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, category: LogCategory, level: LogLevel) {
        self.category_levels[category.index()].store(level as u8, Ordering::Relaxed);
    }

    pub fn get_level(&self, category: LogCategory) -> LogLevel {
        LogLevel::from_u8(self.category_levels[category.index()].load(Ordering::Relaxed))
    }

    /// A category-specific level wins over the global level unless it is Off
    pub fn should_log(&self, category: LogCategory, level: LogLevel) -> bool {
        if level == LogLevel::Off {
            return false;
        }
        let category_level = self.get_level(category);
        if category_level != LogLevel::Off {
            level <= category_level
        } else {
            level <= self.get_global_level()
        }
    }

    /// Reset all logging to Off
    pub fn reset(&self) {
        self.set_global_level(LogLevel::Off);
        for category in LogCategory::ALL {
            self.set_level(category, LogLevel::Off);
        }
    }

    pub fn set_rate_limit(&self, max_logs_per_second: usize) {
        self.rate_limiter
            .set_max_logs_per_second(max_logs_per_second);
    }

    pub fn get_rate_limit(&self) -> usize {
        self.rate_limiter.get_max_logs_per_second()
    }

    /// Route log output to a file through a background writer thread.
    ///
    /// Replaces any writer that is already running.
    pub fn set_log_file(&self, path: PathBuf) -> std::io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let (sender, receiver) = channel::<String>();

        thread::Builder::new()
            .name("video-log-writer".to_string())
            .spawn(move || {
                let mut file = file;
                while let Ok(message) = receiver.recv() {
                    let _ = writeln!(file, "{}", message);
                    let _ = file.flush();
                }
                let _ = file.flush();
            })?;

        if let Ok(mut log_sender) = self.log_sender.lock() {
            *log_sender = Some(sender);
        }
        self.file_logging_enabled.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Stop logging to file; the writer thread exits once the sender drops
    pub fn clear_log_file(&self) {
        if let Ok(mut log_sender) = self.log_sender.lock() {
            *log_sender = None;
        }
        self.file_logging_enabled.store(false, Ordering::Relaxed);
    }

    fn write_message(&self, message: &str) {
        if self.file_logging_enabled.load(Ordering::Relaxed) {
            if let Ok(log_sender) = self.log_sender.lock() {
                if let Some(sender) = log_sender.as_ref() {
                    if sender.send(message.to_string()).is_ok() {
                        return;
                    }
                }
            }
        }
        eprintln!("{}", message);
    }
}

/// Log a message with the specified category and level.
///
/// The closure only runs when the category/level is enabled and the
/// category is under its rate limit. When messages were dropped, a summary
/// line is emitted at most once per second.
pub fn log<F>(category: LogCategory, level: LogLevel, message_fn: F)
where
    F: FnOnce() -> String,
{
    let config = LogConfig::global();
    if !config.should_log(category, level) {
        return;
    }

    let (allowed, dropped_count) = config.rate_limiter.should_allow(category);
    if let Some(count) = dropped_count {
        if count > 0 {
            config.write_message(&format!(
                "[{:?}] WARNING: Rate limit exceeded, {} log message(s) dropped in the last second",
                category, count
            ));
        }
    }

    if allowed {
        let message = message_fn();
        config.write_message(&format!("[{:?}] {:?}: {}", category, level, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("off"), Some(LogLevel::Off));
        assert_eq!(LogLevel::from_str("ERR"), Some(LogLevel::Error));
        assert_eq!(LogLevel::from_str("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str("3"), Some(LogLevel::Info));
        assert_eq!(LogLevel::from_str("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_str("trace"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::from_str("loud"), None);
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!(LogCategory::from_str("Driver"), Some(LogCategory::Driver));
        assert_eq!(LogCategory::from_str("hw"), Some(LogCategory::HwContext));
        assert_eq!(LogCategory::from_str("monitor"), Some(LogCategory::Monitor));
        assert_eq!(LogCategory::from_str("cpu"), None);
    }

    #[test]
    fn test_category_level_overrides_global() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Error);
        config.set_level(LogCategory::Frame, LogLevel::Debug);

        assert!(config.should_log(LogCategory::Frame, LogLevel::Debug));
        assert!(!config.should_log(LogCategory::Frame, LogLevel::Trace));
        assert!(!config.should_log(LogCategory::Driver, LogLevel::Warn));
        assert!(config.should_log(LogCategory::Driver, LogLevel::Error));
    }

    #[test]
    fn test_off_messages_never_log() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Trace);
        assert!(!config.should_log(LogCategory::Driver, LogLevel::Off));
    }

    #[test]
    fn test_reset() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Trace);
        config.set_level(LogCategory::Viewport, LogLevel::Info);
        config.reset();

        assert_eq!(config.get_global_level(), LogLevel::Off);
        for category in LogCategory::ALL {
            assert_eq!(config.get_level(category), LogLevel::Off);
        }
    }

    #[test]
    fn test_rate_limiter_per_category() {
        let limiter = RateLimiter::new(10);
        for _ in 0..10 {
            assert!(limiter.should_allow(LogCategory::Frame).0);
        }
        assert!(!limiter.should_allow(LogCategory::Frame).0);
        assert!(limiter.should_allow(LogCategory::Driver).0);
    }

    #[test]
    fn test_rate_limiter_reports_dropped_count() {
        let limiter = RateLimiter::new(3);
        for _ in 0..3 {
            limiter.should_allow(LogCategory::Frame);
        }
        // First drop is reported immediately, the rest accumulate
        let (allowed, dropped) = limiter.should_allow(LogCategory::Frame);
        assert!(!allowed);
        assert_eq!(dropped, Some(1));
        for _ in 0..4 {
            let (allowed, dropped) = limiter.should_allow(LogCategory::Frame);
            assert!(!allowed);
            assert_eq!(dropped, None);
        }

        std::thread::sleep(Duration::from_millis(1100));
        let (allowed, dropped) = limiter.should_allow(LogCategory::Frame);
        assert!(allowed);
        assert_eq!(dropped, Some(4));
    }
}
