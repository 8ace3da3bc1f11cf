//! Frame pacing measurements.

use std::time::Instant;

use crate::logging::{log, LogCategory, LogLevel};

pub const FRAME_TIME_SAMPLES: usize = 2048;
/// The FPS text is refreshed once per this many frames
pub const FPS_UPDATE_INTERVAL: u64 = 256;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FpsStatistics {
    /// Measured refresh rate in Hz
    pub refresh_rate: f64,
    /// Standard deviation of the frame time relative to its mean
    pub deviation: f64,
    pub sample_points: usize,
}

#[derive(Debug, Clone)]
pub struct FrameMonitor {
    samples: Vec<u64>,
    sample_count: u64,
    last_frame: Option<Instant>,
    fps_window_start: Option<Instant>,
    frames_seen: u64,
    refresh_rate: f32,
    last_fps: f32,
    fps_text: String,
}

impl FrameMonitor {
    pub fn new(refresh_rate: f32) -> Self {
        Self {
            samples: vec![0; FRAME_TIME_SAMPLES],
            sample_count: 0,
            last_frame: None,
            fps_window_start: None,
            frames_seen: 0,
            refresh_rate,
            last_fps: 0.0,
            fps_text: String::new(),
        }
    }

    pub fn reset(&mut self) {
        self.sample_count = 0;
        self.last_frame = None;
        self.fps_window_start = None;
        self.frames_seen = 0;
        self.last_fps = 0.0;
        self.fps_text.clear();
    }

    pub fn refresh_rate(&self) -> f32 {
        self.refresh_rate
    }

    pub fn set_refresh_rate(&mut self, hz: f32) {
        log(LogCategory::Monitor, LogLevel::Info, || {
            format!("monitor refresh rate set to {:.3} Hz", hz)
        });
        self.refresh_rate = hz;
    }

    /// Store one frame time in microseconds
    pub fn record_frame_time(&mut self, usec: u64) {
        let slot = (self.sample_count % FRAME_TIME_SAMPLES as u64) as usize;
        self.samples[slot] = usec;
        self.sample_count += 1;
    }

    /// Account for one presented frame at `now`. `frame_count` is the
    /// facade's counter and only used for the FPS text.
    pub fn tick(&mut self, now: Instant, frame_count: u64) {
        if let Some(last) = self.last_frame {
            let usec = now.duration_since(last).as_micros() as u64;
            self.record_frame_time(usec);
        }
        self.last_frame = Some(now);

        self.frames_seen += 1;
        let window_start = *self.fps_window_start.get_or_insert(now);
        if self.frames_seen % FPS_UPDATE_INTERVAL == 0 {
            let elapsed = now.duration_since(window_start).as_secs_f32();
            if elapsed > 0.0 {
                self.last_fps = FPS_UPDATE_INTERVAL as f32 / elapsed;
            }
            self.fps_window_start = Some(now);
            self.fps_text = format!("FPS: {:6.1} || Frames: {}", self.last_fps, frame_count);
        }
    }

    pub fn last_fps(&self) -> f32 {
        self.last_fps
    }

    pub fn fps_text(&self) -> &str {
        &self.fps_text
    }

    /// Refresh-rate estimate from the recorded frame times.
    ///
    /// Threaded backends decouple submission from display, so their frame
    /// times say nothing about the monitor; they get `None`, as does a run
    /// with fewer than two samples.
    pub fn fps_statistics(&self, threaded: bool) -> Option<FpsStatistics> {
        if threaded {
            return None;
        }
        let samples = (self.sample_count as usize).min(FRAME_TIME_SAMPLES);
        if samples < 2 {
            return None;
        }

        let window = &self.samples[..samples];
        let avg = window.iter().map(|&s| s as f64).sum::<f64>() / samples as f64;
        if avg <= 0.0 {
            return None;
        }
        let variance = window
            .iter()
            .map(|&s| {
                let diff = s as f64 - avg;
                diff * diff
            })
            .sum::<f64>()
            / (samples - 1) as f64;

        Some(FpsStatistics {
            refresh_rate: 1_000_000.0 / avg,
            deviation: variance.sqrt() / avg,
            sample_points: samples,
        })
    }
}

impl Default for FrameMonitor {
    fn default() -> Self {
        Self::new(59.94)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_statistics_need_two_samples() {
        let mut monitor = FrameMonitor::default();
        assert!(monitor.fps_statistics(false).is_none());
        monitor.record_frame_time(16_667);
        assert!(monitor.fps_statistics(false).is_none());
        monitor.record_frame_time(16_667);
        let stats = monitor.fps_statistics(false).expect("two samples");
        assert_eq!(stats.sample_points, 2);
        assert!((stats.refresh_rate - 59.999).abs() < 0.01);
        assert_eq!(stats.deviation, 0.0);
    }

    #[test]
    fn test_statistics_disabled_when_threaded() {
        let mut monitor = FrameMonitor::default();
        for _ in 0..10 {
            monitor.record_frame_time(16_000);
        }
        assert!(monitor.fps_statistics(true).is_none());
    }

    #[test]
    fn test_ring_buffer_caps_sample_points() {
        let mut monitor = FrameMonitor::default();
        for i in 0..(FRAME_TIME_SAMPLES as u64 + 100) {
            monitor.record_frame_time(16_000 + (i % 2) * 1000);
        }
        let stats = monitor.fps_statistics(false).expect("samples");
        assert_eq!(stats.sample_points, FRAME_TIME_SAMPLES);
        assert!(stats.deviation > 0.0);
    }

    #[test]
    fn test_fps_text_updates_every_interval() {
        let mut monitor = FrameMonitor::default();
        let start = Instant::now();
        for i in 0..FPS_UPDATE_INTERVAL {
            monitor.tick(start + Duration::from_millis(10 * i), i);
        }
        assert!(monitor.fps_text().starts_with("FPS:"));
        assert!(monitor.fps_text().ends_with("Frames: 255"));
        assert!(monitor.last_fps() > 99.0 && monitor.last_fps() < 102.0);

        monitor.reset();
        assert!(monitor.fps_text().is_empty());
        assert!(monitor.fps_statistics(false).is_none());
    }
}
