mod pattern;
mod screenshot;
mod settings;

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use video_core::logging::{LogConfig, LogLevel};
use video_core::null::NullDriverFactory;
use video_core::types::ShaderType;
use video_core::viewport::{GameGeometry, SystemTiming};
use video_core::{
    AspectRatio, DriverCatalog, FrameData, FrameInfo, FrameStatus, PixelFormat, SystemAvInfo,
    VideoContext,
};
use video_soft::SoftDriverFactory;

use crate::pattern::TestPattern;
use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "vidout", about = "Drive the video layer headlessly with a test pattern")]
struct Args {
    /// Video driver to try first (see --list-drivers)
    #[arg(long)]
    driver: Option<String>,

    /// Print the available video drivers and exit
    #[arg(long, default_value_t = false)]
    list_drivers: bool,

    /// Number of frames to submit
    #[arg(long, default_value_t = 300)]
    frames: u64,

    /// Width of the submitted frames
    #[arg(long, default_value_t = 320)]
    width: u32,

    /// Height of the submitted frames
    #[arg(long, default_value_t = 240)]
    height: u32,

    /// Pixel format: "xrgb8888", "rgb565" or "rgb1555"
    #[arg(long, default_value = "xrgb8888")]
    format: String,

    /// Aspect ratio policy index (0 = 4:3 ... 22 = core, 24 = full)
    #[arg(long)]
    aspect: Option<usize>,

    /// Snap the picture to whole multiples of the frame size
    #[arg(long, default_value_t = false)]
    scale_integer: bool,

    /// Use the desktop resolution
    #[arg(long, default_value_t = false)]
    fullscreen: bool,

    /// Window size as a multiple of the frame size
    #[arg(long)]
    window_scale: Option<f32>,

    /// Rotation in quarter turns, counter-clockwise
    #[arg(long, default_value_t = 0)]
    rotation: u32,

    /// Filter preset to load (scanlines, phosphor, crt-monitor)
    #[arg(long)]
    shader: Option<PathBuf>,

    /// Redraw the cached frame instead of submitting a new one every N frames
    #[arg(long, default_value_t = 0)]
    dupe_every: u64,

    /// Message shown with the first frame
    #[arg(long)]
    message: Option<String>,

    /// Write the final viewport to this PNG file
    #[arg(long)]
    screenshot: Option<String>,

    /// Level for the video layer's logger; overrides config.json
    #[arg(long)]
    log_level: Option<String>,

    /// Send the video layer's log lines to a file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Write the effective settings back to config.json
    #[arg(long, default_value_t = false)]
    save_config: bool,
}

fn parse_format(name: &str) -> Result<PixelFormat> {
    match name.to_ascii_lowercase().as_str() {
        "xrgb8888" | "argb8888" => Ok(PixelFormat::Xrgb8888),
        "rgb565" => Ok(PixelFormat::Rgb565),
        "rgb1555" | "0rgb1555" => Ok(PixelFormat::Rgb1555),
        other => bail!("Unsupported pixel format: {}", other),
    }
}

fn build_catalog() -> DriverCatalog {
    DriverCatalog::new(vec![
        Box::new(SoftDriverFactory::new()),
        Box::new(NullDriverFactory::new()),
    ])
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut settings = Settings::load();
    let level_name = args.log_level.as_deref().unwrap_or(&settings.log_level);
    match LogLevel::from_str(level_name) {
        Some(level) => LogConfig::global().set_global_level(level),
        None => log::warn!("Unknown log level \"{}\", keeping the default", level_name),
    }
    if let Some(path) = &args.log_file {
        LogConfig::global().set_log_file(path.clone())?;
    }

    let catalog = build_catalog();
    if args.list_drivers {
        for (index, factory) in catalog.iter().enumerate() {
            println!("{}: {}", index, factory.ident());
        }
        return Ok(());
    }

    if let Some(driver) = &args.driver {
        settings.video.driver = driver.clone();
    }
    if let Some(index) = args.aspect {
        match AspectRatio::from_index(index) {
            Some(policy) => settings.video.aspect_ratio_idx = policy,
            None => bail!("Aspect ratio index {} is out of range", index),
        }
    }
    if let Some(scale) = args.window_scale {
        settings.video.window_scale = scale;
    }
    settings.video.scale_integer |= args.scale_integer;
    settings.video.fullscreen |= args.fullscreen;
    if args.width == 0 || args.height == 0 {
        bail!("Frame size must be non-zero, got {}x{}", args.width, args.height);
    }
    let format = parse_format(&args.format)?;

    let mut video = VideoContext::new(catalog, settings.video.clone());
    video.set_pixel_format(format);
    video.set_system_av_info(SystemAvInfo {
        geometry: GameGeometry {
            base_width: args.width,
            base_height: args.height,
            max_width: args.width,
            max_height: args.height,
            aspect_ratio: 0.0,
        },
        timing: SystemTiming::default(),
    });

    let mode = video.build_mode_request();
    log::info!(
        "Requesting {}x{} (fullscreen: {}, input scale {})",
        mode.width,
        mode.height,
        mode.fullscreen,
        mode.input_scale
    );
    video.init(&mode)?;
    video.set_rotation(args.rotation);
    println!(
        "Driver \"{}\" active, surface {}x{}",
        video.get_ident().unwrap_or("none"),
        video.get_size().0,
        video.get_size().1
    );

    if let Some(path) = &args.shader {
        if !video.set_shader(ShaderType::Glsl, Some(path)) {
            log::warn!("Driver could not load shader {}", path.display());
        }
    }

    let mut pattern = TestPattern::new(args.width, args.height, format);
    log::info!(
        "Frames are {}x{} {:?}, pitch {} (alignment {})",
        pattern.width(),
        pattern.height(),
        format,
        pattern.pitch(),
        pattern.alignment()
    );

    let mut info = FrameInfo {
        libretro_running: true,
        ..Default::default()
    };
    let mut failed = 0u64;
    for frame in 0..args.frames {
        if !video.is_alive() {
            log::info!("Window closed after {} frames", frame);
            break;
        }
        if let Some(input) = video.input_driver() {
            input.poll();
        }

        let status = if args.dupe_every > 0 && frame > 0 && frame % args.dupe_every == 0 {
            video.cached_frame(&mut info)
        } else {
            let msg = if frame == 0 { args.message.as_deref() } else { None };
            let pitch = pattern.pitch();
            let (width, height) = (pattern.width(), pattern.height());
            let data = pattern.render(frame);
            video.frame(FrameData::Cpu(data), width, height, pitch, msg, &mut info)
        };
        if status == FrameStatus::Failed {
            failed += 1;
        }
    }

    println!(
        "Submitted {} frames, {} presented with new data, {} failed",
        args.frames,
        video.get_frame_count(),
        failed
    );
    if !video.monitor().fps_text().is_empty() {
        println!("{}", video.monitor().fps_text());
    }
    match video.fps_statistics() {
        Some(stats) => println!(
            "Measured {:.3} Hz, deviation {:.2} % over {} samples",
            stats.refresh_rate,
            stats.deviation * 100.0,
            stats.sample_points
        ),
        None => println!("Not enough frames for refresh-rate statistics"),
    }

    if let Some(name) = &args.screenshot {
        let path = settings.screenshot_path(name);
        match video.capture_viewport(false)? {
            Some((vp, bgr)) => {
                screenshot::write_png(&path, vp.width, vp.height, &bgr)?;
                println!("Screenshot {}x{} written to {}", vp.width, vp.height, path.display());
            }
            None => log::warn!("Driver cannot read back the viewport, no screenshot taken"),
        }
    }

    if args.save_config {
        settings.video = video.config().clone();
        if let Err(e) = settings.save() {
            bail!("Failed to save settings: {}", e);
        }
    }

    video.destroy();
    LogConfig::global().clear_log_file();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!(parse_format("XRGB8888").unwrap(), PixelFormat::Xrgb8888);
        assert_eq!(parse_format("rgb565").unwrap(), PixelFormat::Rgb565);
        assert!(parse_format("yuv420").is_err());
    }

    #[test]
    fn test_catalog_lists_soft_first() {
        assert_eq!(build_catalog().options(), "soft|null");
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from([
            "vidout",
            "--driver",
            "null",
            "--frames",
            "10",
            "--aspect",
            "22",
            "--scale-integer",
        ]);
        assert_eq!(args.driver.as_deref(), Some("null"));
        assert_eq!(args.frames, 10);
        assert_eq!(args.aspect, Some(22));
        assert!(args.scale_integer);
        assert_eq!(args.format, "xrgb8888");
    }
}
