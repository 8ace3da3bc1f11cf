use std::path::Path;

use video_core::driver::Overlayable;
use video_core::hw_context::{HwContextType, HwRenderCallback};
use video_core::null::NullDriverFactory;
use video_core::types::{OsdParams, ShaderType, TextureFilter, TextureImage};
use video_core::viewport::GameGeometry;
use video_core::{
    AspectRatio, DisplayModeRequest, DriverCatalog, FrameData, FrameInfo, FrameStatus,
    PixelFormat, SystemAvInfo, VideoConfig, VideoContext,
};
use video_soft::{SoftDriverFactory, SOFT_DESKTOP_SIZE};

fn soft_context(config: VideoConfig) -> VideoContext {
    let mut video = VideoContext::new(
        DriverCatalog::new(vec![
            Box::new(SoftDriverFactory::new()),
            Box::new(NullDriverFactory::new()),
        ]),
        config,
    );
    video.set_pixel_format(PixelFormat::Xrgb8888);
    video.set_system_av_info(SystemAvInfo {
        geometry: GameGeometry {
            base_width: 320,
            base_height: 240,
            max_width: 320,
            max_height: 240,
            aspect_ratio: 4.0 / 3.0,
        },
        ..Default::default()
    });
    video
}

fn mode(width: u32, height: u32) -> DisplayModeRequest {
    DisplayModeRequest {
        width,
        height,
        input_scale: 2,
        rgb32: true,
        ..Default::default()
    }
}

/// Solid XRGB8888 picture with padded rows
fn xrgb_frame(width: u32, height: u32, pitch: usize, color: u32) -> Vec<u8> {
    let mut data = vec![0xEE; pitch * height as usize];
    for row in data.chunks_mut(pitch) {
        for px in row[..width as usize * 4].chunks_exact_mut(4) {
            px.copy_from_slice(&color.to_ne_bytes());
        }
    }
    data
}

#[test]
fn test_letterboxed_frame_reaches_the_viewport() {
    let mut video = soft_context(VideoConfig::default());
    video.init(&mode(1280, 720)).expect("soft driver comes up");
    assert_eq!(video.get_ident(), Some("soft"));

    let data = xrgb_frame(320, 240, 1344, 0x0033_6699);
    let mut info = FrameInfo::default();
    assert_eq!(
        video.frame(FrameData::Cpu(&data), 320, 240, 1344, None, &mut info),
        FrameStatus::Presented
    );

    let (vp, bgr) = video
        .capture_viewport(false)
        .expect("driver active")
        .expect("soft reads back");
    assert_eq!((vp.x, vp.y, vp.width, vp.height), (160, 0, 960, 720));
    assert_eq!(info.viewport, vp);
    assert!(bgr.chunks_exact(3).all(|px| px == [0x99, 0x66, 0x33]));
}

#[test]
fn test_square_pixel_integer_scaling() {
    let mut video = soft_context(VideoConfig {
        scale_integer: true,
        aspect_ratio_idx: AspectRatio::SquarePixel,
        ..Default::default()
    });
    video.init(&mode(1280, 960)).unwrap();
    let vp = video.derived_viewport();
    assert_eq!((vp.x, vp.y, vp.width, vp.height), (0, 0, 1280, 960));

    assert!(video.set_viewport(1300, 1000, false, true));
    let vp = video.derived_viewport();
    assert_eq!((vp.width, vp.height), (1280, 960));
    assert_eq!((vp.x, vp.y), (10, 20));
}

#[test]
fn test_hw_context_request_falls_back_to_null() {
    let mut video = soft_context(VideoConfig::default());
    video.set_hw_render_callback(Some(HwRenderCallback {
        context_type: HwContextType::OpenGl,
        ..Default::default()
    }));
    video.init(&mode(640, 480)).unwrap();
    assert_eq!(video.get_ident(), Some("null"));
    assert!(video.input_driver().is_none());
}

#[test]
fn test_fullscreen_desktop_size() {
    let mut video = soft_context(VideoConfig::default());
    video
        .init(&DisplayModeRequest {
            width: 0,
            height: 0,
            fullscreen: true,
            ..mode(0, 0)
        })
        .unwrap();
    assert_eq!(video.get_ident(), Some("soft"));
    assert_eq!(video.get_size(), SOFT_DESKTOP_SIZE);
}

#[test]
fn test_input_driver_lives_with_the_video_driver() {
    let mut video = soft_context(VideoConfig::default());
    video.init(&mode(640, 480)).unwrap();
    let input = video.input_driver().expect("soft installs its input");
    assert_eq!(input.ident(), "soft_input");
    input.poll();

    video.free();
    assert!(video.input_driver().is_none());
}

#[test]
fn test_rotation_turns_the_viewport() {
    let mut video = soft_context(VideoConfig::default());
    video.init(&mode(1280, 720)).unwrap();
    assert!(video.set_rotation(1));
    let vp = video.derived_viewport();
    assert!(vp.width < vp.height);
    assert!(vp.contains_content());
}

#[test]
fn test_raw_frame_keeps_pitch() {
    let mut video = soft_context(VideoConfig::default());
    video.init(&mode(640, 480)).unwrap();
    assert!(video.read_frame_raw().is_none());

    let data = xrgb_frame(64, 32, 320, 0x0001_0203);
    let mut info = FrameInfo::default();
    video.frame(FrameData::Cpu(&data), 64, 32, 320, None, &mut info);

    let raw = video.read_frame_raw().expect("frame stored");
    assert_eq!((raw.width, raw.height, raw.pitch), (64, 32, 320));
    assert_eq!(raw.data, data);
}

#[test]
fn test_output_switch_is_noticed_on_next_frame() {
    let mut video = soft_context(VideoConfig::default());
    video.init(&mode(1280, 720)).unwrap();
    assert_eq!(video.get_video_output_size(), Some((1280, 720)));

    assert!(video.get_next_video_out());
    assert_eq!(video.get_video_output_size(), Some((1280, 960)));

    let data = xrgb_frame(320, 240, 1280, 0);
    let mut info = FrameInfo::default();
    video.frame(FrameData::Cpu(&data), 320, 240, 1280, None, &mut info);
    assert_eq!(video.get_size(), (1280, 960));
    // 4:3 content on a 4:3 surface fills it
    assert_eq!(info.viewport.width, 1280);
}

#[test]
fn test_poke_members_through_the_facade() {
    let mut video = soft_context(VideoConfig::default());
    video.init(&mode(640, 480)).unwrap();

    let caps = video.capabilities();
    assert!(caps.poke && caps.overlay && caps.viewport_read && caps.raw_frame_read && caps.shader);
    assert!(!caps.hw_render);

    let id = video
        .texture_load(&TextureImage::new(8, 8), TextureFilter::Nearest)
        .expect("texture");
    assert!(video.texture_unload(id));

    assert!(video.set_shader(ShaderType::Glsl, Some(Path::new("shaders/crt-monitor.glsl"))));
    let shader = video.get_current_shader().expect("shader loaded");
    assert_eq!(shader.path.as_deref(), Some(Path::new("shaders/crt-monitor.glsl")));

    video.set_osd_msg("Saved", &OsdParams::default());
    video.hide_mouse();
    video.grab_mouse_toggle();
    video.set_filtering(0, true);
    video.apply_state_changes();

    let fb = video
        .get_current_software_framebuffer(320, 240)
        .expect("software framebuffer");
    assert_eq!(fb.pitch, 1280);
    assert_eq!(fb.data.len(), 1280 * 240);

    // No GPU, nothing to hand out
    assert!(video.get_current_framebuffer().is_none());
    assert!(video.get_hw_render_interface().is_none());
}

#[test]
fn test_overlay_composited_over_picture() {
    let mut video = soft_context(VideoConfig {
        force_aspect: false,
        ..Default::default()
    });
    video.init(&mode(64, 64)).unwrap();
    {
        let overlay = video.overlay_interface().expect("soft has an overlay");
        let image = TextureImage {
            width: 1,
            height: 1,
            pixels: vec![0xFFFF_FFFF],
        };
        assert!(overlay.load(&[image]));
        overlay.vertex_geom(0, 0.0, 0.0, 0.5, 1.0);
        overlay.enable(true);
    }

    let data = xrgb_frame(16, 16, 64, 0);
    let mut info = FrameInfo::default();
    video.frame(FrameData::Cpu(&data), 16, 16, 64, None, &mut info);

    let (vp, bgr) = video.capture_viewport(false).unwrap().unwrap();
    let row = vp.width as usize * 3;
    assert_eq!(&bgr[..3], &[0xFF, 0xFF, 0xFF]);
    assert_eq!(&bgr[row - 3..row], &[0, 0, 0]);
}

#[test]
fn test_gpu_record_captures_each_frame() {
    let mut video = soft_context(VideoConfig {
        gpu_record: true,
        force_aspect: false,
        ..Default::default()
    });
    video.init(&mode(32, 16)).unwrap();
    assert!(video.supports_recording());
    assert!(video.gpu_record_init(32 * 16 * 3));

    let data = xrgb_frame(8, 4, 32, 0x0010_2030);
    let mut info = FrameInfo::default();
    video.frame(FrameData::Cpu(&data), 8, 4, 32, None, &mut info);

    let (enabled, buffer) = video.record_status();
    assert!(enabled);
    let buffer = buffer.expect("record buffer");
    assert_eq!(&buffer[..3], &[0x30, 0x20, 0x10]);
}

#[test]
fn test_redraw_after_driver_switch() {
    let mut video = soft_context(VideoConfig::default());
    video.init(&mode(640, 480)).unwrap();
    let data = xrgb_frame(320, 240, 1280, 0x00FF_FFFF);
    let mut info = FrameInfo::default();
    video.frame(FrameData::Cpu(&data), 320, 240, 1280, None, &mut info);

    video.apply_config(VideoConfig {
        driver: "null".to_string(),
        ..Default::default()
    });
    video.init(&mode(640, 480)).unwrap();
    assert_eq!(video.get_ident(), Some("null"));
    assert_eq!(video.cached_frame(&mut info), FrameStatus::Presented);
    assert_eq!(video.get_frame_count(), 1);
}
