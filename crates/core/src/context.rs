//! The dispatch facade: one object that knows which backend is active and
//! routes every video call to it.
//!
//! There is no global state. The application constructs a [`VideoContext`]
//! with a catalog and configuration and hands references to whoever needs
//! to draw. Mode-set and teardown take `&mut self`, so no frame can be in
//! flight while a backend is being swapped; [`VideoContext::generation`]
//! lets collaborators that cache backend handles notice a swap.
//!
//! Every public query is total. With no backend, or with a backend that
//! lacks the capability asked for, the call returns a neutral default
//! instead of failing.

use std::path::Path;
use std::time::Instant;

use crate::aspect::AspectRatio;
use crate::cache::FrameCache;
use crate::catalog::DriverCatalog;
use crate::config::VideoConfig;
use crate::driver::{
    DriverCapabilities, InitContext, InputDriver, Overlayable, Pokeable, VideoDriver,
};
use crate::error::VideoError;
use crate::hw_context::{
    ContextNegotiationInterface, HwContext, HwContextError, HwContextPhase, HwRenderCallback,
    HwRenderInterface,
};
use crate::logging::{log, LogCategory, LogLevel};
use crate::monitor::{FpsStatistics, FrameMonitor};
use crate::types::{
    DisplayHandles, DisplayModeRequest, DisplayType, FrameData, FrameInfo, FrameStatus,
    FrameSubmission, OsdParams, PixelFormat, RawFrame, Rotation, ShaderInfo, ShaderType,
    SoftwareFramebuffer, TextureFilter, TextureId, TextureImage, SCALE_BASE,
};
use crate::viewport::{
    translate_coord_viewport, PointerCoords, SystemAvInfo, Viewport, ViewportEngine,
};

struct ActiveDriver {
    index: usize,
    ident: &'static str,
    instance: Box<dyn VideoDriver>,
}

/// Snapshot of the per-iteration status probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoStatus {
    pub frame_count: u64,
    pub is_alive: bool,
    pub is_focused: bool,
}

pub struct VideoContext {
    catalog: DriverCatalog,
    config: VideoConfig,
    active: Option<ActiveDriver>,
    input: Option<Box<dyn InputDriver>>,
    own_driver: bool,
    stub_frame: bool,
    cache: FrameCache,
    frame_count: u64,
    pixel_format: PixelFormat,
    rotation: Rotation,
    size: (u32, u32),
    viewport: ViewportEngine,
    derived_viewport: Viewport,
    hw: HwContext,
    monitor: FrameMonitor,
    generation: u64,
    init_failure: Option<(DisplayModeRequest, VideoError)>,
    use_rgba: bool,
    gpu_record: Option<Vec<u8>>,
    handles: DisplayHandles,
    nonblock: bool,
    last_focus: bool,
}

impl VideoContext {
    pub fn new(catalog: DriverCatalog, config: VideoConfig) -> Self {
        Self {
            catalog,
            viewport: ViewportEngine::from_config(&config),
            monitor: FrameMonitor::new(config.refresh_rate),
            rotation: Rotation::from_index(config.rotation),
            nonblock: !config.vsync,
            config,
            active: None,
            input: None,
            own_driver: false,
            stub_frame: false,
            cache: FrameCache::Empty,
            frame_count: 0,
            pixel_format: PixelFormat::default(),
            size: (0, 0),
            derived_viewport: Viewport::default(),
            hw: HwContext::new(),
            generation: 0,
            init_failure: None,
            use_rgba: false,
            gpu_record: None,
            handles: DisplayHandles::default(),
            last_focus: false,
        }
    }

    pub fn catalog(&self) -> &DriverCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &VideoConfig {
        &self.config
    }

    /// Replace the display preferences. Takes effect on the derived
    /// viewport immediately and on the mode at the next `init`.
    pub fn apply_config(&mut self, config: VideoConfig) {
        let av_info = *self.viewport.system_av_info();
        self.viewport = ViewportEngine::from_config(&config);
        self.viewport.set_system_av_info(av_info);
        self.monitor.set_refresh_rate(config.refresh_rate);
        self.config = config;
        self.init_failure = None;
        self.refresh_viewport(false, true);
    }

    /// Mode request for the current configuration and core geometry.
    pub fn build_mode_request(&self) -> DisplayModeRequest {
        let geom = self.viewport.system_av_info().geometry;
        let config = &self.config;

        let (width, height) = if config.fullscreen {
            (config.fullscreen_width, config.fullscreen_height)
        } else {
            let scale = config.window_scale.max(0.0);
            let width = if config.force_aspect {
                let base_width = (geom.base_height as f32 * self.viewport.aspect_ratio()).round();
                (base_width * scale).round()
            } else {
                (geom.base_width as f32 * scale).round()
            };
            let height = (geom.base_height as f32 * scale).round();
            (width as u32, height as u32)
        };

        let max_dim = geom.max_width.max(geom.max_height);
        let input_scale = (max_dim.next_power_of_two() / SCALE_BASE).max(1);

        DisplayModeRequest {
            width,
            height,
            fullscreen: config.fullscreen,
            vsync: config.vsync,
            force_aspect: config.force_aspect,
            swap_interval: config.swap_interval,
            smooth: config.smooth,
            input_scale,
            rgb32: self.pixel_format.is_32bit(),
            font_enable: config.font_enable,
            parent: None,
        }
    }

    /// Bring up a backend for `mode`.
    ///
    /// The configured driver is tried first, then the rest of the catalog
    /// in order; the first one that initializes becomes active. When all of
    /// them fail the failure is logged once and remembered: asking again
    /// with the same request returns the same error without re-walking the
    /// catalog until [`clear_init_failure`](Self::clear_init_failure) or a
    /// config change.
    pub fn init(&mut self, mode: &DisplayModeRequest) -> Result<(), VideoError> {
        if self.own_driver {
            if let Some(active) = &self.active {
                log(LogCategory::Driver, LogLevel::Info, || {
                    format!("reusing owned video driver \"{}\"", active.ident)
                });
                self.own_driver = false;
                return Ok(());
            }
        }

        if let Some((failed_mode, err)) = &self.init_failure {
            if failed_mode == mode {
                return Err(err.clone());
            }
        }

        if self.active.is_some() {
            self.free();
        }

        if self.hw.phase() == HwContextPhase::Uninitialized && self.hw.is_hw_context() {
            self.hw.negotiate()?;
        }

        let preferred = self.catalog.find_index(&self.config.driver);
        if preferred.is_none() {
            log(LogCategory::Driver, LogLevel::Warn, || {
                format!(
                    "couldn't find video driver \"{}\", available: {}",
                    self.config.driver,
                    self.catalog.options()
                )
            });
        }

        let mut tried = Vec::new();
        for index in self.catalog.preference_order(preferred) {
            let Some(factory) = self.catalog.find_handle(index) else {
                continue;
            };
            let ident = factory.ident();
            let mut ctx = InitContext {
                mode,
                hw: &mut self.hw,
                input: &mut self.input,
            };
            match factory.init(&mut ctx) {
                Ok(instance) => {
                    self.activate(index, ident, instance, mode);
                    return Ok(());
                }
                Err(err) => {
                    self.input = None;
                    log(LogCategory::Driver, LogLevel::Warn, || err.to_string());
                    tried.push(ident);
                }
            }
        }

        let err = VideoError::NoDriverAvailable {
            tried: tried.join("|"),
        };
        log(LogCategory::Driver, LogLevel::Error, || err.to_string());
        self.init_failure = Some((mode.clone(), err.clone()));
        Err(err)
    }

    pub fn clear_init_failure(&mut self) {
        self.init_failure = None;
    }

    fn activate(
        &mut self,
        index: usize,
        ident: &'static str,
        mut instance: Box<dyn VideoDriver>,
        mode: &DisplayModeRequest,
    ) {
        let reported = instance.viewport_info();
        self.size = if reported.full_width > 0 && reported.full_height > 0 {
            (reported.full_width, reported.full_height)
        } else {
            (mode.width, mode.height)
        };
        self.nonblock = !mode.vsync;
        self.last_focus = instance.focus();
        instance.set_rotation(self.rotation);

        self.active = Some(ActiveDriver {
            index,
            ident,
            instance,
        });
        self.generation += 1;
        self.init_failure = None;
        self.monitor.reset();
        self.set_aspect_ratio();

        if self.hw.is_hw_context() && self.hw.is_usable() && !self.hw.is_video_cache_context_ack() {
            self.hw.notify_context_reset();
        }

        log(LogCategory::Driver, LogLevel::Info, || {
            format!(
                "video driver \"{}\" active at {}x{} (generation {})",
                ident, self.size.0, self.size.1, self.generation
            )
        });
    }

    /// Release the active backend unless the caller owns it.
    pub fn free(&mut self) {
        if self.own_driver {
            log(LogCategory::Driver, LogLevel::Debug, || {
                "video driver is owned, keeping it across free".to_string()
            });
            return;
        }
        self.release(true);
    }

    fn release(&mut self, destroy_context: bool) {
        let Some(active) = self.active.take() else {
            return;
        };
        self.last_focus = active.instance.focus();
        if destroy_context && self.hw.is_hw_context() && !self.hw.is_video_cache_context() {
            self.hw.notify_context_destroy();
            if self.cache.drop_gpu_binding() {
                log(LogCategory::Frame, LogLevel::Debug, || {
                    "hw context destroyed, cached framebuffer dropped".to_string()
                });
            }
        }
        let ident = active.ident;
        drop(active);
        self.input = None;
        self.generation += 1;
        log(LogCategory::Driver, LogLevel::Info, || {
            format!("video driver \"{}\" freed", ident)
        });
    }

    /// Full teardown: backend, cache, flags and the hw context.
    pub fn destroy(&mut self) {
        self.own_driver = false;
        self.release(true);
        self.cache.clear();
        self.stub_frame = false;
        self.frame_count = 0;
        self.hw.clear();
        self.gpu_record = None;
        self.monitor.reset();
        self.handles = DisplayHandles::default();
        self.use_rgba = false;
        self.init_failure = None;
    }

    /// Recreate the backend after a context loss or a change that needs a
    /// new context, walking the hw handshake on the way.
    ///
    /// When the core asked for its context to be cached, the old context is
    /// not destroyed and the new backend is expected to acknowledge the
    /// request during its `init`. Until it does, the request stays pending.
    pub fn reinit(&mut self, mode: &DisplayModeRequest) -> Result<(), VideoError> {
        let preserve = self.hw.callback().is_some_and(|cb| cb.cache_context);
        if matches!(
            self.hw.phase(),
            HwContextPhase::Negotiated | HwContextPhase::Reacquired { .. }
        ) {
            self.hw.context_lost()?;
        }

        self.own_driver = false;
        self.release(!preserve);

        if self.hw.phase() == HwContextPhase::ContextLost {
            self.hw.begin_reacquire()?;
        }
        self.init_failure = None;
        self.init(mode)?;

        if self.hw.is_ack_pending() && self.hw.is_video_cache_context() {
            log(LogCategory::HwContext, LogLevel::Warn, || {
                "backend did not acknowledge the cached context; resources must be recreated"
                    .to_string()
            });
        }
        Ok(())
    }

    fn sync_surface_size(&mut self) {
        let Some(active) = self.active.as_ref() else {
            return;
        };
        let reported = active.instance.viewport_info();
        self.last_focus = active.instance.focus();
        if reported.full_width == 0 || reported.full_height == 0 {
            return;
        }
        if (reported.full_width, reported.full_height) != self.size {
            log(LogCategory::Viewport, LogLevel::Debug, || {
                format!(
                    "surface resized {}x{} -> {}x{}",
                    self.size.0, self.size.1, reported.full_width, reported.full_height
                )
            });
            self.size = (reported.full_width, reported.full_height);
            self.refresh_viewport(false, true);
        }
    }

    fn refresh_viewport(&mut self, force_full: bool, allow_rotate: bool) {
        let (width, height) = self.size;
        let vp = self
            .viewport
            .compute(width, height, self.rotation, allow_rotate, force_full);
        self.derived_viewport = vp;
        if let Some(active) = self.active.as_mut() {
            active
                .instance
                .set_viewport(width, height, force_full, allow_rotate, &vp);
        }
    }

    /// Stamp the fields the facade owns into `info`.
    pub fn build_info(&self, info: &mut FrameInfo) {
        info.frame_count = self.frame_count;
        info.width = self.size.0;
        info.height = self.size.1;
        info.pixel_format = self.pixel_format;
        info.aspect_ratio = self.viewport.policy();
        info.scale_integer = self.viewport.scale_integer();
        info.viewport = self.derived_viewport;
        info.use_rgba = self.use_rgba;
        info.refresh_rate = self.monitor.refresh_rate();
        info.fps_show = self.config.fps_show;
        info.fps_text.clear();
        info.fps_text.push_str(self.monitor.fps_text());
        info.shared_context = self.hw.is_video_cache_context();
    }

    /// Submit one frame to the active backend.
    ///
    /// `FrameData::Dupe` redraws the cached frame; with nothing cached it is
    /// a no-op. A frame the backend accepts with fresh data (CPU or
    /// hardware) replaces the cache and advances the frame counter.
    pub fn frame(
        &mut self,
        data: FrameData<'_>,
        width: u32,
        height: u32,
        pitch: usize,
        msg: Option<&str>,
        info: &mut FrameInfo,
    ) -> FrameStatus {
        if self.stub_frame || self.active.is_none() {
            return FrameStatus::Skipped;
        }

        match data {
            FrameData::Dupe if self.cache.is_empty() => {
                log(LogCategory::Frame, LogLevel::Debug, || {
                    "redraw requested before any frame was cached".to_string()
                });
                return FrameStatus::Skipped;
            }
            FrameData::Hardware if !self.hw.is_usable() => {
                log(LogCategory::Frame, LogLevel::Debug, || {
                    "hardware frame while the hw context is lost".to_string()
                });
                return FrameStatus::Failed;
            }
            FrameData::Cpu(buffer) => {
                if let Err(err) = validate_frame(buffer, width, height, pitch, self.pixel_format) {
                    log(LogCategory::Frame, LogLevel::Warn, || err.to_string());
                    return FrameStatus::Failed;
                }
            }
            _ => {}
        }

        self.sync_surface_size();
        self.build_info(info);

        let submission = FrameSubmission {
            data,
            width,
            height,
            pitch,
            frame_count: self.frame_count,
            message: msg,
        };

        let Some(active) = self.active.as_mut() else {
            return FrameStatus::Skipped;
        };
        let accepted = active.instance.frame(&submission, info);
        let lost = active.instance.take_context_loss();

        if lost {
            match self.hw.context_lost() {
                Ok(()) => log(LogCategory::HwContext, LogLevel::Warn, || {
                    "backend reported hw context loss".to_string()
                }),
                Err(err) => log(LogCategory::HwContext, LogLevel::Debug, || err.to_string()),
            }
        }

        if !accepted {
            log(LogCategory::Frame, LogLevel::Debug, || {
                format!("backend rejected frame {}", self.frame_count)
            });
            return FrameStatus::Failed;
        }

        match data {
            FrameData::Cpu(buffer) => {
                self.cache.record_cpu(buffer, width, height, pitch);
                self.frame_count += 1;
            }
            FrameData::Hardware => {
                self.cache.record_gpu(width, height, pitch);
                self.frame_count += 1;
            }
            FrameData::Dupe => {}
        }

        self.monitor.tick(Instant::now(), self.frame_count);
        self.capture_gpu_record(info.runloop_is_idle);
        FrameStatus::Presented
    }

    /// Redraw the last recorded frame without new source data.
    pub fn cached_frame(&mut self, info: &mut FrameInfo) -> FrameStatus {
        let Some((width, height, pitch)) = self.cache.metadata() else {
            return FrameStatus::Skipped;
        };
        self.frame(FrameData::Dupe, width, height, pitch, None, info)
    }

    pub fn cached_frame_get(&self) -> &FrameCache {
        &self.cache
    }

    /// Seed the cache directly, e.g. after a core rendered off-thread
    pub fn cached_frame_set(&mut self, data: FrameData<'_>, width: u32, height: u32, pitch: usize) {
        match data {
            FrameData::Cpu(buffer) => self.cache.record_cpu(buffer, width, height, pitch),
            FrameData::Hardware => self.cache.record_gpu(width, height, pitch),
            FrameData::Dupe => {}
        }
    }

    pub fn cached_frame_has_valid_framebuffer(&self) -> bool {
        self.cache.has_valid_framebuffer()
    }

    pub fn get_frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Route frames nowhere until [`unset_stub_frame`](Self::unset_stub_frame)
    pub fn set_stub_frame(&mut self) {
        if !self.stub_frame {
            log(LogCategory::Frame, LogLevel::Debug, || "stub frame on".to_string());
        }
        self.stub_frame = true;
    }

    pub fn unset_stub_frame(&mut self) {
        if self.stub_frame {
            log(LogCategory::Frame, LogLevel::Debug, || "stub frame off".to_string());
        }
        self.stub_frame = false;
    }

    pub fn is_stub_frame(&self) -> bool {
        self.stub_frame
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Keep the current backend across the next free/init cycle
    pub fn set_own_driver(&mut self) {
        self.own_driver = true;
    }

    pub fn unset_own_driver(&mut self) {
        self.own_driver = false;
    }

    pub fn owns_driver(&self) -> bool {
        self.own_driver
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get_ident(&self) -> Option<&'static str> {
        self.active.as_ref().map(|active| active.ident)
    }

    /// Catalog index of the active backend
    pub fn active_index(&self) -> Option<usize> {
        self.active.as_ref().map(|active| active.index)
    }

    pub fn is_alive(&self) -> bool {
        self.active
            .as_ref()
            .map_or(true, |active| active.instance.alive())
    }

    pub fn is_focused(&self) -> bool {
        self.active
            .as_ref()
            .map_or(self.last_focus, |active| active.instance.focus())
    }

    pub fn has_windowed(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.instance.has_windowed())
    }

    pub fn is_threaded(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.instance.is_threaded())
    }

    pub fn status(&self) -> VideoStatus {
        VideoStatus {
            frame_count: self.frame_count,
            is_alive: self.is_alive(),
            is_focused: self.is_focused(),
        }
    }

    pub fn suppress_screensaver(&mut self, enable: bool) -> bool {
        self.active
            .as_mut()
            .is_some_and(|active| active.instance.suppress_screensaver(enable))
    }

    pub fn set_nonblock_state(&mut self, nonblock: bool) {
        self.nonblock = nonblock;
        if let Some(active) = self.active.as_mut() {
            active.instance.set_nonblock_state(nonblock);
        }
    }

    pub fn is_nonblock(&self) -> bool {
        self.nonblock
    }

    pub fn capabilities(&mut self) -> DriverCapabilities {
        self.active
            .as_mut()
            .map(|active| DriverCapabilities::probe(active.instance.as_mut()))
            .unwrap_or_default()
    }

    pub fn set_pixel_format(&mut self, format: PixelFormat) {
        log(LogCategory::Frame, LogLevel::Info, || {
            format!("pixel format set to {:?}", format)
        });
        self.pixel_format = format;
    }

    pub fn get_pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    pub fn set_rgba(&mut self) {
        self.use_rgba = true;
    }

    pub fn unset_rgba(&mut self) {
        self.use_rgba = false;
    }

    pub fn supports_rgba(&self) -> bool {
        self.use_rgba
    }

    pub fn get_size(&self) -> (u32, u32) {
        self.size
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    // Viewport and aspect

    /// Resize the drawable and recompute the derived viewport.
    pub fn set_viewport(
        &mut self,
        width: u32,
        height: u32,
        force_full: bool,
        allow_rotate: bool,
    ) -> bool {
        if self.active.is_none() {
            return false;
        }
        self.size = (width, height);
        self.refresh_viewport(force_full, allow_rotate);
        true
    }

    pub fn set_rotation(&mut self, rotation: u32) -> bool {
        self.rotation = Rotation::from_index(rotation);
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        active.instance.set_rotation(self.rotation);
        self.refresh_viewport(false, true);
        true
    }

    pub fn get_rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn get_viewport_info(&self) -> Option<Viewport> {
        self.active
            .as_ref()
            .map(|active| active.instance.viewport_info())
    }

    /// Viewport the facade derived for the current surface
    pub fn derived_viewport(&self) -> Viewport {
        self.derived_viewport
    }

    /// Pointer translation against the backend's current viewport
    pub fn translate_coord_viewport(&self, mouse_x: i32, mouse_y: i32) -> Option<PointerCoords> {
        let vp = self.get_viewport_info()?;
        translate_coord_viewport(&vp, mouse_x, mouse_y)
    }

    pub fn viewport_engine(&self) -> &ViewportEngine {
        &self.viewport
    }

    /// Apply the configured aspect policy to the engine and the backend.
    pub fn set_aspect_ratio(&mut self) {
        let policy = self.config.aspect_ratio_idx;
        self.viewport.set_aspect_ratio(policy);
        if let Some(poke) = self.poke() {
            poke.set_aspect_ratio(policy);
        }
        self.refresh_viewport(false, true);
    }

    pub fn set_aspect_ratio_policy(&mut self, policy: AspectRatio) {
        self.config.aspect_ratio_idx = policy;
        self.set_aspect_ratio();
    }

    pub fn get_aspect_ratio(&self) -> f32 {
        self.viewport.aspect_ratio()
    }

    pub fn set_aspect_ratio_value(&mut self, value: f32) {
        self.viewport.set_aspect_ratio_value(value);
        self.refresh_viewport(false, true);
    }

    pub fn set_viewport_config(&mut self) {
        self.viewport.set_viewport_config();
    }

    pub fn set_viewport_square_pixel(&mut self) {
        self.viewport.set_viewport_square_pixel();
    }

    pub fn set_viewport_core(&mut self) {
        self.viewport.set_viewport_core();
    }

    pub fn viewport_custom(&self) -> &Viewport {
        self.viewport.custom()
    }

    pub fn set_viewport_custom(&mut self, vp: Viewport) {
        self.viewport.set_custom(vp);
        self.config.custom_viewport = vp;
        self.refresh_viewport(false, true);
    }

    pub fn reset_custom_viewport(&mut self) {
        self.viewport.reset_custom_viewport();
        self.config.custom_viewport = Viewport::default();
        self.refresh_viewport(false, true);
    }

    pub fn system_av_info(&self) -> &SystemAvInfo {
        self.viewport.system_av_info()
    }

    pub fn set_system_av_info(&mut self, info: SystemAvInfo) {
        self.viewport.set_system_av_info(info);
        self.refresh_viewport(false, true);
    }

    // Read-back

    pub fn supports_viewport_read(&mut self) -> bool {
        self.active
            .as_mut()
            .is_some_and(|active| active.instance.viewport_reader().is_some())
    }

    pub fn supports_read_frame_raw(&mut self) -> bool {
        self.active
            .as_mut()
            .is_some_and(|active| active.instance.raw_frame_reader().is_some())
    }

    pub fn supports_recording(&mut self) -> bool {
        self.config.gpu_record && self.supports_viewport_read()
    }

    pub fn read_viewport(&mut self, buffer: &mut [u8], is_idle: bool) -> bool {
        self.active
            .as_mut()
            .and_then(|active| active.instance.viewport_reader())
            .is_some_and(|reader| reader.read_viewport(buffer, is_idle))
    }

    /// Owned copy of the current raw frame
    pub fn read_frame_raw(&mut self) -> Option<RawFrame> {
        self.active
            .as_mut()
            .and_then(|active| active.instance.raw_frame_reader())
            .and_then(|reader| reader.read_frame_raw())
    }

    /// Read the viewport into a freshly sized BGR24 buffer.
    ///
    /// `Ok(None)` when the backend cannot read back or the read failed.
    pub fn capture_viewport(&mut self, is_idle: bool) -> Result<Option<(Viewport, Vec<u8>)>, VideoError> {
        let vp = self.get_viewport_info().ok_or(VideoError::NoActiveDriver)?;
        if vp.is_empty() || !self.supports_viewport_read() {
            return Ok(None);
        }
        let mut buffer = vec![0u8; vp.width as usize * vp.height as usize * 3];
        if !self.read_viewport(&mut buffer, is_idle) {
            return Ok(None);
        }
        Ok(Some((vp, buffer)))
    }

    /// Allocate the buffer GPU-side recording reads the viewport into.
    pub fn gpu_record_init(&mut self, size: usize) -> bool {
        if size == 0 {
            return false;
        }
        self.gpu_record = Some(vec![0; size]);
        true
    }

    pub fn gpu_record_deinit(&mut self) {
        self.gpu_record = None;
    }

    /// Whether GPU recording is set up, and its last captured viewport
    pub fn record_status(&self) -> (bool, Option<&[u8]>) {
        match &self.gpu_record {
            Some(buffer) => (true, Some(buffer.as_slice())),
            None => (false, None),
        }
    }

    fn capture_gpu_record(&mut self, is_idle: bool) {
        let Some(buffer) = self.gpu_record.as_mut() else {
            return;
        };
        let captured = self
            .active
            .as_mut()
            .and_then(|active| active.instance.viewport_reader())
            .is_some_and(|reader| reader.read_viewport(buffer, is_idle));
        if !captured {
            log(LogCategory::Frame, LogLevel::Debug, || {
                "gpu record: viewport read failed".to_string()
            });
        }
    }

    // Optional interfaces

    fn poke(&mut self) -> Option<&mut dyn Pokeable> {
        self.active.as_mut().and_then(|active| active.instance.poke())
    }

    pub fn overlay_interface(&mut self) -> Option<&mut dyn Overlayable> {
        self.active
            .as_mut()
            .and_then(|active| active.instance.overlay())
    }

    pub fn set_shader(&mut self, kind: ShaderType, path: Option<&Path>) -> bool {
        let applied = self
            .active
            .as_mut()
            .and_then(|active| active.instance.shader_loader())
            .is_some_and(|loader| loader.set_shader(kind, path));
        log(LogCategory::Driver, LogLevel::Debug, || {
            format!("set_shader {:?} {:?} -> {}", kind, path, applied)
        });
        applied
    }

    pub fn texture_load(&mut self, image: &TextureImage, filter: TextureFilter) -> Option<TextureId> {
        let threaded = self.is_threaded();
        self.poke()?.load_texture(image, threaded, filter)
    }

    pub fn texture_unload(&mut self, id: TextureId) -> bool {
        match self.poke() {
            Some(poke) => {
                poke.unload_texture(id);
                true
            }
            None => false,
        }
    }

    pub fn set_video_mode(&mut self, width: u32, height: u32, fullscreen: bool) -> bool {
        self.poke()
            .is_some_and(|poke| poke.set_video_mode(width, height, fullscreen))
    }

    pub fn set_filtering(&mut self, index: u32, smooth: bool) {
        if let Some(poke) = self.poke() {
            poke.set_filtering(index, smooth);
        }
    }

    pub fn get_video_output_size(&mut self) -> Option<(u32, u32)> {
        self.poke()?.video_output_size()
    }

    pub fn get_next_video_out(&mut self) -> bool {
        self.poke().is_some_and(|poke| poke.video_output_next())
    }

    pub fn get_prev_video_out(&mut self) -> bool {
        self.poke().is_some_and(|poke| poke.video_output_prev())
    }

    /// Framebuffer object a hardware core should render into.
    /// `None` while the hw context is lost.
    pub fn get_current_framebuffer(&mut self) -> Option<usize> {
        if !self.hw.is_usable() {
            return None;
        }
        self.poke()?.current_framebuffer()
    }

    pub fn get_proc_address(&mut self, sym: &str) -> Option<usize> {
        if !self.hw.is_usable() {
            return None;
        }
        self.poke()?.proc_address(sym)
    }

    pub fn get_hw_render_interface(&mut self) -> Option<HwRenderInterface> {
        if !self.hw.is_usable() {
            return None;
        }
        self.poke()?.hw_render_interface()
    }

    pub fn apply_state_changes(&mut self) {
        if let Some(poke) = self.poke() {
            poke.apply_state_changes();
        }
    }

    pub fn set_texture_frame(&mut self, frame: &[u8], rgb32: bool, width: u32, height: u32, alpha: f32) {
        if let Some(poke) = self.poke() {
            poke.set_texture_frame(frame, rgb32, width, height, alpha);
        }
    }

    pub fn set_texture_enable(&mut self, enable: bool, full_screen: bool) {
        if let Some(poke) = self.poke() {
            poke.set_texture_enable(enable, full_screen);
        }
    }

    pub fn set_osd_msg(&mut self, msg: &str, params: &OsdParams) {
        if let Some(poke) = self.poke() {
            poke.set_osd_msg(msg, params);
        }
    }

    pub fn show_mouse(&mut self) {
        if let Some(poke) = self.poke() {
            poke.show_mouse(true);
        }
    }

    pub fn hide_mouse(&mut self) {
        if let Some(poke) = self.poke() {
            poke.show_mouse(false);
        }
    }

    pub fn grab_mouse_toggle(&mut self) {
        if let Some(poke) = self.poke() {
            poke.grab_mouse_toggle();
        }
    }

    pub fn get_current_shader(&mut self) -> Option<ShaderInfo> {
        self.poke()?.current_shader()
    }

    pub fn get_current_software_framebuffer(
        &mut self,
        width: u32,
        height: u32,
    ) -> Option<SoftwareFramebuffer<'_>> {
        self.poke()?.current_software_framebuffer(width, height)
    }

    pub fn input_driver(&mut self) -> Option<&mut dyn InputDriver> {
        match &mut self.input {
            Some(input) => Some(input.as_mut()),
            None => None,
        }
    }

    // Hardware context

    pub fn set_hw_render_callback(&mut self, callback: Option<HwRenderCallback>) {
        self.hw.set_callback(callback);
    }

    pub fn get_hw_context(&self) -> Option<&HwRenderCallback> {
        self.hw.callback()
    }

    pub fn is_hw_context(&self) -> bool {
        self.hw.is_hw_context()
    }

    pub fn set_context_negotiation_interface(&mut self, iface: Option<ContextNegotiationInterface>) {
        self.hw.set_negotiation_interface(iface);
    }

    pub fn get_context_negotiation_interface(&self) -> Option<&ContextNegotiationInterface> {
        self.hw.negotiation_interface()
    }

    pub fn hw_context_phase(&self) -> HwContextPhase {
        self.hw.phase()
    }

    pub fn is_video_cache_context(&self) -> bool {
        self.hw.is_video_cache_context()
    }

    pub fn set_video_cache_context_ack(&mut self) -> Result<(), HwContextError> {
        self.hw.acknowledge()
    }

    pub fn is_video_cache_context_ack(&self) -> bool {
        self.hw.is_video_cache_context_ack()
    }

    /// Report a context loss detected outside the frame path
    pub fn signal_context_loss(&mut self) -> Result<(), HwContextError> {
        self.hw.context_lost()
    }

    pub fn free_hw_context(&mut self) {
        self.hw.clear();
    }

    // Monitor

    pub fn monitor_reset(&mut self) {
        self.monitor.reset();
    }

    pub fn monitor_set_refresh_rate(&mut self, hz: f32) {
        self.monitor.set_refresh_rate(hz);
        self.config.refresh_rate = hz;
    }

    pub fn fps_statistics(&self) -> Option<FpsStatistics> {
        self.monitor.fps_statistics(self.is_threaded())
    }

    pub fn monitor(&self) -> &FrameMonitor {
        &self.monitor
    }

    // Native handles

    pub fn display_set(&mut self, display: usize) {
        self.handles.display = display;
    }

    pub fn display_get(&self) -> usize {
        self.handles.display
    }

    pub fn window_set(&mut self, window: usize) {
        self.handles.window = window;
    }

    pub fn window_get(&self) -> usize {
        self.handles.window
    }

    pub fn display_type_set(&mut self, display_type: DisplayType) {
        self.handles.display_type = display_type;
    }

    pub fn display_type_get(&self) -> DisplayType {
        self.handles.display_type
    }
}

impl Drop for VideoContext {
    fn drop(&mut self) {
        self.own_driver = false;
        self.release(true);
    }
}

fn validate_frame(
    buffer: &[u8],
    width: u32,
    height: u32,
    pitch: usize,
    format: PixelFormat,
) -> Result<(), VideoError> {
    let invalid = || VideoError::InvalidFrame {
        len: buffer.len(),
        width,
        height,
        pitch,
    };
    let row_bytes = (width as usize)
        .checked_mul(format.bytes_per_pixel())
        .ok_or_else(invalid)?;
    if width == 0 || height == 0 || pitch < row_bytes {
        return Err(invalid());
    }
    let needed = pitch
        .checked_mul(height as usize - 1)
        .and_then(|n| n.checked_add(row_bytes))
        .ok_or_else(invalid)?;
    if buffer.len() < needed {
        return Err(invalid());
    }
    Ok(())
}
