//! Hardware render context negotiation.
//!
//! A core that renders with a GPU API registers an [`HwRenderCallback`] and
//! optionally a [`ContextNegotiationInterface`]. When the backend loses its
//! context (device reset, mode switch that recreates the window) the facade
//! walks the handshake below before hardware calls resume:
//!
//! ```text
//! Uninitialized --negotiate--> Negotiated --context_lost--> ContextLost
//!      ContextLost --begin_reacquire--> Reacquired { acked: false }
//!      Reacquired { acked: false } --acknowledge--> Reacquired { acked: true }
//!      Reacquired { .. } --context_lost--> ContextLost
//! ```
//!
//! `begin_reacquire` raises the cache-context request when the core asked
//! for its resources to survive. The request stays visibly pending until the
//! new context acknowledges it.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::logging::{log, LogCategory, LogLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HwContextType {
    #[default]
    None,
    OpenGl,
    OpenGlCore,
    OpenGles2,
    OpenGles3,
    Vulkan,
    Direct3D,
}

/// Core-side hooks invoked around context creation and destruction.
pub trait HwRenderHooks: Send + Sync {
    /// A fresh context is current; the core recreates its GPU resources.
    fn context_reset(&self);

    /// The context is about to go away.
    fn context_destroy(&self) {}
}

/// What a hardware-rendering core asked for. Owned by the application; the
/// facade keeps a copy for as long as the core is loaded.
#[derive(Clone, Default)]
pub struct HwRenderCallback {
    pub context_type: HwContextType,
    pub version_major: u32,
    pub version_minor: u32,
    pub depth: bool,
    pub stencil: bool,
    pub bottom_left_origin: bool,
    /// Keep the core's GPU resources across a context reinit
    pub cache_context: bool,
    pub debug_context: bool,
    pub hooks: Option<Arc<dyn HwRenderHooks>>,
}

impl fmt::Debug for HwRenderCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HwRenderCallback")
            .field("context_type", &self.context_type)
            .field("version", &(self.version_major, self.version_minor))
            .field("depth", &self.depth)
            .field("stencil", &self.stencil)
            .field("bottom_left_origin", &self.bottom_left_origin)
            .field("cache_context", &self.cache_context)
            .field("debug_context", &self.debug_context)
            .field("hooks", &self.hooks.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationInterfaceType {
    Vulkan,
}

/// Extra context requirements a core hands over before init.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextNegotiationInterface {
    pub interface_type: NegotiationInterfaceType,
    pub interface_version: u32,
}

/// Opaque API handle a backend exposes to a hardware-rendering core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HwRenderInterface {
    pub interface_type: HwContextType,
    pub interface_version: u32,
    pub handle: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HwContextPhase {
    #[default]
    Uninitialized,
    Negotiated,
    ContextLost,
    Reacquired { acked: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwContextEvent {
    Negotiate,
    ContextLost,
    BeginReacquire,
    Acknowledge,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HwContextError {
    #[error("hw context event {event:?} is not valid in phase {phase:?}")]
    InvalidTransition {
        phase: HwContextPhase,
        event: HwContextEvent,
    },
}

#[derive(Debug, Clone, Default)]
pub struct HwContext {
    callback: Option<HwRenderCallback>,
    negotiation: Option<ContextNegotiationInterface>,
    phase: HwContextPhase,
    cache_context: bool,
}

impl HwContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> HwContextPhase {
        self.phase
    }

    pub fn callback(&self) -> Option<&HwRenderCallback> {
        self.callback.as_ref()
    }

    pub fn set_callback(&mut self, callback: Option<HwRenderCallback>) {
        self.callback = callback;
    }

    pub fn negotiation_interface(&self) -> Option<&ContextNegotiationInterface> {
        self.negotiation.as_ref()
    }

    pub fn set_negotiation_interface(&mut self, iface: Option<ContextNegotiationInterface>) {
        self.negotiation = iface;
    }

    /// A core asked for hardware rendering in some form
    pub fn is_hw_context(&self) -> bool {
        self.callback
            .as_ref()
            .is_some_and(|cb| cb.context_type != HwContextType::None)
            || self.negotiation.is_some()
    }

    /// Hardware calls are only safe while the context is not lost
    pub fn is_usable(&self) -> bool {
        self.phase != HwContextPhase::ContextLost
    }

    /// A reinit asked the backend to keep the previous context's resources
    pub fn is_video_cache_context(&self) -> bool {
        self.cache_context
    }

    pub fn is_video_cache_context_ack(&self) -> bool {
        self.phase == HwContextPhase::Reacquired { acked: true }
    }

    /// Cache-context was requested and the backend has not confirmed it yet
    pub fn is_ack_pending(&self) -> bool {
        self.cache_context && self.phase == HwContextPhase::Reacquired { acked: false }
    }

    fn invalid(&self, event: HwContextEvent) -> HwContextError {
        HwContextError::InvalidTransition {
            phase: self.phase,
            event,
        }
    }

    fn enter(&mut self, phase: HwContextPhase) {
        log(LogCategory::HwContext, LogLevel::Debug, || {
            format!("hw context {:?} -> {:?}", self.phase, phase)
        });
        self.phase = phase;
    }

    pub fn negotiate(&mut self) -> Result<(), HwContextError> {
        if self.phase != HwContextPhase::Uninitialized {
            return Err(self.invalid(HwContextEvent::Negotiate));
        }
        self.enter(HwContextPhase::Negotiated);
        Ok(())
    }

    /// Repeated loss reports while already lost are absorbed.
    pub fn context_lost(&mut self) -> Result<(), HwContextError> {
        match self.phase {
            HwContextPhase::ContextLost => Ok(()),
            HwContextPhase::Negotiated | HwContextPhase::Reacquired { .. } => {
                self.enter(HwContextPhase::ContextLost);
                Ok(())
            }
            HwContextPhase::Uninitialized => Err(self.invalid(HwContextEvent::ContextLost)),
        }
    }

    pub fn begin_reacquire(&mut self) -> Result<(), HwContextError> {
        if self.phase != HwContextPhase::ContextLost {
            return Err(self.invalid(HwContextEvent::BeginReacquire));
        }
        self.cache_context = self.callback.as_ref().is_some_and(|cb| cb.cache_context);
        self.enter(HwContextPhase::Reacquired { acked: false });
        Ok(())
    }

    /// The new context honoured the cache-context request.
    pub fn acknowledge(&mut self) -> Result<(), HwContextError> {
        if !self.is_ack_pending() {
            return Err(self.invalid(HwContextEvent::Acknowledge));
        }
        self.enter(HwContextPhase::Reacquired { acked: true });
        Ok(())
    }

    /// Back to `Uninitialized`, keeping the registered callback.
    pub fn reset(&mut self) {
        self.phase = HwContextPhase::Uninitialized;
        self.cache_context = false;
    }

    /// Drop everything the core registered.
    pub fn clear(&mut self) {
        self.reset();
        self.callback = None;
        self.negotiation = None;
    }

    pub(crate) fn notify_context_reset(&self) {
        if let Some(hooks) = self.callback.as_ref().and_then(|cb| cb.hooks.as_ref()) {
            hooks.context_reset();
        }
    }

    pub(crate) fn notify_context_destroy(&self) {
        if let Some(hooks) = self.callback.as_ref().and_then(|cb| cb.hooks.as_ref()) {
            hooks.context_destroy();
        }
    }
}
