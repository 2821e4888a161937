//! Host capability bundle
//!
//! Every animation primitive receives a [`Host`]. Each capability is
//! optional: a primitive whose capability is missing publishes its final
//! state synchronously instead of animating.

use crate::frame::FrameSource;
use crate::timer::TimerSource;
use crate::visibility::VisibilityObserver;
use std::fmt;
use std::rc::Rc;

/// The capabilities a host environment lends to the runtime
#[derive(Clone, Default)]
pub struct Host {
    frames: Option<Rc<dyn FrameSource>>,
    timers: Option<Rc<dyn TimerSource>>,
    visibility: Option<Rc<dyn VisibilityObserver>>,
}

impl Host {
    /// A host with no capabilities (every primitive snaps to its target)
    pub fn headless() -> Self {
        Self::default()
    }

    pub fn with_frames(mut self, frames: Rc<dyn FrameSource>) -> Self {
        self.frames = Some(frames);
        self
    }

    pub fn with_timers(mut self, timers: Rc<dyn TimerSource>) -> Self {
        self.timers = Some(timers);
        self
    }

    pub fn with_visibility(mut self, visibility: Rc<dyn VisibilityObserver>) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn frames(&self) -> Option<&Rc<dyn FrameSource>> {
        self.frames.as_ref()
    }

    pub fn timers(&self) -> Option<&Rc<dyn TimerSource>> {
        self.timers.as_ref()
    }

    pub fn visibility(&self) -> Option<&Rc<dyn VisibilityObserver>> {
        self.visibility.as_ref()
    }

    /// Check if no capability at all is available
    pub fn is_headless(&self) -> bool {
        self.frames.is_none() && self.timers.is_none() && self.visibility.is_none()
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("frames", &self.frames.is_some())
            .field("timers", &self.timers.is_some())
            .field("visibility", &self.visibility.is_some())
            .finish()
    }
}
