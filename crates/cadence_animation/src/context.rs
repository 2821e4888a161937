//! Animation context
//!
//! Bundles the host capabilities with the runtime configuration. Every
//! primitive is created from a context; cloning one is cheap.

use crate::config::AnimationConfig;
use crate::error::Result;
use crate::spring::{SpringOptions, SpringValue};
use crate::stagger::{StaggerOptions, StaggerSequence};
use crate::timeline::{Stage, StageProgress};
use crate::tween::{TweenOptions, TweenValue};
use crate::visibility::VisibilityGate;
use cadence_core::Host;
use std::rc::Rc;

#[derive(Clone, Debug)]
pub struct AnimationContext {
    host: Host,
    config: Rc<AnimationConfig>,
}

impl AnimationContext {
    /// Create a context with the default configuration
    pub fn new(host: Host) -> Self {
        Self {
            host,
            config: Rc::new(AnimationConfig::default()),
        }
    }

    /// Create a context with a validated configuration
    pub fn with_config(host: Host, config: AnimationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            host,
            config: Rc::new(config),
        })
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }

    /// Tween options seeded from the configured duration and easing
    pub fn tween_options(&self) -> TweenOptions {
        TweenOptions::new(self.config.default_duration_ms).easing(self.config.default_easing)
    }

    /// Animate from `from` to `target` over time
    pub fn animate_value(
        &self,
        from: f32,
        target: f32,
        options: TweenOptions,
    ) -> Result<TweenValue> {
        TweenValue::animate(self, from, target, options)
    }

    /// Drive a spring from `from` toward `target`
    pub fn spring_value(
        &self,
        from: f32,
        target: f32,
        options: SpringOptions,
    ) -> Result<SpringValue> {
        SpringValue::animate(self, from, target, options)
    }

    /// Run a staged progress timeline while `is_active`
    pub fn stage_progress(&self, stages: Vec<Stage>, is_active: bool) -> Result<StageProgress> {
        StageProgress::new(self, stages, is_active)
    }

    /// Reveal `items` one after another
    pub fn stagger_sequence<T>(
        &self,
        items: Vec<T>,
        options: StaggerOptions,
    ) -> Result<StaggerSequence<T>>
    where
        T: Clone + PartialEq + 'static,
    {
        StaggerSequence::new(self, items, options)
    }

    /// Track when an element becomes visible
    pub fn visibility_gate(&self, threshold: f32) -> Result<VisibilityGate> {
        VisibilityGate::new(self, threshold)
    }
}
