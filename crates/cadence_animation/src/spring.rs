//! Spring physics animation
//!
//! A damped harmonic oscillator integrated once per frame with the measured
//! frame delta. Interrupting a spring with a new target keeps its velocity,
//! which is what makes interrupted motion look natural.

use crate::config::AnimationConfig;
use crate::context::AnimationContext;
use crate::error::{AnimationError, Result};
use crate::scheduler::{Generation, Scheduled, WorkSlot};
use cadence_core::{Host, Signal};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Configuration for a spring animation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpringConfig {
    pub stiffness: f32,
    pub damping: f32,
    pub mass: f32,
}

impl SpringConfig {
    /// Create a new spring configuration
    pub fn new(stiffness: f32, damping: f32, mass: f32) -> Self {
        Self {
            stiffness,
            damping,
            mass,
        }
    }

    /// A gentle, slow spring (good for page transitions)
    pub fn gentle() -> Self {
        Self::new(120.0, 14.0, 1.0)
    }

    /// A wobbly spring with overshoot (good for playful UI)
    pub fn wobbly() -> Self {
        Self::new(180.0, 12.0, 1.0)
    }

    /// A stiff, snappy spring (good for buttons)
    pub fn stiff() -> Self {
        Self::new(400.0, 30.0, 1.0)
    }

    /// A very stiff spring with minimal oscillation (good for quick responses)
    pub fn snappy() -> Self {
        Self::new(600.0, 40.0, 1.0)
    }

    /// A slow spring with no overshoot (critically damped)
    pub fn molasses() -> Self {
        Self::new(100.0, 20.0, 1.0)
    }

    /// Reject non-positive or non-finite parameters
    pub fn validate(&self) -> Result<()> {
        let ok = |v: f32| v.is_finite() && v > 0.0;
        if ok(self.stiffness) && ok(self.damping) && ok(self.mass) {
            Ok(())
        } else {
            Err(AnimationError::InvalidSpringParameters {
                stiffness: self.stiffness,
                damping: self.damping,
                mass: self.mass,
            })
        }
    }

    /// Calculate critical damping for this spring's stiffness and mass
    pub fn critical_damping(&self) -> f32 {
        2.0 * (self.stiffness * self.mass).sqrt()
    }

    /// Check if the spring is underdamped (will oscillate)
    pub fn is_underdamped(&self) -> bool {
        self.damping < self.critical_damping()
    }

    /// Check if the spring is critically damped (no oscillation, fastest settling)
    pub fn is_critically_damped(&self) -> bool {
        (self.damping - self.critical_damping()).abs() < 0.01
    }

    /// Check if the spring is overdamped (slow settling, no oscillation)
    pub fn is_overdamped(&self) -> bool {
        self.damping > self.critical_damping()
    }
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self::stiff()
    }
}

/// Thresholds below which a spring counts as at rest
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RestThreshold {
    /// Distance to target
    pub delta: f32,
    /// Speed, in units per second
    pub velocity: f32,
}

impl Default for RestThreshold {
    fn default() -> Self {
        Self {
            delta: 0.01,
            velocity: 0.01,
        }
    }
}

/// Largest single integration step (seconds) unless configured otherwise
const DEFAULT_SUBSTEP: f32 = 0.008;

/// Longest span one `step` call integrates, in seconds
const MAX_STEP_DT: f32 = 1.0;

/// Upper bound on integration steps per `step` call
const MAX_SUBSTEPS: u32 = 4096;

/// A spring-based animator
///
/// Integrates with semi-implicit Euler. Each frame delta is split into
/// sub-steps no longer than `mass / damping` and `sqrt(mass / stiffness)`,
/// which keeps light, overdamped and very stiff springs stable.
#[derive(Clone, Copy, Debug)]
pub struct Spring {
    config: SpringConfig,
    value: f32,
    velocity: f32,
    target: f32,
    rest: RestThreshold,
    substep: f32,
}

impl Spring {
    pub fn new(config: SpringConfig, initial: f32) -> Self {
        Self {
            config,
            value: initial,
            velocity: 0.0,
            target: initial,
            rest: RestThreshold::default(),
            substep: DEFAULT_SUBSTEP,
        }
    }

    pub fn with_velocity(mut self, velocity: f32) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_rest(mut self, rest: RestThreshold) -> Self {
        self.rest = rest;
        self
    }

    /// Largest single integration step, in seconds
    pub fn with_substep(mut self, substep: f32) -> Self {
        if substep.is_finite() && substep > 0.0 {
            self.substep = substep;
        }
        self
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn config(&self) -> SpringConfig {
        self.config
    }

    /// Retarget; velocity is kept
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Check if the spring has settled (within epsilon of target with minimal velocity)
    pub fn is_settled(&self) -> bool {
        (self.value - self.target).abs() < self.rest.delta
            && self.velocity.abs() < self.rest.velocity
    }

    /// Jump to the target and stop
    pub fn snap_to_target(&mut self) {
        self.value = self.target;
        self.velocity = 0.0;
    }

    /// Advance the simulation by `dt` seconds
    ///
    /// Snaps to the target once settled.
    pub fn step(&mut self, dt: f32) {
        if self.is_settled() {
            self.snap_to_target();
            return;
        }
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }

        let dt = dt.min(MAX_STEP_DT);
        let steps = ((dt / self.stable_substep()).ceil().max(1.0) as u32).min(MAX_SUBSTEPS);
        let h = dt / steps as f32;
        for _ in 0..steps {
            let acceleration = self.acceleration(self.value, self.velocity);
            self.velocity += acceleration * h;
            self.value += self.velocity * h;
        }

        if !(self.value.is_finite() && self.velocity.is_finite()) {
            tracing::debug!(
                "Spring: diverged (k={}, c={}, m={}), snapping to {}",
                self.config.stiffness,
                self.config.damping,
                self.config.mass,
                self.target
            );
            self.snap_to_target();
        } else if self.is_settled() {
            self.snap_to_target();
        }
    }

    /// Largest sub-step that keeps the integrator inside its stability region
    fn stable_substep(&self) -> f32 {
        let SpringConfig {
            stiffness,
            damping,
            mass,
        } = self.config;
        let mut h = self.substep;
        if damping > 0.0 {
            h = h.min(mass / damping);
        }
        if stiffness > 0.0 {
            h = h.min((mass / stiffness).sqrt());
        }
        if h.is_finite() && h > 0.0 {
            h
        } else {
            self.substep
        }
    }

    fn acceleration(&self, x: f32, v: f32) -> f32 {
        let spring_force = -self.config.stiffness * (x - self.target);
        let damping_force = -self.config.damping * v;
        (spring_force + damping_force) / self.config.mass
    }
}

// ============================================================================
// Host-driven spring value
// ============================================================================

/// Options for a spring-driven value
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpringOptions {
    pub config: SpringConfig,
    /// Velocity at creation, in units per second
    pub initial_velocity: f32,
}

impl SpringOptions {
    pub fn new(stiffness: f32, damping: f32, mass: f32) -> Self {
        SpringConfig::new(stiffness, damping, mass).into()
    }

    pub fn initial_velocity(mut self, velocity: f32) -> Self {
        self.initial_velocity = velocity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.config.validate()?;
        if !self.initial_velocity.is_finite() {
            return Err(AnimationError::InvalidSpringParameters {
                stiffness: self.config.stiffness,
                damping: self.config.damping,
                mass: self.config.mass,
            });
        }
        Ok(())
    }
}

impl From<SpringConfig> for SpringOptions {
    fn from(config: SpringConfig) -> Self {
        Self {
            config,
            initial_velocity: 0.0,
        }
    }
}

struct SpringState {
    spring: Spring,
    generation: Generation,
    /// Timestamp the next frame delta is measured from
    last_frame: Option<f64>,
    work: WorkSlot,
    disposed: bool,
}

struct SpringInner {
    host: Host,
    position: Signal<f32>,
    /// Largest integrated frame delta, in seconds
    max_dt: f32,
    state: RefCell<SpringState>,
}

/// A value driven toward its target by a spring
///
/// At most one frame is pending at a time; retargeting a moving spring only
/// changes the target the running loop pulls toward.
pub struct SpringValue {
    inner: Rc<SpringInner>,
}

impl SpringValue {
    /// Create a spring resting at `initial`
    ///
    /// A non-zero `initial_velocity` sets it moving right away.
    pub fn new(ctx: &AnimationContext, initial: f32, options: SpringOptions) -> Result<Self> {
        options.validate()?;
        let config: &AnimationConfig = ctx.config();

        let spring = Spring::new(options.config, initial)
            .with_velocity(options.initial_velocity)
            .with_rest(RestThreshold {
                delta: config.rest_delta,
                velocity: config.rest_velocity,
            })
            .with_substep((config.substep_ms / 1000.0) as f32);

        let value = Self {
            inner: Rc::new(SpringInner {
                host: ctx.host().clone(),
                position: Signal::new(initial),
                max_dt: (config.max_frame_dt_ms / 1000.0) as f32,
                state: RefCell::new(SpringState {
                    spring,
                    generation: Generation::default(),
                    last_frame: None,
                    work: WorkSlot::new(),
                    disposed: false,
                }),
            }),
        };
        value.kick();
        Ok(value)
    }

    /// Create a spring at `from` and send it toward `target`
    pub fn animate(
        ctx: &AnimationContext,
        from: f32,
        target: f32,
        options: SpringOptions,
    ) -> Result<Self> {
        let value = Self::new(ctx, from, options)?;
        value.set_target(target);
        Ok(value)
    }

    /// Pull toward a new target, keeping the current velocity
    pub fn set_target(&self, target: f32) {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.disposed {
                return;
            }
            state.spring.set_target(target);
        }
        self.kick();
    }

    /// Current position
    pub fn get(&self) -> f32 {
        self.inner.position.get()
    }

    /// The reactive container the position is published through
    pub fn signal(&self) -> Signal<f32> {
        self.inner.position.clone()
    }

    pub fn target(&self) -> f32 {
        self.inner.state.borrow().spring.target()
    }

    pub fn velocity(&self) -> f32 {
        self.inner.state.borrow().spring.velocity()
    }

    /// Snapshot of the underlying simulation
    pub fn spring(&self) -> Spring {
        self.inner.state.borrow().spring
    }

    /// Check if a frame is pending
    pub fn is_animating(&self) -> bool {
        self.inner.state.borrow().work.is_pending()
    }

    /// Set position immediately and stop, discarding velocity
    pub fn jump_to(&self, value: f32) {
        {
            let mut state = self.inner.state.borrow_mut();
            state.work.cancel(&self.inner.host);
            state.generation.advance();
            state.last_frame = None;
            state.spring.set_target(value);
            state.spring.snap_to_target();
        }
        self.inner.position.set(value);
    }

    /// Cancel the frame loop; later retargets are ignored
    pub fn dispose(&self) {
        let mut state = self.inner.state.borrow_mut();
        if state.disposed {
            return;
        }
        state.work.cancel(&self.inner.host);
        state.generation.advance();
        state.disposed = true;
        tracing::debug!("SpringValue: disposed at {}", state.spring.value());
    }

    /// Start the frame loop if the spring has somewhere to go
    fn kick(&self) {
        let inner = &self.inner;
        let generation = {
            let mut state = inner.state.borrow_mut();
            if state.disposed || state.work.is_pending() {
                return;
            }
            if state.spring.is_settled() {
                state.spring.snap_to_target();
                None
            } else if let Some(frames) = inner.host.frames() {
                state.last_frame = Some(frames.now());
                Some(state.generation.advance())
            } else {
                tracing::debug!(
                    "SpringValue: no frame source, snapping to {}",
                    state.spring.target()
                );
                state.spring.snap_to_target();
                None
            }
        };

        match generation {
            Some(generation) => {
                tracing::debug!("SpringValue: moving toward {}", self.target());
                schedule_frame(inner, generation);
            }
            None => {
                let value = inner.state.borrow().spring.value();
                inner.position.set(value);
            }
        }
    }
}

impl Drop for SpringValue {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for SpringValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("SpringValue")
            .field("position", &state.spring.value())
            .field("velocity", &state.spring.velocity())
            .field("target", &state.spring.target())
            .finish()
    }
}

fn schedule_frame(inner: &Rc<SpringInner>, generation: Generation) {
    let Some(frames) = inner.host.frames() else {
        return;
    };
    if inner.state.borrow().generation != generation {
        return;
    }

    let weak: Weak<SpringInner> = Rc::downgrade(inner);
    let id = frames.request_frame(Box::new(move |timestamp| {
        if let Some(inner) = weak.upgrade() {
            on_frame(&inner, generation, timestamp);
        }
    }));

    let mut state = inner.state.borrow_mut();
    if state.generation == generation {
        state.work.replace(&inner.host, Scheduled::Frame(id));
    } else {
        Scheduled::Frame(id).cancel(&inner.host);
    }
}

fn on_frame(inner: &Rc<SpringInner>, generation: Generation, timestamp: f64) {
    let (position, settled) = {
        let mut state = inner.state.borrow_mut();
        if state.generation != generation {
            return;
        }
        state.work.clear();

        let last = state.last_frame.replace(timestamp).unwrap_or(timestamp);
        let measured = ((timestamp - last) / 1000.0).max(0.0) as f32;
        let dt = measured.min(inner.max_dt);
        if measured > dt {
            tracing::trace!(
                "SpringValue: frame gap {:.1}ms clamped to {:.1}ms",
                measured * 1000.0,
                dt * 1000.0
            );
        }

        state.spring.step(dt);
        let settled = state.spring.is_settled();
        if settled {
            state.spring.snap_to_target();
        }
        (state.spring.value(), settled)
    };

    inner.position.set(position);
    if settled {
        tracing::debug!("SpringValue: settled at {}", position);
    } else {
        schedule_frame(inner, generation);
    }
}
