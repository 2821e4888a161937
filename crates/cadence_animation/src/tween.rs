//! Tween scheduler
//!
//! Animates a scalar from its current value to a target over a fixed
//! duration, shaped by an [`Easing`] curve. The value is published through a
//! [`Signal`] once per frame.
//!
//! Lifecycle of one run:
//!
//! 1. `animate_to(target)` captures the value held right now as the start,
//!    cancels any pending work and bumps the generation.
//! 2. A non-zero delay waits on a host timer.
//! 3. The first executed frame records the start timestamp, so the delay
//!    never eats into the duration.
//! 4. Each frame publishes `lerp(start, target, easing(progress))`; the last
//!    one snaps to the exact target and calls `on_complete` once.
//!
//! # Example
//!
//! ```rust
//! use cadence_animation::{AnimationContext, Easing, TweenOptions};
//! use cadence_core::SimulatedHost;
//!
//! let sim = SimulatedHost::with_frame_interval(10.0);
//! let ctx = AnimationContext::new(sim.host());
//!
//! let tween = ctx
//!     .animate_value(0.0, 100.0, TweenOptions::new(500.0).easing(Easing::Linear))
//!     .unwrap();
//!
//! sim.advance(250.0);
//! assert!((tween.get() - 50.0).abs() < 1.0);
//!
//! sim.advance(250.0);
//! assert_eq!(tween.get(), 100.0);
//! ```

use crate::context::AnimationContext;
use crate::easing::Easing;
use crate::error::{check_duration, Result};
use crate::scheduler::{Generation, Scheduled, WorkSlot};
use cadence_core::{Host, Signal};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Callback invoked once when a tween reaches its target
pub type CompletionCallback = Rc<dyn Fn()>;

/// Options for one tween
#[derive(Clone)]
pub struct TweenOptions {
    pub duration_ms: f64,
    pub easing: Easing,
    pub delay_ms: f64,
    pub on_complete: Option<CompletionCallback>,
}

impl TweenOptions {
    pub fn new(duration_ms: f64) -> Self {
        Self {
            duration_ms,
            ..Default::default()
        }
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Wait `delay_ms` before the first frame
    pub fn delay(mut self, delay_ms: f64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn on_complete<F: Fn() + 'static>(mut self, callback: F) -> Self {
        self.on_complete = Some(Rc::new(callback));
        self
    }

    /// Reject negative or non-finite durations and delays
    pub fn validate(&self) -> Result<()> {
        check_duration("duration", self.duration_ms)?;
        check_duration("delay", self.delay_ms)?;
        Ok(())
    }
}

impl Default for TweenOptions {
    fn default() -> Self {
        Self {
            duration_ms: 300.0,
            easing: Easing::EaseOutCubic,
            delay_ms: 0.0,
            on_complete: None,
        }
    }
}

impl fmt::Debug for TweenOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TweenOptions")
            .field("duration_ms", &self.duration_ms)
            .field("easing", &self.easing)
            .field("delay_ms", &self.delay_ms)
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

struct TweenState {
    generation: Generation,
    start_value: f32,
    target_value: f32,
    /// Timestamp of the first executed frame of the current run
    start_timestamp: Option<f64>,
    options: TweenOptions,
    work: WorkSlot,
    complete: bool,
    disposed: bool,
}

struct TweenInner {
    host: Host,
    value: Signal<f32>,
    state: RefCell<TweenState>,
}

/// What a frame decided, applied after the state borrow is released
enum Step {
    Continue(f32),
    Finish(f32, Option<CompletionCallback>),
}

/// A value animated by a tween
///
/// Dropping the handle (or calling [`TweenValue::dispose`]) cancels all
/// pending work.
pub struct TweenValue {
    inner: Rc<TweenInner>,
}

impl TweenValue {
    /// Create a tween resting at `initial`
    pub fn new(ctx: &AnimationContext, initial: f32, options: TweenOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            inner: Rc::new(TweenInner {
                host: ctx.host().clone(),
                value: Signal::new(initial),
                state: RefCell::new(TweenState {
                    generation: Generation::default(),
                    start_value: initial,
                    target_value: initial,
                    start_timestamp: None,
                    options,
                    work: WorkSlot::new(),
                    complete: true,
                    disposed: false,
                }),
            }),
        })
    }

    /// Create a tween at `from` and start it toward `target`
    pub fn animate(
        ctx: &AnimationContext,
        from: f32,
        target: f32,
        options: TweenOptions,
    ) -> Result<Self> {
        let tween = Self::new(ctx, from, options)?;
        tween.animate_to(target);
        Ok(tween)
    }

    /// Replace the options used by subsequent runs
    pub fn set_options(&self, options: TweenOptions) -> Result<()> {
        options.validate()?;
        self.inner.state.borrow_mut().options = options;
        Ok(())
    }

    /// Start (or retarget) toward `target` from the value held right now
    pub fn animate_to(&self, target: f32) {
        let inner = &self.inner;
        let (generation, start, duration_ms, delay_ms) = {
            let mut state = inner.state.borrow_mut();
            if state.disposed {
                return;
            }
            state.work.cancel(&inner.host);
            let generation = state.generation.advance();

            state.start_value = inner.value.get();
            state.target_value = target;
            state.start_timestamp = None;
            state.complete = false;
            (
                generation,
                state.start_value,
                state.options.duration_ms,
                state.options.delay_ms,
            )
        };

        if start == target {
            inner.state.borrow_mut().complete = true;
            inner.value.set(target);
            return;
        }

        let has_frames = inner.host.frames().is_some();
        let has_timers = inner.host.timers().is_some();

        if duration_ms == 0.0 {
            tracing::debug!("TweenValue: zero duration, snapping to {}", target);
            finish(inner, generation);
            return;
        }
        if !has_frames || (delay_ms > 0.0 && !has_timers) {
            tracing::debug!("TweenValue: host cannot animate, snapping to {}", target);
            finish(inner, generation);
            return;
        }

        tracing::debug!(
            "TweenValue: {} -> {} over {}ms (delay {}ms)",
            start,
            target,
            duration_ms,
            delay_ms
        );

        if delay_ms > 0.0 {
            schedule_delay(inner, generation, delay_ms);
        } else {
            schedule_frame(inner, generation);
        }
    }

    /// Current value
    pub fn get(&self) -> f32 {
        self.inner.value.get()
    }

    /// The reactive container the value is published through
    pub fn signal(&self) -> Signal<f32> {
        self.inner.value.clone()
    }

    pub fn target(&self) -> f32 {
        self.inner.state.borrow().target_value
    }

    /// Value the current run started from
    pub fn start_value(&self) -> f32 {
        self.inner.state.borrow().start_value
    }

    /// Check if a delay timer or frame is pending
    pub fn is_animating(&self) -> bool {
        self.inner.state.borrow().work.is_pending()
    }

    /// Check if the last run reached its target
    pub fn is_complete(&self) -> bool {
        self.inner.state.borrow().complete
    }

    /// Stop where the value stands, without calling `on_complete`
    pub fn cancel(&self) {
        let mut state = self.inner.state.borrow_mut();
        state.work.cancel(&self.inner.host);
        state.generation.advance();
    }

    /// Set the value immediately, stopping any run
    pub fn jump_to(&self, value: f32) {
        {
            let mut state = self.inner.state.borrow_mut();
            state.work.cancel(&self.inner.host);
            state.generation.advance();
            state.start_value = value;
            state.target_value = value;
            state.complete = true;
        }
        self.inner.value.set(value);
    }

    /// Cancel all pending work; later calls to `animate_to` are ignored
    pub fn dispose(&self) {
        let mut state = self.inner.state.borrow_mut();
        if state.disposed {
            return;
        }
        state.work.cancel(&self.inner.host);
        state.generation.advance();
        state.disposed = true;
        tracing::debug!("TweenValue: disposed at {}", self.inner.value.get());
    }
}

impl Drop for TweenValue {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for TweenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("TweenValue")
            .field("value", &self.inner.value.get())
            .field("start", &state.start_value)
            .field("target", &state.target_value)
            .field("complete", &state.complete)
            .finish()
    }
}

fn schedule_delay(inner: &Rc<TweenInner>, generation: Generation, delay_ms: f64) {
    let Some(timers) = inner.host.timers() else {
        return;
    };

    let weak = Rc::downgrade(inner);
    let id = timers.set_timeout(
        delay_ms,
        Box::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            {
                let mut state = inner.state.borrow_mut();
                if state.generation != generation {
                    return;
                }
                state.work.clear();
            }
            schedule_frame(&inner, generation);
        }),
    );
    store_work(inner, generation, Scheduled::Timer(id));
}

fn schedule_frame(inner: &Rc<TweenInner>, generation: Generation) {
    let Some(frames) = inner.host.frames() else {
        return;
    };
    if inner.state.borrow().generation != generation {
        return;
    }

    let weak: Weak<TweenInner> = Rc::downgrade(inner);
    let id = frames.request_frame(Box::new(move |timestamp| {
        if let Some(inner) = weak.upgrade() {
            on_frame(&inner, generation, timestamp);
        }
    }));
    store_work(inner, generation, Scheduled::Frame(id));
}

/// Record freshly scheduled work, or cancel it if the run went stale meanwhile
fn store_work(inner: &Rc<TweenInner>, generation: Generation, work: Scheduled) {
    let mut state = inner.state.borrow_mut();
    if state.generation == generation {
        state.work.replace(&inner.host, work);
    } else {
        work.cancel(&inner.host);
    }
}

fn on_frame(inner: &Rc<TweenInner>, generation: Generation, timestamp: f64) {
    let step = {
        let mut state = inner.state.borrow_mut();
        if state.generation != generation {
            return;
        }
        state.work.clear();

        let started = *state.start_timestamp.get_or_insert(timestamp);
        let progress = ((timestamp - started) / state.options.duration_ms).clamp(0.0, 1.0);

        if progress >= 1.0 {
            state.complete = true;
            Step::Finish(state.target_value, state.options.on_complete.clone())
        } else {
            let eased = state.options.easing.apply(progress as f32);
            Step::Continue(lerp(state.start_value, state.target_value, eased))
        }
    };

    match step {
        Step::Continue(value) => {
            tracing::trace!("TweenValue: frame at {:.1}ms -> {}", timestamp, value);
            inner.value.set(value);
            // A subscriber may have retargeted; schedule_frame checks the generation
            schedule_frame(inner, generation);
        }
        Step::Finish(target, on_complete) => {
            tracing::debug!("TweenValue: reached {}", target);
            publish_final(inner, generation, target, on_complete);
        }
    }
}

/// Snap to the target of the current run and report completion
fn finish(inner: &Rc<TweenInner>, generation: Generation) {
    let (target, on_complete) = {
        let mut state = inner.state.borrow_mut();
        if state.generation != generation {
            return;
        }
        state.work.cancel(&inner.host);
        state.complete = true;
        (state.target_value, state.options.on_complete.clone())
    };

    publish_final(inner, generation, target, on_complete);
}

/// Publish the target, then complete unless a subscriber cancelled or
/// retargeted from that notification
fn publish_final(
    inner: &Rc<TweenInner>,
    generation: Generation,
    target: f32,
    on_complete: Option<CompletionCallback>,
) {
    inner.value.set(target);
    if inner.state.borrow().generation != generation {
        tracing::trace!("TweenValue: completion superseded");
        return;
    }
    if let Some(on_complete) = on_complete {
        on_complete();
    }
}

#[inline]
fn lerp(start: f32, end: f32, t: f32) -> f32 {
    start + (end - start) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnimationError;
    use cadence_core::SimulatedHost;
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<u32>>, impl Fn() + 'static) {
        let count = Rc::new(Cell::new(0));
        let inner = count.clone();
        (count, move || inner.set(inner.get() + 1))
    }

    fn linear(duration_ms: f64) -> TweenOptions {
        TweenOptions::new(duration_ms).easing(Easing::Linear)
    }

    #[test]
    fn test_linear_midpoint_and_exact_end() {
        let sim = SimulatedHost::with_frame_interval(10.0);
        let ctx = AnimationContext::new(sim.host());
        let (completed, on_complete) = counter();

        let tween = ctx
            .animate_value(0.0, 100.0, linear(500.0).on_complete(on_complete))
            .unwrap();
        assert!(tween.is_animating());

        sim.advance(250.0);
        assert!((tween.get() - 50.0).abs() < 0.01);
        assert_eq!(completed.get(), 0);

        sim.advance(250.0);
        assert_eq!(tween.get(), 100.0);
        assert!(tween.is_complete());
        assert!(!tween.is_animating());

        sim.advance(1_000.0);
        assert_eq!(completed.get(), 1);
    }

    #[test]
    fn test_equal_start_and_target_publishes_synchronously() {
        let sim = SimulatedHost::new();
        let ctx = AnimationContext::new(sim.host());
        let (completed, on_complete) = counter();

        let tween = ctx
            .animate_value(42.0, 42.0, linear(500.0).on_complete(on_complete))
            .unwrap();

        assert_eq!(tween.get(), 42.0);
        assert!(!tween.is_animating());
        assert!(sim.is_idle());
        assert_eq!(completed.get(), 0);
    }

    #[test]
    fn test_zero_duration_snaps_and_completes_once() {
        let sim = SimulatedHost::new();
        let ctx = AnimationContext::new(sim.host());
        let (completed, on_complete) = counter();

        let tween = ctx
            .animate_value(0.0, 10.0, linear(0.0).on_complete(on_complete))
            .unwrap();

        assert_eq!(tween.get(), 10.0);
        assert_eq!(completed.get(), 1);
        assert!(sim.is_idle());

        sim.advance(100.0);
        assert_eq!(completed.get(), 1);
    }

    #[test]
    fn test_zero_duration_retarget_snaps_mid_flight() {
        let sim = SimulatedHost::with_frame_interval(10.0);
        let ctx = AnimationContext::new(sim.host());

        let tween = ctx.animate_value(0.0, 100.0, linear(500.0)).unwrap();
        sim.advance(100.0);

        tween.set_options(linear(0.0)).unwrap();
        tween.animate_to(-5.0);
        assert_eq!(tween.get(), -5.0);
        assert!(sim.is_idle());
    }

    #[test]
    fn test_rejects_malformed_durations() {
        let ctx = AnimationContext::new(SimulatedHost::new().host());

        for bad in [-1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                ctx.animate_value(0.0, 1.0, linear(bad)),
                Err(AnimationError::InvalidDuration { what: "duration", .. })
            ));
        }
        assert!(matches!(
            ctx.animate_value(0.0, 1.0, linear(100.0).delay(-5.0)),
            Err(AnimationError::InvalidDuration { what: "delay", .. })
        ));
    }

    #[test]
    fn test_delay_does_not_skew_duration() {
        let sim = SimulatedHost::with_frame_interval(10.0);
        let ctx = AnimationContext::new(sim.host());

        let tween = ctx
            .animate_value(0.0, 100.0, linear(200.0).delay(100.0))
            .unwrap();

        sim.advance(100.0);
        assert_eq!(tween.get(), 0.0);
        assert!(tween.is_animating());

        // Started on the first frame at 100ms, so half way at 200ms
        sim.advance(100.0);
        assert!((tween.get() - 50.0).abs() < 0.01);

        sim.advance(100.0);
        assert_eq!(tween.get(), 100.0);
    }

    #[test]
    fn test_retarget_continues_from_held_value() {
        let sim = SimulatedHost::with_frame_interval(10.0);
        let ctx = AnimationContext::new(sim.host());
        let (completed, on_complete) = counter();

        let tween = ctx
            .animate_value(0.0, 100.0, linear(400.0).on_complete(on_complete))
            .unwrap();
        sim.advance(100.0);
        let held = tween.get();
        assert!((held - 25.0).abs() < 0.01);

        tween.animate_to(0.0);
        assert_eq!(tween.start_value(), held);
        // Nothing moves until the next frame
        assert_eq!(tween.get(), held);

        // A fresh run: 400ms measured from its own first frame
        sim.advance(400.0);
        assert!(tween.get() > 0.0);
        sim.advance(10.0);
        assert_eq!(tween.get(), 0.0);
        assert_eq!(completed.get(), 1);
    }

    #[test]
    fn test_retarget_during_delay_cancels_old_timer() {
        let sim = SimulatedHost::with_frame_interval(10.0);
        let ctx = AnimationContext::new(sim.host());
        let tween = ctx
            .animate_value(0.0, 100.0, linear(100.0).delay(50.0))
            .unwrap();

        sim.advance(20.0);
        tween.set_options(linear(100.0)).unwrap();
        tween.animate_to(-100.0);

        sim.advance(200.0);
        assert_eq!(tween.get(), -100.0);
        assert_eq!(sim.timers().pending_count(), 0);
    }

    #[test]
    fn test_cancel_holds_value_and_is_idempotent() {
        let sim = SimulatedHost::with_frame_interval(10.0);
        let ctx = AnimationContext::new(sim.host());
        let (completed, on_complete) = counter();

        let tween = ctx
            .animate_value(0.0, 100.0, linear(100.0).on_complete(on_complete))
            .unwrap();
        sim.advance(50.0);
        let held = tween.get();

        tween.cancel();
        tween.cancel();
        assert!(sim.is_idle());

        sim.advance(500.0);
        assert_eq!(tween.get(), held);
        assert_eq!(completed.get(), 0);
        assert!(!tween.is_complete());
    }

    #[test]
    fn test_cancel_from_final_publish_skips_completion() {
        let sim = SimulatedHost::with_frame_interval(10.0);
        let ctx = AnimationContext::new(sim.host());
        let (completed, on_complete) = counter();

        let tween = Rc::new(
            ctx.animate_value(0.0, 100.0, linear(100.0).on_complete(on_complete))
                .unwrap(),
        );
        let handle = Rc::downgrade(&tween);
        tween.signal().subscribe(move |value: &f32| {
            if *value == 100.0 {
                if let Some(tween) = handle.upgrade() {
                    tween.cancel();
                }
            }
        });

        sim.run_until_idle(1_000.0);
        assert_eq!(tween.get(), 100.0);
        assert_eq!(completed.get(), 0);
    }

    #[test]
    fn test_drop_cancels_pending_frames() {
        let sim = SimulatedHost::new();
        let ctx = AnimationContext::new(sim.host());
        let signal = {
            let tween = ctx.animate_value(0.0, 1.0, linear(300.0)).unwrap();
            sim.advance(50.0);
            tween.signal()
        };
        let held = signal.get();

        assert!(sim.is_idle());
        sim.advance(500.0);
        assert_eq!(signal.get(), held);
    }

    #[test]
    fn test_dispose_then_animate_is_ignored() {
        let sim = SimulatedHost::new();
        let ctx = AnimationContext::new(sim.host());
        let tween = TweenValue::new(&ctx, 0.0, linear(100.0)).unwrap();

        tween.dispose();
        tween.dispose();
        tween.animate_to(10.0);

        assert!(sim.is_idle());
        assert_eq!(tween.get(), 0.0);
    }

    #[test]
    fn test_no_frame_source_snaps() {
        let ctx = AnimationContext::new(Host::headless());
        let (completed, on_complete) = counter();

        let tween = ctx
            .animate_value(0.0, 7.0, linear(300.0).delay(20.0).on_complete(on_complete))
            .unwrap();

        assert_eq!(tween.get(), 7.0);
        assert_eq!(completed.get(), 1);
    }

    #[test]
    fn test_values_stay_between_start_and_target() {
        let sim = SimulatedHost::new();
        let ctx = AnimationContext::new(sim.host());
        let tween = ctx
            .animate_value(80.0, -20.0, TweenOptions::new(700.0).easing(Easing::EaseInOutCubic))
            .unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        tween.signal().subscribe(move |v| sink.borrow_mut().push(*v));

        sim.run_until_idle(5_000.0);

        let seen = seen.borrow();
        assert!(seen.len() > 10);
        assert!(seen.iter().all(|v| (-20.0 - 1e-3..=80.0 + 1e-3).contains(v)));
        assert_eq!(*seen.last().unwrap(), -20.0);
    }

    #[test]
    fn test_subscriber_retarget_wins_over_running_frame() {
        let sim = SimulatedHost::with_frame_interval(10.0);
        let ctx = AnimationContext::new(sim.host());
        let tween = Rc::new(ctx.animate_value(0.0, 100.0, linear(100.0)).unwrap());

        let weak = Rc::downgrade(&tween);
        tween.signal().subscribe(move |v| {
            if *v >= 50.0 {
                if let Some(tween) = weak.upgrade() {
                    if tween.target() == 100.0 {
                        tween.animate_to(200.0);
                    }
                }
            }
        });

        sim.run_until_idle(1_000.0);
        assert_eq!(tween.get(), 200.0);
        assert_eq!(sim.frames().pending_count(), 0);
    }
}
