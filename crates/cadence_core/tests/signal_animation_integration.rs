//! Integration tests for host capabilities + signals + animation primitives
//!
//! These tests verify that:
//! - A hand-wired host (frame loop + timer queue on a shared clock) drives
//!   animations the same way the simulated host does
//! - Signal subscribers see every published animation value
//! - Subscribers can retarget animations from inside a notification
//! - Visibility reports flow through a gate into an entrance animation

use cadence_animation::{AnimationContext, Easing, SpringConfig, StaggerOptions, TweenOptions};
use cadence_core::{ElementId, FrameLoop, Host, Signal, TimerQueue, VisibilityRegistry};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// A host assembled from the core building blocks, pumped by hand
struct ManualHost {
    clock: Rc<Cell<f64>>,
    frames: Rc<FrameLoop>,
    timers: Rc<TimerQueue>,
    visibility: Rc<VisibilityRegistry>,
}

impl ManualHost {
    fn new() -> Self {
        let clock = Rc::new(Cell::new(0.0));
        let frame_clock = clock.clone();
        let timer_clock = clock.clone();
        Self {
            clock,
            frames: Rc::new(FrameLoop::with_clock(move || frame_clock.get())),
            timers: Rc::new(TimerQueue::with_clock(move || timer_clock.get())),
            visibility: Rc::new(VisibilityRegistry::new()),
        }
    }

    fn host(&self) -> Host {
        Host::headless()
            .with_frames(self.frames.clone())
            .with_timers(self.timers.clone())
            .with_visibility(self.visibility.clone())
    }

    /// One 16ms tick: timers first, then a frame
    fn tick(&self) {
        let now = self.clock.get() + 16.0;
        self.clock.set(now);
        self.timers.run_due(now);
        self.frames.run_frame(now);
    }

    fn ticks(&self, count: usize) {
        for _ in 0..count {
            self.tick();
        }
    }
}

/// Subscribers see a monotonic sequence ending exactly at the target
#[test]
fn test_signal_observes_tween_progress() {
    let host = ManualHost::new();
    let ctx = AnimationContext::new(host.host());

    let tween = ctx
        .animate_value(0.0, 100.0, TweenOptions::new(160.0).easing(Easing::EaseInOutQuad))
        .unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    tween.signal().subscribe(move |value: &f32| sink.borrow_mut().push(*value));

    host.ticks(20);

    let seen = seen.borrow();
    assert!(seen.len() > 5);
    assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(seen.last().copied(), Some(100.0));
    assert!(!host.frames.has_pending());
}

/// A signal driving a spring target, the way a widget state change would
#[test]
fn test_signal_drives_spring_target() {
    let host = ManualHost::new();
    let ctx = AnimationContext::new(host.host());

    let hovered = Signal::new(false);
    let spring = Rc::new(ctx.spring_value(1.0, 1.0, SpringConfig::snappy().into()).unwrap());

    let driven = spring.clone();
    hovered.subscribe(move |hovered: &bool| {
        driven.set_target(if *hovered { 1.2 } else { 1.0 });
    });

    hovered.set(true);
    host.ticks(120);
    assert_eq!(spring.get(), 1.2);

    hovered.set(false);
    host.ticks(120);
    assert_eq!(spring.get(), 1.0);
    assert!(!spring.is_animating());
}

/// Retargeting from inside a value notification must not deadlock or jump
#[test]
fn test_subscriber_retargets_tween() {
    let host = ManualHost::new();
    let ctx = AnimationContext::new(host.host());

    let tween = Rc::new(
        ctx.animate_value(0.0, 100.0, TweenOptions::new(320.0).easing(Easing::Linear))
            .unwrap(),
    );

    let retargeted = Rc::new(Cell::new(false));
    let flag = retargeted.clone();
    let handle = Rc::downgrade(&tween);
    tween.signal().subscribe(move |value: &f32| {
        if *value >= 50.0 && !flag.get() {
            flag.set(true);
            if let Some(tween) = handle.upgrade() {
                tween.animate_to(0.0);
            }
        }
    });

    host.ticks(40);
    assert!(retargeted.get());
    assert_eq!(tween.get(), 0.0);
    assert!(tween.is_complete());
}

/// Visibility reports open the gate, which starts a stagger reveal
#[test]
fn test_visibility_gate_starts_stagger() {
    let host = ManualHost::new();
    let ctx = AnimationContext::new(host.host());
    let list = ElementId(42);

    let gate = ctx.visibility_gate(0.25).unwrap();
    let sequence = Rc::new(RefCell::new(None));

    let started = sequence.clone();
    let reveal_ctx = ctx.clone();
    gate.on_first_visible(move || {
        let stagger = reveal_ctx
            .stagger_sequence(vec!["alpha", "beta", "gamma"], StaggerOptions::new(32.0))
            .ok();
        *started.borrow_mut() = stagger;
    });
    gate.attach(list);

    host.ticks(10);
    assert!(sequence.borrow().is_none());

    host.visibility.report(list, 0.5);
    assert!(gate.has_animated());

    host.ticks(5);
    let sequence = sequence.borrow();
    let stagger = sequence.as_ref().unwrap();
    assert!(stagger.is_fully_revealed());
}
