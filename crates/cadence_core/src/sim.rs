//! Deterministic simulated host
//!
//! A virtual clock driving a [`FrameLoop`], a [`TimerQueue`] and a
//! [`VisibilityRegistry`]. Frames land on a fixed grid
//! (`frame_interval_ms`); timers fire at their exact due time. When a timer
//! and a frame fall on the same instant, the timer runs first. A request made
//! on a grid instant that has not painted yet runs on that instant.

use crate::frame::FrameLoop;
use crate::host::Host;
use crate::timer::TimerQueue;
use crate::visibility::{ElementId, VisibilityRegistry};
use std::cell::Cell;
use std::rc::Rc;

/// Default frame interval (~60fps)
pub const DEFAULT_FRAME_INTERVAL_MS: f64 = 16.0;

/// A fixed-tick host for tests and offline rendering
pub struct SimulatedHost {
    clock: Rc<Cell<f64>>,
    frame_interval_ms: f64,
    /// Timestamp of the last frame run, if any
    last_frame: Cell<Option<f64>>,
    frames: Rc<FrameLoop>,
    timers: Rc<TimerQueue>,
    visibility: Rc<VisibilityRegistry>,
}

impl SimulatedHost {
    pub fn new() -> Self {
        Self::with_frame_interval(DEFAULT_FRAME_INTERVAL_MS)
    }

    /// Create a host whose frames land every `interval_ms`
    pub fn with_frame_interval(interval_ms: f64) -> Self {
        let interval_ms = if interval_ms.is_finite() && interval_ms > 0.0 {
            interval_ms
        } else {
            DEFAULT_FRAME_INTERVAL_MS
        };

        let clock = Rc::new(Cell::new(0.0));
        let frame_clock = clock.clone();
        let timer_clock = clock.clone();

        Self {
            clock,
            frame_interval_ms: interval_ms,
            last_frame: Cell::new(None),
            frames: Rc::new(FrameLoop::with_clock(move || frame_clock.get())),
            timers: Rc::new(TimerQueue::with_clock(move || timer_clock.get())),
            visibility: Rc::new(VisibilityRegistry::new()),
        }
    }

    /// A host exposing all three capabilities
    pub fn host(&self) -> Host {
        Host::headless()
            .with_frames(self.frames.clone())
            .with_timers(self.timers.clone())
            .with_visibility(self.visibility.clone())
    }

    pub fn frames(&self) -> Rc<FrameLoop> {
        self.frames.clone()
    }

    pub fn timers(&self) -> Rc<TimerQueue> {
        self.timers.clone()
    }

    pub fn visibility(&self) -> Rc<VisibilityRegistry> {
        self.visibility.clone()
    }

    /// Current virtual time in milliseconds
    pub fn now(&self) -> f64 {
        self.clock.get()
    }

    pub fn frame_interval_ms(&self) -> f64 {
        self.frame_interval_ms
    }

    /// Number of frames run so far
    pub fn frame_count(&self) -> u64 {
        self.frames.frame_count()
    }

    /// Check if any frame or timer work is pending
    pub fn is_idle(&self) -> bool {
        !self.frames.has_pending() && !self.timers.has_pending()
    }

    /// Report an element's intersection ratio
    pub fn set_intersection(&self, element: ElementId, ratio: f32) {
        self.visibility.report(element, ratio);
    }

    /// Advance virtual time by `ms`, firing every timer and frame that
    /// falls inside the window
    pub fn advance(&self, ms: f64) {
        let end = self.now() + ms.max(0.0);
        self.run_until(end);
    }

    /// Advance until no work is pending, or `limit_ms` has elapsed
    ///
    /// Returns the virtual time spent.
    pub fn run_until_idle(&self, limit_ms: f64) -> f64 {
        let start = self.now();
        let end = start + limit_ms.max(0.0);

        while !self.is_idle() {
            let Some(next) = self.next_event() else {
                break;
            };
            if next > end {
                self.clock.set(end);
                break;
            }
            self.run_until(next);
        }

        self.now() - start
    }

    fn run_until(&self, end: f64) {
        while let Some(at) = self.next_event().filter(|at| *at <= end) {
            self.clock.set(at.max(self.now()));

            if self.timers.fire_next_due(at) {
                continue;
            }

            self.last_frame.set(Some(at));
            self.frames.run_frame(at);
        }

        if self.now() < end {
            self.clock.set(end);
        }
    }

    fn next_event(&self) -> Option<f64> {
        let next_timer = self.timers.next_due();
        let next_frame = self.frames.has_pending().then(|| self.next_frame_time());

        match (next_timer, next_frame) {
            (Some(timer), Some(frame)) => Some(if timer <= frame { timer } else { frame }),
            (timer, frame) => timer.or(frame),
        }
    }

    /// Next grid point at or after `now` that has not had a frame yet
    fn next_frame_time(&self) -> f64 {
        let interval = self.frame_interval_ms;
        let mut next = (self.now() / interval).ceil() * interval;
        if let Some(last) = self.last_frame.get() {
            if next <= last {
                next = last + interval;
            }
        }
        next
    }
}

impl Default for SimulatedHost {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameSource;
    use crate::timer::TimerSource;
    use std::cell::RefCell;

    #[test]
    fn test_frames_land_on_grid() {
        let sim = SimulatedHost::with_frame_interval(10.0);
        let stamps = Rc::new(RefCell::new(Vec::new()));

        fn request(frames: Rc<FrameLoop>, stamps: Rc<RefCell<Vec<f64>>>, remaining: u32) {
            let next = frames.clone();
            frames.request_frame(Box::new(move |ts| {
                stamps.borrow_mut().push(ts);
                if remaining > 1 {
                    request(next, stamps, remaining - 1);
                }
            }));
        }

        sim.advance(3.0);
        request(sim.frames(), stamps.clone(), 3);
        sim.advance(100.0);

        assert_eq!(*stamps.borrow(), vec![10.0, 20.0, 30.0]);
        assert_eq!(sim.now(), 103.0);
    }

    #[test]
    fn test_timer_before_frame_at_same_instant() {
        let sim = SimulatedHost::with_frame_interval(10.0);
        let log = Rc::new(RefCell::new(Vec::new()));
        sim.advance(5.0);

        let frame_log = log.clone();
        sim.frames()
            .request_frame(Box::new(move |_| frame_log.borrow_mut().push("frame")));
        let timer_log = log.clone();
        sim.timers()
            .set_timeout(5.0, Box::new(move || timer_log.borrow_mut().push("timer")));

        sim.advance(10.0);
        assert_eq!(*log.borrow(), vec!["timer", "frame"]);
    }

    #[test]
    fn test_request_on_unpainted_grid_point_runs_now() {
        let sim = SimulatedHost::with_frame_interval(10.0);
        let stamp = Rc::new(Cell::new(-1.0));

        let sink = stamp.clone();
        sim.frames().request_frame(Box::new(move |ts| sink.set(ts)));
        sim.advance(0.0);

        assert_eq!(stamp.get(), 0.0);
        assert_eq!(sim.frame_count(), 1);
    }

    #[test]
    fn test_run_until_idle_stops_at_limit() {
        let sim = SimulatedHost::new();
        sim.timers().set_timeout(5_000.0, Box::new(|| {}));

        let spent = sim.run_until_idle(1_000.0);
        assert_eq!(spent, 1_000.0);
        assert!(!sim.is_idle());

        sim.run_until_idle(10_000.0);
        assert!(sim.is_idle());
        assert_eq!(sim.now(), 5_000.0);
    }
}
