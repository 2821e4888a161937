//! Staged progress timelines
//!
//! A [`StageTimeline`] walks a cursor through named, duration-weighted stages
//! (a multi-phase sync, an install, an upload). [`StageProgress`] drives one
//! from a fixed-tick host timer and publishes a [`StageSnapshot`] after every
//! tick.

use crate::context::AnimationContext;
use crate::error::{check_duration, Result};
use crate::scheduler::{Generation, Scheduled, WorkSlot};
use cadence_core::{Host, Signal};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// One named phase of a timeline
#[derive(Clone, Debug, PartialEq)]
pub struct Stage {
    pub name: String,
    pub duration_ms: f64,
}

impl Stage {
    pub fn new(name: impl Into<String>, duration_ms: f64) -> Self {
        Self {
            name: name.into(),
            duration_ms,
        }
    }
}

/// Published state of a stage timeline
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StageSnapshot {
    /// Percentage, 0.0 to 100.0
    pub progress: f32,
    pub current_stage: Option<String>,
    pub current_stage_index: Option<usize>,
    pub is_complete: bool,
    pub is_active: bool,
}

/// Cursor over a list of stages
///
/// Host-free; time only moves through [`StageTimeline::advance`].
#[derive(Clone, Debug)]
pub struct StageTimeline {
    stages: Vec<Stage>,
    /// Cumulative end of each stage
    boundaries: Vec<f64>,
    total_ms: f64,
    elapsed_ms: f64,
    current_index: usize,
    active: bool,
    complete: bool,
}

impl StageTimeline {
    pub fn new(stages: Vec<Stage>) -> Result<Self> {
        let mut boundaries = Vec::with_capacity(stages.len());
        let mut total_ms = 0.0;
        for stage in &stages {
            total_ms += check_duration("stage duration", stage.duration_ms)?;
            boundaries.push(total_ms);
        }

        Ok(Self {
            stages,
            boundaries,
            total_ms,
            elapsed_ms: 0.0,
            current_index: 0,
            active: false,
            complete: false,
        })
    }

    /// Reset and start running
    ///
    /// A timeline with nothing to wait for completes right away.
    pub fn start(&mut self) {
        self.reset();
        self.active = true;
        self.sync();
    }

    /// Stop running, keeping elapsed time and stage as they are
    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn reset(&mut self) {
        self.elapsed_ms = 0.0;
        self.current_index = 0;
        self.complete = false;
    }

    /// Add `dt_ms` of elapsed time while running
    ///
    /// Returns `true` while the timeline still needs ticks.
    pub fn advance(&mut self, dt_ms: f64) -> bool {
        if !self.is_running() {
            return false;
        }
        if dt_ms.is_finite() && dt_ms > 0.0 {
            self.elapsed_ms = (self.elapsed_ms + dt_ms).min(self.total_ms);
        }
        self.sync();
        self.is_running()
    }

    /// Jump to the end
    pub fn finish(&mut self) {
        self.elapsed_ms = self.total_ms;
        self.sync();
    }

    fn sync(&mut self) {
        // Zero-length stages have a boundary equal to the previous one and
        // are passed over here
        while self.current_index + 1 < self.stages.len()
            && self.elapsed_ms >= self.boundaries[self.current_index]
        {
            self.current_index += 1;
        }
        if self.elapsed_ms >= self.total_ms {
            self.complete = true;
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_running(&self) -> bool {
        self.active && !self.complete
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    pub fn total_ms(&self) -> f64 {
        self.total_ms
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Percentage of total duration elapsed, 0.0 to 100.0
    pub fn progress(&self) -> f32 {
        if self.total_ms <= 0.0 {
            return if self.complete { 100.0 } else { 0.0 };
        }
        ((self.elapsed_ms / self.total_ms).clamp(0.0, 1.0) * 100.0) as f32
    }

    pub fn current_stage_index(&self) -> Option<usize> {
        (!self.stages.is_empty()).then_some(self.current_index)
    }

    pub fn current_stage(&self) -> Option<&Stage> {
        self.stages.get(self.current_index)
    }

    pub fn snapshot(&self) -> StageSnapshot {
        StageSnapshot {
            progress: self.progress(),
            current_stage: self.current_stage().map(|stage| stage.name.clone()),
            current_stage_index: self.current_stage_index(),
            is_complete: self.complete,
            is_active: self.active,
        }
    }
}

// ============================================================================
// Host-driven stage progress
// ============================================================================

struct StageState {
    timeline: StageTimeline,
    generation: Generation,
    work: WorkSlot,
    disposed: bool,
}

struct StageInner {
    host: Host,
    tick_ms: f64,
    snapshot: Signal<StageSnapshot>,
    state: RefCell<StageState>,
}

/// A stage timeline ticking on a host timer while active
pub struct StageProgress {
    inner: Rc<StageInner>,
}

impl StageProgress {
    pub fn new(ctx: &AnimationContext, stages: Vec<Stage>, is_active: bool) -> Result<Self> {
        let timeline = StageTimeline::new(stages)?;
        let snapshot = Signal::new(timeline.snapshot());

        let progress = Self {
            inner: Rc::new(StageInner {
                host: ctx.host().clone(),
                tick_ms: ctx.config().stage_tick_ms,
                snapshot,
                state: RefCell::new(StageState {
                    timeline,
                    generation: Generation::default(),
                    work: WorkSlot::new(),
                    disposed: false,
                }),
            }),
        };
        if is_active {
            progress.set_active(true);
        }
        Ok(progress)
    }

    /// Start or stop the timeline
    ///
    /// Activating always starts from the beginning; deactivating freezes the
    /// published snapshot.
    pub fn set_active(&self, active: bool) {
        let inner = &self.inner;
        let generation = {
            let mut state = inner.state.borrow_mut();
            if state.disposed || state.timeline.is_active() == active {
                return;
            }
            state.work.cancel(&inner.host);
            let generation = state.generation.advance();

            if active {
                state.timeline.start();
                if state.timeline.is_running() && inner.host.timers().is_none() {
                    tracing::debug!("StageProgress: no timer source, completing immediately");
                    state.timeline.finish();
                }
            } else {
                state.timeline.stop();
            }
            tracing::debug!(
                "StageProgress: {} ({} stages, {}ms)",
                if active { "activated" } else { "deactivated" },
                state.timeline.stages().len(),
                state.timeline.total_ms()
            );
            state.timeline.is_running().then_some(generation)
        };

        publish(inner);
        if let Some(generation) = generation {
            schedule_tick(inner, generation);
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.state.borrow().timeline.is_active()
    }

    /// The reactive container snapshots are published through
    pub fn signal(&self) -> Signal<StageSnapshot> {
        self.inner.snapshot.clone()
    }

    pub fn snapshot(&self) -> StageSnapshot {
        self.inner.snapshot.get()
    }

    pub fn progress(&self) -> f32 {
        self.inner.snapshot.with(|snapshot| snapshot.progress)
    }

    pub fn current_stage(&self) -> Option<String> {
        self.inner
            .snapshot
            .with(|snapshot| snapshot.current_stage.clone())
    }

    pub fn is_complete(&self) -> bool {
        self.inner.snapshot.with(|snapshot| snapshot.is_complete)
    }

    /// Cancel the pending tick; later activations are ignored
    pub fn dispose(&self) {
        let mut state = self.inner.state.borrow_mut();
        if state.disposed {
            return;
        }
        state.work.cancel(&self.inner.host);
        state.generation.advance();
        state.disposed = true;
    }
}

impl Drop for StageProgress {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for StageProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageProgress")
            .field("snapshot", &self.inner.snapshot.get())
            .finish()
    }
}

fn publish(inner: &StageInner) {
    let snapshot = inner.state.borrow().timeline.snapshot();
    inner.snapshot.set(snapshot);
}

fn schedule_tick(inner: &Rc<StageInner>, generation: Generation) {
    let Some(timers) = inner.host.timers() else {
        return;
    };

    let weak: Weak<StageInner> = Rc::downgrade(inner);
    let id = timers.set_timeout(
        inner.tick_ms,
        Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                on_tick(&inner, generation);
            }
        }),
    );

    let mut state = inner.state.borrow_mut();
    if state.generation == generation {
        state.work.replace(&inner.host, Scheduled::Timer(id));
    } else {
        Scheduled::Timer(id).cancel(&inner.host);
    }
}

fn on_tick(inner: &Rc<StageInner>, generation: Generation) {
    let running = {
        let mut state = inner.state.borrow_mut();
        if state.generation != generation {
            return;
        }
        state.work.clear();
        let running = state.timeline.advance(inner.tick_ms);
        if !running {
            tracing::debug!("StageProgress: complete");
        }
        running
    };

    publish(inner);
    if running {
        schedule_tick(inner, generation);
    }
}
