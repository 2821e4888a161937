//! Visibility-gated playback
//!
//! A [`VisibilityGate`] watches one element through the host's visibility
//! observer. `is_in_view` follows the element in and out of the viewport;
//! `has_animated` latches the first time it is seen and stays set for as
//! long as the same element is attached. Callers hang entrance animations
//! off [`VisibilityGate::on_first_visible`].

use crate::context::AnimationContext;
use crate::error::{AnimationError, Result};
use crate::scheduler::Generation;
use cadence_core::{ElementId, Host, ObservationId, Signal, VisibilityCallback};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type FirstVisibleCallback = Box<dyn FnOnce()>;

struct GateState {
    element: Option<ElementId>,
    observation: Option<ObservationId>,
    /// Element that tripped the latch
    latched_for: Option<ElementId>,
    generation: Generation,
    waiting: SmallVec<[FirstVisibleCallback; 2]>,
    disposed: bool,
}

struct GateInner {
    host: Host,
    threshold: f32,
    is_in_view: Signal<bool>,
    has_animated: Signal<bool>,
    state: RefCell<GateState>,
}

/// One-shot visibility latch over a host visibility observer
pub struct VisibilityGate {
    inner: Rc<GateInner>,
}

impl VisibilityGate {
    /// Create a detached gate
    ///
    /// `threshold` is the fraction of the element (0.0 to 1.0) that must
    /// intersect the viewport for it to count as in view.
    pub fn new(ctx: &AnimationContext, threshold: f32) -> Result<Self> {
        if !(threshold.is_finite() && (0.0..=1.0).contains(&threshold)) {
            return Err(AnimationError::InvalidThreshold(threshold));
        }

        Ok(Self {
            inner: Rc::new(GateInner {
                host: ctx.host().clone(),
                threshold,
                is_in_view: Signal::new(false),
                has_animated: Signal::new(false),
                state: RefCell::new(GateState {
                    element: None,
                    observation: None,
                    latched_for: None,
                    generation: Generation::default(),
                    waiting: SmallVec::new(),
                    disposed: false,
                }),
            }),
        })
    }

    /// Attach to `element` and start observing it
    ///
    /// A different element starts over with both flags cleared. Attaching
    /// the element that already tripped the latch keeps it.
    pub fn attach(&self, element: ElementId) {
        let reset = {
            let mut state = self.inner.state.borrow_mut();
            if state.disposed || state.element == Some(element) {
                return;
            }
            stop_observing(&self.inner.host, &mut state);
            state.element = Some(element);

            let reset = state.latched_for != Some(element);
            if reset {
                state.latched_for = None;
            }
            reset
        };

        tracing::debug!("VisibilityGate: attached to {:?}", element);
        self.inner.is_in_view.set(false);
        if reset {
            self.inner.has_animated.set(false);
        }
        start_observing(&self.inner);
    }

    /// Stop observing and forget the element
    ///
    /// Detaching twice is a no-op.
    pub fn detach(&self) {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.element.take().is_none() {
                return;
            }
            stop_observing(&self.inner.host, &mut state);
        }
        self.inner.is_in_view.set(false);
    }

    /// Make sure the attached element is being observed
    ///
    /// Fails when no element is attached.
    pub fn observe(&self) -> Result<()> {
        {
            let state = self.inner.state.borrow();
            if state.element.is_none() {
                return Err(AnimationError::DetachedObserver);
            }
            if state.disposed || state.observation.is_some() {
                return Ok(());
            }
        }
        start_observing(&self.inner);
        Ok(())
    }

    /// Run `callback` once, the first time the element is seen
    ///
    /// Runs right away when the latch has already tripped.
    pub fn on_first_visible<F>(&self, callback: F)
    where
        F: FnOnce() + 'static,
    {
        if self.has_animated() {
            callback();
            return;
        }
        let mut state = self.inner.state.borrow_mut();
        if !state.disposed {
            state.waiting.push(Box::new(callback));
        }
    }

    pub fn is_in_view(&self) -> bool {
        self.inner.is_in_view.get()
    }

    pub fn has_animated(&self) -> bool {
        self.inner.has_animated.get()
    }

    pub fn in_view_signal(&self) -> Signal<bool> {
        self.inner.is_in_view.clone()
    }

    pub fn has_animated_signal(&self) -> Signal<bool> {
        self.inner.has_animated.clone()
    }

    pub fn element(&self) -> Option<ElementId> {
        self.inner.state.borrow().element
    }

    pub fn threshold(&self) -> f32 {
        self.inner.threshold
    }

    pub fn is_observing(&self) -> bool {
        self.inner.state.borrow().observation.is_some()
    }

    /// Unregister the observation and drop waiting callbacks
    pub fn dispose(&self) {
        let waiting = {
            let mut state = self.inner.state.borrow_mut();
            if state.disposed {
                return;
            }
            stop_observing(&self.inner.host, &mut state);
            state.element = None;
            state.disposed = true;
            std::mem::take(&mut state.waiting)
        };
        drop(waiting);
    }
}

impl Drop for VisibilityGate {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for VisibilityGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisibilityGate")
            .field("element", &self.element())
            .field("threshold", &self.inner.threshold)
            .field("is_in_view", &self.is_in_view())
            .field("has_animated", &self.has_animated())
            .finish()
    }
}

fn stop_observing(host: &Host, state: &mut GateState) {
    state.generation.advance();
    if let Some(id) = state.observation.take() {
        if let Some(observer) = host.visibility() {
            observer.unobserve(id);
        }
    }
}

fn start_observing(inner: &Rc<GateInner>) {
    let (element, generation) = {
        let mut state = inner.state.borrow_mut();
        let Some(element) = state.element else {
            return;
        };
        (element, state.generation.advance())
    };

    let Some(observer) = inner.host.visibility() else {
        tracing::debug!("VisibilityGate: no visibility observer, treating as visible");
        on_visibility(inner, generation, true);
        return;
    };

    let weak: Weak<GateInner> = Rc::downgrade(inner);
    let callback: VisibilityCallback = Rc::new(move |in_view| {
        if let Some(inner) = weak.upgrade() {
            on_visibility(&inner, generation, in_view);
        }
    });
    // The observer may report the initial state before returning
    let id = observer.observe(element, inner.threshold, callback);

    let mut state = inner.state.borrow_mut();
    if state.generation == generation {
        state.observation = Some(id);
    } else {
        observer.unobserve(id);
    }
}

fn on_visibility(inner: &Rc<GateInner>, generation: Generation, in_view: bool) {
    let tripped = {
        let mut state = inner.state.borrow_mut();
        if state.generation != generation {
            return;
        }
        if in_view && state.latched_for.is_none() {
            state.latched_for = state.element;
            Some(std::mem::take(&mut state.waiting))
        } else {
            None
        }
    };

    inner.is_in_view.set(in_view);
    if let Some(waiting) = tripped {
        tracing::debug!("VisibilityGate: first visible");
        inner.has_animated.set(true);
        for callback in waiting {
            callback();
        }
    }
}
