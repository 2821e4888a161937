//! Element visibility observation
//!
//! Threshold-based intersection notifications. The host reports how much of
//! an element intersects the viewport; observers are told whenever the
//! element crosses their threshold.

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::rc::Rc;

new_key_type! {
    /// Handle to a registered observation
    pub struct ObservationId;
}

/// Host-assigned element identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

/// Callback receiving the element's current in-view state
pub type VisibilityCallback = Rc<dyn Fn(bool)>;

/// Threshold-based intersection notifications
pub trait VisibilityObserver {
    /// Start observing `element`
    ///
    /// `callback` runs with `true` when the element's intersection ratio
    /// reaches `threshold` and with `false` when it drops below.
    fn observe(
        &self,
        element: ElementId,
        threshold: f32,
        callback: VisibilityCallback,
    ) -> ObservationId;

    /// Stop an observation. Unobserving twice is a no-op.
    fn unobserve(&self, id: ObservationId);
}

struct Observation {
    element: ElementId,
    threshold: f32,
    callback: VisibilityCallback,
    /// Last state delivered to the callback
    delivered: Option<bool>,
}

/// Decide whether an intersection ratio counts as in view for a threshold
pub fn is_intersecting(ratio: f32, threshold: f32) -> bool {
    ratio > 0.0 && ratio >= threshold
}

/// A host-fed visibility observer
///
/// The host calls [`VisibilityRegistry::report`] with each element's
/// intersection ratio (0.0 to 1.0).
#[derive(Default)]
pub struct VisibilityRegistry {
    observations: RefCell<SlotMap<ObservationId, Observation>>,
    by_element: RefCell<FxHashMap<ElementId, SmallVec<[ObservationId; 2]>>>,
    ratios: RefCell<FxHashMap<ElementId, f32>>,
}

impl VisibilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report an element's intersection ratio
    ///
    /// Observers are notified only when their in-view state changes.
    pub fn report(&self, element: ElementId, ratio: f32) {
        self.ratios.borrow_mut().insert(element, ratio);

        let ids: SmallVec<[ObservationId; 2]> = self
            .by_element
            .borrow()
            .get(&element)
            .cloned()
            .unwrap_or_default();

        for id in ids {
            self.deliver(id, ratio);
        }
    }

    /// Last reported ratio for an element
    pub fn ratio(&self, element: ElementId) -> Option<f32> {
        self.ratios.borrow().get(&element).copied()
    }

    /// Number of live observations
    pub fn observation_count(&self) -> usize {
        self.observations.borrow().len()
    }

    /// Number of live observations of a given element
    pub fn observers_of(&self, element: ElementId) -> usize {
        self.by_element
            .borrow()
            .get(&element)
            .map_or(0, |ids| ids.len())
    }

    fn deliver(&self, id: ObservationId, ratio: f32) {
        let (callback, in_view) = {
            let mut observations = self.observations.borrow_mut();
            let Some(observation) = observations.get_mut(id) else {
                // Unobserved by an earlier callback in this report
                return;
            };
            let in_view = is_intersecting(ratio, observation.threshold);
            if observation.delivered == Some(in_view) {
                return;
            }
            observation.delivered = Some(in_view);
            (observation.callback.clone(), in_view)
        };

        callback(in_view);
    }
}

impl VisibilityObserver for VisibilityRegistry {
    fn observe(
        &self,
        element: ElementId,
        threshold: f32,
        callback: VisibilityCallback,
    ) -> ObservationId {
        let id = self.observations.borrow_mut().insert(Observation {
            element,
            threshold,
            callback,
            delivered: None,
        });
        self.by_element
            .borrow_mut()
            .entry(element)
            .or_default()
            .push(id);

        // An element with a known ratio gets its initial state right away
        let known = self.ratio(element);
        if let Some(ratio) = known {
            self.deliver(id, ratio);
        }

        id
    }

    fn unobserve(&self, id: ObservationId) {
        let Some(observation) = self.observations.borrow_mut().remove(id) else {
            return;
        };

        let mut by_element = self.by_element.borrow_mut();
        if let Some(ids) = by_element.get_mut(&observation.element) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                by_element.remove(&observation.element);
            }
        }
    }
}
