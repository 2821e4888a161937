//! Timer capability
//!
//! One-shot, cancellable "invoke this callback after N ms" timers.

use slotmap::{new_key_type, SlotMap};
use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::rc::Rc;
use std::time::Instant;

new_key_type! {
    /// Handle to a pending timer
    pub struct TimerId;
}

/// Callback invoked when a timer fires
pub type TimerCallback = Box<dyn FnOnce()>;

/// "Invoke this callback after N ms"
pub trait TimerSource {
    /// Schedule `callback` to run `delay_ms` from now
    fn set_timeout(&self, delay_ms: f64, callback: TimerCallback) -> TimerId;

    /// Cancel a pending timer
    ///
    /// Clearing an id twice, or after it fired, is a no-op.
    fn clear_timeout(&self, id: TimerId);
}

/// Heap entry for a pending timer; ordered so the earliest due, then the
/// earliest scheduled, sits on top of a max-heap
struct DueEntry {
    due: f64,
    /// Tie-breaker so timers with equal due times fire in scheduling order
    seq: u64,
    id: TimerId,
}

impl Ord for DueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .total_cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for DueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for DueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DueEntry {}

/// A host-driven timer queue
///
/// The host calls [`TimerQueue::run_due`] from its event loop; timers fire in
/// (due time, scheduling order) order. Cleared timers leave their heap entry
/// behind; it is discarded when it reaches the top.
pub struct TimerQueue {
    clock: Rc<dyn Fn() -> f64>,
    callbacks: RefCell<SlotMap<TimerId, TimerCallback>>,
    queue: RefCell<BinaryHeap<DueEntry>>,
    next_seq: Cell<u64>,
}

impl TimerQueue {
    /// Create a timer queue timed by a monotonic wall clock
    pub fn new() -> Self {
        let origin = Instant::now();
        Self::with_clock(move || origin.elapsed().as_secs_f64() * 1000.0)
    }

    /// Create a timer queue timed by a caller-supplied clock (milliseconds)
    pub fn with_clock<F>(clock: F) -> Self
    where
        F: Fn() -> f64 + 'static,
    {
        Self {
            clock: Rc::new(clock),
            callbacks: RefCell::new(SlotMap::with_key()),
            queue: RefCell::new(BinaryHeap::new()),
            next_seq: Cell::new(0),
        }
    }

    /// Due time of the earliest pending timer
    pub fn next_due(&self) -> Option<f64> {
        self.discard_cleared();
        self.queue.borrow().peek().map(|entry| entry.due)
    }

    /// Fire the earliest timer if it is due at `now`
    ///
    /// Returns `true` if a timer fired.
    pub fn fire_next_due(&self, now: f64) -> bool {
        self.discard_cleared();
        let id = {
            let mut queue = self.queue.borrow_mut();
            match queue.peek() {
                Some(entry) if entry.due <= now => queue.pop().map(|entry| entry.id),
                _ => None,
            }
        };
        let Some(id) = id else {
            return false;
        };

        // Borrow released before the callback runs so it can schedule more work
        let callback = self.callbacks.borrow_mut().remove(id);
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    /// Fire every timer due at `now`, including ones scheduled by callbacks
    /// that also fall due
    ///
    /// Returns the number of timers fired.
    pub fn run_due(&self, now: f64) -> usize {
        let mut fired = 0;
        while self.fire_next_due(now) {
            fired += 1;
        }
        fired
    }

    /// Number of pending timers
    pub fn pending_count(&self) -> usize {
        self.callbacks.borrow().len()
    }

    /// Check if any timer is pending
    pub fn has_pending(&self) -> bool {
        !self.callbacks.borrow().is_empty()
    }

    /// Pop heap entries whose timer was cleared
    fn discard_cleared(&self) {
        let callbacks = self.callbacks.borrow();
        let mut queue = self.queue.borrow_mut();
        while let Some(entry) = queue.peek() {
            if callbacks.contains_key(entry.id) {
                break;
            }
            queue.pop();
        }
    }
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerSource for TimerQueue {
    fn set_timeout(&self, delay_ms: f64, callback: TimerCallback) -> TimerId {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);

        let due = (self.clock)() + delay_ms.max(0.0);
        let id = self.callbacks.borrow_mut().insert(callback);
        self.queue.borrow_mut().push(DueEntry { due, seq, id });
        id
    }

    fn clear_timeout(&self, id: TimerId) {
        self.callbacks.borrow_mut().remove(id);
    }
}
