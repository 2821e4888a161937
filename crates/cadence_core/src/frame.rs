//! Frame source capability
//!
//! A frame source runs callbacks just before the next paint. Hosts either
//! implement [`FrameSource`] over their own render loop, or own a
//! [`FrameLoop`] and call [`FrameLoop::run_frame`] once per redraw.

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Instant;

new_key_type! {
    /// Handle to a pending frame request
    pub struct FrameRequestId;
}

/// Callback invoked with the frame timestamp (milliseconds)
pub type FrameCallback = Box<dyn FnOnce(f64)>;

/// "Invoke this callback before the next paint"
pub trait FrameSource {
    /// Current host time in milliseconds, on the same clock as frame timestamps
    fn now(&self) -> f64;

    /// Schedule `callback` to run on the next frame
    fn request_frame(&self, callback: FrameCallback) -> FrameRequestId;

    /// Cancel a pending request
    ///
    /// Cancelling an id twice, or after its callback already ran, is a no-op.
    fn cancel_frame(&self, id: FrameRequestId);
}

/// A host-driven frame source
///
/// Requests made while a frame is running are deferred to the following
/// frame, so an animation that re-requests from its own callback advances
/// exactly once per frame.
pub struct FrameLoop {
    clock: Rc<dyn Fn() -> f64>,
    pending: RefCell<SlotMap<FrameRequestId, FrameCallback>>,
    /// Request order; may contain ids that were cancelled since
    order: RefCell<Vec<FrameRequestId>>,
    frame_count: Cell<u64>,
}

impl FrameLoop {
    /// Create a frame loop timed by a monotonic wall clock
    pub fn new() -> Self {
        let origin = Instant::now();
        Self::with_clock(move || origin.elapsed().as_secs_f64() * 1000.0)
    }

    /// Create a frame loop timed by a caller-supplied clock (milliseconds)
    pub fn with_clock<F>(clock: F) -> Self
    where
        F: Fn() -> f64 + 'static,
    {
        Self {
            clock: Rc::new(clock),
            pending: RefCell::new(SlotMap::with_key()),
            order: RefCell::new(Vec::new()),
            frame_count: Cell::new(0),
        }
    }

    /// Run every callback requested before this call
    ///
    /// Returns the number of callbacks invoked.
    pub fn run_frame(&self, timestamp: f64) -> usize {
        let batch: SmallVec<[FrameRequestId; 8]> = self.order.take().into_iter().collect();
        self.frame_count.set(self.frame_count.get() + 1);

        let mut ran = 0;
        for id in batch {
            // Removed one at a time: an earlier callback may cancel a later one
            let callback = self.pending.borrow_mut().remove(id);
            if let Some(callback) = callback {
                callback(timestamp);
                ran += 1;
            }
        }

        if ran > 0 {
            tracing::trace!("FrameLoop: ran {} callbacks at {:.1}ms", ran, timestamp);
        }
        ran
    }

    /// Check if any callback is waiting for the next frame
    pub fn has_pending(&self) -> bool {
        !self.pending.borrow().is_empty()
    }

    /// Number of callbacks waiting for the next frame
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Number of frames run so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count.get()
    }
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for FrameLoop {
    fn now(&self) -> f64 {
        (self.clock)()
    }

    fn request_frame(&self, callback: FrameCallback) -> FrameRequestId {
        let id = self.pending.borrow_mut().insert(callback);
        self.order.borrow_mut().push(id);
        id
    }

    fn cancel_frame(&self, id: FrameRequestId) {
        if self.pending.borrow_mut().remove(id).is_some() {
            self.order.borrow_mut().retain(|pending| *pending != id);
        }
    }
}
