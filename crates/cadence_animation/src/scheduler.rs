//! Scheduled work bookkeeping
//!
//! Every primitive owns its pending host work through these types:
//!
//! - [`Generation`]: bumped on every retarget, restart and disposal. Each
//!   scheduled callback captures the generation it was scheduled under and
//!   does nothing once that generation is stale.
//! - [`WorkSlot`]: at most one pending frame or timer. Scheduling into an
//!   occupied slot cancels the old work first.

use cadence_core::{FrameRequestId, Host, TimerId};

/// A unit of pending host work
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scheduled {
    Frame(FrameRequestId),
    Timer(TimerId),
}

impl Scheduled {
    /// Cancel this work with the host that scheduled it
    pub fn cancel(self, host: &Host) {
        match self {
            Scheduled::Frame(id) => {
                if let Some(frames) = host.frames() {
                    frames.cancel_frame(id);
                }
            }
            Scheduled::Timer(id) => {
                if let Some(timers) = host.timers() {
                    timers.clear_timeout(id);
                }
            }
        }
    }
}

/// Per-handle generation counter
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

impl Generation {
    /// Move to a new generation, invalidating callbacks captured under the old one
    pub fn advance(&mut self) -> Generation {
        self.0 += 1;
        *self
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// Holds at most one pending unit of work
#[derive(Debug, Default)]
pub struct WorkSlot {
    pending: Option<Scheduled>,
}

impl WorkSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store new work, cancelling whatever was pending
    pub fn replace(&mut self, host: &Host, work: Scheduled) {
        self.cancel(host);
        self.pending = Some(work);
    }

    /// Cancel pending work; a no-op when nothing is pending
    pub fn cancel(&mut self, host: &Host) {
        if let Some(work) = self.pending.take() {
            work.cancel(host);
        }
    }

    /// Forget pending work that has just run
    pub fn clear(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<Scheduled> {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{FrameSource, SimulatedHost, TimerSource};
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_generation_advances() {
        let mut generation = Generation::default();
        let first = generation.advance();
        let second = generation.advance();
        assert!(second > first);
        assert_eq!(generation, second);
        assert_eq!(second.value(), 2);
    }

    #[test]
    fn test_replace_cancels_previous_work() {
        let sim = SimulatedHost::new();
        let host = sim.host();
        let fired = Rc::new(Cell::new(0));

        let mut slot = WorkSlot::new();
        let first = fired.clone();
        let id = sim
            .timers()
            .set_timeout(10.0, Box::new(move || first.set(first.get() + 1)));
        slot.replace(&host, Scheduled::Timer(id));

        let second = fired.clone();
        let id = sim
            .frames()
            .request_frame(Box::new(move |_| second.set(second.get() + 10)));
        slot.replace(&host, Scheduled::Frame(id));

        sim.advance(100.0);
        assert_eq!(fired.get(), 10);
    }

    #[test]
    fn test_cancel_twice_is_noop() {
        let sim = SimulatedHost::new();
        let host = sim.host();
        let mut slot = WorkSlot::new();

        let id = sim.timers().set_timeout(10.0, Box::new(|| {}));
        slot.replace(&host, Scheduled::Timer(id));

        slot.cancel(&host);
        slot.cancel(&host);
        Scheduled::Timer(id).cancel(&host);

        assert!(!slot.is_pending());
        assert!(sim.is_idle());
    }
}
