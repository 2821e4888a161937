//! Cadence Core Runtime
//!
//! Host capabilities consumed by the Cadence animation primitives:
//!
//! - **Frame Source**: "invoke this callback before the next paint", cancellable
//! - **Timers**: "invoke this callback after N ms", cancellable
//! - **Visibility Observation**: threshold-based intersection notifications
//! - **Signals**: reactive value containers that notify subscribers on change
//!
//! Everything here is single-threaded and cooperative. Capabilities are
//! injected as `Rc<dyn _>` trait objects bundled in a [`Host`], so the same
//! animation code runs against a real render loop or a [`SimulatedHost`].
//!
//! # Example
//!
//! ```rust
//! use cadence_core::{Signal, SimulatedHost, TimerSource};
//!
//! let sim = SimulatedHost::new();
//! let fired = Signal::new(false);
//!
//! let flag = fired.clone();
//! sim.timers().set_timeout(100.0, Box::new(move || {
//!     flag.set(true);
//! }));
//!
//! sim.advance(99.0);
//! assert!(!fired.get());
//! sim.advance(1.0);
//! assert!(fired.get());
//! ```

pub mod frame;
pub mod host;
pub mod signal;
pub mod sim;
pub mod timer;
pub mod visibility;

pub use frame::{FrameCallback, FrameLoop, FrameRequestId, FrameSource};
pub use host::Host;
pub use signal::{Signal, SubscriptionId};
pub use sim::SimulatedHost;
pub use timer::{TimerCallback, TimerId, TimerQueue, TimerSource};
pub use visibility::{
    ElementId, ObservationId, VisibilityCallback, VisibilityObserver, VisibilityRegistry,
};
