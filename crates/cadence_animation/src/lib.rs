//! Cadence Animation Runtime
//!
//! Drives numeric values toward targets over time on top of the host
//! capabilities in [`cadence_core`].
//!
//! # Features
//!
//! - **Tweens**: eased interpolation over a fixed duration, retargetable mid-flight
//! - **Spring Physics**: damped springs integrated on measured frame deltas
//! - **Stage Progress**: fixed-tick cursor through named, weighted stages
//! - **Stagger**: per-item delayed reveals for lists
//! - **Visibility Gating**: one-shot "seen" latch for entrance animations
//! - **Interruptible**: retargeting never jumps; springs keep their velocity
//!
//! Every primitive is created from an [`AnimationContext`] and owns its
//! pending host work. Dropping or disposing it cancels that work. Without a
//! frame or timer source, primitives publish their final state immediately.

pub mod config;
pub mod context;
pub mod easing;
pub mod error;
pub mod scheduler;
pub mod spring;
pub mod stagger;
pub mod timeline;
pub mod tween;
pub mod visibility;

pub use config::AnimationConfig;
pub use context::AnimationContext;
pub use easing::Easing;
pub use error::{AnimationError, Result};
pub use spring::{RestThreshold, Spring, SpringConfig, SpringOptions, SpringValue};
pub use stagger::{StaggerItem, StaggerOptions, StaggerSequence};
pub use timeline::{Stage, StageProgress, StageSnapshot, StageTimeline};
pub use tween::{CompletionCallback, TweenOptions, TweenValue};
pub use visibility::VisibilityGate;
