//! Worker primitives shared by the draftwork crates.
//!
//! * [`TaskClass`]: classification attached to every spawned task for tracing.
//! * [`spawn`]: spawns onto the ambient tokio runtime (or a shared fallback).
//! * [`GenerationClock`] / [`GenerationToken`]: monotonic IDs paired with
//!   cancellation, used to tell live work from superseded work.
//! * [`Scheduler`] / [`TokioScheduler`]: cancellable delayed callbacks.

mod class;
mod scheduler;
mod spawn;
mod token;

pub use class::TaskClass;
pub use scheduler::{Fire, ScheduledHandle, Scheduler, TokioScheduler};
pub use spawn::spawn;
pub use token::{GenerationClock, GenerationToken};
pub use tokio_util::sync::CancellationToken;
