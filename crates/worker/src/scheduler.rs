//! Cancellable delayed callbacks.
//!
//! A [`Scheduler`] runs a callback once after a delay unless the supplied
//! [`GenerationToken`] is cancelled first. The returned [`ScheduledHandle`]
//! owns the timer: cancelling or dropping it guarantees the callback never
//! runs afterwards, so replacing a handle is enough to supersede a timer.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::AbortHandle;

use crate::{GenerationToken, TaskClass, spawn};

/// Callback invoked when a scheduled delay elapses.
pub type Fire = Box<dyn FnOnce() + Send + 'static>;

/// Source of cancellable delayed callbacks.
pub trait Scheduler: Send + Sync + 'static {
	/// Runs `fire` after `delay` unless `token` is cancelled first.
	fn schedule(&self, delay: Duration, token: GenerationToken, fire: Fire) -> ScheduledHandle;
}

impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
	fn schedule(&self, delay: Duration, token: GenerationToken, fire: Fire) -> ScheduledHandle {
		(**self).schedule(delay, token, fire)
	}
}

/// Owning handle for one scheduled callback.
///
/// Dropping the handle cancels the callback.
pub struct ScheduledHandle {
	token: GenerationToken,
	abort: Option<AbortHandle>,
}

impl ScheduledHandle {
	/// Wraps a token and the task driving it.
	pub fn new(token: GenerationToken, abort: Option<AbortHandle>) -> Self {
		Self { token, abort }
	}

	/// Generation of the scheduled work.
	pub const fn generation(&self) -> u64 {
		self.token.generation()
	}

	/// Returns true once the callback can no longer run.
	pub fn is_cancelled(&self) -> bool {
		self.token.is_cancelled()
	}

	/// Cancels the callback. Idempotent.
	pub fn cancel(&self) {
		self.token.cancel();
		if let Some(abort) = &self.abort {
			abort.abort();
		}
	}
}

impl Drop for ScheduledHandle {
	fn drop(&mut self) {
		self.cancel();
	}
}

impl fmt::Debug for ScheduledHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ScheduledHandle")
			.field("generation", &self.token.generation())
			.field("cancelled", &self.token.is_cancelled())
			.finish()
	}
}

/// [`Scheduler`] backed by `tokio::time::sleep` on a spawned timer task.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

impl TokioScheduler {
	/// Creates a tokio-backed scheduler.
	pub const fn new() -> Self {
		Self
	}
}

impl Scheduler for TokioScheduler {
	fn schedule(&self, delay: Duration, token: GenerationToken, fire: Fire) -> ScheduledHandle {
		let task_token = token.clone();
		let join = spawn(TaskClass::Timer, async move {
			let generation = task_token.generation();
			tokio::select! {
				biased;
				() = task_token.cancelled() => {
					tracing::trace!(generation, "scheduler.cancelled");
				}
				() = tokio::time::sleep(delay) => {
					if task_token.is_cancelled() {
						tracing::trace!(generation, "scheduler.cancelled_at_expiry");
					} else {
						tracing::trace!(generation, delay_ms = delay.as_millis() as u64, "scheduler.fire");
						fire();
					}
				}
			}
		});
		ScheduledHandle::new(token, Some(join.abort_handle()))
	}
}
