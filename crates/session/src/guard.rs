//! Duplicate-submission suppression.

use std::time::Duration;

use tokio::time::Instant;

/// Default minimum interval between accepted submission attempts.
pub const DEFAULT_SUBMIT_GUARD: Duration = Duration::from_secs(1);

/// Rejects submission attempts that start too soon after the previous one.
#[derive(Debug, Clone)]
pub struct SubmissionGuard {
	threshold: Duration,
	last_attempt_started_at: Option<Instant>,
}

impl Default for SubmissionGuard {
	fn default() -> Self {
		Self::new(DEFAULT_SUBMIT_GUARD)
	}
}

impl SubmissionGuard {
	/// Creates a guard with the given window.
	pub const fn new(threshold: Duration) -> Self {
		Self {
			threshold,
			last_attempt_started_at: None,
		}
	}

	/// Window length.
	pub const fn threshold(&self) -> Duration {
		self.threshold
	}

	/// Start time of the last accepted attempt.
	pub const fn last_attempt_started_at(&self) -> Option<Instant> {
		self.last_attempt_started_at
	}

	/// Accepts `now` unless it falls inside the window of the last accepted
	/// attempt. Accepted attempts restart the window; rejected ones do not.
	pub fn should_accept(&mut self, now: Instant) -> bool {
		if let Some(last) = self.last_attempt_started_at
			&& now.saturating_duration_since(last) < self.threshold
		{
			return false;
		}
		self.last_attempt_started_at = Some(now);
		true
	}

	/// Forgets the last attempt.
	pub fn reset(&mut self) {
		self.last_attempt_started_at = None;
	}
}
