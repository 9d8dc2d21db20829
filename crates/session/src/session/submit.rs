use std::future::Future;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::FormSession;
use crate::error::{BoxError, SubmitError};
use crate::record::Record;
use crate::snapshot::SubmitPhase;

/// How a submission attempt ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
	/// The submit hook succeeded and the record is clean.
	Submitted,
	/// Validation failed; nothing was committed.
	Invalid {
		/// Number of messages the validation pass produced.
		messages: usize,
	},
	/// Rejected by the duplicate-submission window.
	Duplicate,
	/// The session was torn down before the attempt completed.
	Cancelled,
}

impl<R: Record> FormSession<R> {
	/// Runs the submission pipeline.
	///
	/// Validates, applies the duplicate-submission window, then calls the
	/// pre-submit hook, normalizes, commits, and calls the post-submit hook.
	/// A hook failure is reported to the post-submit hook with
	/// `success = false` and returned as an error; the session stays usable.
	/// Teardown during an attempt ends it with [`SubmitOutcome::Cancelled`]
	/// and skips the post-submit hook.
	pub async fn submit(&mut self) -> Result<SubmitOutcome, SubmitError> {
		if self.ensure_live().is_err() {
			return Ok(SubmitOutcome::Cancelled);
		}

		self.enter(SubmitPhase::Validating, false);
		let messages = self.validation.validate(&self.record);
		let invalid = messages.len();
		self.publish(|snapshot| snapshot.messages = messages);
		if invalid > 0 {
			debug!(messages = invalid, "submit.invalid");
			self.enter(SubmitPhase::Idle, false);
			return Ok(SubmitOutcome::Invalid { messages: invalid });
		}

		self.enter(SubmitPhase::GuardCheck, false);
		if !self.guard.should_accept(Instant::now()) {
			debug!(window = ?self.guard.threshold(), "submit.rejected_duplicate");
			self.enter(SubmitPhase::Idle, false);
			return Ok(SubmitOutcome::Duplicate);
		}

		let submitter = Arc::clone(&self.submitter);

		self.enter(SubmitPhase::PreSubmit, true);
		let pre = self.until_cancelled(submitter.pre_submit(&self.record)).await;
		match pre {
			None => return Ok(self.abandon()),
			Some(Err(error)) => return Err(self.fail(SubmitError::PreSubmit(error)).await),
			Some(Ok(())) => {}
		}

		self.enter(SubmitPhase::Normalizing, true);
		match self
			.options
			.normalization
			.apply_to(&mut self.record, self.metadata.as_ref())
		{
			Ok(rewritten) if rewritten > 0 => debug!(rewritten, "submit.normalized"),
			Ok(_) => {}
			Err(error) => return Err(self.fail(error.into()).await),
		}

		self.enter(SubmitPhase::Committing, true);
		let committed = self.until_cancelled(submitter.submit(&self.record)).await;
		match committed {
			None => Ok(self.abandon()),
			Some(Err(error)) => Err(self.fail(SubmitError::Commit(error)).await),
			Some(Ok(())) => {
				self.enter(SubmitPhase::PostSubmit, true);
				submitter.post_submit(&self.record, true).await;
				self.tracker.mark_unchanged();
				self.enter(SubmitPhase::Idle, false);
				info!(record = ?self.record.id(), "submit.committed");
				Ok(SubmitOutcome::Submitted)
			}
		}
	}

	fn enter(&mut self, phase: SubmitPhase, processing: bool) {
		self.publish(|snapshot| {
			snapshot.phase = phase;
			snapshot.processing = processing;
		});
	}

	async fn until_cancelled<T>(&self, fut: impl Future<Output = Result<T, BoxError>>) -> Option<Result<T, BoxError>> {
		tokio::select! {
			biased;
			() = self.cancel.cancelled() => None,
			result = fut => Some(result),
		}
	}

	/// Cancelled mid-flight: leave `has_changes` as it was and finish the teardown.
	fn abandon(&mut self) -> SubmitOutcome {
		debug!(phase = self.phase().as_str(), "submit.cancelled");
		self.teardown();
		SubmitOutcome::Cancelled
	}

	async fn fail(&mut self, error: SubmitError) -> SubmitError {
		warn!(%error, "submit.failed");
		self.enter(SubmitPhase::PostSubmit, true);
		let submitter = Arc::clone(&self.submitter);
		submitter.post_submit(&self.record, false).await;
		self.enter(SubmitPhase::Idle, false);
		error
	}
}
