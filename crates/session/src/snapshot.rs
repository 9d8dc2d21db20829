//! Read-only session state published to the page layer.

use std::sync::Arc;

use tokio::sync::watch;

use crate::validation::{ValidationMessage, ValidationMessages};

/// Position in the submission pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmitPhase {
	/// No submission running.
	#[default]
	Idle,
	/// Running the validation pass.
	Validating,
	/// Checking the duplicate-submission window.
	GuardCheck,
	/// Awaiting the pre-submit hook.
	PreSubmit,
	/// Normalizing text fields.
	Normalizing,
	/// Awaiting the submit hook.
	Committing,
	/// Awaiting the post-submit hook.
	PostSubmit,
}

impl SubmitPhase {
	/// Stable name for logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Idle => "idle",
			Self::Validating => "validating",
			Self::GuardCheck => "guard_check",
			Self::PreSubmit => "pre_submit",
			Self::Normalizing => "normalizing",
			Self::Committing => "committing",
			Self::PostSubmit => "post_submit",
		}
	}
}

/// Complete view of the session at one revision.
///
/// Each publish replaces the whole value, so readers never observe a message
/// set mixing two validation passes.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
	/// Increments on every publish; each publish is a render request.
	pub revision: u64,
	/// Unsaved changes since the last reset or successful submit.
	pub has_changes: bool,
	/// A submission is between acceptance and completion.
	pub processing: bool,
	/// Current pipeline phase.
	pub phase: SubmitPhase,
	/// Messages from the latest validation pass.
	pub messages: ValidationMessages,
	/// Autosaves waiting for their delay or for a predecessor.
	pub pending_autosaves: usize,
	/// Autosave commits currently running.
	pub inflight_autosaves: usize,
	/// The session is gone; this is the final snapshot.
	pub torn_down: bool,
}

impl Default for SessionSnapshot {
	fn default() -> Self {
		Self {
			revision: 0,
			has_changes: false,
			processing: false,
			phase: SubmitPhase::Idle,
			messages: Arc::from(Vec::<ValidationMessage>::new()),
			pending_autosaves: 0,
			inflight_autosaves: 0,
			torn_down: false,
		}
	}
}

impl SessionSnapshot {
	/// No validation messages are active.
	pub fn is_valid(&self) -> bool {
		self.messages.is_empty()
	}
}

/// Publisher side of the snapshot channel.
#[derive(Debug)]
pub(crate) struct SnapshotPublisher {
	tx: Option<watch::Sender<SessionSnapshot>>,
	current: SessionSnapshot,
}

impl SnapshotPublisher {
	pub(crate) fn new() -> Self {
		let (tx, _rx) = watch::channel(SessionSnapshot::default());
		Self {
			tx: Some(tx),
			current: SessionSnapshot::default(),
		}
	}

	pub(crate) fn current(&self) -> &SessionSnapshot {
		&self.current
	}

	pub(crate) fn subscribe(&self) -> Option<watch::Receiver<SessionSnapshot>> {
		self.tx.as_ref().map(watch::Sender::subscribe)
	}

	/// Applies `update` and publishes the result as a new revision.
	pub(crate) fn publish(&mut self, update: impl FnOnce(&mut SessionSnapshot)) {
		update(&mut self.current);
		self.current.revision = self.current.revision.wrapping_add(1);
		if let Some(tx) = &self.tx {
			tx.send_replace(self.current.clone());
		}
	}

	/// Publishes a final snapshot and drops the sender so receivers observe closure.
	pub(crate) fn close(&mut self, update: impl FnOnce(&mut SessionSnapshot)) {
		if self.tx.is_none() {
			return;
		}
		self.publish(update);
		self.tx = None;
	}
}
