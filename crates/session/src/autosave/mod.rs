//! Per-field debounced autosave.
//!
//! [`AutoSaveScheduler`] keeps at most one [`PendingAutoSave`] per field. A
//! new edit cancels and replaces the field's pending timer, so a burst of
//! edits collapses into a single commit of the final value.
//!
//! # Owner-side dispatch
//!
//! Timers and commit tasks never touch tracker state. A timer that expires
//! sends [`AutoSaveMsg::Due`] on an unbounded channel; a finished commit sends
//! [`AutoSaveMsg::Done`]. The owning session drains the channel through
//! [`AutoSaveScheduler::poll`] or [`AutoSaveScheduler::recv`] and only then
//! updates baselines or launches commits.
//!
//! # Staleness
//!
//! Every schedule gets a fresh generation from a [`GenerationClock`]. A `Due`
//! whose generation no longer matches the field's pending entry was
//! superseded and is dropped. Resets bump an epoch; commits launched in an
//! older epoch still gate same-field ordering but no longer move baselines.
//!
//! # Ordering
//!
//! At most one commit per field is in flight. A pending entry that becomes
//! due while its predecessor is still running is marked due and launched when
//! the predecessor reports back, with the freshly committed value as
//! `previous`. Different fields are independent.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use draftwork_worker::{CancellationToken, GenerationClock, GenerationToken, ScheduledHandle, Scheduler, TaskClass, spawn};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::error::{AutoSaveError, BoxError};
use crate::field::{FieldId, FieldValue};
use crate::hooks::{AutoSaveHook, FieldCommit};


/// Message sent back to the owner by timer and commit tasks.
#[derive(Debug)]
pub(crate) enum AutoSaveMsg {
	/// A field's delay elapsed.
	Due { field: FieldId, generation: u64 },
	/// A commit task finished.
	Done {
		field: FieldId,
		generation: u64,
		result: Result<(), BoxError>,
	},
}

/// Autosave progress reported to the page layer.
#[derive(Debug, Clone)]
pub enum AutoSaveEvent {
	/// A commit was handed to the hook.
	Started {
		/// Field being committed.
		field: FieldId,
		/// Value being committed.
		candidate: FieldValue,
	},
	/// A commit became due while the field's previous commit was running.
	Deferred {
		/// Field waiting on its predecessor.
		field: FieldId,
	},
	/// The hook accepted a commit.
	Committed {
		/// Field that was committed.
		field: FieldId,
		/// New committed baseline.
		value: FieldValue,
	},
	/// The hook rejected a commit. Other fields are unaffected.
	Failed(AutoSaveError),
}

impl AutoSaveEvent {
	/// Field the event refers to.
	pub fn field(&self) -> &FieldId {
		match self {
			Self::Started { field, .. } | Self::Deferred { field } | Self::Committed { field, .. } => field,
			Self::Failed(error) => &error.field,
		}
	}
}

/// One scheduled, not yet launched commit.
#[derive(Debug)]
pub struct PendingAutoSave {
	/// Field to commit.
	pub field: FieldId,
	/// Last committed value when the entry was scheduled, refreshed if a
	/// predecessor commit lands before launch.
	pub previous: FieldValue,
	/// Value captured at scheduling time.
	pub candidate: FieldValue,
	handle: ScheduledHandle,
	due: bool,
}

impl PendingAutoSave {
	/// Generation of the scheduled timer.
	pub const fn generation(&self) -> u64 {
		self.handle.generation()
	}

	/// Delay elapsed, waiting for the predecessor commit.
	pub const fn is_due(&self) -> bool {
		self.due
	}
}

#[derive(Debug)]
struct InFlight {
	generation: u64,
	epoch: u64,
	candidate: FieldValue,
}

/// Per-field bookkeeping.
#[derive(Debug, Default)]
struct FieldTracker {
	/// `None` until the first edit after load or reset.
	committed: Option<FieldValue>,
	pending: Option<PendingAutoSave>,
	in_flight: Option<InFlight>,
}

/// Shared pieces needed to launch a commit task.
struct Launcher<'a> {
	hook: &'a Arc<dyn AutoSaveHook>,
	tx: &'a mpsc::UnboundedSender<AutoSaveMsg>,
	cancel: &'a CancellationToken,
	epoch: u64,
}

impl Launcher<'_> {
	fn launch(&self, tracker: &mut FieldTracker, pending: PendingAutoSave, events: &mut Vec<AutoSaveEvent>) {
		let PendingAutoSave {
			field,
			previous,
			candidate,
			handle,
			..
		} = pending;
		let generation = handle.generation();
		// Launch can precede expiry (flush); the timer must not fire afterwards.
		handle.cancel();

		debug!(field = %field, generation, previous = %previous, candidate = %candidate, "autosave.launch");
		tracker.in_flight = Some(InFlight {
			generation,
			epoch: self.epoch,
			candidate: candidate.clone(),
		});
		events.push(AutoSaveEvent::Started {
			field: field.clone(),
			candidate: candidate.clone(),
		});

		let hook = Arc::clone(self.hook);
		let tx = self.tx.clone();
		let cancel = self.cancel.clone();
		let commit = FieldCommit {
			field: field.clone(),
			previous,
			candidate,
		};
		spawn(TaskClass::Commit, async move {
			if cancel.is_cancelled() {
				return;
			}
			let mut task = spawn(TaskClass::Commit, async move { hook.commit(commit).await });
			let result = tokio::select! {
				biased;
				() = cancel.cancelled() => {
					task.abort();
					trace!(field = %field, generation, "autosave.commit_cancelled");
					return;
				}
				joined = &mut task => joined.unwrap_or_else(|err| Err(Box::new(err) as BoxError)),
			};
			let _ = tx.send(AutoSaveMsg::Done { field, generation, result });
		});
	}
}

/// Debounced per-field commit scheduler.
pub struct AutoSaveScheduler {
	scheduler: Arc<dyn Scheduler>,
	hook: Arc<dyn AutoSaveHook>,
	clock: GenerationClock,
	cancel: CancellationToken,
	epoch: u64,
	fields: HashMap<FieldId, FieldTracker>,
	tx: mpsc::UnboundedSender<AutoSaveMsg>,
	rx: mpsc::UnboundedReceiver<AutoSaveMsg>,
}

impl fmt::Debug for AutoSaveScheduler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AutoSaveScheduler")
			.field("epoch", &self.epoch)
			.field("fields", &self.fields)
			.field("cancelled", &self.cancel.is_cancelled())
			.finish()
	}
}

impl AutoSaveScheduler {
	/// Creates a scheduler whose timers and commits all stop when `cancel` fires.
	pub fn new(scheduler: Arc<dyn Scheduler>, hook: Arc<dyn AutoSaveHook>, cancel: CancellationToken) -> Self {
		let (tx, rx) = mpsc::unbounded_channel();
		Self {
			scheduler,
			hook,
			clock: GenerationClock::new(),
			cancel,
			epoch: 0,
			fields: HashMap::new(),
			tx,
			rx,
		}
	}

	/// Schedules a commit of `candidate` after `delay`, replacing any pending
	/// commit of the same field.
	///
	/// `observed` is the field's value before the edit; it seeds the committed
	/// baseline the first time a field is edited.
	pub fn schedule(&mut self, field: &FieldId, observed: &FieldValue, candidate: FieldValue, delay: Duration) {
		if self.cancel.is_cancelled() {
			return;
		}

		let tracker = self.fields.entry(field.clone()).or_default();
		let previous = tracker.committed.get_or_insert_with(|| observed.clone()).clone();
		if let Some(superseded) = tracker.pending.take() {
			superseded.handle.cancel();
			debug!(field = %field, generation = superseded.generation(), "autosave.superseded");
		}

		let generation = self.clock.next();
		let token = GenerationToken::new(generation, self.cancel.child_token());
		let tx = self.tx.clone();
		let due_field = field.clone();
		let handle = self.scheduler.schedule(
			delay,
			token,
			Box::new(move || {
				let _ = tx.send(AutoSaveMsg::Due {
					field: due_field,
					generation,
				});
			}),
		);

		trace!(field = %field, generation, delay_ms = delay.as_millis() as u64, "autosave.scheduled");
		tracker.pending = Some(PendingAutoSave {
			field: field.clone(),
			previous,
			candidate,
			handle,
			due: false,
		});
	}

	/// Handles every message already waiting. Never blocks.
	pub fn poll(&mut self) -> Vec<AutoSaveEvent> {
		let mut events = Vec::new();
		if self.cancel.is_cancelled() {
			return events;
		}
		while let Ok(msg) = self.rx.try_recv() {
			self.handle(msg, &mut events);
		}
		events
	}

	/// Waits until at least one event is produced.
	///
	/// Returns an empty list immediately when nothing is pending or in flight,
	/// and as soon as the session is cancelled. Cancel-safe.
	pub async fn recv(&mut self) -> Vec<AutoSaveEvent> {
		let mut events = Vec::new();
		while events.is_empty() {
			if self.is_idle() || self.cancel.is_cancelled() {
				break;
			}
			let msg = tokio::select! {
				biased;
				() = self.cancel.cancelled() => break,
				msg = self.rx.recv() => msg,
			};
			let Some(msg) = msg else {
				break;
			};
			self.handle(msg, &mut events);
		}
		events
	}

	/// Launches every pending commit now instead of waiting for its delay.
	pub fn flush(&mut self) -> Vec<AutoSaveEvent> {
		let mut events = Vec::new();
		if self.cancel.is_cancelled() {
			return events;
		}
		let launcher = Launcher {
			hook: &self.hook,
			tx: &self.tx,
			cancel: &self.cancel,
			epoch: self.epoch,
		};
		for tracker in self.fields.values_mut() {
			let Some(pending) = tracker.pending.as_mut() else {
				continue;
			};
			if tracker.in_flight.is_some() {
				pending.handle.cancel();
				pending.due = true;
				continue;
			}
			if let Some(pending) = tracker.pending.take() {
				launcher.launch(tracker, pending, &mut events);
			}
		}
		events
	}

	/// Cancels every pending commit and forgets all baselines.
	///
	/// Commits already in flight keep running; their results no longer move
	/// baselines but still hold back the next commit of the same field.
	pub fn reset(&mut self) {
		self.epoch = self.epoch.wrapping_add(1);
		for (field, tracker) in &mut self.fields {
			if let Some(pending) = tracker.pending.take() {
				pending.handle.cancel();
				trace!(field = %field, generation = pending.generation(), "autosave.reset_cancelled");
			}
			tracker.committed = None;
		}
		self.fields.retain(|_, tracker| tracker.in_flight.is_some());
		debug!(epoch = self.epoch, "autosave.reset");
	}

	/// Cancels everything and stops accepting messages. Idempotent.
	pub fn shutdown(&mut self) {
		self.cancel.cancel();
		for tracker in self.fields.values_mut() {
			if let Some(pending) = tracker.pending.take() {
				pending.handle.cancel();
			}
		}
		self.fields.clear();
		self.rx.close();
		while self.rx.try_recv().is_ok() {}
	}

	/// Pending entry for `field`, if any.
	pub fn pending(&self, field: &FieldId) -> Option<&PendingAutoSave> {
		if self.cancel.is_cancelled() {
			return None;
		}
		self.fields.get(field).and_then(|tracker| tracker.pending.as_ref())
	}

	/// Last committed value of `field`, if it has been edited since load or reset.
	pub fn committed(&self, field: &FieldId) -> Option<&FieldValue> {
		self.fields.get(field).and_then(|tracker| tracker.committed.as_ref())
	}

	/// Number of fields with a pending commit. Zero once cancelled.
	pub fn pending_count(&self) -> usize {
		if self.cancel.is_cancelled() {
			return 0;
		}
		self.fields.values().filter(|tracker| tracker.pending.is_some()).count()
	}

	/// Number of fields with a commit in flight. Zero once cancelled.
	pub fn in_flight_count(&self) -> usize {
		if self.cancel.is_cancelled() {
			return 0;
		}
		self.fields.values().filter(|tracker| tracker.in_flight.is_some()).count()
	}

	/// No pending or in-flight work remains. Always true once cancelled.
	pub fn is_idle(&self) -> bool {
		self.cancel.is_cancelled()
			|| self
				.fields
				.values()
				.all(|tracker| tracker.pending.is_none() && tracker.in_flight.is_none())
	}

	fn handle(&mut self, msg: AutoSaveMsg, events: &mut Vec<AutoSaveEvent>) {
		let launcher = Launcher {
			hook: &self.hook,
			tx: &self.tx,
			cancel: &self.cancel,
			epoch: self.epoch,
		};
		match msg {
			AutoSaveMsg::Due { field, generation } => {
				let Some(tracker) = self.fields.get_mut(&field) else {
					trace!(field = %field, generation, "autosave.stale_due");
					return;
				};
				let Some(pending) = tracker.pending.as_mut().filter(|pending| pending.generation() == generation) else {
					trace!(field = %field, generation, "autosave.stale_due");
					return;
				};
				if tracker.in_flight.is_some() {
					pending.due = true;
					debug!(field = %field, generation, "autosave.deferred");
					events.push(AutoSaveEvent::Deferred { field });
					return;
				}
				if let Some(pending) = tracker.pending.take() {
					launcher.launch(tracker, pending, events);
				}
			}
			AutoSaveMsg::Done { field, generation, result } => {
				let Some(tracker) = self.fields.get_mut(&field) else {
					trace!(field = %field, generation, "autosave.stale_done");
					return;
				};
				let Some(in_flight) = tracker.in_flight.take_if(|in_flight| in_flight.generation == generation) else {
					trace!(field = %field, generation, "autosave.stale_done");
					return;
				};

				if in_flight.epoch != self.epoch {
					debug!(field = %field, generation, ok = result.is_ok(), "autosave.stale_epoch_completion");
				} else {
					match result {
						Ok(()) => {
							debug!(field = %field, generation, "autosave.committed");
							tracker.committed = Some(in_flight.candidate.clone());
							if let Some(next) = tracker.pending.as_mut() {
								next.previous = in_flight.candidate.clone();
							}
							events.push(AutoSaveEvent::Committed {
								field: field.clone(),
								value: in_flight.candidate,
							});
						}
						Err(source) => {
							let error = AutoSaveError {
								field: field.clone(),
								source: Arc::from(source),
							};
							warn!(field = %field, generation, error = %error.source, "autosave.failed");
							self.hook.autosave_failed(&error);
							events.push(AutoSaveEvent::Failed(error));
						}
					}
				}

				if tracker.pending.as_ref().is_some_and(PendingAutoSave::is_due)
					&& let Some(next) = tracker.pending.take()
				{
					launcher.launch(tracker, next, events);
				}
				if tracker.committed.is_none() && tracker.pending.is_none() && tracker.in_flight.is_none() {
					self.fields.remove(&field);
				}
			}
		}
	}
}
