//! The form session: owner of one bound record and all of its trackers.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use draftwork_config::Config;
use draftwork_worker::{CancellationToken, Scheduler, TokioScheduler};
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::autosave::{AutoSaveEvent, AutoSaveScheduler};
use crate::error::{Result, SessionError};
use crate::field::{FieldId, FieldValue};
use crate::guard::{DEFAULT_SUBMIT_GUARD, SubmissionGuard};
use crate::hooks::{AutoSaveHook, NoAutoSave, NoSubmit, SubmitHook};
use crate::normalize::Normalization;
use crate::record::{Record, RecordError};
use crate::schema::{FieldMetadata, FormSchema};
use crate::snapshot::{SessionSnapshot, SnapshotPublisher, SubmitPhase};
use crate::tracker::ChangeTracker;
use crate::validation::{Catalog, NoValidation, Translator, ValidationAdapter, ValidationMessage, ValidationMessages, Validator};

mod submit;

pub use submit::SubmitOutcome;

/// Session-wide behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
	/// Minimum interval between accepted submissions.
	pub submit_guard: Duration,
	/// Run a validation pass after each accepted edit.
	pub validate_on_change: bool,
	/// Text clean-ups applied before committing a submission.
	pub normalization: Normalization,
}

impl Default for SessionOptions {
	fn default() -> Self {
		Self {
			submit_guard: DEFAULT_SUBMIT_GUARD,
			validate_on_change: false,
			normalization: Normalization::default(),
		}
	}
}

impl SessionOptions {
	/// Reads the `[session]` and `[normalize]` tables.
	pub fn from_config(config: &Config) -> Self {
		Self {
			submit_guard: config.session.submit_guard(),
			validate_on_change: config.session.validate_on_change,
			normalization: config.normalize.into(),
		}
	}
}

/// Cloneable remote control that tears the session down from anywhere.
///
/// Cancellation takes effect immediately for timers, commits, and an
/// in-flight submission; the owner finishes cleanup on its next call.
#[derive(Debug, Clone)]
pub struct TeardownHandle {
	cancel: CancellationToken,
}

impl TeardownHandle {
	/// Requests teardown. Idempotent.
	pub fn teardown(&self) {
		self.cancel.cancel();
	}

	/// Teardown was requested.
	pub fn is_torn_down(&self) -> bool {
		self.cancel.is_cancelled()
	}
}

/// Assembles a [`FormSession`] from its collaborators.
pub struct FormSessionBuilder<R: Record> {
	record: R,
	metadata: Arc<dyn FieldMetadata>,
	options: SessionOptions,
	validator: Arc<dyn Validator<R>>,
	translator: Arc<dyn Translator>,
	autosave_hook: Arc<dyn AutoSaveHook>,
	submit_hook: Arc<dyn SubmitHook<R>>,
	scheduler: Arc<dyn Scheduler>,
}

impl<R: Record> FormSessionBuilder<R> {
	/// Field capability declarations.
	pub fn schema(mut self, metadata: impl FieldMetadata) -> Self {
		self.metadata = Arc::new(metadata);
		self
	}

	/// Session-wide options.
	pub fn options(mut self, options: SessionOptions) -> Self {
		self.options = options;
		self
	}

	/// Schema and options from a parsed configuration file.
	pub fn config(self, config: &Config) -> Self {
		self.schema(FormSchema::from_config(config)).options(SessionOptions::from_config(config))
	}

	/// External rule evaluator.
	pub fn validator(mut self, validator: impl Validator<R>) -> Self {
		self.validator = Arc::new(validator);
		self
	}

	/// External message renderer.
	pub fn translator(mut self, translator: impl Translator) -> Self {
		self.translator = Arc::new(translator);
		self
	}

	/// Per-field commit function.
	pub fn autosave_hook(mut self, hook: Arc<dyn AutoSaveHook>) -> Self {
		self.autosave_hook = hook;
		self
	}

	/// Whole-record submit function.
	pub fn submit_hook(mut self, hook: Arc<dyn SubmitHook<R>>) -> Self {
		self.submit_hook = hook;
		self
	}

	/// Timer source for autosave delays.
	pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
		self.scheduler = scheduler;
		self
	}

	/// Creates the session and all of its trackers.
	pub fn build(self) -> FormSession<R> {
		let cancel = CancellationToken::new();
		let autosave = AutoSaveScheduler::new(self.scheduler, self.autosave_hook, cancel.clone());
		debug!(record = ?self.record.id(), "session.initialize");
		FormSession {
			record: self.record,
			metadata: self.metadata,
			options: self.options,
			tracker: ChangeTracker::new(),
			guard: SubmissionGuard::new(self.options.submit_guard),
			validation: ValidationAdapter::new(self.validator, self.translator),
			autosave,
			submitter: self.submit_hook,
			snapshot: SnapshotPublisher::new(),
			cancel,
			buffered: VecDeque::new(),
			torn_down: false,
		}
	}
}

/// Lifetime-bound owner of one editable record.
///
/// All methods take `&mut self`: the session is driven from a single owning
/// context. Timer expiries and commit completions queue up until the owner
/// drains them with [`poll_autosaves`](Self::poll_autosaves),
/// [`next_autosave_event`](Self::next_autosave_event), or
/// [`settle`](Self::settle).
///
/// Dropping the session tears it down.
pub struct FormSession<R: Record> {
	record: R,
	metadata: Arc<dyn FieldMetadata>,
	options: SessionOptions,
	tracker: ChangeTracker,
	guard: SubmissionGuard,
	validation: ValidationAdapter<R>,
	autosave: AutoSaveScheduler,
	submitter: Arc<dyn SubmitHook<R>>,
	snapshot: SnapshotPublisher,
	cancel: CancellationToken,
	buffered: VecDeque<AutoSaveEvent>,
	torn_down: bool,
}

impl<R: Record> std::fmt::Debug for FormSession<R> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FormSession")
			.field("record", &self.record.id())
			.field("options", &self.options)
			.field("tracker", &self.tracker)
			.field("autosave", &self.autosave)
			.field("snapshot", self.snapshot.current())
			.field("torn_down", &self.torn_down)
			.finish_non_exhaustive()
	}
}

impl<R: Record> FormSession<R> {
	/// Starts building a session around `record`.
	pub fn builder(record: R) -> FormSessionBuilder<R> {
		FormSessionBuilder {
			record,
			metadata: Arc::new(FormSchema::default()),
			options: SessionOptions::default(),
			validator: Arc::new(NoValidation),
			translator: Arc::new(Catalog::new()),
			autosave_hook: Arc::new(NoAutoSave),
			submit_hook: Arc::new(NoSubmit),
			scheduler: Arc::new(TokioScheduler::new()),
		}
	}

	/// The bound record.
	pub fn record(&self) -> &R {
		&self.record
	}

	/// Applies an edit from the page layer.
	///
	/// Writes the value, marks the record changed if the field is tracked,
	/// and (re)schedules the field's autosave. Returns `Ok(false)` when the
	/// value equals the current one; such edits have no effect.
	pub fn notify_field_changed(&mut self, field: impl Into<FieldId>, value: impl Into<FieldValue>) -> Result<bool> {
		self.ensure_live()?;
		let field = field.into();
		let value = value.into();

		let old = self
			.record
			.get(&field)
			.ok_or_else(|| RecordError::UnknownField(field.clone()))?;
		if old == value {
			trace!(field = %field, "session.edit_unchanged");
			return Ok(false);
		}
		self.record.set(&field, value.clone())?;

		self.tracker
			.notify_field_changed(&field, &old, &value, self.metadata.tracks_changes(&field));
		if let Some(autosave) = self.metadata.autosave(&field) {
			self.autosave.schedule(&field, &old, value, autosave.delay);
		}

		let messages = self.options.validate_on_change.then(|| self.validation.validate(&self.record));
		self.publish(|snapshot| {
			if let Some(messages) = messages {
				snapshot.messages = messages;
			}
		});
		Ok(true)
	}

	/// Forces `has_changes` on.
	pub fn mark_changed(&mut self) {
		if self.is_torn_down() {
			return;
		}
		self.tracker.mark_changed();
		self.publish(|_| {});
	}

	/// Clears `has_changes`.
	pub fn mark_unchanged(&mut self) {
		if self.is_torn_down() {
			return;
		}
		self.tracker.mark_unchanged();
		self.publish(|_| {});
	}

	/// Runs a validation pass and swaps in its messages. Returns `is_valid`.
	pub fn validate(&mut self) -> bool {
		if self.is_torn_down() {
			return self.is_valid();
		}
		let messages = self.validation.validate(&self.record);
		let valid = messages.is_empty();
		self.publish(|snapshot| snapshot.messages = messages);
		valid
	}

	/// Replaces the record with [`Record::fresh`] and re-initializes every
	/// tracker. The session keeps accepting edits for the same fields.
	pub fn reset(&mut self) {
		let fresh = self.record.fresh();
		self.reset_to(fresh);
	}

	/// Replaces the record and re-initializes every tracker.
	pub fn reset_to(&mut self, record: R) {
		if self.is_torn_down() {
			return;
		}
		debug!(from = ?self.record.id(), to = ?record.id(), "session.reset");
		self.record = record;
		self.reinitialize();
	}

	/// Binds a different record. A record with the current identity is
	/// ignored and the bound record kept. Returns whether a rebind happened.
	pub fn rebind(&mut self, record: R) -> bool {
		if self.is_torn_down() {
			return false;
		}
		if record.id() == self.record.id() {
			trace!(record = ?record.id(), "session.rebind_same_identity");
			return false;
		}
		debug!(from = ?self.record.id(), to = ?record.id(), "session.rebind");
		self.record = record;
		self.reinitialize();
		true
	}

	/// Cancels all pending work and detaches every subscriber. Idempotent;
	/// also runs on drop.
	pub fn teardown(&mut self) {
		if self.torn_down {
			return;
		}
		self.torn_down = true;
		self.cancel.cancel();
		self.autosave.shutdown();
		self.buffered.clear();
		self.snapshot.close(|snapshot| {
			snapshot.processing = false;
			snapshot.phase = SubmitPhase::Idle;
			snapshot.pending_autosaves = 0;
			snapshot.inflight_autosaves = 0;
			snapshot.torn_down = true;
		});
		debug!(record = ?self.record.id(), "session.teardown");
	}

	/// Handle that can request teardown from another task.
	pub fn teardown_handle(&self) -> TeardownHandle {
		TeardownHandle {
			cancel: self.cancel.clone(),
		}
	}

	/// Teardown has run or was requested.
	pub fn is_torn_down(&self) -> bool {
		self.torn_down || self.cancel.is_cancelled()
	}

	/// Handles autosave timer expiries and commit completions that are
	/// already waiting. Never blocks.
	pub fn poll_autosaves(&mut self) -> Vec<AutoSaveEvent> {
		if self.ensure_live().is_err() {
			return Vec::new();
		}
		let mut events: Vec<_> = self.buffered.drain(..).collect();
		let fresh = self.autosave.poll();
		if !fresh.is_empty() {
			events.extend(fresh);
			self.publish(|_| {});
		}
		events
	}

	/// Waits for the next autosave event.
	///
	/// Returns `None` once no autosave is pending or in flight, or when the
	/// session is torn down. Cancel-safe.
	pub async fn next_autosave_event(&mut self) -> Option<AutoSaveEvent> {
		if let Some(event) = self.buffered.pop_front() {
			return Some(event);
		}
		if self.ensure_live().is_err() {
			return None;
		}
		let events = self.autosave.recv().await;
		if self.ensure_live().is_err() || events.is_empty() {
			return None;
		}
		self.publish(|_| {});
		self.buffered.extend(events);
		self.buffered.pop_front()
	}

	/// Drives autosaves until none is pending or in flight.
	pub async fn settle(&mut self) -> Vec<AutoSaveEvent> {
		let mut events = Vec::new();
		while let Some(event) = self.next_autosave_event().await {
			events.push(event);
		}
		events
	}

	/// Launches every pending autosave immediately.
	pub fn flush_autosaves(&mut self) -> Vec<AutoSaveEvent> {
		if self.ensure_live().is_err() {
			return Vec::new();
		}
		let events = self.autosave.flush();
		if !events.is_empty() {
			self.publish(|_| {});
		}
		events
	}

	/// Unsaved changes since the last reset or successful submit.
	pub fn has_changes(&self) -> bool {
		self.tracker.has_changes()
	}

	/// Tracked fields edited since the last clear.
	pub fn changed_fields(&self) -> impl Iterator<Item = &FieldId> {
		self.tracker.changed_fields()
	}

	/// No validation messages are active.
	pub fn is_valid(&self) -> bool {
		self.snapshot.current().is_valid()
	}

	/// A submission is between acceptance and completion.
	pub fn processing(&self) -> bool {
		self.snapshot.current().processing
	}

	/// Current submission pipeline phase.
	pub fn phase(&self) -> SubmitPhase {
		self.snapshot.current().phase
	}

	/// Messages from the latest validation pass.
	pub fn validation_messages(&self) -> ValidationMessages {
		Arc::clone(&self.snapshot.current().messages)
	}

	/// Messages from the latest validation pass that belong to `field`.
	pub fn messages_for(&self, field: &FieldId) -> Vec<ValidationMessage> {
		crate::validation::messages_for(&self.snapshot.current().messages, field)
			.cloned()
			.collect()
	}

	/// Number of fields with a pending autosave.
	pub fn pending_autosaves(&self) -> usize {
		self.autosave.pending_count()
	}

	/// Last published state.
	pub fn snapshot(&self) -> SessionSnapshot {
		self.snapshot.current().clone()
	}

	/// Subscribes to state changes. `None` after teardown.
	pub fn subscribe(&self) -> Option<watch::Receiver<SessionSnapshot>> {
		self.snapshot.subscribe()
	}

	fn ensure_live(&mut self) -> Result<()> {
		if self.torn_down {
			return Err(SessionError::TornDown);
		}
		if self.cancel.is_cancelled() {
			self.teardown();
			return Err(SessionError::TornDown);
		}
		Ok(())
	}

	fn reinitialize(&mut self) {
		self.autosave.reset();
		self.tracker.mark_unchanged();
		self.guard.reset();
		self.buffered.clear();
		self.publish(|snapshot| {
			snapshot.messages = Arc::from(Vec::<ValidationMessage>::new());
			snapshot.processing = false;
			snapshot.phase = SubmitPhase::Idle;
		});
	}

	fn publish(&mut self, update: impl FnOnce(&mut SessionSnapshot)) {
		let has_changes = self.tracker.has_changes();
		let pending = self.autosave.pending_count();
		let inflight = self.autosave.in_flight_count();
		self.snapshot.publish(|snapshot| {
			snapshot.has_changes = has_changes;
			snapshot.pending_autosaves = pending;
			snapshot.inflight_autosaves = inflight;
			update(snapshot);
		});
	}
}

impl<R: Record> Drop for FormSession<R> {
	fn drop(&mut self) {
		self.teardown();
	}
}
