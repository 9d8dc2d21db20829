//! Form session engine.
//!
//! A [`FormSession`] owns one editable record for the lifetime of a page and
//! coordinates:
//!
//! * per-field debounced autosave ([`AutoSaveScheduler`]),
//! * unsaved-change tracking ([`ChangeTracker`]),
//! * duplicate-submission suppression ([`SubmissionGuard`]),
//! * validation through an external evaluator and translator
//!   ([`ValidationAdapter`]),
//! * the submission pipeline ([`FormSession::submit`]).
//!
//! State visible to the page layer is published as whole
//! [`SessionSnapshot`] values on a watch channel. Tearing the session down
//! cancels every timer, commit, and in-flight submission through a single
//! [`CancellationToken`](draftwork_worker::CancellationToken).
//!
//! # Driving autosaves
//!
//! Timers only report that a field is due. Commits launch, and their results
//! land, when the owner of the session drains those reports through
//! [`FormSession::poll_autosaves`], [`FormSession::next_autosave_event`] or
//! [`FormSession::settle`]. A session nobody drives never autosaves, so the
//! page keeps a loop like this next to its input handling:
//!
//! ```ignore
//! loop {
//! 	tokio::select! {
//! 		Some(input) = inputs.recv() => {
//! 			session.notify_field_changed(input.field, input.value)?;
//! 		}
//! 		Some(event) = session.next_autosave_event() => render(&event),
//! 		else => break,
//! 	}
//! }
//! ```
//!
//! `next_autosave_event` is cancel-safe and returns `None` once nothing is
//! pending, which disables that branch until the next edit.

mod autosave;
mod error;
mod field;
mod guard;
mod hooks;
mod normalize;
mod record;
mod schema;
mod session;
mod snapshot;
mod tracker;
mod validation;

#[cfg(test)]
mod testing;

pub use autosave::{AutoSaveEvent, AutoSaveScheduler, PendingAutoSave};
pub use error::{AutoSaveError, BoxError, Result, SessionError, SubmitError};
pub use field::{FieldId, FieldValue};
pub use guard::{DEFAULT_SUBMIT_GUARD, SubmissionGuard};
pub use hooks::{AutoSaveHook, FieldCommit, NoAutoSave, NoSubmit, SubmitHook};
pub use normalize::Normalization;
pub use record::{MapRecord, Record, RecordError};
pub use schema::{AutoSaveConfig, FieldConfig, FieldDecl, FieldMetadata, FormSchema, FormSchemaBuilder};
pub use session::{FormSession, FormSessionBuilder, SessionOptions, SubmitOutcome, TeardownHandle};
pub use snapshot::{SessionSnapshot, SubmitPhase};
pub use tracker::ChangeTracker;
pub use validation::{
	Catalog, NoValidation, RuleViolation, Translator, ValidationAdapter, ValidationMessage, ValidationMessages, Validator, messages_for,
};
