//! Externally supplied save and submit functions.

use async_trait::async_trait;

use crate::error::{AutoSaveError, BoxError};
use crate::field::{FieldId, FieldValue};

/// One autosave commit: the value last committed and the value to commit.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCommit {
	/// Field being committed.
	pub field: FieldId,
	/// Last successfully committed value (or the value at load time).
	pub previous: FieldValue,
	/// Value captured when the commit was scheduled.
	pub candidate: FieldValue,
}

/// Saves individual fields after they stop changing.
#[async_trait]
pub trait AutoSaveHook: Send + Sync + 'static {
	/// Persists one field. May suspend on external I/O.
	async fn commit(&self, commit: FieldCommit) -> Result<(), BoxError>;

	/// Called on the session's owner after a commit failed.
	fn autosave_failed(&self, _error: &AutoSaveError) {}
}

/// Autosave hook that accepts every commit without doing anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAutoSave;

#[async_trait]
impl AutoSaveHook for NoAutoSave {
	async fn commit(&self, _commit: FieldCommit) -> Result<(), BoxError> {
		Ok(())
	}
}

/// Persists the whole record on submit.
#[async_trait]
pub trait SubmitHook<R: Sync>: Send + Sync + 'static {
	/// Runs after the guard accepted the attempt, before normalization.
	async fn pre_submit(&self, _record: &R) -> Result<(), BoxError> {
		Ok(())
	}

	/// Persists the record.
	async fn submit(&self, record: &R) -> Result<(), BoxError>;

	/// Runs after the commit finished, successfully or not. Skipped when the
	/// attempt was cancelled.
	async fn post_submit(&self, _record: &R, _success: bool) {}
}

/// Submit hook that accepts every record without doing anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSubmit;

#[async_trait]
impl<R: Sync + 'static> SubmitHook<R> for NoSubmit {
	async fn submit(&self, _record: &R) -> Result<(), BoxError> {
		Ok(())
	}
}
