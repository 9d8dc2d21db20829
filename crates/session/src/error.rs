//! Error types for the session engine.

use std::sync::Arc;

use thiserror::Error;

use crate::field::FieldId;
use crate::record::RecordError;

/// Boxed error returned by externally supplied hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors from edit-time session operations.
#[derive(Debug, Error)]
pub enum SessionError {
	/// The session was torn down; no further edits are accepted.
	#[error("session has been torn down")]
	TornDown,

	/// The record rejected the edit.
	#[error(transparent)]
	Record(#[from] RecordError),
}

/// Result type for edit-time session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Failure of one submission attempt. The session stays usable.
#[derive(Debug, Error)]
pub enum SubmitError {
	/// The pre-submit hook refused the attempt.
	#[error("pre-submit hook failed: {0}")]
	PreSubmit(#[source] BoxError),

	/// Normalization could not write a field back.
	#[error("normalization failed: {0}")]
	Normalize(#[from] RecordError),

	/// The submit hook failed.
	#[error("submit failed: {0}")]
	Commit(#[source] BoxError),
}

/// Failure of one autosave commit, isolated to its field.
#[derive(Debug, Clone, Error)]
#[error("autosave of '{field}' failed: {source}")]
pub struct AutoSaveError {
	/// Field whose commit failed.
	pub field: FieldId,
	/// Error returned by the commit hook.
	#[source]
	pub source: Arc<dyn std::error::Error + Send + Sync + 'static>,
}
