//! Bound record abstraction.

use std::collections::BTreeMap;
use std::fmt::Debug;

use thiserror::Error;

use crate::field::{FieldId, FieldValue};

/// Errors raised when reading or writing a record field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
	/// The record has no field with this identity.
	#[error("unknown field: {0}")]
	UnknownField(FieldId),

	/// The value kind does not fit the field.
	#[error("type mismatch for field '{field}': expected {expected}, got {got}")]
	TypeMismatch {
		/// Field being written.
		field: FieldId,
		/// Kind the field accepts.
		expected: &'static str,
		/// Kind that was supplied.
		got: &'static str,
	},
}

/// Editable record bound to a session.
///
/// The session reads and writes fields only through this trait and captures
/// values by snapshot, so implementations never hand out references into
/// themselves.
pub trait Record: Send + Sync + 'static {
	/// Identity of the record instance. A rebind with a different identity
	/// re-initializes every tracker.
	type Id: PartialEq + Clone + Debug + Send + Sync;

	/// Returns this record's identity.
	fn id(&self) -> Self::Id;

	/// Reads one field.
	fn get(&self, field: &FieldId) -> Option<FieldValue>;

	/// Writes one field.
	fn set(&mut self, field: &FieldId, value: FieldValue) -> Result<(), RecordError>;

	/// Lists every field of the record.
	fn fields(&self) -> Vec<FieldId>;

	/// Returns an unsaved record with the same shape and default values.
	///
	/// Used by a session reset; every field of `self` must stay writable on
	/// the returned record.
	fn fresh(&self) -> Self;
}

/// Map-backed record with a fixed field set.
///
/// Writes to fields that were not present at construction are rejected, as
/// are writes that change the kind of a non-null value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapRecord {
	id: u64,
	values: BTreeMap<FieldId, FieldValue>,
}

impl MapRecord {
	/// Creates an empty record.
	pub fn new(id: u64) -> Self {
		Self {
			id,
			values: BTreeMap::new(),
		}
	}

	/// Adds a field with its initial value.
	pub fn with(mut self, field: impl Into<FieldId>, value: impl Into<FieldValue>) -> Self {
		self.values.insert(field.into(), value.into());
		self
	}

	/// Iterates fields in name order.
	pub fn iter(&self) -> impl Iterator<Item = (&FieldId, &FieldValue)> {
		self.values.iter()
	}
}

impl Record for MapRecord {
	type Id = u64;

	fn id(&self) -> u64 {
		self.id
	}

	fn get(&self, field: &FieldId) -> Option<FieldValue> {
		self.values.get(field).cloned()
	}

	fn set(&mut self, field: &FieldId, value: FieldValue) -> Result<(), RecordError> {
		let slot = self
			.values
			.get_mut(field)
			.ok_or_else(|| RecordError::UnknownField(field.clone()))?;
		if !matches!(slot, FieldValue::Null) && !matches!(value, FieldValue::Null) && slot.kind() != value.kind() {
			return Err(RecordError::TypeMismatch {
				field: field.clone(),
				expected: slot.kind(),
				got: value.kind(),
			});
		}
		*slot = value;
		Ok(())
	}

	fn fields(&self) -> Vec<FieldId> {
		self.values.keys().cloned().collect()
	}

	fn fresh(&self) -> Self {
		Self {
			id: 0,
			values: self.values.iter().map(|(field, value)| (field.clone(), value.blank())).collect(),
		}
	}
}
