//! Unsaved-change tracking.

use std::collections::BTreeSet;

use crate::field::{FieldId, FieldValue};

/// Records whether the bound record has unsaved modifications.
///
/// `has_changes` only ever goes from false to true between clears; a field
/// edited back to its original value still counts as changed.
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
	changed: BTreeSet<FieldId>,
	manual: bool,
}

impl ChangeTracker {
	/// Creates a tracker with no changes.
	pub fn new() -> Self {
		Self::default()
	}

	/// Records an accepted field edit. Returns true when `has_changes` flipped.
	///
	/// Fields whose configuration disables tracking are ignored.
	pub fn notify_field_changed(&mut self, field: &FieldId, old: &FieldValue, new: &FieldValue, tracked: bool) -> bool {
		if !tracked {
			tracing::trace!(field = %field, "changes.untracked_field");
			return false;
		}
		let was = self.has_changes();
		if !self.changed.contains(field) {
			tracing::trace!(field = %field, old = %old, new = %new, "changes.field_dirty");
			self.changed.insert(field.clone());
		}
		!was
	}

	/// Forces `has_changes` on.
	pub fn mark_changed(&mut self) {
		self.manual = true;
	}

	/// Clears every recorded change.
	pub fn mark_unchanged(&mut self) {
		self.changed.clear();
		self.manual = false;
	}

	/// True iff any tracked field changed, or a change was marked manually.
	pub fn has_changes(&self) -> bool {
		self.manual || !self.changed.is_empty()
	}

	/// Tracked fields edited since the last clear, in name order.
	pub fn changed_fields(&self) -> impl Iterator<Item = &FieldId> {
		self.changed.iter()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn edit(tracker: &mut ChangeTracker, field: &str, tracked: bool) -> bool {
		tracker.notify_field_changed(&FieldId::new(field), &FieldValue::Null, &FieldValue::from("x"), tracked)
	}

	#[test]
	fn tracked_edit_sets_changes_once() {
		let mut tracker = ChangeTracker::new();
		assert!(!tracker.has_changes());
		assert!(edit(&mut tracker, "title", true));
		assert!(!edit(&mut tracker, "body", true));
		assert!(tracker.has_changes());
		assert_eq!(tracker.changed_fields().count(), 2);
	}

	#[test]
	fn untracked_edit_is_ignored() {
		let mut tracker = ChangeTracker::new();
		assert!(!edit(&mut tracker, "notes", false));
		assert!(!tracker.has_changes());
	}

	#[test]
	fn manual_overrides() {
		let mut tracker = ChangeTracker::new();
		tracker.mark_changed();
		assert!(tracker.has_changes());
		assert_eq!(tracker.changed_fields().count(), 0);

		edit(&mut tracker, "title", true);
		tracker.mark_unchanged();
		assert!(!tracker.has_changes());
		assert_eq!(tracker.changed_fields().count(), 0);
	}
}
