//! Field identities and snapshot values.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Stable name or path identifying one field of a record.
///
/// Cheap to clone; scheduled work holds its own copy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(Arc<str>);

impl FieldId {
	/// Creates a field identity from its name.
	pub fn new(name: impl AsRef<str>) -> Self {
		Self(Arc::from(name.as_ref()))
	}

	/// Field name.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for FieldId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for FieldId {
	fn from(name: &str) -> Self {
		Self::new(name)
	}
}

impl From<String> for FieldId {
	fn from(name: String) -> Self {
		Self(Arc::from(name))
	}
}

impl Borrow<str> for FieldId {
	fn borrow(&self) -> &str {
		&self.0
	}
}

/// Owned snapshot of a field's value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
	/// No value.
	#[default]
	Null,
	/// Boolean value.
	Bool(bool),
	/// Integer value.
	Int(i64),
	/// Floating-point value.
	Float(f64),
	/// Text value. The only kind touched by normalization.
	Text(String),
}

impl FieldValue {
	/// Returns the text payload for text values.
	pub fn as_text(&self) -> Option<&str> {
		match self {
			Self::Text(text) => Some(text),
			_ => None,
		}
	}

	/// Name of the value kind, for diagnostics.
	pub const fn kind(&self) -> &'static str {
		match self {
			Self::Null => "null",
			Self::Bool(_) => "bool",
			Self::Int(_) => "int",
			Self::Float(_) => "float",
			Self::Text(_) => "text",
		}
	}

	/// Empty value of the same kind.
	pub fn blank(&self) -> Self {
		match self {
			Self::Null => Self::Null,
			Self::Bool(_) => Self::Bool(false),
			Self::Int(_) => Self::Int(0),
			Self::Float(_) => Self::Float(0.0),
			Self::Text(_) => Self::Text(String::new()),
		}
	}
}

impl fmt::Display for FieldValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Null => f.write_str("null"),
			Self::Bool(value) => write!(f, "{value}"),
			Self::Int(value) => write!(f, "{value}"),
			Self::Float(value) => write!(f, "{value}"),
			Self::Text(value) => write!(f, "{value:?}"),
		}
	}
}

impl From<&str> for FieldValue {
	fn from(value: &str) -> Self {
		Self::Text(value.to_owned())
	}
}

impl From<String> for FieldValue {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}

impl From<bool> for FieldValue {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl From<i64> for FieldValue {
	fn from(value: i64) -> Self {
		Self::Int(value)
	}
}

impl From<f64> for FieldValue {
	fn from(value: f64) -> Self {
		Self::Float(value)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn field_ids_compare_by_name() {
		assert_eq!(FieldId::new("title"), FieldId::from(String::from("title")));
		assert_ne!(FieldId::new("title"), FieldId::new("Title"));
	}

	#[test]
	fn untagged_values_deserialize_by_shape() {
		#[derive(Deserialize)]
		struct Row {
			values: Vec<FieldValue>,
		}
		let row: Row = toml::from_str(r#"values = [true, 3, 1.5, "x"]"#).unwrap();
		assert_eq!(
			row.values,
			vec![FieldValue::Bool(true), FieldValue::Int(3), FieldValue::Float(1.5), FieldValue::from("x")]
		);
	}

	#[test]
	fn only_text_exposes_text() {
		assert_eq!(FieldValue::from("a").as_text(), Some("a"));
		assert_eq!(FieldValue::Int(1).as_text(), None);
		assert_eq!(FieldValue::Null.kind(), "null");
	}

	#[test]
	fn blank_keeps_the_kind() {
		assert_eq!(FieldValue::from("draft").blank(), FieldValue::from(""));
		assert_eq!(FieldValue::Int(9).blank(), FieldValue::Int(0));
		assert_eq!(FieldValue::Bool(true).blank().kind(), "bool");
		assert_eq!(FieldValue::Null.blank(), FieldValue::Null);
	}

	#[test]
	fn field_ids_serialize_as_plain_names() {
		#[derive(Debug, PartialEq, Serialize, Deserialize)]
		struct Entry {
			field: FieldId,
		}
		let entry: Entry = toml::from_str(r#"field = "title""#).unwrap();
		assert_eq!(entry.field, FieldId::new("title"));
		assert_eq!(toml::to_string(&entry).unwrap().trim(), r#"field = "title""#);
	}
}
