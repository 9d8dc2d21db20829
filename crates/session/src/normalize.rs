//! Submit-time text normalization.

use draftwork_config::NormalizeSection;

use crate::field::FieldValue;
use crate::record::{Record, RecordError};
use crate::schema::FieldMetadata;

/// Which text clean-ups run before a submission is committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Normalization {
	/// Strip leading and trailing whitespace.
	pub trim: bool,
	/// Replace inner whitespace runs with a single space.
	pub collapse_whitespace: bool,
}

impl From<NormalizeSection> for Normalization {
	fn from(section: NormalizeSection) -> Self {
		Self {
			trim: section.trim,
			collapse_whitespace: section.collapse_whitespace,
		}
	}
}

impl Normalization {
	/// Returns true when no clean-up is enabled.
	pub const fn is_noop(&self) -> bool {
		!self.trim && !self.collapse_whitespace
	}

	/// Normalizes `text`, returning `None` when nothing changed.
	pub fn apply(&self, text: &str) -> Option<String> {
		let mut out = (if self.trim { text.trim() } else { text }).to_owned();
		if self.collapse_whitespace {
			out = collapse(&out);
		}
		(out != text).then_some(out)
	}

	/// Normalizes every text field of `record` that `metadata` allows.
	///
	/// Returns the number of fields rewritten.
	pub fn apply_to<R: Record>(&self, record: &mut R, metadata: &dyn FieldMetadata) -> Result<usize, RecordError> {
		if self.is_noop() {
			return Ok(0);
		}
		let mut rewritten = 0;
		for field in record.fields() {
			if !metadata.normalizes(&field) {
				continue;
			}
			let Some(FieldValue::Text(text)) = record.get(&field) else {
				continue;
			};
			if let Some(normalized) = self.apply(&text) {
				tracing::trace!(field = %field, "normalize.rewrite");
				record.set(&field, FieldValue::Text(normalized))?;
				rewritten += 1;
			}
		}
		Ok(rewritten)
	}
}

fn collapse(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	let mut in_space = false;
	for ch in text.chars() {
		if ch.is_whitespace() {
			if !in_space {
				out.push(' ');
			}
			in_space = true;
		} else {
			out.push(ch);
			in_space = false;
		}
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::field::FieldId;
	use crate::record::MapRecord;
	use crate::schema::FormSchema;

	const BOTH: Normalization = Normalization {
		trim: true,
		collapse_whitespace: true,
	};

	#[test]
	fn trim_only() {
		let trim = Normalization {
			trim: true,
			collapse_whitespace: false,
		};
		assert_eq!(trim.apply("  a  b "), Some("a  b".to_owned()));
		assert_eq!(trim.apply("a"), None);
	}

	#[test]
	fn collapse_keeps_edges_without_trim() {
		let collapse = Normalization {
			trim: false,
			collapse_whitespace: true,
		};
		assert_eq!(collapse.apply(" a \t\n b "), Some(" a b ".to_owned()));
	}

	#[test]
	fn both_clean_ups_compose() {
		assert_eq!(BOTH.apply("  hello   world \n"), Some("hello world".to_owned()));
	}

	#[test]
	fn apply_to_skips_non_text_and_exempt_fields() {
		let schema = FormSchema::builder().field("raw", |f| f.normalize(false)).build();
		let mut record = MapRecord::new(1)
			.with("title", "  Title  ")
			.with("raw", "  keep  ")
			.with("count", 3i64);

		let rewritten = BOTH.apply_to(&mut record, &schema).unwrap();
		assert_eq!(rewritten, 1);
		assert_eq!(record.get(&FieldId::new("title")), Some(FieldValue::from("Title")));
		assert_eq!(record.get(&FieldId::new("raw")), Some(FieldValue::from("  keep  ")));
		assert_eq!(record.get(&FieldId::new("count")), Some(FieldValue::Int(3)));
	}

	#[test]
	fn noop_leaves_record_alone() {
		let mut record = MapRecord::new(1).with("title", "  x ");
		let rewritten = Normalization::default().apply_to(&mut record, &FormSchema::default()).unwrap();
		assert_eq!(rewritten, 0);
	}
}
