//! Configuration system for draftwork sessions.
//!
//! Configuration is written in TOML and declares, once per record schema,
//! which fields autosave and how long they wait, which fields count toward
//! change tracking, and how submission is gated:
//!
//! ```toml
//! [session]
//! submit_guard_ms = 1000      # duplicate-submit window
//! validate_on_change = false  # run validation after every accepted edit
//! track_changes = true        # default for fields without an override
//!
//! [normalize]
//! trim = true
//! collapse_whitespace = false
//!
//! [fields.title]
//! autosave = true
//! delay_ms = 100
//!
//! [fields.notes]
//! track_changes = false
//! normalize = false
//! ```
//!
//! Unknown keys are rejected so typos surface at load time instead of being
//! silently ignored.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

mod error;

pub use error::{ConfigError, Result};

/// Default duplicate-submission window.
pub const DEFAULT_SUBMIT_GUARD_MS: u64 = 1000;

/// Default autosave delay for fields that enable autosave without a delay.
pub const DEFAULT_AUTOSAVE_DELAY_MS: u64 = 500;

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	/// Session-wide behavior.
	pub session: SessionSection,
	/// Text normalization applied before submission.
	pub normalize: NormalizeSection,
	/// Per-field declarations keyed by field name.
	pub fields: BTreeMap<String, FieldSection>,
}

/// `[session]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionSection {
	/// Minimum interval between accepted submissions, in milliseconds.
	pub submit_guard_ms: u64,
	/// Run a validation pass after each accepted edit.
	pub validate_on_change: bool,
	/// Whether undeclared fields count toward change tracking.
	pub track_changes: bool,
}

impl Default for SessionSection {
	fn default() -> Self {
		Self {
			submit_guard_ms: DEFAULT_SUBMIT_GUARD_MS,
			validate_on_change: false,
			track_changes: true,
		}
	}
}

impl SessionSection {
	/// Duplicate-submission window as a [`Duration`].
	pub fn submit_guard(&self) -> Duration {
		Duration::from_millis(self.submit_guard_ms)
	}
}

/// `[normalize]` table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizeSection {
	/// Strip leading and trailing whitespace.
	pub trim: bool,
	/// Replace inner whitespace runs with a single space.
	pub collapse_whitespace: bool,
}

/// `[fields.<name>]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldSection {
	/// Commit this field on its own after it stops changing.
	pub autosave: bool,
	/// Idle time before an autosave commit, in milliseconds.
	pub delay_ms: u64,
	/// Overrides `session.track_changes` for this field.
	pub track_changes: Option<bool>,
	/// Set to `false` to exempt this field from normalization.
	pub normalize: Option<bool>,
}

impl Default for FieldSection {
	fn default() -> Self {
		Self {
			autosave: false,
			delay_ms: DEFAULT_AUTOSAVE_DELAY_MS,
			track_changes: None,
			normalize: None,
		}
	}
}

impl FieldSection {
	/// Autosave delay as a [`Duration`].
	pub fn delay(&self) -> Duration {
		Duration::from_millis(self.delay_ms)
	}
}

impl Config {
	/// Parses configuration from TOML text.
	pub fn parse(input: &str) -> Result<Self> {
		let config: Self = toml::from_str(input)?;
		config.validate()?;
		Ok(config)
	}

	/// Reads and parses a configuration file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let input = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::parse(&input)
	}

	/// Rejects blank or whitespace-padded field names.
	pub fn validate(&self) -> Result<()> {
		for name in self.fields.keys() {
			if name.trim().is_empty() {
				return Err(ConfigError::InvalidField {
					field: name.clone(),
					reason: "field names must not be blank",
				});
			}
			if name.trim() != name {
				return Err(ConfigError::InvalidField {
					field: name.clone(),
					reason: "field names must not have surrounding whitespace",
				});
			}
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn empty_input_yields_defaults() {
		let config = Config::parse("").unwrap();
		assert_eq!(config, Config::default());
		assert_eq!(config.session.submit_guard(), Duration::from_secs(1));
		assert!(config.session.track_changes);
		assert!(config.fields.is_empty());
	}

	#[test]
	fn parses_field_declarations() {
		let config = Config::parse(
			r#"
			[session]
			submit_guard_ms = 250
			validate_on_change = true

			[normalize]
			trim = true

			[fields.title]
			autosave = true
			delay_ms = 100

			[fields.notes]
			track_changes = false
			normalize = false
			"#,
		)
		.unwrap();

		assert_eq!(config.session.submit_guard(), Duration::from_millis(250));
		assert!(config.session.validate_on_change);
		assert_eq!(
			config.normalize,
			NormalizeSection {
				trim: true,
				collapse_whitespace: false
			}
		);

		let title = &config.fields["title"];
		assert!(title.autosave);
		assert_eq!(title.delay(), Duration::from_millis(100));
		assert_eq!(title.track_changes, None);

		let notes = &config.fields["notes"];
		assert!(!notes.autosave);
		assert_eq!(notes.delay(), Duration::from_millis(DEFAULT_AUTOSAVE_DELAY_MS));
		assert_eq!(notes.track_changes, Some(false));
		assert_eq!(notes.normalize, Some(false));
	}

	#[test]
	fn rejects_unknown_keys() {
		let err = Config::parse("[fields.title]\nautosav = true\n").unwrap_err();
		assert!(matches!(err, ConfigError::Toml(_)), "got {err:?}");
	}

	#[test]
	fn rejects_blank_field_names() {
		let err = Config::parse("[fields.\" \"]\nautosave = true\n").unwrap_err();
		assert!(matches!(err, ConfigError::InvalidField { .. }), "got {err:?}");
	}

	#[test]
	fn load_reports_missing_file_path() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("missing.toml");
		let err = Config::load(&path).unwrap_err();
		match err {
			ConfigError::Io { path: reported, .. } => assert_eq!(reported, path),
			other => panic!("expected I/O error, got {other:?}"),
		}
	}

	#[test]
	fn load_reads_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[fields.body]\nautosave = true\ndelay_ms = 20").unwrap();
		let config = Config::load(file.path()).unwrap();
		assert_eq!(config.fields["body"].delay(), Duration::from_millis(20));
	}
}
