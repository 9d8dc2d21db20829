//! Replay script model.
//!
//! ```toml
//! [record]
//! id = 1
//! fields = { title = "", body = "" }
//!
//! [validation]
//! required = ["title"]
//! messages = { required = "{0} is required" }
//!
//! [hooks]
//! autosave_latency_ms = 20
//! fail_fields = ["body"]
//!
//! [config.fields.title]
//! autosave = true
//! delay_ms = 100
//!
//! [[steps]]
//! at_ms = 0
//! action = "edit"
//! field = "title"
//! value = "A"
//!
//! [[steps]]
//! at_ms = 400
//! action = "submit"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, bail};
use draftwork_config::Config;
use draftwork_session::{FieldValue, MapRecord};
use serde::Deserialize;

/// Parsed replay script.
#[derive(Debug, Clone, Deserialize)]
pub struct Script {
	pub record: RecordSection,
	#[serde(default)]
	pub validation: ValidationSection,
	#[serde(default)]
	pub hooks: HooksSection,
	/// Session configuration used when no `--config` is given.
	#[serde(default)]
	pub config: Option<Config>,
	#[serde(default)]
	pub steps: Vec<Step>,
}

/// Initial record contents.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordSection {
	pub id: u64,
	pub fields: BTreeMap<String, FieldValue>,
}

impl RecordSection {
	/// Builds a fresh record with the initial values.
	pub fn build(&self) -> MapRecord {
		self.fields
			.iter()
			.fold(MapRecord::new(self.id), |record, (name, value)| record.with(name.as_str(), value.clone()))
	}
}

/// Required-field rules and their message templates.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationSection {
	pub required: Vec<String>,
	pub messages: BTreeMap<String, String>,
}

/// Simulated backend behavior.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HooksSection {
	pub autosave_latency_ms: u64,
	pub submit_latency_ms: u64,
	/// Fields whose autosave commits fail.
	pub fail_fields: Vec<String>,
	pub fail_submit: bool,
}

/// One timed action.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Step {
	/// Offset from the start of the replay.
	pub at_ms: u64,
	#[serde(flatten)]
	pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
	Edit { field: String, value: FieldValue },
	Submit,
	Validate,
	Flush,
	Reset,
	Teardown,
}

impl Script {
	pub fn parse(text: &str) -> anyhow::Result<Self> {
		let script: Self = toml::from_str(text)?;
		script.check()?;
		Ok(script)
	}

	pub fn load(path: &Path) -> anyhow::Result<Self> {
		let text = std::fs::read_to_string(path).with_context(|| format!("reading script {}", path.display()))?;
		Self::parse(&text).with_context(|| format!("parsing script {}", path.display()))
	}

	fn check(&self) -> anyhow::Result<()> {
		if let Some(pair) = self.steps.windows(2).find(|pair| pair[1].at_ms < pair[0].at_ms) {
			bail!("steps out of order: {}ms follows {}ms", pair[1].at_ms, pair[0].at_ms);
		}
		if let Some(config) = &self.config {
			config.validate()?;
		}
		for name in &self.validation.required {
			if !self.record.fields.contains_key(name) {
				bail!("required field '{name}' is not part of the record");
			}
		}
		Ok(())
	}
}
