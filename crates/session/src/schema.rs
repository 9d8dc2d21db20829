//! Static field capability declarations.
//!
//! A [`FormSchema`] is built once per record schema, either with
//! [`FormSchema::builder`] or from a parsed [`draftwork_config::Config`], and
//! answers every per-field question the session asks at edit time with a map
//! lookup.

use std::collections::HashMap;
use std::time::Duration;

use draftwork_config::Config;

use crate::field::FieldId;

/// Autosave declaration for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoSaveConfig {
	/// Whether edits to the field are committed on their own.
	pub enabled: bool,
	/// Idle time after the last edit before the commit fires.
	pub delay: Duration,
}

impl AutoSaveConfig {
	/// Enabled autosave with the given delay.
	pub const fn after(delay: Duration) -> Self {
		Self { enabled: true, delay }
	}
}

/// Every capability declared for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldConfig {
	/// Autosave declaration, if any.
	pub autosave: Option<AutoSaveConfig>,
	/// Whether edits set `has_changes`.
	pub track_changes: bool,
	/// Whether submit-time normalization applies to the field.
	pub normalize: bool,
}

impl Default for FieldConfig {
	fn default() -> Self {
		Self {
			autosave: None,
			track_changes: true,
			normalize: true,
		}
	}
}

/// Per-field capability lookup consumed by the session.
pub trait FieldMetadata: Send + Sync + 'static {
	/// Autosave declaration for `field`, if any.
	fn autosave(&self, field: &FieldId) -> Option<AutoSaveConfig>;

	/// Whether edits to `field` count as unsaved changes.
	fn tracks_changes(&self, field: &FieldId) -> bool;

	/// Whether submit-time normalization applies to `field`.
	fn normalizes(&self, field: &FieldId) -> bool;
}

/// Statically declared field capability map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSchema {
	fields: HashMap<FieldId, FieldConfig>,
	fallback: FieldConfig,
}

impl FormSchema {
	/// Starts a schema declaration.
	pub fn builder() -> FormSchemaBuilder {
		FormSchemaBuilder::default()
	}

	/// Builds a schema from the `[session]` and `[fields.*]` tables.
	pub fn from_config(config: &Config) -> Self {
		let mut builder = Self::builder().track_changes_by_default(config.session.track_changes);
		for (name, section) in &config.fields {
			let track = section.track_changes.unwrap_or(config.session.track_changes);
			builder = builder.field(name.as_str(), |field| {
				let field = if section.autosave {
					field.autosave(section.delay())
				} else {
					field.no_autosave()
				};
				field.track_changes(track).normalize(section.normalize.unwrap_or(true))
			});
		}
		builder.build()
	}

	/// Declaration for `field`, falling back to the schema default.
	pub fn config(&self, field: &FieldId) -> FieldConfig {
		self.fields.get(field).copied().unwrap_or(self.fallback)
	}

	/// Fields with autosave enabled.
	pub fn autosave_fields(&self) -> impl Iterator<Item = (&FieldId, AutoSaveConfig)> {
		self.fields
			.iter()
			.filter_map(|(id, config)| config.autosave.filter(|autosave| autosave.enabled).map(|autosave| (id, autosave)))
	}
}

impl FieldMetadata for FormSchema {
	fn autosave(&self, field: &FieldId) -> Option<AutoSaveConfig> {
		self.config(field).autosave.filter(|autosave| autosave.enabled)
	}

	fn tracks_changes(&self, field: &FieldId) -> bool {
		self.config(field).track_changes
	}

	fn normalizes(&self, field: &FieldId) -> bool {
		self.config(field).normalize
	}
}

/// Builder for [`FormSchema`].
#[derive(Debug, Default)]
pub struct FormSchemaBuilder {
	schema: FormSchema,
}

impl FormSchemaBuilder {
	/// Sets change tracking for fields without an explicit declaration.
	pub fn track_changes_by_default(mut self, track: bool) -> Self {
		self.schema.fallback.track_changes = track;
		self
	}

	/// Declares one field. The closure starts from the schema default.
	pub fn field(mut self, field: impl Into<FieldId>, declare: impl FnOnce(FieldDecl) -> FieldDecl) -> Self {
		let decl = declare(FieldDecl(self.schema.fallback));
		self.schema.fields.insert(field.into(), decl.0);
		self
	}

	/// Finishes the declaration.
	pub fn build(self) -> FormSchema {
		self.schema
	}
}

/// One field declaration inside [`FormSchemaBuilder::field`].
#[derive(Debug, Clone, Copy)]
pub struct FieldDecl(FieldConfig);

impl FieldDecl {
	/// Enables autosave after `delay` of inactivity.
	pub fn autosave(mut self, delay: Duration) -> Self {
		self.0.autosave = Some(AutoSaveConfig::after(delay));
		self
	}

	/// Disables autosave.
	pub fn no_autosave(mut self) -> Self {
		self.0.autosave = None;
		self
	}

	/// Sets whether edits count as unsaved changes.
	pub fn track_changes(mut self, track: bool) -> Self {
		self.0.track_changes = track;
		self
	}

	/// Sets whether submit-time normalization applies.
	pub fn normalize(mut self, normalize: bool) -> Self {
		self.0.normalize = normalize;
		self
	}
}
