//! Validation adapter.
//!
//! Rule evaluation and message translation are external concerns. The
//! adapter calls the [`Validator`], renders each [`RuleViolation`] through
//! the [`Translator`], and hands back a complete [`ValidationMessages`] set
//! that the session swaps in as a single value.

use std::collections::HashMap;
use std::sync::Arc;

use crate::field::FieldId;

/// One failed rule as reported by the rule evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleViolation {
	/// Field the rule applies to.
	pub field: FieldId,
	/// Message key handed to the translator.
	pub key: String,
	/// Positional arguments for the message.
	pub args: Vec<String>,
}

impl RuleViolation {
	/// Creates a violation without arguments.
	pub fn new(field: impl Into<FieldId>, key: impl Into<String>) -> Self {
		Self {
			field: field.into(),
			key: key.into(),
			args: Vec::new(),
		}
	}

	/// Appends a positional argument.
	pub fn arg(mut self, arg: impl Into<String>) -> Self {
		self.args.push(arg.into());
		self
	}
}

/// Field-scoped, rendered validation message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationMessage {
	/// Field the message belongs to.
	pub field: FieldId,
	/// Rendered text.
	pub text: String,
}

/// Immutable message set produced by one validation pass.
pub type ValidationMessages = Arc<[ValidationMessage]>;

/// External rule evaluator.
pub trait Validator<R>: Send + Sync + 'static {
	/// Evaluates every rule against `record`.
	fn validate(&self, record: &R) -> Vec<RuleViolation>;
}

impl<R, F> Validator<R> for F
where
	F: Fn(&R) -> Vec<RuleViolation> + Send + Sync + 'static,
{
	fn validate(&self, record: &R) -> Vec<RuleViolation> {
		self(record)
	}
}

/// Validator that accepts every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoValidation;

impl<R> Validator<R> for NoValidation {
	fn validate(&self, _record: &R) -> Vec<RuleViolation> {
		Vec::new()
	}
}

/// External message renderer. The session never inspects its output.
pub trait Translator: Send + Sync + 'static {
	/// Renders `key` with positional `args`.
	fn translate(&self, key: &str, args: &[String]) -> String;
}

/// Template catalog translator.
///
/// Templates use `{0}`, `{1}`, ... placeholders. Unknown keys render as the
/// key itself with the same substitution applied.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
	templates: HashMap<String, String>,
}

impl Catalog {
	/// Creates an empty catalog.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds one template.
	pub fn with(mut self, key: impl Into<String>, template: impl Into<String>) -> Self {
		self.templates.insert(key.into(), template.into());
		self
	}
}

impl Translator for Catalog {
	fn translate(&self, key: &str, args: &[String]) -> String {
		let template = self.templates.get(key).map_or(key, String::as_str);
		args.iter()
			.enumerate()
			.fold(template.to_owned(), |text, (index, arg)| text.replace(&format!("{{{index}}}"), arg))
	}
}

/// Bridges the external evaluator and translator into message sets.
#[derive(Clone)]
pub struct ValidationAdapter<R> {
	validator: Arc<dyn Validator<R>>,
	translator: Arc<dyn Translator>,
}

impl<R: 'static> Default for ValidationAdapter<R> {
	fn default() -> Self {
		Self::new(Arc::new(NoValidation), Arc::new(Catalog::new()))
	}
}

impl<R> std::fmt::Debug for ValidationAdapter<R> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ValidationAdapter").finish_non_exhaustive()
	}
}

impl<R: 'static> ValidationAdapter<R> {
	/// Creates an adapter over the given collaborators.
	pub fn new(validator: Arc<dyn Validator<R>>, translator: Arc<dyn Translator>) -> Self {
		Self { validator, translator }
	}

	/// Runs one validation pass and renders its messages in evaluator order.
	pub fn validate(&self, record: &R) -> ValidationMessages {
		let violations = self.validator.validate(record);
		tracing::debug!(violations = violations.len(), "validation.pass");
		violations
			.into_iter()
			.map(|violation| ValidationMessage {
				text: self.translator.translate(&violation.key, &violation.args),
				field: violation.field,
			})
			.collect()
	}
}

/// Messages in `messages` that belong to `field`.
pub fn messages_for<'a>(messages: &'a [ValidationMessage], field: &'a FieldId) -> impl Iterator<Item = &'a ValidationMessage> + 'a {
	messages.iter().filter(move |message| &message.field == field)
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::record::{MapRecord, Record};
	use crate::field::FieldValue;

	fn required(record: &MapRecord) -> Vec<RuleViolation> {
		record
			.iter()
			.filter(|(_, value)| matches!(value, FieldValue::Null) || value.as_text() == Some(""))
			.map(|(field, _)| RuleViolation::new(field.clone(), "required").arg(field.as_str()))
			.collect()
	}

	#[test]
	fn catalog_substitutes_positional_args() {
		let catalog = Catalog::new().with("too_long", "{0} must be at most {1} characters");
		assert_eq!(
			catalog.translate("too_long", &["Title".into(), "80".into()]),
			"Title must be at most 80 characters"
		);
	}

	#[test]
	fn catalog_falls_back_to_key() {
		assert_eq!(Catalog::new().translate("required", &[]), "required");
	}

	#[test]
	fn adapter_renders_one_message_per_violation() {
		let adapter = ValidationAdapter::new(
			Arc::new(required),
			Arc::new(Catalog::new().with("required", "{0} is required")),
		);
		let record = MapRecord::new(1).with("title", "").with("body", FieldValue::Null).with("tags", "x");

		let messages = adapter.validate(&record);
		assert_eq!(
			messages.to_vec(),
			vec![
				ValidationMessage {
					field: FieldId::new("body"),
					text: "body is required".into(),
				},
				ValidationMessage {
					field: FieldId::new("title"),
					text: "title is required".into(),
				},
			]
		);
		assert_eq!(messages_for(&messages, &FieldId::new("title")).count(), 1);
		assert_eq!(record.id(), 1);
	}

	#[test]
	fn default_adapter_accepts_everything() {
		let adapter = ValidationAdapter::<MapRecord>::default();
		assert!(adapter.validate(&MapRecord::new(1).with("title", "")).is_empty());
	}
}
