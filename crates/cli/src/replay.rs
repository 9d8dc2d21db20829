//! Drives a [`FormSession`] through a script on the tokio clock.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use draftwork_config::Config;
use draftwork_session::{
	AutoSaveEvent, AutoSaveHook, BoxError, Catalog, FieldCommit, FieldId, FieldValue, FormSession, MapRecord, Record, RuleViolation,
	SessionError, SubmitHook, SubmitOutcome,
};
use parking_lot::Mutex;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, info};

use crate::script::{Action, HooksSection, Script};

/// In-memory backend standing in for remote storage.
#[derive(Debug, Default)]
pub struct Store {
	saved: Mutex<BTreeMap<FieldId, FieldValue>>,
	behavior: HooksSection,
	failing: HashSet<FieldId>,
}

impl Store {
	pub fn new(behavior: HooksSection) -> Arc<Self> {
		Arc::new(Self {
			failing: behavior.fail_fields.iter().map(FieldId::new).collect(),
			behavior,
			saved: Mutex::default(),
		})
	}

	pub fn saved(&self) -> BTreeMap<FieldId, FieldValue> {
		self.saved.lock().clone()
	}
}

async fn latency(millis: u64) {
	if millis > 0 {
		sleep(Duration::from_millis(millis)).await;
	}
}

#[async_trait]
impl AutoSaveHook for Store {
	async fn commit(&self, commit: FieldCommit) -> Result<(), BoxError> {
		latency(self.behavior.autosave_latency_ms).await;
		if self.failing.contains(&commit.field) {
			return Err(format!("storage rejected '{}'", commit.field).into());
		}
		self.saved.lock().insert(commit.field, commit.candidate);
		Ok(())
	}
}

#[async_trait]
impl SubmitHook<MapRecord> for Store {
	async fn submit(&self, record: &MapRecord) -> Result<(), BoxError> {
		latency(self.behavior.submit_latency_ms).await;
		if self.behavior.fail_submit {
			return Err("backend rejected the record".into());
		}
		let mut saved = self.saved.lock();
		for (field, value) in record.iter() {
			saved.insert(field.clone(), value.clone());
		}
		Ok(())
	}

	async fn post_submit(&self, record: &MapRecord, success: bool) {
		debug!(record = record.id(), success, "replay.post_submit");
	}
}

/// Timestamped lines describing what the session did.
#[derive(Debug)]
pub struct Transcript {
	start: Instant,
	lines: Vec<String>,
}

impl Transcript {
	fn new(start: Instant) -> Self {
		Self { start, lines: Vec::new() }
	}

	fn push(&mut self, text: impl Into<String>) {
		let elapsed = self.start.elapsed().as_millis();
		self.lines.push(format!("{elapsed:>6}ms  {}", text.into()));
	}

	fn event(&mut self, event: &AutoSaveEvent) {
		let text = match event {
			AutoSaveEvent::Started { field, candidate } => format!("autosave {field} started: {candidate}"),
			AutoSaveEvent::Deferred { field } => format!("autosave {field} deferred"),
			AutoSaveEvent::Committed { field, value } => format!("autosave {field} committed: {value}"),
			AutoSaveEvent::Failed(error) => format!("autosave failed: {error}"),
		};
		self.push(text);
	}

	pub fn lines(&self) -> &[String] {
		&self.lines
	}
}

fn required_rule(required: Vec<FieldId>) -> impl Fn(&MapRecord) -> Vec<RuleViolation> + Send + Sync + 'static {
	move |record| {
		required
			.iter()
			.filter(|field| match record.get(field) {
				None | Some(FieldValue::Null) => true,
				Some(value) => value.as_text().is_some_and(|text| text.trim().is_empty()),
			})
			.map(|field| RuleViolation::new(field.clone(), "required").arg(field.as_str()))
			.collect()
	}
}

fn catalog(messages: &BTreeMap<String, String>) -> Catalog {
	messages
		.iter()
		.fold(Catalog::new().with("required", "{0} is required"), |catalog, (key, template)| {
			catalog.with(key.as_str(), template.as_str())
		})
}

/// Runs `script` to completion and returns the transcript and final store.
pub async fn run(script: &Script, config: &Config) -> anyhow::Result<(Transcript, Arc<Store>)> {
	let store = Store::new(script.hooks.clone());
	let required = script.validation.required.iter().map(FieldId::new).collect();
	let mut session = FormSession::builder(script.record.build())
		.config(config)
		.validator(required_rule(required))
		.translator(catalog(&script.validation.messages))
		.autosave_hook(store.clone())
		.submit_hook(store.clone())
		.build();

	let start = Instant::now();
	let mut transcript = Transcript::new(start);
	info!(steps = script.steps.len(), "replay.start");

	for step in &script.steps {
		let deadline = start + Duration::from_millis(step.at_ms);
		loop {
			tokio::select! {
				biased;
				() = sleep_until(deadline) => break,
				event = session.next_autosave_event() => match event {
					Some(event) => transcript.event(&event),
					None => {
						sleep_until(deadline).await;
						break;
					}
				},
			}
		}
		apply(&mut session, &step.action, script, &mut transcript).await;
	}

	for event in session.settle().await {
		transcript.event(&event);
	}
	if !session.is_torn_down() {
		transcript.push(format!("done: has_changes={}", session.has_changes()));
	}
	session.teardown();
	info!(lines = transcript.lines.len(), "replay.finish");
	Ok((transcript, store))
}

async fn apply(session: &mut FormSession<MapRecord>, action: &Action, script: &Script, transcript: &mut Transcript) {
	match action {
		Action::Edit { field, value } => match session.notify_field_changed(field.as_str(), value.clone()) {
			Ok(true) => transcript.push(format!("edit {field} = {value}")),
			Ok(false) => transcript.push(format!("edit {field} unchanged")),
			Err(SessionError::TornDown) => transcript.push(format!("edit {field} ignored: session torn down")),
			Err(error) => transcript.push(format!("edit {field} rejected: {error}")),
		},
		Action::Submit => {
			let line = match session.submit().await {
				Ok(SubmitOutcome::Submitted) => "submit: submitted".to_owned(),
				Ok(SubmitOutcome::Invalid { messages }) => {
					let mut line = format!("submit: invalid ({messages} messages)");
					for message in session.validation_messages().iter() {
						let _ = write!(line, "; {}: {}", message.field, message.text);
					}
					line
				}
				Ok(SubmitOutcome::Duplicate) => "submit: duplicate ignored".to_owned(),
				Ok(SubmitOutcome::Cancelled) => "submit: cancelled".to_owned(),
				Err(error) => format!("submit: failed: {error}"),
			};
			transcript.push(line);
		}
		Action::Validate => {
			let valid = session.validate();
			transcript.push(format!("validate: {}", if valid { "valid" } else { "invalid" }));
		}
		Action::Flush => {
			for event in session.flush_autosaves() {
				transcript.event(&event);
			}
		}
		Action::Reset => {
			session.reset_to(script.record.build());
			transcript.push("reset");
		}
		Action::Teardown => {
			session.teardown();
			transcript.push("teardown");
		}
	}
}
