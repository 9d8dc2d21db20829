//! End-to-end behavior of a session driven through its public API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use draftwork_session::{
	AutoSaveHook, BoxError, FieldCommit, FieldId, FieldValue, FormSchema, FormSession, MapRecord, Record, RuleViolation, SubmitHook,
	SubmitOutcome,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use tokio::time::{Instant, sleep};

#[derive(Default)]
struct Commits {
	log: Mutex<Vec<(Duration, FieldCommit)>>,
	start: Mutex<Option<Instant>>,
}

impl Commits {
	fn new() -> Arc<Self> {
		let commits = Arc::new(Self::default());
		*commits.start.lock() = Some(Instant::now());
		commits
	}

	fn all(&self) -> Vec<FieldCommit> {
		self.log.lock().iter().map(|(_, commit)| commit.clone()).collect()
	}

	fn times(&self) -> Vec<Duration> {
		self.log.lock().iter().map(|(at, _)| *at).collect()
	}
}

#[async_trait]
impl AutoSaveHook for Commits {
	async fn commit(&self, commit: FieldCommit) -> Result<(), BoxError> {
		let elapsed = self.start.lock().map_or(Duration::ZERO, |start| start.elapsed());
		self.log.lock().push((elapsed, commit));
		Ok(())
	}
}

#[derive(Default)]
struct Submits {
	calls: Mutex<Vec<&'static str>>,
	fail: bool,
	latency: Option<Duration>,
}

#[async_trait]
impl SubmitHook<MapRecord> for Submits {
	async fn submit(&self, _record: &MapRecord) -> Result<(), BoxError> {
		self.calls.lock().push("submit");
		if let Some(latency) = self.latency {
			sleep(latency).await;
		}
		if self.fail {
			return Err("backend rejected".into());
		}
		Ok(())
	}

	async fn post_submit(&self, _record: &MapRecord, success: bool) {
		self.calls.lock().push(if success { "post:ok" } else { "post:failed" });
	}
}

fn ms(millis: u64) -> Duration {
	Duration::from_millis(millis)
}

fn article() -> MapRecord {
	MapRecord::new(1).with("Title", "").with("Body", "").with("Tags", "")
}

fn build(schema: FormSchema, commits: &Arc<Commits>, submits: &Arc<Submits>) -> FormSession<MapRecord> {
	FormSession::builder(article())
		.schema(schema)
		.autosave_hook(commits.clone())
		.submit_hook(submits.clone())
		.build()
}

fn title_autosave(delay: Duration) -> FormSchema {
	FormSchema::builder().field("Title", |f| f.autosave(delay)).build()
}

fn text(value: &str) -> FieldValue {
	FieldValue::from(value)
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn title_burst_commits_last_value_after_quiet_period() {
	let commits = Commits::new();
	let mut session = build(title_autosave(ms(100)), &commits, &Arc::default());

	session.notify_field_changed("Title", "A").unwrap();
	sleep(ms(50)).await;
	session.notify_field_changed("Title", "AB").unwrap();

	sleep(ms(99)).await;
	session.poll_autosaves();
	assert!(commits.all().is_empty(), "committed before 150ms");

	session.settle().await;
	assert_eq!(commits.times(), vec![ms(150)]);
	assert_eq!(
		commits.all(),
		vec![FieldCommit {
			field: FieldId::new("Title"),
			previous: text(""),
			candidate: text("AB"),
		}]
	);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn many_edits_inside_delay_commit_once() {
	let commits = Commits::new();
	let mut session = build(title_autosave(ms(100)), &commits, &Arc::default());

	let mut value = String::new();
	for ch in "headline".chars() {
		value.push(ch);
		session.notify_field_changed("Title", value.as_str()).unwrap();
		sleep(ms(20)).await;
	}
	session.settle().await;

	let all = commits.all();
	assert_eq!(all.len(), 1);
	assert_eq!(all[0].previous, text(""));
	assert_eq!(all[0].candidate, text("headline"));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn two_autosave_fields_commit_once_each() {
	let commits = Commits::new();
	let schema = FormSchema::builder()
		.field("Title", |f| f.autosave(ms(100)))
		.field("Body", |f| f.autosave(ms(100)))
		.build();
	let mut session = build(schema, &commits, &Arc::default());

	session.notify_field_changed("Title", "T").unwrap();
	session.notify_field_changed("Body", "B").unwrap();
	session.settle().await;

	let mut fields: Vec<_> = commits.all().into_iter().map(|commit| commit.field.to_string()).collect();
	fields.sort();
	assert_eq!(fields, vec!["Body", "Title"]);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn fields_without_autosave_never_commit() {
	let commits = Commits::new();
	let mut session = build(title_autosave(ms(100)), &commits, &Arc::default());

	session.notify_field_changed("Tags", "rust").unwrap();
	assert!(session.has_changes());
	sleep(ms(500)).await;
	assert!(session.settle().await.is_empty());
	assert!(commits.all().is_empty());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn submit_twice_inside_guard_invokes_hook_once() {
	let submits = Arc::new(Submits::default());
	let mut session = build(FormSchema::default(), &Commits::new(), &submits);
	session.notify_field_changed("Title", "Draft").unwrap();

	let first = session.submit().await.unwrap();
	let second = session.submit().await.unwrap();
	assert_eq!((first, second), (SubmitOutcome::Submitted, SubmitOutcome::Duplicate));
	assert_eq!(submits.calls.lock().iter().filter(|call| **call == "submit").count(), 1);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn reset_then_wait_commits_nothing() {
	let commits = Commits::new();
	let mut session = build(title_autosave(ms(100)), &commits, &Arc::default());

	session.notify_field_changed("Title", "Draft").unwrap();
	session.reset_to(article());
	sleep(ms(300)).await;

	assert!(session.settle().await.is_empty());
	assert!(commits.all().is_empty());
	assert!(!session.has_changes());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn invalid_record_yields_one_message_per_failing_field() {
	let submits = Arc::new(Submits::default());
	let mut session = FormSession::builder(article())
		.validator(|record: &MapRecord| -> Vec<RuleViolation> {
			["Title", "Body"]
				.into_iter()
				.filter(|name| record.get(&FieldId::new(name)) == Some(text("")))
				.map(|name| RuleViolation::new(name, "required"))
				.collect()
		})
		.submit_hook(submits.clone())
		.build();

	let outcome = session.submit().await.unwrap();
	assert_eq!(outcome, SubmitOutcome::Invalid { messages: 2 });
	assert!(submits.calls.lock().is_empty());
	assert_eq!(session.messages_for(&FieldId::new("Title")).len(), 1);
	assert_eq!(session.messages_for(&FieldId::new("Body")).len(), 1);
	assert!(session.messages_for(&FieldId::new("Tags")).is_empty());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn teardown_before_delay_prevents_commit() {
	let commits = Commits::new();
	let mut session = build(title_autosave(ms(100)), &commits, &Arc::default());

	session.notify_field_changed("Title", "Draft").unwrap();
	sleep(ms(50)).await;
	session.teardown();
	sleep(ms(250)).await;

	assert!(commits.all().is_empty());
	assert!(session.poll_autosaves().is_empty());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn dropping_the_session_prevents_commit() {
	let commits = Commits::new();
	let mut session = build(title_autosave(ms(100)), &commits, &Arc::default());
	session.notify_field_changed("Title", "Draft").unwrap();
	drop(session);

	sleep(ms(300)).await;
	assert!(commits.all().is_empty());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn cancelled_submit_keeps_changes_and_skips_post_submit() {
	let submits = Arc::new(Submits {
		latency: Some(ms(1_000)),
		..Submits::default()
	});
	let mut session = build(FormSchema::default(), &Commits::new(), &submits);
	session.notify_field_changed("Title", "Draft").unwrap();

	let handle = session.teardown_handle();
	tokio::spawn(async move {
		sleep(ms(10)).await;
		handle.teardown();
	});

	assert_eq!(session.submit().await.unwrap(), SubmitOutcome::Cancelled);
	assert!(session.has_changes());
	assert_eq!(*submits.calls.lock(), vec!["submit"]);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn failed_submit_runs_post_submit_and_returns_error() {
	let submits = Arc::new(Submits {
		fail: true,
		..Submits::default()
	});
	let mut session = build(FormSchema::default(), &Commits::new(), &submits);
	session.notify_field_changed("Title", "Draft").unwrap();

	assert!(session.submit().await.is_err());
	assert_eq!(*submits.calls.lock(), vec!["submit", "post:failed"]);
	assert!(session.has_changes());
	assert!(!session.processing());

	sleep(ms(1_000)).await;
	session.notify_field_changed("Body", "more").unwrap();
	assert!(session.submit().await.is_err());
}
