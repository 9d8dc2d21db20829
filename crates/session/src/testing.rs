//! Recording hooks shared by the unit tests.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::error::{AutoSaveError, BoxError};
use crate::field::FieldId;
use crate::hooks::{AutoSaveHook, FieldCommit, SubmitHook};
use crate::record::Record;

/// Autosave hook that records every commit with its start time.
#[derive(Default)]
pub(crate) struct RecordingHook {
	pub commits: Mutex<Vec<(Instant, FieldCommit)>>,
	pub failures: Mutex<Vec<AutoSaveError>>,
	pub failing: Mutex<HashSet<FieldId>>,
	pub latency: Option<Duration>,
}

impl RecordingHook {
	pub(crate) fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub(crate) fn with_latency(latency: Duration) -> Arc<Self> {
		Arc::new(Self {
			latency: Some(latency),
			..Self::default()
		})
	}

	pub(crate) fn fail(&self, field: &str) {
		self.failing.lock().insert(FieldId::new(field));
	}

	pub(crate) fn commits(&self) -> Vec<FieldCommit> {
		self.commits.lock().iter().map(|(_, commit)| commit.clone()).collect()
	}

	pub(crate) fn count(&self) -> usize {
		self.commits.lock().len()
	}
}

#[async_trait]
impl AutoSaveHook for RecordingHook {
	async fn commit(&self, commit: FieldCommit) -> Result<(), BoxError> {
		let failing = self.failing.lock().contains(&commit.field);
		self.commits.lock().push((Instant::now(), commit));
		if let Some(latency) = self.latency {
			tokio::time::sleep(latency).await;
		}
		if failing {
			return Err("storage unavailable".into());
		}
		Ok(())
	}

	fn autosave_failed(&self, error: &AutoSaveError) {
		self.failures.lock().push(error.clone());
	}
}

/// Submit hook that records each call by name.
#[derive(Default)]
pub(crate) struct RecordingSubmit {
	pub calls: Mutex<Vec<String>>,
	pub fail_pre: bool,
	pub fail_submit: bool,
	pub latency: Option<Duration>,
}

impl RecordingSubmit {
	pub(crate) fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub(crate) fn calls(&self) -> Vec<String> {
		self.calls.lock().clone()
	}

	pub(crate) fn submits(&self) -> usize {
		self.calls.lock().iter().filter(|call| *call == "submit").count()
	}
}

#[async_trait]
impl<R: Record> SubmitHook<R> for RecordingSubmit {
	async fn pre_submit(&self, _record: &R) -> Result<(), BoxError> {
		self.calls.lock().push("pre".to_owned());
		if self.fail_pre {
			return Err("not allowed".into());
		}
		Ok(())
	}

	async fn submit(&self, _record: &R) -> Result<(), BoxError> {
		self.calls.lock().push("submit".to_owned());
		if let Some(latency) = self.latency {
			tokio::time::sleep(latency).await;
		}
		if self.fail_submit {
			return Err("backend rejected".into());
		}
		Ok(())
	}

	async fn post_submit(&self, _record: &R, success: bool) {
		self.calls.lock().push(format!("post:{success}"));
	}
}
