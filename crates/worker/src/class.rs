/// Execution classes used for worker scheduling and observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Delay timers that only signal expiry back to their owner.
	Timer,
	/// Commit work that calls out to external save functions and may suspend.
	Commit,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Timer => "timer",
			Self::Commit => "commit",
		}
	}
}
