use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters for one executor.
#[derive(Debug, Default)]
pub struct ExecutorStats {
	submitted: AtomicU64,
	completed: AtomicU64,
	panicked: AtomicU64,
	inline: AtomicU64,
}

/// Point-in-time copy of [`ExecutorStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorStatsSnapshot {
	/// Tasks handed to the writer thread.
	pub submitted: u64,
	/// Tasks the writer finished, including panicked ones.
	pub completed: u64,
	/// Tasks whose body panicked.
	pub panicked: u64,
	/// Tasks run inline because the caller already was the writer.
	pub inline: u64,
}

impl ExecutorStatsSnapshot {
	/// Tasks queued but not yet finished.
	pub fn pending(&self) -> u64 {
		self.submitted.saturating_sub(self.completed)
	}
}

impl ExecutorStats {
	pub(crate) fn on_submit(&self) {
		self.submitted.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn on_complete(&self, panicked: bool) {
		if panicked {
			self.panicked.fetch_add(1, Ordering::Relaxed);
		}
		self.completed.fetch_add(1, Ordering::Release);
	}

	pub(crate) fn on_inline(&self) {
		self.inline.fetch_add(1, Ordering::Relaxed);
	}

	/// Returns a snapshot of the counters.
	pub fn snapshot(&self) -> ExecutorStatsSnapshot {
		ExecutorStatsSnapshot {
			completed: self.completed.load(Ordering::Acquire),
			submitted: self.submitted.load(Ordering::Relaxed),
			panicked: self.panicked.load(Ordering::Relaxed),
			inline: self.inline.load(Ordering::Relaxed),
		}
	}
}
