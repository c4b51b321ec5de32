use std::time::Duration;

use serde::Deserialize;

const DEFAULT_THREAD_NAME: &str = "keel-writer";

/// Settings for one writer thread.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutorConfig {
	/// OS thread name of the writer.
	pub thread_name: String,
	/// Caller-side wait deadline in milliseconds. `None` waits indefinitely.
	pub wait_timeout_ms: Option<u64>,
}

impl Default for ExecutorConfig {
	fn default() -> Self {
		Self {
			thread_name: DEFAULT_THREAD_NAME.to_string(),
			wait_timeout_ms: None,
		}
	}
}

impl ExecutorConfig {
	/// Returns the caller-side wait deadline, if any.
	pub fn wait_timeout(&self) -> Option<Duration> {
		self.wait_timeout_ms.map(Duration::from_millis)
	}
}
