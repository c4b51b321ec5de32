/// Failures of the hand-off between a caller and the writer thread.
///
/// These never describe the task's own outcome; a task returning `Err` reaches
/// the caller as an `Ok` value carrying that error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutorError {
	/// The executor was shut down before the task could be queued.
	#[error("executor '{0}' is stopped")]
	Stopped(String),
	/// The task was dropped before it produced a result.
	#[error("task '{0}' was abandoned before completion")]
	Abandoned(&'static str),
	/// The task body panicked on the writer thread.
	#[error("task '{task}' panicked: {message}")]
	Panicked { task: &'static str, message: String },
	/// The caller stopped waiting. The task itself still runs to completion.
	#[error("timed out waiting for task '{0}'")]
	TimedOut(&'static str),
}
