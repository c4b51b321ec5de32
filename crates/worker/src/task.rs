use std::fmt;

/// A deferred unit of work destined for the writer thread.
///
/// `name` is a static operation label (`"set-attribute"`, `"create-child"`)
/// used for logging and error reporting; `detail` names the target.
pub struct Task<R> {
	name: &'static str,
	detail: String,
	work: Box<dyn FnOnce() -> R + Send + 'static>,
}

impl<R> Task<R> {
	/// Creates a task.
	pub fn new(name: &'static str, detail: impl Into<String>, work: impl FnOnce() -> R + Send + 'static) -> Self {
		Self {
			name,
			detail: detail.into(),
			work: Box::new(work),
		}
	}

	/// Returns the operation label.
	pub fn name(&self) -> &'static str {
		self.name
	}

	/// Returns the target description.
	pub fn detail(&self) -> &str {
		&self.detail
	}

	/// Runs the task body on the current thread.
	pub(crate) fn run(self) -> R {
		(self.work)()
	}
}

impl<R> fmt::Debug for Task<R> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Task").field("name", &self.name).field("detail", &self.detail).finish_non_exhaustive()
	}
}
