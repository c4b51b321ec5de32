use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::ExecutorError;

enum Slot<T> {
	Pending,
	Ready(Result<T, ExecutorError>),
	Taken,
}

struct Shared<T> {
	slot: Mutex<Slot<T>>,
	ready: Condvar,
}

/// Writer-side half of a completion slot.
///
/// Dropping it without calling [`Completer::complete`] marks the task abandoned,
/// so a waiting caller never blocks forever.
pub(crate) struct Completer<T> {
	task: &'static str,
	shared: Option<Arc<Shared<T>>>,
}

/// Caller-side half of a completion slot.
pub struct TaskHandle<T> {
	task: &'static str,
	shared: Arc<Shared<T>>,
}

pub(crate) fn completion<T>(task: &'static str) -> (Completer<T>, TaskHandle<T>) {
	let shared = Arc::new(Shared {
		slot: Mutex::new(Slot::Pending),
		ready: Condvar::new(),
	});
	(
		Completer {
			task,
			shared: Some(Arc::clone(&shared)),
		},
		TaskHandle { task, shared },
	)
}

impl<T> Completer<T> {
	pub(crate) fn complete(mut self, result: Result<T, ExecutorError>) {
		if let Some(shared) = self.shared.take() {
			fill(&shared, result);
		}
	}
}

impl<T> Drop for Completer<T> {
	fn drop(&mut self) {
		if let Some(shared) = self.shared.take() {
			tracing::warn!(task = self.task, "worker.completion.abandoned");
			fill(&shared, Err(ExecutorError::Abandoned(self.task)));
		}
	}
}

fn fill<T>(shared: &Shared<T>, result: Result<T, ExecutorError>) {
	let mut slot = shared.slot.lock();
	*slot = Slot::Ready(result);
	drop(slot);
	shared.ready.notify_all();
}

impl<T> TaskHandle<T> {
	/// Returns the label of the task this handle waits on.
	pub fn task_name(&self) -> &'static str {
		self.task
	}

	/// Returns true once the writer has finished with the task.
	pub fn is_finished(&self) -> bool {
		!matches!(*self.shared.slot.lock(), Slot::Pending)
	}

	/// Blocks until the task completes.
	pub fn wait(self) -> Result<T, ExecutorError> {
		let mut slot = self.shared.slot.lock();
		while matches!(*slot, Slot::Pending) {
			self.shared.ready.wait(&mut slot);
		}
		take(&mut slot, self.task)
	}

	/// Blocks until the task completes or `timeout` elapses.
	///
	/// On timeout the task is not cancelled; it still runs to completion on the
	/// writer thread and its result is discarded.
	pub fn wait_timeout(self, timeout: Duration) -> Result<T, ExecutorError> {
		let deadline = Instant::now() + timeout;
		let mut slot = self.shared.slot.lock();
		while matches!(*slot, Slot::Pending) {
			if self.shared.ready.wait_until(&mut slot, deadline).timed_out() && matches!(*slot, Slot::Pending) {
				return Err(ExecutorError::TimedOut(self.task));
			}
		}
		take(&mut slot, self.task)
	}
}

fn take<T>(slot: &mut Slot<T>, task: &'static str) -> Result<T, ExecutorError> {
	match std::mem::replace(slot, Slot::Taken) {
		Slot::Ready(result) => result,
		Slot::Pending | Slot::Taken => Err(ExecutorError::Abandoned(task)),
	}
}
