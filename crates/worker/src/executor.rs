use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{JoinHandle, ThreadId};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::completion::completion;
use crate::{ExecutorConfig, ExecutorError, ExecutorStats, ExecutorStatsSnapshot, Task, TaskHandle, spawn_named_thread};

enum Envelope {
	Run(Box<dyn FnOnce() + Send + 'static>),
	Stop,
}

struct Inner {
	name: String,
	tx: mpsc::UnboundedSender<Envelope>,
	writer: ThreadId,
	join: Mutex<Option<JoinHandle<()>>>,
	stopped: AtomicBool,
	stats: Arc<ExecutorStats>,
	wait_timeout: Option<Duration>,
}

/// A dedicated writer thread draining a FIFO task queue.
///
/// Cloning is cheap and every clone targets the same thread. The thread exits
/// once [`Executor::shutdown`] is called or the last clone is dropped.
#[derive(Clone)]
pub struct Executor {
	inner: Arc<Inner>,
}

impl std::fmt::Debug for Executor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Executor")
			.field("name", &self.inner.name)
			.field("stopped", &self.inner.stopped.load(Ordering::Acquire))
			.finish_non_exhaustive()
	}
}

impl Executor {
	/// Spawns the writer thread.
	pub fn start(config: &ExecutorConfig) -> std::io::Result<Self> {
		let (tx, rx) = mpsc::unbounded_channel();
		let stats = Arc::new(ExecutorStats::default());
		let name = config.thread_name.clone();
		let join = spawn_named_thread(name.clone(), {
			let stats = Arc::clone(&stats);
			let name = name.clone();
			move || writer_loop(&name, rx, &stats)
		})?;
		let writer = join.thread().id();
		tracing::info!(executor = %name, ?writer, "worker.executor.started");

		Ok(Self {
			inner: Arc::new(Inner {
				name,
				tx,
				writer,
				join: Mutex::new(Some(join)),
				stopped: AtomicBool::new(false),
				stats,
				wait_timeout: config.wait_timeout(),
			}),
		})
	}

	/// Returns the writer thread name.
	pub fn name(&self) -> &str {
		&self.inner.name
	}

	/// Returns true when called from the writer thread.
	pub fn is_writer_thread(&self) -> bool {
		std::thread::current().id() == self.inner.writer
	}

	/// Returns true once [`Executor::shutdown`] has been called.
	pub fn is_stopped(&self) -> bool {
		self.inner.stopped.load(Ordering::Acquire)
	}

	/// Enqueues `task` without waiting for it.
	///
	/// A task submitted from the writer thread itself is queued behind the
	/// current one; waiting on its handle from there would deadlock.
	pub fn submit<R: Send + 'static>(&self, task: Task<R>) -> Result<TaskHandle<R>, ExecutorError> {
		if self.is_stopped() {
			return Err(ExecutorError::Stopped(self.inner.name.clone()));
		}

		let name = task.name();
		tracing::debug!(executor = %self.inner.name, task = name, detail = task.detail(), "worker.executor.submit");
		let (completer, handle) = completion(name);
		let stats = Arc::clone(&self.inner.stats);
		let job = move || {
			let outcome = catch_unwind(AssertUnwindSafe(|| task.run()));
			stats.on_complete(outcome.is_err());
			let result = outcome.map_err(|payload| {
				let message = panic_message(payload.as_ref());
				tracing::warn!(task = name, %message, "worker.executor.task_panicked");
				ExecutorError::Panicked { task: name, message }
			});
			completer.complete(result);
		};

		self.inner.stats.on_submit();
		if self.inner.tx.send(Envelope::Run(Box::new(job))).is_err() {
			return Err(ExecutorError::Stopped(self.inner.name.clone()));
		}
		Ok(handle)
	}

	/// Runs `task` on the writer thread and returns its result.
	///
	/// On the writer thread the task runs inline. Elsewhere the caller blocks
	/// until the writer has run it, or until the configured wait timeout elapses.
	pub fn run<R: Send + 'static>(&self, task: Task<R>) -> Result<R, ExecutorError> {
		if self.is_writer_thread() {
			self.inner.stats.on_inline();
			return Ok(task.run());
		}
		let handle = self.submit(task)?;
		match self.inner.wait_timeout {
			Some(timeout) => handle.wait_timeout(timeout),
			None => handle.wait(),
		}
	}

	/// Stops accepting tasks and lets the writer drain what is already queued.
	///
	/// Joins the writer unless called from the writer thread itself.
	pub fn shutdown(&self) {
		if self.inner.stopped.swap(true, Ordering::AcqRel) {
			return;
		}
		tracing::info!(executor = %self.inner.name, "worker.executor.shutdown");
		let _ = self.inner.tx.send(Envelope::Stop);
		if self.is_writer_thread() {
			return;
		}
		let join = self.inner.join.lock().take();
		if let Some(join) = join
			&& join.join().is_err()
		{
			tracing::warn!(executor = %self.inner.name, "worker.executor.writer_panicked");
		}
	}

	/// Returns a snapshot of the task counters.
	pub fn stats(&self) -> ExecutorStatsSnapshot {
		self.inner.stats.snapshot()
	}
}

fn writer_loop(name: &str, mut rx: mpsc::UnboundedReceiver<Envelope>, stats: &ExecutorStats) {
	while let Some(envelope) = rx.blocking_recv() {
		match envelope {
			Envelope::Run(job) => job(),
			Envelope::Stop => break,
		}
	}
	rx.close();
	let snapshot = stats.snapshot();
	tracing::debug!(
		executor = name,
		completed = snapshot.completed,
		panicked = snapshot.panicked,
		"worker.executor.stopped"
	);
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&'static str>() {
		(*s).to_string()
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s.clone()
	} else {
		"non-string panic payload".to_string()
	}
}
