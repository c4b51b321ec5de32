//! Caller identity carried across the writer hand-off.

use std::cell::RefCell;

thread_local! {
	static CURRENT: RefCell<Option<Subject>> = const { RefCell::new(None) };
}

/// The principal on whose behalf the current thread acts.
///
/// A system subject is privileged: it sees secure attribute values unmasked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
	name: String,
	system: bool,
}

impl Subject {
	/// An ordinary, unprivileged principal.
	pub fn user(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			system: false,
		}
	}

	/// The broker's own privileged principal.
	pub fn system() -> Self {
		Self {
			name: "SYSTEM".to_string(),
			system: true,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn is_system(&self) -> bool {
		self.system
	}

	/// Returns the subject installed on this thread, if any.
	pub fn current() -> Option<Subject> {
		CURRENT.with(|c| c.borrow().clone())
	}

	/// Returns true if the current thread acts as a system subject.
	pub fn current_is_system() -> bool {
		CURRENT.with(|c| c.borrow().as_ref().is_some_and(Subject::is_system))
	}

	/// Runs `f` with `subject` installed, restoring the previous one afterwards.
	pub fn scope<R>(subject: Option<Subject>, f: impl FnOnce() -> R) -> R {
		struct Restore(Option<Subject>);
		impl Drop for Restore {
			fn drop(&mut self) {
				let prev = self.0.take();
				CURRENT.with(|c| *c.borrow_mut() = prev);
			}
		}

		let prev = CURRENT.with(|c| c.replace(subject));
		let _restore = Restore(prev);
		f()
	}

	/// Runs `f` as this subject.
	pub fn run_as<R>(&self, f: impl FnOnce() -> R) -> R {
		Self::scope(Some(self.clone()), f)
	}
}
