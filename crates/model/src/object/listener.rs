use std::sync::Arc;

use crate::{AttrValue, ConfiguredObject, State};

/// Observer of changes to one object.
///
/// Callbacks run on the writer thread after the change is applied.
pub trait ChangeListener: Send + Sync {
	fn attribute_set(&self, object: &ConfiguredObject, name: &str, old: Option<&AttrValue>, new: Option<&AttrValue>) {
		let _ = (object, name, old, new);
	}

	fn state_changed(&self, object: &ConfiguredObject, old: State, new: State) {
		let _ = (object, old, new);
	}

	fn child_added(&self, object: &ConfiguredObject, child: &ConfiguredObject) {
		let _ = (object, child);
	}

	fn child_removed(&self, object: &ConfiguredObject, child: &ConfiguredObject) {
		let _ = (object, child);
	}
}

impl ConfiguredObject {
	pub fn add_change_listener(&self, listener: Arc<dyn ChangeListener>) {
		self.node.listeners.lock().push(listener);
	}

	/// Removes a listener previously added; returns false if it was not registered.
	pub fn remove_change_listener(&self, listener: &Arc<dyn ChangeListener>) -> bool {
		let mut listeners = self.node.listeners.lock();
		let before = listeners.len();
		listeners.retain(|l| !std::ptr::addr_eq(Arc::as_ptr(l), Arc::as_ptr(listener)));
		listeners.len() != before
	}

	/// Calls `f` on a snapshot of the listeners, outside the listener lock.
	pub(crate) fn notify(&self, f: impl Fn(&dyn ChangeListener)) {
		let listeners = self.node.listeners.lock().clone();
		for listener in &listeners {
			f(listener.as_ref());
		}
	}
}
