//! Read access shared by live objects and hypothetical change views.

use std::collections::BTreeMap;

use crate::{AttrValue, Category, ConfiguredObject, ObjectId};

/// Attribute reads with the live object's resolution rules.
///
/// Derived attributes compute from this trait so they can be evaluated
/// against a [`ValidationView`] as well as the object itself.
pub trait AttributeSource {
	fn object_id(&self) -> ObjectId;

	fn category(&self) -> Category;

	/// Effective, unmasked value: binding, stored value or declared default,
	/// or the derived computation.
	fn effective(&self, name: &str) -> Option<AttrValue>;
}

/// The object as it would be with `changes` applied.
///
/// A change to `None` clears the attribute back to its declared default.
/// Nothing is written while the view exists.
pub struct ValidationView<'a> {
	object: &'a ConfiguredObject,
	changes: &'a BTreeMap<String, Option<AttrValue>>,
}

impl<'a> ValidationView<'a> {
	pub fn new(object: &'a ConfiguredObject, changes: &'a BTreeMap<String, Option<AttrValue>>) -> Self {
		Self { object, changes }
	}

	/// The live object underneath the overlay.
	pub fn object(&self) -> &'a ConfiguredObject {
		self.object
	}

	pub fn changed_names(&self) -> impl Iterator<Item = &str> {
		self.changes.keys().map(String::as_str)
	}

	pub fn is_changed(&self, name: &str) -> bool {
		self.changes.contains_key(name)
	}
}

impl AttributeSource for ValidationView<'_> {
	fn object_id(&self) -> ObjectId {
		self.effective("id")
			.and_then(|id| id.as_id())
			.unwrap_or_else(|| self.object.id())
	}

	fn category(&self) -> Category {
		self.object.category()
	}

	fn effective(&self, name: &str) -> Option<AttrValue> {
		let desc = self.object.descriptor(name);
		if let Some(derive) = desc.and_then(|d| d.derive()) {
			return derive(self);
		}
		let Some(change) = self.changes.get(name) else {
			return self.object.effective(name);
		};
		let Some(desc) = desc else {
			return change.clone();
		};
		match self.object.value_from_raw(desc, change.as_ref()) {
			Ok(value) => value,
			Err(_) => change.clone(),
		}
	}
}

impl std::fmt::Debug for ValidationView<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ValidationView")
			.field("object", &self.object.id())
			.field("changes", &self.changes)
			.finish()
	}
}
