//! Parent/child edges between live objects.
//!
//! Every parent holds one [`ChildRegistry`] per child category. A registry
//! keeps three views of its children (registration order, by id, by name)
//! and publishes them together as one immutable snapshot, so readers on any
//! thread never see the views disagree.
//!
//! Writers serialize on a per-registry mutex. Registries of different
//! parents, or of different categories under one parent, never contend.

mod reach;

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use rustc_hash::FxHashMap as HashMap;

pub use reach::Reachability;

use crate::{Category, ModelError, ObjectId};

#[derive(Debug, Clone, Default)]
struct ChildViews {
	ordered: Vec<ObjectId>,
	by_id: HashMap<ObjectId, String>,
	by_name: HashMap<String, Vec<ObjectId>>,
}

impl ChildViews {
	fn insert(&mut self, id: ObjectId, name: &str) {
		self.ordered.push(id);
		self.by_id.insert(id, name.to_string());
		self.by_name.entry(name.to_string()).or_default().push(id);
	}

	fn remove(&mut self, id: ObjectId) -> Option<String> {
		let name = self.by_id.remove(&id)?;
		self.ordered.retain(|existing| *existing != id);
		if let Some(ids) = self.by_name.get_mut(&name) {
			ids.retain(|existing| *existing != id);
			if ids.is_empty() {
				self.by_name.remove(&name);
			}
		}
		Some(name)
	}
}

/// Children of one category under one parent.
#[derive(Debug)]
pub(crate) struct ChildRegistry {
	category: Category,
	views: ArcSwap<ChildViews>,
	write: Mutex<()>,
}

impl ChildRegistry {
	pub(crate) fn new(category: Category) -> Self {
		Self {
			category,
			views: ArcSwap::from_pointee(ChildViews::default()),
			write: Mutex::new(()),
		}
	}

	/// Adds a child.
	///
	/// Fails with [`ModelError::DuplicateId`] if `id` is already present, and
	/// with [`ModelError::DuplicateName`] if a sibling named `name` exists for
	/// which `same_parents` holds.
	pub(crate) fn register(
		&self,
		id: ObjectId,
		name: &str,
		same_parents: impl Fn(ObjectId) -> bool,
	) -> Result<(), ModelError> {
		let _guard = self.write.lock();
		let cur = self.views.load_full();
		if cur.by_id.contains_key(&id) {
			return Err(ModelError::DuplicateId {
				category: self.category,
				id,
			});
		}
		self.ensure_name_free(&cur, id, name, same_parents)?;

		let mut next = (*cur).clone();
		next.insert(id, name);
		self.views.store(Arc::new(next));
		Ok(())
	}

	/// Fails with [`ModelError::DuplicateName`] if a child other than `id` is
	/// named `name` and `same_parents` holds for it.
	pub(crate) fn check_name(
		&self,
		id: ObjectId,
		name: &str,
		same_parents: impl Fn(ObjectId) -> bool,
	) -> Result<(), ModelError> {
		self.ensure_name_free(&self.views.load(), id, name, same_parents)
	}

	fn ensure_name_free(
		&self,
		views: &ChildViews,
		id: ObjectId,
		name: &str,
		same_parents: impl Fn(ObjectId) -> bool,
	) -> Result<(), ModelError> {
		if let Some(siblings) = views.by_name.get(name)
			&& siblings.iter().any(|sibling| *sibling != id && same_parents(*sibling))
		{
			return Err(ModelError::DuplicateName {
				category: self.category,
				name: name.to_string(),
			});
		}
		Ok(())
	}

	/// Removes a child. Returns false if it was not registered.
	pub(crate) fn unregister(&self, id: ObjectId) -> bool {
		let _guard = self.write.lock();
		let cur = self.views.load_full();
		if !cur.by_id.contains_key(&id) {
			return false;
		}
		let mut next = (*cur).clone();
		next.remove(id);
		self.views.store(Arc::new(next));
		true
	}

	/// Moves a child to a new name, keeping its position.
	pub(crate) fn rename(&self, id: ObjectId, name: &str) {
		let _guard = self.write.lock();
		let cur = self.views.load_full();
		let Some(old) = cur.by_id.get(&id) else {
			return;
		};
		if old == name {
			return;
		}
		let mut next = (*cur).clone();
		if let Some(ids) = next.by_name.get_mut(old.as_str()) {
			ids.retain(|existing| *existing != id);
			if ids.is_empty() {
				next.by_name.remove(old.as_str());
			}
		}
		next.by_id.insert(id, name.to_string());
		next.by_name.entry(name.to_string()).or_default().push(id);
		self.views.store(Arc::new(next));
	}

	/// Child ids in registration order.
	pub(crate) fn ids(&self) -> Vec<ObjectId> {
		self.views.load().ordered.clone()
	}

	pub(crate) fn contains(&self, id: ObjectId) -> bool {
		self.views.load().by_id.contains_key(&id)
	}

	/// First registered child named `name`.
	pub(crate) fn id_by_name(&self, name: &str) -> Option<ObjectId> {
		self.views.load().by_name.get(name)?.first().copied()
	}

	pub(crate) fn len(&self) -> usize {
		self.views.load().ordered.len()
	}
}
