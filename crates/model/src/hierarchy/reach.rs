use rustc_hash::FxHashSet as HashSet;

use crate::{Category, ConfiguredObject};

/// Result of searching the live hierarchy for objects of a category.
#[derive(Debug, Clone)]
pub enum Reachability {
	/// The category graph has no route from the start to the target category.
	NoPath,
	/// Every live object of the target category reachable from the nearest
	/// suitable ancestor, in depth-first order. May be empty.
	Objects(Vec<ConfiguredObject>),
}

impl Reachability {
	pub fn objects(&self) -> &[ConfiguredObject] {
		match self {
			Self::NoPath => &[],
			Self::Objects(objects) => objects,
		}
	}

	pub fn is_no_path(&self) -> bool {
		matches!(self, Self::NoPath)
	}

	pub fn into_vec(self) -> Vec<ConfiguredObject> {
		match self {
			Self::NoPath => Vec::new(),
			Self::Objects(objects) => objects,
		}
	}
}

impl ConfiguredObject {
	/// Nearest ancestor (or self) of `category`, following parent types in
	/// declaration order.
	pub fn ancestor(&self, category: Category) -> Option<ConfiguredObject> {
		if self.category() == category {
			return Some(self.clone());
		}
		self.parents().iter().find_map(|parent| parent.ancestor(category))
	}

	/// Every live descendant of `category`, depth-first, each object once.
	pub fn descendants(&self, category: Category) -> Vec<ConfiguredObject> {
		let mut seen = HashSet::default();
		let mut found = Vec::new();
		self.collect_descendants(category, &mut seen, &mut found);
		found
	}

	fn collect_descendants(
		&self,
		category: Category,
		seen: &mut HashSet<crate::ObjectId>,
		found: &mut Vec<ConfiguredObject>,
	) {
		let graph = self.model().graph();
		for &child_category in self.child_categories() {
			if child_category != category && !graph.has_descendant(child_category, category) {
				continue;
			}
			for child in self.children(child_category) {
				if !seen.insert(child.id()) {
					continue;
				}
				if child_category == category {
					found.push(child.clone());
				}
				child.collect_descendants(category, seen, found);
			}
		}
	}

	/// Live objects of `category` reachable from the nearest ancestor whose
	/// category can structurally reach `category`.
	pub fn reachable(&self, category: Category) -> Reachability {
		let graph = self.model().graph();
		let Some(ancestor_category) = graph.ancestor_with_descendant(self.category(), category) else {
			return Reachability::NoPath;
		};
		match self.ancestor(ancestor_category) {
			Some(ancestor) => Reachability::Objects(ancestor.descendants(category)),
			None => Reachability::Objects(Vec::new()),
		}
	}

	/// Reachable objects of `category` named `name`.
	pub fn find_configured_object(&self, category: Category, name: &str) -> Reachability {
		match self.reachable(category) {
			Reachability::NoPath => Reachability::NoPath,
			Reachability::Objects(objects) => {
				Reachability::Objects(objects.into_iter().filter(|object| object.name() == name).collect())
			}
		}
	}
}
