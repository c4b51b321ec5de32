//! Categories and the structural graph relating them.
//!
//! A [`Category`] is the structural class of an object (its slot in the
//! parent/child type graph), independent of its concrete type. The
//! [`CategoryGraph`] records which categories may parent which; it describes
//! types, never instances.

use std::collections::VecDeque;
use std::fmt;

use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
use serde::Serialize;

/// Structural class of a configured object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Category(&'static str);

impl Category {
	pub const fn new(name: &'static str) -> Self {
		Self(name)
	}

	pub const fn name(self) -> &'static str {
		self.0
	}
}

impl fmt::Display for Category {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.0)
	}
}

/// Parent/child relationships between categories.
///
/// Parent and child lists keep insertion order. The first parent type of a
/// category is its primary parent, followed when inheriting context.
#[derive(Debug, Clone, Default)]
pub struct CategoryGraph {
	parents: HashMap<Category, Vec<Category>>,
	children: HashMap<Category, Vec<Category>>,
	order: Vec<Category>,
}

impl CategoryGraph {
	pub fn new() -> Self {
		Self::default()
	}

	/// Declares a category with no parent types.
	pub fn root(mut self, category: Category) -> Self {
		self.touch(category);
		self
	}

	/// Declares `child` as a child type of `parent`.
	pub fn relate(mut self, parent: Category, child: Category) -> Self {
		self.touch(parent);
		self.touch(child);
		let kids = self.children.entry(parent).or_default();
		if !kids.contains(&child) {
			kids.push(child);
		}
		let parents = self.parents.entry(child).or_default();
		if !parents.contains(&parent) {
			parents.push(parent);
		}
		self
	}

	fn touch(&mut self, category: Category) {
		if !self.order.contains(&category) {
			self.order.push(category);
		}
	}

	/// All known categories in declaration order.
	pub fn categories(&self) -> &[Category] {
		&self.order
	}

	pub fn contains(&self, category: Category) -> bool {
		self.order.contains(&category)
	}

	pub fn child_types(&self, category: Category) -> &[Category] {
		self.children.get(&category).map_or(&[], Vec::as_slice)
	}

	pub fn parent_types(&self, category: Category) -> &[Category] {
		self.parents.get(&category).map_or(&[], Vec::as_slice)
	}

	/// Returns true if `descendant` is reachable from `category` by child edges.
	pub fn has_descendant(&self, category: Category, descendant: Category) -> bool {
		let mut seen = HashSet::default();
		let mut stack = vec![category];
		while let Some(next) = stack.pop() {
			for &child in self.child_types(next) {
				if child == descendant {
					return true;
				}
				if seen.insert(child) {
					stack.push(child);
				}
			}
		}
		false
	}

	/// Finds the nearest category, walking up from `category` breadth-first,
	/// that has `descendant` among its descendants.
	///
	/// `category` itself is the first candidate.
	pub fn ancestor_with_descendant(&self, category: Category, descendant: Category) -> Option<Category> {
		let mut seen = HashSet::default();
		let mut queue = VecDeque::from([category]);
		seen.insert(category);
		while let Some(candidate) = queue.pop_front() {
			if self.has_descendant(candidate, descendant) {
				return Some(candidate);
			}
			for &parent in self.parent_types(candidate) {
				if seen.insert(parent) {
					queue.push_back(parent);
				}
			}
		}
		None
	}
}
