use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap as HashMap;

use super::{ConfiguredObject, CoreSlots, ObjectNode, StateCell};
use crate::hierarchy::ChildRegistry;
use crate::meta::TypeInfo;
use crate::{
	AttrValue, Category, ConfigError, LifecyclePhase, MetaError, Model, ModelError, ObjectId, State, Subject, ValueError,
};

impl Model {
	/// Builds an object and registers it with `parents`, without running any
	/// lifecycle phase. Must run on the writer thread.
	///
	/// The concrete type is `explicit` when given, else the `type` attribute,
	/// else the category's default type. On failure nothing stays registered.
	pub(crate) fn construct_inline(
		&self,
		category: Category,
		mut attributes: BTreeMap<String, AttrValue>,
		parents: &[ConfiguredObject],
		explicit: Option<&str>,
	) -> Result<ConfiguredObject, ModelError> {
		let type_info = self.select_type(category, &attributes, explicit)?;
		let parent_map = self.check_parents(category, parents)?;

		let id = match attributes.get("id") {
			Some(value) => value.as_id().ok_or_else(|| {
				ConfigError::conversion(
					"id",
					ValueError::Invalid {
						expected: "Id".to_string(),
						input: value.to_string(),
					},
				)
			})?,
			None => ObjectId::random(),
		};
		if self.node(id).is_some() {
			return Err(ModelError::DuplicateId { category, id });
		}
		let tag = type_info.tag().unwrap_or(type_info.name());
		attributes.insert("id".to_string(), AttrValue::Id(id));
		attributes.insert("type".to_string(), AttrValue::from(tag));
		if !attributes.contains_key("createdBy")
			&& let Some(subject) = Subject::current()
		{
			attributes.insert("createdBy".to_string(), AttrValue::from(subject.name()));
		}
		attributes
			.entry("createdTime".to_string())
			.or_insert_with(|| AttrValue::Int(chrono::Utc::now().timestamp_millis()));

		let factory = type_info.factory().ok_or(MetaError::MissingFactory(type_info.name()))?;
		let children = self
			.graph()
			.child_types(category)
			.iter()
			.map(|child| (*child, ChildRegistry::new(*child)))
			.collect::<HashMap<_, _>>();
		let node = Arc::new(ObjectNode {
			id,
			type_info: Arc::clone(&type_info),
			category,
			parents: parent_map,
			children,
			attributes: Mutex::new(attributes.into_iter().collect()),
			core: RwLock::new(CoreSlots::default()),
			behavior: factory(),
			listeners: Mutex::new(Vec::new()),
			open: AtomicBool::new(false),
			phase: Mutex::new(LifecyclePhase::Constructed),
			state: Mutex::new(StateCell {
				actual: State::Uninitialized,
				desired: State::Active,
			}),
		});
		self.insert(Arc::clone(&node));
		let object = ConfiguredObject::from_node(self.clone(), node);

		if let Err(err) = object.register_with_parents(parents).and_then(|()| object.check_mandatory()) {
			tracing::debug!(object = %id, category = %category, %err, "model.object.construction_failed");
			object.teardown();
			return Err(err);
		}

		tracing::info!(
			object = %id,
			category = %category,
			type_tag = tag,
			name = %object.name(),
			"model.object.created"
		);
		Ok(object)
	}

	fn select_type(
		&self,
		category: Category,
		attributes: &BTreeMap<String, AttrValue>,
		explicit: Option<&str>,
	) -> Result<Arc<TypeInfo>, ModelError> {
		let provided = attributes.get("type").map(AttrValue::to_string);
		let unknown = |type_name: &str| ConfigError::UnknownType {
			category,
			type_name: type_name.to_string(),
		};

		let info = match (explicit, provided.as_deref()) {
			(Some(name), _) => self
				.registry()
				.descriptors_for(name)
				.filter(|info| info.is_concrete() && info.category() == Some(category))
				.ok_or_else(|| unknown(name))?,
			(None, Some(tag)) => self
				.registry()
				.type_for(category, tag)
				.or_else(|| {
					self.registry()
						.descriptors_for(tag)
						.filter(|info| info.is_concrete() && info.category() == Some(category))
				})
				.ok_or_else(|| unknown(tag))?,
			(None, None) => self.registry().default_type(category).ok_or_else(|| unknown("<default>"))?,
		};

		if let Some(provided) = provided
			&& info.tag() != Some(provided.as_str())
			&& info.name() != provided
		{
			return Err(ConfigError::ProvidedTypeMismatch {
				provided,
				calculated: info.tag().unwrap_or(info.name()).to_string(),
			}
			.into());
		}
		Ok(info)
	}

	/// One parent per parent type of `category`, ordered like the graph.
	fn check_parents(
		&self,
		category: Category,
		parents: &[ConfiguredObject],
	) -> Result<IndexMap<Category, ObjectId>, ModelError> {
		let invalid = |reason: String| ConfigError::InvalidParents { category, reason };
		let expected = self.graph().parent_types(category);
		if parents.len() != expected.len() {
			return Err(invalid(format!("expected parents {expected:?}, got {} parent(s)", parents.len())).into());
		}

		let mut map = IndexMap::with_capacity(expected.len());
		for parent_type in expected {
			let mut matching = parents.iter().filter(|p| p.category() == *parent_type);
			match (matching.next(), matching.next()) {
				(Some(parent), None) if !parent.is_deleted() => {
					map.insert(*parent_type, parent.id());
				}
				(Some(_), None) => return Err(invalid(format!("{parent_type} parent has been deleted")).into()),
				(None, _) => return Err(invalid(format!("missing {parent_type} parent")).into()),
				(Some(_), Some(_)) => return Err(invalid(format!("more than one {parent_type} parent")).into()),
			}
		}
		Ok(map)
	}

	/// Duplicate-name rule: a same-named sibling registered under the
	/// `via` parent clashes unless it differs from the new object in at least
	/// one other parent category. With no other parent category it clashes.
	fn shares_parents(
		&self,
		category: Category,
		via: Category,
		parents: &IndexMap<Category, ObjectId>,
		sibling: ObjectId,
	) -> bool {
		let Some(sibling) = self.node(sibling) else {
			return false;
		};
		let mut duplicate = true;
		for parent_type in self.graph().parent_types(category) {
			if *parent_type == via {
				continue;
			}
			if sibling.parents.get(parent_type) != parents.get(parent_type) {
				duplicate = false;
				break;
			}
		}
		duplicate
	}
}

impl ConfiguredObject {
	fn register_with_parents(&self, parents: &[ConfiguredObject]) -> Result<(), ModelError> {
		let name = self.name();
		for parent in parents {
			let registry = parent.child_registry(self.category()).ok_or_else(|| ConfigError::InvalidParents {
				category: self.category(),
				reason: format!("{} cannot hold {} children", parent.category(), self.category()),
			})?;
			registry.register(self.id(), &name, |sibling| {
				self.model
					.shares_parents(self.category(), parent.category(), &self.node.parents, sibling)
			})?;
		}
		Ok(())
	}

	/// Duplicate-name rule for renaming this object to `name`, checked under
	/// every parent.
	pub(crate) fn check_rename(&self, name: &str) -> Result<(), ModelError> {
		for parent in self.parents() {
			if let Some(registry) = parent.child_registry(self.category()) {
				registry.check_name(self.id(), name, |sibling| {
					self.model
						.shares_parents(self.category(), parent.category(), &self.node.parents, sibling)
				})?;
			}
		}
		Ok(())
	}

	fn check_mandatory(&self) -> Result<(), ModelError> {
		let attributes = self.node.attributes.lock();
		for desc in self.node.type_info.attributes() {
			if desc.is_mandatory() && !desc.is_derived() && desc.default().is_none() && !attributes.contains_key(desc.name())
			{
				return Err(ConfigError::MissingMandatory {
					category: self.category(),
					attribute: desc.name(),
				}
				.into());
			}
		}
		Ok(())
	}

	/// Leaves every parent (raising `child_removed`) and the arena.
	pub(crate) fn unregister_from_parents(&self) {
		for parent in self.parents() {
			let removed = parent
				.child_registry(self.category())
				.is_some_and(|registry| registry.unregister(self.id()));
			if removed {
				parent.notify(|listener| listener.child_removed(&parent, self));
			}
		}
	}

	/// Undoes a partial construction.
	fn teardown(&self) {
		if let Err(err) = self.node.behavior.on_delete(self) {
			tracing::warn!(object = %self.id(), %err, "model.object.teardown_hook_failed");
		}
		self.unregister_from_parents();
		self.node.state.lock().actual = State::Deleted;
		self.model.remove(self.id());
	}
}
