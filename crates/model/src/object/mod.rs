//! Live configured objects.
//!
//! A [`ConfiguredObject`] is a cheap handle to a node in the model's arena.
//! Parent and child edges are stored as ids; the handle resolves them through
//! the owning [`Model`].
//!
//! * Reads (attributes, children, statistics) are safe from any thread.
//! * Mutations hand a task to the model's writer thread and block until it ran.
//!
//! Submodules:
//! * `construct`: building a node, registering it with its parents
//! * `lifecycle`: `open`/`create` and the resolve, validate, create, open phases
//! * `mutate`: attribute CAS, bulk change, state change, child creation, delete
//! * `record`: the persistable record view

mod behavior;
mod construct;
mod lifecycle;
mod listener;
mod mutate;
mod record;
mod root;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub use behavior::ObjectBehavior;
use indexmap::IndexMap;
pub use listener::ChangeListener;
use parking_lot::{Mutex, RwLock};
pub use record::ObjectRecord;
pub use root::CONFIGURED_OBJECT;
pub(crate) use root::CoreSlots;
use rustc_hash::FxHashMap as HashMap;

use crate::hierarchy::ChildRegistry;
use crate::meta::{AttributeDescriptor, TypeInfo};
use crate::{
	AttrValue, AttributeSource, Category, ConfigError, ConvertContext, LifecyclePhase, Model, ObjectId, State, Subject,
	ValueError,
};

#[derive(Debug, Clone, Copy)]
pub(crate) struct StateCell {
	pub(crate) actual: State,
	pub(crate) desired: State,
}

pub(crate) struct ObjectNode {
	pub(crate) id: ObjectId,
	pub(crate) type_info: Arc<TypeInfo>,
	pub(crate) category: Category,
	/// One parent per parent category, in the category graph's parent order.
	pub(crate) parents: IndexMap<Category, ObjectId>,
	pub(crate) children: HashMap<Category, ChildRegistry>,
	/// Stored values as supplied, before conversion.
	pub(crate) attributes: Mutex<HashMap<String, AttrValue>>,
	pub(crate) core: RwLock<CoreSlots>,
	pub(crate) behavior: Box<dyn ObjectBehavior>,
	pub(crate) listeners: Mutex<Vec<Arc<dyn ChangeListener>>>,
	pub(crate) open: AtomicBool,
	pub(crate) phase: Mutex<LifecyclePhase>,
	pub(crate) state: Mutex<StateCell>,
}

/// Handle to a live object.
#[derive(Clone)]
pub struct ConfiguredObject {
	pub(crate) model: Model,
	pub(crate) node: Arc<ObjectNode>,
}

impl PartialEq for ConfiguredObject {
	fn eq(&self, other: &Self) -> bool {
		self.node.id == other.node.id
	}
}

impl Eq for ConfiguredObject {}

impl fmt::Debug for ConfiguredObject {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ConfiguredObject")
			.field("category", &self.node.category)
			.field("type", &self.type_tag())
			.field("id", &self.node.id)
			.field("name", &self.name())
			.finish()
	}
}

impl fmt::Display for ConfiguredObject {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} '{}'", self.node.category, self.name())
	}
}

impl ConfiguredObject {
	pub(crate) fn from_node(model: Model, node: Arc<ObjectNode>) -> Self {
		Self { model, node }
	}

	pub fn id(&self) -> ObjectId {
		self.node.id
	}

	pub fn category(&self) -> Category {
		self.node.category
	}

	pub fn type_info(&self) -> &Arc<TypeInfo> {
		&self.node.type_info
	}

	/// Concrete type tag.
	pub fn type_tag(&self) -> &'static str {
		self.node.type_info.tag().unwrap_or(self.node.type_info.name())
	}

	pub fn model(&self) -> &Model {
		&self.model
	}

	/// Effective name, falling back to the raw stored value before resolution.
	pub fn name(&self) -> String {
		self.effective("name")
			.or_else(|| self.raw_attribute("name"))
			.map(|v| v.to_string())
			.unwrap_or_default()
	}

	/// Typed behavior of the object, if it is a `T`.
	pub fn behavior<T: ObjectBehavior>(&self) -> Option<&T> {
		let behavior: &dyn std::any::Any = self.node.behavior.as_ref();
		behavior.downcast_ref::<T>()
	}

	pub fn parent(&self, category: Category) -> Option<ConfiguredObject> {
		self.model.get(*self.node.parents.get(&category)?)
	}

	/// Parents in parent-category order.
	pub fn parents(&self) -> Vec<ConfiguredObject> {
		self.node.parents.values().filter_map(|id| self.model.get(*id)).collect()
	}

	pub fn parent_ids(&self) -> &IndexMap<Category, ObjectId> {
		&self.node.parents
	}

	pub fn child_categories(&self) -> &[Category] {
		self.model.graph().child_types(self.node.category)
	}

	/// Children of `category` in registration order.
	pub fn children(&self, category: Category) -> Vec<ConfiguredObject> {
		self.node
			.children
			.get(&category)
			.map(|registry| registry.ids().iter().filter_map(|id| self.model.get(*id)).collect())
			.unwrap_or_default()
	}

	/// Number of children of `category`.
	pub fn child_count(&self, category: Category) -> usize {
		self.child_registry(category).map_or(0, ChildRegistry::len)
	}

	pub fn child_by_id(&self, category: Category, id: ObjectId) -> Option<ConfiguredObject> {
		let registry = self.node.children.get(&category)?;
		registry.contains(id).then(|| self.model.get(id)).flatten()
	}

	pub fn child_by_name(&self, category: Category, name: &str) -> Option<ConfiguredObject> {
		self.model.get(self.node.children.get(&category)?.id_by_name(name)?)
	}

	/// Every child of every child category.
	pub(crate) fn all_children(&self) -> Vec<ConfiguredObject> {
		self.child_categories().iter().flat_map(|c| self.children(*c)).collect()
	}

	pub(crate) fn child_registry(&self, category: Category) -> Option<&ChildRegistry> {
		self.node.children.get(&category)
	}

	pub fn state(&self) -> State {
		self.node.state.lock().actual
	}

	pub fn desired_state(&self) -> State {
		self.node.state.lock().desired
	}

	pub fn phase(&self) -> LifecyclePhase {
		*self.node.phase.lock()
	}

	pub(crate) fn advance_phase(&self, phase: LifecyclePhase) {
		let mut current = self.node.phase.lock();
		if phase > *current {
			*current = phase;
		}
	}

	pub fn is_open(&self) -> bool {
		self.node.open.load(Ordering::Acquire)
	}

	pub fn is_deleted(&self) -> bool {
		self.state() == State::Deleted
	}

	/// Applies `desired` if the actual state is `current`.
	pub fn transition_state(&self, current: State, desired: State) -> bool {
		let mut state = self.node.state.lock();
		if state.actual != current {
			return false;
		}
		state.actual = desired;
		state.desired = desired;
		true
	}

	/// Makes the actual state match the desired one.
	pub fn attain_desired_state(&self) {
		let mut state = self.node.state.lock();
		if state.desired != State::Deleted {
			state.actual = state.desired;
		}
	}

	/// Stored value as supplied.
	pub fn raw_attribute(&self, name: &str) -> Option<AttrValue> {
		self.node.attributes.lock().get(name).cloned()
	}

	/// Snapshot of all stored values.
	pub fn actual_attributes(&self) -> BTreeMap<String, AttrValue> {
		self.node.attributes.lock().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
	}

	/// Attribute value as seen by the current subject.
	///
	/// Secure attributes are replaced by a type-specific placeholder unless the
	/// current subject is a system subject.
	pub fn attribute(&self, name: &str) -> Option<AttrValue> {
		let value = self.effective(name);
		match self.node.type_info.attribute(name) {
			Some(desc) => self.mask(desc, value),
			None => value,
		}
	}

	pub(crate) fn mask(&self, desc: &AttributeDescriptor, value: Option<AttrValue>) -> Option<AttrValue> {
		if !desc.is_secure() || Subject::current_is_system() {
			return value;
		}
		value.and_then(|_| desc.value_type().masked(&self.model.config().secure_placeholder))
	}

	/// Current values of every declared statistic.
	pub fn statistics(&self) -> BTreeMap<String, i64> {
		self.node
			.type_info
			.statistics()
			.map(|stat| (stat.name.to_string(), (stat.read)(self)))
			.collect()
	}

	pub(crate) fn descriptor(&self, name: &str) -> Option<&AttributeDescriptor> {
		self.node.type_info.attribute(name)
	}

	pub(crate) fn convert_value(&self, desc: &AttributeDescriptor, raw: &AttrValue) -> Result<AttrValue, ConfigError> {
		desc.value_type()
			.convert(raw, self)
			.map_err(|err| ConfigError::conversion(desc.name(), err))
	}

	/// Converts `raw`, or the declared default when `raw` is absent.
	pub(crate) fn value_from_raw(
		&self,
		desc: &AttributeDescriptor,
		raw: Option<&AttrValue>,
	) -> Result<Option<AttrValue>, ConfigError> {
		match raw {
			Some(raw) => self.convert_value(desc, raw).map(Some),
			None => desc
				.default()
				.map(|default| self.convert_value(desc, &AttrValue::from(default)))
				.transpose(),
		}
	}
}

impl AttributeSource for ConfiguredObject {
	fn object_id(&self) -> ObjectId {
		self.node.id
	}

	fn category(&self) -> Category {
		self.node.category
	}

	fn effective(&self, name: &str) -> Option<AttrValue> {
		let Some(desc) = self.node.type_info.attribute(name) else {
			return self.raw_attribute(name);
		};
		if let Some(derive) = desc.derive() {
			return derive(self);
		}
		if let Some(slot) = desc.binding()
			&& let Some(value) = (slot.get)(self)
		{
			return Some(value);
		}
		let raw = self.raw_attribute(name);
		match self.value_from_raw(desc, raw.as_ref()) {
			Ok(value) => value,
			Err(err) => {
				tracing::warn!(object = %self.node.id, attribute = name, %err, "model.object.unconvertible_value");
				raw
			}
		}
	}
}

impl ConvertContext for ConfiguredObject {
	fn interpolate(&self, template: &str) -> Result<String, ValueError> {
		if self.model.config().strict_defaults {
			self.interpolate_strict(template).map_err(|err| match err {
				ConfigError::UnresolvedVariable(name) => ValueError::Unresolved(name),
				other => ValueError::Invalid {
					expected: "interpolated string".to_string(),
					input: other.to_string(),
				},
			})
		} else {
			Ok(ConfiguredObject::interpolate(self, template))
		}
	}

	fn resolve_reference(&self, category: Category, name: &str) -> Option<ObjectId> {
		self.find_configured_object(category, name).objects().first().map(ConfiguredObject::id)
	}
}
