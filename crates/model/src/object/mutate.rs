//! Writer-confined mutations.
//!
//! Each public operation here packages itself as a [`Task`] and runs on the
//! model's writer thread, inline when the caller already is that thread.
//! Inline order is always authorise, then mutate, then notify.

use std::collections::BTreeMap;

use keel_worker::Task;

use super::ConfiguredObject;
use crate::meta::AttributeDescriptor;
use crate::{AttrValue, AttributeSource, Category, ConfigError, ModelError, State, Subject, ValidationView};

impl ConfiguredObject {
	/// Runs `f` on the writer thread as the calling subject.
	pub(crate) fn on_writer<R: Send + 'static>(
		&self,
		op: &'static str,
		f: impl FnOnce(&ConfiguredObject) -> Result<R, ModelError> + Send + 'static,
	) -> Result<R, ModelError> {
		let this = self.clone();
		let subject = Subject::current();
		let detail = format!("{} {}", self.category(), self.id());
		self.model
			.executor()
			.run(Task::new(op, detail, move || Subject::scope(subject, || f(&this))))?
	}

	pub(crate) fn ensure_live(&self) -> Result<(), ModelError> {
		if self.is_deleted() {
			return Err(ModelError::Deleted(self.id()));
		}
		Ok(())
	}

	fn writable_descriptor(&self, name: &str) -> Result<AttributeDescriptor, ModelError> {
		let desc = self.descriptor(name).copied().ok_or_else(|| ConfigError::UnknownAttribute {
			category: self.category(),
			attribute: name.to_string(),
		})?;
		if desc.is_derived() {
			return Err(ConfigError::DerivedAttribute(name.to_string()).into());
		}
		Ok(desc)
	}

	/// Compare-and-swap of one attribute.
	///
	/// Applies `desired` only if the current effective value equals
	/// `expected`, and returns `desired`. On a mismatch nothing changes and the
	/// current value, as the caller may see it, is returned instead. `None` as
	/// `desired` clears the stored value back to the declared default.
	pub fn set_attribute(
		&self,
		name: &str,
		expected: Option<AttrValue>,
		desired: Option<AttrValue>,
	) -> Result<Option<AttrValue>, ModelError> {
		let name = name.to_string();
		self.on_writer("object.set_attribute", move |this| this.set_attribute_inline(&name, expected, desired))
	}

	fn set_attribute_inline(
		&self,
		name: &str,
		expected: Option<AttrValue>,
		desired: Option<AttrValue>,
	) -> Result<Option<AttrValue>, ModelError> {
		self.ensure_live()?;
		let desc = self.writable_descriptor(name)?;
		let changes = BTreeMap::from([(name.to_string(), desired.clone())]);
		let view = ValidationView::new(self, &changes);
		self.node.behavior.authorise_set_attributes(self, &view)?;

		let current = self.effective(name);
		if current != expected {
			return Ok(self.mask(&desc, current));
		}
		self.validate_change(&view)?;
		let converted = self.value_from_raw(&desc, desired.as_ref())?;
		self.apply_change(&desc, desired.clone(), converted);
		Ok(desired)
	}

	/// Applies a batch of changes after validating all of them together.
	///
	/// The whole batch is authorised and validated against one hypothetical
	/// view before any value is written. Entries whose desired value already
	/// is the current one are skipped.
	pub fn set_attributes(&self, changes: BTreeMap<String, Option<AttrValue>>) -> Result<(), ModelError> {
		self.on_writer("object.set_attributes", move |this| this.set_attributes_inline(&changes))
	}

	fn set_attributes_inline(&self, changes: &BTreeMap<String, Option<AttrValue>>) -> Result<(), ModelError> {
		self.ensure_live()?;
		let descriptors = changes
			.keys()
			.map(|name| self.writable_descriptor(name))
			.collect::<Result<Vec<_>, _>>()?;
		let view = ValidationView::new(self, changes);
		self.node.behavior.authorise_set_attributes(self, &view)?;
		self.validate_change(&view)?;

		let converted = descriptors
			.iter()
			.zip(changes.values())
			.map(|(desc, desired)| self.value_from_raw(desc, desired.as_ref()))
			.collect::<Result<Vec<_>, _>>()?;
		for ((desc, desired), converted) in descriptors.iter().zip(changes.values()).zip(converted) {
			let unchanged =
				converted == self.effective(desc.name()) && *desired == self.raw_attribute(desc.name());
			if !unchanged {
				self.apply_change(desc, desired.clone(), converted);
			}
		}
		Ok(())
	}

	/// Identity, mandatory presence and sibling names, then the type's own
	/// hook.
	fn validate_change(&self, view: &ValidationView<'_>) -> Result<(), ModelError> {
		let id_kept = !view.is_changed("id") || view.effective("id").and_then(|id| id.as_id()) == Some(self.id());
		if !id_kept || view.object_id() != self.id() {
			return Err(ConfigError::IdentityChange(self.id()).into());
		}
		for name in view.changed_names() {
			if let Some(desc) = self.descriptor(name)
				&& desc.is_mandatory()
				&& desc.default().is_none()
				&& view.effective(name).is_none()
			{
				return Err(ConfigError::MissingMandatory {
					category: self.category(),
					attribute: desc.name(),
				}
				.into());
			}
		}
		if view.is_changed("name") {
			let renamed = view.effective("name").map(|v| v.to_string()).unwrap_or_default();
			if renamed != self.name() {
				self.check_rename(&renamed)?;
			}
		}
		self.node.behavior.validate_change(self, view)
	}

	fn apply_change(&self, desc: &AttributeDescriptor, raw: Option<AttrValue>, converted: Option<AttrValue>) {
		let name = desc.name();
		let old = self.effective(name);
		{
			let mut attributes = self.node.attributes.lock();
			match &raw {
				Some(value) => {
					attributes.insert(name.to_string(), value.clone());
				}
				None => {
					attributes.remove(name);
				}
			}
		}
		if let Some(slot) = desc.binding() {
			slot.write(self, converted);
		}
		if name == "name" {
			let renamed = self.name();
			for parent in self.parents() {
				if let Some(registry) = parent.child_registry(self.category()) {
					registry.rename(self.id(), &renamed);
				}
			}
		}
		self.touch();

		let new = self.effective(name);
		tracing::debug!(object = %self.id(), attribute = name, "model.object.attribute_set");
		self.notify(|listener| listener.attribute_set(self, name, old.as_ref(), new.as_ref()));
	}

	/// Refreshes the last-update audit fields.
	fn touch(&self) {
		let mut attributes = self.node.attributes.lock();
		if let Some(subject) = Subject::current() {
			attributes.insert("lastUpdatedBy".to_string(), AttrValue::from(subject.name()));
		}
		attributes.insert(
			"lastUpdatedTime".to_string(),
			AttrValue::Int(chrono::Utc::now().timestamp_millis()),
		);
	}

	/// Asks the type to move from `current` to `desired`, returning the
	/// resulting actual state.
	pub fn set_desired_state(&self, current: State, desired: State) -> Result<State, ModelError> {
		self.on_writer("object.set_desired_state", move |this| {
			this.set_desired_state_inline(current, desired)
		})
	}

	fn set_desired_state_inline(&self, current: State, desired: State) -> Result<State, ModelError> {
		self.ensure_live()?;
		self.node.behavior.authorise_set_desired_state(self, desired)?;
		if !self.node.behavior.set_state(self, current, desired)? {
			return Ok(self.state());
		}
		if desired != State::Deleted {
			self.node
				.attributes
				.lock()
				.insert("desiredState".to_string(), AttrValue::from(desired.as_str()));
			self.touch();
			tracing::debug!(object = %self.id(), %current, %desired, "model.object.state_changed");
			self.notify(|listener| listener.state_changed(self, current, desired));
		}
		Ok(self.state())
	}

	/// Asks the type to create a child of `category`.
	///
	/// `other_parents` are the child's parents besides this object, for
	/// categories with more than one parent type. Listeners hear about the
	/// child only when the type produced one.
	pub fn create_child(
		&self,
		category: Category,
		attributes: BTreeMap<String, AttrValue>,
		other_parents: Vec<ConfiguredObject>,
	) -> Result<Option<ConfiguredObject>, ModelError> {
		self.on_writer("object.create_child", move |this| {
			this.create_child_inline(category, attributes, &other_parents)
		})
	}

	fn create_child_inline(
		&self,
		category: Category,
		attributes: BTreeMap<String, AttrValue>,
		other_parents: &[ConfiguredObject],
	) -> Result<Option<ConfiguredObject>, ModelError> {
		self.ensure_live()?;
		self.node.behavior.authorise_create_child(self, category, &attributes)?;
		let child = self.node.behavior.add_child(self, category, attributes, other_parents)?;
		if let Some(child) = &child {
			self.notify(|listener| listener.child_added(self, child));
		}
		Ok(child)
	}

	/// Constructs a child under this object and `other_parents`, then runs
	/// its `create` lifecycle. A child whose lifecycle fails is deleted again.
	///
	/// For use from [`crate::ObjectBehavior::add_child`] implementations.
	pub fn provision_child(
		&self,
		category: Category,
		attributes: BTreeMap<String, AttrValue>,
		other_parents: &[ConfiguredObject],
	) -> Result<ConfiguredObject, ModelError> {
		let mut parents = Vec::with_capacity(other_parents.len() + 1);
		parents.push(self.clone());
		parents.extend(other_parents.iter().cloned());
		self.on_writer("object.provision_child", move |this| {
			let child = this.model.construct_inline(category, attributes, &parents, None)?;
			if let Err(err) = child.create_inline() {
				if let Err(cleanup) = child.delete_inline() {
					tracing::warn!(object = %child.id(), %cleanup, "model.object.cleanup_failed");
				}
				return Err(err);
			}
			Ok(child)
		})
	}

	/// Deletes this object and its descendants.
	///
	/// Children go first, depth-first. Each object runs its delete hook,
	/// leaves every parent, becomes [`State::Deleted`] and leaves the model.
	/// Deleting a deleted object does nothing.
	pub fn delete(&self) -> Result<(), ModelError> {
		self.on_writer("object.delete", |this| this.delete_inline())
	}

	pub(crate) fn delete_inline(&self) -> Result<(), ModelError> {
		if self.is_deleted() {
			return Ok(());
		}
		self.node.behavior.authorise_delete(self)?;
		for child in self.all_children() {
			child.delete_inline()?;
		}
		self.node.behavior.on_delete(self)?;
		self.unregister_from_parents();

		let old = {
			let mut state = self.node.state.lock();
			let old = state.actual;
			state.actual = State::Deleted;
			state.desired = State::Deleted;
			old
		};
		self.model.remove(self.id());
		tracing::info!(object = %self.id(), category = %self.category(), name = %self.name(), "model.object.deleted");
		self.notify(|listener| listener.state_changed(self, old, State::Deleted));
		Ok(())
	}
}
