use std::any::Any;
use std::collections::BTreeMap;

use crate::{AttrValue, Category, ConfiguredObject, ModelError, State, ValidationView};

/// Type-specific hooks of a concrete type.
///
/// Every hook runs on the writer thread. Defaults are permissive no-ops, except
/// [`ObjectBehavior::add_child`], which rejects the operation. Implementations
/// usually also own the backing slots of the type's automated attributes and
/// are reached from slot accessors through [`ConfiguredObject::behavior`].
pub trait ObjectBehavior: Any + Send + Sync {
	/// Enforces cross-attribute invariants after resolution.
	fn validate(&self, object: &ConfiguredObject) -> Result<(), ModelError> {
		let _ = object;
		Ok(())
	}

	/// Inspects a proposed change before it is applied.
	///
	/// The identity check has already passed when this runs.
	fn validate_change(&self, object: &ConfiguredObject, proposed: &ValidationView<'_>) -> Result<(), ModelError> {
		let _ = (object, proposed);
		Ok(())
	}

	/// First-time provisioning.
	fn on_create(&self, object: &ConfiguredObject) -> Result<(), ModelError> {
		let _ = object;
		Ok(())
	}

	fn on_open(&self, object: &ConfiguredObject) -> Result<(), ModelError> {
		let _ = object;
		Ok(())
	}

	/// Runs before the object leaves its parents.
	fn on_delete(&self, object: &ConfiguredObject) -> Result<(), ModelError> {
		let _ = object;
		Ok(())
	}

	/// Attempts a state transition, returning whether it happened.
	///
	/// By default a move to [`State::Deleted`] deletes the object and any
	/// other move is applied when `current` is the actual state.
	fn set_state(&self, object: &ConfiguredObject, current: State, desired: State) -> Result<bool, ModelError> {
		if desired == State::Deleted {
			if object.state() != current {
				return Ok(false);
			}
			object.delete_inline()?;
			return Ok(true);
		}
		Ok(object.transition_state(current, desired))
	}

	/// Constructs a child of `category`.
	fn add_child(
		&self,
		parent: &ConfiguredObject,
		category: Category,
		attributes: BTreeMap<String, AttrValue>,
		other_parents: &[ConfiguredObject],
	) -> Result<Option<ConfiguredObject>, ModelError> {
		let _ = (attributes, other_parents);
		Err(ModelError::Unsupported(format!(
			"{} '{}' cannot create {category} children",
			parent.category(),
			parent.name()
		)))
	}

	fn authorise_set_attributes(&self, object: &ConfiguredObject, proposed: &ValidationView<'_>) -> Result<(), ModelError> {
		let _ = (object, proposed);
		Ok(())
	}

	fn authorise_set_desired_state(&self, object: &ConfiguredObject, desired: State) -> Result<(), ModelError> {
		let _ = (object, desired);
		Ok(())
	}

	fn authorise_create_child(
		&self,
		object: &ConfiguredObject,
		category: Category,
		attributes: &BTreeMap<String, AttrValue>,
	) -> Result<(), ModelError> {
		let _ = (object, category, attributes);
		Ok(())
	}

	fn authorise_delete(&self, object: &ConfiguredObject) -> Result<(), ModelError> {
		let _ = object;
		Ok(())
	}
}
