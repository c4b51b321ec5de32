//! Error taxonomy of the object model.
//!
//! * [`ValueError`]: a single value failed to convert to its declared type
//! * [`ConfigError`]: user-correctable configuration problems
//! * [`MetaError`]: defects in a type declaration, raised at registration
//! * [`ModelError`]: the umbrella returned by every public read/mutation path

use keel_worker::ExecutorError;

use crate::{Category, ObjectId};

/// Conversion failure for one attribute value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
	/// Input cannot be represented as the expected type.
	#[error("cannot convert {input:?} to {expected}")]
	Invalid { expected: String, input: String },
	/// Input is not one of the permitted enumeration names.
	#[error("{input:?} is not one of {allowed:?}")]
	NotInEnum { input: String, allowed: &'static [&'static str] },
	/// A reference names no live object of the category.
	#[error("no {category} named {name:?}")]
	UnknownReference { category: Category, name: String },
	/// Strict interpolation met a variable nothing defines.
	#[error("unresolved variable ${{{0}}}")]
	Unresolved(String),
}

/// A defect in a type declaration. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetaError {
	/// Two owners declare the same default-context variable.
	#[error("context variable '{name}' declared by both '{existing}' and '{owner}'")]
	DuplicateContextDefault {
		name: &'static str,
		owner: &'static str,
		existing: &'static str,
	},
	/// An automated attribute has no backing slot on a concrete type.
	#[error("type '{type_name}' has no slot bound to automated attribute '{attribute}'")]
	UnboundAttribute { type_name: &'static str, attribute: &'static str },
	/// An attribute declared both automated and derived.
	#[error("attribute '{attribute}' of '{type_name}' cannot be both automated and derived")]
	AutomatedDerived { type_name: &'static str, attribute: &'static str },
	/// No supertype of a concrete type defines a category.
	#[error("type '{0}' does not belong to any category")]
	NoCategory(&'static str),
	/// Several unrelated supertypes define a category.
	#[error("type '{type_name}' has ambiguous categories {candidates:?}")]
	AmbiguousCategory {
		type_name: &'static str,
		candidates: Vec<&'static str>,
	},
	/// A concrete type declares no factory.
	#[error("concrete type '{0}' has no factory")]
	MissingFactory(&'static str),
	/// Two concrete types share a tag within one category.
	#[error("category {category} already has a type tagged '{tag}'")]
	DuplicateTypeTag { category: Category, tag: &'static str },
	/// A name passed to the registry matches no registered type.
	#[error("unknown type '{0}'")]
	UnknownType(String),
}

/// A user-correctable configuration problem.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
	/// A mandatory attribute has neither a value nor a default.
	#[error("mandatory attribute '{attribute}' missing for {category}")]
	MissingMandatory { category: Category, attribute: &'static str },
	/// An attribute value failed conversion.
	#[error("invalid value for attribute '{attribute}': {source}")]
	Conversion {
		attribute: String,
		#[source]
		source: ValueError,
	},
	/// A validation hook rejected the object or a change.
	#[error("{object}: {constraint}")]
	Validation { object: String, constraint: String },
	/// A change would alter the object's identity.
	#[error("cannot change the id of {0}")]
	IdentityChange(ObjectId),
	/// The `type` attribute disagrees with the type being constructed.
	#[error("provided type '{provided}' but calculated type '{calculated}'")]
	ProvidedTypeMismatch { provided: String, calculated: String },
	/// No concrete type of the category carries the tag.
	#[error("{category} has no type '{type_name}'")]
	UnknownType { category: Category, type_name: String },
	/// Strict interpolation met an undefined variable.
	#[error("unresolved variable ${{{0}}}")]
	UnresolvedVariable(String),
	/// Derived attributes are computed and cannot be written.
	#[error("attribute '{0}' is derived and cannot be set")]
	DerivedAttribute(String),
	/// The category declares no attribute of that name.
	#[error("{category} has no attribute '{attribute}'")]
	UnknownAttribute { category: Category, attribute: String },
	/// The parent set does not match the category's parent types.
	#[error("invalid parents for {category}: {reason}")]
	InvalidParents { category: Category, reason: String },
}

impl ConfigError {
	/// Builds a validation failure naming the object and the violated constraint.
	pub fn validation(object: impl std::fmt::Display, constraint: impl Into<String>) -> Self {
		Self::Validation {
			object: object.to_string(),
			constraint: constraint.into(),
		}
	}

	/// Wraps a conversion failure of `attribute`.
	pub fn conversion(attribute: impl Into<String>, source: ValueError) -> Self {
		match source {
			ValueError::Unresolved(name) => Self::UnresolvedVariable(name),
			source => Self::Conversion {
				attribute: attribute.into(),
				source,
			},
		}
	}
}

/// Errors surfaced by [`crate::ConfiguredObject`] and [`crate::Model`].
///
/// A failure raised on the writer thread reaches the blocked caller as the same
/// variant.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
	/// User-correctable configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// The category already holds a child with this id.
	#[error("{category} already has a child with id {id}")]
	DuplicateId { category: Category, id: ObjectId },
	/// A sibling with the same name and the same shared parents exists.
	#[error("{category} already has a child named '{name}'")]
	DuplicateName { category: Category, name: String },
	/// An authorization hook denied the operation.
	#[error("access denied: {0}")]
	AccessDenied(String),
	/// The object does not support the operation.
	#[error("unsupported operation: {0}")]
	Unsupported(String),
	/// Type declaration defect.
	#[error(transparent)]
	Meta(#[from] MetaError),
	/// The writer hand-off failed.
	#[error(transparent)]
	Executor(#[from] ExecutorError),
	/// The object was deleted.
	#[error("object {0} has been deleted")]
	Deleted(ObjectId),
	/// The writer thread could not be started.
	#[error("failed to start writer thread: {0}")]
	Spawn(#[from] std::io::Error),
}

/// Failure to load a [`crate::ModelConfig`].
#[derive(Debug, thiserror::Error)]
#[error("invalid model configuration: {0}")]
pub struct ConfigLoadError(#[from] toml::de::Error);
