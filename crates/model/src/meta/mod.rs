//! Attribute metadata: static per-type declarations and the registry that
//! merges them along the type hierarchy.
//!
//! * [`TypeDef`]: a statically written type declaration (attributes,
//!   statistics, backing slots, default-context variables, factory)
//! * [`TypeRegistry`]: registers declarations once and publishes merged,
//!   immutable [`TypeInfo`] tables for lock-free lookup
//!
//! # Merge rules
//!
//! Supertypes are merged in declaration order, then the type's own
//! attributes. A name declared again replaces the inherited descriptor in
//! place; it never adds a second entry.
//!
//! # Bindings
//!
//! An automated attribute is bound to the [`SlotDef`] whose name is the
//! attribute name with `.` replaced by `_`, searched on the type first and
//! then along its supertypes. Concrete types must bind every automated
//! attribute; abstract and category types may leave them unbound.

mod def;
mod registry;

pub use def::{
	AttrFlags, AttributeDef, BehaviorFactory, ContextDefault, DeriveFn, SlotDef, SlotHook, StatisticDef, TypeDef,
	TypeKind,
};
pub use registry::{AttributeDescriptor, AttributeSummary, TypeDescription, TypeInfo, TypeRegistry};
