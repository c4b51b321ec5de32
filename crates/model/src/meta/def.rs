use std::fmt;

use bitflags::bitflags;

use crate::{AttrValue, AttributeSource, Category, ConfiguredObject, ObjectBehavior, ValueType};

bitflags! {
	/// Roles of a declared attribute.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
	pub struct AttrFlags: u8 {
		/// Must have a value or a default at construction.
		const MANDATORY = 1 << 0;
		/// Computed on read, never stored.
		const DERIVED = 1 << 1;
		/// Masked for unprivileged readers.
		const SECURE = 1 << 2;
		/// Stored and mirrored into a backing slot.
		const AUTOMATED = 1 << 3;
	}
}

/// Computes a derived attribute from other attributes.
pub type DeriveFn = fn(&dyn AttributeSource) -> Option<AttrValue>;

/// Runs around a slot write with the value being written.
pub type SlotHook = fn(&ConfiguredObject, Option<&AttrValue>);

/// Creates the behavior of a fresh object of a concrete type.
pub type BehaviorFactory = fn() -> Box<dyn ObjectBehavior>;

/// Static declaration of one attribute.
#[derive(Clone, Copy)]
pub struct AttributeDef {
	pub name: &'static str,
	pub value_type: ValueType,
	pub flags: AttrFlags,
	/// Raw default, converted (and interpolated) like a supplied value.
	pub default: Option<&'static str>,
	pub description: &'static str,
	pub derive: Option<DeriveFn>,
}

impl AttributeDef {
	/// A stored attribute without a backing slot.
	pub const fn new(name: &'static str, value_type: ValueType) -> Self {
		Self {
			name,
			value_type,
			flags: AttrFlags::empty(),
			default: None,
			description: "",
			derive: None,
		}
	}

	/// A stored attribute mirrored into a backing slot.
	pub const fn automated(name: &'static str, value_type: ValueType) -> Self {
		let mut def = Self::new(name, value_type);
		def.flags = AttrFlags::AUTOMATED;
		def
	}

	/// An attribute computed by `derive` on every read.
	pub const fn derived(name: &'static str, value_type: ValueType, derive: DeriveFn) -> Self {
		let mut def = Self::new(name, value_type);
		def.flags = AttrFlags::DERIVED;
		def.derive = Some(derive);
		def
	}

	pub const fn mandatory(mut self) -> Self {
		self.flags = self.flags.union(AttrFlags::MANDATORY);
		self
	}

	pub const fn secure(mut self) -> Self {
		self.flags = self.flags.union(AttrFlags::SECURE);
		self
	}

	pub const fn default_value(mut self, value: &'static str) -> Self {
		self.default = Some(value);
		self
	}

	pub const fn description(mut self, text: &'static str) -> Self {
		self.description = text;
		self
	}
}

impl fmt::Debug for AttributeDef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AttributeDef")
			.field("name", &self.name)
			.field("value_type", &self.value_type)
			.field("flags", &self.flags)
			.field("default", &self.default)
			.finish_non_exhaustive()
	}
}

/// Static declaration of a read-only numeric statistic.
#[derive(Clone, Copy)]
pub struct StatisticDef {
	pub name: &'static str,
	pub description: &'static str,
	pub read: fn(&ConfiguredObject) -> i64,
}

impl StatisticDef {
	pub const fn new(name: &'static str, description: &'static str, read: fn(&ConfiguredObject) -> i64) -> Self {
		Self {
			name,
			description,
			read,
		}
	}
}

impl fmt::Debug for StatisticDef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("StatisticDef").field("name", &self.name).finish_non_exhaustive()
	}
}

/// Backing storage accessor pair for an automated attribute.
#[derive(Clone, Copy)]
pub struct SlotDef {
	pub name: &'static str,
	pub get: fn(&ConfiguredObject) -> Option<AttrValue>,
	pub set: fn(&ConfiguredObject, Option<AttrValue>),
	pub before_set: Option<SlotHook>,
	pub after_set: Option<SlotHook>,
}

impl SlotDef {
	pub const fn new(
		name: &'static str,
		get: fn(&ConfiguredObject) -> Option<AttrValue>,
		set: fn(&ConfiguredObject, Option<AttrValue>),
	) -> Self {
		Self {
			name,
			get,
			set,
			before_set: None,
			after_set: None,
		}
	}

	pub const fn before_set(mut self, hook: SlotHook) -> Self {
		self.before_set = Some(hook);
		self
	}

	pub const fn after_set(mut self, hook: SlotHook) -> Self {
		self.after_set = Some(hook);
		self
	}

	/// Writes `value` through the hooks and the setter.
	pub(crate) fn write(&self, object: &ConfiguredObject, value: Option<AttrValue>) {
		if let Some(hook) = self.before_set {
			hook(object, value.as_ref());
		}
		let after = self.after_set.map(|hook| (hook, value.clone()));
		(self.set)(object, value);
		if let Some((hook, value)) = after {
			hook(object, value.as_ref());
		}
	}
}

impl fmt::Debug for SlotDef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SlotDef").field("name", &self.name).finish_non_exhaustive()
	}
}

/// A named template variable with a fixed default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextDefault {
	pub name: &'static str,
	pub value: &'static str,
}

impl ContextDefault {
	pub const fn new(name: &'static str, value: &'static str) -> Self {
		Self { name, value }
	}
}

/// Role of a type declaration in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
	/// Shared declarations only; never instantiated.
	Abstract,
	/// Defines a category. `default_type` names the concrete tag used when
	/// creation attributes carry no `type`.
	Category {
		category: Category,
		default_type: Option<&'static str>,
	},
	/// Instantiable, identified within its category by `tag`.
	Concrete { tag: &'static str },
}

/// Static declaration of a type.
#[derive(Clone, Copy)]
pub struct TypeDef {
	pub name: &'static str,
	pub kind: TypeKind,
	pub supertypes: &'static [&'static TypeDef],
	pub description: &'static str,
	pub attributes: &'static [AttributeDef],
	pub statistics: &'static [StatisticDef],
	pub slots: &'static [SlotDef],
	pub context_defaults: &'static [ContextDefault],
	pub factory: Option<BehaviorFactory>,
}

impl TypeDef {
	const fn with_kind(name: &'static str, kind: TypeKind, supertypes: &'static [&'static TypeDef]) -> Self {
		Self {
			name,
			kind,
			supertypes,
			description: "",
			attributes: &[],
			statistics: &[],
			slots: &[],
			context_defaults: &[],
			factory: None,
		}
	}

	pub const fn abstract_type(name: &'static str, supertypes: &'static [&'static TypeDef]) -> Self {
		Self::with_kind(name, TypeKind::Abstract, supertypes)
	}

	pub const fn category(name: &'static str, category: Category, supertypes: &'static [&'static TypeDef]) -> Self {
		Self::with_kind(
			name,
			TypeKind::Category {
				category,
				default_type: None,
			},
			supertypes,
		)
	}

	pub const fn concrete(name: &'static str, tag: &'static str, supertypes: &'static [&'static TypeDef]) -> Self {
		Self::with_kind(name, TypeKind::Concrete { tag }, supertypes)
	}

	/// Sets the default concrete tag of a category type.
	pub const fn default_type(mut self, tag: &'static str) -> Self {
		if let TypeKind::Category { category, .. } = self.kind {
			self.kind = TypeKind::Category {
				category,
				default_type: Some(tag),
			};
		}
		self
	}

	pub const fn describe(mut self, text: &'static str) -> Self {
		self.description = text;
		self
	}

	pub const fn attributes(mut self, attributes: &'static [AttributeDef]) -> Self {
		self.attributes = attributes;
		self
	}

	pub const fn statistics(mut self, statistics: &'static [StatisticDef]) -> Self {
		self.statistics = statistics;
		self
	}

	pub const fn slots(mut self, slots: &'static [SlotDef]) -> Self {
		self.slots = slots;
		self
	}

	pub const fn context(mut self, defaults: &'static [ContextDefault]) -> Self {
		self.context_defaults = defaults;
		self
	}

	pub const fn factory(mut self, factory: BehaviorFactory) -> Self {
		self.factory = Some(factory);
		self
	}

	pub const fn is_concrete(&self) -> bool {
		matches!(self.kind, TypeKind::Concrete { .. })
	}

	/// Finds a slot by name on this type or, failing that, its supertypes.
	pub fn find_slot(&self, name: &str) -> Option<&'static SlotDef> {
		self.slots
			.iter()
			.find(|slot| slot.name == name)
			.or_else(|| self.supertypes.iter().find_map(|sup| sup.find_slot(name)))
	}
}

impl fmt::Debug for TypeDef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TypeDef")
			.field("name", &self.name)
			.field("kind", &self.kind)
			.finish_non_exhaustive()
	}
}
