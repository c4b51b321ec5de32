use std::sync::Arc;

use arc_swap::ArcSwap;
use indexmap::IndexMap;
use rustc_hash::FxHashMap as HashMap;
use serde::Serialize;

use super::def::{AttrFlags, AttributeDef, BehaviorFactory, DeriveFn, SlotDef, StatisticDef, TypeDef, TypeKind};
use crate::{Category, MetaError, ValueType};

/// One attribute as seen by a concrete type after merging.
#[derive(Debug, Clone, Copy)]
pub struct AttributeDescriptor {
	def: &'static AttributeDef,
	owner: &'static str,
	binding: Option<&'static SlotDef>,
}

impl AttributeDescriptor {
	pub fn name(&self) -> &'static str {
		self.def.name
	}

	pub fn value_type(&self) -> ValueType {
		self.def.value_type
	}

	pub fn flags(&self) -> AttrFlags {
		self.def.flags
	}

	pub fn default(&self) -> Option<&'static str> {
		self.def.default
	}

	pub fn description(&self) -> &'static str {
		self.def.description
	}

	/// Name of the type that declared this descriptor.
	pub fn owner(&self) -> &'static str {
		self.owner
	}

	pub fn binding(&self) -> Option<&'static SlotDef> {
		self.binding
	}

	pub fn derive(&self) -> Option<DeriveFn> {
		self.def.derive
	}

	pub fn is_mandatory(&self) -> bool {
		self.def.flags.contains(AttrFlags::MANDATORY)
	}

	pub fn is_derived(&self) -> bool {
		self.def.flags.contains(AttrFlags::DERIVED)
	}

	pub fn is_secure(&self) -> bool {
		self.def.flags.contains(AttrFlags::SECURE)
	}

	pub fn is_automated(&self) -> bool {
		self.def.flags.contains(AttrFlags::AUTOMATED)
	}

	fn summary(&self) -> AttributeSummary {
		AttributeSummary {
			name: self.name(),
			value_type: self.value_type().name(),
			mandatory: self.is_mandatory(),
			secure: self.is_secure(),
			automated: self.is_automated(),
			default: self.default(),
			description: self.description(),
		}
	}
}

/// Merged, immutable metadata of one registered type.
#[derive(Debug)]
pub struct TypeInfo {
	def: &'static TypeDef,
	category: Option<Category>,
	attributes: IndexMap<&'static str, AttributeDescriptor>,
	statistics: IndexMap<&'static str, &'static StatisticDef>,
	ancestry: Vec<&'static str>,
}

impl TypeInfo {
	pub fn name(&self) -> &'static str {
		self.def.name
	}

	pub fn def(&self) -> &'static TypeDef {
		self.def
	}

	/// Concrete type tag, `None` for abstract and category types.
	pub fn tag(&self) -> Option<&'static str> {
		match self.def.kind {
			TypeKind::Concrete { tag } => Some(tag),
			_ => None,
		}
	}

	pub fn category(&self) -> Option<Category> {
		self.category
	}

	pub fn is_concrete(&self) -> bool {
		self.def.is_concrete()
	}

	pub fn description(&self) -> &'static str {
		self.def.description
	}

	pub(crate) fn factory(&self) -> Option<BehaviorFactory> {
		self.def.factory
	}

	/// Descriptors in merge order.
	pub fn attributes(&self) -> impl Iterator<Item = &AttributeDescriptor> {
		self.attributes.values()
	}

	pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
		self.attributes.get(name)
	}

	pub fn attribute_names(&self) -> impl Iterator<Item = &'static str> + '_ {
		self.attributes.keys().copied()
	}

	pub fn statistics(&self) -> impl Iterator<Item = &'static StatisticDef> + '_ {
		self.statistics.values().copied()
	}

	/// Returns true if `name` is this type or one of its transitive supertypes.
	pub fn is_a(&self, name: &str) -> bool {
		self.ancestry.iter().any(|n| *n == name)
	}
}

/// Serializable summary of an attribute for documentation renderers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeSummary {
	pub name: &'static str,
	pub value_type: String,
	pub mandatory: bool,
	pub secure: bool,
	pub automated: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub default: Option<&'static str>,
	pub description: &'static str,
}

/// Serializable description of a concrete type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDescription {
	pub category: Category,
	#[serde(rename = "type")]
	pub type_tag: &'static str,
	pub description: &'static str,
	/// Non-derived attributes shared by every type of the category.
	pub common_attributes: Vec<AttributeSummary>,
	/// Non-derived attributes only this type declares.
	pub specific_attributes: Vec<AttributeSummary>,
}

#[derive(Debug, Clone, Copy)]
struct ContextEntry {
	value: &'static str,
	owner: &'static str,
}

#[derive(Debug, Clone, Default)]
struct Snapshot {
	types: HashMap<&'static str, Arc<TypeInfo>>,
	categories: HashMap<Category, &'static str>,
	/// Concrete types per category as `(tag, type name)`, ordered by tag.
	concrete: HashMap<Category, Vec<(&'static str, &'static str)>>,
	context: IndexMap<&'static str, ContextEntry>,
}

impl Snapshot {
	fn insert(&mut self, def: &'static TypeDef) -> Result<Arc<TypeInfo>, MetaError> {
		if let Some(info) = self.types.get(def.name) {
			return Ok(Arc::clone(info));
		}

		let supers = def
			.supertypes
			.iter()
			.map(|sup| self.insert(sup))
			.collect::<Result<Vec<_>, _>>()?;

		let mut ancestry = vec![def.name];
		for sup in &supers {
			for name in &sup.ancestry {
				if !ancestry.contains(name) {
					ancestry.push(*name);
				}
			}
		}

		let mut attributes = IndexMap::new();
		let mut statistics = IndexMap::new();
		for sup in &supers {
			for (name, desc) in &sup.attributes {
				attributes.insert(*name, *desc);
			}
			for (name, stat) in &sup.statistics {
				statistics.insert(*name, *stat);
			}
		}
		for attr in def.attributes {
			if attr.flags.contains(AttrFlags::AUTOMATED | AttrFlags::DERIVED) {
				return Err(MetaError::AutomatedDerived {
					type_name: def.name,
					attribute: attr.name,
				});
			}
			attributes.insert(
				attr.name,
				AttributeDescriptor {
					def: attr,
					owner: def.name,
					binding: None,
				},
			);
		}
		for stat in def.statistics {
			statistics.insert(stat.name, stat);
		}

		for desc in attributes.values_mut() {
			desc.binding = None;
			if !desc.is_automated() {
				continue;
			}
			desc.binding = def.find_slot(&slot_name(desc.name()));
			if desc.binding.is_none() && def.is_concrete() {
				return Err(MetaError::UnboundAttribute {
					type_name: def.name,
					attribute: desc.name(),
				});
			}
		}

		let category = self.resolve_category(def, &ancestry)?;

		for default in def.context_defaults {
			match self.context.get(default.name) {
				Some(existing) if existing.owner != def.name => {
					return Err(MetaError::DuplicateContextDefault {
						name: default.name,
						owner: def.name,
						existing: existing.owner,
					});
				}
				Some(_) => {}
				None => {
					self.context.insert(
						default.name,
						ContextEntry {
							value: default.value,
							owner: def.name,
						},
					);
				}
			}
		}

		match def.kind {
			TypeKind::Category { category, .. } => {
				self.categories.insert(category, def.name);
			}
			TypeKind::Concrete { tag } => {
				if def.factory.is_none() {
					return Err(MetaError::MissingFactory(def.name));
				}
				let Some(category) = category else {
					return Err(MetaError::NoCategory(def.name));
				};
				let tags = self.concrete.entry(category).or_default();
				if tags.iter().any(|(existing, _)| *existing == tag) {
					return Err(MetaError::DuplicateTypeTag { category, tag });
				}
				let pos = tags.binary_search_by(|(t, _)| t.cmp(&tag)).unwrap_or_else(|p| p);
				tags.insert(pos, (tag, def.name));
			}
			TypeKind::Abstract => {}
		}

		let info = Arc::new(TypeInfo {
			def,
			category,
			attributes,
			statistics,
			ancestry,
		});
		self.types.insert(def.name, Arc::clone(&info));
		Ok(info)
	}

	/// Picks the unique most specific category-defining type among `ancestry`.
	fn resolve_category(&self, def: &'static TypeDef, ancestry: &[&'static str]) -> Result<Option<Category>, MetaError> {
		let candidates: Vec<(&'static str, Category)> = ancestry
			.iter()
			.filter_map(|name| {
				let kind = if *name == def.name {
					def.kind
				} else {
					self.types.get(name)?.def.kind
				};
				match kind {
					TypeKind::Category { category, .. } => Some((*name, category)),
					_ => None,
				}
			})
			.collect();

		let ancestry_of = |name: &str| {
			if name == def.name {
				Some(ancestry)
			} else {
				self.types.get(name).map(|info| info.ancestry.as_slice())
			}
		};
		let is_supertype_of =
			|sup: &str, sub: &str| sub != sup && ancestry_of(sub).is_some_and(|names| names.iter().any(|n| *n == sup));
		let mut specific: Vec<(&'static str, Category)> = candidates
			.iter()
			.copied()
			.filter(|(name, _)| !candidates.iter().any(|(other, _)| is_supertype_of(*name, *other)))
			.collect();
		let mut seen = Vec::new();
		specific.retain(|(_, category)| {
			let fresh = !seen.contains(category);
			seen.push(*category);
			fresh
		});

		match specific.as_slice() {
			[] if def.is_concrete() => Err(MetaError::NoCategory(def.name)),
			[] => Ok(None),
			[(_, category)] => Ok(Some(*category)),
			many => Err(MetaError::AmbiguousCategory {
				type_name: def.name,
				candidates: many.iter().map(|(name, _)| *name).collect(),
			}),
		}
	}
}

fn slot_name(attribute: &str) -> String {
	attribute.replace('.', "_")
}

/// Process-wide table of registered types.
///
/// Readers load the published snapshot without locking. Registration builds a
/// replacement snapshot and publishes it with compare-and-swap, retrying from
/// the latest snapshot if another registration won.
#[derive(Debug, Default)]
pub struct TypeRegistry {
	snap: ArcSwap<Snapshot>,
}

impl TypeRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `def` and, recursively, its supertypes.
	///
	/// Registering an already known type returns the cached table. A failure
	/// leaves the registry unchanged.
	pub fn register(&self, def: &'static TypeDef) -> Result<Arc<TypeInfo>, MetaError> {
		loop {
			let cur = self.snap.load_full();
			if let Some(info) = cur.types.get(def.name) {
				return Ok(Arc::clone(info));
			}
			let mut next = (*cur).clone();
			let info = next.insert(def)?;
			let prev = self.snap.compare_and_swap(&cur, Arc::new(next));
			if Arc::ptr_eq(&*prev, &cur) {
				tracing::debug!(
					type_name = def.name,
					category = ?info.category(),
					attributes = info.attributes.len(),
					"model.meta.registered"
				);
				return Ok(info);
			}
		}
	}

	/// Registers every declaration in order.
	pub fn register_all(&self, defs: &[&'static TypeDef]) -> Result<(), MetaError> {
		for def in defs {
			self.register(def)?;
		}
		Ok(())
	}

	/// Merged descriptor table of a registered type.
	pub fn descriptors_for(&self, type_name: &str) -> Option<Arc<TypeInfo>> {
		self.snap.load().types.get(type_name).cloned()
	}

	/// Concrete type of `category` carrying `tag`.
	pub fn type_for(&self, category: Category, tag: &str) -> Option<Arc<TypeInfo>> {
		let snap = self.snap.load();
		let (_, name) = snap.concrete.get(&category)?.iter().find(|(t, _)| *t == tag)?;
		snap.types.get(name).cloned()
	}

	/// The type declaring `category` itself.
	pub fn category_type(&self, category: Category) -> Option<Arc<TypeInfo>> {
		let snap = self.snap.load();
		snap.types.get(snap.categories.get(&category)?).cloned()
	}

	/// All concrete types of `category`, ordered by tag.
	pub fn type_specialisations(&self, category: Category) -> Vec<Arc<TypeInfo>> {
		let snap = self.snap.load();
		snap.concrete
			.get(&category)
			.into_iter()
			.flatten()
			.filter_map(|(_, name)| snap.types.get(name).cloned())
			.collect()
	}

	/// Type used when creation attributes name none: the category's declared
	/// default, else its only specialisation.
	pub fn default_type(&self, category: Category) -> Option<Arc<TypeInfo>> {
		if let Some(cat) = self.category_type(category)
			&& let TypeKind::Category {
				default_type: Some(tag), ..
			} = cat.def.kind
		{
			return self.type_for(category, tag);
		}
		match self.type_specialisations(category).as_slice() {
			[only] => Some(Arc::clone(only)),
			_ => None,
		}
	}

	/// Attributes `type_name` declares beyond those common to its category.
	pub fn type_specific_attributes(&self, type_name: &str) -> Result<Vec<AttributeDescriptor>, MetaError> {
		let info = self
			.descriptors_for(type_name)
			.ok_or_else(|| MetaError::UnknownType(type_name.to_string()))?;
		let common = info.category().and_then(|c| self.category_type(c));
		Ok(info
			.attributes()
			.filter(|desc| common.as_ref().is_none_or(|c| c.attribute(desc.name()).is_none()))
			.copied()
			.collect())
	}

	/// Builds the documentation summary of a concrete type.
	pub fn describe(&self, type_name: &str) -> Result<TypeDescription, MetaError> {
		let info = self
			.descriptors_for(type_name)
			.ok_or_else(|| MetaError::UnknownType(type_name.to_string()))?;
		let (Some(category), Some(tag)) = (info.category(), info.tag()) else {
			return Err(MetaError::UnknownType(type_name.to_string()));
		};
		let specific = self.type_specific_attributes(type_name)?;
		let common = info
			.attributes()
			.filter(|desc| !specific.iter().any(|s| s.name() == desc.name()))
			.filter(|desc| !desc.is_derived())
			.map(AttributeDescriptor::summary)
			.collect();

		Ok(TypeDescription {
			category,
			type_tag: tag,
			description: info.description(),
			common_attributes: common,
			specific_attributes: specific
				.iter()
				.filter(|desc| !desc.is_derived())
				.map(AttributeDescriptor::summary)
				.collect(),
		})
	}

	/// Declared default of a context variable.
	pub fn context_default(&self, name: &str) -> Option<&'static str> {
		self.snap.load().context.get(name).map(|entry| entry.value)
	}

	/// All declared context defaults in registration order.
	pub fn default_context(&self) -> IndexMap<&'static str, &'static str> {
		self.snap.load().context.iter().map(|(name, entry)| (*name, entry.value)).collect()
	}
}
