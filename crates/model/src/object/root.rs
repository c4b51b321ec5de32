use std::collections::BTreeMap;

use crate::meta::{AttributeDef, SlotDef, TypeDef};
use crate::{AttrValue, ConfiguredObject, LifetimePolicy, State, ValueType};

/// Backing slots of the attributes every object carries.
#[derive(Debug, Default)]
pub(crate) struct CoreSlots {
	pub(crate) name: Option<String>,
	pub(crate) description: Option<String>,
	pub(crate) durable: Option<bool>,
	pub(crate) lifetime_policy: Option<LifetimePolicy>,
	pub(crate) context: Option<BTreeMap<String, String>>,
}

const CORE_ATTRIBUTES: &[AttributeDef] = &[
	AttributeDef::new("id", ValueType::Id).description("Immutable unique identifier"),
	AttributeDef::automated("name", ValueType::String).mandatory(),
	AttributeDef::new("type", ValueType::String).description("Concrete type tag"),
	AttributeDef::automated("description", ValueType::String),
	AttributeDef::automated("durable", ValueType::Bool).default_value("true"),
	AttributeDef::automated("lifetimePolicy", ValueType::Enum(LifetimePolicy::NAMES)).default_value("PERMANENT"),
	AttributeDef::automated("context", ValueType::Map).description("Local template variables"),
	AttributeDef::automated("desiredState", ValueType::Enum(State::NAMES)).default_value("ACTIVE"),
	AttributeDef::new("createdBy", ValueType::String),
	AttributeDef::new("createdTime", ValueType::Int),
	AttributeDef::new("lastUpdatedBy", ValueType::String),
	AttributeDef::new("lastUpdatedTime", ValueType::Int),
];

const CORE_SLOTS: &[SlotDef] = &[
	SlotDef::new("name", get_name, set_name),
	SlotDef::new("description", get_description, set_description),
	SlotDef::new("durable", get_durable, set_durable),
	SlotDef::new("lifetimePolicy", get_lifetime_policy, set_lifetime_policy),
	SlotDef::new("context", get_context, set_context),
	SlotDef::new("desiredState", get_desired_state, set_desired_state),
];

/// Root of every type hierarchy: identity, naming, audit and state attributes.
pub static CONFIGURED_OBJECT: TypeDef = TypeDef::abstract_type("ConfiguredObject", &[])
	.describe("Common attributes of every configured object")
	.attributes(CORE_ATTRIBUTES)
	.slots(CORE_SLOTS);

fn get_name(obj: &ConfiguredObject) -> Option<AttrValue> {
	obj.node.core.read().name.clone().map(AttrValue::String)
}

fn set_name(obj: &ConfiguredObject, value: Option<AttrValue>) {
	obj.node.core.write().name = value.map(|v| v.to_string());
}

fn get_description(obj: &ConfiguredObject) -> Option<AttrValue> {
	obj.node.core.read().description.clone().map(AttrValue::String)
}

fn set_description(obj: &ConfiguredObject, value: Option<AttrValue>) {
	obj.node.core.write().description = value.map(|v| v.to_string());
}

fn get_durable(obj: &ConfiguredObject) -> Option<AttrValue> {
	obj.node.core.read().durable.map(AttrValue::Bool)
}

fn set_durable(obj: &ConfiguredObject, value: Option<AttrValue>) {
	obj.node.core.write().durable = value.and_then(|v| v.as_bool());
}

fn get_lifetime_policy(obj: &ConfiguredObject) -> Option<AttrValue> {
	obj.node
		.core
		.read()
		.lifetime_policy
		.map(|p| AttrValue::from(p.as_str()))
}

fn set_lifetime_policy(obj: &ConfiguredObject, value: Option<AttrValue>) {
	obj.node.core.write().lifetime_policy = value.as_ref().and_then(AttrValue::as_str).and_then(LifetimePolicy::parse);
}

fn get_context(obj: &ConfiguredObject) -> Option<AttrValue> {
	obj.node.core.read().context.clone().map(AttrValue::from)
}

fn set_context(obj: &ConfiguredObject, value: Option<AttrValue>) {
	obj.node.core.write().context = value.map(|v| v.to_string_map());
}

fn get_desired_state(obj: &ConfiguredObject) -> Option<AttrValue> {
	Some(AttrValue::from(obj.desired_state().as_str()))
}

fn set_desired_state(obj: &ConfiguredObject, value: Option<AttrValue>) {
	if let Some(state) = value.as_ref().and_then(AttrValue::as_str).and_then(|s| s.parse().ok()) {
		obj.node.state.lock().desired = state;
	}
}
