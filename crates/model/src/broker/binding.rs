use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::{BINDING, ROOT_SUPERS};
use crate::meta::{AttributeDef, SlotDef, TypeDef};
use crate::{AttrValue, ConfiguredObject, ObjectBehavior, ValueType};

const BINDING_ATTRIBUTES: &[AttributeDef] = &[
	AttributeDef::automated("bindingKey", ValueType::String).default_value(""),
	AttributeDef::automated("arguments", ValueType::Map).description("Exchange-specific match arguments"),
];

pub static BINDING_TYPE: TypeDef = TypeDef::category("Binding", BINDING, &ROOT_SUPERS)
	.describe("Links an exchange to a queue")
	.attributes(BINDING_ATTRIBUTES);

static BINDING_SUPERS: [&TypeDef; 1] = [&BINDING_TYPE];

const BINDING_SLOTS: &[SlotDef] = &[
	SlotDef::new("bindingKey", get_binding_key, set_binding_key),
	SlotDef::new("arguments", get_arguments, set_arguments),
];

pub static STANDARD_BINDING: TypeDef = TypeDef::concrete("StandardBinding", "binding", &BINDING_SUPERS)
	.slots(BINDING_SLOTS)
	.factory(new_binding);

#[derive(Debug, Default)]
pub struct BindingImpl {
	binding_key: RwLock<Option<String>>,
	arguments: RwLock<Option<BTreeMap<String, AttrValue>>>,
}

impl BindingImpl {
	pub fn binding_key(&self) -> Option<String> {
		self.binding_key.read().clone()
	}
}

impl ObjectBehavior for BindingImpl {}

fn new_binding() -> Box<dyn ObjectBehavior> {
	Box::new(BindingImpl::default())
}

fn get_binding_key(binding: &ConfiguredObject) -> Option<AttrValue> {
	binding.behavior::<BindingImpl>()?.binding_key().map(AttrValue::String)
}

fn set_binding_key(binding: &ConfiguredObject, value: Option<AttrValue>) {
	if let Some(b) = binding.behavior::<BindingImpl>() {
		*b.binding_key.write() = value.map(|v| v.to_string());
	}
}

fn get_arguments(binding: &ConfiguredObject) -> Option<AttrValue> {
	binding
		.behavior::<BindingImpl>()?
		.arguments
		.read()
		.clone()
		.map(AttrValue::Map)
}

fn set_arguments(binding: &ConfiguredObject, value: Option<AttrValue>) {
	if let Some(b) = binding.behavior::<BindingImpl>() {
		*b.arguments.write() = value.and_then(|v| v.as_map().cloned());
	}
}
