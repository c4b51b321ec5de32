use std::collections::BTreeMap;

use super::{BROKER, ROOT_SUPERS, VIRTUAL_HOST, provision};
use crate::meta::{AttributeDef, TypeDef};
use crate::{AttrValue, AttributeSource, Category, ConfiguredObject, ModelError, ObjectBehavior, ValueType};

/// Version of the configuration model served by the broker.
pub const MODEL_VERSION: &str = "1.0";

const BROKER_ATTRIBUTES: &[AttributeDef] = &[AttributeDef::derived("modelVersion", ValueType::String, model_version)
	.description("Version of the configuration model")];

pub static BROKER_TYPE: TypeDef = TypeDef::category("Broker", BROKER, &ROOT_SUPERS)
	.default_type("Broker")
	.describe("Root of the broker hierarchy")
	.attributes(BROKER_ATTRIBUTES);

static BROKER_SUPERS: [&TypeDef; 1] = [&BROKER_TYPE];

pub static STANDARD_BROKER: TypeDef = TypeDef::concrete("StandardBroker", "Broker", &BROKER_SUPERS)
	.describe("The broker process")
	.factory(new_broker);

fn new_broker() -> Box<dyn ObjectBehavior> {
	Box::new(BrokerImpl)
}

fn model_version(_: &dyn AttributeSource) -> Option<AttrValue> {
	Some(AttrValue::from(MODEL_VERSION))
}

/// Behavior of the broker root.
#[derive(Debug, Default)]
pub struct BrokerImpl;

impl ObjectBehavior for BrokerImpl {
	fn add_child(
		&self,
		parent: &ConfiguredObject,
		category: Category,
		attributes: BTreeMap<String, AttrValue>,
		other_parents: &[ConfiguredObject],
	) -> Result<Option<ConfiguredObject>, ModelError> {
		provision(parent, category, &[VIRTUAL_HOST], attributes, other_parents)
	}
}
