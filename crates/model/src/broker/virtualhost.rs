use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::{EXCHANGE, QUEUE, ROOT_SUPERS, VIRTUAL_HOST, effective_i64, provision};
use crate::meta::{AttributeDef, ContextDefault, SlotDef, StatisticDef, TypeDef};
use crate::{
	AttrValue, AttributeSource, Category, ConfigError, ConfiguredObject, ModelError, ObjectBehavior, ValidationView,
	ValueType,
};

const VIRTUAL_HOST_ATTRIBUTES: &[AttributeDef] = &[
	AttributeDef::automated("housekeepingCheckPeriod", ValueType::Int)
		.default_value("${virtualhost.housekeepingCheckPeriod}")
		.description("Milliseconds between housekeeping runs"),
	AttributeDef::automated("storePassword", ValueType::String)
		.secure()
		.description("Password of the message store"),
];

const VIRTUAL_HOST_STATISTICS: &[StatisticDef] = &[
	StatisticDef::new("queueCount", "Number of queues", |vhost| vhost.child_count(QUEUE) as i64),
	StatisticDef::new("exchangeCount", "Number of exchanges", |vhost| vhost.child_count(EXCHANGE) as i64),
];

const VIRTUAL_HOST_CONTEXT: &[ContextDefault] = &[ContextDefault::new("virtualhost.housekeepingCheckPeriod", "30000")];

pub static VIRTUAL_HOST_TYPE: TypeDef = TypeDef::category("VirtualHost", VIRTUAL_HOST, &ROOT_SUPERS)
	.default_type("Memory")
	.describe("An isolated namespace of queues and exchanges")
	.attributes(VIRTUAL_HOST_ATTRIBUTES)
	.statistics(VIRTUAL_HOST_STATISTICS)
	.context(VIRTUAL_HOST_CONTEXT);

static VIRTUAL_HOST_SUPERS: [&TypeDef; 1] = [&VIRTUAL_HOST_TYPE];

const MEMORY_SLOTS: &[SlotDef] = &[
	SlotDef::new("housekeepingCheckPeriod", get_housekeeping, set_housekeeping),
	SlotDef::new("storePassword", get_store_password, set_store_password),
];

pub static MEMORY_VIRTUAL_HOST: TypeDef = TypeDef::concrete("MemoryVirtualHost", "Memory", &VIRTUAL_HOST_SUPERS)
	.describe("Virtual host keeping messages in memory only")
	.slots(MEMORY_SLOTS)
	.factory(new_memory_virtual_host);

/// Behavior and backing slots of an in-memory virtual host.
#[derive(Debug, Default)]
pub struct MemoryVirtualHost {
	housekeeping_check_period: RwLock<Option<i64>>,
	store_password: RwLock<Option<String>>,
}

impl MemoryVirtualHost {
	pub fn housekeeping_check_period(&self) -> Option<i64> {
		*self.housekeeping_check_period.read()
	}
}

fn new_memory_virtual_host() -> Box<dyn ObjectBehavior> {
	Box::new(MemoryVirtualHost::default())
}

fn get_housekeeping(vhost: &ConfiguredObject) -> Option<AttrValue> {
	vhost.behavior::<MemoryVirtualHost>()?.housekeeping_check_period().map(AttrValue::Int)
}

fn set_housekeeping(vhost: &ConfiguredObject, value: Option<AttrValue>) {
	if let Some(host) = vhost.behavior::<MemoryVirtualHost>() {
		*host.housekeeping_check_period.write() = value.and_then(|v| v.as_i64());
	}
}

fn get_store_password(vhost: &ConfiguredObject) -> Option<AttrValue> {
	vhost
		.behavior::<MemoryVirtualHost>()?
		.store_password
		.read()
		.clone()
		.map(AttrValue::String)
}

fn set_store_password(vhost: &ConfiguredObject, value: Option<AttrValue>) {
	if let Some(host) = vhost.behavior::<MemoryVirtualHost>() {
		*host.store_password.write() = value.map(|v| v.to_string());
	}
}

fn check_period(object: &ConfiguredObject, source: &dyn AttributeSource) -> Result<(), ModelError> {
	match effective_i64(source, "housekeepingCheckPeriod") {
		Some(period) if period <= 0 => Err(ConfigError::validation(
			object,
			format!("housekeepingCheckPeriod must be positive, got {period}"),
		)
		.into()),
		_ => Ok(()),
	}
}

impl ObjectBehavior for MemoryVirtualHost {
	fn validate(&self, object: &ConfiguredObject) -> Result<(), ModelError> {
		check_period(object, object)
	}

	fn validate_change(&self, object: &ConfiguredObject, proposed: &ValidationView<'_>) -> Result<(), ModelError> {
		if proposed.is_changed("housekeepingCheckPeriod") {
			check_period(object, proposed)?;
		}
		Ok(())
	}

	fn add_child(
		&self,
		parent: &ConfiguredObject,
		category: Category,
		attributes: BTreeMap<String, AttrValue>,
		other_parents: &[ConfiguredObject],
	) -> Result<Option<ConfiguredObject>, ModelError> {
		provision(parent, category, &[QUEUE, EXCHANGE], attributes, other_parents)
	}
}
