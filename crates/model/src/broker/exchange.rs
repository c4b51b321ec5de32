use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::{BINDING, EXCHANGE, QUEUE, ROOT_SUPERS, provision};
use crate::meta::{AttributeDef, SlotDef, StatisticDef, TypeDef};
use crate::{AttrValue, Category, ConfigError, ConfiguredObject, ModelError, ObjectBehavior, ValueType};

const UNROUTABLE_BEHAVIOURS: &[&str] = &["DISCARD", "REJECT"];

const EXCHANGE_ATTRIBUTES: &[AttributeDef] = &[AttributeDef::automated(
	"unroutableMessageBehaviour",
	ValueType::Enum(UNROUTABLE_BEHAVIOURS),
)
.default_value("DISCARD")
.description("What happens to a message no binding matches")];

const EXCHANGE_STATISTICS: &[StatisticDef] =
	&[StatisticDef::new("bindingCount", "Number of bindings", |exchange| exchange.child_count(BINDING) as i64)];

const EXCHANGE_SLOTS: &[SlotDef] = &[SlotDef::new("unroutableMessageBehaviour", get_unroutable, set_unroutable)];

pub static EXCHANGE_TYPE: TypeDef = TypeDef::category("Exchange", EXCHANGE, &ROOT_SUPERS)
	.default_type("direct")
	.describe("Routes messages to queues through bindings")
	.attributes(EXCHANGE_ATTRIBUTES)
	.statistics(EXCHANGE_STATISTICS)
	.slots(EXCHANGE_SLOTS);

static EXCHANGE_SUPERS: [&TypeDef; 1] = [&EXCHANGE_TYPE];

pub static DIRECT_EXCHANGE: TypeDef = TypeDef::concrete("DirectExchange", "direct", &EXCHANGE_SUPERS)
	.describe("Routes on an exact binding key match")
	.factory(new_exchange);

pub static TOPIC_EXCHANGE: TypeDef = TypeDef::concrete("TopicExchange", "topic", &EXCHANGE_SUPERS)
	.describe("Routes on a dotted binding key pattern")
	.factory(new_exchange);

pub static FANOUT_EXCHANGE: TypeDef = TypeDef::concrete("FanoutExchange", "fanout", &EXCHANGE_SUPERS)
	.describe("Routes to every bound queue")
	.factory(new_exchange);

#[derive(Debug, Default)]
pub struct ExchangeImpl {
	unroutable: RwLock<Option<String>>,
}

impl ExchangeImpl {
	pub fn unroutable_message_behaviour(&self) -> Option<String> {
		self.unroutable.read().clone()
	}
}

fn new_exchange() -> Box<dyn ObjectBehavior> {
	Box::new(ExchangeImpl::default())
}

fn get_unroutable(exchange: &ConfiguredObject) -> Option<AttrValue> {
	exchange
		.behavior::<ExchangeImpl>()?
		.unroutable_message_behaviour()
		.map(AttrValue::String)
}

fn set_unroutable(exchange: &ConfiguredObject, value: Option<AttrValue>) {
	if let Some(ex) = exchange.behavior::<ExchangeImpl>() {
		*ex.unroutable.write() = value.map(|v| v.to_string());
	}
}

impl ObjectBehavior for ExchangeImpl {
	fn add_child(
		&self,
		parent: &ConfiguredObject,
		category: Category,
		attributes: BTreeMap<String, AttrValue>,
		other_parents: &[ConfiguredObject],
	) -> Result<Option<ConfiguredObject>, ModelError> {
		if category == BINDING && !other_parents.iter().any(|p| p.category() == QUEUE) {
			return Err(ConfigError::InvalidParents {
				category,
				reason: format!("binding under {parent} needs a queue"),
			}
			.into());
		}
		provision(parent, category, &[BINDING], attributes, other_parents)
	}
}
