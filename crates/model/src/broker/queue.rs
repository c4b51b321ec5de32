use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::RwLock;

use super::{BINDING, EXCHANGE, QUEUE, ROOT_SUPERS, effective_i64, provision};
use crate::meta::{AttributeDef, ContextDefault, SlotDef, StatisticDef, TypeDef};
use crate::{
	AttrValue, AttributeSource, Category, ConfigError, ConfiguredObject, ModelError, ObjectBehavior, ValidationView,
	ValueType,
};

const QUEUE_ATTRIBUTES: &[AttributeDef] = &[
	AttributeDef::automated("maximumQueueDepthBytes", ValueType::Int)
		.default_value("-1")
		.description("Queue depth in bytes beyond which producers are flow controlled; -1 for none"),
	AttributeDef::derived("hasDepthLimit", ValueType::Bool, has_depth_limit),
	AttributeDef::new("alternateExchange", ValueType::Reference(EXCHANGE))
		.description("Exchange receiving messages this queue rejects"),
];

const QUEUE_STATISTICS: &[StatisticDef] = &[
	StatisticDef::new("queueDepthMessages", "Messages currently enqueued", depth_messages),
	StatisticDef::new("queueDepthBytes", "Bytes currently enqueued", depth_bytes),
];

const QUEUE_SLOTS: &[SlotDef] = &[SlotDef::new("maximumQueueDepthBytes", get_max_depth, set_max_depth)];

pub static QUEUE_TYPE: TypeDef = TypeDef::category("Queue", QUEUE, &ROOT_SUPERS)
	.default_type("standard")
	.describe("A named message buffer")
	.attributes(QUEUE_ATTRIBUTES)
	.statistics(QUEUE_STATISTICS)
	.slots(QUEUE_SLOTS);

static QUEUE_SUPERS: [&TypeDef; 1] = [&QUEUE_TYPE];

pub static STANDARD_QUEUE: TypeDef = TypeDef::concrete("StandardQueue", "standard", &QUEUE_SUPERS)
	.describe("First-in first-out queue")
	.factory(new_queue);

const PRIORITY_ATTRIBUTES: &[AttributeDef] = &[AttributeDef::automated("priorities", ValueType::Int)
	.default_value("${queue.priorities}")
	.description("Number of distinct priority levels")];

const PRIORITY_SLOTS: &[SlotDef] = &[SlotDef::new("priorities", get_priorities, set_priorities)];

const PRIORITY_CONTEXT: &[ContextDefault] = &[ContextDefault::new("queue.priorities", "10")];

pub static PRIORITY_QUEUE: TypeDef = TypeDef::concrete("PriorityQueue", "priority", &QUEUE_SUPERS)
	.describe("Queue delivering higher priority messages first")
	.attributes(PRIORITY_ATTRIBUTES)
	.slots(PRIORITY_SLOTS)
	.context(PRIORITY_CONTEXT)
	.factory(new_queue);

/// Behavior, backing slots and depth counters of a queue.
#[derive(Debug, Default)]
pub struct QueueImpl {
	max_depth_bytes: RwLock<Option<i64>>,
	priorities: RwLock<Option<i64>>,
	depth_messages: AtomicI64,
	depth_bytes: AtomicI64,
}

impl QueueImpl {
	/// Records a message of `bytes` entering the queue.
	pub fn enqueue(&self, bytes: i64) {
		self.depth_messages.fetch_add(1, Ordering::Relaxed);
		self.depth_bytes.fetch_add(bytes, Ordering::Relaxed);
	}

	/// Records a message of `bytes` leaving the queue.
	pub fn dequeue(&self, bytes: i64) {
		self.depth_messages.fetch_sub(1, Ordering::Relaxed);
		self.depth_bytes.fetch_sub(bytes, Ordering::Relaxed);
	}

	pub fn max_depth_bytes(&self) -> Option<i64> {
		*self.max_depth_bytes.read()
	}

	pub fn priorities(&self) -> Option<i64> {
		*self.priorities.read()
	}
}

fn new_queue() -> Box<dyn ObjectBehavior> {
	Box::new(QueueImpl::default())
}

fn has_depth_limit(source: &dyn AttributeSource) -> Option<AttrValue> {
	effective_i64(source, "maximumQueueDepthBytes").map(|limit| AttrValue::Bool(limit >= 0))
}

fn depth_messages(queue: &ConfiguredObject) -> i64 {
	queue
		.behavior::<QueueImpl>()
		.map_or(0, |q| q.depth_messages.load(Ordering::Relaxed))
}

fn depth_bytes(queue: &ConfiguredObject) -> i64 {
	queue
		.behavior::<QueueImpl>()
		.map_or(0, |q| q.depth_bytes.load(Ordering::Relaxed))
}

fn get_max_depth(queue: &ConfiguredObject) -> Option<AttrValue> {
	queue.behavior::<QueueImpl>()?.max_depth_bytes().map(AttrValue::Int)
}

fn set_max_depth(queue: &ConfiguredObject, value: Option<AttrValue>) {
	if let Some(q) = queue.behavior::<QueueImpl>() {
		*q.max_depth_bytes.write() = value.and_then(|v| v.as_i64());
	}
}

fn get_priorities(queue: &ConfiguredObject) -> Option<AttrValue> {
	queue.behavior::<QueueImpl>()?.priorities().map(AttrValue::Int)
}

fn set_priorities(queue: &ConfiguredObject, value: Option<AttrValue>) {
	if let Some(q) = queue.behavior::<QueueImpl>() {
		*q.priorities.write() = value.and_then(|v| v.as_i64());
	}
}

fn check_priorities(object: &ConfiguredObject, source: &dyn AttributeSource) -> Result<(), ModelError> {
	if object.type_info().attribute("priorities").is_none() {
		return Ok(());
	}
	match effective_i64(source, "priorities") {
		Some(1..=255) => Ok(()),
		other => Err(ConfigError::validation(
			object,
			format!("priorities must be between 1 and 255, got {other:?}"),
		)
		.into()),
	}
}

impl ObjectBehavior for QueueImpl {
	fn validate(&self, object: &ConfiguredObject) -> Result<(), ModelError> {
		check_priorities(object, object)
	}

	fn validate_change(&self, object: &ConfiguredObject, proposed: &ValidationView<'_>) -> Result<(), ModelError> {
		if proposed.is_changed("priorities") {
			check_priorities(object, proposed)?;
		}
		Ok(())
	}

	/// Bindings may be created from the queue side; the exchange must be
	/// among `other_parents`.
	fn add_child(
		&self,
		parent: &ConfiguredObject,
		category: Category,
		attributes: BTreeMap<String, AttrValue>,
		other_parents: &[ConfiguredObject],
	) -> Result<Option<ConfiguredObject>, ModelError> {
		provision(parent, category, &[BINDING], attributes, other_parents)
	}
}
