//! Built-in broker type set.
//!
//! ```text
//! Broker
//! └── VirtualHost
//!     ├── Queue ────┐
//!     └── Exchange ─┴── Binding
//! ```
//!
//! A binding has two parents: the exchange that routes through it and the
//! queue it delivers to.

mod binding;
mod exchange;
mod queue;
mod system;
mod virtualhost;

use std::collections::BTreeMap;
use std::sync::Arc;

pub use binding::{BINDING_TYPE, BindingImpl, STANDARD_BINDING};
pub use exchange::{DIRECT_EXCHANGE, EXCHANGE_TYPE, ExchangeImpl, FANOUT_EXCHANGE, TOPIC_EXCHANGE};
pub use queue::{PRIORITY_QUEUE, QUEUE_TYPE, QueueImpl, STANDARD_QUEUE};
pub use system::{BROKER_TYPE, BrokerImpl, MODEL_VERSION, STANDARD_BROKER};
pub use virtualhost::{MEMORY_VIRTUAL_HOST, MemoryVirtualHost, VIRTUAL_HOST_TYPE};

use crate::meta::{TypeDef, TypeRegistry};
use crate::{
	AttrValue, Category, CategoryGraph, ConfiguredObject, MetaError, Model, ModelConfig, ModelError, CONFIGURED_OBJECT,
};

pub const BROKER: Category = Category::new("Broker");
pub const VIRTUAL_HOST: Category = Category::new("VirtualHost");
pub const QUEUE: Category = Category::new("Queue");
pub const EXCHANGE: Category = Category::new("Exchange");
pub const BINDING: Category = Category::new("Binding");

static ROOT_SUPERS: [&TypeDef; 1] = [&CONFIGURED_OBJECT];

/// Every concrete built-in type.
pub static CONCRETE_TYPES: [&TypeDef; 8] = [
	&STANDARD_BROKER,
	&MEMORY_VIRTUAL_HOST,
	&STANDARD_QUEUE,
	&PRIORITY_QUEUE,
	&DIRECT_EXCHANGE,
	&TOPIC_EXCHANGE,
	&FANOUT_EXCHANGE,
	&STANDARD_BINDING,
];

/// Category graph of the built-in types.
pub fn graph() -> CategoryGraph {
	CategoryGraph::new()
		.root(BROKER)
		.relate(BROKER, VIRTUAL_HOST)
		.relate(VIRTUAL_HOST, QUEUE)
		.relate(VIRTUAL_HOST, EXCHANGE)
		.relate(EXCHANGE, BINDING)
		.relate(QUEUE, BINDING)
}

/// Registers every built-in type with `registry`.
pub fn register(registry: &TypeRegistry) -> Result<(), MetaError> {
	registry.register_all(&CONCRETE_TYPES)
}

/// A fresh registry holding the built-in types, with their category graph.
pub fn schema() -> Result<(Arc<TypeRegistry>, CategoryGraph), MetaError> {
	let registry = TypeRegistry::new();
	register(&registry)?;
	Ok((Arc::new(registry), graph()))
}

/// A model over the built-in types.
pub fn model(config: ModelConfig) -> Result<Model, ModelError> {
	let (registry, graph) = schema()?;
	Model::new(registry, graph, config)
}

/// Shared `add_child` of the built-in types: provisions children of the
/// `allowed` categories and rejects the rest.
fn provision(
	parent: &ConfiguredObject,
	category: Category,
	allowed: &[Category],
	attributes: BTreeMap<String, AttrValue>,
	other_parents: &[ConfiguredObject],
) -> Result<Option<ConfiguredObject>, ModelError> {
	if !allowed.contains(&category) {
		return Err(ModelError::Unsupported(format!(
			"{parent} cannot create {category} children"
		)));
	}
	parent.provision_child(category, attributes, other_parents).map(Some)
}

/// Reads an integer attribute through the effective value.
fn effective_i64(source: &dyn crate::AttributeSource, name: &str) -> Option<i64> {
	source.effective(name).and_then(|value| value.as_i64())
}
