//! The object arena and its writer thread.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use keel_worker::{Executor, ExecutorStatsSnapshot, Task};
use parking_lot::RwLock;
use rustc_hash::FxHashMap as HashMap;

use crate::meta::TypeRegistry;
use crate::object::ObjectNode;
use crate::{AttrValue, Category, CategoryGraph, ConfiguredObject, ModelConfig, ModelError, ObjectId, Subject};

struct ModelInner {
	registry: Arc<TypeRegistry>,
	graph: CategoryGraph,
	executor: Executor,
	objects: RwLock<HashMap<ObjectId, Arc<ObjectNode>>>,
	config: ModelConfig,
}

/// A live object graph sharing one writer thread.
///
/// Objects are held by id; parent and child edges are ids resolved through
/// the model. Every mutation of every object in the model is serialized on
/// the model's writer thread. Cloning is cheap.
#[derive(Clone)]
pub struct Model {
	inner: Arc<ModelInner>,
}

impl fmt::Debug for Model {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Model")
			.field("executor", &self.inner.executor)
			.field("objects", &self.inner.objects.read().len())
			.finish_non_exhaustive()
	}
}

impl Model {
	/// Starts the writer thread. `registry` must already hold every type the
	/// model will instantiate.
	pub fn new(registry: Arc<TypeRegistry>, graph: CategoryGraph, config: ModelConfig) -> Result<Self, ModelError> {
		let executor = Executor::start(&config.executor)?;
		Ok(Self {
			inner: Arc::new(ModelInner {
				registry,
				graph,
				executor,
				objects: RwLock::new(HashMap::default()),
				config,
			}),
		})
	}

	pub fn registry(&self) -> &Arc<TypeRegistry> {
		&self.inner.registry
	}

	pub fn graph(&self) -> &CategoryGraph {
		&self.inner.graph
	}

	pub fn config(&self) -> &ModelConfig {
		&self.inner.config
	}

	pub fn executor(&self) -> &Executor {
		&self.inner.executor
	}

	pub fn executor_stats(&self) -> ExecutorStatsSnapshot {
		self.inner.executor.stats()
	}

	/// Live object with `id`.
	pub fn get(&self, id: ObjectId) -> Option<ConfiguredObject> {
		self.node(id).map(|node| ConfiguredObject::from_node(self.clone(), node))
	}

	/// Every live object, in no particular order.
	pub fn objects(&self) -> Vec<ConfiguredObject> {
		let nodes: Vec<_> = self.inner.objects.read().values().cloned().collect();
		nodes
			.into_iter()
			.map(|node| ConfiguredObject::from_node(self.clone(), node))
			.collect()
	}

	pub(crate) fn node(&self, id: ObjectId) -> Option<Arc<ObjectNode>> {
		self.inner.objects.read().get(&id).cloned()
	}

	pub(crate) fn insert(&self, node: Arc<ObjectNode>) {
		self.inner.objects.write().insert(node.id, node);
	}

	pub(crate) fn remove(&self, id: ObjectId) {
		self.inner.objects.write().remove(&id);
	}

	fn on_writer<R: Send + 'static>(
		&self,
		op: &'static str,
		detail: String,
		f: impl FnOnce(&Model) -> Result<R, ModelError> + Send + 'static,
	) -> Result<R, ModelError> {
		let model = self.clone();
		let subject = Subject::current();
		self.inner
			.executor
			.run(Task::new(op, detail, move || Subject::scope(subject, || f(&model))))?
	}

	/// Constructs a parentless object and runs its `create` lifecycle.
	///
	/// If the lifecycle fails the object is deleted again.
	pub fn create_root(
		&self,
		category: Category,
		attributes: BTreeMap<String, AttrValue>,
	) -> Result<ConfiguredObject, ModelError> {
		self.on_writer("model.create_root", category.to_string(), move |model| {
			let root = model.construct_inline(category, attributes, &[], None)?;
			if let Err(err) = root.create_inline() {
				if let Err(cleanup) = root.delete_inline() {
					tracing::warn!(object = %root.id(), %cleanup, "model.object.cleanup_failed");
				}
				return Err(err);
			}
			Ok(root)
		})
	}

	/// Constructs and registers an object without running its lifecycle.
	///
	/// The object stays unresolved until it, or an ancestor, is opened.
	pub fn construct_object(
		&self,
		category: Category,
		attributes: BTreeMap<String, AttrValue>,
		parents: Vec<ConfiguredObject>,
	) -> Result<ConfiguredObject, ModelError> {
		self.on_writer("model.construct", category.to_string(), move |model| {
			model.construct_inline(category, attributes, &parents, None)
		})
	}

	/// Like [`Model::construct_object`] for an explicitly named concrete type.
	///
	/// A `type` attribute naming a different type is rejected.
	pub fn construct_typed(
		&self,
		type_name: &str,
		attributes: BTreeMap<String, AttrValue>,
		parents: Vec<ConfiguredObject>,
	) -> Result<ConfiguredObject, ModelError> {
		let info = self
			.registry()
			.descriptors_for(type_name)
			.ok_or_else(|| crate::MetaError::UnknownType(type_name.to_string()))?;
		let category = info
			.category()
			.ok_or_else(|| crate::MetaError::UnknownType(type_name.to_string()))?;
		let type_name = info.name();
		self.on_writer("model.construct", type_name.to_string(), move |model| {
			model.construct_inline(category, attributes, &parents, Some(type_name))
		})
	}

	/// Stops the writer thread after it drains queued tasks. Later mutations
	/// fail with [`crate::ExecutorError::Stopped`].
	pub fn shutdown(&self) {
		self.inner.executor.shutdown();
	}
}
