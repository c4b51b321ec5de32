//! Shared fixtures for model integration tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use keel_model::broker::{self, BROKER, VIRTUAL_HOST};
use keel_model::{AttrValue, Category, ChangeListener, ConfiguredObject, Model, ModelConfig, State};
use parking_lot::Mutex;

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// A model over the built-in broker types.
pub fn model() -> Model {
	model_with(ModelConfig::default())
}

pub fn model_with(config: ModelConfig) -> Model {
	init_tracing();
	broker::model(config).expect("built-in types register")
}

pub fn attrs<const N: usize>(pairs: [(&str, AttrValue); N]) -> BTreeMap<String, AttrValue> {
	pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

pub fn named(name: &str) -> BTreeMap<String, AttrValue> {
	attrs([("name", AttrValue::from(name))])
}

/// A `context` attribute value.
pub fn context<const N: usize>(pairs: [(&str, &str); N]) -> AttrValue {
	AttrValue::Map(
		pairs
			.into_iter()
			.map(|(k, v)| (k.to_string(), AttrValue::from(v)))
			.collect(),
	)
}

/// Creates a child through the parent's type and unwraps it.
pub fn child(parent: &ConfiguredObject, category: Category, attributes: BTreeMap<String, AttrValue>) -> ConfiguredObject {
	parent
		.create_child(category, attributes, Vec::new())
		.expect("child created")
		.expect("type produced a child")
}

/// An opened broker holding one virtual host named `vhost`.
pub fn broker_with_vhost(model: &Model) -> (ConfiguredObject, ConfiguredObject) {
	let broker = model.create_root(BROKER, named("broker")).expect("broker created");
	let vhost = child(&broker, VIRTUAL_HOST, named("vhost"));
	(broker, vhost)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
	AttributeSet {
		name: String,
		old: Option<AttrValue>,
		new: Option<AttrValue>,
	},
	StateChanged {
		old: State,
		new: State,
	},
	ChildAdded(String),
	ChildRemoved(String),
}

/// Listener keeping every notification it receives.
#[derive(Default)]
pub struct Recorder {
	events: Mutex<Vec<Event>>,
}

impl Recorder {
	pub fn attach(object: &ConfiguredObject) -> Arc<Self> {
		let recorder = Arc::new(Self::default());
		object.add_change_listener(recorder.clone());
		recorder
	}

	pub fn events(&self) -> Vec<Event> {
		self.events.lock().clone()
	}

	pub fn clear(&self) {
		self.events.lock().clear();
	}
}

impl ChangeListener for Recorder {
	fn attribute_set(&self, _: &ConfiguredObject, name: &str, old: Option<&AttrValue>, new: Option<&AttrValue>) {
		self.events.lock().push(Event::AttributeSet {
			name: name.to_string(),
			old: old.cloned(),
			new: new.cloned(),
		});
	}

	fn state_changed(&self, _: &ConfiguredObject, old: State, new: State) {
		self.events.lock().push(Event::StateChanged { old, new });
	}

	fn child_added(&self, _: &ConfiguredObject, child: &ConfiguredObject) {
		self.events.lock().push(Event::ChildAdded(child.name()));
	}

	fn child_removed(&self, _: &ConfiguredObject, child: &ConfiguredObject) {
		self.events.lock().push(Event::ChildRemoved(child.name()));
	}
}
