//! Behavior of the built-in broker types.

use keel_model::broker::{
	BINDING, BindingImpl, EXCHANGE, ExchangeImpl, MODEL_VERSION, QUEUE, QueueImpl, VIRTUAL_HOST,
};
use keel_model::{AttrValue, ConfigError, LifecyclePhase, ModelError, ValueError};

use crate::common::{Event, Recorder, attrs, broker_with_vhost, child, model, named};

#[test]
fn type_attribute_selects_the_concrete_type() {
	let model = model();
	let (broker, vhost) = broker_with_vhost(&model);
	assert_eq!(broker.type_tag(), "Broker");
	assert_eq!(vhost.type_info().name(), "MemoryVirtualHost");

	let standard = child(&vhost, QUEUE, named("plain"));
	assert_eq!(standard.type_info().name(), "StandardQueue");
	assert_eq!(standard.raw_attribute("type"), Some("standard".into()));

	let priority = child(&vhost, QUEUE, attrs([("name", "ranked".into()), ("type", "priority".into())]));
	assert_eq!(priority.type_tag(), "priority");
	assert_eq!(priority.attribute("priorities"), Some(10.into()));
	assert_eq!(standard.attribute("priorities"), None);

	let by_name = child(&vhost, QUEUE, attrs([("name", "named".into()), ("type", "PriorityQueue".into())]));
	assert_eq!(by_name.type_tag(), "priority");

	let err = vhost
		.create_child(QUEUE, attrs([("name", "odd".into()), ("type", "lifo".into())]), Vec::new())
		.unwrap_err();
	assert!(matches!(err, ModelError::Config(ConfigError::UnknownType { category: QUEUE, .. })), "{err}");
}

#[test]
fn explicit_type_must_agree_with_provided_type() {
	let model = model();
	let (_, vhost) = broker_with_vhost(&model);
	let err = model
		.construct_typed(
			"FanoutExchange",
			attrs([("name", "fan".into()), ("type", "direct".into())]),
			vec![vhost.clone()],
		)
		.unwrap_err();
	assert!(
		matches!(&err, ModelError::Config(ConfigError::ProvidedTypeMismatch { provided, calculated })
			if provided == "direct" && calculated == "fanout"),
		"{err}"
	);

	let fanout = model
		.construct_typed("FanoutExchange", named("fan"), vec![vhost.clone()])
		.unwrap();
	assert_eq!(fanout.type_tag(), "fanout");
	assert_eq!(fanout.phase(), LifecyclePhase::Constructed);
	fanout.open().unwrap();
	assert_eq!(fanout.phase(), LifecyclePhase::Opened);
	assert_eq!(
		fanout.behavior::<ExchangeImpl>().and_then(ExchangeImpl::unroutable_message_behaviour),
		Some("DISCARD".to_string())
	);
}

#[test]
fn priorities_are_range_checked() {
	let model = model();
	let (_, vhost) = broker_with_vhost(&model);
	let err = vhost
		.create_child(
			QUEUE,
			attrs([("name", "flat".into()), ("type", "priority".into()), ("priorities", 0.into())]),
			Vec::new(),
		)
		.unwrap_err();
	assert!(matches!(err, ModelError::Config(ConfigError::Validation { .. })), "{err}");
	assert!(vhost.child_by_name(QUEUE, "flat").is_none());

	let queue = child(&vhost, QUEUE, attrs([("name", "ranked".into()), ("type", "priority".into())]));
	let err = queue
		.set_attribute("priorities", Some(10.into()), Some(300.into()))
		.unwrap_err();
	assert!(matches!(err, ModelError::Config(ConfigError::Validation { .. })), "{err}");
	queue.set_attribute("priorities", Some(10.into()), Some(5.into())).unwrap();
	assert_eq!(queue.behavior::<QueueImpl>().and_then(QueueImpl::priorities), Some(5));
}

#[test]
fn depth_limit_is_derived_from_the_maximum() {
	let model = model();
	let (_, vhost) = broker_with_vhost(&model);
	let queue = child(&vhost, QUEUE, named("bounded"));
	assert_eq!(queue.attribute("maximumQueueDepthBytes"), Some((-1).into()));
	assert_eq!(queue.attribute("hasDepthLimit"), Some(false.into()));

	queue
		.set_attribute("maximumQueueDepthBytes", Some((-1).into()), Some("4096".into()))
		.unwrap();
	assert_eq!(queue.behavior::<QueueImpl>().and_then(QueueImpl::max_depth_bytes), Some(4_096));
	assert_eq!(queue.attribute("hasDepthLimit"), Some(true.into()));
}

#[test]
fn statistics_follow_live_state() {
	let model = model();
	let (broker, vhost) = broker_with_vhost(&model);
	let exchange = child(&vhost, EXCHANGE, named("ex"));
	let queue = child(&vhost, QUEUE, named("q"));
	exchange
		.create_child(BINDING, named("b"), vec![queue.clone()])
		.unwrap()
		.unwrap();

	let q = queue.behavior::<QueueImpl>().unwrap();
	q.enqueue(512);
	q.enqueue(512);
	q.dequeue(256);
	let stats = queue.statistics();
	assert_eq!(stats["queueDepthMessages"], 1);
	assert_eq!(stats["queueDepthBytes"], 768);

	let stats = vhost.statistics();
	assert_eq!(stats["queueCount"], 1);
	assert_eq!(stats["exchangeCount"], 1);
	assert_eq!(exchange.statistics()["bindingCount"], 1);

	assert_eq!(broker.attribute("modelVersion"), Some(MODEL_VERSION.into()));
	assert!(broker.statistics().is_empty());
}

#[test]
fn enum_attributes_are_canonicalised() {
	let model = model();
	let (_, vhost) = broker_with_vhost(&model);
	let exchange = child(&vhost, EXCHANGE, named("ex"));
	exchange
		.set_attribute("unroutableMessageBehaviour", Some("DISCARD".into()), Some("reject".into()))
		.unwrap();
	assert_eq!(exchange.attribute("unroutableMessageBehaviour"), Some("REJECT".into()));

	let err = exchange
		.set_attribute("unroutableMessageBehaviour", Some("REJECT".into()), Some("bounce".into()))
		.unwrap_err();
	assert!(
		matches!(
			&err,
			ModelError::Config(ConfigError::Conversion {
				source: ValueError::NotInEnum { .. },
				..
			})
		),
		"{err}"
	);
}

#[test]
fn references_resolve_by_name() {
	let model = model();
	let (_, vhost) = broker_with_vhost(&model);
	let exchange = child(&vhost, EXCHANGE, named("dead.letters"));
	let queue = child(
		&vhost,
		QUEUE,
		attrs([("name", "work".into()), ("alternateExchange", "dead.letters".into())]),
	);
	assert_eq!(queue.attribute("alternateExchange"), Some(AttrValue::Id(exchange.id())));
	assert_eq!(
		queue.as_record().attributes.get("alternateExchange"),
		Some(&AttrValue::Id(exchange.id()))
	);

	let err = queue
		.set_attribute(
			"alternateExchange",
			Some(AttrValue::Id(exchange.id())),
			Some("nowhere".into()),
		)
		.unwrap_err();
	assert!(
		matches!(
			&err,
			ModelError::Config(ConfigError::Conversion {
				source: ValueError::UnknownReference { category: EXCHANGE, .. },
				..
			})
		),
		"{err}"
	);
}

#[test]
fn children_are_announced_to_listeners() {
	let model = model();
	let (broker, vhost) = broker_with_vhost(&model);
	let recorder = Recorder::attach(&broker);
	child(&broker, VIRTUAL_HOST, named("second"));
	assert_eq!(recorder.events(), vec![Event::ChildAdded("second".to_string())]);

	let exchange = child(&vhost, EXCHANGE, named("ex"));
	let queue = child(&vhost, QUEUE, named("q"));
	let binding = queue
		.create_child(BINDING, attrs([("name", "b".into()), ("bindingKey", "orders".into())]), vec![exchange])
		.unwrap()
		.unwrap();
	assert_eq!(
		binding.behavior::<BindingImpl>().and_then(BindingImpl::binding_key),
		Some("orders".to_string())
	);
}
