//! Context inheritance and `${...}` resolution of attribute values.

use std::collections::BTreeMap;

use keel_model::broker::{BROKER, MemoryVirtualHost, QUEUE, QueueImpl, VIRTUAL_HOST};
use keel_model::{AttrValue, ConfigError, ModelConfig, ModelError};

use crate::common::{attrs, broker_with_vhost, child, context, model, model_with, named};

#[test]
fn child_context_overrides_ancestors() {
	let model = model();
	let broker = model
		.create_root(BROKER, attrs([("name", "broker".into()), ("context", context([("x", "1")]))]))
		.unwrap();
	let vhost = child(
		&broker,
		VIRTUAL_HOST,
		attrs([("name", "vh".into()), ("context", context([("x", "2"), ("y", "${x}")]))]),
	);

	assert_eq!(vhost.interpolate("${x}-${y}"), "2-2");
	assert_eq!(broker.interpolate("${x}-${y}"), "1-${y}");
	assert_eq!(
		vhost.inherited_context(),
		BTreeMap::from([("x".to_string(), "2".to_string()), ("y".to_string(), "${x}".to_string())])
	);
	assert!(matches!(
		vhost.interpolate_strict("${x}${nowhere}"),
		Err(ConfigError::UnresolvedVariable(name)) if name == "nowhere"
	));
}

#[test]
fn context_may_be_json_text() {
	let model = model();
	let (broker, _) = broker_with_vhost(&model);
	let vhost = child(
		&broker,
		VIRTUAL_HOST,
		attrs([
			("name", "json".into()),
			("context", r#"{"virtualhost.housekeepingCheckPeriod": "2500"}"#.into()),
		]),
	);
	let host = vhost.behavior::<MemoryVirtualHost>().unwrap();
	assert_eq!(host.housekeeping_check_period(), Some(2_500));
}

#[test]
fn defaults_resolve_through_declared_context() {
	let model = model();
	let broker = model
		.create_root(
			BROKER,
			attrs([
				("name", "broker".into()),
				("context", context([("virtualhost.housekeepingCheckPeriod", "7000")])),
			]),
		)
		.unwrap();
	let inherited = child(&broker, VIRTUAL_HOST, named("inherited"));
	let local = child(
		&broker,
		VIRTUAL_HOST,
		attrs([
			("name", "local".into()),
			("context", context([("virtualhost.housekeepingCheckPeriod", "5000")])),
		]),
	);

	assert_eq!(inherited.attribute("housekeepingCheckPeriod"), Some(7_000.into()));
	assert_eq!(local.attribute("housekeepingCheckPeriod"), Some(5_000.into()));

	let plain = model.create_root(BROKER, named("plain")).unwrap();
	let fallback = child(&plain, VIRTUAL_HOST, named("fallback"));
	assert_eq!(fallback.attribute("housekeepingCheckPeriod"), Some(30_000.into()));
}

#[test]
fn properties_come_before_declared_defaults() {
	let config = ModelConfig {
		properties: BTreeMap::from([("queue.priorities".to_string(), "7".to_string())]),
		..ModelConfig::default()
	};
	let model = model_with(config);
	let (_, vhost) = broker_with_vhost(&model);
	let queue = child(&vhost, QUEUE, attrs([("name", "urgent".into()), ("type", "priority".into())]));
	assert_eq!(queue.behavior::<QueueImpl>().and_then(QueueImpl::priorities), Some(7));
}

#[test]
fn environment_variables_are_consulted() {
	// SAFETY: no other test reads or writes this variable.
	unsafe { std::env::set_var("KEEL_IT_HOUSEKEEPING_PERIOD", "4500") };
	let model = model();
	let (broker, _) = broker_with_vhost(&model);
	let vhost = child(
		&broker,
		VIRTUAL_HOST,
		attrs([
			("name", "env".into()),
			(
				"context",
				context([("virtualhost.housekeepingCheckPeriod", "${KEEL_IT_HOUSEKEEPING_PERIOD}")]),
			),
		]),
	);
	assert_eq!(vhost.attribute("housekeepingCheckPeriod"), Some(4_500.into()));
}

#[test]
fn undefined_variables_pass_through_unless_strict() {
	let model = model();
	let (_, vhost) = broker_with_vhost(&model);
	let queue = child(
		&vhost,
		QUEUE,
		attrs([("name", "loose".into()), ("description", "${undefined.variable}".into())]),
	);
	assert_eq!(queue.attribute("description"), Some("${undefined.variable}".into()));

	let strict = model_with(ModelConfig {
		strict_defaults: true,
		..ModelConfig::default()
	});
	let (_, vhost) = broker_with_vhost(&strict);
	let err = vhost
		.create_child(
			QUEUE,
			attrs([("name", "tight".into()), ("description", "${undefined.variable}".into())]),
			Vec::new(),
		)
		.unwrap_err();
	assert!(
		matches!(&err, ModelError::Config(ConfigError::UnresolvedVariable(name)) if name == "undefined.variable"),
		"{err}"
	);
	assert!(vhost.children(QUEUE).is_empty());
}

#[test]
fn interpolated_values_convert_to_the_declared_type() {
	let model = model();
	let (broker, _) = broker_with_vhost(&model);
	let vhost = child(
		&broker,
		VIRTUAL_HOST,
		attrs([
			("name", "typed".into()),
			("context", context([("period", "1200")])),
			("housekeepingCheckPeriod", "${period}".into()),
		]),
	);
	assert_eq!(vhost.attribute("housekeepingCheckPeriod"), Some(AttrValue::Int(1_200)));
	assert_eq!(vhost.raw_attribute("housekeepingCheckPeriod"), Some("${period}".into()));
}
