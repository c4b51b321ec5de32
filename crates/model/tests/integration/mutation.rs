//! Compare-and-swap, bulk changes, state changes and secure attributes.

use std::collections::BTreeMap;
use std::sync::{Arc, Barrier};
use std::thread;

use keel_model::broker::{MemoryVirtualHost, QUEUE, VIRTUAL_HOST};
use keel_model::{AttrValue, ConfigError, ModelError, ObjectId, State, Subject};

use crate::common::{Event, Recorder, attrs, broker_with_vhost, child, model, named};

const THREADS: usize = 100;

#[test]
fn identical_cas_is_safe_to_retry() {
	let model = model();
	let (_, vhost) = broker_with_vhost(&model);
	let queue = child(&vhost, QUEUE, attrs([("name", "q".into()), ("description", "same".into())]));
	let recorder = Recorder::attach(&queue);

	for _ in 0..3 {
		let result = queue.set_attribute("description", Some("same".into()), Some("same".into()));
		assert_eq!(result.unwrap(), Some("same".into()));
	}
	let same = Event::AttributeSet {
		name: "description".to_string(),
		old: Some("same".into()),
		new: Some("same".into()),
	};
	assert_eq!(recorder.events(), vec![same.clone(), same.clone(), same]);
}

#[test]
fn mismatched_cas_returns_current_value() {
	let model = model();
	let (_, vhost) = broker_with_vhost(&model);
	let queue = child(&vhost, QUEUE, attrs([("name", "q".into()), ("description", "now".into())]));
	let recorder = Recorder::attach(&queue);

	let result = queue.set_attribute("description", Some("stale".into()), Some("next".into()));
	assert_eq!(result.unwrap(), Some("now".into()));
	assert_eq!(queue.attribute("description"), Some("now".into()));
	assert!(recorder.events().is_empty());

	let result = queue.set_attribute("description", Some("now".into()), None);
	assert_eq!(result.unwrap(), None);
	assert_eq!(queue.attribute("description"), None);
	assert_eq!(queue.raw_attribute("description"), None);
}

#[test]
fn concurrent_cas_loses_no_update() {
	let model = model();
	let (_, vhost) = broker_with_vhost(&model);
	let queue = child(&vhost, QUEUE, attrs([("name", "counter".into()), ("description", "0:start".into())]));
	let barrier = Arc::new(Barrier::new(THREADS));

	let handles: Vec<_> = (0..THREADS)
		.map(|worker| {
			let queue = queue.clone();
			let barrier = Arc::clone(&barrier);
			thread::spawn(move || {
				barrier.wait();
				let mut current = queue.attribute("description");
				loop {
					let count: u32 = current
						.as_ref()
						.and_then(AttrValue::as_str)
						.and_then(|s| s.split(':').next())
						.and_then(|n| n.parse().ok())
						.expect("counter value");
					// The worker id makes every desired value unique, so a
					// returned value equal to it can only mean success.
					let desired = AttrValue::from(format!("{}:{worker}", count + 1));
					let seen = queue
						.set_attribute("description", current.clone(), Some(desired.clone()))
						.expect("cas runs");
					if seen.as_ref() == Some(&desired) {
						return;
					}
					current = seen;
				}
			})
		})
		.collect();
	for handle in handles {
		handle.join().expect("worker finished");
	}

	let last = queue.attribute("description").unwrap();
	let count = last.as_str().and_then(|s| s.split(':').next()).unwrap();
	assert_eq!(count, THREADS.to_string());
	assert!(model.executor_stats().submitted >= THREADS as u64);
}

#[test]
fn derived_and_unknown_attributes_are_not_writable() {
	let model = model();
	let (_, vhost) = broker_with_vhost(&model);
	let queue = child(&vhost, QUEUE, named("q"));

	let err = queue.set_attribute("hasDepthLimit", None, Some(true.into())).unwrap_err();
	assert!(matches!(&err, ModelError::Config(ConfigError::DerivedAttribute(name)) if name == "hasDepthLimit"));
	let err = queue.set_attribute("colour", None, Some("red".into())).unwrap_err();
	assert!(matches!(err, ModelError::Config(ConfigError::UnknownAttribute { category: QUEUE, .. })));
}

#[test]
fn identity_cannot_change() {
	let model = model();
	let (_, vhost) = broker_with_vhost(&model);
	let queue = child(&vhost, QUEUE, named("q"));
	let err = queue
		.set_attribute("id", Some(queue.id().into()), Some(ObjectId::random().into()))
		.unwrap_err();
	assert!(matches!(err, ModelError::Config(ConfigError::IdentityChange(id)) if id == queue.id()), "{err}");
	assert_eq!(queue.attribute("id"), Some(queue.id().into()));
}

#[test]
fn identity_cannot_be_cleared() {
	let model = model();
	let (_, vhost) = broker_with_vhost(&model);
	let queue = child(&vhost, QUEUE, named("q"));
	let err = queue.set_attribute("id", Some(queue.id().into()), None).unwrap_err();
	assert!(matches!(err, ModelError::Config(ConfigError::IdentityChange(id)) if id == queue.id()), "{err}");

	let err = queue
		.set_attributes(BTreeMap::from([("id".to_string(), None)]))
		.unwrap_err();
	assert!(matches!(err, ModelError::Config(ConfigError::IdentityChange(_))), "{err}");
	assert_eq!(queue.attribute("id"), Some(queue.id().into()));
}

#[test]
fn bulk_changes_validate_as_a_whole() {
	let model = model();
	let (_, vhost) = broker_with_vhost(&model);
	let recorder = Recorder::attach(&vhost);
	let host = vhost.behavior::<MemoryVirtualHost>().unwrap();
	assert_eq!(host.housekeeping_check_period(), Some(30_000));

	let rejected = BTreeMap::from([
		("housekeepingCheckPeriod".to_string(), Some(AttrValue::Int(-5))),
		("description".to_string(), Some("tuned".into())),
	]);
	let err = vhost.set_attributes(rejected).unwrap_err();
	assert!(matches!(err, ModelError::Config(ConfigError::Validation { .. })), "{err}");
	assert_eq!(vhost.attribute("description"), None);
	assert_eq!(host.housekeeping_check_period(), Some(30_000));
	assert!(recorder.events().is_empty());

	let accepted = BTreeMap::from([
		("housekeepingCheckPeriod".to_string(), Some(AttrValue::Int(1_000))),
		("description".to_string(), Some("tuned".into())),
	]);
	vhost.set_attributes(accepted.clone()).unwrap();
	assert_eq!(host.housekeeping_check_period(), Some(1_000));
	assert_eq!(vhost.attribute("description"), Some("tuned".into()));
	assert_eq!(recorder.events().len(), 2);

	recorder.clear();
	vhost.set_attributes(accepted).unwrap();
	assert!(recorder.events().is_empty(), "unchanged entries are skipped");
}

#[test]
fn single_changes_are_validated_too() {
	let model = model();
	let (_, vhost) = broker_with_vhost(&model);
	let err = vhost
		.set_attribute("housekeepingCheckPeriod", Some(30_000.into()), Some(0.into()))
		.unwrap_err();
	assert!(matches!(err, ModelError::Config(ConfigError::Validation { .. })), "{err}");
	let err = vhost
		.set_attribute("housekeepingCheckPeriod", Some(30_000.into()), Some("soon".into()))
		.unwrap_err();
	assert!(matches!(err, ModelError::Config(ConfigError::Conversion { .. })), "{err}");
	assert_eq!(vhost.attribute("housekeepingCheckPeriod"), Some(30_000.into()));
}

#[test]
fn secure_values_are_masked_for_ordinary_callers() {
	let model = model();
	let (broker, _) = broker_with_vhost(&model);
	let vhost = child(
		&broker,
		VIRTUAL_HOST,
		attrs([("name", "secure".into()), ("storePassword", "s3cret".into())]),
	);

	assert_eq!(vhost.attribute("storePassword"), Some("********".into()));
	let alice = Subject::user("alice");
	assert_eq!(
		alice.run_as(|| vhost.attribute("storePassword")),
		Some("********".into())
	);
	assert_eq!(
		Subject::system().run_as(|| vhost.attribute("storePassword")),
		Some("s3cret".into())
	);

	let seen = alice.run_as(|| vhost.set_attribute("storePassword", Some("guess".into()), Some("x".into())));
	assert_eq!(seen.unwrap(), Some("********".into()));

	let changed = alice.run_as(|| vhost.set_attribute("storePassword", Some("s3cret".into()), Some("rotated".into())));
	assert_eq!(changed.unwrap(), Some("rotated".into()));
	assert_eq!(
		Subject::system().run_as(|| vhost.attribute("storePassword")),
		Some("rotated".into())
	);
	assert_eq!(vhost.attribute("name"), Some("secure".into()));
}

#[test]
fn desired_state_transitions() {
	let model = model();
	let (_, vhost) = broker_with_vhost(&model);
	let queue = child(&vhost, QUEUE, named("q"));
	let recorder = Recorder::attach(&queue);
	assert_eq!(queue.state(), State::Active);

	assert_eq!(queue.set_desired_state(State::Active, State::Stopped).unwrap(), State::Stopped);
	assert_eq!(queue.desired_state(), State::Stopped);
	assert_eq!(queue.raw_attribute("desiredState"), Some("STOPPED".into()));
	assert_eq!(queue.attribute("desiredState"), Some("STOPPED".into()));
	assert_eq!(
		recorder.events(),
		vec![Event::StateChanged {
			old: State::Active,
			new: State::Stopped
		}]
	);

	assert_eq!(queue.set_desired_state(State::Active, State::Quiesced).unwrap(), State::Stopped);
	assert_eq!(recorder.events().len(), 1);

	assert_eq!(queue.set_desired_state(State::Stopped, State::Deleted).unwrap(), State::Deleted);
	assert!(queue.is_deleted());
	assert!(vhost.children(QUEUE).is_empty());

	let err = queue.set_attribute("description", None, Some("gone".into())).unwrap_err();
	assert!(matches!(err, ModelError::Deleted(id) if id == queue.id()), "{err}");
}
