use std::sync::atomic::Ordering;

use super::ConfiguredObject;
use crate::{LifecyclePhase, ModelError};

impl ConfiguredObject {
	/// Resolves, validates and opens the object and its subtree.
	///
	/// Only the first call does any work; later calls return `Ok(())`. A
	/// failed call releases the guard so a corrected object can try again.
	pub fn open(&self) -> Result<(), ModelError> {
		self.on_writer("object.open", |this| this.open_inline())
	}

	/// Like [`ConfiguredObject::open`] with first-time provisioning between
	/// validation and opening.
	pub fn create(&self) -> Result<(), ModelError> {
		self.on_writer("object.create", |this| this.create_inline())
	}

	pub(crate) fn open_inline(&self) -> Result<(), ModelError> {
		self.guarded(|this| {
			this.do_resolution(true)?;
			this.do_validation(true)?;
			this.do_opening(true)
		})
	}

	pub(crate) fn create_inline(&self) -> Result<(), ModelError> {
		self.guarded(|this| {
			this.do_resolution(true)?;
			this.do_validation(true)?;
			this.do_creation(true)?;
			this.do_opening(true)
		})
	}

	fn guarded(&self, phases: impl FnOnce(&Self) -> Result<(), ModelError>) -> Result<(), ModelError> {
		self.ensure_live()?;
		if self
			.node
			.open
			.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.is_err()
		{
			return Ok(());
		}
		let result = phases(self);
		if let Err(err) = &result {
			tracing::debug!(object = %self.id(), category = %self.category(), %err, "model.lifecycle.failed");
			self.node.open.store(false, Ordering::Release);
		}
		result
	}

	/// Runs on this object when `skip` is set or it has not been opened yet.
	fn pending(&self, skip: bool) -> bool {
		skip || !self.is_open()
	}

	fn do_resolution(&self, skip: bool) -> Result<(), ModelError> {
		if !self.pending(skip) {
			return Ok(());
		}
		self.on_resolve()?;
		self.advance_phase(LifecyclePhase::Resolved);
		tracing::debug!(object = %self.id(), category = %self.category(), "model.lifecycle.resolved");
		for child in self.all_children() {
			child.do_resolution(false)?;
		}
		Ok(())
	}

	/// Writes every automated attribute into its binding: the stored value if
	/// one was supplied, else the declared default.
	fn on_resolve(&self) -> Result<(), ModelError> {
		for desc in self.node.type_info.attributes() {
			let Some(slot) = desc.binding() else {
				continue;
			};
			let raw = self.raw_attribute(desc.name());
			let value = self.value_from_raw(desc, raw.as_ref())?;
			slot.write(self, value);
		}
		Ok(())
	}

	fn do_validation(&self, skip: bool) -> Result<(), ModelError> {
		if !self.pending(skip) {
			return Ok(());
		}
		for child in self.all_children() {
			child.do_validation(false)?;
		}
		self.node.behavior.validate(self)?;
		self.advance_phase(LifecyclePhase::Validated);
		tracing::debug!(object = %self.id(), category = %self.category(), "model.lifecycle.validated");
		Ok(())
	}

	fn do_creation(&self, skip: bool) -> Result<(), ModelError> {
		if !self.pending(skip) {
			return Ok(());
		}
		self.node.behavior.on_create(self)?;
		self.advance_phase(LifecyclePhase::Created);
		tracing::debug!(object = %self.id(), category = %self.category(), "model.lifecycle.created");
		for child in self.all_children() {
			child.do_creation(false)?;
		}
		Ok(())
	}

	fn do_opening(&self, skip: bool) -> Result<(), ModelError> {
		let claimed = skip
			|| self
				.node
				.open
				.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
				.is_ok();
		if !claimed {
			return Ok(());
		}
		if let Err(err) = self.node.behavior.on_open(self) {
			if !skip {
				self.node.open.store(false, Ordering::Release);
			}
			return Err(err);
		}
		self.attain_desired_state();
		self.advance_phase(LifecyclePhase::Opened);
		tracing::debug!(
			object = %self.id(),
			category = %self.category(),
			state = %self.state(),
			"model.lifecycle.opened"
		);
		for child in self.all_children() {
			child.do_opening(false)?;
		}
		Ok(())
	}
}
