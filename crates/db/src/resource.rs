// Copyright (c) 2025 Vellum contributors
// This file is licensed under the Apache-2.0 license

//! A singleton REST resource: one [`Cell`], gated by a resource-level
//! access pair (on top of the per-field permissions `vellum-rest` already
//! enforces), validated before commit, and notified after (spec.md §4.9).

use serde_json::Value as Json;
use vellum_core::{Access, Cell, Error, Level, Permissions, Result, TypeDescriptor};
use vellum_rest::RestResponse;

use crate::handle::Handle;
use crate::queue::{ChangeEvent, NotifyQueue};
use crate::transaction::Transaction;

pub type Validator = Box<dyn Fn(&Cell, &Cell) -> Result<()> + Send + Sync>;

pub struct Resource {
	handle: Handle,
	access: Permissions,
	validators: Vec<Validator>,
	queue: NotifyQueue,
}

impl Resource {
	pub fn new(type_desc: &'static TypeDescriptor) -> Self {
		Self {
			handle: Handle::new(Cell::new(type_desc)),
			access: Permissions::public(),
			validators: Vec::new(),
			queue: NotifyQueue::new(64),
		}
	}

	pub fn with_access(mut self, access: Permissions) -> Self {
		self.access = access;
		self
	}

	pub fn add_validator(&mut self, validator: impl Fn(&Cell, &Cell) -> Result<()> + Send + Sync + 'static) {
		self.validators.push(Box::new(validator));
	}

	pub fn subscribe(
		&mut self,
		filter: vellum_core::FieldMask,
		callback: impl Fn(&ChangeEvent) + Send + Sync + 'static,
	) -> u64 {
		self.queue.subscribe(filter, callback)
	}

	pub fn unsubscribe(&mut self, id: u64) {
		self.queue.unsubscribe(id);
	}

	pub fn queue_mut(&mut self) -> &mut NotifyQueue {
		&mut self.queue
	}

	pub fn handle(&self) -> &Handle {
		&self.handle
	}

	pub fn snapshot(&self) -> Cell {
		self.handle.snapshot()
	}

	pub fn rest_get(&self, path: &str, caller: Level) -> Result<RestResponse> {
		if !self.access.allows(caller, Access::Read) {
			return Err(Error::forbidden("resource not readable by caller"));
		}
		self.handle.with(|cell| vellum_rest::get(cell, path, caller))
	}

	pub fn rest_patch(&mut self, path: &str, body: &Json, caller: Level) -> Result<RestResponse> {
		self.apply(caller, |cell| vellum_rest::patch(cell, path, body, caller))
	}

	pub fn rest_put(&mut self, path: &str, body: &Json, caller: Level) -> Result<RestResponse> {
		self.apply(caller, |cell| vellum_rest::put(cell, path, body, caller))
	}

	pub fn rest_post(&mut self, path: &str, body: &Json, caller: Level) -> Result<RestResponse> {
		self.apply(caller, |cell| vellum_rest::post(cell, path, body, caller))
	}

	pub fn rest_delete(&mut self, path: &str, caller: Level) -> Result<RestResponse> {
		self.apply(caller, |cell| vellum_rest::delete(cell, path, caller))
	}

	fn apply(&mut self, caller: Level, edit: impl FnOnce(&mut Cell) -> Result<RestResponse>) -> Result<RestResponse> {
		if !self.access.allows(caller, Access::Write) {
			return Err(Error::forbidden("resource not writable by caller"));
		}
		let before = self.handle.snapshot();
		let mut txn = Transaction::begin(&self.handle);
		let response = match edit(txn.cell()) {
			Ok(r) => r,
			Err(e) => {
				txn.abort();
				return Err(e);
			}
		};
		if let Err(e) = self.validate(&before, txn.cell_ref()) {
			txn.abort();
			return Err(e);
		}
		let changes = txn.cell_ref().changes();
		let snapshot = txn.cell_ref().clone();
		drop(txn); // commits into self.handle

		if changes.is_any_changed() {
			self.queue.publish(ChangeEvent { id: None, changes, snapshot });
		}
		Ok(response)
	}

	fn validate(&self, before: &Cell, candidate: &Cell) -> Result<()> {
		for validator in &self.validators {
			validator(before, candidate)?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Arc;
	use vellum_core::{FieldDescriptor, FieldDetails, FieldKind, TypeDescriptor};

	static NAME: FieldDescriptor = FieldDescriptor {
		label: "name",
		description: "",
		tag: 0,
		index: 0,
		kind: FieldKind::String,
		array_capacity: 0,
		persist: true,
		always_notify: false,
		is_action: false,
		perms: Permissions::public(),
		min: None,
		max: None,
		string_capacity: 32,
		bytes_capacity: 0,
		details: FieldDetails::None,
	};
	static TYPE: TypeDescriptor = TypeDescriptor { name: "Settings", fields: &[NAME] };

	#[test]
	fn patch_notifies_subscribers() {
		let mut resource = Resource::new(&TYPE);
		let count = Arc::new(AtomicUsize::new(0));
		let c = count.clone();
		resource.subscribe(vellum_core::FieldMask::new(), move |_| {
			c.fetch_add(1, Ordering::SeqCst);
		});
		resource.rest_patch("/name", &json!("Ada"), Level::Root).unwrap();
		assert_eq!(count.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn validator_rejection_leaves_state_untouched() {
		let mut resource = Resource::new(&TYPE);
		resource.add_validator(|_before, candidate| {
			if candidate.field_as_string(0) == "forbidden" {
				Err(Error::validation("name not allowed"))
			} else {
				Ok(())
			}
		});
		let err = resource.rest_patch("/name", &json!("forbidden"), Level::Root).unwrap_err();
		assert_eq!(err.kind, vellum_core::ErrorKind::Validation);
		assert_eq!(resource.snapshot().field_as_string(0), "");
	}

	#[test]
	fn write_forbidden_below_required_level() {
		let mut resource = Resource::new(&TYPE).with_access(Permissions::new(Level::Public, Level::Admin));
		let err = resource.rest_patch("/name", &json!("x"), Level::Public).unwrap_err();
		assert_eq!(err.kind, vellum_core::ErrorKind::Permission);
	}
}
