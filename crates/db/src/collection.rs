// Copyright (c) 2025 Vellum contributors
// This file is licensed under the Apache-2.0 license

//! An id-keyed collection of [`Cell`]s (spec.md §4.10). Storage is a
//! `BTreeMap<u64, Cell>` rather than the C original's fixed-capacity array
//! scanned linearly: this keeps ascending-id iteration for free and O(log n)
//! lookup instead of O(n) linear search, while preserving the same
//! by-id-only addressing the spec's Non-goals restrict callers to (no
//! secondary indexes, no query language).

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as Json;
use vellum_core::{Cell, Error, FieldMask, Level, Result, TypeDescriptor};
use vellum_json::{DecodeOptions, EncodeOptions};
use vellum_rest::RestResponse;

use crate::id::IdGenerator;
use crate::queue::{ChangeEvent, NotifyQueue};

pub type Validator = Box<dyn Fn(Option<&Cell>, &Cell) -> Result<()> + Send + Sync>;

#[derive(Debug, Clone, Copy)]
pub struct CollectionAccess {
	pub create: Level,
	pub read: Level,
	pub update: Level,
	pub delete: Level,
}

impl Default for CollectionAccess {
	fn default() -> Self {
		Self { create: Level::Public, read: Level::Public, update: Level::Public, delete: Level::Public }
	}
}

pub struct Collection {
	type_desc: &'static TypeDescriptor,
	items: BTreeMap<u64, Cell>,
	capacity: usize,
	access: CollectionAccess,
	validators: Vec<Validator>,
	queue: NotifyQueue,
	id_gen: Arc<dyn IdGenerator>,
}

impl Collection {
	pub fn new(type_desc: &'static TypeDescriptor, capacity: usize, id_gen: Arc<dyn IdGenerator>) -> Self {
		Self {
			type_desc,
			items: BTreeMap::new(),
			capacity,
			access: CollectionAccess::default(),
			validators: Vec::new(),
			queue: NotifyQueue::new(64),
			id_gen,
		}
	}

	pub fn with_access(mut self, access: CollectionAccess) -> Self {
		self.access = access;
		self
	}

	pub fn add_validator(&mut self, validator: impl Fn(Option<&Cell>, &Cell) -> Result<()> + Send + Sync + 'static) {
		self.validators.push(Box::new(validator));
	}

	pub fn subscribe(&mut self, filter: FieldMask, callback: impl Fn(&ChangeEvent) + Send + Sync + 'static) -> u64 {
		self.queue.subscribe(filter, callback)
	}

	/// Subscribes to every change in the collection, any field.
	pub fn subscribe_to_all_paths(&mut self, callback: impl Fn(&ChangeEvent) + Send + Sync + 'static) -> u64 {
		self.subscribe(FieldMask::new(), callback)
	}

	pub fn unsubscribe(&mut self, id: u64) {
		self.queue.unsubscribe(id);
	}

	pub fn queue_mut(&mut self) -> &mut NotifyQueue {
		&mut self.queue
	}

	pub fn type_desc(&self) -> &'static TypeDescriptor {
		self.type_desc
	}

	pub fn count(&self) -> usize {
		self.items.len()
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	pub fn is_full(&self) -> bool {
		self.capacity > 0 && self.items.len() >= self.capacity
	}

	pub fn contains_id(&self, id: u64) -> bool {
		self.items.contains_key(&id)
	}

	pub fn get(&self, id: u64) -> Option<&Cell> {
		self.items.get(&id)
	}

	/// Ascending by id, matching `CollectionBase`'s iteration order.
	pub fn ids(&self) -> Vec<u64> {
		self.items.keys().copied().collect()
	}

	pub fn as_vector(&self) -> Vec<&Cell> {
		self.items.values().collect()
	}

	pub fn find_if(&self, predicate: impl Fn(&Cell) -> bool) -> Vec<&Cell> {
		self.items.values().filter(|c| predicate(c)).collect()
	}

	/// Candidate completions of a path rooted at this collection
	/// (`jude`'s `SearchForPath`): a bare numeric prefix completes against
	/// live item ids, anything past the first `/` is delegated to the
	/// matching item's own field tree.
	pub fn search_paths(&self, prefix: &str, caller: Level, max_paths: usize) -> Vec<String> {
		if !caller.satisfies(self.access.read) {
			return Vec::new();
		}
		let trimmed = prefix.trim_start_matches('/');
		match trimmed.split_once('/') {
			Some((id_part, rest)) => match id_part.parse::<u64>() {
				Ok(id) => match self.items.get(&id) {
					Some(item) => vellum_rest::search_paths(item, rest, caller, max_paths),
					None => Vec::new(),
				},
				Err(_) => Vec::new(),
			},
			None => self
				.items
				.keys()
				.filter(|id| id.to_string().starts_with(trimmed))
				.take(max_paths)
				.map(|id| id.to_string())
				.collect(),
		}
	}

	/// Ids of every item whose field named `label` currently equals
	/// `value` — the linear scan `CascadeDelete` uses to find dependents,
	/// since secondary indexes are out of scope (spec.md §1 Non-goals).
	pub fn ids_where_field_equals(&self, label: &str, value: u64) -> Vec<u64> {
		let Some(field) = self.type_desc.find_by_label(label) else { return Vec::new() };
		self.items.iter().filter(|(_, c)| c.get(field.index).as_u64() == Some(value)).map(|(id, _)| *id).collect()
	}

	/// Removes every item matching `predicate` without running validators
	/// or publishing notifications — an administrative bulk primitive,
	/// not a REST-facing operation (spec.md §4.10 supplement).
	pub fn remove_if(&mut self, predicate: impl Fn(&Cell) -> bool) -> Vec<Cell> {
		let ids: Vec<u64> = self.items.iter().filter(|(_, c)| predicate(c)).map(|(id, _)| *id).collect();
		ids.into_iter().filter_map(|id| self.items.remove(&id)).collect()
	}

	pub fn clear(&mut self) {
		self.items.clear();
	}

	fn validate(&self, before: Option<&Cell>, candidate: &Cell) -> Result<()> {
		for validator in &self.validators {
			validator(before, candidate)?;
		}
		Ok(())
	}

	pub fn rest_get(&self, path: &str, caller: Level) -> Result<RestResponse> {
		if !caller.satisfies(self.access.read) {
			return Err(Error::forbidden("collection not readable by caller"));
		}
		let trimmed = path.trim_matches('/');
		if trimmed.is_empty() {
			let opts = EncodeOptions { caller, ..Default::default() };
			let body = Json::Array(self.items.values().map(|c| vellum_json::encode(c, &opts)).collect());
			return Ok(RestResponse::ok(body));
		}
		let (id, rest) = split_id(path)?;
		let item = self.items.get(&id).ok_or_else(|| Error::not_found(format!("id {id} not found")))?;
		vellum_rest::get(item, rest, caller)
	}

	pub fn rest_post(&mut self, body: &Json, caller: Level) -> Result<RestResponse> {
		if !caller.satisfies(self.access.create) {
			return Err(Error::forbidden("collection not writable by caller"));
		}
		if self.is_full() {
			return Err(Error::conflict("collection is at capacity"));
		}
		let id = body.get("id").and_then(Json::as_u64).unwrap_or_else(|| self.id_gen.next_id());
		if self.items.contains_key(&id) {
			return Err(Error::conflict(format!("id {id} already exists")));
		}
		let opts = DecodeOptions { caller, ..Default::default() };
		let mut candidate = vellum_json::decode_new(self.type_desc, body, &opts)?;
		candidate.assign_id(id);
		self.validate(None, &candidate)?;
		let changes = candidate.changes();
		let encode_opts = EncodeOptions { caller, ..Default::default() };
		let response_body = vellum_json::encode(&candidate, &encode_opts);
		let mut stored = candidate.clone();
		stored.clear_changes();
		self.items.insert(id, stored);
		self.queue.publish(ChangeEvent { id: Some(id), changes, snapshot: candidate });
		Ok(RestResponse::created(response_body))
	}

	pub fn rest_patch(&mut self, path: &str, body: &Json, caller: Level) -> Result<RestResponse> {
		let (id, rest) = split_id(path)?;
		self.edit_existing_by_id(id, rest, caller, |cell, rest| vellum_rest::patch(cell, rest, body, caller))
	}

	pub fn rest_put(&mut self, path: &str, body: &Json, caller: Level) -> Result<RestResponse> {
		let (id, rest) = split_id(path)?;
		self.edit_existing_by_id(id, rest, caller, |cell, rest| vellum_rest::put(cell, rest, body, caller))
	}

	fn edit_existing_by_id(
		&mut self,
		id: u64,
		rest: &str,
		caller: Level,
		edit: impl FnOnce(&mut Cell, &str) -> Result<RestResponse>,
	) -> Result<RestResponse> {
		if !caller.satisfies(self.access.update) {
			return Err(Error::forbidden("collection not writable by caller"));
		}
		let before = self.items.get(&id).cloned().ok_or_else(|| Error::not_found(format!("id {id} not found")))?;
		let mut candidate = before.clone();
		let response = edit(&mut candidate, rest)?;
		self.validate(Some(&before), &candidate)?;
		let changes = candidate.changes();
		let snapshot = candidate.clone();
		let mut stored = candidate;
		stored.clear_changes();
		self.items.insert(id, stored);
		if changes.is_any_changed() {
			self.queue.publish(ChangeEvent { id: Some(id), changes, snapshot });
		}
		Ok(response)
	}

	pub fn rest_delete(&mut self, path: &str, caller: Level) -> Result<RestResponse> {
		if !caller.satisfies(self.access.delete) {
			return Err(Error::forbidden("collection not writable by caller"));
		}
		let (id, rest) = split_id(path)?;
		if rest.is_empty() {
			return self.delete_whole_item(id);
		}
		self.edit_existing_by_id(id, rest, caller, |cell, rest| vellum_rest::delete(cell, rest, caller))
	}

	/// Clears a scalar reference field on every item currently equal to
	/// `value`, leaving the items themselves in the collection — the
	/// non-`required` branch of `CascadeDelete` (spec.md §4.13). Bypasses
	/// validators for the same reason `delete_whole_item` does: a cascade
	/// should not re-enter the public REST-dispatch pipeline per element.
	pub(crate) fn clear_field_where(&mut self, label: &str, value: u64) -> Vec<u64> {
		let Some(field) = self.type_desc.find_by_label(label) else { return Vec::new() };
		let ids: Vec<u64> = self
			.items
			.iter()
			.filter(|(_, c)| c.get(field.index).as_u64() == Some(value))
			.map(|(id, _)| *id)
			.collect();
		for id in &ids {
			if let Some(item) = self.items.get_mut(id) {
				item.clear_field(field.index);
				let changes = item.changes();
				let snapshot = item.clone();
				item.clear_changes();
				self.queue.publish(ChangeEvent { id: Some(*id), changes, snapshot });
			}
		}
		ids
	}

	/// Removes an entire item, publishing a change event whose `changes`
	/// mask marks the id field as changed — the collection-level
	/// equivalent of [`Cell::is_deleted`]'s `!touched && changed` pattern,
	/// since the item itself no longer exists to carry that state.
	pub(crate) fn delete_whole_item(&mut self, id: u64) -> Result<RestResponse> {
		let removed = self.items.remove(&id).ok_or_else(|| Error::not_found(format!("id {id} not found")))?;
		let mut changes = FieldMask::new();
		changes.set_changed(vellum_core::ID_FIELD_INDEX);
		self.queue.publish(ChangeEvent { id: Some(id), changes, snapshot: removed });
		Ok(RestResponse::no_content())
	}
}

fn split_id(path: &str) -> Result<(u64, &str)> {
	let trimmed = path.trim_start_matches('/');
	let (head, rest) = trimmed.split_once('/').unwrap_or((trimmed, ""));
	let id = head.parse::<u64>().map_err(|_| Error::not_found("expected a numeric id"))?;
	Ok((id, rest))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::id::SequentialIds;
	use serde_json::json;
	use vellum_core::{FieldDescriptor, FieldDetails, FieldKind, Permissions};

	static ID: FieldDescriptor = FieldDescriptor {
		label: "id",
		description: "",
		tag: 0,
		index: 0,
		kind: FieldKind::U64,
		array_capacity: 0,
		persist: true,
		always_notify: false,
		is_action: false,
		perms: Permissions::public(),
		min: None,
		max: None,
		string_capacity: 0,
		bytes_capacity: 0,
		details: FieldDetails::None,
	};
	static NAME: FieldDescriptor = FieldDescriptor {
		label: "name",
		description: "",
		tag: 1,
		index: 1,
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
	static TYPE: TypeDescriptor = TypeDescriptor { name: "User", fields: &[ID, NAME] };

	fn new_collection() -> Collection {
		Collection::new(&TYPE, 0, Arc::new(SequentialIds::default()))
	}

	#[test]
	fn post_assigns_id_when_absent() {
		let mut c = new_collection();
		let resp = c.rest_post(&json!({"name": "Ada"}), Level::Root).unwrap();
		assert_eq!(resp.code, vellum_core::RestCode::Created201);
		assert_eq!(c.count(), 1);
		assert_eq!(c.ids(), vec![1]);
	}

	#[test]
	fn duplicate_id_conflicts() {
		let mut c = new_collection();
		c.rest_post(&json!({"id": 5, "name": "Ada"}), Level::Root).unwrap();
		let err = c.rest_post(&json!({"id": 5, "name": "Grace"}), Level::Root).unwrap_err();
		assert_eq!(err.kind, vellum_core::ErrorKind::Conflict);
	}

	#[test]
	fn delete_whole_item_removes_from_map() {
		let mut c = new_collection();
		c.rest_post(&json!({"id": 1, "name": "Ada"}), Level::Root).unwrap();
		let resp = c.rest_delete("/1", Level::Root).unwrap();
		assert_eq!(resp.code, vellum_core::RestCode::NoContent204);
		assert!(!c.contains_id(1));
	}

	#[test]
	fn patch_nested_field_leaves_item_in_place() {
		let mut c = new_collection();
		c.rest_post(&json!({"id": 1, "name": "Ada"}), Level::Root).unwrap();
		c.rest_patch("/1/name", &json!("Ada Lovelace"), Level::Root).unwrap();
		assert_eq!(c.get(1).unwrap().field_as_string(1), "Ada Lovelace");
	}

	#[test]
	fn capacity_rejects_overflow() {
		let mut c = Collection::new(&TYPE, 1, Arc::new(SequentialIds::default()));
		c.rest_post(&json!({"name": "Ada"}), Level::Root).unwrap();
		let err = c.rest_post(&json!({"name": "Grace"}), Level::Root).unwrap_err();
		assert_eq!(err.kind, vellum_core::ErrorKind::Conflict);
	}
}
