// Copyright (c) 2025 Vellum contributors
// This file is licensed under the Apache-2.0 license

//! Hierarchical composition of resources, collections, and nested databases
//! under one flat, name-dispatched tree (spec.md §4.11). The first path
//! token always selects a member of the current database; everything after
//! it is handed to that member unchanged, so a `Database` nested inside
//! another is indistinguishable from a top-level one to its own children.

use indexmap::IndexMap;
use serde_json::Value as Json;
use vellum_core::{Error, Level, Result};
use vellum_rest::RestResponse;

use crate::collection::Collection;
use crate::relationships::Relationship;
use crate::resource::Resource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
	Get,
	Post,
	Patch,
	Put,
	Delete,
}

pub enum Member {
	Resource(Resource),
	Collection(Collection),
	Database(Database),
}

pub struct Database {
	members: IndexMap<&'static str, Member>,
	relationships: Vec<Relationship>,
}

impl Default for Database {
	fn default() -> Self {
		Self::new()
	}
}

impl Database {
	pub fn new() -> Self {
		Self { members: IndexMap::new(), relationships: Vec::new() }
	}

	pub fn register_resource(&mut self, name: &'static str, resource: Resource) -> &mut Self {
		self.members.insert(name, Member::Resource(resource));
		self
	}

	pub fn register_collection(&mut self, name: &'static str, collection: Collection) -> &mut Self {
		self.members.insert(name, Member::Collection(collection));
		self
	}

	pub fn register_database(&mut self, name: &'static str, database: Database) -> &mut Self {
		self.members.insert(name, Member::Database(database));
		self
	}

	pub fn add_relationship(&mut self, relationship: Relationship) -> &mut Self {
		self.relationships.push(relationship);
		self
	}

	pub fn member_names(&self) -> Vec<&'static str> {
		self.members.keys().copied().collect()
	}

	pub fn collection(&self, name: &str) -> Option<&Collection> {
		match self.members.get(name) {
			Some(Member::Collection(c)) => Some(c),
			_ => None,
		}
	}

	pub fn collection_mut(&mut self, name: &str) -> Option<&mut Collection> {
		match self.members.get_mut(name) {
			Some(Member::Collection(c)) => Some(c),
			_ => None,
		}
	}

	pub fn resource(&self, name: &str) -> Option<&Resource> {
		match self.members.get(name) {
			Some(Member::Resource(r)) => Some(r),
			_ => None,
		}
	}

	pub fn resource_mut(&mut self, name: &str) -> Option<&mut Resource> {
		match self.members.get_mut(name) {
			Some(Member::Resource(r)) => Some(r),
			_ => None,
		}
	}

	pub fn dispatch(&mut self, method: Method, path: &str, body: Option<&Json>, caller: Level) -> Result<RestResponse> {
		let trimmed = path.trim_matches('/');
		if trimmed.is_empty() {
			return match method {
				Method::Get => Ok(RestResponse::ok(Json::Array(
					self.members.keys().map(|k| Json::String(k.to_string())).collect(),
				))),
				_ => Err(Error::method_not_allowed("a database root only supports GET")),
			};
		}

		let (name, rest) = split_first(trimmed);
		if !self.members.contains_key(name) {
			return Err(Error::not_found(format!("no member named '{name}'")));
		}
		let rest_trimmed = rest.trim_matches('/');
		let is_collection = matches!(self.members.get(name), Some(Member::Collection(_)));

		if is_collection && method == Method::Post && rest_trimmed.is_empty() {
			let body = body.ok_or_else(|| Error::schema(name, "POST requires a body"))?;
			self.enforce_reference_for_create(name, body)?;
			let Some(Member::Collection(collection)) = self.members.get_mut(name) else {
				unreachable!("checked above")
			};
			return collection.rest_post(body, caller);
		}

		if is_collection && matches!(method, Method::Patch | Method::Put) {
			let body = body.ok_or_else(|| Error::schema(name, "PATCH/PUT requires a body"))?;
			self.enforce_reference_for_update(name, rest_trimmed, body)?;
		}

		if is_collection && method == Method::Delete && !rest_trimmed.is_empty() && !rest_trimmed.contains('/') {
			let id: u64 =
				rest_trimmed.parse().map_err(|_| Error::not_found("expected a numeric id"))?;
			let response = {
				let Some(Member::Collection(collection)) = self.members.get_mut(name) else {
					unreachable!("checked above")
				};
				collection.rest_delete(rest, caller)?
			};
			self.cascade_after_delete(name, id)?;
			return Ok(response);
		}

		match self.members.get_mut(name).expect("checked above") {
			Member::Resource(resource) => dispatch_resource(resource, method, rest, body, caller),
			Member::Collection(collection) => dispatch_collection(collection, method, rest, body, caller),
			Member::Database(database) => database.dispatch(method, rest, body, caller),
		}
	}

	/// Candidate completions of `prefix` against this database's member
	/// tree, used for the CLI's tab-completion (spec.md's `SearchForPath`
	/// supplement). A bare member-name prefix completes against
	/// registered member names; anything past the first `/` is delegated
	/// to that member.
	pub fn search_paths(&self, prefix: &str, caller: Level, max_paths: usize) -> Vec<String> {
		let trimmed = prefix.trim_start_matches('/');
		match trimmed.split_once('/') {
			Some((name, rest)) => match self.members.get(name) {
				Some(Member::Collection(c)) => c.search_paths(rest, caller, max_paths),
				Some(Member::Database(db)) => db.search_paths(rest, caller, max_paths),
				Some(Member::Resource(r)) => r
					.handle()
					.with(|cell| vellum_rest::search_paths(cell, rest, caller, max_paths)),
				None => Vec::new(),
			},
			None => self
				.members
				.keys()
				.filter(|name| name.starts_with(trimmed))
				.take(max_paths)
				.map(|name| name.to_string())
				.collect(),
		}
	}

	fn enforce_reference_for_create(&self, collection_name: &str, body: &Json) -> Result<()> {
		for relationship in &self.relationships {
			let Relationship::EnforceReference(rule) = relationship else { continue };
			if rule.referencing != collection_name {
				continue;
			}
			let Some(ref_id) = body.get(rule.reference_field).and_then(Json::as_u64) else { continue };
			self.check_reference_exists(rule, ref_id)?;
		}
		Ok(())
	}

	/// Same check as [`Self::enforce_reference_for_create`], run on
	/// PATCH/PUT of an existing collection item. `rest_path` is whatever
	/// remains of the dispatch path after the id (empty for a whole-object
	/// PATCH/PUT, or a field path for a field-scoped PATCH) — only a body
	/// that actually names `reference_field`, either as an object key or as
	/// the directly-addressed field, triggers the check.
	fn enforce_reference_for_update(&self, collection_name: &str, rest_path: &str, body: &Json) -> Result<()> {
		let trimmed = rest_path.trim_matches('/');
		let (_id_part, field_path) = trimmed.split_once('/').unwrap_or((trimmed, ""));
		for relationship in &self.relationships {
			let Relationship::EnforceReference(rule) = relationship else { continue };
			if rule.referencing != collection_name {
				continue;
			}
			let ref_id = if field_path.is_empty() {
				body.get(rule.reference_field).and_then(Json::as_u64)
			} else if field_path == rule.reference_field {
				body.as_u64()
			} else {
				None
			};
			let Some(ref_id) = ref_id else { continue };
			self.check_reference_exists(rule, ref_id)?;
		}
		Ok(())
	}

	fn check_reference_exists(&self, rule: &crate::relationships::EnforceReference, ref_id: u64) -> Result<()> {
		let exists = matches!(
			self.members.get(rule.referenced),
			Some(Member::Collection(c)) if c.contains_id(ref_id)
		);
		if !exists {
			return Err(Error::validation(format!(
				"{}: no {} with id {ref_id}",
				rule.reference_field, rule.referenced
			)));
		}
		Ok(())
	}

	fn cascade_after_delete(&mut self, collection_name: &str, id: u64) -> Result<()> {
		let together: Vec<&'static str> = self
			.relationships
			.iter()
			.filter_map(|r| match r {
				Relationship::DeleteTogether(dt) if dt.a == collection_name => Some(dt.b),
				Relationship::DeleteTogether(dt) if dt.b == collection_name => Some(dt.a),
				_ => None,
			})
			.collect();
		for other in together {
			if let Some(Member::Collection(c)) = self.members.get_mut(other) {
				let _ = c.delete_whole_item(id);
			}
		}

		let cascades: Vec<(&'static str, &'static str, bool)> = self
			.relationships
			.iter()
			.filter_map(|r| match r {
				Relationship::CascadeDelete(cd) if cd.owner == collection_name => {
					Some((cd.dependent, cd.reference_field, cd.required))
				}
				_ => None,
			})
			.collect();

		for (dependent, reference_field, required) in cascades {
			if !required {
				if let Some(Member::Collection(c)) = self.members.get_mut(dependent) {
					c.clear_field_where(reference_field, id);
				}
				continue;
			}
			let dependent_ids: Vec<u64> = match self.members.get(dependent) {
				Some(Member::Collection(c)) => c.ids_where_field_equals(reference_field, id),
				_ => Vec::new(),
			};
			for dep_id in dependent_ids {
				if let Some(Member::Collection(c)) = self.members.get_mut(dependent) {
					let _ = c.delete_whole_item(dep_id);
				}
				self.cascade_after_delete(dependent, dep_id)?;
			}
		}
		Ok(())
	}
}

fn dispatch_resource(
	resource: &mut Resource,
	method: Method,
	path: &str,
	body: Option<&Json>,
	caller: Level,
) -> Result<RestResponse> {
	match method {
		Method::Get => resource.rest_get(path, caller),
		Method::Patch => resource.rest_patch(path, body.ok_or_else(|| Error::schema(path, "PATCH requires a body"))?, caller),
		Method::Put => resource.rest_put(path, body.ok_or_else(|| Error::schema(path, "PUT requires a body"))?, caller),
		Method::Post => resource.rest_post(path, body.ok_or_else(|| Error::schema(path, "POST requires a body"))?, caller),
		Method::Delete => resource.rest_delete(path, caller),
	}
}

fn dispatch_collection(
	collection: &mut Collection,
	method: Method,
	path: &str,
	body: Option<&Json>,
	caller: Level,
) -> Result<RestResponse> {
	match method {
		Method::Get => collection.rest_get(path, caller),
		Method::Patch => collection.rest_patch(path, body.ok_or_else(|| Error::schema(path, "PATCH requires a body"))?, caller),
		Method::Put => collection.rest_put(path, body.ok_or_else(|| Error::schema(path, "PUT requires a body"))?, caller),
		Method::Delete => collection.rest_delete(path, caller),
		Method::Post => Err(Error::method_not_allowed("POST only creates at the collection root")),
	}
}

fn split_first(path: &str) -> (&str, &str) {
	path.split_once('/').unwrap_or((path, ""))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::id::SequentialIds;
	use serde_json::json;
	use vellum_core::{FieldDescriptor, FieldDetails, FieldKind, Permissions, TypeDescriptor};

	static OWNER_ID: FieldDescriptor = FieldDescriptor {
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
	static OWNER_TYPE: TypeDescriptor = TypeDescriptor { name: "Owner", fields: &[OWNER_ID] };

	static ITEM_ID: FieldDescriptor = FieldDescriptor { label: "id", ..OWNER_ID };
	static ITEM_OWNER_ID: FieldDescriptor = FieldDescriptor { label: "owner_id", index: 1, ..OWNER_ID };
	static ITEM_TYPE: TypeDescriptor = TypeDescriptor { name: "Item", fields: &[ITEM_ID, ITEM_OWNER_ID] };

	fn collection(type_desc: &'static TypeDescriptor) -> Collection {
		Collection::new(type_desc, 0, std::sync::Arc::new(SequentialIds::default()))
	}

	fn sample_db() -> Database {
		let mut db = Database::new();
		db.register_collection("owners", collection(&OWNER_TYPE));
		db.register_collection("items", collection(&ITEM_TYPE));
		db.add_relationship(Relationship::CascadeDelete(CascadeDelete {
			owner: "owners",
			dependent: "items",
			reference_field: "owner_id",
			required: true,
		}));
		db.add_relationship(Relationship::EnforceReference(EnforceReference {
			referencing: "items",
			reference_field: "owner_id",
			referenced: "owners",
		}));
		db
	}

	#[test]
	fn get_on_root_lists_member_names() {
		let mut db = sample_db();
		let response = db.dispatch(Method::Get, "/", None, Level::Root).unwrap();
		assert_eq!(response.body, Some(json!(["owners", "items"])));
	}

	#[test]
	fn unknown_member_is_not_found() {
		let mut db = sample_db();
		let err = db.dispatch(Method::Get, "/nope", None, Level::Root).unwrap_err();
		assert_eq!(err.kind, vellum_core::ErrorKind::Navigation);
	}

	#[test]
	fn deleting_owner_cascades_to_dependent_items() {
		let mut db = sample_db();
		db.dispatch(Method::Post, "/owners", Some(&json!({"id": 1})), Level::Root).unwrap();
		db.dispatch(Method::Post, "/owners", Some(&json!({"id": 2})), Level::Root).unwrap();
		db.dispatch(Method::Post, "/items", Some(&json!({"id": 10, "owner_id": 1})), Level::Root).unwrap();
		db.dispatch(Method::Post, "/items", Some(&json!({"id": 11, "owner_id": 2})), Level::Root).unwrap();

		db.dispatch(Method::Delete, "/owners/1", None, Level::Root).unwrap();

		let items = db.collection("items").unwrap();
		assert!(!items.contains_id(10));
		assert!(items.contains_id(11));
	}

	#[test]
	fn non_required_cascade_clears_reference_field_instead_of_deleting() {
		let mut db = Database::new();
		db.register_collection("owners", collection(&OWNER_TYPE));
		db.register_collection("items", collection(&ITEM_TYPE));
		db.add_relationship(Relationship::CascadeDelete(CascadeDelete {
			owner: "owners",
			dependent: "items",
			reference_field: "owner_id",
			required: false,
		}));
		db.dispatch(Method::Post, "/owners", Some(&json!({"id": 1})), Level::Root).unwrap();
		db.dispatch(Method::Post, "/items", Some(&json!({"id": 100, "owner_id": 1})), Level::Root).unwrap();

		db.dispatch(Method::Delete, "/owners/1", None, Level::Root).unwrap();

		let items = db.collection("items").unwrap();
		assert!(items.contains_id(100), "dependent item should survive a non-required cascade");
		assert!(!items.get(100).unwrap().has(ITEM_OWNER_ID.index), "reference field should be cleared");
	}

	#[test]
	fn enforce_reference_rejects_dangling_owner_id_on_patch() {
		let mut db = sample_db();
		db.dispatch(Method::Post, "/owners", Some(&json!({"id": 1})), Level::Root).unwrap();
		db.dispatch(Method::Post, "/items", Some(&json!({"id": 10, "owner_id": 1})), Level::Root).unwrap();

		let err = db
			.dispatch(Method::Patch, "/items/10", Some(&json!({"owner_id": 101})), Level::Root)
			.unwrap_err();
		assert_eq!(err.kind, vellum_core::ErrorKind::Validation);
		assert_eq!(db.collection("items").unwrap().get(10).unwrap().get(ITEM_OWNER_ID.index).as_u64(), Some(1));
	}

	#[test]
	fn delete_together_removes_matching_id_in_partner_collection() {
		let mut db = Database::new();
		db.register_collection("owners", collection(&OWNER_TYPE));
		db.register_collection("shadows", collection(&OWNER_TYPE));
		db.add_relationship(Relationship::DeleteTogether(DeleteTogether { a: "owners", b: "shadows" }));

		db.dispatch(Method::Post, "/owners", Some(&json!({"id": 5})), Level::Root).unwrap();
		db.dispatch(Method::Post, "/shadows", Some(&json!({"id": 5})), Level::Root).unwrap();

		db.dispatch(Method::Delete, "/owners/5", None, Level::Root).unwrap();

		assert!(!db.collection("shadows").unwrap().contains_id(5));
	}

	#[test]
	fn enforce_reference_rejects_dangling_owner_id() {
		let mut db = sample_db();
		let err = db
			.dispatch(Method::Post, "/items", Some(&json!({"id": 1, "owner_id": 99})), Level::Root)
			.unwrap_err();
		assert_eq!(err.kind, vellum_core::ErrorKind::Validation);
	}

	#[test]
	fn nested_patch_reaches_a_collection_item() {
		let mut db = sample_db();
		db.dispatch(Method::Post, "/owners", Some(&json!({"id": 1})), Level::Root).unwrap();
		db.dispatch(Method::Post, "/items", Some(&json!({"id": 10, "owner_id": 1})), Level::Root).unwrap();

		let response = db.dispatch(Method::Patch, "/items/10/owner_id", Some(&json!(1)), Level::Root).unwrap();
		assert_eq!(response.body, Some(json!(1)));
	}
}
