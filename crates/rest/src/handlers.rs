// Copyright (c) 2025 Vellum contributors
// This file is licensed under the Apache-2.0 license

//! The five RESTful verbs over a browsed path (spec.md §4.7). These
//! operate on a single in-memory object tree; the collection/resource
//! concerns of id assignment, validation hooks, and change notification
//! live one layer up in `vellum-db` — this module only knows how to read,
//! replace, merge, and remove cells once a path has been resolved.

use serde_json::Value as Json;
use vellum_core::{Cell, Error, Level, PathStep, Result};
use vellum_json::{DecodeOptions, EncodeOptions};

use crate::browser::{browse, BrowseOutcome};
use crate::path::tokenize;
use crate::result::RestResponse;

fn split_last(steps: &[PathStep]) -> (&[PathStep], Option<PathStep>) {
	match steps.split_last() {
		Some((last, rest)) => (rest, Some(*last)),
		None => (steps, None),
	}
}

pub fn get(root: &Cell, path: &str, caller: Level) -> Result<RestResponse> {
	let tokens = tokenize(path);
	let outcome = browse(root, &tokens, caller)?;
	let opts = EncodeOptions { caller, ..Default::default() };
	let body = match outcome {
		BrowseOutcome::Object { steps } => {
			let cell = root.navigate(&steps).ok_or_else(|| Error::invariant("dangling browse steps"))?;
			vellum_json::encode(cell, &opts)
		}
		BrowseOutcome::Array { steps, field_index } => {
			let cell = root.navigate(&steps).ok_or_else(|| Error::invariant("dangling browse steps"))?;
			vellum_json::encode_array(cell, field_index, &opts)
				.ok_or_else(|| Error::forbidden("field not readable"))?
		}
		BrowseOutcome::Field { steps, field_index } => {
			let cell = root.navigate(&steps).ok_or_else(|| Error::invariant("dangling browse steps"))?;
			let is_action = cell.type_desc().field(field_index).map(|f| f.is_action).unwrap_or(false);
			if is_action || !cell.has(field_index) {
				return Err(Error::not_found("field has no value"));
			}
			vellum_json::encode_field_by_index(cell, field_index, &opts)
				.ok_or_else(|| Error::forbidden("field not readable"))?
		}
		BrowseOutcome::ArrayElement { steps, field_index, position } => {
			let cell = root.navigate(&steps).ok_or_else(|| Error::invariant("dangling browse steps"))?;
			vellum_json::encode_array_element(cell, field_index, position, &opts)
				.ok_or_else(|| Error::not_found("array index out of range"))?
		}
	};
	Ok(RestResponse::ok(body))
}

pub fn patch(root: &mut Cell, path: &str, body: &Json, caller: Level) -> Result<RestResponse> {
	let tokens = tokenize(path);
	let outcome = browse(root, &tokens, caller)?;
	let opts = DecodeOptions { caller, ..Default::default() };
	match outcome {
		BrowseOutcome::Object { steps } => {
			root.with_path_mut(&steps, |owner| vellum_json::decode(owner, body, &opts))
				.ok_or_else(|| Error::invariant("dangling browse steps"))??;
		}
		BrowseOutcome::Array { steps, field_index } | BrowseOutcome::Field { steps, field_index } => {
			root.with_path_mut(&steps, |owner| vellum_json::decode_field_by_index(owner, field_index, body, &opts))
				.ok_or_else(|| Error::invariant("dangling browse steps"))??;
		}
		BrowseOutcome::ArrayElement { steps, field_index, position } => {
			root.with_path_mut(&steps, |owner| vellum_json::decode_array_element(owner, field_index, position, body))
				.ok_or_else(|| Error::invariant("dangling browse steps"))??;
		}
	}
	get(root, path, caller)
}

pub fn put(root: &mut Cell, path: &str, body: &Json, caller: Level) -> Result<RestResponse> {
	let tokens = tokenize(path);
	let outcome = browse(root, &tokens, caller)?;
	let opts = DecodeOptions { caller, ..Default::default() };
	match outcome {
		BrowseOutcome::Object { steps } => {
			root.with_path_mut(&steps, |owner| {
				owner.reset_for_put();
				vellum_json::decode(owner, body, &opts)
			})
			.ok_or_else(|| Error::invariant("dangling browse steps"))??;
		}
		_ => return Err(Error::method_not_allowed("PUT only replaces a whole object")),
	}
	get(root, path, caller)
}

pub fn post(root: &mut Cell, path: &str, body: &Json, caller: Level) -> Result<RestResponse> {
	let tokens = tokenize(path);
	let outcome = browse(root, &tokens, caller)?;
	let opts = DecodeOptions { caller, ..Default::default() };
	match outcome {
		BrowseOutcome::Array { steps, field_index } => {
			let encode_opts = EncodeOptions { caller, ..Default::default() };
			let encoded = root
				.with_path_mut(&steps, |owner| -> Result<Json> {
					let field = owner
						.type_desc()
						.field(field_index)
						.ok_or_else(|| Error::invariant("unknown field index"))?;
					let sub_type = field
						.details
						.sub_type()
						.ok_or_else(|| Error::schema(field.label, "not a sub-object array"))?;
					let id = body
						.get("id")
						.and_then(Json::as_u64)
						.ok_or_else(|| Error::schema(field.label, "body must include an integer id"))?;
					let child = owner.add_object_to_array(field_index, sub_type, id)?;
					vellum_json::decode(child, body, &opts)?;
					Ok(vellum_json::encode(child, &encode_opts))
				})
				.ok_or_else(|| Error::invariant("dangling browse steps"))??;
			Ok(RestResponse::created(encoded))
		}
		BrowseOutcome::Field { steps, field_index } => {
			let cell = root.navigate(&steps).ok_or_else(|| Error::invariant("dangling browse steps"))?;
			let is_action = cell.type_desc().field(field_index).map(|f| f.is_action).unwrap_or(false);
			if !is_action {
				return Err(Error::method_not_allowed("POST only appends to an array or triggers an action field"));
			}
			root.with_path_mut(&steps, |owner| vellum_json::decode_field_by_index(owner, field_index, body, &opts))
				.ok_or_else(|| Error::invariant("dangling browse steps"))??;
			// Actions auto-clear their touched bit once invoked (spec.md §3): a
			// successful POST should not leave the field reading back as present.
			root.with_path_mut(&steps, |owner| owner.clear_touched_silent(field_index))
				.ok_or_else(|| Error::invariant("dangling browse steps"))?;
			Ok(RestResponse::no_content())
		}
		_ => Err(Error::method_not_allowed("POST only appends to an array or triggers an action field")),
	}
}

pub fn delete(root: &mut Cell, path: &str, caller: Level) -> Result<RestResponse> {
	let tokens = tokenize(path);
	let outcome = browse(root, &tokens, caller)?;
	match outcome {
		BrowseOutcome::Object { steps } => {
			let (parent_steps, last) = split_last(&steps);
			match last {
				Some(PathStep::ArrayById(field_index, id)) => {
					root.with_path_mut(parent_steps, |owner| owner.remove_object_from_array(field_index, id))
						.ok_or_else(|| Error::invariant("dangling browse steps"))??;
				}
				_ => return Err(Error::method_not_allowed("cannot DELETE a top-level object through a path")),
			}
		}
		BrowseOutcome::Array { steps, field_index } => {
			root.with_path_mut(&steps, |owner| {
				owner.array_clear(field_index);
			})
			.ok_or_else(|| Error::invariant("dangling browse steps"))?;
		}
		BrowseOutcome::Field { steps, field_index } => {
			root.with_path_mut(&steps, |owner| owner.clear_field(field_index))
				.ok_or_else(|| Error::invariant("dangling browse steps"))?;
		}
		BrowseOutcome::ArrayElement { steps, field_index, position } => {
			root.with_path_mut(&steps, |owner| owner.array_remove(field_index, position))
				.ok_or_else(|| Error::invariant("dangling browse steps"))??;
		}
	}
	Ok(RestResponse::no_content())
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use vellum_core::{FieldDescriptor, FieldDetails, FieldKind, Permissions, TypeDescriptor};

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
	static CHILD_TYPE: TypeDescriptor = TypeDescriptor { name: "Child", fields: &[ID, NAME] };
	static CHILDREN: FieldDescriptor = FieldDescriptor {
		label: "children",
		description: "",
		tag: 2,
		index: 2,
		kind: FieldKind::Object,
		array_capacity: 8,
		persist: true,
		always_notify: false,
		is_action: false,
		perms: Permissions::public(),
		min: None,
		max: None,
		string_capacity: 0,
		bytes_capacity: 0,
		details: FieldDetails::SubType(&CHILD_TYPE),
	};
	static ROOT_TYPE: TypeDescriptor = TypeDescriptor { name: "Root", fields: &[ID, NAME, CHILDREN] };

	static REBOOT: FieldDescriptor = FieldDescriptor {
		label: "reboot",
		description: "",
		tag: 3,
		index: 1,
		kind: FieldKind::Bool,
		array_capacity: 0,
		persist: true,
		always_notify: false,
		is_action: true,
		perms: Permissions::public(),
		min: None,
		max: None,
		string_capacity: 0,
		bytes_capacity: 0,
		details: FieldDetails::None,
	};
	static ACTION_TYPE: TypeDescriptor = TypeDescriptor { name: "Device", fields: &[ID, REBOOT] };

	#[test]
	fn action_field_is_not_readable() {
		let mut root = Cell::new(&ACTION_TYPE);
		post(&mut root, "/reboot", &json!(true), Level::Root).unwrap();
		let err = get(&root, "/reboot", Level::Root).unwrap_err();
		assert_eq!(err.kind, vellum_core::ErrorKind::Navigation);
	}

	#[test]
	fn action_field_auto_clears_touched_after_post() {
		let mut root = Cell::new(&ACTION_TYPE);
		let resp = post(&mut root, "/reboot", &json!(true), Level::Root).unwrap();
		assert_eq!(resp.code, vellum_core::RestCode::NoContent204);
		assert!(!root.has(REBOOT.index), "action field should not remain touched after invocation");
	}

	#[test]
	fn patch_a_scalar_field() {
		let mut root = Cell::new(&ROOT_TYPE);
		let resp = patch(&mut root, "/name", &json!("Ada"), Level::Root).unwrap();
		assert_eq!(resp.code, vellum_core::RestCode::Ok200);
		assert_eq!(root.field_as_string(1), "Ada");
	}

	#[test]
	fn post_appends_to_sub_object_array() {
		let mut root = Cell::new(&ROOT_TYPE);
		let resp = post(&mut root, "/children", &json!({"id": 1, "name": "Grace"}), Level::Root).unwrap();
		assert_eq!(resp.code, vellum_core::RestCode::Created201);
		assert!(root.find_object_in_array(2, 1).is_some());
	}

	#[test]
	fn delete_removes_array_element_by_id() {
		let mut root = Cell::new(&ROOT_TYPE);
		root.add_object_to_array(2, &CHILD_TYPE, 1).unwrap();
		let resp = delete(&mut root, "/children/1", Level::Root).unwrap();
		assert_eq!(resp.code, vellum_core::RestCode::NoContent204);
		assert!(root.find_object_in_array(2, 1).is_none());
	}

	#[test]
	fn put_replaces_whole_object() {
		let mut root = Cell::new(&ROOT_TYPE);
		root.set_string(1, "old", 32);
		root.take_changes();
		put(&mut root, "/", &json!({"name": "new"}), Level::Root).unwrap();
		assert_eq!(root.field_as_string(1), "new");
	}

	#[test]
	fn get_missing_field_is_not_found() {
		let root = Cell::new(&ROOT_TYPE);
		let err = get(&root, "/name", Level::Root).unwrap_err();
		assert_eq!(err.kind, vellum_core::ErrorKind::Navigation);
	}
}
