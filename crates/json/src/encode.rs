// Copyright (c) 2025 Vellum contributors
// This file is licensed under the Apache-2.0 license

use base64::Engine;
use serde_json::{Map, Value as Json};
use vellum_core::{Access, Cell, FieldDescriptor, FieldKind, Level, Value};

#[derive(Debug, Clone, Copy)]
pub struct EncodeOptions {
	pub caller: Level,
	/// Emit explicitly-cleared fields (`!touched && changed`) as JSON
	/// `null` rather than omitting them — used for change notifications,
	/// where the recipient needs to know a field disappeared, not just
	/// that the payload doesn't mention it (spec.md §4.5).
	pub include_nulls: bool,
	/// Extra, schema-less fields appended after the object's own —
	/// collections use this to add a `"_links"`-style affordance without
	/// the core encoder needing to know about collections at all.
	pub extra_fields: Option<fn(&Cell) -> Vec<(String, Json)>>,
}

impl Default for EncodeOptions {
	fn default() -> Self {
		Self { caller: Level::Root, include_nulls: false, extra_fields: None }
	}
}

pub fn encode(cell: &Cell, opts: &EncodeOptions) -> Json {
	let mut map = Map::new();
	for i in 0..cell.field_count() {
		let field = match cell.type_desc().field(i) {
			Some(f) => f,
			None => continue,
		};
		if !field.perms.allows(opts.caller, Access::Read) {
			continue;
		}
		if cell.has(i) {
			map.insert(field.label.to_string(), encode_field(cell, field, i, opts));
		} else if opts.include_nulls && cell.is_changed(i) {
			map.insert(field.label.to_string(), Json::Null);
		}
	}
	if let Some(extra) = opts.extra_fields {
		for (key, value) in extra(cell) {
			map.insert(key, value);
		}
	}
	Json::Object(map)
}

/// Encodes one field by index directly, for REST handlers that already
/// resolved a path down to a single field. Returns `None` if the index is
/// out of range or the caller lacks read access.
pub fn encode_field_by_index(cell: &Cell, field_index: usize, opts: &EncodeOptions) -> Option<Json> {
	let field = cell.type_desc().field(field_index)?;
	if !field.perms.allows(opts.caller, Access::Read) {
		return None;
	}
	Some(encode_field(cell, field, field_index, opts))
}

/// Encodes a whole array field (scalar or sub-object) by index.
pub fn encode_array(cell: &Cell, field_index: usize, opts: &EncodeOptions) -> Option<Json> {
	let field = cell.type_desc().field(field_index)?;
	if !field.perms.allows(opts.caller, Access::Read) {
		return None;
	}
	Some(if field.is_subresource() {
		encode_subresource(cell, field, field_index, opts)
	} else {
		encode_scalar_array(cell, field, field_index)
	})
}

/// Encodes a single element of a scalar array field by position.
pub fn encode_array_element(cell: &Cell, field_index: usize, position: usize, opts: &EncodeOptions) -> Option<Json> {
	let field = cell.type_desc().field(field_index)?;
	if !field.perms.allows(opts.caller, Access::Read) {
		return None;
	}
	let items = cell.get(field_index).as_array()?;
	Some(encode_scalar(items.get(position)?, field))
}

fn encode_field(cell: &Cell, field: &'static FieldDescriptor, index: usize, opts: &EncodeOptions) -> Json {
	if field.is_subresource() {
		return encode_subresource(cell, field, index, opts);
	}
	if field.kind == FieldKind::Bitmask && !field.is_array() {
		return encode_bitmask_scalar(cell, field, index);
	}
	if field.is_array() {
		return encode_scalar_array(cell, field, index);
	}
	encode_scalar(cell.get(index), field)
}

/// Encodes a scalar bitmask field as a named-bit object when the schema
/// declares bit names, matching the object form [`decode`] accepts; falls
/// back to a raw integer when the field has no named bits at all.
fn encode_bitmask_scalar(cell: &Cell, field: &'static FieldDescriptor, index: usize) -> Json {
	let bits = cell.get(index).as_bitmask().unwrap_or(0);
	match field.details.bitmask_bits() {
		Some(names) if !names.is_empty() => {
			let mut obj = Map::new();
			for b in names {
				obj.insert(b.name.to_string(), Json::Bool(bits & (1 << b.bit) != 0));
			}
			Json::Object(obj)
		}
		_ => Json::from(bits),
	}
}

fn encode_subresource(cell: &Cell, field: &'static FieldDescriptor, index: usize, opts: &EncodeOptions) -> Json {
	if field.is_array() {
		let items = cell.get(index).as_array().unwrap_or(&[]);
		let encoded = items.iter().filter_map(Value::as_object).map(|c| encode(c, opts)).collect();
		return Json::Array(encoded);
	}
	match cell.get(index).as_object() {
		Some(child) => encode(child, opts),
		None => Json::Object(Map::new()),
	}
}

fn encode_scalar_array(cell: &Cell, field: &'static FieldDescriptor, index: usize) -> Json {
	let items = cell.get(index).as_array().unwrap_or(&[]);
	Json::Array(items.iter().map(|v| encode_scalar(v, field)).collect())
}

fn encode_scalar(value: &Value, field: &'static FieldDescriptor) -> Json {
	match value {
		Value::Bool(b) => Json::Bool(*b),
		Value::Int(n) => Json::from(*n),
		Value::UInt(n) => Json::from(*n),
		Value::Float(n) => serde_json::Number::from_f64(*n).map(Json::Number).unwrap_or(Json::Null),
		Value::Str(s) => Json::String(s.clone()),
		Value::Bytes(b) => Json::String(base64::engine::general_purpose::STANDARD.encode(b)),
		Value::Enum(n) => field
			.details
			.enum_values()
			.and_then(|values| values.iter().find(|v| v.value == *n))
			.map(|v| Json::String(v.name.to_string()))
			.unwrap_or_else(|| Json::from(*n)),
		Value::Bitmask(bits) => match field.details.bitmask_bits() {
			Some(names) if !names.is_empty() => {
				let mut obj = Map::new();
				for b in names {
					obj.insert(b.name.to_string(), Json::Bool(bits & (1 << b.bit) != 0));
				}
				Json::Object(obj)
			}
			_ => Json::from(*bits),
		},
		Value::Object(_) | Value::Array(_) | Value::Unset => Json::Null,
	}
}
