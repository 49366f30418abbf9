// Copyright (c) 2025 Vellum contributors
// This file is licensed under the Apache-2.0 license

use base64::Engine;
use serde_json::Value as Json;
use vellum_core::{Access, Cell, Error, FieldDescriptor, FieldKind, Level, Result, TypeDescriptor, Value};

/// What to do when the decoded JSON object names a field the schema doesn't
/// have. Schema evolution is out of scope (spec.md §1 Non-goals), so a
/// genuinely unknown label is most often a client typo or a stale schema;
/// `Skip` is the friendlier default for REST bodies, `Reject` is stricter for
/// trusted internal callers like snapshot restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownField {
	Skip,
	Reject,
}

#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
	pub caller: Level,
	pub unknown_field: UnknownField,
}

impl Default for DecodeOptions {
	fn default() -> Self {
		Self { caller: Level::Root, unknown_field: UnknownField::Skip }
	}
}

/// Decodes a JSON object into `cell`, applying delta semantics: a JSON
/// `null` clears the field, an omitted key leaves the field untouched, and
/// anything else sets it (spec.md §4.5).
pub fn decode(cell: &mut Cell, json: &Json, opts: &DecodeOptions) -> Result<()> {
	let map = json.as_object().ok_or_else(|| Error::schema("$", "expected a JSON object"))?;
	for (key, value) in map {
		let field = match cell.type_desc().find_by_label(key) {
			Some(f) => f,
			None => match opts.unknown_field {
				UnknownField::Skip => {
					tracing::warn!(field = %key, "skipping unknown field on decode");
					continue;
				}
				UnknownField::Reject => return Err(Error::schema(key, "unknown field")),
			},
		};

		if !field.perms.allows(opts.caller, Access::Write) {
			return Err(Error::forbidden(format!("{key}: caller lacks write permission")));
		}

		if value.is_null() {
			cell.clear_field(field.index);
			continue;
		}

		decode_field(cell, field, value, opts)?;
	}
	Ok(())
}

fn decode_field(cell: &mut Cell, field: &'static FieldDescriptor, value: &Json, opts: &DecodeOptions) -> Result<()> {
	if field.is_subresource() {
		return decode_subresource(cell, field, value, opts);
	}
	if field.kind == FieldKind::Bitmask && !field.is_array() {
		return decode_bitmask_scalar(cell, field, value);
	}
	if field.is_array() {
		return decode_scalar_array(cell, field, value);
	}
	if field.is_string() {
		let s = value.as_str().ok_or_else(|| Error::schema(field.label, "expected a string"))?;
		cell.set_string(field.index, s, field.string_capacity);
		return Ok(());
	}
	let v = scalar_from_json(field, value)?;
	cell.set_scalar(field.index, v);
	Ok(())
}

fn decode_subresource(
	cell: &mut Cell,
	field: &'static FieldDescriptor,
	value: &Json,
	opts: &DecodeOptions,
) -> Result<()> {
	let sub_type = field
		.details
		.sub_type()
		.ok_or_else(|| Error::invariant(format!("{} declares Object kind with no sub-type", field.label)))?;

	if field.is_array() {
		let items = value.as_array().ok_or_else(|| Error::schema(field.label, "expected an array"))?;
		let mut any_changed = false;
		for item in items {
			let id = item
				.get("id")
				.and_then(Json::as_u64)
				.ok_or_else(|| Error::schema(field.label, "array element missing integer id"))?;
			let changed = if cell.find_object_in_array(field.index, id).is_some() {
				let child = cell.find_object_in_array_mut(field.index, id).unwrap();
				decode(child, item, opts)?;
				child.is_any_changed()
			} else {
				let child = cell.add_object_to_array(field.index, sub_type, id)?;
				decode(child, item, opts)?;
				true
			};
			any_changed |= changed;
		}
		cell.note_touched(field.index, any_changed);
		return Ok(());
	}

	let changed = {
		let child = cell.object_field_mut(field.index);
		decode(child, value, opts)?;
		child.is_any_changed()
	};
	cell.note_touched(field.index, changed);
	Ok(())
}

fn decode_scalar_array(cell: &mut Cell, field: &'static FieldDescriptor, value: &Json) -> Result<()> {
	let items = value.as_array().ok_or_else(|| Error::schema(field.label, "expected an array"))?;
	cell.array_clear(field.index);
	for item in items {
		let v = scalar_from_json(field, item)?;
		cell.array_push(field.index, v);
	}
	Ok(())
}

/// Decodes a scalar (non-array) bitmask field, accepting any of the three
/// wire forms spec.md §4.5/§6 define: a raw integer mask, `{}` (a no-op —
/// named bits are set/cleared individually, so an empty object touches
/// nothing), or a named-bit object `{ "BitName": bool, ... }` applied one
/// bit at a time via [`Cell::set_bit`]/[`Cell::clear_bit`].
fn decode_bitmask_scalar(cell: &mut Cell, field: &'static FieldDescriptor, value: &Json) -> Result<()> {
	if let Some(n) = value.as_u64() {
		cell.set_scalar(field.index, Value::Bitmask(n as u32));
		return Ok(());
	}
	let obj = value
		.as_object()
		.ok_or_else(|| Error::schema(field.label, "expected an integer or a bit-name object"))?;
	for (name, flag) in obj {
		let set = flag.as_bool().ok_or_else(|| Error::schema(field.label, "bitmask bit value must be a bool"))?;
		if set {
			cell.set_bit(field.index, name)?;
		} else {
			cell.clear_bit(field.index, name)?;
		}
	}
	Ok(())
}

fn scalar_from_json(field: &'static FieldDescriptor, value: &Json) -> Result<Value> {
	match field.kind {
		FieldKind::Bool => {
			Ok(Value::Bool(value.as_bool().ok_or_else(|| Error::schema(field.label, "expected a bool"))?))
		}
		FieldKind::I8 | FieldKind::I16 | FieldKind::I32 | FieldKind::I64 => {
			let n = value.as_i64().ok_or_else(|| Error::schema(field.label, "expected an integer"))?;
			check_range(field, n as f64)?;
			Ok(Value::Int(n))
		}
		FieldKind::U8 | FieldKind::U16 | FieldKind::U32 | FieldKind::U64 => {
			let n = value.as_u64().ok_or_else(|| Error::schema(field.label, "expected a non-negative integer"))?;
			check_range(field, n as f64)?;
			Ok(Value::UInt(n))
		}
		FieldKind::F32 | FieldKind::F64 => {
			let n = value.as_f64().ok_or_else(|| Error::schema(field.label, "expected a number"))?;
			check_range(field, n)?;
			Ok(Value::Float(n))
		}
		FieldKind::Bytes => {
			let s = value.as_str().ok_or_else(|| Error::schema(field.label, "expected base64 text"))?;
			let bytes = base64::engine::general_purpose::STANDARD
				.decode(s)
				.map_err(|e| Error::schema(field.label, format!("invalid base64: {e}")))?;
			if field.bytes_capacity > 0 && bytes.len() > field.bytes_capacity {
				return Err(Error::schema(field.label, "bytes field exceeds capacity"));
			}
			Ok(Value::Bytes(bytes))
		}
		FieldKind::Enum => {
			let values = field.details.enum_values().unwrap_or(&[]);
			if let Some(name) = value.as_str() {
				return values
					.iter()
					.find(|v| v.name == name)
					.map(|v| Value::Enum(v.value))
					.ok_or_else(|| Error::schema(field.label, format!("unknown enum value '{name}'")));
			}
			if let Some(n) = value.as_i64() {
				return values
					.iter()
					.find(|v| v.value == n)
					.map(|v| Value::Enum(v.value))
					.ok_or_else(|| Error::schema(field.label, format!("unknown enum value {n}")));
			}
			Err(Error::schema(field.label, "expected an enum name or integer value"))
		}
		FieldKind::Bitmask => {
			let n = value.as_u64().ok_or_else(|| Error::schema(field.label, "expected an integer bitmask value"))?;
			Ok(Value::Bitmask(n as u32))
		}
		FieldKind::String | FieldKind::Object => {
			unreachable!("string/object fields have dedicated decode paths")
		}
	}
}

fn check_range(field: &'static FieldDescriptor, n: f64) -> Result<()> {
	if let Some(min) = field.min {
		if n < min {
			return Err(Error::validation(format!("{} below minimum {min}", field.label)));
		}
	}
	if let Some(max) = field.max {
		if n > max {
			return Err(Error::validation(format!("{} above maximum {max}", field.label)));
		}
	}
	Ok(())
}

/// Decodes a value directly into one field by index, bypassing the
/// object-level key lookup — used by REST handlers that already resolved a
/// path down to a single field (spec.md §4.7).
pub fn decode_field_by_index(cell: &mut Cell, field_index: usize, value: &Json, opts: &DecodeOptions) -> Result<()> {
	let field = cell
		.type_desc()
		.field(field_index)
		.ok_or_else(|| Error::invariant(format!("no field at index {field_index}")))?;
	if !field.perms.allows(opts.caller, Access::Write) {
		return Err(Error::forbidden(format!("{}: caller lacks write permission", field.label)));
	}
	if value.is_null() {
		cell.clear_field(field.index);
		return Ok(());
	}
	decode_field(cell, field, value, opts)
}

/// Sets one element of a scalar array field directly.
pub fn decode_array_element(cell: &mut Cell, field_index: usize, position: usize, value: &Json) -> Result<bool> {
	let field = cell
		.type_desc()
		.field(field_index)
		.ok_or_else(|| Error::invariant(format!("no field at index {field_index}")))?;
	let v = scalar_from_json(field, value)?;
	cell.array_set(field_index, position, v)
}

/// Decodes a freshly typed top-level cell from a JSON document, the
/// entrypoint REST POST/PUT handlers use (spec.md §4.7).
pub fn decode_new(type_desc: &'static TypeDescriptor, json: &Json, opts: &DecodeOptions) -> Result<Cell> {
	let mut cell = Cell::new(type_desc);
	decode(&mut cell, json, opts)?;
	Ok(cell)
}
