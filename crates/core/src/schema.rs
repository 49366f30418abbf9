// Copyright (c) 2025 Vellum contributors
// This file is licensed under the Apache-2.0 license

//! Runtime type information (RTTI). A [`TypeDescriptor`] is the immutable,
//! schema-generated description of one message type: an ordered list of
//! [`FieldDescriptor`]s. Application code is expected to build these once
//! (typically `const`/`static`) and share them by reference; [`Cell`]s never
//! own a copy of their schema.
//!
//! [`Cell`]: crate::cell::Cell

use crate::perm::Permissions;

/// Field index 0 is reserved for `id` on every type that participates in a
/// collection (spec.md §3).
pub const ID_FIELD_INDEX: usize = 0;

/// Small fixed ceiling on fields per type; the field bitmask is sized for
/// `2 * MAX_FIELDS` bits (spec.md §4.1).
pub const MAX_FIELDS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
	Bool,
	I8,
	I16,
	I32,
	I64,
	U8,
	U16,
	U32,
	U64,
	F32,
	F64,
	String,
	Bytes,
	Enum,
	Bitmask,
	Object,
}

impl FieldKind {
	pub fn is_numeric(self) -> bool {
		!matches!(self, FieldKind::String | FieldKind::Bytes | FieldKind::Object)
	}
}

/// One named value of an enum field, e.g. `("Truth", 42)`.
#[derive(Debug, Clone, Copy)]
pub struct EnumValue {
	pub name: &'static str,
	pub value: i64,
}

/// One named bit of a bitmask field, e.g. `("READ", 0)`.
#[derive(Debug, Clone, Copy)]
pub struct BitmaskBit {
	pub name: &'static str,
	pub bit: u32,
}

/// Kind-specific payload of a field descriptor (spec.md's "details" union;
/// DESIGN NOTES: modelled as a sum type rather than a tagged C union).
#[derive(Debug, Clone, Copy)]
pub enum FieldDetails {
	None,
	SubType(&'static TypeDescriptor),
	Enum(&'static [EnumValue]),
	Bitmask(&'static [BitmaskBit]),
}

impl FieldDetails {
	pub fn sub_type(&self) -> Option<&'static TypeDescriptor> {
		match self {
			FieldDetails::SubType(t) => Some(t),
			_ => None,
		}
	}

	pub fn enum_values(&self) -> Option<&'static [EnumValue]> {
		match self {
			FieldDetails::Enum(v) => Some(v),
			_ => None,
		}
	}

	pub fn bitmask_bits(&self) -> Option<&'static [BitmaskBit]> {
		match self {
			FieldDetails::Bitmask(v) => Some(v),
			_ => None,
		}
	}
}

/// Describes one field of a [`TypeDescriptor`].
///
/// `array_capacity == 0` means a scalar field; `array_capacity > 0` means a
/// repeated field whose live element count is tracked separately from its
/// capacity (spec.md §3). Capacity is enforced as a soft maximum rather than
/// the C original's preallocated fixed-size buffer — growth uses `Vec`.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
	pub label: &'static str,
	pub description: &'static str,
	pub tag: u16,
	pub index: usize,
	pub kind: FieldKind,
	pub array_capacity: usize,
	pub persist: bool,
	pub always_notify: bool,
	pub is_action: bool,
	pub perms: Permissions,
	pub min: Option<f64>,
	pub max: Option<f64>,
	pub string_capacity: usize,
	pub bytes_capacity: usize,
	pub details: FieldDetails,
}

impl FieldDescriptor {
	pub fn is_array(&self) -> bool {
		self.array_capacity > 0
	}

	pub fn is_subresource(&self) -> bool {
		matches!(self.kind, FieldKind::Object)
	}

	pub fn is_string(&self) -> bool {
		matches!(self.kind, FieldKind::String)
	}
}

/// An immutable, schema-generated description of one message type.
#[derive(Debug, Clone, Copy)]
pub struct TypeDescriptor {
	pub name: &'static str,
	pub fields: &'static [FieldDescriptor],
}

impl TypeDescriptor {
	pub fn field_count(&self) -> usize {
		self.fields.len()
	}

	pub fn field(&self, index: usize) -> Option<&'static FieldDescriptor> {
		self.fields.get(index)
	}

	pub fn find_by_label(&self, label: &str) -> Option<&'static FieldDescriptor> {
		self.fields.iter().find(|f| f.label == label)
	}

	pub fn find_by_tag(&self, tag: u16) -> Option<&'static FieldDescriptor> {
		self.fields.iter().find(|f| f.tag == tag)
	}
}
