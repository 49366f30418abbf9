// Copyright (c) 2025 Vellum contributors
// This file is licensed under the Apache-2.0 license

//! A depth-first walk over a [`Cell`]'s touched fields, used by the JSON
//! codec and debug dump to avoid re-deriving traversal order in every
//! consumer (spec.md §4.4).

use crate::cell::Cell;
use crate::schema::FieldDescriptor;

/// How a sub-object array is walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayMode {
	/// Descend into every element (JSON encode/decode, debug info).
	VisitEach,
	/// Descend into only the first element — used by callers that only
	/// need one representative child, e.g. schema/shape introspection.
	VisitFirstOnly,
}

pub trait Visitor {
	/// Called on each touched field before descending. Returning `false`
	/// skips descent into a sub-object or sub-object array (the field is
	/// still considered "visited" for `leave_field` purposes).
	fn enter_field(&mut self, cell: &Cell, field: &'static FieldDescriptor) -> bool;

	fn leave_field(&mut self, _cell: &Cell, _field: &'static FieldDescriptor) {}

	fn array_mode(&self) -> ArrayMode {
		ArrayMode::VisitEach
	}
}

pub fn walk(cell: &Cell, visitor: &mut impl Visitor) {
	for i in 0..cell.field_count() {
		let field = match cell.type_desc().field(i) {
			Some(f) => f,
			None => continue,
		};
		if !cell.has(i) {
			continue;
		}
		let descend = visitor.enter_field(cell, field);
		if descend && field.is_subresource() {
			if field.is_array() {
				if let Some(arr) = cell.get(i).as_array() {
					match visitor.array_mode() {
						ArrayMode::VisitEach => {
							for v in arr {
								if let Some(child) = v.as_object() {
									walk(child, visitor);
								}
							}
						}
						ArrayMode::VisitFirstOnly => {
							if let Some(child) = arr.first().and_then(|v| v.as_object()) {
								walk(child, visitor);
							}
						}
					}
				}
			} else if let Some(child) = cell.get(i).as_object() {
				walk(child, visitor);
			}
		}
		visitor.leave_field(cell, field);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::perm::Permissions;
	use crate::schema::{FieldDetails, FieldKind, TypeDescriptor};

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

	static CHILD_NAME: FieldDescriptor = FieldDescriptor {
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

	static CHILD_TYPE: TypeDescriptor = TypeDescriptor { name: "Child", fields: &[ID, CHILD_NAME] };

	static CHILD_FIELD: FieldDescriptor = FieldDescriptor {
		label: "child",
		description: "",
		tag: 2,
		index: 1,
		kind: FieldKind::Object,
		array_capacity: 0,
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

	static PARENT_TYPE: TypeDescriptor = TypeDescriptor { name: "Parent", fields: &[ID, CHILD_FIELD] };

	struct Counter(usize);

	impl Visitor for Counter {
		fn enter_field(&mut self, _cell: &Cell, _field: &'static FieldDescriptor) -> bool {
			self.0 += 1;
			true
		}
	}

	#[test]
	fn descends_into_touched_sub_object() {
		let mut parent = Cell::new(&PARENT_TYPE);
		parent.assign_id(1);
		let child = parent.object_field_mut(1);
		child.assign_id(2);
		child.set_string(1, "hi", 32);

		let mut counter = Counter(0);
		walk(&parent, &mut counter);
		assert_eq!(counter.0, 4); // parent.id, parent.child, child.id, child.name
	}

	#[test]
	fn skips_untouched_fields() {
		let parent = Cell::new(&PARENT_TYPE);
		let mut counter = Counter(0);
		walk(&parent, &mut counter);
		assert_eq!(counter.0, 0);
	}
}
