// Copyright (c) 2025 Vellum contributors
// This file is licensed under the Apache-2.0 license

//! Stable field-position iteration over a [`Cell`]'s schema (spec.md §4.3).
//! Positions are schema field indices, not touched/changed state — walking a
//! [`FieldIterator`] visits every declared field of the type in order,
//! regardless of whether the underlying cell currently has data there.

use crate::cell::Cell;
use crate::schema::FieldDescriptor;

pub struct FieldIterator<'a> {
	cell: &'a Cell,
	pos: usize,
}

impl<'a> FieldIterator<'a> {
	pub fn new(cell: &'a Cell) -> Self {
		Self { cell, pos: 0 }
	}

	pub fn reset(&mut self) {
		self.pos = 0;
	}

	pub fn goto_index(&mut self, index: usize) -> bool {
		if index < self.cell.field_count() {
			self.pos = index;
			true
		} else {
			false
		}
	}

	pub fn find_by_label(&mut self, label: &str) -> bool {
		match self.cell.type_desc().find_by_label(label) {
			Some(f) => self.goto_index(f.index),
			None => false,
		}
	}

	pub fn find_by_tag(&mut self, tag: u16) -> bool {
		match self.cell.type_desc().find_by_tag(tag) {
			Some(f) => self.goto_index(f.index),
			None => false,
		}
	}

	pub fn current(&self) -> Option<&'static FieldDescriptor> {
		self.cell.type_desc().field(self.pos)
	}

	pub fn index(&self) -> usize {
		self.pos
	}

	pub fn is_touched(&self) -> bool {
		self.cell.has(self.pos)
	}

	pub fn is_changed(&self) -> bool {
		self.cell.is_changed(self.pos)
	}

	pub fn is_array(&self) -> bool {
		self.current().map(|f| f.is_array()).unwrap_or(false)
	}

	pub fn is_subresource(&self) -> bool {
		self.current().map(|f| f.is_subresource()).unwrap_or(false)
	}

	pub fn is_string(&self) -> bool {
		self.current().map(|f| f.is_string()).unwrap_or(false)
	}

	/// Advances to the next declared field; `false` once past the end.
	pub fn next(&mut self) -> bool {
		if self.pos + 1 < self.cell.field_count() {
			self.pos += 1;
			true
		} else {
			false
		}
	}
}

impl<'a> Iterator for FieldIterator<'a> {
	type Item = &'static FieldDescriptor;

	fn next(&mut self) -> Option<Self::Item> {
		let field = self.cell.type_desc().field(self.pos)?;
		self.pos += 1;
		Some(field)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::perm::Permissions;
	use crate::schema::{FieldDetails, FieldKind, TypeDescriptor};

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

	static TYPE: TypeDescriptor = TypeDescriptor { name: "Test", fields: &[ID, NAME] };

	#[test]
	fn find_by_label_positions_iterator() {
		let cell = Cell::new(&TYPE);
		let mut it = FieldIterator::new(&cell);
		assert!(it.find_by_label("name"));
		assert_eq!(it.index(), 1);
		assert!(it.is_string());
		assert!(!it.find_by_label("nope"));
	}

	#[test]
	fn iterates_all_declared_fields() {
		let cell = Cell::new(&TYPE);
		let labels: Vec<_> = FieldIterator::new(&cell).map(|f| f.label).collect();
		assert_eq!(labels, vec!["id", "name"]);
	}
}
