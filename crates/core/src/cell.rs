// Copyright (c) 2025 Vellum contributors
// This file is licensed under the Apache-2.0 license

//! The object cell: storage for one typed object (spec.md §3, §4.2).
//!
//! A [`Cell`] pairs a [`TypeDescriptor`] with a [`FieldMask`] and a `Vec` of
//! [`Value`] slots, one per field. Unlike the C original's flat byte buffer
//! addressed by computed offsets, field storage here is a plain `Vec`
//! indexed by field index — DESIGN NOTES calls for confining unsafety to the
//! generated-accessor layer, which in Rust means there simply isn't any:
//! every external access goes through these typed methods.

use std::cmp::Ordering;

use crate::bitmask::FieldMask;
use crate::error::{Error, Result};
use crate::schema::{FieldKind, ID_FIELD_INDEX, TypeDescriptor};
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct Cell {
	type_desc: &'static TypeDescriptor,
	mask: FieldMask,
	fields: Vec<Value>,
}

impl PartialEq for Cell {
	fn eq(&self, other: &Self) -> bool {
		self.compare(other) == Ordering::Equal
	}
}

impl Cell {
	pub fn new(type_desc: &'static TypeDescriptor) -> Self {
		Self { type_desc, mask: FieldMask::new(), fields: vec![Value::Unset; type_desc.field_count()] }
	}

	pub fn type_desc(&self) -> &'static TypeDescriptor {
		self.type_desc
	}

	pub fn field_count(&self) -> usize {
		self.type_desc.field_count()
	}

	pub fn mask(&self) -> &FieldMask {
		&self.mask
	}

	// ---- id / lifecycle -------------------------------------------------

	pub fn id(&self) -> Option<u64> {
		if self.mask.is_touched(ID_FIELD_INDEX) { self.fields[ID_FIELD_INDEX].as_u64() } else { None }
	}

	pub fn is_id_assigned(&self) -> bool {
		self.id().is_some()
	}

	pub fn assign_id(&mut self, id: u64) {
		self.fields[ID_FIELD_INDEX] = Value::UInt(id);
		self.mask.set_touched(ID_FIELD_INDEX);
		self.mask.set_changed(ID_FIELD_INDEX);
	}

	/// A collection member is "new" iff its id field is changed (spec.md §3).
	pub fn is_new(&self) -> bool {
		self.mask.is_changed(ID_FIELD_INDEX)
	}

	/// `!touched[id] && changed[id]` — spec.md §3's deleted predicate.
	/// For top-level resources (outside a collection) this is never
	/// observable through the normal API: Open Question resolution in
	/// DESIGN.md confirms the invariant holds vacuously there, since
	/// nothing ever clears a resource's id field.
	pub fn is_deleted(&self) -> bool {
		!self.mask.is_touched(ID_FIELD_INDEX) && self.mask.is_changed(ID_FIELD_INDEX)
	}

	pub fn mark_deleted(&mut self) {
		self.mask.clear_touched(ID_FIELD_INDEX);
		self.mask.set_changed(ID_FIELD_INDEX);
	}

	// ---- touched / changed queries ---------------------------------------

	pub fn has(&self, index: usize) -> bool {
		self.mask.is_touched(index)
	}

	pub fn is_changed(&self, index: usize) -> bool {
		self.mask.is_changed(index)
	}

	pub fn is_any_changed(&self) -> bool {
		self.mask.is_any_changed()
	}

	pub fn is_empty(&self) -> bool {
		!self.mask.is_any_touched()
	}

	/// Returns the set of changed field indices without clearing them.
	pub fn changes(&self) -> FieldMask {
		self.mask
	}

	/// Returns changes and clears the change flags, matching the C
	/// original's `GetChanges()` (spec.md §4.8).
	pub fn take_changes(&mut self) -> FieldMask {
		let m = self.mask;
		self.mask.clear_all_changed();
		m
	}

	// ---- raw field access --------------------------------------------------

	pub fn get(&self, index: usize) -> &Value {
		&self.fields[index]
	}

	pub fn get_mut_raw(&mut self, index: usize) -> &mut Value {
		&mut self.fields[index]
	}

	/// Sets a scalar (non-array, non-string, non-bytes) field. Setting an
	/// already-touched field to the same value does not mark it changed
	/// (spec.md §4.2); setting a previously-untouched field always marks
	/// it changed since presence itself is new information.
	pub fn set_scalar(&mut self, index: usize, value: Value) -> bool {
		let was_touched = self.mask.is_touched(index);
		let same = was_touched && self.fields[index] == value;
		self.fields[index] = value;
		self.mask.set_touched(index);
		if !same {
			self.mask.set_changed(index);
		}
		!same
	}

	/// Sets a string field, truncating to the field's declared capacity.
	/// Truncation always marks the field changed, even if the truncated
	/// result matches the existing value, since the overflow condition
	/// itself is real new information (spec.md §4.2).
	pub fn set_string(&mut self, index: usize, value: &str, capacity: usize) -> (bool, bool) {
		let (stored, truncated) = if capacity > 0 && value.len() > capacity {
			(truncate_utf8(value, capacity), true)
		} else {
			(value.to_string(), false)
		};
		let was_touched = self.mask.is_touched(index);
		let same = was_touched && matches!(&self.fields[index], Value::Str(s) if s == &stored);
		self.fields[index] = Value::Str(stored);
		self.mask.set_touched(index);
		let changed = truncated || !same;
		if changed {
			self.mask.set_changed(index);
		}
		(changed, truncated)
	}

	pub fn set_bytes(&mut self, index: usize, value: &[u8], capacity: usize) -> Result<bool> {
		if capacity > 0 && value.len() > capacity {
			return Err(Error::schema(
				self.type_desc.field(index).map(|f| f.label).unwrap_or("?"),
				format!("bytes field exceeds capacity of {capacity}"),
			));
		}
		Ok(self.set_scalar(index, Value::Bytes(value.to_vec())))
	}

	/// Clears a field. Marks it changed iff it was previously touched —
	/// clearing an already-absent field is not a state transition.
	pub fn clear_field(&mut self, index: usize) {
		if self.mask.is_touched(index) {
			self.mask.clear_touched(index);
			self.mask.set_changed(index);
			if index != ID_FIELD_INDEX {
				self.fields[index] = Value::Unset;
			}
		}
	}

	/// Clears `index`'s touched bit without marking it changed — used to
	/// auto-clear an action field's touched state right after it fires
	/// (spec.md §3/§9): the invocation itself shouldn't surface as a
	/// pending change the way a normal field edit would.
	pub fn clear_touched_silent(&mut self, index: usize) {
		self.mask.clear_touched(index);
	}

	/// Recursively clears all `changed` bits, including inside
	/// sub-objects and sub-object arrays (spec.md §4.2).
	pub fn clear_changes(&mut self) {
		self.mask.clear_all_changed();
		for field in self.fields.iter_mut() {
			clear_changes_in_value(field);
		}
	}

	/// Recursively clears all `touched` bits without marking anything
	/// changed — used after a commit snapshot, not as a user-visible
	/// edit (contrast with [`Cell::clear_field`]).
	pub fn clear_touches(&mut self) {
		self.mask.clear_all_touched();
		for field in self.fields.iter_mut() {
			clear_touches_in_value(field);
		}
	}

	pub fn clear_all(&mut self) {
		self.clear_touches();
		self.clear_changes();
	}

	/// PUT semantics prep: clears every touched field except `id`,
	/// marking anything that had data as changed, so a full body decode
	/// afterward fully defines state (spec.md §4.7).
	pub fn reset_for_put(&mut self) {
		for i in 0..self.field_count() {
			if i != ID_FIELD_INDEX {
				self.clear_field(i);
			}
		}
	}

	// ---- array access -------------------------------------------------------

	pub fn array_len(&self, index: usize) -> usize {
		self.fields[index].as_array().map(|a| a.len()).unwrap_or(0)
	}

	fn array_mut(&mut self, index: usize) -> &mut Vec<Value> {
		if !matches!(&self.fields[index], Value::Array(_)) {
			self.fields[index] = Value::Array(Vec::new());
		}
		self.fields[index].as_array_mut().unwrap()
	}

	pub fn array_push(&mut self, index: usize, value: Value) -> usize {
		let arr = self.array_mut(index);
		arr.push(value);
		let new_index = arr.len() - 1;
		self.mask.set_touched(index);
		self.mask.set_changed(index);
		new_index
	}

	pub fn array_insert(&mut self, index: usize, at: usize, value: Value) -> Result<()> {
		let arr = self.array_mut(index);
		if at > arr.len() {
			return Err(Error::not_found(format!("array index {at} out of range")));
		}
		arr.insert(at, value);
		self.mask.set_touched(index);
		self.mask.set_changed(index);
		Ok(())
	}

	pub fn array_set(&mut self, index: usize, at: usize, value: Value) -> Result<bool> {
		let arr = self.array_mut(index);
		let slot = arr
			.get_mut(at)
			.ok_or_else(|| Error::not_found(format!("array index {at} out of range")))?;
		let same = *slot == value;
		*slot = value;
		self.mask.set_touched(index);
		if !same {
			self.mask.set_changed(index);
		}
		Ok(!same)
	}

	pub fn array_remove(&mut self, index: usize, at: usize) -> Result<Value> {
		let arr = self.array_mut(index);
		if at >= arr.len() {
			return Err(Error::not_found(format!("array index {at} out of range")));
		}
		let removed = arr.remove(at);
		self.mask.set_touched(index);
		self.mask.set_changed(index);
		Ok(removed)
	}

	pub fn array_clear(&mut self, index: usize) {
		if self.array_len(index) > 0 {
			self.fields[index] = Value::Array(Vec::new());
			self.mask.set_touched(index);
			self.mask.set_changed(index);
		}
	}

	// ---- sub-object array access (by id) --------------------------------

	pub fn find_object_in_array(&self, index: usize, id: u64) -> Option<&Cell> {
		self.fields[index].as_array()?.iter().find_map(|v| {
			let c = v.as_object()?;
			if c.id() == Some(id) { Some(c) } else { None }
		})
	}

	pub fn find_object_in_array_mut(&mut self, index: usize, id: u64) -> Option<&mut Cell> {
		self.fields[index].as_array_mut()?.iter_mut().find_map(|v| {
			let c = v.as_object_mut()?;
			if c.id() == Some(id) { Some(c) } else { None }
		})
	}

	/// `*key=value` linear scan inside a sub-object array (spec.md §4.6).
	pub fn find_object_in_array_by_field<'a>(
		&'a self,
		index: usize,
		key: &str,
		value: &str,
	) -> Option<&'a Cell> {
		self.fields[index].as_array()?.iter().find_map(|v| {
			let c = v.as_object()?;
			let field = c.type_desc.find_by_label(key)?;
			if c.field_as_string(field.index) == value { Some(c) } else { None }
		})
	}

	pub fn find_object_in_array_by_field_mut<'a>(
		&'a mut self,
		index: usize,
		key: &str,
		value: &str,
	) -> Option<&'a mut Cell> {
		let arr = self.fields[index].as_array_mut()?;
		arr.iter_mut().find_map(|v| {
			let c = v.as_object_mut()?;
			let field = c.type_desc.find_by_label(key)?;
			if c.field_as_string(field.index) == value { Some(c) } else { None }
		})
	}

	/// Adds a new sub-object cell to the array field at `index`, assigning
	/// it `id`. Fails if an element with that id already exists.
	pub fn add_object_to_array(
		&mut self,
		index: usize,
		sub_type: &'static TypeDescriptor,
		id: u64,
	) -> Result<&mut Cell> {
		if self.find_object_in_array(index, id).is_some() {
			return Err(Error::conflict(format!("id {id} already exists")));
		}
		let mut child = Cell::new(sub_type);
		child.assign_id(id);
		let pos = {
			let arr = self.array_mut(index);
			arr.push(Value::Object(child));
			arr.len() - 1
		};
		self.mask.set_touched(index);
		self.mask.set_changed(index);
		Ok(self.fields[index].as_array_mut().unwrap()[pos].as_object_mut().unwrap())
	}

	pub fn remove_object_from_array(&mut self, index: usize, id: u64) -> Result<Cell> {
		let arr = self.array_mut(index);
		let pos = arr
			.iter()
			.position(|v| v.as_object().and_then(Cell::id) == Some(id))
			.ok_or_else(|| Error::not_found(format!("id {id} not found")))?;
		let removed = arr.remove(pos);
		self.mask.set_touched(index);
		self.mask.set_changed(index);
		Ok(match removed {
			Value::Object(c) => c,
			_ => unreachable!(),
		})
	}

	// ---- sub-object (scalar) access --------------------------------------

	pub fn object_field(&self, index: usize) -> Option<&Cell> {
		self.fields[index].as_object()
	}

	/// Marks `index` touched, and changed iff `changed` — used by callers
	/// (notably the JSON codec) that mutate a nested sub-object or array
	/// through a borrowed reference and must report the outcome back up
	/// once that borrow ends.
	pub fn note_touched(&mut self, index: usize, changed: bool) {
		self.mask.set_touched(index);
		if changed {
			self.mask.set_changed(index);
		}
	}

	pub fn object_field_mut(&mut self, index: usize) -> &mut Cell {
		if !matches!(&self.fields[index], Value::Object(_)) {
			let sub_type = self
				.type_desc
				.field(index)
				.and_then(|f| f.details.sub_type())
				.expect("object_field_mut called on non-object field");
			self.fields[index] = Value::Object(Cell::new(sub_type));
		}
		self.mask.set_touched(index);
		self.fields[index].as_object_mut().unwrap()
	}

	// ---- string helpers --------------------------------------------------

	pub fn field_as_string(&self, index: usize) -> String {
		match &self.fields[index] {
			Value::Bool(b) => b.to_string(),
			Value::Int(v) => v.to_string(),
			Value::UInt(v) => v.to_string(),
			Value::Float(v) => v.to_string(),
			Value::Str(s) => s.clone(),
			Value::Enum(v) => v.to_string(),
			Value::Bitmask(v) => v.to_string(),
			Value::Bytes(b) => format!("{b:?}"),
			_ => String::new(),
		}
	}

	/// Whether the named bit of a bitmask field is set. Supplements the raw
	/// `u32` `Value::Bitmask` representation with the original's by-name
	/// addressing (`jude`'s `BitMask.h`).
	pub fn is_bit_set(&self, index: usize, bit_name: &str) -> Result<bool> {
		let bit = self.resolve_bit(index, bit_name)?;
		let current = self.fields[index].as_bitmask().unwrap_or(0);
		Ok(current & (1 << bit) != 0)
	}

	/// Sets the named bit of a bitmask field, touching/changing the field
	/// the same way `set_scalar` would for the resulting value.
	pub fn set_bit(&mut self, index: usize, bit_name: &str) -> Result<bool> {
		let bit = self.resolve_bit(index, bit_name)?;
		let current = self.fields[index].as_bitmask().unwrap_or(0);
		Ok(self.set_scalar(index, Value::Bitmask(current | (1 << bit))))
	}

	/// Clears the named bit of a bitmask field.
	pub fn clear_bit(&mut self, index: usize, bit_name: &str) -> Result<bool> {
		let bit = self.resolve_bit(index, bit_name)?;
		let current = self.fields[index].as_bitmask().unwrap_or(0);
		Ok(self.set_scalar(index, Value::Bitmask(current & !(1 << bit))))
	}

	fn resolve_bit(&self, index: usize, bit_name: &str) -> Result<u32> {
		let field = self.type_desc.field(index).ok_or_else(|| Error::schema(bit_name, "no such field"))?;
		let bits = field.details.bitmask_bits().ok_or_else(|| Error::schema(field.label, "not a bitmask field"))?;
		bits.iter()
			.find(|b| b.name == bit_name)
			.map(|b| b.bit)
			.ok_or_else(|| Error::schema(bit_name, "unknown bitmask bit"))
	}

	// ---- deep semantic operations (spec.md §4.2) ------------------------

	/// An untouched field sorts below a touched one at the same index,
	/// independent of raw value; array length precedes element
	/// comparison; otherwise compares field-by-field in schema order.
	pub fn compare(&self, other: &Cell) -> Ordering {
		debug_assert_eq!(self.type_desc.name, other.type_desc.name);
		for i in 0..self.field_count() {
			let (at, bt) = (self.mask.is_touched(i), other.mask.is_touched(i));
			match (at, bt) {
				(false, false) => continue,
				(false, true) => return Ordering::Less,
				(true, false) => return Ordering::Greater,
				(true, true) => {
					let c = self.fields[i].compare(&other.fields[i]);
					if c != Ordering::Equal {
						return c;
					}
				}
			}
		}
		Ordering::Equal
	}

	/// Replaces this cell's entire contents with `src`'s: bits and data,
	/// bitwise, including a possible retype. No change detection runs and
	/// no subscriptions move (spec.md §4.2).
	pub fn overwrite(&mut self, src: &Cell, clear_changes: bool) {
		self.type_desc = src.type_desc;
		self.fields = src.fields.clone();
		self.mask = src.mask;
		if clear_changes {
			self.clear_changes();
		}
	}

	/// Recursively merges `src` into `self`. With `deltas_only`, fields
	/// whose `changed` bit is clear on `src` are skipped entirely; a
	/// field cleared on `src` (`!touched && changed`) clears and marks
	/// changed on `self` too. Returns whether anything changed.
	///
	/// Sub-object arrays are merged wholesale per touched source array
	/// rather than element-by-element — see DESIGN.md for why this is
	/// sufficient for the delta-merge law (spec.md §8 property 3).
	pub fn copy(&mut self, src: &Cell, deltas_only: bool) -> bool {
		let mut any_change = false;
		for i in 0..self.field_count() {
			if deltas_only && !src.mask.is_changed(i) {
				continue;
			}
			if !src.mask.is_touched(i) {
				if self.mask.is_touched(i) {
					self.clear_field(i);
					any_change = true;
				} else if src.mask.is_changed(i) {
					self.mask.set_changed(i);
					any_change = true;
				}
				continue;
			}
			let field = self.type_desc.field(i);
			if let (Some(field), FieldKind::Object) = (field, field.map(|f| f.kind).unwrap_or(FieldKind::Bool))
			{
				let _ = field;
				if let Some(src_child) = src.fields[i].as_object() {
					let changed_here = self.object_field_mut(i).copy(src_child, deltas_only);
					if changed_here {
						self.mask.set_changed(i);
						any_change = true;
					}
					continue;
				}
			}
			let changed = self.set_scalar(i, src.fields[i].clone());
			any_change |= changed;
		}
		any_change
	}

	pub fn debug_info(&self) -> String {
		let mut out = format!("{} {{", self.type_desc.name);
		for i in 0..self.field_count() {
			if !self.mask.is_touched(i) {
				continue;
			}
			let field = self.type_desc.field(i).unwrap();
			out.push_str(&format!(
				" {}={}{},",
				field.label,
				self.field_as_string(i),
				if self.mask.is_changed(i) { "*" } else { "" }
			));
		}
		out.push_str(" }");
		out
	}
}

/// One descent step toward a nested cell: either into a scalar sub-object
/// field, or into one element of a sub-object array, addressed either by id
/// (the stable REST identity) or by raw position (array index navigation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStep {
	Field(usize),
	ArrayById(usize, u64),
	ArrayByIndex(usize, usize),
}

impl Cell {
	pub fn navigate(&self, steps: &[PathStep]) -> Option<&Cell> {
		match steps.split_first() {
			None => Some(self),
			Some((step, rest)) => {
				let next = match *step {
					PathStep::Field(i) => self.fields[i].as_object()?,
					PathStep::ArrayById(i, id) => self.find_object_in_array(i, id)?,
					PathStep::ArrayByIndex(i, pos) => self.fields[i].as_array()?.get(pos)?.as_object()?,
				};
				next.navigate(rest)
			}
		}
	}

	pub fn navigate_mut(&mut self, steps: &[PathStep]) -> Option<&mut Cell> {
		match steps.split_first() {
			None => Some(self),
			Some((step, rest)) => {
				let next = match *step {
					PathStep::Field(i) => self.fields[i].as_object_mut()?,
					PathStep::ArrayById(i, id) => self.find_object_in_array_mut(i, id)?,
					PathStep::ArrayByIndex(i, pos) => {
						self.fields[i].as_array_mut()?.get_mut(pos)?.as_object_mut()?
					}
				};
				next.navigate_mut(rest)
			}
		}
	}

	/// Runs `f` on the cell reached by `steps`, then propagates its
	/// touched/changed outcome back up the chain by ORing the relevant
	/// field's bits into each ancestor in turn. This is the index-based
	/// substitute for an owned parent back-reference: no [`Cell`] ever
	/// points at its parent, so propagation has to be driven from the
	/// top on the way back out of the recursion (spec.md §9 design
	/// notes).
	pub fn with_path_mut<R>(&mut self, steps: &[PathStep], f: impl FnOnce(&mut Cell) -> R) -> Option<R> {
		match steps.split_first() {
			None => Some(f(self)),
			Some((step, rest)) => {
				let index = match *step {
					PathStep::Field(i) | PathStep::ArrayById(i, _) | PathStep::ArrayByIndex(i, _) => i,
				};
				let child = match *step {
					PathStep::Field(i) => self.fields[i].as_object_mut()?,
					PathStep::ArrayById(i, id) => self.find_object_in_array_mut(i, id)?,
					PathStep::ArrayByIndex(i, pos) => {
						self.fields[i].as_array_mut()?.get_mut(pos)?.as_object_mut()?
					}
				};
				let result = child.with_path_mut(rest, f);
				let child_changed = child.is_any_changed();
				self.note_touched(index, child_changed);
				result
			}
		}
	}
}

fn clear_changes_in_value(value: &mut Value) {
	match value {
		Value::Object(c) => c.clear_changes(),
		Value::Array(items) => {
			for item in items.iter_mut() {
				clear_changes_in_value(item);
			}
		}
		_ => {}
	}
}

fn clear_touches_in_value(value: &mut Value) {
	match value {
		Value::Object(c) => c.clear_touches(),
		Value::Array(items) => {
			for item in items.iter_mut() {
				clear_touches_in_value(item);
			}
		}
		_ => {}
	}
}

fn truncate_utf8(s: &str, max_bytes: usize) -> String {
	if s.len() <= max_bytes {
		return s.to_string();
	}
	let mut end = max_bytes;
	while end > 0 && !s.is_char_boundary(end) {
		end -= 1;
	}
	s[..end].to_string()
}
