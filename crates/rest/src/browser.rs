// Copyright (c) 2025 Vellum contributors
// This file is licensed under the Apache-2.0 license

//! Consumes a tokenized path one token at a time against an object tree,
//! gating each step on the field's declared read permission — the Rust
//! counterpart of `jude_browser_follow_path` (spec.md §4.6).
//!
//! Rather than holding borrowed references at every depth (which the
//! original's tagged-union browser state does with raw pointers), this
//! walk accumulates a [`PathStep`] trail and re-resolves it against the
//! root on demand via [`Cell::navigate`]. The caller gets the trail back
//! and decides how to act on the final node — read, replace, or descend
//! into it for a nested operation.

use crate::path::Token;
use vellum_core::{Access, Cell, Error, Level, PathStep, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseOutcome {
	/// The whole object at the end of `steps` (root if `steps` is empty).
	Object { steps: Vec<PathStep> },
	/// A whole array field, addressed but not indexed into.
	Array { steps: Vec<PathStep>, field_index: usize },
	/// One scalar field.
	Field { steps: Vec<PathStep>, field_index: usize },
	/// One element of a scalar array field.
	ArrayElement { steps: Vec<PathStep>, field_index: usize, position: usize },
}

pub fn browse(root: &Cell, tokens: &[Token<'_>], caller: Level) -> Result<BrowseOutcome> {
	let mut steps: Vec<PathStep> = Vec::new();
	let mut i = 0;
	loop {
		let cursor = root
			.navigate(&steps)
			.ok_or_else(|| Error::invariant("browse cursor fell off the object tree"))?;

		if i >= tokens.len() {
			return Ok(BrowseOutcome::Object { steps });
		}

		let label = match &tokens[i] {
			Token::Label(l) => *l,
			Token::Number(_) | Token::Search { .. } => {
				return Err(Error::not_found("expected a field name here"));
			}
		};
		let field = cursor
			.type_desc()
			.find_by_label(label)
			.ok_or_else(|| Error::not_found(format!("no field named '{label}'")))?;
		if !field.perms.allows(caller, Access::Read) {
			return Err(Error::forbidden(format!("{label}: read not permitted")));
		}
		i += 1;
		let last = i >= tokens.len();

		if field.is_array() {
			if last {
				return Ok(BrowseOutcome::Array { steps, field_index: field.index });
			}
			let selector = &tokens[i];
			i += 1;
			let selector_last = i >= tokens.len();

			if field.is_subresource() {
				let step = match selector {
					Token::Number(id) => PathStep::ArrayById(field.index, *id),
					Token::Search { key, value } => {
						let child = cursor
							.find_object_in_array_by_field(field.index, key, value)
							.ok_or_else(|| Error::not_found(format!("no element where {key}={value}")))?;
						let id = child.id().ok_or_else(|| Error::invariant("array element missing an id"))?;
						PathStep::ArrayById(field.index, id)
					}
					Token::Label(_) => return Err(Error::not_found("expected an id or a search token")),
				};
				steps.push(step);
				if selector_last {
					return Ok(BrowseOutcome::Object { steps });
				}
				continue;
			}

			let position = match selector {
				Token::Number(n) => *n as usize,
				_ => return Err(Error::not_found("expected an array index")),
			};
			if !selector_last {
				return Err(Error::not_found("cannot descend past a scalar array element"));
			}
			return Ok(BrowseOutcome::ArrayElement { steps, field_index: field.index, position });
		}

		if field.is_subresource() {
			steps.push(PathStep::Field(field.index));
			if last {
				return Ok(BrowseOutcome::Object { steps });
			}
			continue;
		}

		if !last {
			return Err(Error::not_found("cannot descend into a scalar field"));
		}
		return Ok(BrowseOutcome::Field { steps, field_index: field.index });
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::path::tokenize;
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
	static PARENT_TYPE: TypeDescriptor = TypeDescriptor { name: "Parent", fields: &[ID, NAME, CHILDREN] };

	#[test]
	fn browses_into_scalar_field() {
		let mut root = Cell::new(&PARENT_TYPE);
		root.set_string(1, "top", 32);
		let tokens = tokenize("/name");
		let outcome = browse(&root, &tokens, Level::Public).unwrap();
		assert_eq!(outcome, BrowseOutcome::Field { steps: vec![], field_index: 1 });
	}

	#[test]
	fn browses_into_array_element_by_id() {
		let mut root = Cell::new(&PARENT_TYPE);
		root.add_object_to_array(2, &CHILD_TYPE, 7).unwrap();
		let tokens = tokenize("/children/7");
		let outcome = browse(&root, &tokens, Level::Public).unwrap();
		assert_eq!(outcome, BrowseOutcome::Object { steps: vec![PathStep::ArrayById(2, 7)] });
	}

	#[test]
	fn browses_into_nested_field_of_array_element() {
		let mut root = Cell::new(&PARENT_TYPE);
		root.add_object_to_array(2, &CHILD_TYPE, 7).unwrap();
		let tokens = tokenize("/children/7/name");
		let outcome = browse(&root, &tokens, Level::Public).unwrap();
		assert_eq!(
			outcome,
			BrowseOutcome::Field { steps: vec![PathStep::ArrayById(2, 7)], field_index: 1 }
		);
	}

	#[test]
	fn unknown_field_is_not_found() {
		let root = Cell::new(&PARENT_TYPE);
		let tokens = tokenize("/nope");
		let err = browse(&root, &tokens, Level::Public).unwrap_err();
		assert_eq!(err.kind, vellum_core::ErrorKind::Navigation);
	}
}
