// Copyright (c) 2025 Vellum contributors
// This file is licensed under the Apache-2.0 license

//! Path-completion for interactive callers (the CLI's tab-completion),
//! supplementing spec.md from the original's `SearchForPath`
//! (`RestApiInterface.h`): given a partial path, enumerate the field labels
//! that could complete it, gated the same way [`crate::browse`] gates reads.

use crate::path::{tokenize, Token};
use crate::browser::{browse, BrowseOutcome};
use vellum_core::{Access, Cell, Level};

/// Splits `prefix` into a settled, browsable path and a trailing partial
/// segment still being typed. `"/users/3/na"` settles at `/users/3` with
/// partial `"na"`; a trailing `/` means the partial segment is empty.
fn split_partial(prefix: &str) -> (&str, &str) {
	let trimmed = prefix.trim_start_matches('/');
	match trimmed.rsplit_once('/') {
		Some((settled, partial)) => (settled, partial),
		None => ("", trimmed),
	}
}

/// Candidate completions of `prefix` against `root`, bounded by `max_paths`.
/// Only field labels readable by `caller` are suggested.
pub fn search_paths(root: &Cell, prefix: &str, caller: Level, max_paths: usize) -> Vec<String> {
	let (settled, partial) = split_partial(prefix);
	let tokens = tokenize(settled);
	let Ok(outcome) = browse(root, &tokens, caller) else { return Vec::new() };

	let BrowseOutcome::Object { steps } = outcome else { return Vec::new() };
	let Some(cursor) = root.navigate(&steps) else { return Vec::new() };

	let mut matches = Vec::new();
	for field in cursor.type_desc().fields {
		if matches.len() >= max_paths {
			break;
		}
		if !field.label.starts_with(partial) {
			continue;
		}
		if !field.perms.allows(caller, Access::Read) {
			continue;
		}
		matches.push(field.label.to_string());
	}
	matches
}

#[cfg(test)]
mod tests {
	use super::*;
	use vellum_core::{FieldDescriptor, FieldDetails, FieldKind, Permissions, TypeDescriptor};

	static NAME: FieldDescriptor = FieldDescriptor {
		label: "name",
		description: "",
		tag: 0,
		index: 0,
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
	static NICKNAME: FieldDescriptor = FieldDescriptor { label: "nickname", index: 1, ..NAME };
	static TYPE: TypeDescriptor = TypeDescriptor { name: "Person", fields: &[NAME, NICKNAME] };

	#[test]
	fn completes_field_labels_sharing_a_prefix() {
		let root = Cell::new(&TYPE);
		let completions = search_paths(&root, "/ni", Level::Public, 10);
		assert_eq!(completions, vec!["nickname".to_string()]);
	}

	#[test]
	fn empty_partial_lists_every_readable_field() {
		let root = Cell::new(&TYPE);
		let completions = search_paths(&root, "/", Level::Public, 10);
		assert_eq!(completions, vec!["name".to_string(), "nickname".to_string()]);
	}
}
