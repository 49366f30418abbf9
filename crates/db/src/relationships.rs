// Copyright (c) 2025 Vellum contributors
// This file is licensed under the Apache-2.0 license

//! Cross-collection referential policies a [`crate::database::Database`]
//! enforces around create and whole-item delete (spec.md §4.13). These only
//! fire at collection-item lifecycle boundaries, not on arbitrary nested
//! field edits — a `PATCH` two levels into an item's sub-object doesn't
//! reshuffle siblings.

/// Deleting an item from `owner` affects every item in `dependent` whose
/// `reference_field` equals the deleted id. When `required` is set, each
/// matching dependent is deleted outright (recursively — a cascade can
/// trigger another cascade). When it isn't, the dependent survives and only
/// its `reference_field` is cleared, since the reference was optional in the
/// first place (spec.md §4.13).
pub struct CascadeDelete {
	pub owner: &'static str,
	pub dependent: &'static str,
	pub reference_field: &'static str,
	pub required: bool,
}

/// Deleting an item with a given id from either collection deletes the
/// item with the same id from the other. Symmetric, non-recursive.
pub struct DeleteTogether {
	pub a: &'static str,
	pub b: &'static str,
}

/// An item in `referencing` whose `reference_field` is set must name an id
/// that exists in `referenced` — enforced both on create and whenever
/// `reference_field` is updated afterward (spec.md §4.13's referential
/// integrity requirement; schema evolution and secondary indexes remain
/// out of scope, so this is a linear id lookup, not a foreign-key index).
pub struct EnforceReference {
	pub referencing: &'static str,
	pub reference_field: &'static str,
	pub referenced: &'static str,
}

pub enum Relationship {
	CascadeDelete(CascadeDelete),
	DeleteTogether(DeleteTogether),
	EnforceReference(EnforceReference),
}
