// Copyright (c) 2025 Vellum contributors
// This file is licensed under the Apache-2.0 license

//! A working clone of a [`Handle`]'s cell that commits back on drop unless
//! explicitly aborted. This default is intentionally surprising — dropping
//! a `Transaction` without calling [`Transaction::abort`] applies whatever
//! edits were made, mirroring the C++ original's destructor-commits
//! behavior (spec.md §9 design notes). Application code that wants
//! rollback-on-error must call `abort()` explicitly on every early return.

use vellum_core::Cell;

use crate::handle::Handle;

pub struct Transaction {
	source: Handle,
	candidate: Cell,
	aborted: bool,
}

impl Transaction {
	pub fn begin(handle: &Handle) -> Self {
		Self { source: handle.clone(), candidate: handle.snapshot(), aborted: false }
	}

	pub fn cell(&mut self) -> &mut Cell {
		&mut self.candidate
	}

	pub fn cell_ref(&self) -> &Cell {
		&self.candidate
	}

	/// Discards the working clone; the source handle is left untouched.
	pub fn abort(mut self) {
		self.aborted = true;
	}
}

impl Drop for Transaction {
	fn drop(&mut self) {
		if self.aborted {
			return;
		}
		// Changed bits were already captured for the publish step before
		// this runs; the stored cell itself must land with a clean slate
		// so an identical follow-up edit doesn't re-publish stale changes.
		self.source.with_mut(|cell| cell.overwrite(&self.candidate, true));
	}
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
	static TYPE: TypeDescriptor = TypeDescriptor { name: "T", fields: &[NAME] };

	#[test]
	fn dropping_without_abort_commits() {
		let handle = Handle::new(Cell::new(&TYPE));
		{
			let mut txn = Transaction::begin(&handle);
			txn.cell().set_string(0, "committed", 32);
		}
		assert_eq!(handle.with(|c| c.field_as_string(0)), "committed");
	}

	#[test]
	fn abort_discards_edits() {
		let handle = Handle::new(Cell::new(&TYPE));
		{
			let mut txn = Transaction::begin(&handle);
			txn.cell().set_string(0, "scratch", 32);
			txn.abort();
		}
		assert_eq!(handle.with(|c| c.field_as_string(0)), "");
	}
}
