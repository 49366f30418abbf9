// Copyright (c) 2025 Vellum contributors
// This file is licensed under the Apache-2.0 license

//! A shared, re-entrant-lockable handle to one root [`Cell`] — the Rust
//! counterpart of the C++ original's `shared_ptr<SharedRootData>` (spec.md
//! §4.8). `ReentrantMutex` rather than a plain `Mutex`: a validator or
//! subscriber callback invoked while the lock is held may legitimately call
//! back into the same resource (e.g. to read the committed value it was
//! just handed), and that must not deadlock.

use std::cell::RefCell;
use std::sync::Arc;

use parking_lot::ReentrantMutex;
use vellum_core::Cell;

#[derive(Clone)]
pub struct Handle {
	inner: Arc<ReentrantMutex<RefCell<Cell>>>,
}

impl Handle {
	pub fn new(cell: Cell) -> Self {
		Self { inner: Arc::new(ReentrantMutex::new(RefCell::new(cell))) }
	}

	pub fn with<R>(&self, f: impl FnOnce(&Cell) -> R) -> R {
		let guard = self.inner.lock();
		f(&guard.borrow())
	}

	pub fn with_mut<R>(&self, f: impl FnOnce(&mut Cell) -> R) -> R {
		let guard = self.inner.lock();
		f(&mut guard.borrow_mut())
	}

	pub fn snapshot(&self) -> Cell {
		self.with(|c| c.clone())
	}

	pub fn ref_count(&self) -> usize {
		Arc::strong_count(&self.inner)
	}

	pub(crate) fn inner(&self) -> Arc<ReentrantMutex<RefCell<Cell>>> {
		self.inner.clone()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
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
	static TYPE: TypeDescriptor = TypeDescriptor { name: "T", fields: &[ID] };

	#[test]
	fn ref_count_reflects_clones() {
		let handle = Handle::new(Cell::new(&TYPE));
		assert_eq!(handle.ref_count(), 1);
		let other = handle.clone();
		assert_eq!(handle.ref_count(), 2);
		drop(other);
		assert_eq!(handle.ref_count(), 1);
	}

	#[test]
	fn reentrant_lock_does_not_deadlock() {
		let handle = Handle::new(Cell::new(&TYPE));
		handle.with(|outer| {
			handle.with(|inner| {
				assert_eq!(outer.type_desc().name, inner.type_desc().name);
			});
		});
	}
}
