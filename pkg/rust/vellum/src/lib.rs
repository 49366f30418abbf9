// Copyright (c) 2025 Vellum contributors
// This file is licensed under the Apache-2.0 license

//! Embedding-facing facade over `vellum-core`, `vellum-json`, `vellum-rest`,
//! and `vellum-db`. An application that embeds Vellum depends on this crate
//! alone; `use vellum::prelude::*` pulls in the types needed to declare a
//! schema, build a [`Database`], and dispatch REST-style calls against it.

pub use vellum_core as core;
pub use vellum_db as db;
pub use vellum_json as json;
pub use vellum_rest as rest;

pub use vellum_db::{
	CascadeDelete, Collection, CollectionAccess, Database, DeleteTogether, EnforceReference, Handle,
	IdGenerator, Member, Method, NotifyQueue, Relationship, Resource, SequentialIds, Transaction,
};

pub mod prelude {
	pub use vellum_core::{
		Access, Cell, Error, ErrorKind, FieldDescriptor, FieldDetails, FieldKind, FieldMask, Level,
		Permissions, Result, TypeDescriptor, Value,
	};
	pub use vellum_db::{
		CascadeDelete, Collection, CollectionAccess, Database, DeleteTogether, EnforceReference, Handle,
		IdGenerator, Member, Method, NotifyQueue, Relationship, Resource, SequentialIds,
	};
	pub use vellum_rest::RestResponse;
}
