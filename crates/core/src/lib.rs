// Copyright (c) 2025 Vellum contributors
// This file is licensed under the Apache-2.0 license

//! Schema, bitmask, and typed object-cell primitives for the Vellum object
//! database. This crate has no notion of REST, JSON, or storage — it is the
//! in-memory value model everything else builds on.

pub mod bitmask;
pub mod cell;
pub mod error;
pub mod iterator;
pub mod perm;
pub mod schema;
pub mod value;
pub mod visitor;

pub use bitmask::FieldMask;
pub use cell::{Cell, PathStep};
pub use error::{Error, ErrorKind, Result, RestCode};
pub use iterator::FieldIterator;
pub use perm::{Access, Level, Permissions};
pub use schema::{BitmaskBit, EnumValue, FieldDescriptor, FieldDetails, FieldKind, TypeDescriptor, ID_FIELD_INDEX, MAX_FIELDS};
pub use value::Value;
pub use visitor::{ArrayMode, Visitor};
