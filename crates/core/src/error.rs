// Copyright (c) 2025 Vellum contributors
// This file is licensed under the Apache-2.0 license

use std::fmt;

/// HTTP-shaped result codes the REST facade translates internal errors into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestCode {
	Ok200,
	Created201,
	NoContent204,
	BadRequest400,
	Unauthorized401,
	Forbidden403,
	NotFound404,
	MethodNotAllowed405,
	Conflict409,
	InternalError500,
}

impl RestCode {
	pub fn as_u16(self) -> u16 {
		match self {
			RestCode::Ok200 => 200,
			RestCode::Created201 => 201,
			RestCode::NoContent204 => 204,
			RestCode::BadRequest400 => 400,
			RestCode::Unauthorized401 => 401,
			RestCode::Forbidden403 => 403,
			RestCode::NotFound404 => 404,
			RestCode::MethodNotAllowed405 => 405,
			RestCode::Conflict409 => 409,
			RestCode::InternalError500 => 500,
		}
	}
}

/// Classifies *why* an operation failed; every kind maps to exactly one
/// [`RestCode`] by default (see [`Error::kind_code`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	Schema,
	Navigation,
	Permission,
	Unauthenticated,
	Method,
	Conflict,
	Validation,
	Io,
	Invariant,
}

/// The single error type threaded through the workspace. Every fallible
/// operation returns `Result<T, Error>`; there is no panicking path for
/// user-facing mistakes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
	pub kind: ErrorKind,
	pub code: RestCode,
	pub detail: String,
}

impl Error {
	pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
		let code = Self::kind_code(kind);
		Self { kind, code, detail: detail.into() }
	}

	fn kind_code(kind: ErrorKind) -> RestCode {
		match kind {
			ErrorKind::Schema => RestCode::BadRequest400,
			ErrorKind::Navigation => RestCode::NotFound404,
			ErrorKind::Permission => RestCode::Forbidden403,
			ErrorKind::Unauthenticated => RestCode::Unauthorized401,
			ErrorKind::Method => RestCode::MethodNotAllowed405,
			ErrorKind::Conflict => RestCode::Conflict409,
			ErrorKind::Validation => RestCode::BadRequest400,
			ErrorKind::Io => RestCode::InternalError500,
			ErrorKind::Invariant => RestCode::InternalError500,
		}
	}

	pub fn schema(field: &str, detail: impl fmt::Display) -> Self {
		Self::new(ErrorKind::Schema, format!("{field}: {detail}"))
	}

	pub fn not_found(detail: impl Into<String>) -> Self {
		Self::new(ErrorKind::Navigation, detail)
	}

	pub fn forbidden(detail: impl Into<String>) -> Self {
		Self::new(ErrorKind::Permission, detail)
	}

	pub fn unauthorized(detail: impl Into<String>) -> Self {
		Self::new(ErrorKind::Unauthenticated, detail)
	}

	pub fn method_not_allowed(detail: impl Into<String>) -> Self {
		Self::new(ErrorKind::Method, detail)
	}

	pub fn conflict(detail: impl Into<String>) -> Self {
		Self::new(ErrorKind::Conflict, detail)
	}

	pub fn validation(detail: impl Into<String>) -> Self {
		Self::new(ErrorKind::Validation, detail)
	}

	/// Programmer-error path: only ever raised for invariants that "must
	/// never occur in a well-formed program" (spec.md §7). Debug builds
	/// panic so the bug surfaces immediately; release builds degrade to a
	/// normal `Error` so the host process never aborts on a malformed but
	/// locally-recoverable call.
	pub fn invariant(detail: impl Into<String>) -> Self {
		let detail = detail.into();
		debug_assert!(false, "vellum invariant violated: {detail}");
		Self::new(ErrorKind::Invariant, detail)
	}
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} ({:?})", self.detail, self.code)
	}
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
