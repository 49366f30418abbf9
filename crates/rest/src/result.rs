// Copyright (c) 2025 Vellum contributors
// This file is licensed under the Apache-2.0 license

use serde_json::Value as Json;
use vellum_core::RestCode;

/// The outcome of a REST verb handler, carrying an HTTP-shaped status code
/// independent of any actual HTTP transport (spec.md §4.7).
#[derive(Debug, Clone, PartialEq)]
pub struct RestResponse {
	pub code: RestCode,
	pub body: Option<Json>,
}

impl RestResponse {
	pub fn ok(body: Json) -> Self {
		Self { code: RestCode::Ok200, body: Some(body) }
	}

	pub fn created(body: Json) -> Self {
		Self { code: RestCode::Created201, body: Some(body) }
	}

	pub fn no_content() -> Self {
		Self { code: RestCode::NoContent204, body: None }
	}
}
