// Copyright (c) 2025 Vellum contributors
// This file is licensed under the Apache-2.0 license

//! JSON encode/decode for Vellum object cells, built on `serde_json::Value`
//! rather than a hand-rolled streaming parser — the embedded one-character-
//! lookahead design this crate is descended from exists to bound memory on a
//! microcontroller, a constraint that does not apply here.

mod decode;
mod encode;

pub use decode::{decode, decode_array_element, decode_field_by_index, decode_new, DecodeOptions, UnknownField};
pub use encode::{encode, encode_array, encode_array_element, encode_field_by_index, EncodeOptions};
