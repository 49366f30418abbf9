// Copyright (c) 2025 Vellum contributors
// This file is licensed under the Apache-2.0 license

//! Path tokenization, browsing, and the five RESTful verbs over a Vellum
//! object tree (spec.md §4.6, §4.7).

mod browser;
mod handlers;
mod path;
mod result;
mod search;

pub use browser::{browse, BrowseOutcome};
pub use handlers::{delete, get, patch, post, put};
pub use path::{tokenize, Token};
pub use result::RestResponse;
pub use search::search_paths;
