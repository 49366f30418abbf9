// Copyright (c) 2025 Vellum contributors
// This file is licensed under the Apache-2.0 license

//! Tokenizes a `/`-separated REST path into browse tokens (spec.md §6).
//! Numeric segments are ambiguous until a browser decides whether the
//! current node is id-keyed (a collection) or position-keyed (an array) —
//! the tokenizer just hands back [`Token::Number`] and lets the browser
//! resolve it in context.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
	Label(&'a str),
	Number(u64),
	/// `*key=value` — linear search inside a sub-object array.
	Search { key: &'a str, value: &'a str },
}

pub fn tokenize(path: &str) -> Vec<Token<'_>> {
	path.split('/').filter(|s| !s.is_empty()).map(classify).collect()
}

fn classify(segment: &str) -> Token<'_> {
	if let Some(rest) = segment.strip_prefix('*') {
		if let Some((key, value)) = rest.split_once('=') {
			return Token::Search { key, value };
		}
	}
	if let Ok(n) = segment.parse::<u64>() {
		return Token::Number(n);
	}
	Token::Label(segment)
}
