// Copyright (c) 2025 Vellum contributors
// This file is licensed under the Apache-2.0 license

//! Small demo binary wiring a [`vellum::Database`] together and exercising
//! it through a handful of REST-shaped calls. The "REST path engine" itself
//! is in-process only (no network listener) — Non-goal: cross-process
//! distribution — so this binary just demonstrates the tree a real
//! embedding application would build.

use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;
use vellum::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "vellum-server", about = "Demo host process for an embedded Vellum database")]
struct Args {
	/// Listen address placeholder — recorded but unused (no network listener in scope).
	#[arg(long, default_value = "127.0.0.1:4080")]
	listen: String,

	/// Caller level the demo requests run as.
	#[arg(long, default_value = "root")]
	caller: String,

	/// tracing-subscriber EnvFilter directive string.
	#[arg(long, default_value = "info")]
	log_filter: String,
}

fn parse_level(s: &str) -> Level {
	match s.to_ascii_lowercase().as_str() {
		"admin" => Level::Admin,
		"root" => Level::Root,
		_ => Level::Public,
	}
}

const FIELD_TEMPLATE: FieldDescriptor = FieldDescriptor {
	label: "",
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

fn main() {
	let args = Args::parse();
	tracing_subscriber::fmt().with_env_filter(EnvFilter::new(&args.log_filter)).init();
	let caller = parse_level(&args.caller);

	tracing::info!(listen = %args.listen, %caller, "starting vellum demo host");

	let mut db = Database::new();
	db.register_collection("users", demo_users_collection());

	let created = db
		.dispatch(Method::Post, "/users", Some(&json!({"id": 1, "name": "ada"})), caller)
		.expect("demo create");
	tracing::info!(body = ?created.body, "created user");

	let patched = db
		.dispatch(Method::Patch, "/users/1/name", Some(&json!("ada lovelace")), caller)
		.expect("demo patch");
	tracing::info!(body = ?patched.body, "patched user name");

	let fetched = db.dispatch(Method::Get, "/users/1", None, caller).expect("demo get");
	tracing::info!(body = ?fetched.body, "fetched user");
}

fn demo_users_collection() -> Collection {
	use std::sync::Arc;
	static USER_ID: FieldDescriptor = FieldDescriptor { label: "id", tag: 1, index: 0, ..FIELD_TEMPLATE };
	static USER_NAME: FieldDescriptor = FieldDescriptor {
		label: "name",
		tag: 2,
		index: 1,
		kind: FieldKind::String,
		string_capacity: 64,
		..FIELD_TEMPLATE
	};
	static USER_TYPE: TypeDescriptor = TypeDescriptor { name: "User", fields: &[USER_ID, USER_NAME] };
	Collection::new(&USER_TYPE, 0, Arc::new(SequentialIds::default()))
}
