// Copyright (c) 2025 Vellum contributors
// This file is licensed under the Apache-2.0 license

//! A `rustyline` REPL issuing REST-style commands (`get`, `post`, `patch`,
//! `put`, `delete`, plus a `debug`/`search` introspection pair) against an
//! in-process [`vellum::Database`].

use clap::Parser;
use rustyline::{error::ReadlineError, DefaultEditor};
use serde_json::json;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vellum::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "vellum", about = "REPL for an in-process Vellum database")]
struct Args {
	/// Caller level commands in this session run as.
	#[arg(long, default_value = "root")]
	caller: String,

	/// tracing-subscriber EnvFilter directive string.
	#[arg(long, default_value = "warn")]
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

fn demo_database() -> Database {
	let mut db = Database::new();
	db.register_collection("users", Collection::new(&USER_TYPE, 0, Arc::new(SequentialIds::default())));
	db
}

fn main() {
	let args = Args::parse();
	tracing_subscriber::fmt().with_env_filter(EnvFilter::new(&args.log_filter)).init();
	let caller = parse_level(&args.caller);

	let mut db = demo_database();
	let mut rl = DefaultEditor::new().expect("failed to initialize readline");

	println!("vellum REPL — caller level {caller}. Type .help for commands, .quit to exit.");

	loop {
		match rl.readline("vellum> ") {
			Ok(line) => {
				let _ = rl.add_history_entry(line.as_str());
				let line = line.trim();
				if line.is_empty() {
					continue;
				}
				if line.starts_with('.') {
					if !handle_dot_command(line, &db, caller) {
						break;
					}
					continue;
				}
				handle_rest_command(line, &mut db, caller);
			}
			Err(ReadlineError::Interrupted) => {
				println!("^C");
			}
			Err(ReadlineError::Eof) => {
				break;
			}
			Err(err) => {
				eprintln!("readline error: {err}");
				break;
			}
		}
	}
}

fn handle_dot_command(cmd: &str, db: &Database, caller: Level) -> bool {
	let mut parts = cmd.split_whitespace();
	match parts.next().unwrap_or("") {
		".quit" | ".exit" => false,
		".help" => {
			println!("commands:");
			println!("  get /path");
			println!("  post /path {{json body}}");
			println!("  patch /path {{json body}}");
			println!("  put /path {{json body}}");
			println!("  delete /path");
			println!("  .search /partial-path   list completions");
			println!("  .quit                   exit");
			true
		}
		".search" => {
			let prefix = parts.next().unwrap_or("/");
			for candidate in db.search_paths(prefix, caller, 20) {
				println!("{candidate}");
			}
			true
		}
		other => {
			println!("unknown command: {other} (try .help)");
			true
		}
	}
}

fn handle_rest_command(line: &str, db: &mut Database, caller: Level) {
	let mut parts = line.splitn(3, ' ');
	let verb = parts.next().unwrap_or("");
	let path = parts.next().unwrap_or("");
	let rest = parts.next().unwrap_or("").trim();

	let body = if rest.is_empty() { None } else { serde_json::from_str::<serde_json::Value>(rest).ok() };
	if !rest.is_empty() && body.is_none() {
		println!("error: could not parse body as JSON");
		return;
	}

	let method = match verb.to_ascii_lowercase().as_str() {
		"get" => Method::Get,
		"post" => Method::Post,
		"patch" => Method::Patch,
		"put" => Method::Put,
		"delete" => Method::Delete,
		_ => {
			println!("unknown verb: {verb} (expected get/post/patch/put/delete)");
			return;
		}
	};

	match db.dispatch(method, path, body.as_ref(), caller) {
		Ok(response) => match response.body {
			Some(body) => println!("{} {}", response.code.as_u16(), json_pretty(&body)),
			None => println!("{}", response.code.as_u16()),
		},
		Err(err) => println!("error: {err}"),
	}
}

fn json_pretty(value: &serde_json::Value) -> String {
	serde_json::to_string_pretty(value).unwrap_or_else(|_| json!(null).to_string())
}
