// Copyright (c) 2025 Vellum contributors
// This file is licensed under the Apache-2.0 license

//! A bounded FIFO of change notifications with pause/play and an immediate
//! mode that bypasses queueing entirely (spec.md §4.12). Grounded on the
//! original `NotifyQueue` + `CollectionSubscriber` pair: a subscriber is a
//! `FieldMask` filter plus a callback, and delivery only happens when the
//! filter's `changed` bits overlap the event's.

use std::collections::VecDeque;
use std::sync::Arc;

use vellum_core::{Cell, FieldMask};

#[derive(Clone)]
pub struct ChangeEvent {
	/// The item's id within its collection, or `None` for a singleton
	/// resource.
	pub id: Option<u64>,
	pub changes: FieldMask,
	pub snapshot: Cell,
}

type Callback = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

struct Subscriber {
	id: u64,
	filter: FieldMask,
	callback: Callback,
}

pub struct NotifyQueue {
	capacity: usize,
	buffer: VecDeque<ChangeEvent>,
	paused: bool,
	immediate: bool,
	subscribers: Vec<Subscriber>,
	next_subscriber_id: u64,
}

impl NotifyQueue {
	pub fn new(capacity: usize) -> Self {
		Self {
			capacity,
			buffer: VecDeque::new(),
			paused: false,
			immediate: false,
			subscribers: Vec::new(),
			next_subscriber_id: 1,
		}
	}

	/// `filter.is_empty()` subscribes to every change (spec.md's
	/// `SubscribeToAllPaths`).
	pub fn subscribe(&mut self, filter: FieldMask, callback: impl Fn(&ChangeEvent) + Send + Sync + 'static) -> u64 {
		let id = self.next_subscriber_id;
		self.next_subscriber_id += 1;
		self.subscribers.push(Subscriber { id, filter, callback: Arc::new(callback) });
		id
	}

	pub fn unsubscribe(&mut self, id: u64) {
		self.subscribers.retain(|s| s.id != id);
	}

	pub fn subscriber_count(&self) -> usize {
		self.subscribers.len()
	}

	pub fn set_immediate(&mut self, immediate: bool) {
		self.immediate = immediate;
		if immediate {
			self.drain();
		}
	}

	pub fn pause(&mut self) {
		self.paused = true;
	}

	pub fn play(&mut self) {
		self.paused = false;
		self.drain();
	}

	pub fn is_paused(&self) -> bool {
		self.paused
	}

	pub fn len(&self) -> usize {
		self.buffer.len()
	}

	pub fn is_empty(&self) -> bool {
		self.buffer.is_empty()
	}

	pub fn is_full(&self) -> bool {
		self.capacity > 0 && self.buffer.len() >= self.capacity
	}

	/// Enqueues an event. Oldest events are dropped once `capacity` is
	/// reached — a bounded FIFO never grows unbounded while paused.
	pub fn publish(&mut self, event: ChangeEvent) {
		if self.immediate && !self.paused {
			self.dispatch(&event);
			return;
		}
		if self.is_full() {
			self.buffer.pop_front();
		}
		self.buffer.push_back(event);
		if !self.paused {
			self.drain();
		}
	}

	fn drain(&mut self) {
		while !self.paused {
			let Some(event) = self.buffer.pop_front() else { break };
			self.dispatch(&event);
		}
	}

	fn dispatch(&self, event: &ChangeEvent) {
		for sub in &self.subscribers {
			if sub.filter.is_empty() || sub.filter.changed_overlaps(&event.changes) {
				(sub.callback)(event);
			}
		}
	}
}
