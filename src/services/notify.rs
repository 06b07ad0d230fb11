use std::time::Duration;

use leptos::prelude::*;
use log::{debug, error, info, warn};

use crate::util::{BrowserScheduler, Scheduler};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
	Info,
	Success,
	Warning,
	Error,
}

impl Level {
	pub fn css_class(self) -> &'static str {
		match self {
			Level::Info => "toast-info",
			Level::Success => "toast-success",
			Level::Warning => "toast-warning",
			Level::Error => "toast-error",
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Toast {
	pub id: u64,
	pub level: Level,
	pub message: String,
}

/// Ordered toast stack, oldest first.
#[derive(Clone, Debug, Default)]
pub struct NotificationQueue {
	toasts: Vec<Toast>,
	next_id: u64,
	max_visible: usize,
}

impl NotificationQueue {
	pub fn new(max_visible: usize) -> Self {
		Self {
			toasts: Vec::new(),
			next_id: 1,
			max_visible: max_visible.max(1),
		}
	}

	pub fn push(&mut self, level: Level, message: impl Into<String>) -> u64 {
		let id = self.next_id;
		self.next_id += 1;
		self.toasts.push(Toast {
			id,
			level,
			message: message.into(),
		});
		if self.toasts.len() > self.max_visible {
			let overflow = self.toasts.len() - self.max_visible;
			self.toasts.drain(..overflow);
		}
		id
	}

	/// Returns whether a toast was removed.
	pub fn dismiss(&mut self, id: u64) -> bool {
		let before = self.toasts.len();
		self.toasts.retain(|t| t.id != id);
		self.toasts.len() != before
	}

	pub fn toasts(&self) -> &[Toast] {
		&self.toasts
	}
}

/// Handle used by components to raise toasts. Cheap to copy.
#[derive(Clone, Copy)]
pub struct Notifier {
	queue: RwSignal<NotificationQueue>,
	timeout: Duration,
}

impl Notifier {
	pub fn new(max_visible: usize, timeout: Duration) -> Self {
		Self {
			queue: RwSignal::new(NotificationQueue::new(max_visible)),
			timeout,
		}
	}

	pub fn queue(&self) -> RwSignal<NotificationQueue> {
		self.queue
	}

	pub fn notify(&self, level: Level, message: impl Into<String>) -> u64 {
		let message = message.into();
		match level {
			Level::Error => error!("{message}"),
			Level::Warning => warn!("{message}"),
			Level::Info | Level::Success => info!("{message}"),
		}
		let mut id = 0;
		self.queue.update(|q| id = q.push(level, message));

		let queue = self.queue;
		let _ = BrowserScheduler.schedule(
			self.timeout,
			Box::new(move || {
				// The signal may already be disposed if the page went away.
				if let Some(removed) = queue.try_update(|q| q.dismiss(id)) {
					debug!("toast {id} expired (removed: {removed})");
				}
			}),
		);
		id
	}

	pub fn info(&self, message: impl Into<String>) -> u64 {
		self.notify(Level::Info, message)
	}

	pub fn success(&self, message: impl Into<String>) -> u64 {
		self.notify(Level::Success, message)
	}

	pub fn warning(&self, message: impl Into<String>) -> u64 {
		self.notify(Level::Warning, message)
	}

	pub fn error(&self, message: impl Into<String>) -> u64 {
		self.notify(Level::Error, message)
	}

	pub fn dismiss(&self, id: u64) {
		self.queue.update(|q| {
			q.dismiss(id);
		});
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ids_are_unique_and_ordered() {
		let mut queue = NotificationQueue::new(5);
		let a = queue.push(Level::Info, "a");
		let b = queue.push(Level::Error, "b");
		assert!(b > a);
		let messages: Vec<_> = queue.toasts().iter().map(|t| t.message.as_str()).collect();
		assert_eq!(messages, ["a", "b"]);
	}

	#[test]
	fn overflow_drops_oldest() {
		let mut queue = NotificationQueue::new(2);
		queue.push(Level::Info, "1");
		queue.push(Level::Info, "2");
		queue.push(Level::Warning, "3");
		let messages: Vec<_> = queue.toasts().iter().map(|t| t.message.as_str()).collect();
		assert_eq!(messages, ["2", "3"]);
	}

	#[test]
	fn dismiss_reports_removal() {
		let mut queue = NotificationQueue::new(3);
		let id = queue.push(Level::Success, "saved");
		assert!(queue.dismiss(id));
		assert!(!queue.dismiss(id));
		assert!(queue.toasts().is_empty());
	}
}
