use std::time::Duration;

use leptos_dom::helpers::{TimeoutHandle, set_timeout_with_handle};
use log::error;

/// Something that can run a task once after a delay.
pub trait Scheduler {
	type Handle;

	fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> Self::Handle;
	fn cancel(&self, handle: Self::Handle);
}

/// `setTimeout` on the page's window.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserScheduler;

impl Scheduler for BrowserScheduler {
	type Handle = Option<TimeoutHandle>;

	fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> Self::Handle {
		match set_timeout_with_handle(task, delay) {
			Ok(handle) => Some(handle),
			Err(err) => {
				error!("failed to schedule timer: {err:?}");
				None
			}
		}
	}

	fn cancel(&self, handle: Self::Handle) {
		if let Some(handle) = handle {
			handle.clear();
		}
	}
}

#[cfg(test)]
pub use manual::ManualScheduler;

#[cfg(test)]
mod manual {
	use std::cell::RefCell;
	use std::rc::Rc;
	use std::time::Duration;

	use super::Scheduler;

	struct Pending {
		id: u64,
		due: Duration,
		task: Box<dyn FnOnce()>,
	}

	#[derive(Default)]
	struct Clock {
		now: Duration,
		next_id: u64,
		pending: Vec<Pending>,
	}

	/// Virtual clock: tasks only run when the test calls `advance`.
	#[derive(Clone, Default)]
	pub struct ManualScheduler {
		clock: Rc<RefCell<Clock>>,
	}

	impl ManualScheduler {
		pub fn new() -> Self {
			Self::default()
		}

		pub fn pending(&self) -> usize {
			self.clock.borrow().pending.len()
		}

		/// Moves time forward, running due tasks in deadline order.
		pub fn advance(&self, by: Duration) {
			let target = self.clock.borrow().now + by;
			loop {
				let next = {
					let mut clock = self.clock.borrow_mut();
					let due = clock
						.pending
						.iter()
						.enumerate()
						.filter(|(_, p)| p.due <= target)
						.min_by_key(|(_, p)| (p.due, p.id))
						.map(|(i, _)| i);
					due.map(|i| {
						let task = clock.pending.remove(i);
						clock.now = task.due;
						task
					})
				};
				match next {
					Some(pending) => (pending.task)(),
					None => break,
				}
			}
			self.clock.borrow_mut().now = target;
		}
	}

	impl Scheduler for ManualScheduler {
		type Handle = u64;

		fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> u64 {
			let mut clock = self.clock.borrow_mut();
			let id = clock.next_id;
			clock.next_id += 1;
			let due = clock.now + delay;
			clock.pending.push(Pending { id, due, task });
			id
		}

		fn cancel(&self, handle: u64) {
			self.clock.borrow_mut().pending.retain(|p| p.id != handle);
		}
	}
}
