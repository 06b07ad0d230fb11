use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use super::timer::Scheduler;

struct Inner<A, S: Scheduler> {
	scheduler: S,
	wait: Duration,
	pending: RefCell<Option<S::Handle>>,
	callback: Rc<dyn Fn(A)>,
}

/// Trailing-edge debounced wrapper around a callback.
///
/// Every [`Debounced::call`] cancels the pending invocation and schedules a
/// new one `wait` after itself, so only the last call of a burst runs.
pub struct Debounced<A, S: Scheduler> {
	inner: Rc<Inner<A, S>>,
}

impl<A, S: Scheduler> Clone for Debounced<A, S> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

/// Wraps `callback` so bursts of calls collapse into one.
pub fn debounce<A, S, F>(scheduler: S, wait: Duration, callback: F) -> Debounced<A, S>
where
	A: 'static,
	S: Scheduler + 'static,
	F: Fn(A) + 'static,
{
	Debounced {
		inner: Rc::new(Inner {
			scheduler,
			wait,
			pending: RefCell::new(None),
			callback: Rc::new(callback),
		}),
	}
}

impl<A: 'static, S: Scheduler + 'static> Debounced<A, S> {
	pub fn call(&self, arg: A) {
		self.cancel();
		let callback = self.inner.callback.clone();
		let weak: Weak<Inner<A, S>> = Rc::downgrade(&self.inner);
		let handle = self.inner.scheduler.schedule(
			self.inner.wait,
			Box::new(move || {
				if let Some(inner) = weak.upgrade() {
					inner.pending.borrow_mut().take();
				}
				callback(arg);
			}),
		);
		*self.inner.pending.borrow_mut() = Some(handle);
	}

	/// Drops the pending invocation, if any.
	pub fn cancel(&self) {
		let pending = self.inner.pending.borrow_mut().take();
		if let Some(handle) = pending {
			self.inner.scheduler.cancel(handle);
		}
	}

	pub fn is_pending(&self) -> bool {
		self.inner.pending.borrow().is_some()
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;
	use std::rc::Rc;
	use std::time::Duration;

	use super::*;
	use crate::util::timer::ManualScheduler;

	fn recorder() -> (Rc<RefCell<Vec<u32>>>, impl Fn(u32) + 'static) {
		let calls = Rc::new(RefCell::new(Vec::new()));
		let sink = calls.clone();
		(calls, move |v| sink.borrow_mut().push(v))
	}

	#[test]
	fn burst_runs_once_with_last_argument() {
		let clock = ManualScheduler::new();
		let (calls, cb) = recorder();
		let debounced = debounce(clock.clone(), Duration::from_millis(300), cb);

		for i in 0..5 {
			debounced.call(i);
			clock.advance(Duration::from_millis(100));
		}
		assert!(calls.borrow().is_empty());

		clock.advance(Duration::from_millis(300));
		assert_eq!(*calls.borrow(), vec![4]);
		assert!(!debounced.is_pending());
	}

	#[test]
	fn wait_restarts_from_last_call() {
		let clock = ManualScheduler::new();
		let (calls, cb) = recorder();
		let debounced = debounce(clock.clone(), Duration::from_millis(300), cb);

		debounced.call(1);
		clock.advance(Duration::from_millis(250));
		debounced.call(2);
		clock.advance(Duration::from_millis(250));
		assert!(calls.borrow().is_empty());
		clock.advance(Duration::from_millis(50));
		assert_eq!(*calls.borrow(), vec![2]);
	}

	#[test]
	fn separated_calls_each_fire() {
		let clock = ManualScheduler::new();
		let (calls, cb) = recorder();
		let debounced = debounce(clock.clone(), Duration::from_millis(10), cb);

		debounced.call(1);
		clock.advance(Duration::from_millis(20));
		debounced.call(2);
		clock.advance(Duration::from_millis(20));
		assert_eq!(*calls.borrow(), vec![1, 2]);
	}

	#[test]
	fn cancel_drops_pending_call() {
		let clock = ManualScheduler::new();
		let (calls, cb) = recorder();
		let debounced = debounce(clock.clone(), Duration::from_millis(10), cb);

		debounced.call(7);
		debounced.cancel();
		clock.advance(Duration::from_secs(1));
		assert!(calls.borrow().is_empty());
		assert_eq!(clock.pending(), 0);
	}
}
