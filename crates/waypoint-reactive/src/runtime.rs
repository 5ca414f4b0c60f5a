//! Reactive Runtime
//!
//! This module owns the cooperative scheduler every deferred continuation runs
//! on.
//!
//! ## Architecture
//!
//! 1. **Node ids**: process-unique identifiers for signals, watchers and hooks
//! 2. **Tick queue**: FIFO queue of continuations ("next scheduling turn")
//! 3. **Host scheduler**: optional hook that arranges for the queue to be
//!    flushed (a browser micro-task on WASM); without it the queue is flushed
//!    manually, which is what native builds and tests do
//!
//! A continuation queued while the queue is being flushed runs in the same
//! flush, after everything that was queued before it. Two nested `next_tick`
//! calls therefore always run in two distinct, ordered turns.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Unique identifier for reactive nodes (signals, watchers, router hooks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
	/// Create a new unique NodeId
	pub fn new() -> Self {
		static COUNTER: AtomicUsize = AtomicUsize::new(0);
		Self(COUNTER.fetch_add(1, Ordering::Relaxed))
	}
}

impl Default for NodeId {
	fn default() -> Self {
		Self::new()
	}
}

/// A continuation waiting for the next scheduling turn.
pub type Task = Box<dyn FnOnce() + 'static>;

/// Type for the host scheduler function
type SchedulerFn = Box<dyn Fn(Box<dyn FnOnce() + Send>) + Send + Sync>;

/// Global scheduler function
static SCHEDULER: OnceLock<SchedulerFn> = OnceLock::new();

/// Set the host scheduler used to flush the tick queue.
///
/// The scheduler receives a closure that flushes the queue and must run it
/// "soon" (after the current call stack unwinds). It can be set once; later
/// calls are ignored.
///
/// # Example
///
/// ```ignore
/// waypoint_reactive::set_scheduler(|flush| {
///     wasm_bindgen_futures::spawn_local(async move { flush() });
/// });
/// ```
pub fn set_scheduler<F>(scheduler: F)
where
	F: Fn(Box<dyn FnOnce() + Send>) + Send + Sync + 'static,
{
	if SCHEDULER.set(Box::new(scheduler)).is_err() {
		tracing::debug!("host scheduler already installed; ignoring replacement");
	}
}

/// Installs a scheduler that flushes the tick queue on a browser micro-task.
#[cfg(all(target_family = "wasm", target_os = "unknown"))]
pub fn install_microtask_scheduler() {
	set_scheduler(|flush| {
		wasm_bindgen_futures::spawn_local(async move { flush() });
	});
}

/// Per-thread reactive runtime.
///
/// In WASM there is only one thread, so this is effectively the page-wide
/// scheduler.
pub struct Runtime {
	/// Continuations waiting for their turn
	queue: RefCell<VecDeque<Task>>,
	/// Whether the queue is being drained right now
	flushing: Cell<bool>,
	/// Whether a host flush has been requested and not yet run
	flush_scheduled: Cell<bool>,
	/// Number of continuations that have run so far
	completed: Cell<u64>,
}

impl Runtime {
	/// Create a new Runtime instance
	pub fn new() -> Self {
		Self {
			queue: RefCell::new(VecDeque::new()),
			flushing: Cell::new(false),
			flush_scheduled: Cell::new(false),
			completed: Cell::new(0),
		}
	}

	/// Queue a continuation for the next scheduling turn.
	pub fn next_tick(&self, task: Task) {
		self.queue.borrow_mut().push_back(task);
		self.schedule_flush();
	}

	fn schedule_flush(&self) {
		if self.flushing.get() || self.flush_scheduled.get() {
			return;
		}

		// Without a host scheduler the queue must be flushed manually
		if let Some(scheduler) = SCHEDULER.get() {
			self.flush_scheduled.set(true);
			scheduler(Box::new(|| {
				flush_ticks();
			}));
		}
	}

	/// Run queued continuations until the queue is empty.
	///
	/// Returns the number of continuations that ran. Calling this from inside
	/// a continuation is a no-op returning `0`; the outer flush picks up
	/// whatever the continuation queued.
	pub fn flush(&self) -> usize {
		if self.flushing.replace(true) {
			return 0;
		}
		self.flush_scheduled.set(false);

		let _guard = FlushGuard(&self.flushing);
		let mut ran = 0;
		loop {
			// The borrow must end before the task runs; tasks queue more tasks.
			let next = self.queue.borrow_mut().pop_front();
			let Some(task) = next else {
				break;
			};
			task();
			ran += 1;
			self.completed.set(self.completed.get() + 1);
		}
		ran
	}

	/// Number of continuations waiting in the queue.
	pub fn pending(&self) -> usize {
		self.queue.borrow().len()
	}

	/// Number of continuations that have run since the runtime was created.
	pub fn completed(&self) -> u64 {
		self.completed.get()
	}

	/// Whether the queue is being drained right now.
	pub fn is_flushing(&self) -> bool {
		self.flushing.get()
	}
}

impl Default for Runtime {
	fn default() -> Self {
		Self::new()
	}
}

/// Resets the `flushing` flag even if a continuation panics.
struct FlushGuard<'a>(&'a Cell<bool>);

impl Drop for FlushGuard<'_> {
	fn drop(&mut self) {
		self.0.set(false);
	}
}

thread_local! {
	static RUNTIME: Runtime = Runtime::new();
}

/// Get a reference to the thread-local runtime
pub fn with_runtime<F, R>(f: F) -> R
where
	F: FnOnce(&Runtime) -> R,
{
	RUNTIME.with(f)
}

/// Queue `task` for the next scheduling turn.
pub fn next_tick<F>(task: F)
where
	F: FnOnce() + 'static,
{
	with_runtime(|rt| rt.next_tick(Box::new(task)));
}

/// Drain the tick queue. See [`Runtime::flush`].
pub fn flush_ticks() -> usize {
	with_runtime(|rt| rt.flush())
}

/// Number of continuations waiting for their turn.
pub fn pending_ticks() -> usize {
	with_runtime(|rt| rt.pending())
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serial_test::serial;
	use std::rc::Rc;

	#[rstest]
	#[serial]
	fn test_node_id_uniqueness() {
		let id1 = NodeId::new();
		let id2 = NodeId::new();
		let id3 = NodeId::new();

		assert_ne!(id1, id2);
		assert_ne!(id2, id3);
		assert_ne!(id1, id3);
	}

	#[rstest]
	#[serial]
	fn test_next_tick_is_deferred() {
		let log = Rc::new(RefCell::new(Vec::new()));
		let log_clone = log.clone();

		next_tick(move || log_clone.borrow_mut().push("tick"));
		assert!(log.borrow().is_empty());
		assert_eq!(pending_ticks(), 1);

		assert_eq!(flush_ticks(), 1);
		assert_eq!(*log.borrow(), vec!["tick"]);
		assert_eq!(pending_ticks(), 0);
	}

	#[rstest]
	#[serial]
	fn test_nested_ticks_run_after_earlier_ones() {
		let log = Rc::new(RefCell::new(Vec::new()));

		let outer = log.clone();
		next_tick(move || {
			outer.borrow_mut().push("first");
			let inner = outer.clone();
			next_tick(move || inner.borrow_mut().push("nested"));
		});
		let second = log.clone();
		next_tick(move || second.borrow_mut().push("second"));

		assert_eq!(flush_ticks(), 3);
		assert_eq!(*log.borrow(), vec!["first", "second", "nested"]);
	}

	#[rstest]
	#[serial]
	fn test_reentrant_flush_is_noop() {
		let inner_result = Rc::new(Cell::new(usize::MAX));
		let slot = inner_result.clone();

		next_tick(move || slot.set(flush_ticks()));
		flush_ticks();

		assert_eq!(inner_result.get(), 0);
	}

	#[rstest]
	#[serial]
	fn test_completed_counter_advances() {
		let before = with_runtime(|rt| rt.completed());
		next_tick(|| {});
		next_tick(|| {});
		flush_ticks();
		assert_eq!(with_runtime(|rt| rt.completed()), before + 2);
	}
}
