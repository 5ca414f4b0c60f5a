//! Two-phase completion signal.
//!
//! A [`Completion`] tracks a unit of deferred work through two phases:
//!
//! 1. [`Phase::Applied`]: the state change has been applied
//! 2. [`Phase::Flushed`]: the render consuming that state has flushed
//!
//! Subscribers pick the phase they care about. Scroll restoration, for
//! example, only listens to `Flushed` so it observes the final layout.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::runtime::next_tick;

type Callback = Box<dyn FnOnce()>;

/// Progress of a [`Completion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Phase {
	/// Nothing has completed yet
	#[default]
	Pending,
	/// State has been applied
	Applied,
	/// The render consuming the state has flushed
	Flushed,
}

#[derive(Default)]
struct CompletionInner {
	phase: Cell<Phase>,
	on_applied: RefCell<Vec<Callback>>,
	on_flushed: RefCell<Vec<Callback>>,
}

/// Shared handle to a two-phase completion.
///
/// Each phase fires its callbacks exactly once. Callbacks registered after a
/// phase completed run immediately.
#[derive(Clone, Default)]
pub struct Completion {
	inner: Rc<CompletionInner>,
}

impl Completion {
	/// Creates a pending completion.
	pub fn new() -> Self {
		Self::default()
	}

	/// Current phase.
	pub fn phase(&self) -> Phase {
		self.inner.phase.get()
	}

	/// Whether phase 1 has completed.
	pub fn is_applied(&self) -> bool {
		self.phase() >= Phase::Applied
	}

	/// Whether phase 2 has completed.
	pub fn is_flushed(&self) -> bool {
		self.phase() == Phase::Flushed
	}

	/// Runs `f` once the state has been applied.
	pub fn on_applied<F>(&self, f: F)
	where
		F: FnOnce() + 'static,
	{
		if self.is_applied() {
			f();
		} else {
			self.inner.on_applied.borrow_mut().push(Box::new(f));
		}
	}

	/// Runs `f` once the render has flushed.
	pub fn on_flushed<F>(&self, f: F)
	where
		F: FnOnce() + 'static,
	{
		if self.is_flushed() {
			f();
		} else {
			self.inner.on_flushed.borrow_mut().push(Box::new(f));
		}
	}

	/// Completes phase 1. Has no effect if phase 1 already completed.
	pub fn complete_applied(&self) {
		if self.phase() != Phase::Pending {
			return;
		}
		self.inner.phase.set(Phase::Applied);
		let callbacks = std::mem::take(&mut *self.inner.on_applied.borrow_mut());
		for callback in callbacks {
			callback();
		}
	}

	/// Completes phase 2, completing phase 1 first if needed.
	pub fn complete_flushed(&self) {
		if self.is_flushed() {
			return;
		}
		self.complete_applied();
		self.inner.phase.set(Phase::Flushed);
		let callbacks = std::mem::take(&mut *self.inner.on_flushed.borrow_mut());
		for callback in callbacks {
			callback();
		}
	}

	/// Completes phase 2 on the next scheduling turn.
	pub fn flush_next_tick(&self) {
		let completion = self.clone();
		next_tick(move || completion.complete_flushed());
	}

	/// Completes phase 1 on the next turn and phase 2 on the turn after.
	pub fn schedule(&self) {
		let completion = self.clone();
		next_tick(move || {
			completion.complete_applied();
			completion.flush_next_tick();
		});
	}
}

impl fmt::Debug for Completion {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Completion")
			.field("phase", &self.phase())
			.finish()
	}
}
