//! Signal - observable value cell
//!
//! `Signal<T>` holds a value shared by all of its clones and notifies watchers
//! synchronously, in registration order, every time the value is written.
//!
//! ## Example
//!
//! ```ignore
//! use waypoint_reactive::Signal;
//!
//! let count = Signal::new(0);
//! count.set(42);
//! assert_eq!(count.get(), 42);
//!
//! count.update(|n| *n += 1);
//! assert_eq!(count.get(), 43);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::runtime::NodeId;

type Watcher<T> = Rc<dyn Fn(&T)>;
type WatcherList<T> = RefCell<Vec<(NodeId, Watcher<T>)>>;

/// A reactive value with synchronous watchers.
///
/// Clones share the same value and the same watcher list.
///
/// Watchers receive the new value by reference while it is borrowed, so a
/// watcher must not write to the signal it observes. Defer such writes with
/// [`next_tick`](crate::next_tick).
pub struct Signal<T: 'static> {
	/// Unique identifier for this signal
	id: NodeId,
	/// The actual value, shared via reference counting
	value: Rc<RefCell<T>>,
	/// Watchers notified after every write
	watchers: Rc<WatcherList<T>>,
}

impl<T: 'static> Clone for Signal<T> {
	fn clone(&self) -> Self {
		Self {
			id: self.id,
			value: self.value.clone(),
			watchers: self.watchers.clone(),
		}
	}
}

impl<T: 'static> Signal<T> {
	/// Create a new Signal with the given initial value
	pub fn new(value: T) -> Self {
		Self {
			id: NodeId::new(),
			value: Rc::new(RefCell::new(value)),
			watchers: Rc::new(RefCell::new(Vec::new())),
		}
	}

	/// Get a clone of the current value.
	pub fn get(&self) -> T
	where
		T: Clone,
	{
		self.value.borrow().clone()
	}

	/// Run `f` with a reference to the current value.
	pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
		f(&self.value.borrow())
	}

	/// Set the signal to a new value and notify watchers.
	pub fn set(&self, value: T) {
		*self.value.borrow_mut() = value;
		self.notify();
	}

	/// Set the signal only if `value` differs from the current one.
	///
	/// Returns `true` when the value changed and watchers were notified.
	pub fn set_if_changed(&self, value: T) -> bool
	where
		T: PartialEq,
	{
		if *self.value.borrow() == value {
			return false;
		}
		self.set(value);
		true
	}

	/// Update the value in place and notify watchers once.
	pub fn update<F>(&self, f: F)
	where
		F: FnOnce(&mut T),
	{
		f(&mut *self.value.borrow_mut());
		self.notify();
	}

	/// Register a watcher called after every write.
	///
	/// Dropping the returned handle keeps the watcher alive; call
	/// [`WatchHandle::unwatch`] to remove it.
	pub fn watch<F>(&self, f: F) -> WatchHandle
	where
		F: Fn(&T) + 'static,
	{
		let id = NodeId::new();
		self.watchers.borrow_mut().push((id, Rc::new(f)));

		let watchers: Weak<WatcherList<T>> = Rc::downgrade(&self.watchers);
		WatchHandle {
			id,
			detach: Box::new(move || {
				if let Some(watchers) = watchers.upgrade() {
					watchers.borrow_mut().retain(|(watcher_id, _)| *watcher_id != id);
				}
			}),
		}
	}

	/// Number of registered watchers.
	pub fn watcher_count(&self) -> usize {
		self.watchers.borrow().len()
	}

	/// Get the NodeId of this signal
	pub fn id(&self) -> NodeId {
		self.id
	}

	/// Whether both handles point at the same underlying value.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.value, &other.value)
	}

	fn notify(&self) {
		// Snapshot so watchers may register or remove watchers while running
		let watchers: Vec<Watcher<T>> = self
			.watchers
			.borrow()
			.iter()
			.map(|(_, watcher)| watcher.clone())
			.collect();
		if watchers.is_empty() {
			return;
		}

		let value = self.value.borrow();
		for watcher in watchers {
			watcher(&*value);
		}
	}
}

impl<T: Default + 'static> Default for Signal<T> {
	fn default() -> Self {
		Self::new(T::default())
	}
}

impl<T: fmt::Debug + 'static> fmt::Debug for Signal<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Signal")
			.field("id", &self.id)
			.field("value", &*self.value.borrow())
			.field("watchers", &self.watchers.borrow().len())
			.finish()
	}
}

/// Handle returned by [`Signal::watch`].
pub struct WatchHandle {
	id: NodeId,
	detach: Box<dyn FnOnce()>,
}

impl WatchHandle {
	/// Id of the watcher.
	pub fn id(&self) -> NodeId {
		self.id
	}

	/// Remove the watcher from its signal.
	pub fn unwatch(self) {
		(self.detach)();
	}
}

impl fmt::Debug for WatchHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WatchHandle").field("id", &self.id).finish()
	}
}
