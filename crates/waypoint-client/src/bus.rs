//! Error and lifecycle signal bus.
//!
//! One bus exists per [`App`](crate::app::App). It owns the current
//! [`ErrorState`] and fans out [`BusEvent`]s. The error is only writable
//! through [`App::error`](crate::app::App::error).

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use waypoint_reactive::{NodeId, Signal, WatchHandle};

use crate::error::ErrorState;
use crate::router::RouteDescriptor;

/// Lifecycle events.
#[derive(Debug, Clone)]
pub enum BusEvent {
	/// A transition committed after the app became ready.
	RouteChanged {
		/// New route.
		to: Rc<RouteDescriptor>,
		/// Previous route.
		from: Rc<RouteDescriptor>,
	},
	/// Refreshed instances have rendered; scroll restoration may run.
	TriggerScroll,
	/// The app attached to the page.
	Ready,
}

impl BusEvent {
	/// Event name as seen by page scripts.
	pub fn name(&self) -> &'static str {
		match self {
			Self::RouteChanged { .. } => "routeChanged",
			Self::TriggerScroll => "triggerScroll",
			Self::Ready => "ready",
		}
	}
}

/// Identifies a bus listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(NodeId);

type Listener = Rc<dyn Fn(&BusEvent)>;

/// Carries the error state and lifecycle events.
pub struct SignalBus {
	error: Signal<Option<ErrorState>>,
	error_generation: Cell<u64>,
	listeners: RefCell<Vec<(ListenerId, Listener)>>,
}

impl Default for SignalBus {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for SignalBus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SignalBus")
			.field("error", &self.error.get())
			.field("error_generation", &self.error_generation.get())
			.field("listeners", &self.listeners.borrow().len())
			.finish()
	}
}

impl SignalBus {
	/// Creates a bus with no error.
	pub fn new() -> Self {
		Self {
			error: Signal::new(None),
			error_generation: Cell::new(0),
			listeners: RefCell::new(Vec::new()),
		}
	}

	/// Current error.
	pub fn error(&self) -> Option<ErrorState> {
		self.error.get()
	}

	/// Whether an error is displayed.
	pub fn has_error(&self) -> bool {
		self.error.with(Option::is_some)
	}

	/// Increases on every raise, including one that repeats the current
	/// error. Never repeats.
	pub fn error_generation(&self) -> u64 {
		self.error_generation.get()
	}

	/// Replaces the error. Returns `false` when `error` equals the current
	/// one, in which case watchers are not notified.
	pub(crate) fn raise(&self, error: Option<ErrorState>) -> bool {
		self.error_generation.set(self.error_generation.get() + 1);
		self.error.set_if_changed(error)
	}

	/// Watches the error. Fires once per distinct value.
	pub fn on_error_changed<F>(&self, f: F) -> WatchHandle
	where
		F: Fn(&Option<ErrorState>) + 'static,
	{
		self.error.watch(f)
	}

	/// Adds an event listener.
	pub fn on<F>(&self, f: F) -> ListenerId
	where
		F: Fn(&BusEvent) + 'static,
	{
		let id = ListenerId(NodeId::new());
		self.listeners.borrow_mut().push((id, Rc::new(f)));
		id
	}

	/// Removes an event listener.
	pub fn off(&self, id: ListenerId) -> bool {
		let mut listeners = self.listeners.borrow_mut();
		let count = listeners.len();
		listeners.retain(|(listener, _)| *listener != id);
		listeners.len() != count
	}

	/// Delivers `event` to every listener, in registration order.
	pub fn emit(&self, event: BusEvent) {
		tracing::debug!(event = event.name(), "bus event");
		let listeners: Vec<Listener> = self
			.listeners
			.borrow()
			.iter()
			.map(|(_, listener)| listener.clone())
			.collect();
		for listener in listeners {
			listener(&event);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_raise_is_idempotent_for_equal_errors() {
		let bus = SignalBus::new();
		let fired = Rc::new(Cell::new(0));
		let counter = fired.clone();
		let _handle = bus.on_error_changed(move |_| counter.set(counter.get() + 1));

		assert!(bus.raise(Some(ErrorState::new(500, "boom"))));
		assert!(!bus.raise(Some(ErrorState::new(500, "boom"))));
		assert!(bus.raise(Some(ErrorState::not_found("missing"))));
		assert!(bus.raise(None));

		assert_eq!(fired.get(), 3);
		assert_eq!(bus.error_generation(), 4);
		assert!(!bus.has_error());
	}

	#[rstest]
	fn test_listeners_run_in_order_until_removed() {
		let bus = SignalBus::new();
		let log = Rc::new(RefCell::new(Vec::new()));

		let first_log = log.clone();
		let first = bus.on(move |event| first_log.borrow_mut().push(format!("1:{}", event.name())));
		let second_log = log.clone();
		bus.on(move |event| second_log.borrow_mut().push(format!("2:{}", event.name())));

		bus.emit(BusEvent::Ready);
		assert!(bus.off(first));
		bus.emit(BusEvent::TriggerScroll);

		assert_eq!(
			*log.borrow(),
			vec!["1:ready", "2:ready", "2:triggerScroll"]
		);
	}
}
