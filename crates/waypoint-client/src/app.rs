//! The application context object.
//!
//! [`App`] replaces the page-global singleton: it owns the signal bus, the
//! current [`SharedContext`], the per-transition flags and the collaborators.
//! Exactly one `App` exists per booted page; hooks registered on the router
//! hold a [`WeakApp`] so dropping the app (or [`App::unload`]) releases it.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::bus::SignalBus;
use crate::config::AppConfig;
use crate::context::{NavigationControl, SharedContext};
use crate::error::{ErrorState, NavigationError};
use crate::render::Renderer;
use crate::router::Router;
use crate::store::Store;
use crate::window::PageEnvironment;

/// Receives errors that escaped a guard.
pub type ErrorHandler = Rc<dyn Fn(&App, &NavigationError)>;

/// How a transition relates to the previous route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionKind {
	/// No transition classified yet.
	#[default]
	Initial,
	/// Route name differs, or an error was displayed.
	RouteChanged,
	/// Same name, different path.
	ParamChanged,
	/// Same path, different query or hash.
	QueryChanged,
	/// Same route again.
	Reentrant,
}

/// Flags describing the transition in flight.
#[derive(Debug, Default)]
pub struct TransitionFlags {
	kind: Cell<TransitionKind>,
	diff_query: RefCell<BTreeSet<String>>,
	had_error: Cell<bool>,
	date_last_error: Cell<u64>,
	snapshot_pinned: Cell<bool>,
}

impl TransitionFlags {
	/// Classification of the latest transition.
	pub fn kind(&self) -> TransitionKind {
		self.kind.get()
	}

	/// Route name changed, or an error was displayed.
	pub fn route_changed(&self) -> bool {
		self.kind.get() == TransitionKind::RouteChanged
	}

	/// Only the path changed.
	pub fn param_changed(&self) -> bool {
		self.kind.get() == TransitionKind::ParamChanged
	}

	/// Only the query or hash changed.
	pub fn query_changed(&self) -> bool {
		self.kind.get() == TransitionKind::QueryChanged
	}

	/// Query keys that changed. Empty unless [`TransitionFlags::query_changed`].
	pub fn diff_query(&self) -> BTreeSet<String> {
		self.diff_query.borrow().clone()
	}

	/// Whether an error was displayed when the transition started.
	pub fn had_error_before_transition(&self) -> bool {
		self.had_error.get()
	}

	/// Error generation when the transition started.
	pub fn date_of_last_error(&self) -> u64 {
		self.date_last_error.get()
	}

	pub(crate) fn classify(&self, kind: TransitionKind, diff_query: BTreeSet<String>) {
		self.kind.set(kind);
		*self.diff_query.borrow_mut() = diff_query;
	}

	pub(crate) fn pin_error_snapshot(&self, had_error: bool, generation: u64) {
		self.had_error.set(had_error);
		self.date_last_error.set(generation);
		self.snapshot_pinned.set(true);
	}

	/// Takes the snapshot unless one is pinned; either way the pin is released.
	pub(crate) fn record_error_snapshot(&self, had_error: bool, generation: u64) {
		if !self.snapshot_pinned.replace(false) {
			self.had_error.set(had_error);
			self.date_last_error.set(generation);
		}
	}
}

struct AppInner {
	bus: SignalBus,
	context: RefCell<Rc<SharedContext>>,
	context_generation: Cell<u64>,
	flags: TransitionFlags,
	config: AppConfig,
	router: Rc<Router>,
	renderer: Rc<dyn Renderer>,
	window: Rc<dyn PageEnvironment>,
	store: RefCell<Option<Rc<dyn Store>>>,
	error_handler: RefCell<Option<ErrorHandler>>,
	ready: Cell<bool>,
}

/// Handle to the running application.
#[derive(Clone)]
pub struct App {
	inner: Rc<AppInner>,
}

/// Non-owning handle to the application.
#[derive(Clone, Default)]
pub struct WeakApp {
	inner: Weak<AppInner>,
}

impl WeakApp {
	/// The app, if it is still alive.
	pub fn upgrade(&self) -> Option<App> {
		self.inner.upgrade().map(|inner| App { inner })
	}
}

impl fmt::Debug for WeakApp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WeakApp")
			.field("alive", &(self.inner.strong_count() > 0))
			.finish()
	}
}

impl App {
	/// Creates an app whose context describes the router's current route.
	///
	/// The bus starts without an error, so errors may be raised right away.
	pub fn new(
		router: Rc<Router>,
		renderer: Rc<dyn Renderer>,
		window: Rc<dyn PageEnvironment>,
		config: AppConfig,
	) -> Self {
		let inner = Rc::new_cyclic(|weak: &Weak<AppInner>| {
			let current = router.current_route();
			let context = SharedContext::new(
				WeakApp {
					inner: weak.clone(),
				},
				0,
				current.clone(),
				current,
				NavigationControl::new(),
			);
			AppInner {
				bus: SignalBus::new(),
				context: RefCell::new(Rc::new(context)),
				context_generation: Cell::new(0),
				flags: TransitionFlags::default(),
				config,
				router,
				renderer,
				window,
				store: RefCell::new(None),
				error_handler: RefCell::new(None),
				ready: Cell::new(false),
			}
		});
		Self { inner }
	}

	/// Non-owning handle.
	pub fn downgrade(&self) -> WeakApp {
		WeakApp {
			inner: Rc::downgrade(&self.inner),
		}
	}

	/// Whether both handles refer to the same app.
	pub fn ptr_eq(&self, other: &App) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}

	/// Error and event bus.
	pub fn bus(&self) -> &SignalBus {
		&self.inner.bus
	}

	/// Flags of the transition in flight.
	pub fn flags(&self) -> &TransitionFlags {
		&self.inner.flags
	}

	/// Configuration from the page payload.
	pub fn config(&self) -> &AppConfig {
		&self.inner.config
	}

	/// The router.
	pub fn router(&self) -> &Rc<Router> {
		&self.inner.router
	}

	/// The rendering collaborator.
	pub fn renderer(&self) -> &Rc<dyn Renderer> {
		&self.inner.renderer
	}

	/// The page.
	pub fn window(&self) -> &Rc<dyn PageEnvironment> {
		&self.inner.window
	}

	/// The attached state container.
	pub fn store(&self) -> Option<Rc<dyn Store>> {
		self.inner.store.borrow().clone()
	}

	/// Attaches the state container.
	pub fn attach_store(&self, store: Rc<dyn Store>) {
		store.attach(self);
		*self.inner.store.borrow_mut() = Some(store);
	}

	/// Current shared context.
	pub fn context(&self) -> Rc<SharedContext> {
		self.inner.context.borrow().clone()
	}

	/// Whether `context` is still the current one.
	pub fn is_current(&self, context: &SharedContext) -> bool {
		self.inner.context.borrow().generation() == context.generation()
	}

	pub(crate) fn next_context_generation(&self) -> u64 {
		let next = self.inner.context_generation.get() + 1;
		self.inner.context_generation.set(next);
		next
	}

	pub(crate) fn replace_context(&self, context: Rc<SharedContext>) {
		*self.inner.context.borrow_mut() = context;
	}

	/// Raises or clears the displayed error.
	///
	/// This is the only way to change the error. Raising an error equal to
	/// the current one does not notify watchers but still counts as a new
	/// raise for stale-error detection.
	pub fn error(&self, error: Option<ErrorState>) {
		if let Some(state) = &error {
			tracing::warn!(
				status_code = state.status_code,
				message = %state.message,
				"route error raised"
			);
		}
		if !self.inner.bus.raise(error) {
			tracing::debug!("error unchanged");
		}
	}

	/// Installs the global error handler.
	pub fn set_error_handler<F>(&self, handler: F)
	where
		F: Fn(&App, &NavigationError) + 'static,
	{
		*self.inner.error_handler.borrow_mut() = Some(Rc::new(handler));
	}

	pub(crate) fn set_shared_error_handler(&self, handler: ErrorHandler) {
		*self.inner.error_handler.borrow_mut() = Some(handler);
	}

	/// Forwards an error that escaped a guard to the global handler.
	pub fn handle_error(&self, error: &NavigationError) {
		let handler = self.inner.error_handler.borrow().clone();
		match handler {
			Some(handler) => handler(self, error),
			None => tracing::error!(
				kind = ?error.kind(),
				error = %error,
				"unhandled navigation error"
			),
		}
	}

	/// Whether the first mount finished and ready callbacks ran.
	pub fn is_ready(&self) -> bool {
		self.inner.ready.get()
	}

	pub(crate) fn mark_ready(&self) {
		self.inner.ready.set(true);
	}

	/// Whether the renderer is mounted.
	pub fn is_mounted(&self) -> bool {
		self.inner.renderer.is_mounted()
	}

	/// Tears the app down on page unload.
	pub fn unload(&self) {
		tracing::info!("application unloaded");
		self.inner.router.clear_hooks();
		self.inner.window.release();
		self.inner.ready.set(false);
	}
}

impl fmt::Debug for App {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("App")
			.field("route", &self.inner.router.current_route().full_path)
			.field("error", &self.inner.bus.error())
			.field("kind", &self.inner.flags.kind())
			.field("ready", &self.inner.ready.get())
			.finish()
	}
}
