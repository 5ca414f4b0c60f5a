//! Page environment.
//!
//! Everything bootstrap needs from the page: the payload delivered with it,
//! the mount element, a full reload, and the ready-callback list page
//! scripts push onto. [`MemoryWindow`] serves native builds and tests;
//! [`WebWindow`] talks to the browser.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;
use waypoint_reactive::next_tick;

use crate::app::{App, WeakApp};
use crate::bootstrap::BootstrapError;
use crate::config::{DEFAULT_MOUNT_TARGET, PagePayload};

/// Callback run once the app is ready.
pub type ReadyCallback = Box<dyn FnOnce(&App)>;

/// Hook test harnesses install to receive the app after it loads.
pub type AppLoadedHook = Rc<dyn Fn(&App)>;

/// Callbacks page scripts register before or after bootstrap.
///
/// Callbacks pushed before readiness run when the app becomes ready, in push
/// order. Callbacks pushed afterwards run on the next tick.
#[derive(Default)]
pub struct ReadyCallbacks {
	queued: RefCell<Vec<ReadyCallback>>,
	app: RefCell<Option<WeakApp>>,
}

impl ReadyCallbacks {
	/// Creates an empty list.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a callback.
	pub fn push<F>(&self, callback: F)
	where
		F: FnOnce(&App) + 'static,
	{
		let ready = self.app.borrow().clone();
		match ready {
			Some(weak) => next_tick(move || {
				if let Some(app) = weak.upgrade() {
					callback(&app);
				}
			}),
			None => self.queued.borrow_mut().push(Box::new(callback)),
		}
	}

	/// Number of callbacks waiting for readiness.
	pub fn pending(&self) -> usize {
		self.queued.borrow().len()
	}

	/// Whether [`ReadyCallbacks::fire`] already ran.
	pub fn is_fired(&self) -> bool {
		self.app.borrow().is_some()
	}

	/// Runs every queued callback with `app`.
	pub(crate) fn fire(&self, app: &App) {
		*self.app.borrow_mut() = Some(app.downgrade());
		let queued = std::mem::take(&mut *self.queued.borrow_mut());
		tracing::debug!(count = queued.len(), "firing ready callbacks");
		for callback in queued {
			callback(app);
		}
	}

	pub(crate) fn reset(&self) {
		self.app.borrow_mut().take();
	}
}

impl fmt::Debug for ReadyCallbacks {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ReadyCallbacks")
			.field("pending", &self.pending())
			.field("fired", &self.is_fired())
			.finish()
	}
}

/// The page the application boots into.
pub trait PageEnvironment {
	/// Payload delivered with the page.
	fn payload(&self) -> Result<PagePayload, BootstrapError>;

	/// Reloads the whole page.
	fn reload(&self);

	/// Whether an element matches `selector`.
	fn has_mount_target(&self, selector: &str) -> bool;

	/// Ready callbacks registered by page scripts.
	fn ready_callbacks(&self) -> &ReadyCallbacks;

	/// Test-harness hook, if installed.
	fn on_app_loaded(&self) -> Option<AppLoadedHook>;

	/// Marks the page as booted. Returns `false` if it already was.
	fn claim(&self) -> bool;

	/// Releases the page on unload.
	fn release(&self);
}

enum PayloadSource {
	Parsed(PagePayload),
	Json(String),
}

/// In-memory page for native builds and tests.
pub struct MemoryWindow {
	payload: PayloadSource,
	targets: BTreeSet<String>,
	reloads: Cell<usize>,
	claimed: Cell<bool>,
	ready: ReadyCallbacks,
	app_loaded: Option<AppLoadedHook>,
}

impl Default for MemoryWindow {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryWindow {
	/// Creates a page with an empty payload and the default mount element.
	pub fn new() -> Self {
		Self {
			payload: PayloadSource::Parsed(PagePayload::default()),
			targets: BTreeSet::from([DEFAULT_MOUNT_TARGET.to_string()]),
			reloads: Cell::new(0),
			claimed: Cell::new(false),
			ready: ReadyCallbacks::new(),
			app_loaded: None,
		}
	}

	/// Sets the payload.
	pub fn with_payload(mut self, payload: PagePayload) -> Self {
		self.payload = PayloadSource::Parsed(payload);
		self
	}

	/// Sets the payload as raw JSON, parsed at bootstrap.
	pub fn with_payload_json(mut self, json: impl Into<String>) -> Self {
		self.payload = PayloadSource::Json(json.into());
		self
	}

	/// Replaces the set of elements present on the page.
	pub fn with_targets<I, S>(mut self, targets: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.targets = targets.into_iter().map(Into::into).collect();
		self
	}

	/// Installs the test-harness hook.
	pub fn with_app_loaded<F>(mut self, hook: F) -> Self
	where
		F: Fn(&App) + 'static,
	{
		self.app_loaded = Some(Rc::new(hook));
		self
	}

	/// Number of reloads requested.
	pub fn reloads(&self) -> usize {
		self.reloads.get()
	}
}

impl fmt::Debug for MemoryWindow {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MemoryWindow")
			.field("targets", &self.targets)
			.field("reloads", &self.reloads.get())
			.field("claimed", &self.claimed.get())
			.finish()
	}
}

impl PageEnvironment for MemoryWindow {
	fn payload(&self) -> Result<PagePayload, BootstrapError> {
		match &self.payload {
			PayloadSource::Parsed(payload) => Ok(payload.clone()),
			PayloadSource::Json(json) => PagePayload::from_json(json)
				.map_err(|err| BootstrapError::PayloadParse(err.to_string())),
		}
	}

	fn reload(&self) {
		tracing::info!("page reload requested");
		self.reloads.set(self.reloads.get() + 1);
	}

	fn has_mount_target(&self, selector: &str) -> bool {
		self.targets.contains(selector)
	}

	fn ready_callbacks(&self) -> &ReadyCallbacks {
		&self.ready
	}

	fn on_app_loaded(&self) -> Option<AppLoadedHook> {
		self.app_loaded.clone()
	}

	fn claim(&self) -> bool {
		!self.claimed.replace(true)
	}

	fn release(&self) {
		self.claimed.set(false);
		self.ready.reset();
	}
}

/// Name of the global the page payload is delivered in.
pub const PAYLOAD_GLOBAL: &str = "__WAYPOINT__";

/// The browser page.
#[cfg(all(target_family = "wasm", target_os = "unknown"))]
#[derive(Default)]
pub struct WebWindow {
	claimed: Cell<bool>,
	ready: ReadyCallbacks,
	app_loaded: Option<AppLoadedHook>,
}

#[cfg(all(target_family = "wasm", target_os = "unknown"))]
impl WebWindow {
	/// Creates a handle to the browser page.
	pub fn new() -> Self {
		Self::default()
	}

	/// Installs the test-harness hook.
	pub fn with_app_loaded<F>(mut self, hook: F) -> Self
	where
		F: Fn(&App) + 'static,
	{
		self.app_loaded = Some(Rc::new(hook));
		self
	}
}

#[cfg(all(target_family = "wasm", target_os = "unknown"))]
impl PageEnvironment for WebWindow {
	fn payload(&self) -> Result<PagePayload, BootstrapError> {
		let window = web_sys::window()
			.ok_or_else(|| BootstrapError::PayloadParse("window not available".to_string()))?;
		let Some(global) = window.get(PAYLOAD_GLOBAL) else {
			return Ok(PagePayload::default());
		};
		if global.is_undefined() || global.is_null() {
			return Ok(PagePayload::default());
		}

		let json = js_sys::JSON::stringify(&global)
			.map_err(|_| BootstrapError::PayloadParse("failed to stringify payload".to_string()))?
			.as_string()
			.ok_or_else(|| {
				BootstrapError::PayloadParse("payload is not representable as a string".to_string())
			})?;
		PagePayload::from_json(&json).map_err(|err| BootstrapError::PayloadParse(err.to_string()))
	}

	fn reload(&self) {
		let Some(window) = web_sys::window() else {
			return;
		};
		if let Err(err) = window.location().reload() {
			tracing::error!(error = ?err, "page reload failed");
		}
	}

	fn has_mount_target(&self, selector: &str) -> bool {
		web_sys::window()
			.and_then(|window| window.document())
			.and_then(|document| document.query_selector(selector).ok().flatten())
			.is_some()
	}

	fn ready_callbacks(&self) -> &ReadyCallbacks {
		&self.ready
	}

	fn on_app_loaded(&self) -> Option<AppLoadedHook> {
		self.app_loaded.clone()
	}

	fn claim(&self) -> bool {
		!self.claimed.replace(true)
	}

	fn release(&self) {
		self.claimed.set(false);
		self.ready.reset();
	}
}
