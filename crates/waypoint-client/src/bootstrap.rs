//! One-time application bootstrap.
//!
//! [`Bootstrap::launch`] builds the [`App`], raises the payload error,
//! registers the guard pipeline and schedules the first transition. Mounting
//! happens on later ticks:
//!
//! 1. tick 1: the RENDER guard runs for the current route. A redirect (from
//!    `config.redirect` or from middleware) is pushed and the app mounts once
//!    the router commits it; otherwise the app mounts right away.
//! 2. mount: normalize components, clear a stale error, mount, render the
//!    route and register the after hooks (normalize, render, refresh).
//! 3. the tick after mounting: mark ready, run ready callbacks and the
//!    test-harness hook, and start emitting `routeChanged`.
//!
//! In the browser, `launch` installs the micro-task scheduler of
//! `waypoint-reactive`, so these ticks run on their own. Native hosts have
//! no scheduler and call [`flush_ticks`](waypoint_reactive::flush_ticks)
//! themselves.

use std::cell::Cell;
use std::rc::Rc;
use waypoint_reactive::next_tick;

use crate::app::{App, ErrorHandler};
use crate::bus::BusEvent;
use crate::error::NavigationError;
use crate::guards::{self, register_guards};
use crate::refresh::{check_for_errors, refresh_after_transition};
use crate::render::{RenderError, Renderer};
use crate::resolver::{normalize_components, resolve_components};
use crate::router::{GuardOutcome, HookId, NavigationOutcome, Router, RouterError};
use crate::store::{NoopStore, Store};
use crate::window::PageEnvironment;

/// Error type for bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BootstrapError {
	/// The page payload is not valid JSON of the expected shape.
	#[error("failed to parse page payload: {0}")]
	PayloadParse(String),
	/// No element matches the configured mount target.
	#[error("mount target {0} not found")]
	MountTargetMissing(String),
	/// The page already runs an application.
	#[error("application already bootstrapped")]
	AlreadyBootstrapped,
	/// Routing failed.
	#[error(transparent)]
	Router(#[from] RouterError),
	/// Mounting failed.
	#[error(transparent)]
	Render(#[from] RenderError),
}

/// Builder for the one-time bootstrap.
///
/// # Example
///
/// ```ignore
/// let app = Bootstrap::new(router, Rc::new(HeadlessRenderer::new()), Rc::new(MemoryWindow::new()))
///     .with_store(MyStore::default())
///     .launch()?;
/// flush_ticks();
/// assert!(app.is_ready());
/// ```
pub struct Bootstrap {
	router: Router,
	renderer: Rc<dyn Renderer>,
	window: Rc<dyn PageEnvironment>,
	store: Rc<dyn Store>,
	error_handler: Option<ErrorHandler>,
}

impl Bootstrap {
	/// Creates a bootstrap for `router`, rendering with `renderer` into `window`.
	pub fn new(router: Router, renderer: Rc<dyn Renderer>, window: Rc<dyn PageEnvironment>) -> Self {
		Self {
			router,
			renderer,
			window,
			store: Rc::new(NoopStore),
			error_handler: None,
		}
	}

	/// Sets the state container.
	pub fn with_store<S>(mut self, store: S) -> Self
	where
		S: Store + 'static,
	{
		self.store = Rc::new(store);
		self
	}

	/// Sets the global error handler.
	pub fn with_error_handler<F>(mut self, handler: F) -> Self
	where
		F: Fn(&App, &NavigationError) + 'static,
	{
		self.error_handler = Some(Rc::new(handler));
		self
	}

	/// Builds the app and schedules the first transition.
	///
	/// The returned handle owns the app; router hooks only hold weak
	/// references, so dropping every handle stops the pipeline.
	pub fn launch(self) -> Result<App, BootstrapError> {
		self.try_launch().inspect_err(|err| {
			tracing::error!(error = %err, "bootstrap failed");
		})
	}

	fn try_launch(self) -> Result<App, BootstrapError> {
		let window = self.window;
		if !window.claim() {
			return Err(BootstrapError::AlreadyBootstrapped);
		}

		let payload = match window.payload() {
			Ok(payload) => payload,
			Err(err) => {
				window.release();
				return Err(err);
			}
		};
		let config = payload.config;
		if !window.has_mount_target(&config.mount_target) {
			window.release();
			return Err(BootstrapError::MountTargetMissing(config.mount_target));
		}

		self.router.set_max_redirects(config.max_redirects);
		let app = App::new(Rc::new(self.router), self.renderer, window, config);
		if let Some(handler) = self.error_handler {
			app.set_shared_error_handler(handler);
		}
		app.attach_store(self.store);

		let keep_payload_error = payload.error.is_some();
		if let Some(raw) = payload.error {
			app.error(Some(raw.to_error_state()));
		}

		register_guards(&app);

		// Natively the host drives `flush_ticks`; in the browser a micro-task does
		#[cfg(all(target_family = "wasm", target_os = "unknown"))]
		waypoint_reactive::install_microtask_scheduler();

		let weak = app.downgrade();
		next_tick(move || {
			if let Some(app) = weak.upgrade() {
				first_transition(&app, keep_payload_error);
			}
		});

		tracing::info!(
			route = %app.router().current_route().full_path,
			"bootstrap scheduled"
		);
		Ok(app)
	}
}

fn first_transition(app: &App, keep_payload_error: bool) {
	let router = app.router().clone();
	let current = router.current_route();

	let configured = app
		.config()
		.redirect
		.clone()
		.filter(|path| *path != current.full_path);
	let redirect = match configured {
		Some(path) => Some(path),
		None => match guards::render(app, &current, &current) {
			GuardOutcome::Redirect(path) => Some(path),
			GuardOutcome::Continue | GuardOutcome::Abort => None,
		},
	};

	let Some(path) = redirect else {
		mount(app, keep_payload_error);
		return;
	};

	tracing::debug!(to = %path, "first transition redirected");
	let slot: Rc<Cell<Option<HookId>>> = Rc::new(Cell::new(None));
	let hook = slot.clone();
	let weak = app.downgrade();
	let id = router.after_each(move |_, _| {
		let Some(id) = hook.take() else {
			return;
		};
		if let Some(app) = weak.upgrade() {
			app.router().remove_hook(id);
			mount(&app, keep_payload_error);
		}
	});
	slot.set(Some(id));

	match router.push(&path) {
		Ok(NavigationOutcome::Aborted) => {
			tracing::warn!(to = %path, "initial redirect aborted, application not mounted");
		}
		Ok(_) => {}
		Err(err) => {
			tracing::error!(to = %path, error = %err, "initial redirect failed");
		}
	}
}

fn mount(app: &App, keep_payload_error: bool) {
	let route = app.router().current_route();
	normalize_components(&route);
	if !keep_payload_error {
		check_for_errors(app);
	}

	let target = app.config().mount_target.clone();
	if let Err(err) = app.renderer().mount(&target) {
		tracing::error!(mount_target = %target, error = %err, "mount failed");
		return;
	}
	app.renderer().apply_route(&route, &resolve_components(&route));

	let router = app.router();
	router.after_each(|to, _| normalize_components(to));
	let weak = app.downgrade();
	router.after_each(move |to, _| {
		if let Some(app) = weak.upgrade() {
			app.renderer().apply_route(to, &resolve_components(to));
		}
	});
	let weak = app.downgrade();
	router.after_each(move |to, _| {
		if let Some(app) = weak.upgrade() {
			refresh_after_transition(&app, to);
		}
	});

	let weak = app.downgrade();
	next_tick(move || {
		if let Some(app) = weak.upgrade() {
			ready(&app);
		}
	});
}

fn ready(app: &App) {
	app.mark_ready();
	app.bus().emit(BusEvent::Ready);
	app.window().ready_callbacks().fire(app);
	if let Some(hook) = app.window().on_app_loaded() {
		hook(app);
	}

	let weak = app.downgrade();
	app.router().after_each(move |to, from| {
		let weak = weak.clone();
		let to = to.clone();
		let from = from.clone();
		next_tick(move || {
			if let Some(app) = weak.upgrade() {
				app.bus().emit(BusEvent::RouteChanged { to, from });
			}
		});
	});
	tracing::info!("application ready");
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::component::ComponentDef;
	use crate::render::HeadlessRenderer;
	use crate::router::RouteRecord;
	use crate::window::MemoryWindow;
	use rstest::rstest;
	use serial_test::serial;
	use waypoint_reactive::flush_ticks;

	fn router() -> Router {
		Router::with_initial_path(
			vec![RouteRecord::named("home", "/", ComponentDef::new("home"))],
			"/",
		)
	}

	#[rstest]
	#[serial]
	fn test_launch_mounts_after_ticks() {
		let renderer = Rc::new(HeadlessRenderer::new());
		let app = Bootstrap::new(router(), renderer.clone(), Rc::new(MemoryWindow::new()))
			.launch()
			.unwrap();

		assert!(!app.is_mounted());
		flush_ticks();

		assert!(app.is_mounted());
		assert!(app.is_ready());
		assert_eq!(renderer.target().as_deref(), Some("#__waypoint"));
		assert_eq!(renderer.render_count(), 1);
		assert_eq!(app.router().hook_counts(), (2, 4));
	}

	#[rstest]
	#[serial]
	fn test_missing_mount_target() {
		let window = Rc::new(MemoryWindow::new().with_targets(["#other"]));
		let err = Bootstrap::new(router(), Rc::new(HeadlessRenderer::new()), window.clone())
			.launch()
			.unwrap_err();

		assert_eq!(
			err,
			BootstrapError::MountTargetMissing("#__waypoint".to_string())
		);
		assert!(window.claim());
	}

	#[rstest]
	#[serial]
	fn test_second_launch_on_same_window_fails() {
		let window = Rc::new(MemoryWindow::new());
		let _app = Bootstrap::new(router(), Rc::new(HeadlessRenderer::new()), window.clone())
			.launch()
			.unwrap();
		let err = Bootstrap::new(router(), Rc::new(HeadlessRenderer::new()), window)
			.launch()
			.unwrap_err();

		assert_eq!(err, BootstrapError::AlreadyBootstrapped);
		flush_ticks();
	}

	#[rstest]
	#[serial]
	fn test_unload_releases_window_and_hooks() {
		let window = Rc::new(MemoryWindow::new());
		let app = Bootstrap::new(router(), Rc::new(HeadlessRenderer::new()), window.clone())
			.launch()
			.unwrap();
		flush_ticks();

		app.unload();

		assert_eq!(app.router().hook_counts(), (0, 0));
		assert!(!app.is_ready());
		assert!(window.claim());
	}
}
