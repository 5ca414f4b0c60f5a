//! Integration tests for application bootstrap
//!
//! These tests verify:
//! 1. A configured redirect is followed before the first mount
//! 2. A middleware redirect on the first route mounts on the target
//! 3. Ready callbacks and the app-loaded hook run once the app is ready
//! 4. A payload error survives the first mount and clears afterwards
//! 5. Store, error handler and failure paths are wired as configured

use rstest::rstest;
use serial_test::serial;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use waypoint_client::prelude::*;
use waypoint_client::render::RenderError;
use waypoint_client::{BootstrapError, ErrorState, RouteDescriptor};
use waypoint_reactive::pending_ticks;

/// Wraps [`HeadlessRenderer`] and records every rendered path.
#[derive(Default)]
struct RecordingRenderer {
	inner: HeadlessRenderer,
	paths: RefCell<Vec<String>>,
}

impl Renderer for RecordingRenderer {
	fn mount(&self, target: &str) -> Result<(), RenderError> {
		self.inner.mount(target)
	}

	fn is_mounted(&self) -> bool {
		self.inner.is_mounted()
	}

	fn apply_route(&self, route: &RouteDescriptor, components: &[ComponentRef]) {
		self.paths.borrow_mut().push(route.full_path.clone());
		self.inner.apply_route(route, components);
	}
}

struct CountingStore {
	attached: Rc<Cell<u32>>,
}

impl Store for CountingStore {
	fn attach(&self, app: &App) {
		assert!(!app.is_mounted());
		self.attached.set(self.attached.get() + 1);
	}
}

fn routes() -> Vec<RouteRecord> {
	vec![
		RouteRecord::named("home", "/", ComponentDef::new("home")),
		RouteRecord::named("b", "/b", ComponentDef::new("b")),
		RouteRecord::named("login", "/login", ComponentDef::new("login")),
	]
}

fn router() -> Router {
	Router::with_initial_path(routes(), "/")
}

#[rstest]
#[serial]
fn test_configured_redirect_renders_only_target() {
	let renderer = Rc::new(RecordingRenderer::default());
	let window = Rc::new(MemoryWindow::new().with_payload_json(r#"{"config":{"redirect":"/b"}}"#));

	let app = Bootstrap::new(router(), renderer.clone(), window)
		.launch()
		.unwrap();
	assert!(!app.is_mounted());
	flush_ticks();

	assert!(app.is_ready());
	assert_eq!(*renderer.paths.borrow(), vec!["/b"]);
	assert_eq!(app.router().history().entries(), vec!["/", "/b"]);
	assert_eq!(app.router().current_route().path, "/b");
}

#[rstest]
#[serial]
fn test_native_launch_waits_for_host_flush() {
	let app = Bootstrap::new(router(), Rc::new(HeadlessRenderer::new()), Rc::new(MemoryWindow::new()))
		.launch()
		.unwrap();

	assert!(pending_ticks() > 0);
	assert!(!app.is_mounted());
	assert!(!app.is_ready());

	flush_ticks();

	assert_eq!(pending_ticks(), 0);
	assert!(app.is_mounted());
	assert!(app.is_ready());
}

#[rstest]
#[serial]
fn test_redirect_equal_to_current_path_is_ignored() {
	let renderer = Rc::new(RecordingRenderer::default());
	let window = Rc::new(MemoryWindow::new().with_payload_json(r#"{"config":{"redirect":"/"}}"#));

	let app = Bootstrap::new(router(), renderer.clone(), window)
		.launch()
		.unwrap();
	flush_ticks();

	assert_eq!(*renderer.paths.borrow(), vec!["/"]);
	assert_eq!(app.router().history().entries(), vec!["/"]);
}

#[rstest]
#[serial]
fn test_middleware_redirect_on_first_route() {
	let guarded = ComponentDef::new("home").with_middleware(|ctx| {
		ctx.redirect("/login");
		Ok(())
	});
	let router = Router::with_initial_path(
		vec![
			RouteRecord::named("home", "/", guarded),
			RouteRecord::named("login", "/login", ComponentDef::new("login")),
		],
		"/",
	);
	let renderer = Rc::new(RecordingRenderer::default());

	let app = Bootstrap::new(router, renderer.clone(), Rc::new(MemoryWindow::new()))
		.launch()
		.unwrap();
	flush_ticks();

	assert!(app.is_mounted());
	assert_eq!(app.router().current_route().path, "/login");
	assert_eq!(*renderer.paths.borrow(), vec!["/login"]);
}

#[rstest]
#[serial]
fn test_ready_callbacks_before_and_after_ready() {
	let window = Rc::new(MemoryWindow::new());
	let log = Rc::new(RefCell::new(Vec::new()));

	let early = log.clone();
	window
		.ready_callbacks()
		.push(move |app| early.borrow_mut().push(("early", app.is_ready())));
	assert_eq!(window.ready_callbacks().pending(), 1);

	let app = Bootstrap::new(router(), Rc::new(HeadlessRenderer::new()), window.clone())
		.launch()
		.unwrap();
	flush_ticks();
	assert_eq!(*log.borrow(), vec![("early", true)]);
	assert!(window.ready_callbacks().is_fired());

	let late = log.clone();
	window
		.ready_callbacks()
		.push(move |app| late.borrow_mut().push(("late", app.is_ready())));
	assert_eq!(log.borrow().len(), 1);
	flush_ticks();

	assert_eq!(*log.borrow(), vec![("early", true), ("late", true)]);
	assert!(app.is_ready());
}

#[rstest]
#[serial]
fn test_app_loaded_hook_receives_ready_app() {
	let seen = Rc::new(Cell::new(0));
	let counter = seen.clone();
	let window = Rc::new(MemoryWindow::new().with_app_loaded(move |app| {
		assert!(app.is_ready());
		assert!(app.is_mounted());
		counter.set(counter.get() + 1);
	}));

	let app = Bootstrap::new(router(), Rc::new(HeadlessRenderer::new()), window)
		.launch()
		.unwrap();
	flush_ticks();
	app.router().push("/b").unwrap();
	flush_ticks();

	assert_eq!(seen.get(), 1);
}

#[rstest]
#[serial]
fn test_payload_error_survives_first_mount() {
	let window = Rc::new(
		MemoryWindow::new()
			.with_payload_json(r#"{"error":{"statusCode":503,"message":"maintenance"}}"#),
	);

	let app = Bootstrap::new(router(), Rc::new(HeadlessRenderer::new()), window)
		.launch()
		.unwrap();
	assert_eq!(app.bus().error(), Some(ErrorState::new(503, "maintenance")));
	flush_ticks();
	assert_eq!(app.bus().error(), Some(ErrorState::new(503, "maintenance")));

	app.router().push("/b").unwrap();
	flush_ticks();
	assert!(app.bus().error().is_none());
}

#[rstest]
#[serial]
fn test_ready_event_emitted_once() {
	let app = Bootstrap::new(router(), Rc::new(HeadlessRenderer::new()), Rc::new(MemoryWindow::new()))
		.launch()
		.unwrap();
	let events = Rc::new(RefCell::new(Vec::new()));
	let log = events.clone();
	app.bus().on(move |event| log.borrow_mut().push(event.name()));

	flush_ticks();
	app.router().push("/b").unwrap();
	flush_ticks();

	assert_eq!(*events.borrow(), vec!["ready", "routeChanged"]);
}

#[rstest]
#[serial]
fn test_store_attached_before_first_transition() {
	let attached = Rc::new(Cell::new(0));
	let app = Bootstrap::new(router(), Rc::new(HeadlessRenderer::new()), Rc::new(MemoryWindow::new()))
		.with_store(CountingStore {
			attached: attached.clone(),
		})
		.launch()
		.unwrap();

	assert_eq!(attached.get(), 1);
	assert!(app.store().is_some());
	flush_ticks();
	assert_eq!(attached.get(), 1);
}

#[rstest]
#[serial]
fn test_middleware_failure_goes_to_error_handler() {
	let handled = Rc::new(RefCell::new(Vec::new()));
	let log = handled.clone();
	let broken = ComponentDef::new("broken")
		.with_middleware(|_| Err(NavigationError::Unhandled("store offline".into())));
	let router = Router::with_initial_path(
		vec![
			RouteRecord::named("home", "/", ComponentDef::new("home")),
			RouteRecord::named("broken", "/broken", broken),
		],
		"/",
	);

	let app = Bootstrap::new(router, Rc::new(HeadlessRenderer::new()), Rc::new(MemoryWindow::new()))
		.with_error_handler(move |_, err| log.borrow_mut().push(err.to_string()))
		.launch()
		.unwrap();
	flush_ticks();
	let outcome = app.router().push("/broken").unwrap();
	flush_ticks();

	assert!(matches!(outcome, NavigationOutcome::Completed(_)));
	assert_eq!(
		*handled.borrow(),
		vec!["unhandled navigation error: store offline"]
	);
	assert!(app.bus().error().is_none());
}

#[rstest]
#[serial]
fn test_malformed_payload_releases_window() {
	let window = Rc::new(MemoryWindow::new().with_payload_json("not json"));

	let err = Bootstrap::new(router(), Rc::new(HeadlessRenderer::new()), window.clone())
		.launch()
		.unwrap_err();

	assert!(matches!(err, BootstrapError::PayloadParse(_)));
	assert!(window.claim());
}

#[rstest]
#[serial]
fn test_invalid_initial_redirect_is_logged() {
	// Arrange
	/// A tracing layer that captures log messages to a Vec<String>
	struct LogCapture {
		logs: Arc<Mutex<Vec<String>>>,
	}

	impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for LogCapture {
		fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
			struct MessageVisitor {
				message: String,
			}

			impl tracing::field::Visit for MessageVisitor {
				fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
					if field.name() == "message" {
						self.message = format!("{:?}", value);
					}
				}
			}

			let mut visitor = MessageVisitor {
				message: String::new(),
			};
			event.record(&mut visitor);

			let mut logs = self.logs.lock().unwrap();
			logs.push(format!("[{}] {}", event.metadata().level(), visitor.message));
		}
	}

	let logs = Arc::new(Mutex::new(Vec::new()));
	let capture = LogCapture { logs: logs.clone() };
	let _guard = tracing_subscriber::registry().with(capture).set_default();

	let window =
		Rc::new(MemoryWindow::new().with_payload_json(r#"{"config":{"redirect":"relative"}}"#));

	// Act
	let app = Bootstrap::new(router(), Rc::new(HeadlessRenderer::new()), window)
		.launch()
		.unwrap();
	flush_ticks();

	// Assert
	assert!(!app.is_mounted());
	let captured = logs.lock().unwrap();
	let has_error = captured
		.iter()
		.any(|log| log.contains("ERROR") && log.contains("initial redirect failed"));
	assert!(
		has_error,
		"Expected error log for invalid redirect, but got: {:?}",
		*captured
	);
}
