//! Waypoint Client - bootstrap and navigation pipeline
//!
//! This crate boots a component-tree single-page application into a page and
//! keeps it in step with the router:
//!
//! - **Bootstrap**: one-time launch that resolves the initial route (following
//!   an initial redirect) before anything is mounted
//! - **Guards**: LOAD and RENDER before hooks run on every transition
//! - **Refresh**: reused component instances get their data re-run after a
//!   transition, and a stale error page is cleared
//! - **Bus**: the current error and lifecycle events (`routeChanged`,
//!   `triggerScroll`, `ready`)
//!
//! ## Architecture
//!
//! ```text
//! Bootstrap ──> App ──┬─> SignalBus (error, events)
//!                     ├─> SharedContext (replaced per transition)
//!                     ├─> Router ──> before: load_async_components, render
//!                     │          └─> after: normalize, apply_route, refresh
//!                     ├─> Renderer
//!                     └─> PageEnvironment (payload, reload, ready callbacks)
//! ```
//!
//! Everything runs on one thread. Deferred work goes through the tick queue
//! of `waypoint-reactive`. In the browser, [`Bootstrap::launch`] installs a
//! micro-task scheduler that drains it. Native hosts (servers, tests) have no
//! host scheduler and must drive the queue themselves with
//! [`flush_ticks`](waypoint_reactive::flush_ticks); until then nothing
//! mounts.
//!
//! ## Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use waypoint_client::prelude::*;
//!
//! let router = Router::with_initial_path(
//!     vec![
//!         RouteRecord::named("home", "/", ComponentDef::new("home")),
//!         RouteRecord::named("user", "/users/{id}", ComponentDef::new("user")),
//!     ],
//!     "/",
//! );
//! let window = Rc::new(MemoryWindow::new());
//! window.ready_callbacks().push(|app| tracing::info!(?app, "ready"));
//!
//! let app = Bootstrap::new(router, Rc::new(HeadlessRenderer::new()), window).launch()?;
//! flush_ticks();
//!
//! app.router().push("/users/42")?;
//! flush_ticks();
//! ```

#![warn(missing_docs)]

pub mod app;
pub mod bootstrap;
pub mod bus;
pub mod component;
pub mod config;
pub mod context;
pub mod error;
pub mod guards;
pub mod query;
pub mod refresh;
pub mod render;
pub mod resolver;
pub mod router;
pub mod store;
pub mod window;

pub use app::{App, ErrorHandler, TransitionFlags, TransitionKind, WeakApp};
pub use bootstrap::{Bootstrap, BootstrapError};
pub use bus::{BusEvent, ListenerId, SignalBus};
pub use component::{
	ComponentDef, ComponentInstance, ComponentRef, DataMap, PendingComponent, ReactiveState,
	ResolvedComponent,
};
pub use config::{AppConfig, PagePayload};
pub use context::{NavigationControl, SharedContext, snapshot_errors, synchronize};
pub use error::{ErrorKind, ErrorState, NavigationError, RawError};
pub use query::{QueryMap, diff_query};
pub use refresh::{check_for_errors, refresh_after_transition};
pub use render::{HeadlessRenderer, RenderError, Renderer};
pub use resolver::{normalize_components, resolve_components};
pub use router::{
	GuardOutcome, NavigationOutcome, RouteDescriptor, RouteRecord, Router, RouterError,
};
pub use store::{NoopStore, Store};
pub use window::{MemoryWindow, PageEnvironment, ReadyCallbacks};
#[cfg(all(target_family = "wasm", target_os = "unknown"))]
pub use window::WebWindow;

/// Common imports.
pub mod prelude {
	pub use crate::{
		App, AppConfig, Bootstrap, BootstrapError, BusEvent, ComponentDef, ComponentRef,
		ErrorState, GuardOutcome, HeadlessRenderer, MemoryWindow, NavigationError,
		NavigationOutcome, PageEnvironment, RawError, Renderer, RouteRecord, Router, Store,
	};
	pub use waypoint_reactive::{flush_ticks, next_tick};
}
