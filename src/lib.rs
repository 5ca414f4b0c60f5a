//! # Waypoint
//!
//! Client-side bootstrap and navigation guard pipeline for component-tree
//! single-page applications.
//!
//! Waypoint takes a page delivered with a serialized payload, resolves the
//! initial route (following a configured or middleware redirect), mounts the
//! root view and then runs every later navigation through a fixed guard
//! pipeline. Reused component instances get their data refreshed after each
//! transition and a stale error page is cleared once the user navigates away
//! from it.
//!
//! ## Feature Flags
//!
//! - `reactive` - Signals, watchers and the tick queue
//! - `client` (default) - Bootstrap, router and guard pipeline
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use std::rc::Rc;
//! use waypoint::prelude::*;
//!
//! let router = Router::new(vec![
//!     RouteRecord::named("home", "/", ComponentDef::new("home")),
//!     RouteRecord::named("admin", "/admin", ComponentDef::new("admin").with_middleware(|ctx| {
//!         ctx.redirect("/login");
//!         Ok(())
//!     })),
//!     RouteRecord::named("login", "/login", ComponentDef::new("login")),
//! ]);
//!
//! let app = Bootstrap::new(router, Rc::new(HeadlessRenderer::new()), Rc::new(MemoryWindow::new()))
//!     .launch()?;
//! flush_ticks();
//!
//! app.router().push("/admin")?;
//! assert_eq!(app.router().current_route().path, "/login");
//! ```

#[cfg(feature = "client")]
pub mod client;
#[cfg(feature = "reactive")]
pub mod reactive;

// Re-export the pipeline entry points
#[cfg(feature = "client")]
pub use waypoint_client::{
	App, AppConfig, Bootstrap, BootstrapError, BusEvent, ErrorState, NavigationError,
	PagePayload, RouteRecord, Router,
};

// Re-export runtime primitives
#[cfg(feature = "reactive")]
pub use waypoint_reactive::{Completion, Signal, flush_ticks, next_tick};

/// Common imports
pub mod prelude {
	#[cfg(feature = "client")]
	pub use waypoint_client::prelude::*;

	#[cfg(feature = "reactive")]
	pub use waypoint_reactive::{Signal, flush_ticks, next_tick};
}
