//! Client-side router.
//!
//! ## Example
//!
//! ```ignore
//! use waypoint_client::router::{GuardOutcome, RouteRecord, Router};
//! use waypoint_client::component::ComponentDef;
//!
//! let router = Router::with_initial_path(
//!     vec![
//!         RouteRecord::named("home", "/", ComponentDef::new("home")),
//!         RouteRecord::named("user", "/users/{id}", ComponentDef::new("user")),
//!     ],
//!     "/",
//! );
//!
//! router.before_each(|to, _from| {
//!     if to.path == "/admin" {
//!         GuardOutcome::Redirect("/".to_string())
//!     } else {
//!         GuardOutcome::Continue
//!     }
//! });
//!
//! router.push("/users/42")?;
//! assert_eq!(router.current_route().param("id"), Some("42"));
//! ```

mod core;
mod history;
mod matcher;
mod route;

pub use self::core::{
	AfterHook, BeforeHook, DEFAULT_MAX_REDIRECTS, GuardOutcome, HookId, NavigationOutcome, Router,
	RouterError,
};
pub use history::{History, NavigationType, current_path};
pub use matcher::{PathMatch, PathPattern, RouteMatcher, RouteNode, SegmentMatcher};
pub use route::{DEFAULT_VIEW, MatchedRecord, RouteDescriptor, RouteRecord};
