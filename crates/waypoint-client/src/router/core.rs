//! Core Router Implementation.
//!
//! The router owns the route table, the current route and the before/after
//! hook lists. Before hooks return a [`GuardOutcome`]; the driver in
//! [`Router::push`] interprets it.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use waypoint_reactive::NodeId;

use super::history::{self, History, NavigationType};
use super::matcher::{RouteMatcher, RouteNode, SegmentMatcher};
use super::route::{RouteDescriptor, RouteRecord};
use crate::query::Location;

/// Default bound on consecutive redirects within one navigation.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// What a before hook decided about a transition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GuardOutcome {
	/// Let the next hook run.
	#[default]
	Continue,
	/// Restart the navigation toward another path.
	Redirect(String),
	/// Stop the navigation; the current route stays.
	Abort,
}

impl GuardOutcome {
	/// Whether this outcome lets the chain proceed.
	pub fn is_continue(&self) -> bool {
		matches!(self, Self::Continue)
	}
}

/// Hook run before a transition commits.
pub type BeforeHook = Rc<dyn Fn(&Rc<RouteDescriptor>, &Rc<RouteDescriptor>) -> GuardOutcome>;

/// Hook run after a transition commits.
pub type AfterHook = Rc<dyn Fn(&Rc<RouteDescriptor>, &Rc<RouteDescriptor>)>;

/// Identifies a registered hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(NodeId);

/// How a navigation ended.
#[derive(Debug, Clone)]
pub enum NavigationOutcome {
	/// The requested route is now current.
	Completed(Rc<RouteDescriptor>),
	/// A guard redirected; `route` is now current.
	Redirected {
		/// Path originally requested.
		requested: String,
		/// Route that was committed.
		route: Rc<RouteDescriptor>,
	},
	/// A guard aborted; the current route did not change.
	Aborted,
}

impl NavigationOutcome {
	/// The committed route, unless aborted.
	pub fn route(&self) -> Option<&Rc<RouteDescriptor>> {
		match self {
			Self::Completed(route) | Self::Redirected { route, .. } => Some(route),
			Self::Aborted => None,
		}
	}
}

/// Error type for router operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
	/// Guards kept redirecting.
	#[error("redirect limit of {limit} exceeded while navigating to {path}")]
	RedirectLoop {
		/// Last redirect target.
		path: String,
		/// Configured limit.
		limit: usize,
	},
	/// Paths must be absolute.
	#[error("invalid navigation path: {0}")]
	InvalidPath(String),
}

/// The route table and navigation driver.
pub struct Router {
	routes: Vec<RouteNode>,
	matcher: Box<dyn RouteMatcher>,
	current: RefCell<Rc<RouteDescriptor>>,
	before: RefCell<Vec<(HookId, BeforeHook)>>,
	after: RefCell<Vec<(HookId, AfterHook)>>,
	history: History,
	max_redirects: Cell<usize>,
}

impl fmt::Debug for Router {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Router")
			.field("routes_count", &self.routes.len())
			.field("current", &self.current.borrow().full_path)
			.field("before_hooks", &self.before.borrow().len())
			.field("after_hooks", &self.after.borrow().len())
			.finish()
	}
}

impl Router {
	/// Creates a router whose current route is the page's path.
	pub fn new(routes: Vec<RouteRecord>) -> Self {
		Self::with_matcher(routes, SegmentMatcher, &history::current_path())
	}

	/// Creates a router starting at `initial_path`.
	pub fn with_initial_path(routes: Vec<RouteRecord>, initial_path: &str) -> Self {
		Self::with_matcher(routes, SegmentMatcher, initial_path)
	}

	/// Creates a router with a custom matcher.
	pub fn with_matcher<M>(routes: Vec<RouteRecord>, matcher: M, initial_path: &str) -> Self
	where
		M: RouteMatcher + 'static,
	{
		let routes: Vec<RouteNode> = routes
			.iter()
			.map(|record| RouteNode::compile("", record))
			.collect();
		let matcher: Box<dyn RouteMatcher> = Box::new(matcher);
		let current = Rc::new(build_descriptor(&routes, matcher.as_ref(), initial_path));
		Self {
			history: History::new(current.full_path.clone()),
			routes,
			matcher,
			current: RefCell::new(current),
			before: RefCell::new(Vec::new()),
			after: RefCell::new(Vec::new()),
			max_redirects: Cell::new(DEFAULT_MAX_REDIRECTS),
		}
	}

	/// Compiled route tree.
	pub fn routes(&self) -> &[RouteNode] {
		&self.routes
	}

	/// Resolves a full path without navigating.
	pub fn resolve(&self, full_path: &str) -> Rc<RouteDescriptor> {
		Rc::new(build_descriptor(
			&self.routes,
			self.matcher.as_ref(),
			full_path,
		))
	}

	/// The committed route.
	pub fn current_route(&self) -> Rc<RouteDescriptor> {
		self.current.borrow().clone()
	}

	/// Committed history.
	pub fn history(&self) -> &History {
		&self.history
	}

	/// Sets the redirect bound.
	pub fn set_max_redirects(&self, limit: usize) {
		self.max_redirects.set(limit);
	}

	/// Registers a before hook. Hooks run in registration order.
	pub fn before_each<F>(&self, guard: F) -> HookId
	where
		F: Fn(&Rc<RouteDescriptor>, &Rc<RouteDescriptor>) -> GuardOutcome + 'static,
	{
		let id = HookId(NodeId::new());
		self.before.borrow_mut().push((id, Rc::new(guard)));
		id
	}

	/// Registers an after hook. Hooks run in registration order.
	pub fn after_each<F>(&self, hook: F) -> HookId
	where
		F: Fn(&Rc<RouteDescriptor>, &Rc<RouteDescriptor>) + 'static,
	{
		let id = HookId(NodeId::new());
		self.after.borrow_mut().push((id, Rc::new(hook)));
		id
	}

	/// Removes a hook. Returns whether it was registered.
	pub fn remove_hook(&self, id: HookId) -> bool {
		let mut before = self.before.borrow_mut();
		let mut after = self.after.borrow_mut();
		let count = before.len() + after.len();
		before.retain(|(hook, _)| *hook != id);
		after.retain(|(hook, _)| *hook != id);
		before.len() + after.len() != count
	}

	/// Removes every hook.
	pub fn clear_hooks(&self) {
		self.before.borrow_mut().clear();
		self.after.borrow_mut().clear();
	}

	/// Number of registered before and after hooks.
	pub fn hook_counts(&self) -> (usize, usize) {
		(self.before.borrow().len(), self.after.borrow().len())
	}

	/// Runs the before hooks for `(to, from)` without committing anything.
	///
	/// The first outcome other than [`GuardOutcome::Continue`] ends the chain.
	pub fn run_guards(&self, to: &Rc<RouteDescriptor>, from: &Rc<RouteDescriptor>) -> GuardOutcome {
		let hooks: Vec<BeforeHook> = self
			.before
			.borrow()
			.iter()
			.map(|(_, hook)| hook.clone())
			.collect();
		for hook in hooks {
			let outcome = hook(to, from);
			if !outcome.is_continue() {
				return outcome;
			}
		}
		GuardOutcome::Continue
	}

	/// Navigates to `path`, adding a history entry.
	pub fn push(&self, path: &str) -> Result<NavigationOutcome, RouterError> {
		self.navigate(path, NavigationType::Push)
	}

	/// Navigates to `path`, replacing the current history entry.
	pub fn replace(&self, path: &str) -> Result<NavigationOutcome, RouterError> {
		self.navigate(path, NavigationType::Replace)
	}

	fn navigate(
		&self,
		path: &str,
		navigation: NavigationType,
	) -> Result<NavigationOutcome, RouterError> {
		let from = self.current_route();
		let limit = self.max_redirects.get();
		let mut target = path.to_string();
		let mut redirects = 0;

		loop {
			if !target.starts_with('/') {
				return Err(RouterError::InvalidPath(target));
			}
			let to = self.resolve(&target);
			match self.run_guards(&to, &from) {
				GuardOutcome::Continue => {
					self.commit(&to, &from, navigation);
					return Ok(if redirects == 0 {
						NavigationOutcome::Completed(to)
					} else {
						NavigationOutcome::Redirected {
							requested: path.to_string(),
							route: to,
						}
					});
				}
				GuardOutcome::Redirect(next) => {
					redirects += 1;
					if redirects > limit {
						return Err(RouterError::RedirectLoop { path: next, limit });
					}
					tracing::debug!(from = %target, to = %next, "navigation redirected");
					target = next;
				}
				GuardOutcome::Abort => {
					tracing::debug!(to = %target, "navigation aborted");
					return Ok(NavigationOutcome::Aborted);
				}
			}
		}
	}

	fn commit(&self, to: &Rc<RouteDescriptor>, from: &Rc<RouteDescriptor>, navigation: NavigationType) {
		*self.current.borrow_mut() = to.clone();
		self.history.commit(&to.full_path, navigation);
		tracing::debug!(to = %to.full_path, from = %from.full_path, "navigation committed");

		let hooks: Vec<AfterHook> = self
			.after
			.borrow()
			.iter()
			.map(|(_, hook)| hook.clone())
			.collect();
		for hook in hooks {
			hook(to, from);
		}
	}
}

fn build_descriptor(
	routes: &[RouteNode],
	matcher: &dyn RouteMatcher,
	full_path: &str,
) -> RouteDescriptor {
	let location = Location::parse(full_path);
	let query = location.query_map();
	let found = matcher.match_path(routes, &location.path);
	let (matched, params) = match found {
		Some(found) => (found.matched, found.params),
		None => (Vec::new(), BTreeMap::new()),
	};
	RouteDescriptor {
		name: matched
			.last()
			.and_then(|record| record.name().map(str::to_string)),
		full_path: location.full_path(),
		path: location.path,
		query,
		hash: location.hash,
		params,
		matched,
	}
}
