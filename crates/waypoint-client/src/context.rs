//! Shared navigation context.
//!
//! Every transition gets a fresh [`SharedContext`]; the old one is never
//! patched. Work that outlives a transition keeps its context and asks
//! [`App::is_current`] before acting on it.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::app::{App, WeakApp};
use crate::error::ErrorState;
use crate::query::QueryMap;
use crate::router::{GuardOutcome, RouteDescriptor};

/// Lets code running inside a transition stop or redirect it.
///
/// Only the first decision counts; later calls return `false` and change
/// nothing.
#[derive(Debug, Clone, Default)]
pub struct NavigationControl {
	decision: Rc<RefCell<Option<GuardOutcome>>>,
}

impl NavigationControl {
	/// Creates an undecided control.
	pub fn new() -> Self {
		Self::default()
	}

	/// Redirects the transition to `path`.
	pub fn redirect(&self, path: impl Into<String>) -> bool {
		self.decide(GuardOutcome::Redirect(path.into()))
	}

	/// Aborts the transition.
	pub fn abort(&self) -> bool {
		self.decide(GuardOutcome::Abort)
	}

	fn decide(&self, outcome: GuardOutcome) -> bool {
		let mut decision = self.decision.borrow_mut();
		if decision.is_some() {
			tracing::debug!(ignored = ?outcome, "transition already decided");
			return false;
		}
		*decision = Some(outcome);
		true
	}

	/// The recorded decision.
	pub fn decision(&self) -> Option<GuardOutcome> {
		self.decision.borrow().clone()
	}

	/// Whether a decision was recorded.
	pub fn is_decided(&self) -> bool {
		self.decision.borrow().is_some()
	}
}

/// What components see of the transition being rendered.
pub struct SharedContext {
	generation: u64,
	route: Rc<RouteDescriptor>,
	from: Rc<RouteDescriptor>,
	control: NavigationControl,
	app: WeakApp,
}

impl SharedContext {
	pub(crate) fn new(
		app: WeakApp,
		generation: u64,
		route: Rc<RouteDescriptor>,
		from: Rc<RouteDescriptor>,
		control: NavigationControl,
	) -> Self {
		Self {
			generation,
			route,
			from,
			control,
			app,
		}
	}

	/// Sequence number; the newest context has the highest.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// Route being rendered.
	pub fn route(&self) -> &Rc<RouteDescriptor> {
		&self.route
	}

	/// Route before the transition.
	pub fn from(&self) -> &Rc<RouteDescriptor> {
		&self.from
	}

	/// Path parameters of the route.
	pub fn params(&self) -> &BTreeMap<String, String> {
		&self.route.params
	}

	/// Query of the route.
	pub fn query(&self) -> &QueryMap {
		&self.route.query
	}

	/// Control of the transition.
	pub fn control(&self) -> &NavigationControl {
		&self.control
	}

	/// Redirects the transition. See [`NavigationControl::redirect`].
	pub fn redirect(&self, path: impl Into<String>) -> bool {
		self.control.redirect(path)
	}

	/// Aborts the transition. See [`NavigationControl::abort`].
	pub fn abort(&self) -> bool {
		self.control.abort()
	}

	/// Raises (or clears) the application error.
	pub fn error(&self, error: Option<ErrorState>) {
		match self.app.upgrade() {
			Some(app) => app.error(error),
			None => tracing::warn!("error raised after the application was dropped"),
		}
	}

	/// Error currently displayed.
	pub fn current_error(&self) -> Option<ErrorState> {
		self.app.upgrade().and_then(|app| app.bus().error())
	}
}

impl fmt::Debug for SharedContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SharedContext")
			.field("generation", &self.generation)
			.field("route", &self.route.full_path)
			.field("from", &self.from.full_path)
			.field("decision", &self.control.decision())
			.finish()
	}
}

/// Records whether an error is displayed as the transition starts, and its
/// generation, before any guard of the transition raises one.
///
/// The snapshot is pinned: the next [`synchronize`] keeps it instead of
/// taking its own, so an error raised while loading components is not
/// mistaken for one left over from the previous route.
pub fn snapshot_errors(app: &App) {
	app.flags()
		.pin_error_snapshot(app.bus().has_error(), app.bus().error_generation());
}

/// Replaces `app`'s context with one describing `route` and records the
/// error snapshot the post-transition refresh compares against, unless
/// [`snapshot_errors`] already pinned one for this transition.
pub fn synchronize(
	app: &App,
	route: &Rc<RouteDescriptor>,
	from: &Rc<RouteDescriptor>,
	control: NavigationControl,
) -> Rc<SharedContext> {
	let context = Rc::new(SharedContext::new(
		app.downgrade(),
		app.next_context_generation(),
		route.clone(),
		from.clone(),
		control,
	));
	app.replace_context(context.clone());

	let flags = app.flags();
	flags.record_error_snapshot(app.bus().has_error(), app.bus().error_generation());
	tracing::debug!(
		generation = context.generation(),
		to = %route.full_path,
		had_error = flags.had_error_before_transition(),
		"context synchronized"
	);
	context
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_control_keeps_first_decision() {
		let control = NavigationControl::new();
		assert!(!control.is_decided());
		assert!(control.redirect("/login"));
		assert!(!control.abort());
		assert!(!control.redirect("/other"));
		assert_eq!(
			control.decision(),
			Some(GuardOutcome::Redirect("/login".to_string()))
		);
	}

	#[rstest]
	fn test_control_clones_share_decision() {
		let control = NavigationControl::new();
		let clone = control.clone();
		assert!(clone.abort());
		assert_eq!(control.decision(), Some(GuardOutcome::Abort));
	}
}
