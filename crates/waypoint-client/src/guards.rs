//! The navigation guard pipeline.
//!
//! Two before hooks run on every transition, in this order:
//!
//! 1. [`load_async_components`] classifies the transition and loads lazy
//!    components. Asset-load failures reload the page and abort; other load
//!    failures are shown as an error page and the transition proceeds.
//! 2. [`render`] synchronizes the context, resolves components, raises a 404
//!    when nothing matched, and runs validators and middleware.
//!
//! Neither hook lets an error escape; each returns a [`GuardOutcome`] for the
//! router to interpret.

use std::collections::BTreeSet;
use std::rc::Rc;

use crate::app::{App, TransitionKind};
use crate::context::{NavigationControl, snapshot_errors, synchronize};
use crate::component::ComponentRef;
use crate::error::{DEFAULT_STATUS_CODE, ErrorState, NavigationError};
use crate::query::diff_query;
use crate::resolver::resolve_components;
use crate::router::{GuardOutcome, HookId, RouteDescriptor};

/// Classifies a transition.
///
/// At most one of route/param/query change applies; the first that holds
/// wins. A pending error counts as a route change. The query diff is only
/// computed for query-only transitions.
pub fn classify(
	to: &RouteDescriptor,
	from: &RouteDescriptor,
	has_error: bool,
) -> (TransitionKind, BTreeSet<String>) {
	if has_error || to.name != from.name {
		(TransitionKind::RouteChanged, BTreeSet::new())
	} else if to.path != from.path {
		(TransitionKind::ParamChanged, BTreeSet::new())
	} else if to.full_path != from.full_path {
		(TransitionKind::QueryChanged, diff_query(&to.query, &from.query))
	} else {
		(TransitionKind::Reentrant, BTreeSet::new())
	}
}

/// LOAD guard.
pub fn load_async_components(
	app: &App,
	to: &Rc<RouteDescriptor>,
	from: &Rc<RouteDescriptor>,
) -> GuardOutcome {
	let (kind, diff) = classify(to, from, app.bus().has_error());
	tracing::debug!(
		to = %to.full_path,
		from = %from.full_path,
		kind = ?kind,
		diff_query = ?diff,
		"transition classified"
	);
	app.flags().classify(kind, diff);
	if kind == TransitionKind::Reentrant {
		return GuardOutcome::Continue;
	}
	snapshot_errors(app);

	let pending = to
		.matched
		.iter()
		.flat_map(|record| record.components())
		.filter_map(|(_, component)| match component {
			ComponentRef::Pending(pending) if !pending.is_loaded() => Some(pending),
			_ => None,
		});

	for component in pending {
		let Err(raw) = component.load() else {
			continue;
		};

		if raw.is_asset_load_failure() {
			let message = raw.message.clone().unwrap_or_default();
			if app.config().reload_on_asset_error {
				tracing::warn!(to = %to.full_path, message = %message, "asset failed to load, reloading");
				app.window().reload();
			} else {
				app.error(Some(ErrorState::new(DEFAULT_STATUS_CODE, message)));
			}
			return GuardOutcome::Abort;
		}

		app.error(Some(raw.to_error_state()));
		break;
	}
	GuardOutcome::Continue
}

/// RENDER guard.
///
/// Also runs, outside the router, for the first transition at bootstrap.
pub fn render(app: &App, to: &Rc<RouteDescriptor>, from: &Rc<RouteDescriptor>) -> GuardOutcome {
	if app.flags().kind() == TransitionKind::Reentrant {
		return GuardOutcome::Continue;
	}

	let control = NavigationControl::new();
	let context = synchronize(app, to, from, control.clone());

	let components = resolve_components(to);
	if components.is_empty() {
		tracing::debug!(to = %to.full_path, "no component matched");
		app.error(Some(ErrorState::not_found(
			app.config().not_found_message.as_str(),
		)));
		return GuardOutcome::Continue;
	}

	let definitions: Vec<_> = components
		.iter()
		.filter_map(ComponentRef::definition)
		.collect();

	if definitions.iter().any(|def| !def.validate(&context)) {
		tracing::debug!(to = %to.full_path, "route params rejected");
		app.error(Some(ErrorState::not_found(
			app.config().not_found_message.as_str(),
		)));
		return GuardOutcome::Continue;
	}

	'components: for def in &definitions {
		for middleware in def.middleware() {
			match middleware(context.as_ref()) {
				Ok(()) => {}
				Err(NavigationError::Redirect(path)) => {
					context.redirect(path);
				}
				Err(err) => app.handle_error(&err),
			}
			if control.is_decided() {
				break 'components;
			}
		}
	}

	let outcome = control.decision().unwrap_or_default();
	if !outcome.is_continue() {
		tracing::debug!(to = %to.full_path, outcome = ?outcome, "transition redirected by middleware");
	}
	outcome
}

/// Registers the LOAD and RENDER guards on the app's router, in that order.
pub fn register_guards(app: &App) -> [HookId; 2] {
	let weak = app.downgrade();
	let load_hook = app.router().before_each(move |to, from| match weak.upgrade() {
		Some(app) => load_async_components(&app, to, from),
		None => GuardOutcome::Continue,
	});
	let weak = app.downgrade();
	let render_hook = app.router().before_each(move |to, from| match weak.upgrade() {
		Some(app) => render(&app, to, from),
		None => GuardOutcome::Continue,
	});
	[load_hook, render_hook]
}
