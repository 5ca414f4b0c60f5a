//! Post-transition data refresh.
//!
//! When a transition reuses a component instance, the view library does not
//! re-run its data provider. This after hook does it on the next tick, once
//! the renderer has applied the route, then clears a stale error page.

use std::rc::Rc;
use waypoint_reactive::{Completion, next_tick};

use crate::app::{App, TransitionKind};
use crate::bus::BusEvent;
use crate::resolver::{matched_instances, resolve_components};
use crate::router::RouteDescriptor;

/// Schedules the refresh for `to`.
///
/// Returns `None` for re-entrant transitions, which need no refresh.
/// Otherwise the returned [`Completion`] reaches
/// [`Phase::Applied`](waypoint_reactive::Phase::Applied) once instances
/// were refreshed and [`Phase::Flushed`](waypoint_reactive::Phase::Flushed)
/// one tick later. `triggerScroll` is emitted on the flushed phase when at
/// least one instance was refreshed.
pub fn refresh_after_transition(app: &App, to: &Rc<RouteDescriptor>) -> Option<Completion> {
	if app.flags().kind() == TransitionKind::Reentrant {
		return None;
	}

	let completion = Completion::new();
	let weak = app.downgrade();
	let route = to.clone();
	let done = completion.clone();
	next_tick(move || {
		let Some(app) = weak.upgrade() else {
			return;
		};

		let refreshed = refresh_instances(&route);
		done.complete_applied();
		if refreshed > 0 {
			let weak = app.downgrade();
			done.on_flushed(move || {
				if let Some(app) = weak.upgrade() {
					app.bus().emit(BusEvent::TriggerScroll);
				}
			});
		}

		check_for_errors(&app);
		done.flush_next_tick();
	});
	Some(completion)
}

/// Re-runs data providers of reused instances of `route` and merges the
/// result key by key. Returns how many instances were refreshed.
///
/// Destroyed instances, kept-alive instances, freshly created instances and
/// instances whose component changed are left alone.
pub fn refresh_instances(route: &RouteDescriptor) -> usize {
	let components = resolve_components(route);
	let instances = matched_instances(route);

	let mut refreshed = 0;
	for (component, instance) in components.iter().zip(instances) {
		let Some(instance) = instance else {
			continue;
		};
		if instance.is_destroyed() || instance.is_kept_alive() || !instance.is_reused() {
			continue;
		}
		let Some(def) = component.definition() else {
			continue;
		};
		if !Rc::ptr_eq(&def, instance.def()) {
			continue;
		}
		let Some(data) = def.run_data(route) else {
			continue;
		};
		instance.state().merge(data);
		refreshed += 1;
	}

	if refreshed > 0 {
		tracing::debug!(route = %route.full_path, refreshed, "component data refreshed");
	}
	refreshed
}

/// Clears the error if one was displayed before the transition and no new
/// error has been raised since.
pub fn check_for_errors(app: &App) {
	let flags = app.flags();
	if flags.had_error_before_transition()
		&& flags.date_of_last_error() == app.bus().error_generation()
	{
		tracing::debug!("clearing stale error");
		app.error(None);
	}
}
