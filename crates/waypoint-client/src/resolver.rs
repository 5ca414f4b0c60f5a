//! Component resolution for a matched route.

use std::rc::Rc;

use crate::component::{ComponentInstance, ComponentRef};
use crate::router::RouteDescriptor;

/// Flat list of the components that render for `route`, outermost record
/// first and view slots in declaration order.
///
/// Loaded placeholders are normalized and written back into their matched
/// record, so later reads see the stable form. A second call on the same
/// route performs no writes. Placeholders that have not loaded yet are
/// returned as they are. An unmatched route yields an empty list.
pub fn resolve_components(route: &RouteDescriptor) -> Vec<ComponentRef> {
	let mut resolved = Vec::new();
	for record in &route.matched {
		for (slot, component) in record.components() {
			match component.normalized() {
				Some(normalized) => {
					tracing::debug!(path = record.path(), slot = %slot, "normalized lazy component");
					record.set_component(&slot, normalized.clone());
					resolved.push(normalized);
				}
				None => resolved.push(component),
			}
		}
	}
	resolved
}

/// Normalizes `route` in place, discarding the list.
pub fn normalize_components(route: &RouteDescriptor) {
	resolve_components(route);
}

/// Instances currently mounted for `route`, aligned with
/// [`resolve_components`]: `None` where a slot has no instance.
pub fn matched_instances(route: &RouteDescriptor) -> Vec<Option<Rc<ComponentInstance>>> {
	route
		.matched
		.iter()
		.flat_map(|record| {
			record
				.components()
				.into_iter()
				.map(|(slot, _)| record.instance(&slot))
				.collect::<Vec<_>>()
		})
		.collect()
}
