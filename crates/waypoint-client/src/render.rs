//! Rendering collaborator.
//!
//! The view library is external; the pipeline only needs to mount once and to
//! have instances created or reused for each committed route.
//! [`HeadlessRenderer`] does exactly that without a DOM.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::component::{ComponentInstance, ComponentRef};
use crate::router::{MatchedRecord, RouteDescriptor};

/// Error type for rendering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
	/// The view library refused to mount.
	#[error("failed to mount into {target}: {reason}")]
	MountFailed {
		/// Selector of the mount element.
		target: String,
		/// Reason given by the view library.
		reason: String,
	},
	/// `mount` was called twice.
	#[error("renderer is already mounted")]
	AlreadyMounted,
}

/// Mounts the root view and keeps component instances in step with the route.
pub trait Renderer {
	/// Attaches the root view to the element matching `target`.
	fn mount(&self, target: &str) -> Result<(), RenderError>;

	/// Whether [`Renderer::mount`] succeeded.
	fn is_mounted(&self) -> bool;

	/// Creates or reuses instances for every slot of `route`.
	///
	/// `components` is the output of the component resolver for `route`.
	fn apply_route(&self, route: &RouteDescriptor, components: &[ComponentRef]);
}

/// A renderer without a view tree.
///
/// An instance is reused when the definition at the same record and slot is
/// the same `Rc`. Replaced instances are destroyed unless kept alive; kept
/// alive instances stay with their record and are reused on return.
#[derive(Default)]
pub struct HeadlessRenderer {
	target: RefCell<Option<String>>,
	renders: Cell<usize>,
	active: RefCell<Vec<Rc<MatchedRecord>>>,
}

impl HeadlessRenderer {
	/// Creates an unmounted renderer.
	pub fn new() -> Self {
		Self::default()
	}

	/// Selector the renderer mounted into.
	pub fn target(&self) -> Option<String> {
		self.target.borrow().clone()
	}

	/// Number of [`Renderer::apply_route`] calls.
	pub fn render_count(&self) -> usize {
		self.renders.get()
	}

	/// Instances of the records currently rendered, outermost first.
	pub fn live_instances(&self) -> Vec<Rc<ComponentInstance>> {
		self.active
			.borrow()
			.iter()
			.flat_map(|record| record.instances())
			.map(|(_, instance)| instance)
			.filter(|instance| !instance.is_destroyed())
			.collect()
	}

	fn retire(record: &MatchedRecord) {
		for (slot, instance) in record.instances() {
			if !instance.is_kept_alive() {
				instance.destroy();
				record.remove_instance(&slot);
			}
		}
	}
}

impl fmt::Debug for HeadlessRenderer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("HeadlessRenderer")
			.field("target", &self.target.borrow())
			.field("renders", &self.renders.get())
			.field("active_records", &self.active.borrow().len())
			.finish()
	}
}

impl Renderer for HeadlessRenderer {
	fn mount(&self, target: &str) -> Result<(), RenderError> {
		let mut mounted = self.target.borrow_mut();
		if mounted.is_some() {
			return Err(RenderError::AlreadyMounted);
		}
		*mounted = Some(target.to_string());
		tracing::info!(mount_target = target, "application mounted");
		Ok(())
	}

	fn is_mounted(&self) -> bool {
		self.target.borrow().is_some()
	}

	fn apply_route(&self, route: &RouteDescriptor, components: &[ComponentRef]) {
		self.renders.set(self.renders.get() + 1);

		let previous = std::mem::take(&mut *self.active.borrow_mut());
		for record in &previous {
			if !route.matched.iter().any(|m| Rc::ptr_eq(m, record)) {
				Self::retire(record);
			}
		}

		let mut components = components.iter();
		for record in &route.matched {
			for (slot, _) in record.components() {
				let Some(def) = components.next().and_then(ComponentRef::definition) else {
					continue;
				};
				match record.instance(&slot) {
					Some(existing) if Rc::ptr_eq(existing.def(), &def) && !existing.is_destroyed() => {
						existing.set_reused(true);
					}
					existing => {
						if let Some(old) = existing.filter(|old| !old.is_kept_alive()) {
							old.destroy();
						}
						let data = def.run_data(route).unwrap_or_default();
						let instance = ComponentInstance::new(def, data);
						record.set_instance(&slot, instance);
					}
				}
			}
		}

		*self.active.borrow_mut() = route.matched.clone();
		tracing::debug!(route = %route.full_path, "route applied");
	}
}
