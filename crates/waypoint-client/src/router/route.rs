//! Route records and descriptors.

use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::component::{ComponentInstance, ComponentRef};
use crate::query::QueryMap;

/// Name of the unnamed view slot.
pub const DEFAULT_VIEW: &str = "default";

/// A route definition as registered with the router.
#[derive(Debug, Clone)]
pub struct RouteRecord {
	pub(crate) path: String,
	pub(crate) name: Option<String>,
	pub(crate) meta: Map<String, Value>,
	pub(crate) components: Vec<(String, ComponentRef)>,
	pub(crate) children: Vec<RouteRecord>,
}

impl RouteRecord {
	/// Creates a route rendering `component` in the default view.
	///
	/// Child paths are relative to their parent.
	pub fn new(path: impl Into<String>, component: impl Into<ComponentRef>) -> Self {
		Self {
			path: path.into(),
			name: None,
			meta: Map::new(),
			components: vec![(DEFAULT_VIEW.to_string(), component.into())],
			children: Vec::new(),
		}
	}

	/// Creates a named route.
	pub fn named(
		name: impl Into<String>,
		path: impl Into<String>,
		component: impl Into<ComponentRef>,
	) -> Self {
		let mut record = Self::new(path, component);
		record.name = Some(name.into());
		record
	}

	/// Creates a route that renders nothing by itself.
	pub fn empty(path: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			name: None,
			meta: Map::new(),
			components: Vec::new(),
			children: Vec::new(),
		}
	}

	/// Adds a named view.
	pub fn with_view(mut self, slot: impl Into<String>, component: impl Into<ComponentRef>) -> Self {
		self.components.push((slot.into(), component.into()));
		self
	}

	/// Adds a meta entry.
	pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
		self.meta.insert(key.into(), value);
		self
	}

	/// Adds a child route.
	pub fn with_child(mut self, child: RouteRecord) -> Self {
		self.children.push(child);
		self
	}

	/// Path pattern.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Route name.
	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}
}

/// One depth of a matched route, shared by every navigation that matches it.
///
/// Component references are written back here by the resolver, and mounted
/// instances by the renderer.
pub struct MatchedRecord {
	path: String,
	name: Option<String>,
	meta: Map<String, Value>,
	components: RefCell<Vec<(String, ComponentRef)>>,
	instances: RefCell<BTreeMap<String, Rc<ComponentInstance>>>,
	revision: Cell<u64>,
}

impl MatchedRecord {
	pub(crate) fn from_record(path: String, record: &RouteRecord) -> Self {
		Self {
			path,
			name: record.name.clone(),
			meta: record.meta.clone(),
			components: RefCell::new(record.components.clone()),
			instances: RefCell::new(BTreeMap::new()),
			revision: Cell::new(0),
		}
	}

	/// Full path pattern of this depth.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Route name.
	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	/// Route meta.
	pub fn meta(&self) -> &Map<String, Value> {
		&self.meta
	}

	/// Component references by view slot, in declaration order.
	pub fn components(&self) -> Vec<(String, ComponentRef)> {
		self.components.borrow().clone()
	}

	/// Component reference of one slot.
	pub fn component(&self, slot: &str) -> Option<ComponentRef> {
		self.components
			.borrow()
			.iter()
			.find(|(name, _)| name == slot)
			.map(|(_, component)| component.clone())
	}

	/// Replaces the reference of one slot.
	pub fn set_component(&self, slot: &str, component: ComponentRef) {
		let mut components = self.components.borrow_mut();
		match components.iter_mut().find(|(name, _)| name == slot) {
			Some(entry) => entry.1 = component,
			None => components.push((slot.to_string(), component)),
		}
		self.revision.set(self.revision.get() + 1);
	}

	/// Number of writes performed through [`MatchedRecord::set_component`].
	pub fn revision(&self) -> u64 {
		self.revision.get()
	}

	/// Instance mounted for one slot.
	pub fn instance(&self, slot: &str) -> Option<Rc<ComponentInstance>> {
		self.instances.borrow().get(slot).cloned()
	}

	/// Mounted instances by slot.
	pub fn instances(&self) -> Vec<(String, Rc<ComponentInstance>)> {
		self.instances
			.borrow()
			.iter()
			.map(|(slot, instance)| (slot.clone(), instance.clone()))
			.collect()
	}

	/// Records the instance mounted for one slot.
	pub fn set_instance(&self, slot: &str, instance: Rc<ComponentInstance>) {
		self.instances
			.borrow_mut()
			.insert(slot.to_string(), instance);
	}

	/// Forgets the instance of one slot.
	pub fn remove_instance(&self, slot: &str) -> Option<Rc<ComponentInstance>> {
		self.instances.borrow_mut().remove(slot)
	}
}

impl fmt::Debug for MatchedRecord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MatchedRecord")
			.field("path", &self.path)
			.field("name", &self.name)
			.field(
				"slots",
				&self
					.components
					.borrow()
					.iter()
					.map(|(slot, _)| slot.clone())
					.collect::<Vec<_>>(),
			)
			.field("instances", &self.instances.borrow().len())
			.finish()
	}
}

/// The router's description of one navigation target.
///
/// Immutable once issued. The matched records it points to are shared with
/// the route table.
#[derive(Clone)]
pub struct RouteDescriptor {
	/// Path without query or hash.
	pub path: String,
	/// Name of the deepest matched record.
	pub name: Option<String>,
	/// Path including query and hash.
	pub full_path: String,
	/// Parsed query.
	pub query: QueryMap,
	/// Fragment without the `#`.
	pub hash: Option<String>,
	/// Path parameters.
	pub params: BTreeMap<String, String>,
	/// Matched records, outermost first.
	pub matched: Vec<Rc<MatchedRecord>>,
}

impl RouteDescriptor {
	/// Whether any record matched.
	pub fn is_matched(&self) -> bool {
		!self.matched.is_empty()
	}

	/// Value of a path parameter.
	pub fn param(&self, name: &str) -> Option<&str> {
		self.params.get(name).map(String::as_str)
	}
}

impl fmt::Debug for RouteDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RouteDescriptor")
			.field("full_path", &self.full_path)
			.field("name", &self.name)
			.field("params", &self.params)
			.field(
				"matched",
				&self
					.matched
					.iter()
					.map(|record| record.path())
					.collect::<Vec<_>>(),
			)
			.finish()
	}
}
