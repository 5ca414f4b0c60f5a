//! Route components and their mounted instances.
//!
//! A matched record stores [`ComponentRef`]s. A reference is either
//! [`ComponentRef::Resolved`], a stable definition, or
//! [`ComponentRef::Pending`], a lazily-loaded placeholder. The component
//! resolver turns loaded placeholders into resolved references.

use serde_json::Value;
use std::cell::{Cell, OnceCell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use waypoint_reactive::{NodeId, Signal};

use crate::context::SharedContext;
use crate::error::{NavigationError, RawError};
use crate::router::RouteDescriptor;

/// Component data as produced by a data provider.
pub type DataMap = serde_json::Map<String, Value>;

/// Produces a component's initial data for a route.
pub type DataProvider = Rc<dyn Fn(&RouteDescriptor) -> DataMap>;

/// Runs before a route renders; may redirect through the context.
pub type Middleware = Rc<dyn Fn(&SharedContext) -> Result<(), NavigationError>>;

/// Returns `false` when the route parameters are not acceptable.
pub type Validator = Rc<dyn Fn(&SharedContext) -> bool>;

/// Loads a code-split component.
pub type ComponentLoader = Rc<dyn Fn() -> Result<Rc<ComponentDef>, RawError>>;

/// Static description of a view component.
pub struct ComponentDef {
	name: String,
	data: Option<DataProvider>,
	middleware: Vec<Middleware>,
	validate: Option<Validator>,
	keep_alive: bool,
}

impl ComponentDef {
	/// Creates a component definition with no data provider.
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			data: None,
			middleware: Vec::new(),
			validate: None,
			keep_alive: false,
		}
	}

	/// Sets the data provider.
	pub fn with_data<F>(mut self, provider: F) -> Self
	where
		F: Fn(&RouteDescriptor) -> DataMap + 'static,
	{
		self.data = Some(Rc::new(provider));
		self
	}

	/// Appends a middleware.
	pub fn with_middleware<F>(mut self, middleware: F) -> Self
	where
		F: Fn(&SharedContext) -> Result<(), NavigationError> + 'static,
	{
		self.middleware.push(Rc::new(middleware));
		self
	}

	/// Sets the validator.
	pub fn with_validate<F>(mut self, validate: F) -> Self
	where
		F: Fn(&SharedContext) -> bool + 'static,
	{
		self.validate = Some(Rc::new(validate));
		self
	}

	/// Marks instances of this component as kept alive across transitions.
	pub fn keep_alive(mut self, keep_alive: bool) -> Self {
		self.keep_alive = keep_alive;
		self
	}

	/// Component name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Whether the component declares a data provider.
	pub fn has_data(&self) -> bool {
		self.data.is_some()
	}

	/// Runs the data provider, if any.
	pub fn run_data(&self, route: &RouteDescriptor) -> Option<DataMap> {
		self.data.as_ref().map(|provider| provider(route))
	}

	/// Declared middleware, in order.
	pub fn middleware(&self) -> &[Middleware] {
		&self.middleware
	}

	/// Runs the validator. Components without one always validate.
	pub fn validate(&self, ctx: &SharedContext) -> bool {
		self.validate.as_ref().is_none_or(|validate| validate(ctx))
	}

	/// Whether instances are kept alive across transitions.
	pub fn is_keep_alive(&self) -> bool {
		self.keep_alive
	}
}

impl fmt::Debug for ComponentDef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ComponentDef")
			.field("name", &self.name)
			.field("has_data", &self.data.is_some())
			.field("middleware", &self.middleware.len())
			.field("has_validate", &self.validate.is_some())
			.field("keep_alive", &self.keep_alive)
			.finish()
	}
}

/// Placeholder for a component that is loaded on first navigation.
///
/// Clones share the loaded definition.
#[derive(Clone)]
pub struct PendingComponent {
	loader: ComponentLoader,
	loaded: Rc<OnceCell<Rc<ComponentDef>>>,
}

impl PendingComponent {
	/// Creates a placeholder around `loader`.
	pub fn new<F>(loader: F) -> Self
	where
		F: Fn() -> Result<Rc<ComponentDef>, RawError> + 'static,
	{
		Self {
			loader: Rc::new(loader),
			loaded: Rc::new(OnceCell::new()),
		}
	}

	/// Loads the component. After the first success the loader is not called
	/// again; after a failure the next call retries.
	pub fn load(&self) -> Result<Rc<ComponentDef>, RawError> {
		if let Some(def) = self.loaded.get() {
			return Ok(def.clone());
		}
		let def = (self.loader)()?;
		Ok(self.loaded.get_or_init(|| def).clone())
	}

	/// The loaded definition, if loading already succeeded.
	pub fn loaded(&self) -> Option<Rc<ComponentDef>> {
		self.loaded.get().cloned()
	}

	/// Whether loading already succeeded.
	pub fn is_loaded(&self) -> bool {
		self.loaded.get().is_some()
	}

	/// Whether both handles refer to the same placeholder.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.loaded, &other.loaded)
	}
}

impl fmt::Debug for PendingComponent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PendingComponent")
			.field("loaded", &self.loaded.get().map(|def| def.name()))
			.finish()
	}
}

/// A component in its final form.
#[derive(Debug, Clone)]
pub struct ResolvedComponent {
	def: Rc<ComponentDef>,
	pending_ctor: Option<PendingComponent>,
}

impl ResolvedComponent {
	/// The component definition.
	pub fn def(&self) -> &Rc<ComponentDef> {
		&self.def
	}

	/// The placeholder this reference was normalized from, if any.
	pub fn pending_ctor(&self) -> Option<&PendingComponent> {
		self.pending_ctor.as_ref()
	}
}

/// A component reference stored in a matched record.
#[derive(Debug, Clone)]
pub enum ComponentRef {
	/// Stable reference.
	Resolved(ResolvedComponent),
	/// Lazily-loaded placeholder.
	Pending(PendingComponent),
}

impl ComponentRef {
	/// Wraps a definition as a resolved reference.
	pub fn resolved(def: Rc<ComponentDef>) -> Self {
		Self::Resolved(ResolvedComponent {
			def,
			pending_ctor: None,
		})
	}

	/// Creates a lazily-loaded reference.
	pub fn lazy<F>(loader: F) -> Self
	where
		F: Fn() -> Result<Rc<ComponentDef>, RawError> + 'static,
	{
		Self::Pending(PendingComponent::new(loader))
	}

	/// Whether the reference is in its final form.
	pub fn is_resolved(&self) -> bool {
		matches!(self, Self::Resolved(_))
	}

	/// The definition, when known.
	pub fn definition(&self) -> Option<Rc<ComponentDef>> {
		match self {
			Self::Resolved(resolved) => Some(resolved.def.clone()),
			Self::Pending(pending) => pending.loaded(),
		}
	}

	/// The resolved form of a loaded placeholder.
	///
	/// Returns `None` for references that are already resolved or not loaded
	/// yet.
	pub fn normalized(&self) -> Option<ComponentRef> {
		match self {
			Self::Resolved(_) => None,
			Self::Pending(pending) => pending.loaded().map(|def| {
				Self::Resolved(ResolvedComponent {
					def,
					pending_ctor: Some(pending.clone()),
				})
			}),
		}
	}

	/// Whether both references point at the same definition.
	pub fn same_identity(&self, other: &ComponentRef) -> bool {
		match (self.definition(), other.definition()) {
			(Some(a), Some(b)) => Rc::ptr_eq(&a, &b),
			_ => false,
		}
	}
}

impl From<Rc<ComponentDef>> for ComponentRef {
	fn from(def: Rc<ComponentDef>) -> Self {
		Self::resolved(def)
	}
}

impl From<ComponentDef> for ComponentRef {
	fn from(def: ComponentDef) -> Self {
		Self::resolved(Rc::new(def))
	}
}

/// Live state of a component instance.
///
/// Every key is its own [`Signal`], so assigning one key notifies only that
/// key's watchers. Adding a key also notifies [`ReactiveState::keys`].
#[derive(Debug, Default)]
pub struct ReactiveState {
	fields: RefCell<BTreeMap<String, Signal<Value>>>,
	keys: Signal<Vec<String>>,
}

impl ReactiveState {
	/// Creates state from initial data.
	pub fn from_data(data: DataMap) -> Self {
		let state = Self::default();
		for (key, value) in data {
			state.fields.borrow_mut().insert(key, Signal::new(value));
		}
		state
			.keys
			.set(state.fields.borrow().keys().cloned().collect());
		state
	}

	/// Assigns one key.
	pub fn assign(&self, key: &str, value: Value) {
		let existing = self.fields.borrow().get(key).cloned();
		match existing {
			Some(signal) => signal.set(value),
			None => {
				self.fields
					.borrow_mut()
					.insert(key.to_string(), Signal::new(value));
				self.keys.update(|keys| keys.push(key.to_string()));
			}
		}
	}

	/// Assigns every key of `data`, one at a time.
	pub fn merge(&self, data: DataMap) {
		for (key, value) in data {
			self.assign(&key, value);
		}
	}

	/// Current value of `key`.
	pub fn get(&self, key: &str) -> Option<Value> {
		self.fields.borrow().get(key).map(Signal::get)
	}

	/// Signal backing `key`.
	pub fn signal(&self, key: &str) -> Option<Signal<Value>> {
		self.fields.borrow().get(key).cloned()
	}

	/// Signal listing the keys in insertion order.
	pub fn keys(&self) -> &Signal<Vec<String>> {
		&self.keys
	}
}

/// A mounted component.
#[derive(Debug)]
pub struct ComponentInstance {
	id: NodeId,
	def: Rc<ComponentDef>,
	state: ReactiveState,
	destroyed: Cell<bool>,
	keep_alive: Cell<bool>,
	reused: Cell<bool>,
}

impl ComponentInstance {
	/// Creates an instance with its initial data.
	pub fn new(def: Rc<ComponentDef>, data: DataMap) -> Rc<Self> {
		let keep_alive = def.is_keep_alive();
		Rc::new(Self {
			id: NodeId::new(),
			def,
			state: ReactiveState::from_data(data),
			destroyed: Cell::new(false),
			keep_alive: Cell::new(keep_alive),
			reused: Cell::new(false),
		})
	}

	/// Instance id.
	pub fn id(&self) -> NodeId {
		self.id
	}

	/// Definition this instance was created from.
	pub fn def(&self) -> &Rc<ComponentDef> {
		&self.def
	}

	/// Live state.
	pub fn state(&self) -> &ReactiveState {
		&self.state
	}

	/// Whether the instance has been destroyed.
	pub fn is_destroyed(&self) -> bool {
		self.destroyed.get()
	}

	/// Destroys the instance.
	pub fn destroy(&self) {
		self.destroyed.set(true);
	}

	/// Whether the instance is kept alive across the current transition.
	pub fn is_kept_alive(&self) -> bool {
		self.keep_alive.get()
	}

	/// Sets the keep-alive mark.
	pub fn set_keep_alive(&self, keep_alive: bool) {
		self.keep_alive.set(keep_alive);
	}

	/// Whether the renderer reused this instance for the latest route.
	pub fn is_reused(&self) -> bool {
		self.reused.get()
	}

	pub(crate) fn set_reused(&self, reused: bool) {
		self.reused.set(reused);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	fn data(pairs: &[(&str, Value)]) -> DataMap {
		pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.clone()))
			.collect()
	}

	#[rstest]
	fn test_pending_component_loads_once() {
		let calls = Rc::new(Cell::new(0));
		let counter = calls.clone();
		let def = Rc::new(ComponentDef::new("user"));
		let loaded = def.clone();
		let pending = PendingComponent::new(move || {
			counter.set(counter.get() + 1);
			Ok(loaded.clone())
		});

		assert!(!pending.is_loaded());
		let first = pending.load().unwrap();
		let second = pending.clone().load().unwrap();

		assert_eq!(calls.get(), 1);
		assert!(Rc::ptr_eq(&first, &def));
		assert!(Rc::ptr_eq(&second, &def));
	}

	#[rstest]
	fn test_pending_component_retries_after_failure() {
		let attempts = Rc::new(Cell::new(0));
		let counter = attempts.clone();
		let pending = PendingComponent::new(move || {
			counter.set(counter.get() + 1);
			if counter.get() == 1 {
				Err(RawError::message("flaky"))
			} else {
				Ok(Rc::new(ComponentDef::new("late")))
			}
		});

		assert!(pending.load().is_err());
		assert!(pending.load().is_ok());
		assert_eq!(attempts.get(), 2);
	}

	#[rstest]
	fn test_normalized_records_placeholder() {
		let def = Rc::new(ComponentDef::new("home"));
		let loaded = def.clone();
		let reference = ComponentRef::lazy(move || Ok(loaded.clone()));
		assert!(reference.normalized().is_none());

		if let ComponentRef::Pending(pending) = &reference {
			pending.load().unwrap();
		}
		let Some(ComponentRef::Resolved(resolved)) = reference.normalized() else {
			panic!("loaded placeholder should normalize");
		};
		assert!(Rc::ptr_eq(resolved.def(), &def));
		assert!(resolved.pending_ctor().is_some());
		assert!(ComponentRef::resolved(def).normalized().is_none());
	}

	#[rstest]
	fn test_same_identity_compares_definitions() {
		let def = Rc::new(ComponentDef::new("a"));
		let a = ComponentRef::resolved(def.clone());
		let b = ComponentRef::resolved(def);
		let c = ComponentRef::from(ComponentDef::new("a"));

		assert!(a.same_identity(&b));
		assert!(!a.same_identity(&c));
	}

	#[rstest]
	fn test_reactive_state_assign_is_per_key() {
		let state = ReactiveState::from_data(data(&[("x", json!(1)), ("y", json!(2))]));
		let x_hits = Rc::new(Cell::new(0));
		let y_hits = Rc::new(Cell::new(0));

		let counter = x_hits.clone();
		let _hx = state
			.signal("x")
			.unwrap()
			.watch(move |_| counter.set(counter.get() + 1));
		let counter = y_hits.clone();
		let _hy = state
			.signal("y")
			.unwrap()
			.watch(move |_| counter.set(counter.get() + 1));

		state.merge(data(&[("x", json!(10)), ("z", json!(3))]));

		assert_eq!(state.get("x"), Some(json!(10)));
		assert_eq!(state.get("y"), Some(json!(2)));
		assert_eq!(state.get("z"), Some(json!(3)));
		assert_eq!(x_hits.get(), 1);
		assert_eq!(y_hits.get(), 0);
		assert_eq!(state.keys().get(), vec!["x", "y", "z"]);
	}

	#[rstest]
	fn test_instance_inherits_keep_alive() {
		let def = Rc::new(ComponentDef::new("tabs").keep_alive(true));
		let instance = ComponentInstance::new(def, DataMap::new());
		assert!(instance.is_kept_alive());
		assert!(!instance.is_destroyed());

		instance.destroy();
		assert!(instance.is_destroyed());
	}
}
