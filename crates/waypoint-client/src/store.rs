//! State container hook.

use crate::app::App;

/// A state container wired into the app at bootstrap.
pub trait Store {
	/// Called once, before the first transition.
	fn attach(&self, app: &App);
}

/// Store that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStore;

impl Store for NoopStore {
	fn attach(&self, _app: &App) {}
}
