//! Navigation history.
//!
//! The router always keeps an in-memory log of committed paths. On WASM the
//! browser History API is updated as well.

use std::cell::RefCell;

/// How a committed navigation entered the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationType {
	/// New entry.
	Push,
	/// Current entry replaced.
	Replace,
}

/// In-memory history of committed paths.
#[derive(Debug, Default)]
pub struct History {
	entries: RefCell<Vec<String>>,
}

impl History {
	/// Creates a history whose first entry is `initial`.
	pub fn new(initial: impl Into<String>) -> Self {
		Self {
			entries: RefCell::new(vec![initial.into()]),
		}
	}

	/// Records a committed navigation.
	pub fn commit(&self, full_path: &str, navigation: NavigationType) {
		{
			let mut entries = self.entries.borrow_mut();
			match navigation {
				NavigationType::Push => entries.push(full_path.to_string()),
				NavigationType::Replace => match entries.last_mut() {
					Some(last) => *last = full_path.to_string(),
					None => entries.push(full_path.to_string()),
				},
			}
		}
		sync_browser(full_path, navigation);
	}

	/// Every entry, oldest first.
	pub fn entries(&self) -> Vec<String> {
		self.entries.borrow().clone()
	}

	/// Number of entries.
	pub fn len(&self) -> usize {
		self.entries.borrow().len()
	}

	/// Whether the history has no entries.
	pub fn is_empty(&self) -> bool {
		self.entries.borrow().is_empty()
	}
}

/// Path of the page as loaded, including query and hash.
#[cfg(all(target_family = "wasm", target_os = "unknown"))]
pub fn current_path() -> String {
	web_sys::window()
		.and_then(|window| {
			let location = window.location();
			let path = location.pathname().ok()?;
			let search = location.search().unwrap_or_default();
			let hash = location.hash().unwrap_or_default();
			Some(format!("{path}{search}{hash}"))
		})
		.unwrap_or_else(|| "/".to_string())
}

/// Path of the page as loaded. Always `/` outside the browser.
#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
pub fn current_path() -> String {
	"/".to_string()
}

#[cfg(all(target_family = "wasm", target_os = "unknown"))]
fn sync_browser(full_path: &str, navigation: NavigationType) {
	use wasm_bindgen::JsValue;

	let Some(history) = web_sys::window().and_then(|window| window.history().ok()) else {
		tracing::warn!("browser history is unavailable");
		return;
	};
	let result = match navigation {
		NavigationType::Push => history.push_state_with_url(&JsValue::NULL, "", Some(full_path)),
		NavigationType::Replace => {
			history.replace_state_with_url(&JsValue::NULL, "", Some(full_path))
		}
	};
	if let Err(err) = result {
		tracing::warn!(path = full_path, error = ?err, "failed to update browser history");
	}
}

#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
fn sync_browser(_full_path: &str, _navigation: NavigationType) {}
