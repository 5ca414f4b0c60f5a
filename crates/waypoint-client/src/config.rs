//! Page payload and application configuration.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RawError;

/// Default selector of the element the app mounts into.
pub const DEFAULT_MOUNT_TARGET: &str = "#__waypoint";

/// Default message key of synthesised 404 errors.
pub const DEFAULT_NOT_FOUND_MESSAGE: &str = "messages.error_404";

/// Application configuration delivered with the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
	/// Path to navigate to before the first mount.
	pub redirect: Option<String>,
	/// Selector of the mount element.
	pub mount_target: String,
	/// Reload the page when a code-split asset fails to load.
	pub reload_on_asset_error: bool,
	/// Bound on consecutive redirects within one navigation.
	pub max_redirects: usize,
	/// Message of synthesised 404 errors.
	pub not_found_message: String,
	/// Application-defined keys.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl Default for AppConfig {
	fn default() -> Self {
		Self {
			redirect: None,
			mount_target: DEFAULT_MOUNT_TARGET.to_string(),
			reload_on_asset_error: true,
			max_redirects: crate::router::DEFAULT_MAX_REDIRECTS,
			not_found_message: DEFAULT_NOT_FOUND_MESSAGE.to_string(),
			extra: Map::new(),
		}
	}
}

/// The payload delivered with the page, consumed once at bootstrap.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagePayload {
	/// Error raised while the page was produced.
	pub error: Option<RawError>,
	/// Application configuration.
	pub config: AppConfig,
}

impl PagePayload {
	/// Parses the payload from JSON.
	pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(json)
	}

	/// Serializes the payload to JSON.
	pub fn to_json(&self) -> Result<String, serde_json::Error> {
		serde_json::to_string(self)
	}
}
