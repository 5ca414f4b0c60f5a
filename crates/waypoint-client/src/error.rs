//! Navigation error taxonomy.
//!
//! Guards never let an error escape. Whatever a loader, validator or
//! middleware produces is converted into a [`NavigationError`] and then into
//! one of three actions: show an error page ([`ErrorState`]), reload the page
//! (asset failures) or follow a redirect.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Status code used when an error carries none.
pub const DEFAULT_STATUS_CODE: u16 = 500;

/// Status code synthesised when no component matches a route.
pub const NOT_FOUND_STATUS_CODE: u16 = 404;

/// Message shape emitted by bundlers when a code-split chunk cannot be fetched.
static ASSET_LOAD_FAILURE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^Loading( CSS)? chunk (\d)+ failed\.").expect("asset-load pattern is valid")
});

/// The error currently displayed by the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorState {
	/// HTTP-like status code.
	pub status_code: u16,
	/// Human readable message or message key.
	#[serde(default)]
	pub message: String,
}

impl ErrorState {
	/// Creates an error state.
	pub fn new(status_code: u16, message: impl Into<String>) -> Self {
		Self {
			status_code,
			message: message.into(),
		}
	}

	/// Creates a 404 error state.
	pub fn not_found(message: impl Into<String>) -> Self {
		Self::new(NOT_FOUND_STATUS_CODE, message)
	}
}

impl fmt::Display for ErrorState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}", self.status_code, self.message)
	}
}

/// Classification of a navigation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
	/// Raised by a route's setup code; shown as an error page.
	Transition,
	/// No component matched; shown as a 404 page.
	NotFound,
	/// Not a failure: the navigation was redirected.
	Redirect,
	/// A code-split asset could not be fetched; the page reloads.
	AssetLoad,
	/// Anything else; forwarded to the global error handler.
	Unhandled,
}

/// Nested `response` object of a loosely-shaped error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseStatus {
	/// Response status.
	pub status: Option<u16>,
}

/// Loosely-shaped error as produced by component loaders and the page payload.
///
/// Only the fields the pipeline inspects are modelled. A status of `0` counts
/// as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawError {
	/// Explicit status code.
	pub status_code: Option<u16>,
	/// Explicit status.
	pub status: Option<u16>,
	/// Nested response carrying a status.
	pub response: Option<ResponseStatus>,
	/// Error message.
	pub message: Option<String>,
	/// Classification supplied by the module loader, if it knows one.
	pub kind: Option<ErrorKind>,
}

impl RawError {
	/// Creates an error carrying only a message.
	pub fn message(message: impl Into<String>) -> Self {
		Self {
			message: Some(message.into()),
			..Self::default()
		}
	}

	/// Sets the explicit status code.
	pub fn with_status_code(mut self, status_code: u16) -> Self {
		self.status_code = Some(status_code);
		self
	}

	/// Sets the explicit status.
	pub fn with_status(mut self, status: u16) -> Self {
		self.status = Some(status);
		self
	}

	/// Sets the nested response status.
	pub fn with_response_status(mut self, status: u16) -> Self {
		self.response = Some(ResponseStatus {
			status: Some(status),
		});
		self
	}

	/// Sets the loader-supplied classification.
	pub fn with_kind(mut self, kind: ErrorKind) -> Self {
		self.kind = Some(kind);
		self
	}

	/// Status code in priority order: `statusCode`, `status`,
	/// `response.status`, then [`DEFAULT_STATUS_CODE`].
	pub fn resolve_status(&self) -> u16 {
		let present = |code: &u16| *code != 0;
		self.status_code
			.filter(present)
			.or(self.status.filter(present))
			.or(self
				.response
				.as_ref()
				.and_then(|response| response.status)
				.filter(present))
			.unwrap_or(DEFAULT_STATUS_CODE)
	}

	/// Whether this error means a code-split asset failed to load.
	///
	/// An explicit [`ErrorKind::AssetLoad`] wins; otherwise the message is
	/// matched against the bundler's chunk-failure wording.
	pub fn is_asset_load_failure(&self) -> bool {
		match self.kind {
			Some(kind) => kind == ErrorKind::AssetLoad,
			None => self
				.message
				.as_deref()
				.is_some_and(|message| ASSET_LOAD_FAILURE.is_match(message)),
		}
	}

	/// Converts to the displayed error state.
	pub fn to_error_state(&self) -> ErrorState {
		ErrorState::new(
			self.resolve_status(),
			self.message.clone().unwrap_or_default(),
		)
	}
}

impl From<RawError> for NavigationError {
	fn from(raw: RawError) -> Self {
		let message = raw.message.clone().unwrap_or_default();
		if raw.is_asset_load_failure() {
			return Self::AssetLoad(message);
		}
		match raw.kind {
			Some(ErrorKind::Redirect) => Self::Redirect(message),
			Some(ErrorKind::NotFound) => Self::NotFound { path: message },
			Some(ErrorKind::Unhandled) => Self::Unhandled(message),
			_ => Self::Transition {
				status_code: raw.resolve_status(),
				message,
			},
		}
	}
}

/// An error surfaced while a navigation is in flight.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
	/// Route setup code failed.
	#[error("transition failed with status {status_code}: {message}")]
	Transition {
		/// Status code to display.
		status_code: u16,
		/// Message to display.
		message: String,
	},
	/// No component matched the path.
	#[error("no component matched {path}")]
	NotFound {
		/// The unmatched path.
		path: String,
	},
	/// Sentinel: the navigation was redirected to the given path.
	#[error("redirected to {0}")]
	Redirect(String),
	/// A code-split asset could not be fetched.
	#[error("asset failed to load: {0}")]
	AssetLoad(String),
	/// Anything else.
	#[error("unhandled navigation error: {0}")]
	Unhandled(String),
}

impl NavigationError {
	/// Creates a transition error.
	pub fn transition(status_code: u16, message: impl Into<String>) -> Self {
		Self::Transition {
			status_code,
			message: message.into(),
		}
	}

	/// Classification of this error.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Transition { .. } => ErrorKind::Transition,
			Self::NotFound { .. } => ErrorKind::NotFound,
			Self::Redirect(_) => ErrorKind::Redirect,
			Self::AssetLoad(_) => ErrorKind::AssetLoad,
			Self::Unhandled(_) => ErrorKind::Unhandled,
		}
	}

	/// Status code this error displays as.
	pub fn status_code(&self) -> u16 {
		match self {
			Self::Transition { status_code, .. } => *status_code,
			Self::NotFound { .. } => NOT_FOUND_STATUS_CODE,
			_ => DEFAULT_STATUS_CODE,
		}
	}

	/// Whether this is the redirect sentinel.
	pub fn is_redirect(&self) -> bool {
		matches!(self, Self::Redirect(_))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(RawError::message("boom").with_status_code(403).with_status(401).with_response_status(502), 403)]
	#[case(RawError::message("boom").with_status(401).with_response_status(502), 401)]
	#[case(RawError::message("boom").with_response_status(502), 502)]
	#[case(RawError::message("boom"), 500)]
	#[case(RawError::message("boom").with_status_code(0).with_status(418), 418)]
	fn test_resolve_status_priority(#[case] raw: RawError, #[case] expected: u16) {
		assert_eq!(raw.resolve_status(), expected);
	}

	#[rstest]
	#[case("Loading chunk 42 failed.", true)]
	#[case("Loading CSS chunk 7 failed.\n(timeout)", true)]
	#[case("Failed loading chunk 42", false)]
	#[case("Loading chunk x failed.", false)]
	fn test_asset_load_message_detection(#[case] message: &str, #[case] expected: bool) {
		assert_eq!(RawError::message(message).is_asset_load_failure(), expected);
	}

	#[rstest]
	fn test_loader_kind_overrides_message() {
		let raw = RawError::message("network down").with_kind(ErrorKind::AssetLoad);
		assert!(raw.is_asset_load_failure());

		let raw = RawError::message("Loading chunk 1 failed.").with_kind(ErrorKind::Transition);
		assert!(!raw.is_asset_load_failure());
	}

	#[rstest]
	fn test_raw_error_deserializes_js_shape() {
		let raw: RawError =
			serde_json::from_str(r#"{"message":"nope","response":{"status":503}}"#).unwrap();
		assert_eq!(raw.to_error_state(), ErrorState::new(503, "nope"));
	}

	#[rstest]
	fn test_raw_error_into_navigation_error() {
		let err: NavigationError = RawError::message("gone").with_status(410).into();
		assert_eq!(err, NavigationError::transition(410, "gone"));
		assert_eq!(err.kind(), ErrorKind::Transition);

		let err: NavigationError = RawError::message("Loading chunk 3 failed.").into();
		assert_eq!(err.kind(), ErrorKind::AssetLoad);
	}

	#[rstest]
	fn test_navigation_error_status_codes() {
		let not_found = NavigationError::NotFound {
			path: "/missing".to_string(),
		};
		assert_eq!(not_found.status_code(), 404);
		assert_eq!(NavigationError::Unhandled("x".into()).status_code(), 500);
		assert!(NavigationError::Redirect("/b".into()).is_redirect());
		assert_eq!(not_found.to_string(), "no component matched /missing");
	}
}
