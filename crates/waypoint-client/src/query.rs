//! Query-string helpers.
//!
//! [`diff_query`] decides whether a navigation only touched the query string.

use std::collections::{BTreeMap, BTreeSet};

/// Parsed query string. Repeated keys keep their last value.
pub type QueryMap = BTreeMap<String, String>;

/// Keys whose values differ between `a` and `b`.
///
/// A key is included when it is present in exactly one of the maps, or in
/// both with unequal values. The result is the same for `(a, b)` and `(b, a)`.
pub fn diff_query(a: &QueryMap, b: &QueryMap) -> BTreeSet<String> {
	let mut diff = BTreeSet::new();
	for (key, value) in a {
		if b.get(key) != Some(value) {
			diff.insert(key.clone());
		}
	}
	for key in b.keys() {
		if !a.contains_key(key) {
			diff.insert(key.clone());
		}
	}
	diff
}

/// Parses `a=1&b=2` (without the leading `?`).
///
/// Malformed input yields an empty map.
pub fn parse_query(raw: &str) -> QueryMap {
	match serde_urlencoded::from_str::<Vec<(String, String)>>(raw) {
		Ok(pairs) => pairs.into_iter().collect(),
		Err(err) => {
			tracing::debug!(query = raw, error = %err, "ignoring malformed query string");
			QueryMap::new()
		}
	}
}

/// A full path split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
	/// Path without query or hash.
	pub path: String,
	/// Raw query string without the `?`.
	pub query: Option<String>,
	/// Fragment without the `#`.
	pub hash: Option<String>,
}

impl Location {
	/// Splits `/path?query#hash`.
	pub fn parse(full_path: &str) -> Self {
		let (rest, hash) = match full_path.split_once('#') {
			Some((rest, hash)) => (rest, Some(hash.to_string())),
			None => (full_path, None),
		};
		let (path, query) = match rest.split_once('?') {
			Some((path, query)) => (path, Some(query.to_string())),
			None => (rest, None),
		};
		let path = if path.is_empty() { "/" } else { path };

		Self {
			path: path.to_string(),
			query: query.filter(|q| !q.is_empty()),
			hash: hash.filter(|h| !h.is_empty()),
		}
	}

	/// Reassembles the full path.
	pub fn full_path(&self) -> String {
		let mut full = self.path.clone();
		if let Some(query) = &self.query {
			full.push('?');
			full.push_str(query);
		}
		if let Some(hash) = &self.hash {
			full.push('#');
			full.push_str(hash);
		}
		full
	}

	/// Parsed query map.
	pub fn query_map(&self) -> QueryMap {
		self.query.as_deref().map(parse_query).unwrap_or_default()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn map(pairs: &[(&str, &str)]) -> QueryMap {
		pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect()
	}

	#[rstest]
	fn test_diff_query_changed_value() {
		let diff = diff_query(&map(&[("x", "1")]), &map(&[("x", "2")]));
		assert_eq!(diff, BTreeSet::from(["x".to_string()]));
	}

	#[rstest]
	fn test_diff_query_unique_keys_both_sides() {
		let a = map(&[("x", "1"), ("keep", "y")]);
		let b = map(&[("keep", "y"), ("z", "3")]);
		let diff = diff_query(&a, &b);
		assert_eq!(diff, BTreeSet::from(["x".to_string(), "z".to_string()]));
	}

	#[rstest]
	fn test_diff_query_identical_is_empty() {
		let a = map(&[("page", "2"), ("sort", "asc")]);
		assert!(diff_query(&a, &a.clone()).is_empty());
	}

	#[rstest]
	fn test_parse_query_decodes_and_keeps_last() {
		let query = parse_query("q=hello%20world&page=1&page=2");
		assert_eq!(query.get("q").map(String::as_str), Some("hello world"));
		assert_eq!(query.get("page").map(String::as_str), Some("2"));
	}

	#[rstest]
	#[case("/a?x=1#top", "/a", Some("x=1"), Some("top"))]
	#[case("/a", "/a", None, None)]
	#[case("?x=1", "/", Some("x=1"), None)]
	#[case("/a?#", "/a", None, None)]
	fn test_location_parse(
		#[case] input: &str,
		#[case] path: &str,
		#[case] query: Option<&str>,
		#[case] hash: Option<&str>,
	) {
		let location = Location::parse(input);
		assert_eq!(location.path, path);
		assert_eq!(location.query.as_deref(), query);
		assert_eq!(location.hash.as_deref(), hash);
	}

	#[rstest]
	fn test_location_round_trip_normalizes_empty_parts() {
		assert_eq!(Location::parse("/a?#").full_path(), "/a");
		assert_eq!(Location::parse("/a?x=1#h").full_path(), "/a?x=1#h");
	}
}
