//! Path matching.
//!
//! The router only needs "path in, matched records out". [`SegmentMatcher`]
//! compares literal and `{param}` segments; applications with richer patterns
//! plug in their own [`RouteMatcher`].

use std::collections::BTreeMap;
use std::rc::Rc;

use super::route::{MatchedRecord, RouteRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
	Literal(String),
	Param(String),
}

/// A compiled path pattern such as `/users/{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
	source: String,
	segments: Vec<Segment>,
}

impl PathPattern {
	/// Compiles a pattern.
	pub fn new(pattern: &str) -> Self {
		let segments = split_segments(pattern)
			.map(|segment| {
				match segment
					.strip_prefix('{')
					.and_then(|rest| rest.strip_suffix('}'))
				{
					Some(name) => Segment::Param(name.to_string()),
					None => Segment::Literal(segment.to_string()),
				}
			})
			.collect();
		Self {
			source: pattern.to_string(),
			segments,
		}
	}

	/// The pattern as written.
	pub fn as_str(&self) -> &str {
		&self.source
	}

	/// Parameter values when `path` matches the whole pattern.
	pub fn captures(&self, path: &str) -> Option<BTreeMap<String, String>> {
		let parts: Vec<&str> = split_segments(path).collect();
		if parts.len() != self.segments.len() {
			return None;
		}
		let mut params = BTreeMap::new();
		for (segment, part) in self.segments.iter().zip(parts) {
			match segment {
				Segment::Literal(literal) if literal == part => {}
				Segment::Literal(_) => return None,
				Segment::Param(name) => {
					params.insert(name.clone(), part.to_string());
				}
			}
		}
		Some(params)
	}
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
	path.split('/').filter(|segment| !segment.is_empty())
}

/// Joins a child pattern onto its parent. Absolute children stay as written.
pub(crate) fn join_paths(parent: &str, child: &str) -> String {
	if child.starts_with('/') {
		return child.to_string();
	}
	let parent = parent.trim_end_matches('/');
	if child.is_empty() {
		if parent.is_empty() {
			"/".to_string()
		} else {
			parent.to_string()
		}
	} else {
		format!("{parent}/{child}")
	}
}

/// A compiled route tree node.
#[derive(Debug)]
pub struct RouteNode {
	pattern: PathPattern,
	record: Rc<MatchedRecord>,
	children: Vec<RouteNode>,
}

impl RouteNode {
	/// Compiles `record` and its children under `parent`.
	pub(crate) fn compile(parent: &str, record: &RouteRecord) -> Self {
		let full = join_paths(parent, &record.path);
		let children = record
			.children
			.iter()
			.map(|child| RouteNode::compile(&full, child))
			.collect();
		Self {
			pattern: PathPattern::new(&full),
			record: Rc::new(MatchedRecord::from_record(full, record)),
			children,
		}
	}

	/// Full pattern of this node.
	pub fn pattern(&self) -> &PathPattern {
		&self.pattern
	}

	/// Shared record of this node.
	pub fn record(&self) -> &Rc<MatchedRecord> {
		&self.record
	}

	/// Child nodes.
	pub fn children(&self) -> &[RouteNode] {
		&self.children
	}
}

/// Result of matching a path.
#[derive(Debug, Clone)]
pub struct PathMatch {
	/// Matched records, outermost first.
	pub matched: Vec<Rc<MatchedRecord>>,
	/// Extracted path parameters.
	pub params: BTreeMap<String, String>,
}

/// Maps a path to matched records.
pub trait RouteMatcher {
	/// Matches `path` (no query, no hash) against `routes`.
	fn match_path(&self, routes: &[RouteNode], path: &str) -> Option<PathMatch>;
}

/// Literal and `{param}` segment comparison, first declared route wins.
///
/// Deeper matches win over their ancestors.
#[derive(Debug, Default, Clone, Copy)]
pub struct SegmentMatcher;

impl SegmentMatcher {
	fn match_node(node: &RouteNode, path: &str) -> Option<PathMatch> {
		for child in &node.children {
			if let Some(mut found) = Self::match_node(child, path) {
				found.matched.insert(0, node.record.clone());
				return Some(found);
			}
		}
		node.pattern.captures(path).map(|params| PathMatch {
			matched: vec![node.record.clone()],
			params,
		})
	}
}

impl RouteMatcher for SegmentMatcher {
	fn match_path(&self, routes: &[RouteNode], path: &str) -> Option<PathMatch> {
		routes.iter().find_map(|node| Self::match_node(node, path))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::component::ComponentDef;
	use rstest::rstest;

	fn tree() -> Vec<RouteNode> {
		let users = RouteRecord::named("users", "/users", ComponentDef::new("users"))
			.with_child(RouteRecord::named("user", "{id}", ComponentDef::new("user")))
			.with_child(RouteRecord::named("user-posts", "{id}/posts", ComponentDef::new("posts")));
		vec![
			RouteNode::compile("", &RouteRecord::named("home", "/", ComponentDef::new("home"))),
			RouteNode::compile("", &users),
		]
	}

	#[rstest]
	#[case("/users", "", "/users")]
	#[case("/users", "{id}", "/users/{id}")]
	#[case("/users/", "", "/users")]
	#[case("", "", "/")]
	#[case("/users", "/absolute", "/absolute")]
	fn test_join_paths(#[case] parent: &str, #[case] child: &str, #[case] expected: &str) {
		assert_eq!(join_paths(parent, child), expected);
	}

	#[rstest]
	fn test_pattern_captures_params() {
		let pattern = PathPattern::new("/users/{id}/posts/{post}");
		let params = pattern.captures("/users/7/posts/hello").unwrap();
		assert_eq!(params.get("id").map(String::as_str), Some("7"));
		assert_eq!(params.get("post").map(String::as_str), Some("hello"));
		assert!(pattern.captures("/users/7/posts").is_none());
		assert!(pattern.captures("/user/7/posts/hello").is_none());
	}

	#[rstest]
	fn test_nested_match_returns_chain() {
		let routes = tree();
		let found = SegmentMatcher.match_path(&routes, "/users/42/posts").unwrap();
		let paths: Vec<&str> = found.matched.iter().map(|r| r.path()).collect();
		assert_eq!(paths, vec!["/users", "/users/{id}/posts"]);
		assert_eq!(found.params.get("id").map(String::as_str), Some("42"));
	}

	#[rstest]
	fn test_parent_matches_its_own_path() {
		let routes = tree();
		let found = SegmentMatcher.match_path(&routes, "/users").unwrap();
		assert_eq!(found.matched.len(), 1);
		assert_eq!(found.matched[0].name(), Some("users"));
	}

	#[rstest]
	fn test_unknown_path_has_no_match() {
		assert!(SegmentMatcher.match_path(&tree(), "/does-not-exist").is_none());
	}

	#[rstest]
	fn test_records_are_shared_between_matches() {
		let routes = tree();
		let first = SegmentMatcher.match_path(&routes, "/").unwrap();
		let second = SegmentMatcher.match_path(&routes, "/").unwrap();
		assert!(Rc::ptr_eq(&first.matched[0], &second.matched[0]));
	}
}
