//! Path matching logic.
//!
//! # Responsibilities
//! - Match request paths exactly (`Exact`)
//! - Match request paths by segment-aligned prefix (`Prefix`)
//! - Report how much of the path was consumed, for rewriting
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - A prefix only matches on a segment boundary: `/api` matches `/api` and
//!   `/api/items`, never `/apis`
//! - The `/` prefix matches every non-empty path. A path without a leading
//!   `/` (e.g. `*`) matches with length 0
//! - No regex to guarantee O(n) matching

use crate::config::PathType;

/// Trait for matching request paths against a route condition.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns the length of the matched prefix of `path`, or `None`.
    fn match_len(&self, path: &str) -> Option<usize>;

    /// Returns true if the path matches this condition.
    fn matches(&self, path: &str) -> bool {
        self.match_len(path).is_some()
    }
}

/// Matches one literal path.
#[derive(Debug, Clone)]
pub struct ExactMatcher {
    path: String,
}

impl ExactMatcher {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Matcher for ExactMatcher {
    fn match_len(&self, path: &str) -> Option<usize> {
        (path == self.path).then_some(path.len())
    }
}

/// Matches the request path prefix on a segment boundary.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn match_len(&self, path: &str) -> Option<usize> {
        if self.prefix == "/" && !path.is_empty() && !path.starts_with('/') {
            return Some(0);
        }
        let rest = path.strip_prefix(self.prefix.as_str())?;
        let on_boundary =
            self.prefix.ends_with('/') || rest.is_empty() || rest.starts_with('/');
        on_boundary.then_some(self.prefix.len())
    }
}

/// Build the matcher for a configured path and mode.
pub fn build_matcher(path: &str, path_type: PathType) -> Box<dyn Matcher> {
    match path_type {
        PathType::Exact => Box::new(ExactMatcher::new(path)),
        PathType::Prefix => Box::new(PathPrefixMatcher::new(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_matcher() {
        let matcher = ExactMatcher::new("/api");
        assert_eq!(matcher.match_len("/api"), Some(4));
        assert!(!matcher.matches("/api/"));
        assert!(!matcher.matches("/api/items"));
        assert!(!matcher.matches("/API"));
    }

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/api");

        assert!(matcher.matches("/api"));
        assert!(matcher.matches("/api/"));
        assert_eq!(matcher.match_len("/api/v1"), Some(4));
        assert!(!matcher.matches("/apis"));
        assert!(!matcher.matches("/images"));
    }

    #[test]
    fn test_trailing_slash_prefix() {
        let matcher = PathPrefixMatcher::new("/api/");
        assert!(matcher.matches("/api/items"));
        assert!(matcher.matches("/api/"));
        assert!(!matcher.matches("/api"));
    }

    #[test]
    fn test_root_prefix_is_catch_all() {
        let matcher = PathPrefixMatcher::new("/");
        for path in ["/", "/api", "/api/items", "/static/css/site.css", "//double"] {
            assert!(matcher.matches(path), "{path} should match /");
        }
        assert!(!matcher.matches(""));
    }

    #[test]
    fn test_root_prefix_matches_paths_without_leading_slash() {
        let matcher = PathPrefixMatcher::new("/");
        assert_eq!(matcher.match_len("api/items"), Some(0));
        assert_eq!(matcher.match_len("*"), Some(0));
        assert_eq!(matcher.match_len("/api"), Some(1));

        let matcher = PathPrefixMatcher::new("/api");
        assert!(!matcher.matches("api/items"));
    }
}
