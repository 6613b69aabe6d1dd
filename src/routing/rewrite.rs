//! Path rewriting.
//!
//! The matched prefix of the request path is replaced by the route's rewrite
//! target and the remaining suffix is kept:
//!
//! ```text
//! match /api/  target /    request /api/items  → /items
//! match /      target /    request /api/items  → /api/items
//! match /api   target /v2  request /api/items  → /v2/items
//! match /api/  target /v2  request /api/items  → /v2/items
//! ```

/// Replace the first `matched_len` bytes of `path` with `target`.
///
/// A slash shared by the end of `target` and the start of the suffix is
/// emitted once. A slash consumed by the match is put back when `target`
/// lacks one, so the suffix stays its own segment. Rewriting a prefix to
/// itself returns `path` untouched.
pub fn rewrite_path(path: &str, matched_len: usize, target: &str) -> String {
    let (matched, suffix) = path.split_at(matched_len);
    if matched == target {
        return path.to_string();
    }

    let mut rewritten = String::with_capacity(target.len() + suffix.len() + 1);
    rewritten.push_str(target);
    if target.ends_with('/') {
        rewritten.push_str(suffix.strip_prefix('/').unwrap_or(suffix));
    } else {
        if matched.ends_with('/') && !suffix.is_empty() && !suffix.starts_with('/') {
            rewritten.push('/');
        }
        rewritten.push_str(suffix);
    }
    rewritten
}
