//! Route pattern compilation.
//!
//! Turns a route file's path relative to the routes root into the URL
//! pattern it is served under:
//!
//! ```text
//! index.html                 → /
//! about.html                 → /about
//! (marketing)/pricing.html   → /pricing
//! blog/[slug]/index.html     → /blog/:slug/
//! feed.rs + pattern ".xml"   → /feed.xml
//! ```

use regex::Regex;
use std::sync::LazyLock;

static GROUP_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]+?\)/?").expect("static regex"));
static NAMED_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+?)\]").expect("static regex"));
static EXTENSION_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.\w+$").expect("static regex"));

/// Compile the URL pattern for a route file.
///
/// `relative` uses forward slashes. `declared` is the pattern exported by
/// the route module, if any: a bare extension such as `.json` is appended,
/// anything else is joined as further path segments.
pub fn compile_pattern(relative: &str, declared: Option<&str>) -> String {
    let path = format!("/{}", relative.trim_start_matches('/'));
    let path = GROUP_SEGMENT.replace_all(&path, "");
    let path = NAMED_SEGMENT.replace_all(&path, ":$1");

    let (dir, file) = split_last(&path);
    let mut pattern = dir.to_string();
    if !pattern.ends_with('/') {
        pattern.push('/');
    }

    let stem = match file.rfind('.') {
        Some(dot) if dot > 0 => &file[..dot],
        _ => file,
    };
    if stem != "index" {
        pattern.push_str(stem);
    }

    match declared {
        Some(ext) if EXTENSION_ONLY.is_match(ext) => {
            pattern.push_str(ext);
            pattern
        }
        Some(segment) => posix_join(&pattern, segment),
        None => pattern,
    }
}

/// Split an absolute path into its directory and final component.
fn split_last(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(0) => ("/", &path[1..]),
        Some(i) => (&path[..i], &path[i + 1..]),
        None => ("/", path),
    }
}

/// Join two URL paths, resolving `.` and `..` and collapsing repeated
/// slashes. A trailing slash on the joined input is kept.
pub fn posix_join(base: &str, segment: &str) -> String {
    let joined = format!("{}/{}", base, segment);
    let trailing = joined.ends_with('/');

    let mut parts: Vec<&str> = Vec::new();
    for part in joined.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }

    let mut out = format!("/{}", parts.join("/"));
    if trailing && !out.ends_with('/') {
        out.push('/');
    }
    out
}
