//! Trailing-slash redirect derivation.
//!
//! Every GET route `/about` gets a companion `/about/` that redirects to
//! it, and `/blog/` gets `/blog`. Patterns ending in an extension or
//! containing a wildcard are left alone, as are `/`, `/404` and `/500`.
//! When both forms are real routes neither redirect is registered.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::manifest::{Manifest, RouteMethod};

const EXCLUDED: [&str; 3] = ["/", "/404", "/500"];

static NOT_REDIRECTABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.[\w]+$|\*").expect("static regex"));

/// A route pattern and the alternate form that redirects to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectPair {
    /// The pattern of the real route.
    pub canonical: String,
    /// The pattern with its trailing slash toggled.
    pub alternate: String,
}

/// Result of a derivation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redirects {
    /// Redirects to register.
    pub pairs: Vec<RedirectPair>,
    /// Pairs skipped because the alternate is already served.
    pub conflicts: Vec<RedirectPair>,
}

/// Derive redirects for a manifest.
///
/// Alternates already recorded in `manifest.redirects` count as served
/// GET patterns, so a second pass over the same manifest adds nothing.
pub fn derive_redirects(manifest: &Manifest) -> Redirects {
    let routes = manifest
        .routes
        .iter()
        .filter(|route| route.method == RouteMethod::Get)
        .map(|route| route.pattern.as_str());
    let registered = manifest.redirects.iter().map(|pair| pair.alternate.as_str());
    derive_from_patterns(routes.chain(registered))
}

/// Derive redirects from GET patterns in registration order.
pub fn derive_from_patterns<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Redirects {
    let mut seen = HashSet::new();
    let candidates: Vec<&str> = patterns
        .into_iter()
        .filter(|pattern| !EXCLUDED.contains(pattern))
        .filter(|pattern| !NOT_REDIRECTABLE.is_match(pattern))
        .filter(|pattern| seen.insert(*pattern))
        .collect();

    let mut redirects = Redirects::default();
    for pattern in &candidates {
        let pair = RedirectPair {
            canonical: pattern.to_string(),
            alternate: toggle_trailing_slash(pattern),
        };
        if seen.contains(pair.alternate.as_str()) {
            redirects.conflicts.push(pair);
        } else {
            redirects.pairs.push(pair);
        }
    }
    redirects
}

/// `/a` → `/a/`, `/a/` → `/a`.
pub fn toggle_trailing_slash(path: &str) -> String {
    match path.strip_suffix('/') {
        Some(stripped) => stripped.to_string(),
        None => format!("{}/", path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(canonical: &str, alternate: &str) -> RedirectPair {
        RedirectPair {
            canonical: canonical.into(),
            alternate: alternate.into(),
        }
    }

    #[test]
    fn test_toggle() {
        assert_eq!(toggle_trailing_slash("/about"), "/about/");
        assert_eq!(toggle_trailing_slash("/blog/"), "/blog");
    }

    #[test]
    fn test_derives_alternates() {
        let redirects = derive_from_patterns(["/about", "/blog/", "/:slug/"]);
        assert_eq!(
            redirects.pairs,
            vec![pair("/about", "/about/"), pair("/blog/", "/blog"), pair("/:slug/", "/:slug")]
        );
        assert!(redirects.conflicts.is_empty());
    }

    #[test]
    fn test_exclusions() {
        let redirects = derive_from_patterns(["/", "/404", "/500", "/feed.xml", "/files/*", "/ok"]);
        assert_eq!(redirects.pairs, vec![pair("/ok", "/ok/")]);
    }

    #[test]
    fn test_conflicts_are_reported_not_registered() {
        let redirects = derive_from_patterns(["/about", "/about/", "/contact"]);
        assert_eq!(redirects.pairs, vec![pair("/contact", "/contact/")]);
        assert_eq!(
            redirects.conflicts,
            vec![pair("/about", "/about/"), pair("/about/", "/about")]
        );
    }

    #[test]
    fn test_duplicates_are_collapsed() {
        let redirects = derive_from_patterns(["/about", "/about"]);
        assert_eq!(redirects.pairs.len(), 1);
    }

    #[test]
    fn test_derivation_is_idempotent() {
        let mut manifest = Manifest::default();
        let first = derive_from_patterns(["/about", "/blog/"]);
        manifest.redirects = first.pairs.clone();

        let routes = ["/about", "/blog/"];
        let registered = manifest.redirects.iter().map(|p| p.alternate.as_str());
        let second = derive_from_patterns(routes.into_iter().chain(registered));

        assert!(second.pairs.is_empty());
        assert_eq!(second.conflicts.len(), 4);
    }
}
