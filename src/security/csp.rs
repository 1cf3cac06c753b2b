//! Content-Security-Policy synthesis.
//!
//! Every response starts from [`DEFAULT_DIRECTIVES`]. Handlers widen a
//! directive by setting an `x-<directive>` response header with
//! comma-separated sources; those headers are folded into the policy and
//! removed before the response leaves the server.
//!
//! ```text
//! x-script-src: 'nonce-abc', https://cdn.example
//!     → script-src 'self' 'nonce-abc' https://cdn.example
//! ```

use axum::http::header::{CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS};
use axum::http::{HeaderMap, HeaderValue};
use thiserror::Error;

const SELF: &str = "'self'";
const UNSAFE_INLINE: &str = "'unsafe-inline'";

/// Directives in serialization order with their default source.
pub const DEFAULT_DIRECTIVES: [(&str, &str); 16] = [
    ("child-src", SELF),
    ("connect-src", SELF),
    ("default-src", SELF),
    ("frame-src", SELF),
    ("font-src", SELF),
    ("img-src", SELF),
    ("manifest-src", SELF),
    ("media-src", SELF),
    ("object-src", "'none'"),
    ("prefetch-src", SELF),
    ("script-src", SELF),
    ("style-src", SELF),
    ("worker-src", SELF),
    ("base-uri", "'none'"),
    ("frame-ancestors", "'none'"),
    ("form-action", SELF),
];

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("invalid header value for {name}")]
    InvalidValue { name: &'static str },
}

/// A per-response policy overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    directives: Vec<(&'static str, Vec<String>)>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            directives: DEFAULT_DIRECTIVES
                .iter()
                .map(|(name, token)| (*name, vec![token.to_string()]))
                .collect(),
        }
    }
}

impl Policy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sources for `directive`, if it is a known directive.
    pub fn sources(&self, directive: &str) -> Option<&[String]> {
        self.directives
            .iter()
            .find(|(name, _)| *name == directive)
            .map(|(_, tokens)| tokens.as_slice())
    }

    /// Append comma-separated sources to `directive`. Unknown directives
    /// and duplicate sources are ignored.
    pub fn extend(&mut self, directive: &str, sources: &str) {
        let Some((_, tokens)) = self.directives.iter_mut().find(|(name, _)| *name == directive) else {
            return;
        };
        for source in sources.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if !tokens.iter().any(|t| t == source) {
                tokens.push(source.to_string());
            }
        }
    }

    /// Drop nonces and hashes from an inline-allowing `style-src`, and
    /// elide `-src` directives that only repeat a `'self'` default-src.
    pub fn normalize(&mut self) {
        if let Some((_, styles)) = self.directives.iter_mut().find(|(name, _)| *name == "style-src") {
            if styles.iter().any(|t| t == UNSAFE_INLINE) {
                styles.retain(|t| !t.starts_with("'nonce-") && !t.starts_with("'sha256-"));
            }
        }

        if is_only_self(self.sources("default-src").unwrap_or_default()) {
            self.directives.retain(|(name, tokens)| {
                *name == "default-src" || !name.ends_with("-src") || !is_only_self(tokens)
            });
        }
    }

    /// Serialize as a header value: `name src src; name src`.
    pub fn to_header_string(&self) -> String {
        self.directives
            .iter()
            .map(|(name, tokens)| format!("{} {}", name, tokens.join(" ")))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

fn is_only_self(tokens: &[String]) -> bool {
    tokens.len() == 1 && tokens[0] == SELF
}

/// Fold `x-<directive>` overrides in `headers` into a policy and set the
/// security headers.
///
/// On error `headers` is left exactly as it was.
pub fn apply_policy(headers: &mut HeaderMap) -> Result<(), PolicyError> {
    let mut staged = headers.clone();
    let mut policy = Policy::new();

    for (directive, _) in DEFAULT_DIRECTIVES {
        let name = format!("x-{}", directive);
        let values: Vec<String> = staged
            .get_all(name.as_str())
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect();
        for value in &values {
            policy.extend(directive, value);
        }
        staged.remove(name.as_str());
    }
    policy.normalize();

    let value = HeaderValue::from_str(&policy.to_header_string()).map_err(|_| PolicyError::InvalidValue {
        name: "content-security-policy",
    })?;
    staged.insert(CONTENT_SECURITY_POLICY, value);
    staged.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    staged.insert(REFERRER_POLICY, HeaderValue::from_static("same-origin"));

    *headers = staged;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csp(headers: &HeaderMap) -> String {
        headers[CONTENT_SECURITY_POLICY].to_str().unwrap().to_string()
    }

    #[test]
    fn test_defaults_elide_redundant_self_sources() {
        let mut headers = HeaderMap::new();
        apply_policy(&mut headers).unwrap();
        assert_eq!(
            csp(&headers),
            "default-src 'self'; object-src 'none'; base-uri 'none'; \
             frame-ancestors 'none'; form-action 'self'"
        );
        assert_eq!(headers[X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[REFERRER_POLICY], "same-origin");
    }

    #[test]
    fn test_override_is_merged_and_stripped() {
        let mut headers = HeaderMap::new();
        headers.insert("x-script-src", HeaderValue::from_static("'nonce-abc', https://cdn.example"));
        apply_policy(&mut headers).unwrap();

        assert!(csp(&headers).contains("script-src 'self' 'nonce-abc' https://cdn.example"));
        assert!(headers.get("x-script-src").is_none());
    }

    #[test]
    fn test_unsafe_inline_drops_style_nonces_and_hashes() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-style-src",
            HeaderValue::from_static("'nonce-abc', 'sha256-xyz', 'unsafe-inline'"),
        );
        apply_policy(&mut headers).unwrap();

        let value = csp(&headers);
        assert!(value.contains("style-src 'self' 'unsafe-inline'"));
        assert!(!value.contains("nonce-"));
        assert!(!value.contains("sha256-"));
    }

    #[test]
    fn test_widened_default_src_keeps_self_directives() {
        let mut headers = HeaderMap::new();
        headers.insert("x-default-src", HeaderValue::from_static("https:"));
        apply_policy(&mut headers).unwrap();

        let value = csp(&headers);
        assert!(value.starts_with("child-src 'self'; connect-src 'self'; default-src 'self' https:"));
        assert!(value.contains("img-src 'self'"));
    }

    #[test]
    fn test_duplicate_and_empty_tokens_ignored() {
        let mut policy = Policy::new();
        policy.extend("img-src", "'self', , data:, data:");
        assert_eq!(policy.sources("img-src").unwrap(), ["'self'", "data:"]);
        policy.extend("not-a-directive", "x");
        assert!(policy.sources("not-a-directive").is_none());
    }

    #[test]
    fn test_non_utf8_override_is_skipped() {
        let mut headers = HeaderMap::new();
        headers.insert("x-img-src", HeaderValue::from_bytes(b"data:, \xffbad").unwrap());
        apply_policy(&mut headers).unwrap();

        assert!(headers.get("x-img-src").is_none());
        assert!(!csp(&headers).contains("img-src"));
    }
}
