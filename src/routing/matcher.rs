//! URL pattern matching.
//!
//! # Responsibilities
//! - Compile a pattern string (`/blog/:slug/`, `/_/immutable/*`) once
//! - Match a request path against it, capturing named parameters
//!
//! # Design Decisions
//! - Path matching is case-sensitive and anchored at both ends
//! - `:name` captures exactly one non-empty segment
//! - `*` captures any remainder, including slashes; captures are numbered
//! - Everything else is literal text, percent-encoded the way request
//!   paths arrive (`/about us` matches `/about%20us`)

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Characters escaped in a URL path.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Parameters captured by a pattern match.
pub type Params = HashMap<String, String>;

/// Error compiling a pattern.
#[derive(Debug, Error)]
#[error("invalid pattern `{pattern}`: {source}")]
pub struct PatternError {
    pattern: String,
    #[source]
    source: regex::Error,
}

/// A compiled URL path pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
    names: Vec<String>,
}

impl Pattern {
    /// Compile a pattern string.
    pub fn parse(source: &str) -> Result<Self, PatternError> {
        let mut expr = String::with_capacity(source.len() + 8);
        let mut names = Vec::new();
        let mut wildcards = 0usize;
        let mut literal = String::new();

        expr.push('^');
        let mut chars = source.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                ':' if chars.peek().is_some_and(|n| n.is_ascii_alphabetic() || *n == '_') => {
                    push_literal(&mut expr, &literal);
                    literal.clear();
                    let mut name = String::new();
                    while let Some(&n) = chars.peek() {
                        if n.is_ascii_alphanumeric() || n == '_' {
                            name.push(n);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    expr.push_str("([^/]+?)");
                    names.push(name);
                }
                '*' => {
                    push_literal(&mut expr, &literal);
                    literal.clear();
                    expr.push_str("(.*)");
                    names.push(wildcards.to_string());
                    wildcards += 1;
                }
                _ => literal.push(c),
            }
        }
        push_literal(&mut expr, &literal);
        expr.push('$');

        let regex = Regex::new(&expr).map_err(|err| PatternError {
            pattern: source.to_string(),
            source: err,
        })?;

        Ok(Self {
            source: source.to_string(),
            regex,
            names,
        })
    }

    /// A pattern matching every path.
    pub fn any() -> Self {
        Self {
            source: "*".to_string(),
            regex: Regex::new("^(.*)$").expect("static regex"),
            names: vec!["0".to_string()],
        }
    }

    /// Match a path, returning the captured parameters.
    pub fn exec(&self, path: &str) -> Option<Params> {
        let captures = self.regex.captures(path)?;
        let params = self
            .names
            .iter()
            .enumerate()
            .filter_map(|(i, name)| {
                captures
                    .get(i + 1)
                    .map(|m| (name.clone(), m.as_str().to_string()))
            })
            .collect();
        Some(params)
    }

    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

fn push_literal(expr: &mut String, literal: &str) {
    let encoded = utf8_percent_encode(literal, PATH).to_string();
    expr.push_str(&regex::escape(&encoded));
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
