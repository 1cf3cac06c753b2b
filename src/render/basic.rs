//! Built-in template engine.
//!
//! Supports two tag forms:
//! - `{{ key }}` / `{{ a.b.0 }}`: value from route props, then globals,
//!   HTML-escaped. Missing values render as nothing.
//! - `{{> name }}`: the registered component `name`, rendered in place.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use super::{Props, RenderError, TemplateRenderer};

const MAX_DEPTH: usize = 16;

#[derive(Debug, Default, Clone)]
pub struct BasicRenderer {
    components: HashMap<String, String>,
}

impl BasicRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous rendering entry point.
    pub fn render_str(&self, template: &str, props: &Props, globals: &Props) -> Result<String, RenderError> {
        let mut out = String::with_capacity(template.len());
        self.expand(template, props, globals, 0, &mut out)?;
        Ok(out)
    }

    fn expand(
        &self,
        template: &str,
        props: &Props,
        globals: &Props,
        depth: usize,
        out: &mut String,
    ) -> Result<(), RenderError> {
        let mut rest = template;
        let mut offset = 0;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after
                .find("}}")
                .ok_or(RenderError::Unterminated(offset + start))?;
            let tag = after[..end].trim();

            if let Some(name) = tag.strip_prefix('>') {
                let name = name.trim();
                if depth >= MAX_DEPTH {
                    return Err(RenderError::TooDeep(MAX_DEPTH));
                }
                let component = self
                    .components
                    .get(name)
                    .ok_or_else(|| RenderError::UnknownComponent(name.to_string()))?;
                self.expand(component, props, globals, depth + 1, out)?;
            } else if let Some(value) = lookup(tag, props).or_else(|| lookup(tag, globals)) {
                escape_into(&display(value), out);
            }

            let consumed = start + 2 + end + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }

        out.push_str(rest);
        Ok(())
    }
}

#[async_trait]
impl TemplateRenderer for BasicRenderer {
    async fn render(&self, template: &str, props: &Props, globals: &Props) -> Result<String, RenderError> {
        self.render_str(template, props, globals)
    }

    fn has_template(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    fn set_template(&mut self, name: &str, template: String) {
        self.components.insert(name.to_string(), template);
    }
}

fn lookup<'a>(path: &str, props: &'a Props) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = props.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}
