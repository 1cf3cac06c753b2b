//! Template rendering subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     components/ directory
//!     → components.rs (register each template under its file stem)
//!     → TemplateRenderer (frozen behind Arc)
//!
//! Per request:
//!     route template + platform props + global props
//!     → TemplateRenderer::render
//!     → HTML string
//! ```
//!
//! # Design Decisions
//! - The engine is a trait; `BasicRenderer` is the built-in default
//! - Components are registered before the renderer is shared

pub mod basic;
pub mod components;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use basic::BasicRenderer;
pub use components::load_components;

/// Property bag passed to templates.
pub type Props = Map<String, Value>;

/// Error raised by a template engine.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unknown component `{0}`")]
    UnknownComponent(String),

    #[error("component nesting deeper than {0} levels")]
    TooDeep(usize),

    #[error("unterminated tag starting at byte {0}")]
    Unterminated(usize),

    #[error("render failed: {0}")]
    Engine(String),
}

/// A template engine.
#[async_trait]
pub trait TemplateRenderer: Send + Sync {
    /// Render `template` with route `props` and site-wide `globals`.
    async fn render(&self, template: &str, props: &Props, globals: &Props) -> Result<String, RenderError>;

    fn has_template(&self, name: &str) -> bool;

    /// Register a named component template.
    fn set_template(&mut self, name: &str, template: String);
}
