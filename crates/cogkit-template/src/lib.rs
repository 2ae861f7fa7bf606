//! # cogkit-template
//!
//! A sandboxed, time-bounded template engine for short user-authored text
//! such as voice-channel names and hint messages.
//!
//! Templates use `{{ expression }}`, `{% statement %}`, and `{# comment #}`
//! markers. They only ever see the data in their [`Context`], cannot call
//! anything but allow-listed globals, and are rendered on a worker that the
//! caller stops waiting for once the render budget is spent.
//!
//! ## Modules
//!
//! - [`context`] - Render context and values
//! - [`lexer`] - Markup and expression tokenizer
//! - [`ast`] - Compiled template tree
//! - [`parser`] - Tokens to template tree
//! - [`sandbox`] - Lookup rules, globals, and resource limits
//! - [`filters`] - Filter trait, registry, and built-in filters
//! - [`random`] - Seeded `random` and `shuffle` filters
//! - [`timeout`] - Deadlines and time-bounded workers
//! - [`engine`] - The engine and compiled templates
//! - [`preview`] - Preview sets for template authors
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//!
//! use cogkit_template::Context;
//!
//! let ctx = Context::new().with("name", "World");
//! let budget = Duration::from_millis(250);
//! let out = cogkit_template::render("Hello, {{ name }}!", &ctx, budget).unwrap();
//! assert_eq!(out, "Hello, World!");
//! ```

use std::time::Duration;

pub mod ast;
pub mod context;
pub mod engine;
pub mod filters;
pub mod lexer;
pub mod parser;
pub mod preview;
pub mod random;
mod render;
pub mod sandbox;
pub mod timeout;

// Re-export the most commonly used types at the crate root.
pub use cogkit_core::error::{RenderError, SourceLocation};
pub use context::{Context, ContextValue};
pub use engine::{Engine, Template};
pub use filters::{Filter, FilterRegistry, FilterState};
pub use sandbox::Limits;
pub use timeout::Deadline;

/// Compiles a template with the built-in filters.
pub fn compile(source: &str) -> Result<Template, RenderError> {
    engine::Template::compile_with(source, filters::default_registry())
}

/// Compiles and renders a template with a default engine, within `budget`.
pub fn render(source: &str, context: &Context, budget: Duration) -> Result<String, RenderError> {
    Engine::new().render_with_timeout(source, context, budget)
}
