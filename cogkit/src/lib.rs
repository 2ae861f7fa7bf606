//! # cogkit
//!
//! A sandboxed, time-bounded template engine for chat-bot channel names and
//! hint text.
//!
//! This is the meta-crate that re-exports the sub-crates. Depend on `cogkit`
//! to get everything, or on the individual crates for finer-grained control.
//!
//! ```
//! use std::time::Duration;
//! use cogkit::prelude::*;
//!
//! let ctx = Context::new().with("game", "chess").with("dupenum", 2);
//! let name = render("{{ game | title }} #{{ dupenum }}", &ctx, Duration::from_millis(250))
//!     .unwrap();
//! assert_eq!(name, "Chess #2");
//! ```

/// Error types, settings, and logging.
pub use cogkit_core as core;

/// The template engine.
pub use cogkit_template as template;

/// Command line tools.
#[cfg(feature = "cli")]
pub use cogkit_cli as cli;

// Third-party re-exports for user convenience.
pub use serde_json;
pub use tokio;
pub use tracing;

/// The types most callers need.
pub mod prelude {
    pub use cogkit_core::{
        CogError, CogResult, RenderError, Settings, SourceLocation, TemplateSettings,
    };
    pub use cogkit_template::{
        compile, render, Context, ContextValue, Engine, Filter, FilterRegistry, Template,
    };
}
