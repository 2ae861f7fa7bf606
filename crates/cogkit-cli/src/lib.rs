//! # cogkit-cli
//!
//! Command line tools for cogkit template authors and operators.
//!
//! This crate provides:
//!
//! - **Commands** - A framework for defining and registering CLI commands
//!   ([`ManagementCommand`], [`CommandRegistry`])
//! - **Built-in commands** - `render`, `check` and `preview`
//! - **Entry point** - [`run`], which loads settings, sets up logging and
//!   dispatches, as the `cogkit` binary does
//!
//! ## Quick Start
//!
//! ```rust
//! use cogkit_cli::command::CommandRegistry;
//! use cogkit_cli::commands::register_builtin_commands;
//!
//! let mut registry = CommandRegistry::new();
//! register_builtin_commands(&mut registry);
//!
//! let names = registry.list_commands();
//! assert!(names.contains(&"render"));
//! assert!(names.contains(&"check"));
//! ```

// These clippy lints are intentionally allowed:
// - doc_markdown: backtick requirements for documentation items are too strict
// - unused_async: command handlers keep a consistent async signature
#![allow(clippy::doc_markdown)]
#![allow(clippy::unused_async)]

pub mod command;
pub mod commands;

pub use command::{CommandRegistry, ManagementCommand};

use std::ffi::OsString;
use std::path::Path;

use cogkit_core::logging::setup_logging;
use cogkit_core::settings_loader;
use cogkit_core::{CogError, CogResult, Settings};

/// Loads settings from `path` when given, otherwise from the environment.
pub fn load_settings(path: Option<&Path>) -> CogResult<Settings> {
    match path {
        Some(path) => settings_loader::from_file_with_env(path),
        None => Ok(settings_loader::from_env()),
    }
}

/// Parses `args`, loads settings, sets up logging and runs the chosen command.
///
/// Argument errors are returned as [`CogError::UsageError`]; clap's help and
/// version output is printed and treated as success.
pub async fn run<I, T>(args: I) -> CogResult<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut registry = CommandRegistry::new();
    commands::register_builtin_commands(&mut registry);

    let matches = match registry.build_cli().try_get_matches_from(args) {
        Ok(matches) => matches,
        Err(e) if !e.use_stderr() => {
            print!("{e}");
            return Ok(());
        }
        Err(e) => return Err(CogError::UsageError(e.to_string())),
    };

    let settings_path = matches.get_one::<String>(command::SETTINGS_ARG).map(Path::new);
    let settings = load_settings(settings_path)?;
    setup_logging(&settings);

    registry.execute(&matches, &settings).await
}
