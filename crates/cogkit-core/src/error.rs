//! Core error types for cogkit.
//!
//! [`RenderError`] is the error returned by the template engine. Its variants
//! separate failures the template author can fix (syntax, evaluation faults)
//! from the execution budget running out, so callers can give different
//! guidance for each. [`CogError`] is the workspace-wide error that wraps
//! render failures together with configuration and IO problems.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// A position inside a template source, attached to syntax errors.
///
/// Lines and columns are 1-based and count characters, not bytes, so they
/// can be shown to a template author as-is.
///
/// # Examples
///
/// ```
/// use cogkit_core::error::SourceLocation;
///
/// let loc = SourceLocation::new(2, 5, "{% endfor %}");
/// assert_eq!(loc.to_string(), "line 2, column 5 (near `{% endfor %}`)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// The 1-based line number.
    pub line: usize,
    /// The 1-based column number.
    pub column: usize,
    /// The offending fragment of template text.
    pub fragment: String,
}

impl SourceLocation {
    /// Creates a new location.
    pub fn new(line: usize, column: usize, fragment: impl Into<String>) -> Self {
        Self {
            line,
            column,
            fragment: fragment.into(),
        }
    }

    /// Computes the location of a byte offset within `source`.
    ///
    /// Offsets past the end of the source are clamped to the end.
    pub fn from_offset(source: &str, offset: usize, fragment: impl Into<String>) -> Self {
        let mut offset = offset.min(source.len());
        while !source.is_char_boundary(offset) {
            offset -= 1;
        }
        let before = &source[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = source[line_start..offset].chars().count() + 1;
        Self::new(line, column, fragment)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)?;
        if !self.fragment.is_empty() {
            write!(f, " (near `{}`)", self.fragment)?;
        }
        Ok(())
    }
}

/// The error type returned by template compilation and rendering.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The template source is malformed.
    #[error("Template syntax error at {location}: {message}")]
    Syntax {
        /// A human-readable description of the problem.
        message: String,
        /// Where in the template the problem was found.
        location: SourceLocation,
    },

    /// Rendering did not finish within the execution budget.
    #[error("Template rendering timed out after {}ms", budget.as_millis())]
    TimedOut {
        /// The budget that was exceeded.
        budget: Duration,
    },

    /// The template is valid but failed while being evaluated, e.g. a
    /// division by zero or a sandbox resource limit.
    #[error("Template evaluation error: {message}")]
    Evaluation {
        /// A human-readable description of the problem.
        message: String,
    },
}

impl RenderError {
    /// Creates a syntax error.
    pub fn syntax(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::Syntax {
            message: message.into(),
            location,
        }
    }

    /// Creates an evaluation error.
    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::Evaluation {
            message: message.into(),
        }
    }

    /// Returns `true` for [`RenderError::TimedOut`].
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// Returns text suitable for showing to the person who wrote the template.
    pub fn user_message(&self) -> String {
        match self {
            Self::Syntax { message, location } => {
                format!("Your template is invalid: {message} at {location}.")
            }
            Self::TimedOut { .. } => "Your template took too long to render. This is a \
                 limit on the bot's side; try simplifying the template."
                .to_string(),
            Self::Evaluation { message } => {
                format!("Your template could not be rendered: {message}.")
            }
        }
    }
}

/// The primary error type for cogkit.
#[derive(Error, Debug)]
pub enum CogError {
    // ── Templates ────────────────────────────────────────────────────

    /// Compiling or rendering a template failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    // ── Configuration ────────────────────────────────────────────────

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    // ── Command line ─────────────────────────────────────────────────

    /// A command was invoked with bad arguments.
    #[error("Usage error: {0}")]
    UsageError(String),

    // ── Serialization ────────────────────────────────────────────────

    /// An error occurred during serialization or deserialization.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CogError {
    /// Returns the process exit code for this error.
    ///
    /// - `UsageError` -> 2
    /// - `Render` -> 3
    /// - everything else -> 1
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::UsageError(_) => 2,
            Self::Render(_) => 3,
            Self::ConfigurationError(_) | Self::SerializationError(_) | Self::IoError(_) => 1,
        }
    }
}

/// A convenience type alias for `Result<T, CogError>`.
pub type CogResult<T> = Result<T, CogError>;
