//! Logging integration for cogkit.
//!
//! Provides helpers for configuring [`tracing`]-based logging from
//! [`Settings`](crate::settings::Settings) and for creating per-render spans.

use crate::settings::Settings;

/// Sets up the global tracing subscriber based on the given settings.
///
/// The filter is read from `settings.log_level` (e.g. "debug",
/// "cogkit_template=trace"). In debug mode a pretty, human-readable format is
/// used; otherwise a structured JSON format is used. Logs go to stderr so
/// they never mix with rendered output. Installing a subscriber
/// twice is a no-op.
pub fn setup_logging(settings: &Settings) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if settings.debug {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .try_init()
            .ok();
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .json()
            .try_init()
            .ok();
    }
}

/// Creates a tracing span for a single template render.
///
/// # Examples
///
/// ```
/// use cogkit_core::logging::render_span;
///
/// let span = render_span(42, 250);
/// let _guard = span.enter();
/// tracing::debug!("rendering");
/// ```
pub fn render_span(template_len: usize, budget_ms: u128) -> tracing::Span {
    tracing::debug_span!("render", template_len, budget_ms)
}
