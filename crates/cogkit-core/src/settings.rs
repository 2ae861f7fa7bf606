//! Settings for cogkit.
//!
//! This module provides the [`Settings`] struct, which holds process-wide
//! configuration, and [`TemplateSettings`], the template engine's share of it.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The default render budget in milliseconds.
pub const DEFAULT_RENDER_TIMEOUT_MS: u64 = 250;

/// The default cap on rendered output, in bytes.
pub const DEFAULT_MAX_OUTPUT_LEN: usize = 1024 * 1024;

/// The default cap on `range(...)` and repetition results.
pub const DEFAULT_MAX_RANGE: usize = 100_000;

/// Template engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSettings {
    /// Wall-clock budget for a single render, in milliseconds.
    pub render_timeout_ms: u64,
    /// Maximum length of rendered output, in bytes.
    pub max_output_len: usize,
    /// Maximum number of items `range(...)` or a repetition may produce.
    pub max_range: usize,
}

impl TemplateSettings {
    /// Returns the render budget as a [`Duration`].
    pub const fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            render_timeout_ms: DEFAULT_RENDER_TIMEOUT_MS,
            max_output_len: DEFAULT_MAX_OUTPUT_LEN,
            max_range: DEFAULT_MAX_RANGE,
        }
    }
}

/// The complete set of settings.
///
/// # Examples
///
/// ```
/// use cogkit_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert!(!settings.debug);
/// assert_eq!(settings.template.render_timeout_ms, 250);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Whether debug mode is enabled (pretty logs instead of JSON).
    pub debug: bool,
    /// The log filter directive (e.g. "info", "cogkit_template=debug").
    pub log_level: String,
    /// Template engine configuration.
    pub template: TemplateSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: "info".to_string(),
            template: TemplateSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let s = Settings::default();
        assert!(!s.debug);
        assert_eq!(s.log_level, "info");
        assert_eq!(s.template.render_timeout_ms, 250);
        assert_eq!(s.template.max_output_len, 1024 * 1024);
        assert_eq!(s.template.max_range, 100_000);
    }

    #[test]
    fn test_render_timeout_duration() {
        let t = TemplateSettings {
            render_timeout_ms: 1500,
            ..TemplateSettings::default()
        };
        assert_eq!(t.render_timeout(), Duration::from_millis(1500));
    }
}
