//! Settings loading from configuration files.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML or JSON file (overriding defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `COGKIT_DEBUG` | `debug` |
//! | `COGKIT_LOG_LEVEL` | `log_level` |
//! | `COGKIT_RENDER_TIMEOUT_MS` | `template.render_timeout_ms` |
//! | `COGKIT_MAX_OUTPUT_LEN` | `template.max_output_len` |
//! | `COGKIT_MAX_RANGE` | `template.max_range` |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use cogkit_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file("config/cogkit.toml").unwrap();
//! let settings = settings_loader::from_file_with_env("config/cogkit.json").unwrap();
//! ```

use std::path::Path;

use crate::error::CogError;
use crate::settings::Settings;

/// Loads settings from a TOML string.
///
/// Fields not present in the TOML keep their default values.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, CogError> {
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| CogError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;
    merge_over_defaults(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, CogError> {
    from_toml_str(&read_config(path.as_ref(), "TOML")?)
}

/// Loads settings from a JSON string.
///
/// Fields not present in the JSON keep their default values.
pub fn from_json_str(json_str: &str) -> Result<Settings, CogError> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| CogError::ConfigurationError(format!("Failed to parse JSON: {e}")))?;
    merge_over_defaults(json_value, "JSON")
}

/// Loads settings from a JSON file.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<Settings, CogError> {
    from_json_str(&read_config(path.as_ref(), "JSON")?)
}

/// Loads settings from a `.toml` or `.json` file, then applies environment
/// variable overrides.
pub fn from_file_with_env(path: impl AsRef<Path>) -> Result<Settings, CogError> {
    let path = path.as_ref();
    let mut settings = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => from_toml_file(path)?,
        Some("json") => from_json_file(path)?,
        _ => {
            return Err(CogError::ConfigurationError(format!(
                "Unsupported settings file '{}': expected a .toml or .json extension",
                path.display()
            )))
        }
    };
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from just environment variables (starting from defaults).
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies `COGKIT_*` environment variable overrides to a settings struct.
pub fn apply_env_overrides(settings: &mut Settings) {
    apply_overrides(settings, |key| std::env::var(key).ok());
}

/// Applies overrides read through `lookup`, which maps an environment
/// variable name to its value.
///
/// Numeric values that fail to parse are ignored and leave the setting
/// unchanged.
pub fn apply_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("COGKIT_DEBUG") {
        settings.debug = matches!(val.to_lowercase().as_str(), "true" | "1" | "yes");
    }

    if let Some(val) = lookup("COGKIT_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Some(ms) = lookup("COGKIT_RENDER_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
        settings.template.render_timeout_ms = ms;
    }

    if let Some(len) = lookup("COGKIT_MAX_OUTPUT_LEN").and_then(|v| v.parse().ok()) {
        settings.template.max_output_len = len;
    }

    if let Some(max) = lookup("COGKIT_MAX_RANGE").and_then(|v| v.parse().ok()) {
        settings.template.max_range = max;
    }
}

// ============================================================
// Helpers
// ============================================================

fn read_config(path: &Path, kind: &str) -> Result<String, CogError> {
    std::fs::read_to_string(path).map_err(|e| {
        CogError::ConfigurationError(format!(
            "Failed to read {kind} file '{}': {e}",
            path.display()
        ))
    })
}

/// Deep-merges a parsed document over the default settings and deserializes
/// the result.
fn merge_over_defaults(value: serde_json::Value, kind: &str) -> Result<Settings, CogError> {
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        CogError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;

    let merged = merge_json(default_json, value);
    serde_json::from_value(merged).map_err(|e| {
        CogError::ConfigurationError(format!("Failed to deserialize settings from {kind}: {e}"))
    })
}

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => serde_json::Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Deep-merges two JSON values. The `override_val` takes precedence.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = if let Some(base_v) = base_map.remove(&key) {
                    merge_json(base_v, override_v)
                } else {
                    override_v
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}
