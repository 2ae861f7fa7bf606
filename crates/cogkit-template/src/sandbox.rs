//! The sandbox rules of the evaluator.
//!
//! Templates only ever see [`ContextValue`]s, so there is no host object to
//! reach into. On top of that closed data model, this module enforces:
//!
//! - names starting with `_` are never resolved through `.` or `[]`;
//! - only allow-listed global functions can be called (`range`);
//! - results that could grow without bound are capped by [`Limits`], with
//!   lists measured by their [`Footprint`] so nested lists count in full.

use cogkit_core::error::RenderError;
use cogkit_core::settings::TemplateSettings;

use crate::context::ContextValue;

/// Global functions callable from templates.
pub const GLOBALS: [&str; 1] = ["range"];

/// Maximum nesting of lists and mappings inside a list built by a template.
pub const MAX_VALUE_DEPTH: usize = 128;

/// Resource caps applied while rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum length of the rendered output and of any string built during
    /// evaluation, in bytes.
    pub max_output_len: usize,
    /// Maximum number of items `range(...)` or a list/string repetition may
    /// produce.
    pub max_range: usize,
}

impl Limits {
    /// Builds limits from the engine settings.
    pub const fn from_settings(settings: &TemplateSettings) -> Self {
        Self {
            max_output_len: settings.max_output_len,
            max_range: settings.max_range,
        }
    }

    /// Fails if a string of `len` bytes would exceed the output cap.
    pub fn check_string_len(&self, len: usize) -> Result<(), RenderError> {
        if len > self.max_output_len {
            Err(RenderError::evaluation(format!(
                "string of {len} bytes exceeds the limit of {} bytes",
                self.max_output_len
            )))
        } else {
            Ok(())
        }
    }

    /// Fails if a sequence of `count` items would exceed the range cap.
    pub fn check_sequence_len(&self, count: usize) -> Result<(), RenderError> {
        if count > self.max_range {
            Err(RenderError::evaluation(format!(
                "sequence of {count} items exceeds the limit of {}",
                self.max_range
            )))
        } else {
            Ok(())
        }
    }

    /// Fails if a list holding `footprint` would exceed the caps.
    pub fn check_footprint(&self, footprint: Footprint) -> Result<(), RenderError> {
        self.check_sequence_len(footprint.values)?;
        if footprint.text_bytes > self.max_output_len {
            return Err(RenderError::evaluation(format!(
                "list holding {} bytes of text exceeds the limit of {} bytes",
                footprint.text_bytes, self.max_output_len
            )));
        }
        Ok(())
    }
}

/// How much a group of values holds, counting everything nested inside.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Footprint {
    /// Number of values, containers included.
    pub values: usize,
    /// Bytes of text in strings and mapping keys.
    pub text_bytes: usize,
}

impl Footprint {
    /// Measures `items`.
    ///
    /// Stops as soon as the running total breaks `limits` or the values nest
    /// deeper than [`MAX_VALUE_DEPTH`], so the walk never costs more than the
    /// caps allow.
    pub fn measure(items: &[ContextValue], limits: &Limits) -> Result<Self, RenderError> {
        let mut footprint = Self::default();
        for item in items {
            footprint.add(item, 1, limits)?;
        }
        Ok(footprint)
    }

    fn add(
        &mut self,
        value: &ContextValue,
        depth: usize,
        limits: &Limits,
    ) -> Result<(), RenderError> {
        if depth > MAX_VALUE_DEPTH {
            return Err(RenderError::evaluation(format!(
                "list nests deeper than {MAX_VALUE_DEPTH} levels"
            )));
        }
        self.values += 1;
        match value {
            ContextValue::String(s) => self.text_bytes += s.len(),
            ContextValue::List(items) => {
                for item in items {
                    self.add(item, depth + 1, limits)?;
                }
            }
            ContextValue::Dict(map) => {
                for (key, item) in map {
                    self.text_bytes += key.len();
                    self.add(item, depth + 1, limits)?;
                }
            }
            _ => {}
        }
        limits.check_footprint(*self)
    }

    /// The footprint of both groups together.
    #[must_use]
    pub const fn plus(self, other: Self) -> Self {
        Self {
            values: self.values.saturating_add(other.values),
            text_bytes: self.text_bytes.saturating_add(other.text_bytes),
        }
    }

    /// The footprint of `times` copies of this group.
    #[must_use]
    pub const fn times(self, times: usize) -> Self {
        Self {
            values: self.values.saturating_mul(times),
            text_bytes: self.text_bytes.saturating_mul(times),
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::from_settings(&TemplateSettings::default())
    }
}

/// Returns `true` if `name` may be looked up on a value.
pub fn is_safe_name(name: &str) -> bool {
    !name.starts_with('_')
}

/// Resolves `value.name`.
///
/// Only mapping keys are reachable. Anything else, including unsafe names,
/// is undefined.
pub fn get_attr(value: &ContextValue, name: &str) -> ContextValue {
    if !is_safe_name(name) {
        return ContextValue::Undefined;
    }
    match value {
        ContextValue::Dict(map) => map.get(name).cloned().unwrap_or(ContextValue::Undefined),
        _ => ContextValue::Undefined,
    }
}

/// Resolves `value[key]`.
///
/// Lists and strings accept integer indices, negative ones counting from the
/// end. Mappings accept string keys (subject to [`is_safe_name`]) and integer
/// keys, which are looked up by their decimal form.
pub fn get_item(value: &ContextValue, key: &ContextValue) -> ContextValue {
    match (value, key) {
        (ContextValue::Dict(_), ContextValue::String(name)) => get_attr(value, name),
        (ContextValue::Dict(map), ContextValue::Integer(i)) => {
            map.get(&i.to_string()).cloned().unwrap_or(ContextValue::Undefined)
        }
        (ContextValue::List(items), ContextValue::Integer(i)) => {
            resolve_index(*i, items.len())
                .map_or(ContextValue::Undefined, |idx| items[idx].clone())
        }
        (ContextValue::String(s), ContextValue::Integer(i)) => {
            let len = s.chars().count();
            resolve_index(*i, len)
                .and_then(|idx| s.chars().nth(idx))
                .map_or(ContextValue::Undefined, |c| ContextValue::String(c.to_string()))
        }
        _ => ContextValue::Undefined,
    }
}

/// Maps a possibly negative index onto `0..len`.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let idx = if index < 0 { index + len } else { index };
    if (0..len).contains(&idx) {
        usize::try_from(idx).ok()
    } else {
        None
    }
}

/// Returns `true` if `name` is a callable global.
pub fn is_global(name: &str) -> bool {
    GLOBALS.contains(&name)
}

/// Calls the global function `name`.
///
/// Returns `Ok(None)` if `name` is not a global.
pub fn call_global(
    name: &str,
    args: &[ContextValue],
    limits: &Limits,
) -> Result<Option<ContextValue>, RenderError> {
    match name {
        "range" => range(args, limits).map(Some),
        _ => Ok(None),
    }
}

/// `range(stop)`, `range(start, stop)`, or `range(start, stop, step)`.
fn range(args: &[ContextValue], limits: &Limits) -> Result<ContextValue, RenderError> {
    let ints = args
        .iter()
        .map(|arg| match arg {
            ContextValue::Integer(i) => Ok(*i),
            other => Err(RenderError::evaluation(format!(
                "range() expects integer arguments, got {}",
                other.type_name()
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let (start, stop, step) = match ints.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => {
            return Err(RenderError::evaluation(format!(
                "range() expects 1 to 3 arguments, got {}",
                args.len()
            )))
        }
    };
    if step == 0 {
        return Err(RenderError::evaluation("range() step must not be zero"));
    }

    let span = i128::from(stop) - i128::from(start);
    let step_wide = i128::from(step);
    let count = if (span > 0 && step > 0) || (span < 0 && step < 0) {
        (span.abs() + step_wide.abs() - 1) / step_wide.abs()
    } else {
        0
    };
    let count = usize::try_from(count).unwrap_or(usize::MAX);
    limits.check_sequence_len(count)?;

    let items = (0..count)
        .scan(i128::from(start), |current, _| {
            let value = *current;
            *current += step_wide;
            i64::try_from(value).ok().map(ContextValue::Integer)
        })
        .collect();
    Ok(ContextValue::List(items))
}
