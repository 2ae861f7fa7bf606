//! Template filters.
//!
//! A filter transforms a value inside an expression: `{{ name | upper }}`,
//! `{{ games | random }}`. Filters live in a [`FilterRegistry`]; the parser
//! rejects names the registry does not know, and the renderer dispatches
//! through it. The registry is built once and shared through an [`Arc`], so
//! custom filters are registered before an engine starts rendering.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use cogkit_core::error::RenderError;

use crate::context::ContextValue;
use crate::random::{RandomFilter, ShuffleFilter};
use crate::sandbox::Limits;
use crate::timeout::Deadline;

/// Per-render state available to filters.
pub struct FilterState<'a> {
    seed: u64,
    deadline: &'a Deadline,
    limits: &'a Limits,
}

impl<'a> FilterState<'a> {
    /// Creates the state for one render.
    pub const fn new(seed: u64, deadline: &'a Deadline, limits: &'a Limits) -> Self {
        Self { seed, deadline, limits }
    }

    /// The render seed used by randomized filters.
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Fails with [`RenderError::TimedOut`] once the render budget is spent.
    ///
    /// Filters that loop or block should call this regularly.
    pub fn check_deadline(&self) -> Result<(), RenderError> {
        self.deadline.check()
    }

    /// The resource limits of this render.
    pub const fn limits(&self) -> &Limits {
        self.limits
    }
}

/// A template filter.
///
/// Takes a value and optional arguments, and returns a transformed value.
pub trait Filter: Send + Sync {
    /// Returns the filter name.
    fn name(&self) -> &'static str;

    /// Applies the filter to a value with the given arguments.
    fn apply(
        &self,
        value: &ContextValue,
        args: &[ContextValue],
        state: &FilterState<'_>,
    ) -> Result<ContextValue, RenderError>;
}

/// A registry of available template filters.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    filters: HashMap<String, Arc<dyn Filter>>,
}

impl FilterRegistry {
    /// Creates a new empty filter registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding all built-in filters.
    pub fn with_builtins() -> Self {
        let mut r = Self::new();
        register_all(&mut r);
        r
    }

    /// Registers a filter under its own name, replacing any existing one.
    pub fn register(&mut self, filter: Box<dyn Filter>) {
        self.filters.insert(filter.name().to_string(), Arc::from(filter));
    }

    /// Makes the filter registered as `target` also available as `alias`.
    pub fn alias(&mut self, alias: &str, target: &str) {
        if let Some(filter) = self.filters.get(target).cloned() {
            self.filters.insert(alias.to_string(), filter);
        }
    }

    /// Returns `true` if a filter is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Returns the registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.filters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Applies a named filter to a value.
    pub fn apply(
        &self,
        name: &str,
        value: &ContextValue,
        args: &[ContextValue],
        state: &FilterState<'_>,
    ) -> Result<ContextValue, RenderError> {
        let filter = self
            .filters
            .get(name)
            .ok_or_else(|| RenderError::evaluation(format!("Unknown filter '{name}'")))?;
        filter.apply(value, args, state)
    }
}

impl std::fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("filters", &self.names())
            .finish()
    }
}

/// Returns the shared registry with all built-in filters.
pub fn default_registry() -> Arc<FilterRegistry> {
    static REGISTRY: OnceLock<Arc<FilterRegistry>> = OnceLock::new();
    REGISTRY
        .get_or_init(|| Arc::new(FilterRegistry::with_builtins()))
        .clone()
}

/// Registers all built-in filters.
fn register_all(r: &mut FilterRegistry) {
    // String filters
    r.register(Box::new(LowerFilter));
    r.register(Box::new(UpperFilter));
    r.register(Box::new(TitleFilter));
    r.register(Box::new(CapitalizeFilter));
    r.register(Box::new(TrimFilter));
    r.register(Box::new(ReplaceFilter));
    r.register(Box::new(TruncateFilter));

    // Sequence filters
    r.register(Box::new(LengthFilter));
    r.alias("count", "length");
    r.register(Box::new(FirstFilter));
    r.register(Box::new(LastFilter));
    r.register(Box::new(JoinFilter));
    r.register(Box::new(ReverseFilter));
    r.register(Box::new(RandomFilter));
    r.register(Box::new(ShuffleFilter));

    // Conversion filters
    r.register(Box::new(DefaultFilter));
    r.alias("d", "default");
    r.register(Box::new(IntFilter));
    r.register(Box::new(FloatFilter));
    r.register(Box::new(StringFilter));
    r.register(Box::new(AbsFilter));
}

/// Returns the positional argument at `index`, if given and not undefined.
fn arg(args: &[ContextValue], index: usize) -> Option<&ContextValue> {
    args.get(index).filter(|a| !a.is_undefined())
}

/// Reads an integer argument, falling back to `default` when absent.
fn int_arg(
    filter: &str,
    args: &[ContextValue],
    index: usize,
    default: i64,
) -> Result<i64, RenderError> {
    match arg(args, index) {
        None => Ok(default),
        Some(ContextValue::Integer(i)) => Ok(*i),
        Some(other) => Err(RenderError::evaluation(format!(
            "{filter} expects an integer argument, got {}",
            other.type_name()
        ))),
    }
}

fn string_result(s: String, state: &FilterState<'_>) -> Result<ContextValue, RenderError> {
    state.limits().check_string_len(s.len())?;
    Ok(ContextValue::String(s))
}

// ============================================================
// String filters
// ============================================================

/// Applies a string transformation; undefined stays undefined.
fn map_string(value: &ContextValue, f: impl FnOnce(&str) -> String) -> ContextValue {
    if value.is_undefined() {
        return ContextValue::Undefined;
    }
    ContextValue::String(f(&value.to_display_string()))
}

struct LowerFilter;
impl Filter for LowerFilter {
    fn name(&self) -> &'static str {
        "lower"
    }
    fn apply(
        &self,
        value: &ContextValue,
        _args: &[ContextValue],
        _state: &FilterState<'_>,
    ) -> Result<ContextValue, RenderError> {
        Ok(map_string(value, str::to_lowercase))
    }
}

struct UpperFilter;
impl Filter for UpperFilter {
    fn name(&self) -> &'static str {
        "upper"
    }
    fn apply(
        &self,
        value: &ContextValue,
        _args: &[ContextValue],
        _state: &FilterState<'_>,
    ) -> Result<ContextValue, RenderError> {
        Ok(map_string(value, str::to_uppercase))
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) => format!("{}{}", c.to_uppercase(), chars.as_str().to_lowercase()),
        None => String::new(),
    }
}

struct TitleFilter;
impl Filter for TitleFilter {
    fn name(&self) -> &'static str {
        "title"
    }
    fn apply(
        &self,
        value: &ContextValue,
        _args: &[ContextValue],
        _state: &FilterState<'_>,
    ) -> Result<ContextValue, RenderError> {
        Ok(map_string(value, |s| {
            s.split_whitespace().map(capitalize).collect::<Vec<_>>().join(" ")
        }))
    }
}

struct CapitalizeFilter;
impl Filter for CapitalizeFilter {
    fn name(&self) -> &'static str {
        "capitalize"
    }
    fn apply(
        &self,
        value: &ContextValue,
        _args: &[ContextValue],
        _state: &FilterState<'_>,
    ) -> Result<ContextValue, RenderError> {
        Ok(map_string(value, capitalize))
    }
}

struct TrimFilter;
impl Filter for TrimFilter {
    fn name(&self) -> &'static str {
        "trim"
    }
    fn apply(
        &self,
        value: &ContextValue,
        _args: &[ContextValue],
        _state: &FilterState<'_>,
    ) -> Result<ContextValue, RenderError> {
        Ok(map_string(value, |s| s.trim().to_string()))
    }
}

/// `replace(old, new[, count])`
struct ReplaceFilter;
impl Filter for ReplaceFilter {
    fn name(&self) -> &'static str {
        "replace"
    }
    fn apply(
        &self,
        value: &ContextValue,
        args: &[ContextValue],
        state: &FilterState<'_>,
    ) -> Result<ContextValue, RenderError> {
        if value.is_undefined() {
            return Ok(ContextValue::Undefined);
        }
        let (Some(old), Some(new)) = (arg(args, 0), arg(args, 1)) else {
            return Err(RenderError::evaluation("replace expects (old, new) arguments"));
        };
        let s = value.to_display_string();
        let old = old.to_display_string();
        let new = new.to_display_string();
        let count = int_arg(self.name(), args, 2, -1)?;

        let occurrences = if old.is_empty() {
            s.chars().count() + 1
        } else {
            s.matches(&old).count()
        };
        let replaced = usize::try_from(count).map_or(occurrences, |c| c.min(occurrences));
        let estimate = s.len() + replaced.saturating_mul(new.len());
        state.limits().check_string_len(estimate)?;

        let result = match usize::try_from(count) {
            Ok(n) => s.replacen(&old, &new, n),
            Err(_) => s.replace(&old, &new),
        };
        string_result(result, state)
    }
}

/// `truncate(length=255, end="...")`, counted in characters.
struct TruncateFilter;
impl Filter for TruncateFilter {
    fn name(&self) -> &'static str {
        "truncate"
    }
    fn apply(
        &self,
        value: &ContextValue,
        args: &[ContextValue],
        _state: &FilterState<'_>,
    ) -> Result<ContextValue, RenderError> {
        if value.is_undefined() {
            return Ok(ContextValue::Undefined);
        }
        let length = usize::try_from(int_arg(self.name(), args, 0, 255)?).unwrap_or(0);
        let end = arg(args, 1).map_or_else(|| "...".to_string(), ContextValue::to_display_string);
        let s = value.to_display_string();
        if s.chars().count() <= length {
            return Ok(ContextValue::String(s));
        }
        let keep = length.saturating_sub(end.chars().count());
        let mut truncated: String = s.chars().take(keep).collect();
        truncated.push_str(&end);
        Ok(ContextValue::String(truncated))
    }
}

// ============================================================
// Sequence filters
// ============================================================

struct LengthFilter;
impl Filter for LengthFilter {
    fn name(&self) -> &'static str {
        "length"
    }
    fn apply(
        &self,
        value: &ContextValue,
        _args: &[ContextValue],
        _state: &FilterState<'_>,
    ) -> Result<ContextValue, RenderError> {
        Ok(ContextValue::from(value.len().unwrap_or(0)))
    }
}

struct FirstFilter;
impl Filter for FirstFilter {
    fn name(&self) -> &'static str {
        "first"
    }
    fn apply(
        &self,
        value: &ContextValue,
        _args: &[ContextValue],
        _state: &FilterState<'_>,
    ) -> Result<ContextValue, RenderError> {
        Ok(match value {
            ContextValue::List(items) => items.first().cloned().unwrap_or(ContextValue::Undefined),
            ContextValue::String(s) => s
                .chars()
                .next()
                .map_or(ContextValue::Undefined, |c| ContextValue::String(c.to_string())),
            _ => ContextValue::Undefined,
        })
    }
}

struct LastFilter;
impl Filter for LastFilter {
    fn name(&self) -> &'static str {
        "last"
    }
    fn apply(
        &self,
        value: &ContextValue,
        _args: &[ContextValue],
        _state: &FilterState<'_>,
    ) -> Result<ContextValue, RenderError> {
        Ok(match value {
            ContextValue::List(items) => items.last().cloned().unwrap_or(ContextValue::Undefined),
            ContextValue::String(s) => s
                .chars()
                .last()
                .map_or(ContextValue::Undefined, |c| ContextValue::String(c.to_string())),
            _ => ContextValue::Undefined,
        })
    }
}

/// `join(separator="")`
struct JoinFilter;
impl Filter for JoinFilter {
    fn name(&self) -> &'static str {
        "join"
    }
    fn apply(
        &self,
        value: &ContextValue,
        args: &[ContextValue],
        state: &FilterState<'_>,
    ) -> Result<ContextValue, RenderError> {
        let sep = arg(args, 0).map(ContextValue::to_display_string).unwrap_or_default();
        match value {
            ContextValue::List(items) => {
                let parts: Vec<String> =
                    items.iter().map(ContextValue::to_display_string).collect();
                string_result(parts.join(&sep), state)
            }
            ContextValue::String(s) => {
                let parts: Vec<String> = s.chars().map(String::from).collect();
                string_result(parts.join(&sep), state)
            }
            other => Ok(other.clone()),
        }
    }
}

struct ReverseFilter;
impl Filter for ReverseFilter {
    fn name(&self) -> &'static str {
        "reverse"
    }
    fn apply(
        &self,
        value: &ContextValue,
        _args: &[ContextValue],
        _state: &FilterState<'_>,
    ) -> Result<ContextValue, RenderError> {
        Ok(match value {
            ContextValue::List(items) => ContextValue::List(items.iter().rev().cloned().collect()),
            ContextValue::String(s) => ContextValue::String(s.chars().rev().collect()),
            other => other.clone(),
        })
    }
}

// ============================================================
// Conversion filters
// ============================================================

/// `default(fallback="", boolean=false)`: replaces undefined values, or all
/// falsy values when `boolean` is true.
struct DefaultFilter;
impl Filter for DefaultFilter {
    fn name(&self) -> &'static str {
        "default"
    }
    fn apply(
        &self,
        value: &ContextValue,
        args: &[ContextValue],
        _state: &FilterState<'_>,
    ) -> Result<ContextValue, RenderError> {
        let fallback = arg(args, 0).cloned().unwrap_or_else(|| ContextValue::from(""));
        let boolean = arg(args, 1).is_some_and(ContextValue::is_truthy);
        if value.is_undefined() || (boolean && !value.is_truthy()) {
            Ok(fallback)
        } else {
            Ok(value.clone())
        }
    }
}

/// `int(default=0)`
struct IntFilter;
impl Filter for IntFilter {
    fn name(&self) -> &'static str {
        "int"
    }
    #[allow(clippy::cast_possible_truncation)]
    fn apply(
        &self,
        value: &ContextValue,
        args: &[ContextValue],
        _state: &FilterState<'_>,
    ) -> Result<ContextValue, RenderError> {
        let default = int_arg(self.name(), args, 0, 0)?;
        let converted = value.as_integer().or_else(|| {
            value
                .as_float()
                .filter(|f| f.is_finite() && f.abs() < 9.2e18)
                .map(|f| f.trunc() as i64)
        });
        Ok(ContextValue::Integer(converted.unwrap_or(default)))
    }
}

/// `float(default=0.0)`
struct FloatFilter;
impl Filter for FloatFilter {
    fn name(&self) -> &'static str {
        "float"
    }
    fn apply(
        &self,
        value: &ContextValue,
        args: &[ContextValue],
        _state: &FilterState<'_>,
    ) -> Result<ContextValue, RenderError> {
        let default = arg(args, 0).and_then(ContextValue::as_number).unwrap_or(0.0);
        Ok(ContextValue::Float(value.as_float().unwrap_or(default)))
    }
}

struct StringFilter;
impl Filter for StringFilter {
    fn name(&self) -> &'static str {
        "string"
    }
    fn apply(
        &self,
        value: &ContextValue,
        _args: &[ContextValue],
        _state: &FilterState<'_>,
    ) -> Result<ContextValue, RenderError> {
        Ok(ContextValue::String(value.to_display_string()))
    }
}

struct AbsFilter;
impl Filter for AbsFilter {
    fn name(&self) -> &'static str {
        "abs"
    }
    fn apply(
        &self,
        value: &ContextValue,
        _args: &[ContextValue],
        _state: &FilterState<'_>,
    ) -> Result<ContextValue, RenderError> {
        match value {
            ContextValue::Integer(i) => i
                .checked_abs()
                .map(ContextValue::Integer)
                .ok_or_else(|| RenderError::evaluation("integer overflow in abs")),
            ContextValue::Float(f) => Ok(ContextValue::Float(f.abs())),
            ContextValue::Undefined => Ok(ContextValue::Undefined),
            other => Err(RenderError::evaluation(format!(
                "abs expects a number, got {}",
                other.type_name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply_filter(name: &str, value: ContextValue, args: Vec<ContextValue>) -> ContextValue {
        try_filter(name, value, args).unwrap()
    }

    fn try_filter(
        name: &str,
        value: ContextValue,
        args: Vec<ContextValue>,
    ) -> Result<ContextValue, RenderError> {
        let deadline = Deadline::unbounded();
        let limits = Limits::default();
        let state = FilterState::new(0, &deadline, &limits);
        default_registry().apply(name, &value, &args, &state)
    }

    #[test]
    fn test_lower_upper() {
        assert_eq!(
            apply_filter("lower", ContextValue::from("HELLO"), vec![]).to_display_string(),
            "hello"
        );
        assert_eq!(
            apply_filter("upper", ContextValue::from("hello"), vec![]).to_display_string(),
            "HELLO"
        );
    }

    #[test]
    fn test_string_filters_keep_undefined() {
        assert!(apply_filter("upper", ContextValue::Undefined, vec![]).is_undefined());
        assert!(apply_filter("trim", ContextValue::Undefined, vec![]).is_undefined());
    }

    #[test]
    fn test_title_and_capitalize() {
        assert_eq!(
            apply_filter("title", ContextValue::from("hello wORLD"), vec![]).to_display_string(),
            "Hello World"
        );
        let capitalized = apply_filter("capitalize", ContextValue::from("hELLO there"), vec![]);
        assert_eq!(capitalized.to_display_string(), "Hello there");
    }

    #[test]
    fn test_trim() {
        assert_eq!(
            apply_filter("trim", ContextValue::from("  x  "), vec![]).to_display_string(),
            "x"
        );
    }

    #[test]
    fn test_replace() {
        let result = apply_filter(
            "replace",
            ContextValue::from("a-b-c"),
            vec![ContextValue::from("-"), ContextValue::from("+")],
        );
        assert_eq!(result.to_display_string(), "a+b+c");

        let limited = apply_filter(
            "replace",
            ContextValue::from("a-b-c"),
            vec![ContextValue::from("-"), ContextValue::from("+"), ContextValue::Integer(1)],
        );
        assert_eq!(limited.to_display_string(), "a+b-c");
    }

    #[test]
    fn test_replace_growth_is_capped() {
        let big = "x".repeat(1024);
        let err = try_filter(
            "replace",
            ContextValue::from("a".repeat(2048)),
            vec![ContextValue::from("a"), ContextValue::from(big)],
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::Evaluation { .. }));
    }

    #[test]
    fn test_truncate() {
        let result = apply_filter(
            "truncate",
            ContextValue::from("Hello World"),
            vec![ContextValue::Integer(8)],
        );
        assert_eq!(result.to_display_string(), "Hello...");
        let short = apply_filter(
            "truncate",
            ContextValue::from("Hi"),
            vec![ContextValue::Integer(8)],
        );
        assert_eq!(short.to_display_string(), "Hi");
        let custom = apply_filter(
            "truncate",
            ContextValue::from("abcdef"),
            vec![ContextValue::Integer(4), ContextValue::from("~")],
        );
        assert_eq!(custom.to_display_string(), "abc~");
    }

    #[test]
    fn test_length_and_count() {
        let list = ContextValue::from(vec![1, 2, 3]);
        assert_eq!(apply_filter("length", list.clone(), vec![]), ContextValue::Integer(3));
        assert_eq!(apply_filter("count", list, vec![]), ContextValue::Integer(3));
        assert_eq!(
            apply_filter("length", ContextValue::from("héllo"), vec![]),
            ContextValue::Integer(5)
        );
        assert_eq!(
            apply_filter("length", ContextValue::Undefined, vec![]),
            ContextValue::Integer(0)
        );
    }

    #[test]
    fn test_first_last() {
        let list = ContextValue::from(vec!["a", "b", "c"]);
        assert_eq!(apply_filter("first", list.clone(), vec![]).to_display_string(), "a");
        assert_eq!(apply_filter("last", list, vec![]).to_display_string(), "c");
        assert!(apply_filter("first", ContextValue::List(vec![]), vec![]).is_undefined());
    }

    #[test]
    fn test_join() {
        let list = ContextValue::from(vec!["a", "b", "c"]);
        assert_eq!(
            apply_filter("join", list.clone(), vec![ContextValue::from(", ")]).to_display_string(),
            "a, b, c"
        );
        assert_eq!(apply_filter("join", list, vec![]).to_display_string(), "abc");
    }

    #[test]
    fn test_reverse() {
        assert_eq!(
            apply_filter("reverse", ContextValue::from("abc"), vec![]).to_display_string(),
            "cba"
        );
        assert_eq!(
            apply_filter("reverse", ContextValue::from(vec![1, 2]), vec![]),
            ContextValue::from(vec![2, 1])
        );
    }

    #[test]
    fn test_default() {
        let fallback = vec![ContextValue::from("anon")];
        assert_eq!(
            apply_filter("default", ContextValue::Undefined, fallback.clone()).to_display_string(),
            "anon"
        );
        assert_eq!(
            apply_filter("d", ContextValue::from(""), fallback.clone()).to_display_string(),
            ""
        );
        let boolean = vec![ContextValue::from("anon"), ContextValue::Bool(true)];
        assert_eq!(
            apply_filter("default", ContextValue::from(""), boolean).to_display_string(),
            "anon"
        );
        assert_eq!(
            apply_filter("default", ContextValue::from("bob"), fallback).to_display_string(),
            "bob"
        );
    }

    #[test]
    fn test_conversions() {
        assert_eq!(
            apply_filter("int", ContextValue::from("42"), vec![]),
            ContextValue::Integer(42)
        );
        assert_eq!(
            apply_filter("int", ContextValue::from("4.7"), vec![]),
            ContextValue::Integer(4)
        );
        assert_eq!(
            apply_filter("int", ContextValue::from("x"), vec![ContextValue::Integer(-1)]),
            ContextValue::Integer(-1)
        );
        assert_eq!(
            apply_filter("float", ContextValue::Integer(2), vec![]),
            ContextValue::Float(2.0)
        );
        assert_eq!(
            apply_filter("string", ContextValue::Integer(2), vec![]),
            ContextValue::from("2")
        );
    }

    #[test]
    fn test_abs() {
        assert_eq!(
            apply_filter("abs", ContextValue::Integer(-3), vec![]),
            ContextValue::Integer(3)
        );
        assert_eq!(
            apply_filter("abs", ContextValue::Float(-1.5), vec![]),
            ContextValue::Float(1.5)
        );
        assert!(try_filter("abs", ContextValue::Integer(i64::MIN), vec![]).is_err());
        assert!(try_filter("abs", ContextValue::from("x"), vec![]).is_err());
    }

    #[test]
    fn test_bad_integer_argument() {
        let err = try_filter(
            "truncate",
            ContextValue::from("abc"),
            vec![ContextValue::from("2")],
        )
        .unwrap_err();
        assert!(err.to_string().contains("integer argument"));
    }

    #[test]
    fn test_registry_register_and_alias() {
        struct Shout;
        impl Filter for Shout {
            fn name(&self) -> &'static str {
                "shout"
            }
            fn apply(
                &self,
                value: &ContextValue,
                _args: &[ContextValue],
                _state: &FilterState<'_>,
            ) -> Result<ContextValue, RenderError> {
                Ok(ContextValue::String(format!("{}!", value.to_display_string().to_uppercase())))
            }
        }

        let mut registry = FilterRegistry::new();
        assert!(!registry.contains("shout"));
        registry.register(Box::new(Shout));
        registry.alias("yell", "shout");
        registry.alias("nothing", "missing");
        assert_eq!(registry.names(), vec!["shout", "yell"]);

        let deadline = Deadline::unbounded();
        let limits = Limits::default();
        let state = FilterState::new(0, &deadline, &limits);
        let out = registry.apply("yell", &ContextValue::from("hi"), &[], &state).unwrap();
        assert_eq!(out.to_display_string(), "HI!");
        assert!(registry.apply("nothing", &ContextValue::from("hi"), &[], &state).is_err());
    }

    #[test]
    fn test_builtins_registered() {
        let registry = default_registry();
        for name in ["lower", "upper", "random", "shuffle", "default", "d", "count", "join"] {
            assert!(registry.contains(name), "{name}");
        }
    }
}
