//! Render context and template values.
//!
//! Provides [`ContextValue`], the closed set of values a template can see, and
//! [`Context`], the variable mapping a template is rendered against. Values
//! are plain data: there is no variant that wraps a host object, so a template
//! can only ever reach what the caller put into the context.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// The reserved context key holding the seed for the `random` filter.
pub const RANDOM_SEED_KEY: &str = "random_seed";

/// Represents a dynamic value in a template context.
#[derive(Debug, Clone)]
pub enum ContextValue {
    /// A string value.
    String(String),
    /// A 64-bit integer.
    Integer(i64),
    /// A 64-bit floating point number.
    Float(f64),
    /// A boolean value.
    Bool(bool),
    /// An ordered list of values.
    List(Vec<ContextValue>),
    /// A key-value mapping, ordered by key.
    Dict(BTreeMap<String, ContextValue>),
    /// An explicit absence of a value (`none` in templates, `null` in JSON).
    None,
    /// The result of looking up something that does not exist.
    ///
    /// Renders as an empty string, is falsy, and stays undefined through
    /// further attribute access, subscription, calls and arithmetic.
    Undefined,
}

impl ContextValue {
    /// Returns `true` if this value is considered "truthy".
    ///
    /// - `None` and `Undefined` are falsy
    /// - Empty strings, empty lists, empty dicts are falsy
    /// - `Bool(false)` is falsy
    /// - `Integer(0)` and `Float(0.0)` are falsy
    /// - Everything else is truthy
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::None | Self::Undefined => false,
            Self::Bool(b) => *b,
            Self::Integer(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::String(s) => !s.is_empty(),
            Self::List(l) => !l.is_empty(),
            Self::Dict(d) => !d.is_empty(),
        }
    }

    /// Returns `true` for [`ContextValue::Undefined`].
    pub const fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Returns `true` for values that render as nothing (`None` or `Undefined`).
    pub const fn is_none_like(&self) -> bool {
        matches!(self, Self::None | Self::Undefined)
    }

    /// Returns a short name of the value's type, used in error messages.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Bool(_) => "boolean",
            Self::List(_) => "list",
            Self::Dict(_) => "mapping",
            Self::None => "none",
            Self::Undefined => "undefined",
        }
    }

    /// Converts this value to its output form.
    ///
    /// `None` and `Undefined` finalize to an empty string.
    pub fn to_display_string(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => format_float(*f),
            Self::Bool(b) => bool_str(*b).to_string(),
            Self::List(items) => {
                let inner: Vec<String> = items.iter().map(Self::to_repr).collect();
                format!("[{}]", inner.join(", "))
            }
            Self::Dict(map) => {
                let inner: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("'{}': {}", k, v.to_repr()))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
            Self::None | Self::Undefined => String::new(),
        }
    }

    /// Returns a repr string, used for values nested inside lists and dicts.
    pub fn to_repr(&self) -> String {
        match self {
            Self::String(s) => format!("'{s}'"),
            Self::None => "None".to_string(),
            Self::Undefined => String::new(),
            other => other.to_display_string(),
        }
    }

    /// Returns the length of a list, string (in characters), or dict.
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::String(s) => Some(s.chars().count()),
            Self::List(l) => Some(l.len()),
            Self::Dict(d) => Some(d.len()),
            _ => None,
        }
    }

    /// Returns `true` if this is an empty collection or empty string.
    pub fn is_empty(&self) -> Option<bool> {
        self.len().map(|l| l == 0)
    }

    /// Attempts to convert this value to an i64.
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Float(f) if f.is_finite() => Some(*f as i64),
            Self::String(s) => s.trim().parse::<i64>().ok(),
            Self::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Attempts to convert this value to an f64.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            Self::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Returns the number this value holds, without parsing strings.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Returns the string contents if this is a String.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

fn bool_str(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}

/// Formats a float the way template authors expect: integral values keep a
/// trailing `.0`.
fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

impl fmt::Display for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

impl PartialEq for ContextValue {
    #[allow(clippy::cast_precision_loss)]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Integer(a), Self::Float(b)) | (Self::Float(b), Self::Integer(a)) => {
                (*a as f64) == *b
            }
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::None, Self::None) | (Self::Undefined, Self::Undefined) => true,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Dict(a), Self::Dict(b)) => a == b,
            _ => false,
        }
    }
}

// -- From implementations --

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i32> for ContextValue {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<i64> for ContextValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<u32> for ContextValue {
    fn from(i: u32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<u64> for ContextValue {
    #[allow(clippy::cast_possible_wrap)]
    fn from(i: u64) -> Self {
        Self::Integer(i as i64)
    }
}

impl From<usize> for ContextValue {
    #[allow(clippy::cast_possible_wrap)]
    fn from(i: usize) -> Self {
        Self::Integer(i as i64)
    }
}

impl From<f64> for ContextValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for ContextValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl<T: Into<ContextValue>> From<Vec<T>> for ContextValue {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ContextValue>> From<HashMap<String, T>> for ContextValue {
    fn from(m: HashMap<String, T>) -> Self {
        Self::Dict(m.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<ContextValue>> From<BTreeMap<String, T>> for ContextValue {
    fn from(m: BTreeMap<String, T>) -> Self {
        Self::Dict(m.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<ContextValue>> From<Option<T>> for ContextValue {
    fn from(o: Option<T>) -> Self {
        o.map_or(Self::None, Into::into)
    }
}

impl From<serde_json::Value> for ContextValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::None,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    Self::Float(f)
                } else {
                    Self::None
                }
            }
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(arr) => Self::List(arr.into_iter().map(Self::from).collect()),
            serde_json::Value::Object(map) => {
                Self::Dict(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

/// A template context that holds variables in a stack of scopes.
///
/// Callers fill the bottom scope. During a render the engine works on its own
/// copy and pushes scopes for `{% for %}` bodies; `{% set %}` writes to the
/// top scope. The caller's context is never modified by a render.
///
/// # Examples
///
/// ```
/// use cogkit_template::context::{Context, ContextValue};
///
/// let mut ctx = Context::new();
/// ctx.set("username", "Alice");
/// assert_eq!(ctx.get("username").unwrap().to_display_string(), "Alice");
///
/// ctx.push();
/// ctx.set("username", "Bob");
/// assert_eq!(ctx.get("username").unwrap().to_display_string(), "Bob");
///
/// ctx.pop();
/// assert_eq!(ctx.get("username").unwrap().to_display_string(), "Alice");
/// ```
#[derive(Debug, Clone)]
pub struct Context {
    stack: Vec<HashMap<String, ContextValue>>,
}

impl Context {
    /// Creates a new empty context with a single scope.
    pub fn new() -> Self {
        Self {
            stack: vec![HashMap::new()],
        }
    }

    /// Builds a context from a JSON object.
    ///
    /// Returns `None` if `value` is not an object.
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Object(map) => {
                let mut ctx = Self::new();
                for (k, v) in map {
                    ctx.set(k, ContextValue::from(v));
                }
                Some(ctx)
            }
            _ => None,
        }
    }

    /// Sets a variable and returns the context, for building contexts inline.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Pushes a new scope onto the context stack.
    pub fn push(&mut self) {
        self.stack.push(HashMap::new());
    }

    /// Pops the top scope from the context stack.
    ///
    /// If only one scope remains, this is a no-op.
    pub fn pop(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    /// Sets a variable in the current (top) scope.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ContextValue>) {
        if let Some(top) = self.stack.last_mut() {
            top.insert(key.into(), value.into());
        }
    }

    /// Looks up a variable by name, searching from the top scope downward.
    ///
    /// Names are matched literally; dotted paths are resolved by the template
    /// evaluator, not here.
    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.stack.iter().rev().find_map(|scope| scope.get(key))
    }

    /// Returns `true` if the variable is set in any scope.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns the value of the reserved `random_seed` key, if set.
    pub fn random_seed(&self) -> Option<&ContextValue> {
        self.get(RANDOM_SEED_KEY).filter(|v| !v.is_none_like())
    }

    /// Flattens all scopes into a single map, with later scopes overriding earlier ones.
    pub fn flatten(&self) -> BTreeMap<String, ContextValue> {
        let mut result = BTreeMap::new();
        for scope in &self.stack {
            for (k, v) in scope {
                result.insert(k.clone(), v.clone());
            }
        }
        result
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_value_from_primitives() {
        assert_eq!(ContextValue::from("hello").to_display_string(), "hello");
        assert_eq!(ContextValue::from(42i32).to_display_string(), "42");
        assert_eq!(ContextValue::from(3.5f64).to_display_string(), "3.5");
        assert_eq!(ContextValue::from(true).to_display_string(), "True");
        assert_eq!(ContextValue::from(false).to_display_string(), "False");
    }

    #[test]
    fn test_context_value_from_vec() {
        let v: ContextValue = vec!["a", "b"].into();
        assert_eq!(v.to_display_string(), "['a', 'b']");
    }

    #[test]
    fn test_none_and_undefined_render_empty() {
        assert_eq!(ContextValue::None.to_display_string(), "");
        assert_eq!(ContextValue::Undefined.to_display_string(), "");
        assert_eq!(format!("{}", ContextValue::None), "");
    }

    #[test]
    fn test_from_option() {
        assert!(matches!(ContextValue::from(Option::<i32>::None), ContextValue::None));
        assert_eq!(ContextValue::from(Some(7i32)), ContextValue::Integer(7));
    }

    #[test]
    fn test_context_value_from_json() {
        let json = serde_json::json!({
            "name": "John",
            "age": 30,
            "active": true,
            "tags": ["a", "b"],
            "meta": null
        });
        let ContextValue::Dict(map) = ContextValue::from(json) else {
            panic!("Expected Dict");
        };
        assert_eq!(map["name"], ContextValue::from("John"));
        assert_eq!(map["age"], ContextValue::Integer(30));
        assert_eq!(map["active"], ContextValue::Bool(true));
        assert!(matches!(map["meta"], ContextValue::None));
    }

    #[test]
    fn test_truthiness() {
        assert!(ContextValue::Bool(true).is_truthy());
        assert!(!ContextValue::Bool(false).is_truthy());
        assert!(ContextValue::Integer(1).is_truthy());
        assert!(!ContextValue::Integer(0).is_truthy());
        assert!(!ContextValue::String(String::new()).is_truthy());
        assert!(!ContextValue::None.is_truthy());
        assert!(!ContextValue::Undefined.is_truthy());
        assert!(!ContextValue::List(vec![]).is_truthy());
    }

    #[test]
    fn test_equality_mixes_int_and_float() {
        assert_eq!(ContextValue::Integer(2), ContextValue::Float(2.0));
        assert_ne!(ContextValue::Integer(1), ContextValue::Integer(2));
        assert_ne!(ContextValue::None, ContextValue::Undefined);
    }

    #[test]
    fn test_float_display() {
        assert_eq!(ContextValue::Float(3.0).to_display_string(), "3.0");
        assert_eq!(ContextValue::Float(0.25).to_display_string(), "0.25");
    }

    #[test]
    fn test_len_counts_chars() {
        assert_eq!(ContextValue::from("héllo").len(), Some(5));
        assert_eq!(ContextValue::Integer(3).len(), None);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(ContextValue::from("10").as_integer(), Some(10));
        assert_eq!(ContextValue::Float(3.7).as_integer(), Some(3));
        assert_eq!(ContextValue::Integer(4).as_float(), Some(4.0));
        assert_eq!(ContextValue::from("4").as_number(), None);
        assert_eq!(ContextValue::Undefined.as_integer(), None);
    }

    #[test]
    fn test_context_push_pop() {
        let mut ctx = Context::new();
        ctx.set("x", 1);
        ctx.push();
        ctx.set("x", 2);
        assert_eq!(ctx.get("x"), Some(&ContextValue::Integer(2)));
        ctx.pop();
        assert_eq!(ctx.get("x"), Some(&ContextValue::Integer(1)));
        ctx.pop();
        assert_eq!(ctx.get("x"), Some(&ContextValue::Integer(1)));
    }

    #[test]
    fn test_context_get_is_literal() {
        let ctx = Context::new().with("user.name", "literal");
        assert!(ctx.get("user").is_none());
        assert!(ctx.contains("user.name"));
    }

    #[test]
    fn test_from_json_requires_object() {
        assert!(Context::from_json(serde_json::json!([1, 2])).is_none());
        let ctx = Context::from_json(serde_json::json!({"game": "Chess"})).unwrap();
        assert_eq!(ctx.get("game"), Some(&ContextValue::from("Chess")));
    }

    #[test]
    fn test_random_seed_ignores_null() {
        let ctx = Context::new().with(RANDOM_SEED_KEY, ContextValue::None);
        assert!(ctx.random_seed().is_none());
        let ctx = Context::new().with(RANDOM_SEED_KEY, 9);
        assert_eq!(ctx.random_seed(), Some(&ContextValue::Integer(9)));
    }

    #[test]
    fn test_flatten() {
        let mut ctx = Context::new().with("a", 1).with("b", 2);
        ctx.push();
        ctx.set("a", 10);
        let flat = ctx.flatten();
        assert_eq!(flat["a"], ContextValue::Integer(10));
        assert_eq!(flat["b"], ContextValue::Integer(2));
    }
}
