//! Typed value model shared by the coercers, the accumulator, and the
//! result assembler.
//!
//! A [`Value`] is what a literal coercer produces from one raw token. Bound
//! results carry a [`ValueSource`] provenance tag so callers can tell a
//! user-supplied value from an environment or default fallback.

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;

/// A coerced value for a single token, or a fixed-size arity group.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Pair(KeyValue),
    /// One occurrence of an arity-N option: exactly N inner values.
    Group(Vec<Value>),
}

impl Value {
    /// Human-readable name of the value's type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Pair(_) => "key-value",
            Value::Group(_) => "group",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v}"),
            Value::Pair(v) => write!(f, "{v}"),
            Value::Group(values) => {
                let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
        }
    }
}

/// Provenance of a bound value.
///
/// # Examples
///
/// ```
/// use declargs_core::ValueSource;
///
/// assert_ne!(ValueSource::User, ValueSource::Default);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    /// Supplied on the command line (or interactively prompted).
    User,
    /// Read from the declared environment variable.
    Environment,
    /// Taken from the declared default.
    Default,
    /// No value from any source.
    Missing,
}

/// A key/value pair whose equality and hash are defined on the key only.
///
/// A `HashSet<KeyValue>` therefore behaves as a last-write-wins map keyed by
/// `key`: inserting a pair with an existing key replaces the stored value.
///
/// # Examples
///
/// ```
/// use declargs_core::KeyValue;
///
/// let a = KeyValue::new("host", "localhost");
/// let b = KeyValue::new("host", "example.com");
/// assert_eq!(a, b); // same key
/// assert_eq!(a.to_string(), "host=localhost");
/// ```
#[derive(Debug, Clone)]
pub struct KeyValue {
    key: String,
    value: String,
    separator: char,
}

impl KeyValue {
    /// Creates a pair with the default `=` separator.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::with_separator(key, value, '=')
    }

    /// Creates a pair with a custom separator used only for display.
    pub fn with_separator(key: impl Into<String>, value: impl Into<String>, separator: char) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            separator,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl PartialEq for KeyValue {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for KeyValue {}

impl Hash for KeyValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.key, self.separator, self.value)
    }
}

/// Final shape of one option's bound data.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum BoundData {
    /// Nothing bound from any source.
    #[default]
    Absent,
    /// A single scalar value.
    One(Value),
    /// A collection: list entries, deduplicated set entries, or groups.
    Many(Vec<Value>),
}

impl BoundData {
    /// Number of bound elements (groups count as one element each).
    pub fn len(&self) -> usize {
        match self {
            BoundData::Absent => 0,
            BoundData::One(_) => 1,
            BoundData::Many(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One option's final value, provenance, and user occurrence count.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Binding {
    pub data: BoundData,
    pub source: ValueSource,
    /// Command-line occurrences, including bare no-value occurrences.
    pub occurrences: usize,
}

impl Binding {
    /// Presence for constraint purposes: at least one command-line
    /// occurrence, or a non-empty user/environment-sourced value. Defaults
    /// never count as present.
    pub fn is_present(&self) -> bool {
        self.occurrences > 0
            || (!self.data.is_empty()
                && matches!(self.source, ValueSource::User | ValueSource::Environment))
    }
}

impl Default for ValueSource {
    fn default() -> Self {
        ValueSource::Missing
    }
}

/// Conversion from a coerced [`Value`] to a caller-facing element type.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Str(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FromValue for KeyValue {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Pair(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Group(values) => values.iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

/// Conversion from a caller-supplied default into the internal value model.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Int(self)
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::Str(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Str(self.to_string())
    }
}

impl IntoValue for KeyValue {
    fn into_value(self) -> Value {
        Value::Pair(self)
    }
}

/// Conversion from a final [`Binding`] to the collection type carried by a
/// typed handle. Returns `None` on a shape mismatch, which the handle turns
/// into a panic naming the option (a programmer error, not a parse error).
pub trait FromBinding: Sized {
    fn from_binding(binding: &Binding) -> Option<Self>;
}

macro_rules! scalar_from_binding {
    ($($ty:ty),*) => {
        $(impl FromBinding for $ty {
            fn from_binding(binding: &Binding) -> Option<Self> {
                match &binding.data {
                    BoundData::One(value) => FromValue::from_value(value),
                    _ => None,
                }
            }
        })*
    };
}

scalar_from_binding!(bool, i64, f64, String, KeyValue);

impl<T: FromValue> FromBinding for Option<T> {
    fn from_binding(binding: &Binding) -> Option<Self> {
        match &binding.data {
            BoundData::Absent => Some(None),
            BoundData::One(value) => T::from_value(value).map(Some),
            BoundData::Many(_) => None,
        }
    }
}

impl<T: FromValue> FromBinding for Vec<T> {
    fn from_binding(binding: &Binding) -> Option<Self> {
        match &binding.data {
            BoundData::Absent => Some(Vec::new()),
            BoundData::One(value) => T::from_value(value).map(|v| vec![v]),
            BoundData::Many(values) => values.iter().map(T::from_value).collect(),
        }
    }
}

impl<T: FromValue + Eq + Hash> FromBinding for HashSet<T> {
    fn from_binding(binding: &Binding) -> Option<Self> {
        match &binding.data {
            BoundData::Absent => Some(HashSet::new()),
            BoundData::One(value) => T::from_value(value).map(|v| HashSet::from_iter([v])),
            BoundData::Many(values) => values.iter().map(T::from_value).collect(),
        }
    }
}
