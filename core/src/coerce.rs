//! Literal coercers: raw token string to typed [`Value`].
//!
//! The coercer for an option is a closed sum type chosen once at declaration
//! time and invoked uniformly at consumption time; there is no runtime type
//! inspection. Coercion failures surface immediately during tokenization,
//! before any constraint is evaluated.

use std::fmt;
use std::sync::Arc;

use crate::value::{KeyValue, Value};

/// A coercion rejection: the offending literal plus a description of what
/// was expected. Mapped to [`ParseError::InvalidValue`](crate::ParseError)
/// by the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoerceFailure {
    pub literal: String,
    pub expected: String,
}

type CustomFn = Arc<dyn Fn(&str) -> Result<Value, String> + Send + Sync>;

/// Tagged coercer variants, one per declarable element type.
#[derive(Clone)]
pub enum Coercer {
    Bool,
    Int,
    Float,
    Str,
    /// Membership in a fixed choice list; coerces to [`Value::Str`].
    OneOf(Vec<String>),
    /// `key<sep>value` split at the first separator occurrence.
    KeyValue { separator: char },
    /// Caller-supplied mapping, e.g. an enum-from-name lookup.
    Custom { type_name: String, apply: CustomFn },
}

impl fmt::Debug for Coercer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coercer::Bool => write!(f, "Bool"),
            Coercer::Int => write!(f, "Int"),
            Coercer::Float => write!(f, "Float"),
            Coercer::Str => write!(f, "Str"),
            Coercer::OneOf(choices) => f.debug_tuple("OneOf").field(choices).finish(),
            Coercer::KeyValue { separator } => {
                f.debug_struct("KeyValue").field("separator", separator).finish()
            }
            Coercer::Custom { type_name, .. } => {
                f.debug_struct("Custom").field("type_name", type_name).finish()
            }
        }
    }
}

impl Coercer {
    /// Whether this coercer produces booleans; boolean options default to
    /// `requires_value(false)` and are eligible for negation and clustering.
    pub fn is_bool(&self) -> bool {
        matches!(self, Coercer::Bool)
    }

    /// Description of the expected input, used in error messages and the
    /// schema snapshot.
    pub fn expected(&self) -> String {
        match self {
            Coercer::Bool => "boolean (true/false)".to_string(),
            Coercer::Int => "integer".to_string(),
            Coercer::Float => "float".to_string(),
            Coercer::Str => "string".to_string(),
            Coercer::OneOf(choices) => format!("one of [{}]", choices.join(", ")),
            Coercer::KeyValue { separator } => format!("key{separator}value pair"),
            Coercer::Custom { type_name, .. } => type_name.clone(),
        }
    }

    /// Coerces a raw literal. Every variant is total over its accepted
    /// inputs and rejects everything else with a [`CoerceFailure`].
    pub fn coerce(&self, literal: &str) -> Result<Value, CoerceFailure> {
        let reject = || CoerceFailure {
            literal: literal.to_string(),
            expected: self.expected(),
        };
        match self {
            Coercer::Bool => match literal.to_ascii_lowercase().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(reject()),
            },
            Coercer::Int => literal
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| reject()),
            Coercer::Float => literal
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| reject()),
            Coercer::Str => Ok(Value::Str(literal.to_string())),
            Coercer::OneOf(choices) => {
                if choices.iter().any(|c| c == literal) {
                    Ok(Value::Str(literal.to_string()))
                } else {
                    Err(reject())
                }
            }
            Coercer::KeyValue { separator } => match literal.split_once(*separator) {
                Some((key, value)) if !key.is_empty() => Ok(Value::Pair(
                    KeyValue::with_separator(key, value, *separator),
                )),
                _ => Err(reject()),
            },
            Coercer::Custom { apply, .. } => apply(literal).map_err(|detail| CoerceFailure {
                literal: literal.to_string(),
                expected: detail,
            }),
        }
    }

    /// Whether the literal would coerce, used by optional-value sniffing.
    pub fn accepts(&self, literal: &str) -> bool {
        self.coerce(literal).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_accepts_case_insensitive_literals() {
        assert_eq!(Coercer::Bool.coerce("true"), Ok(Value::Bool(true)));
        assert_eq!(Coercer::Bool.coerce("FALSE"), Ok(Value::Bool(false)));
        assert!(Coercer::Bool.coerce("yes").is_err());
    }

    #[test]
    fn test_int_rejects_non_numeric() {
        assert_eq!(Coercer::Int.coerce("8080"), Ok(Value::Int(8080)));
        assert_eq!(Coercer::Int.coerce("-3"), Ok(Value::Int(-3)));
        let err = Coercer::Int.coerce("80x").unwrap_err();
        assert_eq!(err.literal, "80x");
        assert_eq!(err.expected, "integer");
    }

    #[test]
    fn test_one_of_reports_choices() {
        let coercer = Coercer::OneOf(vec!["json".into(), "yaml".into()]);
        assert_eq!(coercer.coerce("json"), Ok(Value::Str("json".into())));
        let err = coercer.coerce("toml").unwrap_err();
        assert_eq!(err.expected, "one of [json, yaml]");
    }

    #[test]
    fn test_key_value_splits_at_first_separator() {
        let coercer = Coercer::KeyValue { separator: '=' };
        let value = coercer.coerce("url=http://x?a=b").unwrap();
        match value {
            Value::Pair(pair) => {
                assert_eq!(pair.key(), "url");
                assert_eq!(pair.value(), "http://x?a=b");
            }
            other => panic!("expected pair, got {other:?}"),
        }
        assert!(coercer.coerce("no-separator").is_err());
        assert!(coercer.coerce("=empty-key").is_err());
    }

    #[test]
    fn test_custom_coercer_maps_names() {
        let coercer = Coercer::Custom {
            type_name: "log level".to_string(),
            apply: Arc::new(|raw| match raw {
                "debug" => Ok(Value::Int(0)),
                "info" => Ok(Value::Int(1)),
                other => Err(format!("unknown level {other:?}")),
            }),
        };
        assert_eq!(coercer.coerce("info"), Ok(Value::Int(1)));
        let err = coercer.coerce("loud").unwrap_err();
        assert_eq!(err.expected, "unknown level \"loud\"");
    }
}
