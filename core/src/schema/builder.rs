//! Declaration builders.
//!
//! An option is declared in three steps: pick the switches
//! ([`Schema::option`](super::Schema::option)), pick the element type
//! (`.int()`, `.bool()`, ...), then configure and shape it. The shape step
//! (`.required()`, `.default()`, `.list()`, `.set()`, `.arity(n)`) comes
//! last and decides the collection type carried by the returned [`Arg`]
//! handle. Illegal combinations surface as [`ConfigError`]s from `finish()`.
//!
//! Constraint edges reference [`OptionId`]s, so an edge can only point at
//! options declared earlier; relations that involve later options are added
//! through [`Schema::constrain`](super::Schema::constrain) afterwards.

use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::coerce::Coercer;
use crate::error::ConfigError;
use crate::value::{BoundData, FromValue, IntoValue, KeyValue, Value};

use super::constraint::{Constraint, ConstraintKind};
use super::{
    Arg, CollectionKind, CollectionValidator, DomainId, OptionId, OptionSpec, Schema, Validator,
};

fn blank_spec(switches: Vec<String>, name: String, positional: bool) -> OptionSpec {
    OptionSpec {
        name,
        switches,
        positional,
        coercer: Coercer::Str,
        collection: CollectionKind::Scalar,
        arity: None,
        required: false,
        default: None,
        env_var: None,
        negatable: false,
        negation_prefix: None,
        requires_value: true,
        validators: Vec::new(),
        collection_validators: Vec::new(),
        on_value: None,
        domains: Vec::new(),
        help: None,
        hidden: false,
        prompt: None,
        at_least: None,
    }
}

fn register<C>(
    schema: &mut Schema,
    spec: OptionSpec,
    edges: Vec<Constraint>,
) -> Result<Arg<C>, ConfigError> {
    let id = schema.register_option(spec)?;
    let name = schema.spec(id).display_name().to_string();
    for mut edge in edges {
        edge.owner = Some(id);
        schema.register_constraint(edge)?;
    }
    Ok(Arg {
        id,
        name,
        _marker: PhantomData,
    })
}

/// Untyped start of an option declaration; pick the element type next.
pub struct OptionBuilder<'a> {
    schema: &'a mut Schema,
    spec: OptionSpec,
}

impl<'a> OptionBuilder<'a> {
    pub(crate) fn new(schema: &'a mut Schema, switches: &[&str]) -> Self {
        let switches: Vec<String> = switches.iter().map(|s| s.to_string()).collect();
        Self {
            schema,
            spec: blank_spec(switches, String::new(), false),
        }
    }

    fn typed<T>(mut self, coercer: Coercer) -> TypedOption<'a, T> {
        self.spec.requires_value = !coercer.is_bool();
        self.spec.coercer = coercer;
        TypedOption {
            schema: self.schema,
            spec: self.spec,
            edges: Vec::new(),
            _marker: PhantomData,
        }
    }

    pub fn bool(self) -> TypedOption<'a, bool> {
        self.typed(Coercer::Bool)
    }

    pub fn int(self) -> TypedOption<'a, i64> {
        self.typed(Coercer::Int)
    }

    pub fn float(self) -> TypedOption<'a, f64> {
        self.typed(Coercer::Float)
    }

    pub fn string(self) -> TypedOption<'a, String> {
        self.typed(Coercer::Str)
    }

    /// String value restricted to a fixed choice list.
    pub fn one_of(self, choices: &[&str]) -> TypedOption<'a, String> {
        self.typed(Coercer::OneOf(choices.iter().map(|c| c.to_string()).collect()))
    }

    /// `key=value` pairs with key-only set identity.
    pub fn key_value(self) -> TypedOption<'a, KeyValue> {
        self.key_value_with('=')
    }

    pub fn key_value_with(self, separator: char) -> TypedOption<'a, KeyValue> {
        self.typed(Coercer::KeyValue { separator })
    }

    /// Caller-supplied coercion, e.g. an enum-from-name lookup. The
    /// `type_name` appears in invalid-value messages.
    pub fn map<T, F>(self, type_name: &str, coerce: F) -> TypedOption<'a, T>
    where
        T: FromValue + IntoValue,
        F: Fn(&str) -> Result<T, String> + Send + Sync + 'static,
    {
        self.typed(Coercer::Custom {
            type_name: type_name.to_string(),
            apply: Arc::new(move |raw| coerce(raw).map(IntoValue::into_value)),
        })
    }
}

/// Untyped start of a positional declaration.
pub struct PositionalBuilder<'a> {
    schema: &'a mut Schema,
    spec: OptionSpec,
}

impl<'a> PositionalBuilder<'a> {
    pub(crate) fn new(schema: &'a mut Schema, name: &str) -> Self {
        Self {
            schema,
            spec: blank_spec(Vec::new(), name.to_string(), true),
        }
    }

    fn typed<T>(mut self, coercer: Coercer) -> TypedOption<'a, T> {
        self.spec.coercer = coercer;
        TypedOption {
            schema: self.schema,
            spec: self.spec,
            edges: Vec::new(),
            _marker: PhantomData,
        }
    }

    pub fn bool(self) -> TypedOption<'a, bool> {
        self.typed(Coercer::Bool)
    }

    pub fn int(self) -> TypedOption<'a, i64> {
        self.typed(Coercer::Int)
    }

    pub fn float(self) -> TypedOption<'a, f64> {
        self.typed(Coercer::Float)
    }

    pub fn string(self) -> TypedOption<'a, String> {
        self.typed(Coercer::Str)
    }

    pub fn one_of(self, choices: &[&str]) -> TypedOption<'a, String> {
        self.typed(Coercer::OneOf(choices.iter().map(|c| c.to_string()).collect()))
    }

    pub fn key_value(self) -> TypedOption<'a, KeyValue> {
        self.typed(Coercer::KeyValue { separator: '=' })
    }
}

/// A typed option being configured. Shape it last with `.required()`,
/// `.default()`, `.list()`, `.set()`, or finish it as an optional scalar.
pub struct TypedOption<'a, T> {
    schema: &'a mut Schema,
    spec: OptionSpec,
    edges: Vec<Constraint>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: FromValue> TypedOption<'a, T> {
    /// Environment variable consulted when no occurrence was parsed.
    pub fn from_env(mut self, name: &str) -> Self {
        self.spec.env_var = Some(name.to_string());
        self
    }

    /// Whether a following token must be consumed as the value even when it
    /// does not look like one. Defaults to `true` for non-boolean types and
    /// `false` for booleans.
    pub fn requires_value(mut self, requires: bool) -> Self {
        self.spec.requires_value = requires;
        self
    }

    pub fn help(mut self, text: &str) -> Self {
        self.spec.help = Some(text.to_string());
        self
    }

    /// Excluded from the schema snapshot (and thus from help output).
    pub fn hidden(mut self) -> Self {
        self.spec.hidden = true;
        self
    }

    /// Prompt text used when the option is required, missing from every
    /// source, and a prompter is installed.
    pub fn prompt(mut self, text: &str) -> Self {
        self.spec.prompt = Some(text.to_string());
        self
    }

    /// Restricts the option to the given domains (or fragments, making it
    /// available to every inheriting domain).
    pub fn only_in_domains(mut self, domains: &[DomainId]) -> Self {
        self.spec.domains.extend_from_slice(domains);
        self
    }

    /// Element-level validator; failures are parse errors raised before any
    /// constraint is evaluated.
    pub fn validate<F>(mut self, message: &str, check: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.spec.validators.push(Validator {
            message: message.to_string(),
            check: Arc::new(move |value: &Value| {
                T::from_value(value).is_some_and(|typed| check(&typed))
            }),
        });
        self
    }

    /// Callback invoked for each user-supplied value, in encounter order.
    pub fn on_value<F>(mut self, callback: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.spec.on_value = Some(Arc::new(move |value: &Value| {
            if let Some(typed) = T::from_value(value) {
                callback(&typed);
            }
        }));
        self
    }

    fn edge(mut self, kind: ConstraintKind, partners: &[OptionId]) -> Self {
        self.edges.push(Constraint {
            kind,
            owner: None, // filled with this option's id at finish
            partners: partners.to_vec(),
            scope: None,
        });
        self
    }

    /// This option and any of `others` are mutually exclusive (globally).
    pub fn conflicts_with(self, others: &[OptionId]) -> Self {
        self.edge(ConstraintKind::Conflicts, others)
    }

    pub fn exactly_one_with(self, others: &[OptionId]) -> Self {
        self.edge(ConstraintKind::ExactlyOne, others)
    }

    pub fn at_most_one_with(self, others: &[OptionId]) -> Self {
        self.edge(ConstraintKind::AtMostOne, others)
    }

    pub fn at_least_one_with(self, others: &[OptionId]) -> Self {
        self.edge(ConstraintKind::AtLeastOne, others)
    }

    /// This option becomes required when every trigger is present.
    pub fn require_if_all_present(self, triggers: &[OptionId]) -> Self {
        self.edge(ConstraintKind::RequireIfAllPresent, triggers)
    }

    /// This option becomes required when any trigger is present.
    pub fn require_if_any_present(self, triggers: &[OptionId]) -> Self {
        self.edge(ConstraintKind::RequireIfAnyPresent, triggers)
    }

    /// This option becomes required when `predicate` holds for the final
    /// value of `source`.
    pub fn require_if_value<S, F>(self, source: OptionId, predicate: F) -> Self
    where
        S: FromValue,
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        let erased: super::constraint::ValuePredicate = Arc::new(move |value: &Value| {
            S::from_value(value).is_some_and(|typed| predicate(&typed))
        });
        self.edge(ConstraintKind::RequireIfValue(erased), &[source])
    }

    /// Finishes as an optional scalar; absent binds to `None`.
    pub fn finish(self) -> Result<Arg<Option<T>>, ConfigError> {
        register(self.schema, self.spec, self.edges)
    }

    /// The option must be bound from some source or the parse fails.
    pub fn required(mut self) -> RequiredOption<'a, T> {
        self.spec.required = true;
        RequiredOption {
            schema: self.schema,
            spec: self.spec,
            edges: self.edges,
            _marker: PhantomData,
        }
    }

    /// Fallback value when no occurrence and no environment value exist.
    pub fn default(mut self, value: T) -> RequiredOption<'a, T>
    where
        T: IntoValue,
    {
        self.spec.default = Some(BoundData::One(value.into_value()));
        RequiredOption {
            schema: self.schema,
            spec: self.spec,
            edges: self.edges,
            _marker: PhantomData,
        }
    }

    /// One entry per occurrence, in encounter order.
    pub fn list(mut self) -> ListOption<'a, T> {
        self.spec.collection = CollectionKind::List;
        ListOption {
            schema: self.schema,
            spec: self.spec,
            edges: self.edges,
            _marker: PhantomData,
        }
    }

    /// Deduplicated accumulation (key-only identity for key-value pairs).
    pub fn set(mut self) -> SetOption<'a, T> {
        self.spec.collection = CollectionKind::Set;
        SetOption {
            schema: self.schema,
            spec: self.spec,
            edges: self.edges,
            _marker: PhantomData,
        }
    }
}

impl<'a> TypedOption<'a, bool> {
    /// Enables the negated spelling (`--no-debug`) with the schema's
    /// default negation prefix. The parsed boolean is inverted.
    pub fn negatable(mut self) -> Self {
        self.spec.negatable = true;
        self
    }

    /// Enables negation under a custom prefix.
    pub fn negatable_with(mut self, prefix: &str) -> Self {
        self.spec.negatable = true;
        self.spec.negation_prefix = Some(prefix.to_string());
        self
    }
}

/// A scalar option guaranteed to bind: required or defaulted.
pub struct RequiredOption<'a, T> {
    schema: &'a mut Schema,
    spec: OptionSpec,
    edges: Vec<Constraint>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: FromValue> RequiredOption<'a, T> {
    pub fn from_env(mut self, name: &str) -> Self {
        self.spec.env_var = Some(name.to_string());
        self
    }

    pub fn help(mut self, text: &str) -> Self {
        self.spec.help = Some(text.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.spec.hidden = true;
        self
    }

    pub fn prompt(mut self, text: &str) -> Self {
        self.spec.prompt = Some(text.to_string());
        self
    }

    pub fn finish(self) -> Result<Arg<T>, ConfigError> {
        register(self.schema, self.spec, self.edges)
    }
}

fn collection_check<T, F>(check: F) -> super::CollectionCheck
where
    T: FromValue,
    F: Fn(&[T]) -> bool + Send + Sync + 'static,
{
    Arc::new(move |values: &[Value]| {
        let typed: Option<Vec<T>> = values.iter().map(T::from_value).collect();
        typed.is_some_and(|typed| check(&typed))
    })
}

/// A list-shaped option.
pub struct ListOption<'a, T> {
    schema: &'a mut Schema,
    spec: OptionSpec,
    edges: Vec<Constraint>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: FromValue> ListOption<'a, T> {
    /// Every occurrence consumes exactly `n` (>= 2) value tokens as one
    /// fixed-size group.
    pub fn arity(mut self, n: usize) -> GroupListOption<'a, T> {
        self.spec.arity = Some(n);
        self.spec.collection = CollectionKind::GroupList;
        GroupListOption {
            schema: self.schema,
            spec: self.spec,
            edges: self.edges,
            _marker: PhantomData,
        }
    }

    /// Minimum number of accumulated entries (must be positive).
    pub fn at_least(mut self, n: usize) -> Self {
        self.spec.at_least = Some(n);
        self
    }

    pub fn default(mut self, values: Vec<T>) -> Self
    where
        T: IntoValue,
    {
        self.spec.default = Some(BoundData::Many(
            values.into_iter().map(IntoValue::into_value).collect(),
        ));
        self
    }

    /// Collection-level validator, run after element validators.
    pub fn validate_collection<F>(mut self, message: &str, check: F) -> Self
    where
        F: Fn(&[T]) -> bool + Send + Sync + 'static,
    {
        self.spec.collection_validators.push(CollectionValidator {
            message: message.to_string(),
            check: collection_check(check),
        });
        self
    }

    pub fn finish(self) -> Result<Arg<Vec<T>>, ConfigError> {
        register(self.schema, self.spec, self.edges)
    }
}

/// A set-shaped option.
pub struct SetOption<'a, T> {
    schema: &'a mut Schema,
    spec: OptionSpec,
    edges: Vec<Constraint>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: FromValue> SetOption<'a, T> {
    pub fn arity(mut self, n: usize) -> GroupSetOption<'a, T> {
        self.spec.arity = Some(n);
        self.spec.collection = CollectionKind::GroupSet;
        GroupSetOption {
            schema: self.schema,
            spec: self.spec,
            edges: self.edges,
            _marker: PhantomData,
        }
    }

    pub fn at_least(mut self, n: usize) -> Self {
        self.spec.at_least = Some(n);
        self
    }

    pub fn validate_collection<F>(mut self, message: &str, check: F) -> Self
    where
        F: Fn(&[T]) -> bool + Send + Sync + 'static,
    {
        self.spec.collection_validators.push(CollectionValidator {
            message: message.to_string(),
            check: collection_check(check),
        });
        self
    }

    pub fn finish(self) -> Result<Arg<HashSet<T>>, ConfigError>
    where
        T: Eq + std::hash::Hash,
    {
        register(self.schema, self.spec, self.edges)
    }
}

/// A list of fixed-size groups (`.list().arity(n)`).
pub struct GroupListOption<'a, T> {
    schema: &'a mut Schema,
    spec: OptionSpec,
    edges: Vec<Constraint>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: FromValue> GroupListOption<'a, T> {
    pub fn at_least(mut self, n: usize) -> Self {
        self.spec.at_least = Some(n);
        self
    }

    /// Default groups; each inner vector must match the declared arity.
    pub fn default(mut self, groups: Vec<Vec<T>>) -> Self
    where
        T: IntoValue,
    {
        self.spec.default = Some(BoundData::Many(
            groups
                .into_iter()
                .map(|group| {
                    Value::Group(group.into_iter().map(IntoValue::into_value).collect())
                })
                .collect(),
        ));
        self
    }

    pub fn finish(self) -> Result<Arg<Vec<Vec<T>>>, ConfigError> {
        register(self.schema, self.spec, self.edges)
    }
}

/// A deduplicated set of fixed-size groups (`.set().arity(n)`).
pub struct GroupSetOption<'a, T> {
    schema: &'a mut Schema,
    spec: OptionSpec,
    edges: Vec<Constraint>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: FromValue> GroupSetOption<'a, T> {
    pub fn at_least(mut self, n: usize) -> Self {
        self.spec.at_least = Some(n);
        self
    }

    pub fn finish(self) -> Result<Arg<HashSet<Vec<T>>>, ConfigError>
    where
        T: Eq + std::hash::Hash,
    {
        register(self.schema, self.spec, self.edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_below_two_rejected() {
        let mut schema = Schema::new();
        let err = schema
            .option(&["--pair"])
            .int()
            .list()
            .arity(1)
            .finish()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::ArityTooSmall {
                option: "--pair".to_string(),
                arity: 1,
            }
        );
    }

    #[test]
    fn test_arity_with_optional_value_rejected() {
        let mut schema = Schema::new();
        let err = schema
            .option(&["--pair"])
            .int()
            .requires_value(false)
            .list()
            .arity(2)
            .finish()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::ArityOptionalValue {
                option: "--pair".to_string(),
                arity: 2,
            }
        );
    }

    #[test]
    fn test_arity_with_env_fallback_rejected() {
        let mut schema = Schema::new();
        let err = schema
            .option(&["--pair"])
            .int()
            .from_env("PAIR")
            .list()
            .arity(2)
            .finish()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::ArityEnvFallback {
                option: "--pair".to_string(),
            }
        );
    }

    #[test]
    fn test_default_group_size_must_match_arity() {
        let mut schema = Schema::new();
        let err = schema
            .option(&["--point"])
            .int()
            .list()
            .arity(2)
            .default(vec![vec![1, 2, 3]])
            .finish()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::DefaultArityMismatch {
                option: "--point".to_string(),
                expected: 2,
                got: 3,
            }
        );
    }

    #[test]
    fn test_at_least_zero_rejected() {
        let mut schema = Schema::new();
        let err = schema
            .option(&["--tag"])
            .string()
            .list()
            .at_least(0)
            .finish()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::AtLeastNotPositive {
                option: "--tag".to_string(),
            }
        );
    }

    #[test]
    fn test_blank_negation_prefix_rejected() {
        let mut schema = Schema::new();
        let err = schema
            .option(&["--debug"])
            .bool()
            .negatable_with("  ")
            .finish()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::BlankNegationPrefix {
                option: "--debug".to_string(),
            }
        );
    }

    #[test]
    fn test_constraint_edge_registered_with_owner() {
        let mut schema = Schema::new();
        let input = schema.option(&["--input"]).string().finish().unwrap();
        schema
            .option(&["--config"])
            .string()
            .conflicts_with(&[input.id()])
            .finish()
            .unwrap();
        assert_eq!(schema.constraints.len(), 1);
        let constraint = &schema.constraints[0];
        assert_eq!(constraint.partners, vec![input.id()]);
        assert!(constraint.owner.is_some());
        assert!(constraint.scope.is_none());
    }
}
