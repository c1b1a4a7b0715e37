//! Error taxonomy: declaration-time [`ConfigError`] vs parse-time
//! [`ParseError`].
//!
//! Configuration errors are raised by builder `finish()` calls and are always
//! fatal to schema construction. Parse errors depend on the token array and
//! are either returned from [`Schema::parse`](crate::Schema::parse) or handed
//! to the callback of
//! [`Schema::parse_or_report`](crate::Schema::parse_or_report), never both.
//!
//! Coercion and validator errors are always detected before constraint
//! errors within one parse call.

use thiserror::Error;

/// A schema was declared illegally. Raised at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The same switch string was registered twice.
    #[error("switch {0:?} is already registered")]
    DuplicateSwitch(String),
    /// A switch does not start with the configured short or long prefix.
    #[error("invalid switch format: {0:?}")]
    InvalidSwitch(String),
    /// An option declared no switches at all.
    #[error("an option must declare at least one switch")]
    NoSwitches,
    /// Arity below the minimum of 2.
    #[error("option {option}: arity must be at least 2, got {arity}")]
    ArityTooSmall { option: String, arity: usize },
    /// Arity groups cannot be combined with an optional value.
    #[error("option {option}: arity {arity} is incompatible with requires_value(false)")]
    ArityOptionalValue { option: String, arity: usize },
    /// Arity groups cannot be filled from an environment variable.
    #[error("option {option}: arity is incompatible with an environment fallback")]
    ArityEnvFallback { option: String },
    /// A default group does not match the declared arity.
    #[error("option {option}: default group size {got} does not match arity {expected}")]
    DefaultArityMismatch {
        option: String,
        expected: usize,
        got: usize,
    },
    /// `at_least` must be positive.
    #[error("option {option}: at_least must be positive")]
    AtLeastNotPositive { option: String },
    /// Empty or whitespace-only negation prefix.
    #[error("option {option}: negation prefix cannot be blank")]
    BlankNegationPrefix { option: String },
    /// Two domains or aliases share the same selector token.
    #[error("domain selector {0:?} is already declared")]
    DuplicateDomain(String),
    /// Fragments are constraint templates: no aliases, label, help, or
    /// inheritance.
    #[error("fragment {id:?} may not declare {what}")]
    FragmentMetadata { id: String, what: &'static str },
    /// A constraint or scope referenced an option id from another schema.
    #[error("option reference #{0} does not resolve in this schema")]
    UnknownOptionRef(usize),
    /// An inheritance edge or scope referenced a domain id from another
    /// schema.
    #[error("domain reference #{0} does not resolve in this schema")]
    UnknownDomainRef(usize),
    /// Only the last positional may be a list.
    #[error("positional {0:?} declared after a trailing list positional")]
    PositionalAfterList(String),
}

/// The relational constraint kinds, as reported in violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKindTag {
    ExactlyOne,
    AtMostOne,
    AtLeastOne,
    Conflicts,
    RequireIfAllPresent,
    RequireIfAnyPresent,
    RequireIfValue,
}

/// A parse call failed. Raised during tokenization, accumulation, validation,
/// or constraint checking.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// A switch-shaped token (or clustered character) matched nothing.
    #[error("unknown option {switch:?} at position {position}")]
    UnknownSwitch { switch: String, position: usize },
    /// Domains are declared, `require_domain` is set, and the first token
    /// selected none of them.
    #[error("a domain is required before any options or positional arguments")]
    DomainRequired,
    /// An option ran out of value tokens.
    #[error("option {option}: missing value {index} of {arity} at position {position}")]
    MissingValue {
        option: String,
        index: usize,
        arity: usize,
        position: usize,
    },
    /// A literal failed coercion to the option's declared type.
    #[error("option {option}: invalid value {literal:?}, expected {expected}")]
    InvalidValue {
        option: String,
        literal: String,
        expected: String,
    },
    /// The negated spelling of an option that is not negatable.
    #[error("option {option} is not negatable")]
    NotNegatable { option: String },
    /// Leftover positional tokens beyond the declared positionals.
    #[error("{}", unexpected_positionals_message(values))]
    UnexpectedPositionals { values: Vec<String> },
    /// A required option or positional is missing from every source.
    #[error("option {option} is required")]
    MissingRequired { option: String },
    /// An element validator rejected a coerced value.
    #[error("option {option}: invalid value {literal:?}: {message}")]
    ValidatorFailed {
        option: String,
        literal: String,
        message: String,
    },
    /// A collection validator rejected the accumulated collection.
    #[error("option {option}: {message}")]
    CollectionValidatorFailed { option: String, message: String },
    /// Fewer occurrences than the declared `at_least` minimum.
    #[error("option {option}: requires at least {needed} value(s), got {got}")]
    TooFewOccurrences {
        option: String,
        needed: usize,
        got: usize,
    },
    /// A relational constraint over the named options was violated.
    #[error("{}", constraint_message(*kind, options))]
    Constraint {
        kind: ConstraintKindTag,
        options: Vec<String>,
    },
    /// Interactive prompting gave up after the configured retry budget.
    #[error("option {option}: no valid value after {attempts} prompt attempt(s)")]
    PromptExhausted { option: String, attempts: usize },
    /// Collect-all constraint mode: every violation from one pass.
    #[error("{}", violations_message(errors))]
    Violations { errors: Vec<ParseError> },
}

fn unexpected_positionals_message(values: &[String]) -> String {
    if values.len() == 1 {
        format!("unexpected positional argument: {:?}", values[0])
    } else {
        format!(
            "unexpected positional arguments: {}",
            values
                .iter()
                .map(|v| format!("{v:?}"))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

fn constraint_message(kind: ConstraintKindTag, options: &[String]) -> String {
    let listed = options.join(", ");
    match kind {
        ConstraintKindTag::ExactlyOne => {
            format!("exactly one of {listed} is required")
        }
        ConstraintKindTag::AtMostOne => {
            format!("at most one of {listed} may be given")
        }
        ConstraintKindTag::AtLeastOne => {
            format!("at least one of {listed} is required")
        }
        ConstraintKindTag::Conflicts => {
            format!("conflicting options: {listed}")
        }
        ConstraintKindTag::RequireIfAllPresent | ConstraintKindTag::RequireIfAnyPresent => {
            match options.split_first() {
                Some((target, triggers)) if !triggers.is_empty() => format!(
                    "option {target} is required when {} given",
                    triggers.join(", ")
                ),
                Some((target, _)) => format!("option {target} is required"),
                None => "option is required".to_string(),
            }
        }
        ConstraintKindTag::RequireIfValue => match options.split_first() {
            Some((target, sources)) => format!(
                "option {target} is required by the value of {}",
                sources.join(", ")
            ),
            None => "option is required".to_string(),
        },
    }
}

fn violations_message(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_positionals_singular_and_plural() {
        let one = ParseError::UnexpectedPositionals {
            values: vec!["extra".into()],
        };
        assert_eq!(one.to_string(), "unexpected positional argument: \"extra\"");

        let two = ParseError::UnexpectedPositionals {
            values: vec!["a".into(), "b".into()],
        };
        assert!(two.to_string().starts_with("unexpected positional arguments:"));
    }

    #[test]
    fn test_constraint_message_names_participants() {
        let err = ParseError::Constraint {
            kind: ConstraintKindTag::ExactlyOne,
            options: vec!["--input".into(), "--config".into()],
        };
        assert_eq!(
            err.to_string(),
            "exactly one of --input, --config is required"
        );
    }

    #[test]
    fn test_required_sugar_message() {
        let err = ParseError::Constraint {
            kind: ConstraintKindTag::RequireIfAllPresent,
            options: vec!["--port".into()],
        };
        assert_eq!(err.to_string(), "option --port is required");
    }
}
