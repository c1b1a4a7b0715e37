//! Value accumulation: per-occurrence token values into final bindings.
//!
//! For every declared option the accumulator folds its command-line
//! occurrences into the declared collection shape. Options with no
//! occurrence at all walk the fallback chain: environment variable,
//! declared default, interactive prompt (required options only), and
//! finally either a missing binding or a
//! [`ParseError::MissingRequired`]. A bare valueless occurrence counts as
//! the user speaking and keeps every fallback source out.

use tracing::trace;

use crate::error::ParseError;
use crate::schema::{CollectionKind, DomainId, OptionId, OptionSpec, Schema};
use crate::value::{Binding, BoundData, Value, ValueSource};

pub(crate) fn accumulate(
    schema: &Schema,
    occurrences: Vec<Vec<Vec<Value>>>,
    selected: Option<DomainId>,
) -> Result<Vec<Binding>, ParseError> {
    let mut bindings = Vec::with_capacity(schema.specs.len());
    for (index, groups) in occurrences.into_iter().enumerate() {
        let id = OptionId(index);
        if !schema.option_active(id, selected) {
            // Scoped out of the selected domain: no fallback, no checks.
            bindings.push(Binding::default());
            continue;
        }
        bindings.push(bind_option(schema, id, groups)?);
    }
    Ok(bindings)
}

fn bind_option(
    schema: &Schema,
    id: OptionId,
    groups: Vec<Vec<Value>>,
) -> Result<Binding, ParseError> {
    let spec = schema.spec(id);
    let occurrences = groups.len();

    for group in &groups {
        for value in group {
            run_validators(spec, value)?;
            if let Some(callback) = &spec.on_value {
                callback(value);
            }
        }
    }

    let mut binding = fold(spec, groups);
    binding.occurrences = occurrences;

    if binding.data.is_empty() {
        if binding.occurrences == 0 {
            if let Some(value) = env_fallback(schema, spec)? {
                binding.data = shape_single(spec, value);
                binding.source = ValueSource::Environment;
            } else if let Some(default) = &spec.default {
                binding.data = default.clone();
                binding.source = ValueSource::Default;
            } else if spec.required {
                let value = prompt_fallback(schema, spec)?;
                binding.data = shape_single(spec, value);
                binding.source = ValueSource::User;
            }
        } else if spec.required || spec.default.is_some() {
            // A bare valueless occurrence never reopens the fallback
            // chain, and a required or defaulted handle must bind a
            // value; the user still owes one.
            return Err(ParseError::MissingRequired {
                option: spec.display_name().to_string(),
            });
        }
    }

    if let Some(needed) = spec.at_least {
        let got = binding.data.len();
        if got < needed {
            return Err(ParseError::TooFewOccurrences {
                option: spec.display_name().to_string(),
                needed,
                got,
            });
        }
    }

    if !binding.data.is_empty() {
        run_collection_validators(spec, &binding.data)?;
    }

    trace!(
        option = spec.display_name(),
        source = ?binding.source,
        elements = binding.data.len(),
        occurrences = binding.occurrences,
        "bound"
    );
    Ok(binding)
}

/// Folds per-occurrence value groups into the declared collection shape.
fn fold(spec: &OptionSpec, groups: Vec<Vec<Value>>) -> Binding {
    let mut binding = Binding::default();
    match spec.collection {
        CollectionKind::Scalar => {
            // Last occurrence wins; a bare no-value occurrence leaves the
            // data absent but still counts as an occurrence.
            let last = groups
                .into_iter()
                .rev()
                .find_map(|group| group.into_iter().next());
            if let Some(value) = last {
                binding.data = BoundData::One(value);
                binding.source = ValueSource::User;
            }
        }
        CollectionKind::List => {
            let values: Vec<Value> = groups.into_iter().flatten().collect();
            if !values.is_empty() {
                binding.data = BoundData::Many(values);
                binding.source = ValueSource::User;
            }
        }
        CollectionKind::Set => {
            let mut values: Vec<Value> = Vec::new();
            for value in groups.into_iter().flatten() {
                insert_deduplicated(&mut values, value);
            }
            if !values.is_empty() {
                binding.data = BoundData::Many(values);
                binding.source = ValueSource::User;
            }
        }
        CollectionKind::GroupList => {
            let values: Vec<Value> = groups.into_iter().map(Value::Group).collect();
            if !values.is_empty() {
                binding.data = BoundData::Many(values);
                binding.source = ValueSource::User;
            }
        }
        CollectionKind::GroupSet => {
            let mut values: Vec<Value> = Vec::new();
            for group in groups {
                insert_deduplicated(&mut values, Value::Group(group));
            }
            if !values.is_empty() {
                binding.data = BoundData::Many(values);
                binding.source = ValueSource::User;
            }
        }
    }
    binding
}

/// Set insertion keeping first-seen order. Equality for key-value pairs is
/// key-only, so re-inserting an existing key replaces the stored pair and
/// the later value wins.
fn insert_deduplicated(values: &mut Vec<Value>, value: Value) {
    match values.iter_mut().find(|existing| equivalent(existing, &value)) {
        Some(existing) => *existing = value,
        None => values.push(value),
    }
}

fn equivalent(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Pair(x), Value::Pair(y)) => x == y,
        _ => a == b,
    }
}

/// Reads and coerces the declared environment variable, if any. The
/// variable supplies exactly one value, which becomes one collection
/// element for list and set options.
fn env_fallback(schema: &Schema, spec: &OptionSpec) -> Result<Option<Value>, ParseError> {
    let Some(var) = &spec.env_var else {
        return Ok(None);
    };
    let Some(raw) = schema.env.var(var) else {
        return Ok(None);
    };
    let value = spec
        .coercer
        .coerce(&raw)
        .map_err(|failure| ParseError::InvalidValue {
            option: spec.display_name().to_string(),
            literal: failure.literal,
            expected: failure.expected,
        })?;
    run_validators(spec, &value)?;
    Ok(Some(value))
}

fn shape_single(spec: &OptionSpec, value: Value) -> BoundData {
    if spec.is_collection() {
        BoundData::Many(vec![value])
    } else {
        BoundData::One(value)
    }
}

/// Interactive prompting for a missing required option: retried up to the
/// configured budget, consuming one attempt per rejected or unreadable
/// input. Without a prompter or a declared prompt the option is simply
/// missing.
fn prompt_fallback(schema: &Schema, spec: &OptionSpec) -> Result<Value, ParseError> {
    let missing = || ParseError::MissingRequired {
        option: spec.display_name().to_string(),
    };
    let Some(prompter) = &schema.prompter else {
        return Err(missing());
    };
    let Some(prompt) = &spec.prompt else {
        return Err(missing());
    };

    let attempts = schema.config.max_prompt_retries;
    for attempt in 1..=attempts {
        let Ok(raw) = prompter.read_secret(prompt) else {
            trace!(option = spec.display_name(), attempt, "prompt read failed");
            continue;
        };
        let Ok(value) = spec.coercer.coerce(&raw) else {
            trace!(option = spec.display_name(), attempt, "prompted value rejected");
            continue;
        };
        if run_validators(spec, &value).is_err() {
            trace!(option = spec.display_name(), attempt, "prompted value invalid");
            continue;
        }
        return Ok(value);
    }
    Err(ParseError::PromptExhausted {
        option: spec.display_name().to_string(),
        attempts,
    })
}

fn run_validators(spec: &OptionSpec, value: &Value) -> Result<(), ParseError> {
    for validator in &spec.validators {
        if !(validator.check)(value) {
            return Err(ParseError::ValidatorFailed {
                option: spec.display_name().to_string(),
                literal: value.to_string(),
                message: validator.message.clone(),
            });
        }
    }
    Ok(())
}

fn run_collection_validators(spec: &OptionSpec, data: &BoundData) -> Result<(), ParseError> {
    if spec.collection_validators.is_empty() {
        return Ok(());
    }
    let values: &[Value] = match data {
        BoundData::Many(values) => values,
        BoundData::One(value) => std::slice::from_ref(value),
        BoundData::Absent => &[],
    };
    for validator in &spec.collection_validators {
        if !(validator.check)(values) {
            return Err(ParseError::CollectionValidatorFailed {
                option: spec.display_name().to_string(),
                message: validator.message.clone(),
            });
        }
    }
    Ok(())
}
