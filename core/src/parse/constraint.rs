//! Constraint evaluation over the final bindings.
//!
//! Runs after accumulation, so every presence question is answered against
//! fully-bound data: a value that arrived via the environment counts as
//! present, a default never does. Global constraints are checked first, then
//! the selected domain's own and inherited ones, in declaration order.

use tracing::trace;

use crate::error::ParseError;
use crate::schema::{Constraint, ConstraintKind, ConstraintMode, DomainId, OptionId, Schema};
use crate::value::{Binding, BoundData};

pub(crate) fn check(
    schema: &Schema,
    bindings: &[Binding],
    selected: Option<DomainId>,
) -> Result<(), ParseError> {
    let mut violations = Vec::new();
    for index in schema.effective_constraints(selected) {
        let constraint = &schema.constraints[index];
        if let Some(violation) = evaluate(schema, constraint, bindings) {
            trace!(constraint = ?constraint.kind, "constraint violated");
            match schema.config.constraint_mode {
                ConstraintMode::FailFast => return Err(violation),
                ConstraintMode::CollectAll => violations.push(violation),
            }
        }
    }
    match violations.len() {
        0 => Ok(()),
        1 => Err(violations.remove(0)),
        _ => Err(ParseError::Violations { errors: violations }),
    }
}

fn evaluate(schema: &Schema, constraint: &Constraint, bindings: &[Binding]) -> Option<ParseError> {
    let present = |id: OptionId| bindings[id.0].is_present();
    let owner_present = constraint.owner.map(present);
    let partners_present = constraint.partners.iter().filter(|id| present(**id)).count();

    let violated = match &constraint.kind {
        ConstraintKind::ExactlyOne => participant_count(constraint, bindings) != 1,
        ConstraintKind::AtMostOne => participant_count(constraint, bindings) > 1,
        ConstraintKind::AtLeastOne => participant_count(constraint, bindings) == 0,
        ConstraintKind::Conflicts => match owner_present {
            Some(owner) => owner && partners_present > 0,
            None => partners_present > 1,
        },
        ConstraintKind::RequireIfAllPresent => {
            partners_present == constraint.partners.len() && owner_present != Some(true)
        }
        // "Any of zero triggers" is vacuously false; only the all-present
        // kind doubles as the unconditional `required` sugar.
        ConstraintKind::RequireIfAnyPresent => {
            partners_present > 0 && owner_present != Some(true)
        }
        ConstraintKind::RequireIfValue(predicate) => {
            let triggered = constraint
                .partners
                .iter()
                .any(|id| value_matches(&bindings[id.0], predicate));
            triggered && owner_present != Some(true)
        }
    };

    if !violated {
        return None;
    }
    Some(ParseError::Constraint {
        kind: constraint.kind.tag(),
        options: constraint
            .participants()
            .into_iter()
            .map(|id| schema.spec(id).display_name().to_string())
            .collect(),
    })
}

fn participant_count(constraint: &Constraint, bindings: &[Binding]) -> usize {
    constraint
        .participants()
        .into_iter()
        .filter(|id| bindings[id.0].is_present())
        .count()
}

/// Whether any bound element of a present option satisfies the predicate.
/// Absent and default-only bindings never trigger value-conditioned
/// requirements.
fn value_matches(binding: &Binding, predicate: &crate::schema::ValuePredicate) -> bool {
    if !binding.is_present() {
        return false;
    }
    match &binding.data {
        BoundData::Absent => false,
        BoundData::One(value) => predicate(value),
        BoundData::Many(values) => values.iter().any(|v| predicate(v)),
    }
}
