//! Domain graph: selectable domains, constraint fragments, aliases, and
//! inheritance resolution.
//!
//! A domain is a subcommand-like mode that scopes which options and
//! constraints are active. A fragment is a non-selectable bundle of
//! constraints reused through inheritance; it carries no display metadata
//! and cannot inherit, so inheritance never needs multi-level expansion.

use crate::error::ConfigError;
use crate::value::{FromValue, Value};

use super::constraint::{Constraint, ConstraintKind};
use super::{DomainId, OptionId, Schema};

#[derive(Debug, Clone)]
pub(crate) struct DomainSpec {
    pub id: String,
    pub aliases: Vec<String>,
    pub label: Option<String>,
    pub help: Option<String>,
    pub fragment: bool,
    pub inherits: Vec<DomainId>,
}

impl DomainSpec {
    pub(crate) fn new(id: &str, fragment: bool) -> Self {
        Self {
            id: id.to_string(),
            aliases: Vec::new(),
            label: None,
            help: None,
            fragment,
            inherits: Vec::new(),
        }
    }

    /// Whether `token` selects this domain. Fragments never match.
    pub(crate) fn matches(&self, token: &str) -> bool {
        !self.fragment && (self.id == token || self.aliases.iter().any(|a| a == token))
    }
}

/// Builder for a domain or fragment, returned by
/// [`Schema::domain`](super::Schema::domain) and
/// [`Schema::fragment`](super::Schema::fragment).
///
/// Constraint methods here reference options declared earlier; relations
/// involving options declared after the domain go through
/// [`Schema::constrain`](super::Schema::constrain).
pub struct DomainBuilder<'a> {
    schema: &'a mut Schema,
    spec: DomainSpec,
    pending: Vec<Constraint>,
}

impl<'a> DomainBuilder<'a> {
    pub(crate) fn new(schema: &'a mut Schema, id: &str, fragment: bool) -> Self {
        Self {
            schema,
            spec: DomainSpec::new(id, fragment),
            pending: Vec::new(),
        }
    }

    /// Adds a selector alias (domains only).
    pub fn alias(mut self, alias: &str) -> Self {
        self.spec.aliases.push(alias.to_string());
        self
    }

    /// Display label for help rendering (domains only).
    pub fn label(mut self, label: &str) -> Self {
        self.spec.label = Some(label.to_string());
        self
    }

    /// Help text for help rendering (domains only).
    pub fn help(mut self, help: &str) -> Self {
        self.spec.help = Some(help.to_string());
        self
    }

    /// Inherits the constraints (and scoped options) of a fragment or
    /// another domain. Duplicate edges are collapsed.
    pub fn inherit(mut self, domain: DomainId) -> Self {
        if !self.spec.inherits.contains(&domain) {
            self.spec.inherits.push(domain);
        }
        self
    }

    /// Exactly one of `options` must be present in this domain.
    pub fn exactly_one(mut self, options: &[OptionId]) -> Self {
        self.pending.push(tuple_constraint(ConstraintKind::ExactlyOne, options));
        self
    }

    /// At most one of `options` may be present in this domain.
    pub fn at_most_one(mut self, options: &[OptionId]) -> Self {
        self.pending.push(tuple_constraint(ConstraintKind::AtMostOne, options));
        self
    }

    /// At least one of `options` must be present in this domain.
    pub fn at_least_one(mut self, options: &[OptionId]) -> Self {
        self.pending.push(tuple_constraint(ConstraintKind::AtLeastOne, options));
        self
    }

    /// `owner` and any of `others` are mutually exclusive in this domain.
    pub fn conflicts(mut self, owner: OptionId, others: &[OptionId]) -> Self {
        self.pending.push(Constraint {
            kind: ConstraintKind::Conflicts,
            owner: Some(owner),
            partners: others.to_vec(),
            scope: None,
        });
        self
    }

    /// `option` must be present whenever this domain is selected. Sugar for
    /// a require-if-all-present edge with zero triggers.
    pub fn required(self, option: OptionId) -> Self {
        self.require_if_all_present(option, &[])
    }

    /// `target` must be present when every trigger is present.
    pub fn require_if_all_present(mut self, target: OptionId, triggers: &[OptionId]) -> Self {
        self.pending.push(Constraint {
            kind: ConstraintKind::RequireIfAllPresent,
            owner: Some(target),
            partners: triggers.to_vec(),
            scope: None,
        });
        self
    }

    /// `target` must be present when any trigger is present.
    pub fn require_if_any_present(mut self, target: OptionId, triggers: &[OptionId]) -> Self {
        self.pending.push(Constraint {
            kind: ConstraintKind::RequireIfAnyPresent,
            owner: Some(target),
            partners: triggers.to_vec(),
            scope: None,
        });
        self
    }

    /// `target` must be present when `predicate` holds for the final value
    /// of `source`.
    pub fn require_if_value<T, F>(mut self, target: OptionId, source: OptionId, predicate: F) -> Self
    where
        T: FromValue,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.pending.push(Constraint {
            kind: ConstraintKind::RequireIfValue(erase_predicate(predicate)),
            owner: Some(target),
            partners: vec![source],
            scope: None,
        });
        self
    }

    /// Registers the domain and its constraints, validating fragment rules
    /// and selector uniqueness.
    pub fn finish(self) -> Result<DomainId, ConfigError> {
        let id = self.schema.register_domain(self.spec)?;
        for mut constraint in self.pending {
            constraint.scope = Some(id);
            self.schema.register_constraint(constraint)?;
        }
        Ok(id)
    }
}

/// Post-declaration constraint registration for a domain (or the global
/// scope), returned by [`Schema::constrain`](super::Schema::constrain).
pub struct ConstraintScope<'a> {
    schema: &'a mut Schema,
    scope: Option<DomainId>,
}

impl<'a> ConstraintScope<'a> {
    pub(crate) fn new(schema: &'a mut Schema, scope: Option<DomainId>) -> Self {
        Self { schema, scope }
    }

    fn register(&mut self, mut constraint: Constraint) -> Result<&mut Self, ConfigError> {
        constraint.scope = self.scope;
        self.schema.register_constraint(constraint)?;
        Ok(self)
    }

    pub fn exactly_one(&mut self, options: &[OptionId]) -> Result<&mut Self, ConfigError> {
        self.register(tuple_constraint(ConstraintKind::ExactlyOne, options))
    }

    pub fn at_most_one(&mut self, options: &[OptionId]) -> Result<&mut Self, ConfigError> {
        self.register(tuple_constraint(ConstraintKind::AtMostOne, options))
    }

    pub fn at_least_one(&mut self, options: &[OptionId]) -> Result<&mut Self, ConfigError> {
        self.register(tuple_constraint(ConstraintKind::AtLeastOne, options))
    }

    pub fn conflicts(&mut self, owner: OptionId, others: &[OptionId]) -> Result<&mut Self, ConfigError> {
        self.register(Constraint {
            kind: ConstraintKind::Conflicts,
            owner: Some(owner),
            partners: others.to_vec(),
            scope: None,
        })
    }

    pub fn required(&mut self, option: OptionId) -> Result<&mut Self, ConfigError> {
        self.require_if_all_present(option, &[])
    }

    pub fn require_if_all_present(
        &mut self,
        target: OptionId,
        triggers: &[OptionId],
    ) -> Result<&mut Self, ConfigError> {
        self.register(Constraint {
            kind: ConstraintKind::RequireIfAllPresent,
            owner: Some(target),
            partners: triggers.to_vec(),
            scope: None,
        })
    }

    pub fn require_if_any_present(
        &mut self,
        target: OptionId,
        triggers: &[OptionId],
    ) -> Result<&mut Self, ConfigError> {
        self.register(Constraint {
            kind: ConstraintKind::RequireIfAnyPresent,
            owner: Some(target),
            partners: triggers.to_vec(),
            scope: None,
        })
    }

    pub fn require_if_value<T, F>(
        &mut self,
        target: OptionId,
        source: OptionId,
        predicate: F,
    ) -> Result<&mut Self, ConfigError>
    where
        T: FromValue,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.register(Constraint {
            kind: ConstraintKind::RequireIfValue(erase_predicate(predicate)),
            owner: Some(target),
            partners: vec![source],
            scope: None,
        })
    }
}

fn tuple_constraint(kind: ConstraintKind, options: &[OptionId]) -> Constraint {
    Constraint {
        kind,
        owner: None,
        partners: options.to_vec(),
        scope: None,
    }
}

fn erase_predicate<T, F>(predicate: F) -> super::constraint::ValuePredicate
where
    T: FromValue,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    std::sync::Arc::new(move |value: &Value| {
        T::from_value(value).is_some_and(|typed| predicate(&typed))
    })
}
