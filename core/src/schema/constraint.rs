//! Constraint edges between options.
//!
//! A constraint relates an optional "owner" option to a tuple of partners
//! and is scoped either globally or to one domain/fragment. Fragment-scoped
//! constraints become effective on every domain inheriting the fragment.

use std::fmt;
use std::sync::Arc;

use crate::error::ConstraintKindTag;
use crate::value::Value;

use super::{DomainId, OptionId};

pub(crate) type ValuePredicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Relational/conditional constraint kinds.
#[derive(Clone)]
pub(crate) enum ConstraintKind {
    ExactlyOne,
    AtMostOne,
    AtLeastOne,
    Conflicts,
    RequireIfAllPresent,
    RequireIfAnyPresent,
    RequireIfValue(ValuePredicate),
}

impl ConstraintKind {
    pub(crate) fn tag(&self) -> ConstraintKindTag {
        match self {
            ConstraintKind::ExactlyOne => ConstraintKindTag::ExactlyOne,
            ConstraintKind::AtMostOne => ConstraintKindTag::AtMostOne,
            ConstraintKind::AtLeastOne => ConstraintKindTag::AtLeastOne,
            ConstraintKind::Conflicts => ConstraintKindTag::Conflicts,
            ConstraintKind::RequireIfAllPresent => ConstraintKindTag::RequireIfAllPresent,
            ConstraintKind::RequireIfAnyPresent => ConstraintKindTag::RequireIfAnyPresent,
            ConstraintKind::RequireIfValue(_) => ConstraintKindTag::RequireIfValue,
        }
    }
}

impl fmt::Debug for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.tag())
    }
}

/// One declared constraint edge.
#[derive(Debug, Clone)]
pub(crate) struct Constraint {
    pub kind: ConstraintKind,
    /// Target/owner option; `None` for tuple-only domain constraints.
    pub owner: Option<OptionId>,
    pub partners: Vec<OptionId>,
    /// `None` for global constraints.
    pub scope: Option<DomainId>,
}

impl Constraint {
    /// Owner first, then partners, in declaration order.
    pub(crate) fn participants(&self) -> Vec<OptionId> {
        self.owner
            .into_iter()
            .chain(self.partners.iter().copied())
            .collect()
    }
}
