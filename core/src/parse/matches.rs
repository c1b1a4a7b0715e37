//! Result assembler: the immutable outcome of one parse call.

use crate::schema::{DomainId, OptionId};
use crate::value::{Binding, ValueSource};

/// Bound results of a successful parse. Values are written exactly once
/// while parsing and are immutable afterwards; typed reads go through
/// [`Arg::get`](crate::Arg::get).
#[derive(Debug, Clone)]
pub struct Matches {
    bindings: Vec<Binding>,
    selected: Option<(DomainId, String)>,
}

impl Matches {
    pub(crate) fn new(bindings: Vec<Binding>, selected: Option<(DomainId, String)>) -> Self {
        Self { bindings, selected }
    }

    /// The selected domain, if any.
    pub fn domain(&self) -> Option<DomainId> {
        self.selected.as_ref().map(|(id, _)| *id)
    }

    /// The selected domain's id string, if any.
    pub fn domain_name(&self) -> Option<&str> {
        self.selected.as_ref().map(|(_, name)| name.as_str())
    }

    /// Provenance of an option's bound value.
    pub fn source_of(&self, id: OptionId) -> ValueSource {
        self.binding(id).source
    }

    /// Presence as seen by the constraint evaluator: occurrences or a
    /// user/environment-sourced value.
    pub fn is_present(&self, id: OptionId) -> bool {
        self.binding(id).is_present()
    }

    /// Number of command-line occurrences, including bare no-value flags.
    pub fn occurrences(&self, id: OptionId) -> usize {
        self.binding(id).occurrences
    }

    pub(crate) fn binding(&self, id: OptionId) -> &Binding {
        &self.bindings[id.0]
    }
}
