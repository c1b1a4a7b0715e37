//! Serializable schema description for external help/documentation
//! renderers.
//!
//! The engine ships no help formatter; instead a [`SchemaSnapshot`]
//! captures everything a renderer needs, as plain serde data. Hidden
//! options and constraint fragments are omitted.

use serde::Serialize;

use crate::schema::{CollectionKind, Schema};
use crate::value::BoundData;

/// A point-in-time description of a declared schema.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaSnapshot {
    pub options: Vec<OptionSnapshot>,
    pub positionals: Vec<PositionalSnapshot>,
    pub domains: Vec<DomainSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionSnapshot {
    pub name: String,
    pub switches: Vec<String>,
    /// Human description of the accepted literal, e.g. `"integer"`.
    pub expects: String,
    pub collection: CollectionKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_var: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    pub negatable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arity: Option<usize>,
    /// Domains the option is scoped to; empty means available everywhere.
    pub domains: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionalSnapshot {
    pub name: String,
    pub expects: String,
    pub required: bool,
    /// Whether the positional absorbs all remaining tokens.
    pub variadic: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    pub domains: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DomainSnapshot {
    pub id: String,
    pub aliases: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl SchemaSnapshot {
    pub(crate) fn of(schema: &Schema) -> Self {
        let domain_name = |id: &crate::schema::DomainId| schema.domain_spec(*id).id.clone();

        let mut options = Vec::new();
        let mut positionals = Vec::new();
        for spec in schema.specs.iter().filter(|s| !s.hidden) {
            let scoped: Vec<String> = spec.domains.iter().map(domain_name).collect();
            if spec.positional {
                positionals.push(PositionalSnapshot {
                    name: spec.name.clone(),
                    expects: spec.coercer.expected(),
                    required: spec.required,
                    variadic: spec.is_collection(),
                    help: spec.help.clone(),
                    domains: scoped,
                });
            } else {
                options.push(OptionSnapshot {
                    name: spec.name.clone(),
                    switches: spec.switches.clone(),
                    expects: spec.coercer.expected(),
                    collection: spec.collection,
                    required: spec.required,
                    default: spec.default.as_ref().and_then(render_default),
                    env_var: spec.env_var.clone(),
                    help: spec.help.clone(),
                    negatable: spec.negatable,
                    arity: spec.arity,
                    domains: scoped,
                });
            }
        }

        let domains = schema
            .domains
            .iter()
            .filter(|d| !d.fragment)
            .map(|d| DomainSnapshot {
                id: d.id.clone(),
                aliases: d.aliases.clone(),
                label: d.label.clone(),
                help: d.help.clone(),
            })
            .collect();

        Self {
            options,
            positionals,
            domains,
        }
    }
}

fn render_default(data: &BoundData) -> Option<String> {
    match data {
        BoundData::Absent => None,
        BoundData::One(value) => Some(value.to_string()),
        BoundData::Many(values) => Some(format!(
            "[{}]",
            values
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )),
    }
}
