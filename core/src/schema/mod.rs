//! Schema registry: the in-memory model built while options, positionals,
//! domains, and constraints are declared.
//!
//! Declaration happens before any parse call and validates structural
//! legality eagerly; every illegal combination is a [`ConfigError`] raised
//! from the registering call, never deferred to parse time. The registry is
//! immutable once declaration ends — [`Schema::parse`] takes `&self` and
//! binds values into a fresh [`Matches`](crate::Matches), so one schema can
//! serve any number of parse calls.
//!
//! # Example
//!
//! ```
//! use declargs_core::Schema;
//!
//! let mut schema = Schema::new();
//! let port = schema.option(&["-p", "--port"]).int().required().finish()?;
//! let verbose = schema.option(&["-v", "--verbose"]).bool().list().finish()?;
//!
//! let matches = schema.parse(&["--port", "8080", "-vv"]).unwrap();
//! assert_eq!(port.get(&matches), 8080);
//! assert_eq!(verbose.get(&matches).len(), 2);
//! # Ok::<(), declargs_core::ConfigError>(())
//! ```

mod builder;
mod constraint;
mod domain;

pub use builder::{
    GroupListOption, GroupSetOption, ListOption, OptionBuilder, PositionalBuilder,
    RequiredOption, SetOption, TypedOption,
};
pub use domain::{ConstraintScope, DomainBuilder};

pub(crate) use constraint::{Constraint, ConstraintKind, ValuePredicate};
pub(crate) use domain::DomainSpec;

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;

use crate::coerce::Coercer;
use crate::error::{ConfigError, ParseError};
use crate::host::{EnvLookup, Prompt, StdEnv};
use crate::message::{Message, NoTranslation, Translate};
use crate::parse::Matches;
use crate::value::{BoundData, FromBinding, Value};

/// Opaque handle to a declared option or positional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OptionId(pub(crate) usize);

/// Opaque handle to a declared domain or fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DomainId(pub(crate) usize);

/// How an option accumulates values across occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollectionKind {
    /// Last occurrence wins.
    Scalar,
    /// One entry per occurrence, insertion order, duplicates kept. A
    /// boolean list doubles as an occurrence counter (`-vvv`).
    List,
    /// Duplicates collapse; key-value entries deduplicate by key with the
    /// later value winning.
    Set,
    /// One fixed-size group of `arity` values per occurrence.
    GroupList,
    /// Deduplicated groups.
    GroupSet,
}

/// Constraint evaluation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConstraintMode {
    /// Stop at the first violated constraint.
    #[default]
    FailFast,
    /// Evaluate every constraint and report all violations at once.
    CollectAll,
}

/// Parser configuration knobs.
#[derive(Debug, Clone)]
pub struct SchemaConfig {
    /// Prefix of long switches.
    pub long_prefix: String,
    /// Prefix of short switches (one character after the prefix).
    pub short_prefix: String,
    /// Characters splitting an attached value off a long switch.
    pub value_separators: Vec<char>,
    /// Default negation prefix for negatable booleans.
    pub negation_prefix: String,
    /// Whether a parse without a domain selector fails when domains exist.
    pub require_domain: bool,
    pub constraint_mode: ConstraintMode,
    /// Retry budget for interactive prompting of missing required options.
    pub max_prompt_retries: usize,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            long_prefix: "--".to_string(),
            short_prefix: "-".to_string(),
            value_separators: vec!['='],
            negation_prefix: "no-".to_string(),
            require_domain: false,
            constraint_mode: ConstraintMode::FailFast,
            max_prompt_retries: 3,
        }
    }
}

pub(crate) type ValueCheck = Arc<dyn Fn(&Value) -> bool + Send + Sync>;
pub(crate) type CollectionCheck = Arc<dyn Fn(&[Value]) -> bool + Send + Sync>;
pub(crate) type ValueCallback = Arc<dyn Fn(&Value) + Send + Sync>;

pub(crate) struct Validator {
    pub message: String,
    pub check: ValueCheck,
}

pub(crate) struct CollectionValidator {
    pub message: String,
    pub check: CollectionCheck,
}

/// One declared option or positional. Immutable after registration.
pub(crate) struct OptionSpec {
    pub name: String,
    pub switches: Vec<String>,
    pub positional: bool,
    pub coercer: Coercer,
    pub collection: CollectionKind,
    pub arity: Option<usize>,
    pub required: bool,
    pub default: Option<BoundData>,
    pub env_var: Option<String>,
    pub negatable: bool,
    pub negation_prefix: Option<String>,
    pub requires_value: bool,
    pub validators: Vec<Validator>,
    pub collection_validators: Vec<CollectionValidator>,
    pub on_value: Option<ValueCallback>,
    pub domains: Vec<DomainId>,
    pub help: Option<String>,
    pub hidden: bool,
    pub prompt: Option<String>,
    pub at_least: Option<usize>,
}

impl OptionSpec {
    /// The switch shown in error messages; positionals use their name.
    pub(crate) fn display_name(&self) -> &str {
        self.switches.first().map(String::as_str).unwrap_or(&self.name)
    }

    /// A flag-like option never consumes a value token unconditionally:
    /// in a short cluster it is a pure flag.
    pub(crate) fn flag_like(&self) -> bool {
        !self.requires_value && self.arity.is_none()
    }

    pub(crate) fn is_collection(&self) -> bool {
        !matches!(self.collection, CollectionKind::Scalar)
    }
}

/// Typed handle to a declared option, returned by builder `finish()`.
///
/// `C` is the full collection type read back from a [`Matches`]:
/// `Option<T>` for optional scalars, `T` for required/defaulted scalars,
/// `Vec<T>`, `HashSet<T>`, `Vec<Vec<T>>`, or `HashSet<Vec<T>>`.
pub struct Arg<C> {
    pub(crate) id: OptionId,
    pub(crate) name: String,
    pub(crate) _marker: PhantomData<fn() -> C>,
}

impl<C> Arg<C> {
    pub fn id(&self) -> OptionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<C: FromBinding> Arg<C> {
    /// Reads the bound value.
    ///
    /// # Panics
    ///
    /// Panics when used against a [`Matches`] produced by a different
    /// schema (a programmer error, like reading a clap argument with the
    /// wrong type).
    pub fn get(&self, matches: &Matches) -> C {
        C::from_binding(matches.binding(self.id))
            .unwrap_or_else(|| panic!("option {} read through a mismatched handle", self.name))
    }
}

impl<C> Clone for Arg<C> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            _marker: PhantomData,
        }
    }
}

impl<C> fmt::Debug for Arg<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arg")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// The declared schema: options, positionals, domains, and constraints.
pub struct Schema {
    pub(crate) config: SchemaConfig,
    pub(crate) specs: Vec<OptionSpec>,
    pub(crate) domains: Vec<DomainSpec>,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) switch_index: HashMap<String, OptionId>,
    pub(crate) negated_index: HashMap<String, OptionId>,
    pub(crate) env: Arc<dyn EnvLookup + Send + Sync>,
    pub(crate) translator: Arc<dyn Translate + Send + Sync>,
    pub(crate) prompter: Option<Arc<dyn Prompt + Send + Sync>>,
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

impl Schema {
    pub fn new() -> Self {
        Self::with_config(SchemaConfig::default())
    }

    pub fn with_config(config: SchemaConfig) -> Self {
        Self {
            config,
            specs: Vec::new(),
            domains: Vec::new(),
            constraints: Vec::new(),
            switch_index: HashMap::new(),
            negated_index: HashMap::new(),
            env: Arc::new(StdEnv),
            translator: Arc::new(NoTranslation),
            prompter: None,
        }
    }

    /// Replaces the environment-lookup collaborator (tests, embedders).
    pub fn set_env(&mut self, env: impl EnvLookup + Send + Sync + 'static) {
        self.env = Arc::new(env);
    }

    /// Replaces the message translator used by [`Schema::render_error`].
    pub fn set_translator(&mut self, translator: impl Translate + Send + Sync + 'static) {
        self.translator = Arc::new(translator);
    }

    /// Installs an interactive prompter for missing required options that
    /// declared a prompt.
    pub fn set_prompter(&mut self, prompter: impl Prompt + Send + Sync + 'static) {
        self.prompter = Some(Arc::new(prompter));
    }

    /// Starts declaring an option with the given switches.
    pub fn option(&mut self, switches: &[&str]) -> OptionBuilder<'_> {
        OptionBuilder::new(self, switches)
    }

    /// Starts declaring a positional argument.
    pub fn positional(&mut self, name: &str) -> PositionalBuilder<'_> {
        PositionalBuilder::new(self, name)
    }

    /// Starts declaring a selectable domain (subcommand).
    pub fn domain(&mut self, id: &str) -> DomainBuilder<'_> {
        DomainBuilder::new(self, id, false)
    }

    /// Starts declaring a constraint fragment: non-selectable, reusable
    /// only through inheritance.
    pub fn fragment(&mut self, id: &str) -> DomainBuilder<'_> {
        DomainBuilder::new(self, id, true)
    }

    /// Adds constraints to an already-declared domain.
    pub fn constrain(&mut self, domain: DomainId) -> ConstraintScope<'_> {
        ConstraintScope::new(self, Some(domain))
    }

    /// Adds constraints evaluated in every domain (and with none selected).
    pub fn constrain_globally(&mut self) -> ConstraintScope<'_> {
        ConstraintScope::new(self, None)
    }

    /// Parses a raw token array, returning the bound results or the first
    /// error.
    pub fn parse<S: AsRef<str>>(&self, args: &[S]) -> Result<Matches, ParseError> {
        crate::parse::run(self, args)
    }

    /// Parses a raw token array; errors are handed to `on_error` and `None`
    /// is returned. The error is never also raised.
    pub fn parse_or_report<S, F>(&self, args: &[S], on_error: F) -> Option<Matches>
    where
        S: AsRef<str>,
        F: FnOnce(&ParseError),
    {
        match crate::parse::run(self, args) {
            Ok(matches) => Some(matches),
            Err(error) => {
                on_error(&error);
                None
            }
        }
    }

    /// Renders a parse error through the configured translator, exactly
    /// once.
    pub fn render_error(&self, error: &ParseError) -> Message {
        Message::for_error(error).render(self.translator.as_ref())
    }

    /// Serializable description of the declared schema for external help
    /// renderers. Hidden options and fragments are excluded.
    pub fn snapshot(&self) -> crate::snapshot::SchemaSnapshot {
        crate::snapshot::SchemaSnapshot::of(self)
    }

    // ---- registration ----------------------------------------------------

    pub(crate) fn register_option(&mut self, mut spec: OptionSpec) -> Result<OptionId, ConfigError> {
        if spec.positional {
            let trailing_list = self
                .specs
                .iter()
                .any(|s| s.positional && s.is_collection());
            if trailing_list {
                return Err(ConfigError::PositionalAfterList(spec.name.clone()));
            }
        } else {
            if spec.switches.is_empty() {
                return Err(ConfigError::NoSwitches);
            }
            for switch in &spec.switches {
                self.validate_switch(switch)?;
            }
            spec.name = self.canonical_name(&spec.switches);
        }

        let display = spec.display_name().to_string();
        if let Some(arity) = spec.arity {
            if arity < 2 {
                return Err(ConfigError::ArityTooSmall {
                    option: display.clone(),
                    arity,
                });
            }
            if !spec.requires_value {
                return Err(ConfigError::ArityOptionalValue {
                    option: display.clone(),
                    arity,
                });
            }
            if spec.env_var.is_some() {
                return Err(ConfigError::ArityEnvFallback { option: display.clone() });
            }
            if let Some(BoundData::Many(groups)) = &spec.default {
                for group in groups {
                    if let Value::Group(values) = group {
                        if values.len() != arity {
                            return Err(ConfigError::DefaultArityMismatch {
                                option: display.clone(),
                                expected: arity,
                                got: values.len(),
                            });
                        }
                    }
                }
            }
        }
        if spec.at_least == Some(0) {
            return Err(ConfigError::AtLeastNotPositive { option: display.clone() });
        }

        let id = OptionId(self.specs.len());

        // Index switches after all structural checks passed.
        for switch in &spec.switches {
            if self.switch_index.contains_key(switch) || self.negated_index.contains_key(switch) {
                return Err(ConfigError::DuplicateSwitch(switch.clone()));
            }
        }
        let mut negated_switches = Vec::new();
        if spec.negatable {
            let prefix = spec
                .negation_prefix
                .as_deref()
                .unwrap_or(&self.config.negation_prefix);
            if prefix.trim().is_empty() {
                return Err(ConfigError::BlankNegationPrefix { option: display });
            }
            for switch in &spec.switches {
                let Some(body) = switch.strip_prefix(&self.config.long_prefix) else {
                    continue; // short switches have no negated spelling
                };
                let negated = format!("{}{}{}", self.config.long_prefix, prefix, body);
                if self.switch_index.contains_key(&negated)
                    || self.negated_index.contains_key(&negated)
                {
                    return Err(ConfigError::DuplicateSwitch(negated));
                }
                negated_switches.push(negated);
            }
        }

        for switch in &spec.switches {
            self.switch_index.insert(switch.clone(), id);
        }
        for negated in negated_switches {
            self.negated_index.insert(negated, id);
        }
        self.specs.push(spec);
        Ok(id)
    }

    pub(crate) fn register_domain(&mut self, mut spec: DomainSpec) -> Result<DomainId, ConfigError> {
        if spec.fragment {
            if !spec.aliases.is_empty() {
                return Err(ConfigError::FragmentMetadata {
                    id: spec.id,
                    what: "aliases",
                });
            }
            if spec.label.is_some() {
                return Err(ConfigError::FragmentMetadata {
                    id: spec.id,
                    what: "a label",
                });
            }
            if spec.help.is_some() {
                return Err(ConfigError::FragmentMetadata {
                    id: spec.id,
                    what: "help text",
                });
            }
            if !spec.inherits.is_empty() {
                return Err(ConfigError::FragmentMetadata {
                    id: spec.id,
                    what: "inheritance",
                });
            }
        }

        for selector in std::iter::once(&spec.id).chain(spec.aliases.iter()) {
            let taken = self
                .domains
                .iter()
                .any(|d| d.id == *selector || d.aliases.iter().any(|a| a == selector));
            if taken {
                return Err(ConfigError::DuplicateDomain(selector.clone()));
            }
        }

        for inherited in &spec.inherits {
            if inherited.0 >= self.domains.len() {
                return Err(ConfigError::UnknownDomainRef(inherited.0));
            }
        }
        spec.inherits.dedup();

        let id = DomainId(self.domains.len());
        self.domains.push(spec);
        Ok(id)
    }

    pub(crate) fn register_constraint(&mut self, constraint: Constraint) -> Result<usize, ConfigError> {
        for option in constraint.participants() {
            if option.0 >= self.specs.len() {
                return Err(ConfigError::UnknownOptionRef(option.0));
            }
        }
        if let Some(scope) = constraint.scope {
            if scope.0 >= self.domains.len() {
                return Err(ConfigError::UnknownDomainRef(scope.0));
            }
        }
        self.constraints.push(constraint);
        Ok(self.constraints.len() - 1)
    }

    fn validate_switch(&self, switch: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidSwitch(switch.to_string());
        if switch.chars().any(char::is_whitespace)
            || switch
                .chars()
                .any(|c| self.config.value_separators.contains(&c))
        {
            return Err(invalid());
        }
        if let Some(body) = switch.strip_prefix(&self.config.long_prefix) {
            if body.is_empty() || body.starts_with(|c: char| self.config.long_prefix.starts_with(c)) {
                return Err(invalid());
            }
            return Ok(());
        }
        if let Some(body) = switch.strip_prefix(&self.config.short_prefix) {
            if body.chars().count() != 1 {
                return Err(invalid());
            }
            return Ok(());
        }
        Err(invalid())
    }

    /// Canonical name: body of the first long switch, else the first switch
    /// without its short prefix.
    fn canonical_name(&self, switches: &[String]) -> String {
        switches
            .iter()
            .find_map(|s| s.strip_prefix(&self.config.long_prefix))
            .map(str::to_string)
            .unwrap_or_else(|| {
                switches
                    .first()
                    .map(|s| {
                        s.strip_prefix(&self.config.short_prefix)
                            .unwrap_or(s)
                            .to_string()
                    })
                    .unwrap_or_default()
            })
    }

    // ---- lookups ---------------------------------------------------------

    pub(crate) fn spec(&self, id: OptionId) -> &OptionSpec {
        &self.specs[id.0]
    }

    pub(crate) fn domain_spec(&self, id: DomainId) -> &DomainSpec {
        &self.domains[id.0]
    }

    pub(crate) fn has_selectable_domains(&self) -> bool {
        self.domains.iter().any(|d| !d.fragment)
    }

    pub(crate) fn find_domain_selector(&self, token: &str) -> Option<DomainId> {
        self.domains
            .iter()
            .position(|d| d.matches(token))
            .map(DomainId)
    }

    /// The selected domain plus everything it inherits, deduplicated.
    pub(crate) fn effective_domains(&self, selected: Option<DomainId>) -> Vec<DomainId> {
        let Some(selected) = selected else {
            return Vec::new();
        };
        let mut effective = vec![selected];
        for inherited in &self.domain_spec(selected).inherits {
            if !effective.contains(inherited) {
                effective.push(*inherited);
            }
        }
        effective
    }

    /// Whether an option participates in the current parse: unscoped
    /// options always do, scoped options only when their scope intersects
    /// the selected domain's effective set.
    pub(crate) fn option_active(&self, id: OptionId, selected: Option<DomainId>) -> bool {
        let scope = &self.spec(id).domains;
        if scope.is_empty() {
            return true;
        }
        let effective = self.effective_domains(selected);
        scope.iter().any(|d| effective.contains(d))
    }

    /// Global constraints first (declaration order), then the selected
    /// domain's own and inherited constraints, deduplicated.
    pub(crate) fn effective_constraints(&self, selected: Option<DomainId>) -> Vec<usize> {
        let effective = self.effective_domains(selected);
        let mut ids: Vec<usize> = self
            .constraints
            .iter()
            .enumerate()
            .filter(|(_, c)| c.scope.is_none())
            .map(|(i, _)| i)
            .collect();
        for domain in effective {
            for (i, constraint) in self.constraints.iter().enumerate() {
                if constraint.scope == Some(domain) && !ids.contains(&i) {
                    ids.push(i);
                }
            }
        }
        ids
    }
}
