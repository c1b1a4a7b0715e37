//! Parse driver: tokenization and option matching.
//!
//! One parse call walks the raw token array left to right through the
//! phases `DomainSelection → Tokenizing → Accumulating → ConstraintChecking
//! → Assembled`, stopping at the first error. The tokenizer classifies each
//! token as a domain selector, a long/short/negated/clustered switch with
//! its consumed value tokens, the `--` terminator, or a positional, and
//! coerces value literals immediately — a malformed literal is reported
//! before any constraint is evaluated.

mod accumulate;
mod constraint;
mod matches;

pub use matches::Matches;

use tracing::{debug, trace};

use crate::error::ParseError;
use crate::schema::{DomainId, OptionId, OptionSpec, Schema};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Init,
    DomainSelection,
    Tokenizing,
    Accumulating,
    ConstraintChecking,
    Assembled,
}

/// Runs one parse call start to finish.
pub(crate) fn run<S: AsRef<str>>(schema: &Schema, args: &[S]) -> Result<Matches, ParseError> {
    let tokens: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();
    let mut run = ParseRun::new(schema, tokens);
    match run.execute() {
        Ok(matches) => Ok(matches),
        Err(error) => {
            debug!(phase = ?run.phase, %error, "parse failed");
            Err(error)
        }
    }
}

struct ParseRun<'s> {
    schema: &'s Schema,
    tokens: Vec<String>,
    cursor: usize,
    phase: Phase,
    selected: Option<DomainId>,
    /// Per option: one entry per occurrence, each holding that
    /// occurrence's coerced values (empty for bare no-value occurrences).
    occurrences: Vec<Vec<Vec<Value>>>,
    positional_queue: Vec<String>,
    terminated: bool,
}

impl<'s> ParseRun<'s> {
    fn new(schema: &'s Schema, tokens: Vec<String>) -> Self {
        Self {
            schema,
            occurrences: vec![Vec::new(); schema.specs.len()],
            tokens,
            cursor: 0,
            phase: Phase::Init,
            selected: None,
            positional_queue: Vec::new(),
            terminated: false,
        }
    }

    fn execute(&mut self) -> Result<Matches, ParseError> {
        self.phase = Phase::DomainSelection;
        self.select_domain()?;

        self.phase = Phase::Tokenizing;
        self.tokenize()?;
        self.distribute_positionals()?;

        self.phase = Phase::Accumulating;
        let occurrences = std::mem::take(&mut self.occurrences);
        let bindings = accumulate::accumulate(self.schema, occurrences, self.selected)?;

        self.phase = Phase::ConstraintChecking;
        constraint::check(self.schema, &bindings, self.selected)?;

        self.phase = Phase::Assembled;
        let selected = self
            .selected
            .map(|id| (id, self.schema.domain_spec(id).id.clone()));
        Ok(Matches::new(bindings, selected))
    }

    /// The selection window covers only the first token: a matching
    /// selector narrows the effective option/constraint set, anything else
    /// closes the window unselected.
    fn select_domain(&mut self) -> Result<(), ParseError> {
        if !self.schema.has_selectable_domains() {
            return Ok(());
        }
        if let Some(first) = self.tokens.first() {
            if let Some(id) = self.schema.find_domain_selector(first) {
                trace!(domain = %self.schema.domain_spec(id).id, "domain selected");
                self.selected = Some(id);
                self.cursor = 1;
                return Ok(());
            }
        }
        if self.schema.config.require_domain {
            return Err(ParseError::DomainRequired);
        }
        Ok(())
    }

    fn tokenize(&mut self) -> Result<(), ParseError> {
        while self.cursor < self.tokens.len() {
            let token = self.tokens[self.cursor].clone();
            if self.terminated {
                self.positional_queue.push(token);
                self.cursor += 1;
                continue;
            }
            if token == self.schema.config.long_prefix {
                trace!(position = self.cursor, "terminator, remaining tokens are positional");
                self.terminated = true;
                self.cursor += 1;
                continue;
            }
            if self.is_long_shaped(&token) {
                let (switch, attached) = self.split_attached(&token);
                let (id, negated) = self.resolve_long(&switch)?;
                self.consume(id, attached, negated)?;
                continue;
            }
            if self.is_short_shaped(&token) {
                if let Some(id) = self.lookup_active(&token) {
                    self.consume(id, None, false)?;
                    continue;
                }
                if token.chars().count() > self.schema.config.short_prefix.chars().count() + 1 {
                    self.cluster(&token)?;
                    continue;
                }
                return Err(ParseError::UnknownSwitch {
                    switch: token,
                    position: self.cursor,
                });
            }
            self.positional_queue.push(token);
            self.cursor += 1;
        }
        Ok(())
    }

    fn is_long_shaped(&self, token: &str) -> bool {
        let prefix = &self.schema.config.long_prefix;
        token.starts_with(prefix) && token.len() > prefix.len()
    }

    fn is_short_shaped(&self, token: &str) -> bool {
        let prefix = &self.schema.config.short_prefix;
        token.starts_with(prefix) && token.len() > prefix.len()
    }

    /// Splits `--switch=value` at the first configured separator; the
    /// attached value is exactly one value token regardless of sniffing.
    fn split_attached(&self, token: &str) -> (String, Option<String>) {
        let prefix_len = self.schema.config.long_prefix.len();
        let body = &token[prefix_len..];
        let split = body
            .char_indices()
            .find(|(_, c)| self.schema.config.value_separators.contains(c));
        match split {
            Some((at, separator)) => {
                let switch = format!("{}{}", &token[..prefix_len], &body[..at]);
                let value = body[at + separator.len_utf8()..].to_string();
                (switch, Some(value))
            }
            None => (token.to_string(), None),
        }
    }

    /// Resolves a long switch to its option, recognizing negated
    /// spellings. A negated spelling of a known non-negatable option is a
    /// dedicated error rather than a generic unknown switch.
    fn resolve_long(&self, switch: &str) -> Result<(OptionId, bool), ParseError> {
        if let Some(id) = self.lookup_active(switch) {
            return Ok((id, false));
        }
        if let Some(&id) = self.schema.negated_index.get(switch) {
            if self.schema.option_active(id, self.selected) {
                return Ok((id, true));
            }
        }
        let config = &self.schema.config;
        if let Some(body) = switch.strip_prefix(&config.long_prefix) {
            if let Some(positive_body) = body.strip_prefix(&config.negation_prefix) {
                let positive = format!("{}{}", config.long_prefix, positive_body);
                if self.schema.switch_index.contains_key(&positive) {
                    return Err(ParseError::NotNegatable { option: positive });
                }
            }
        }
        Err(ParseError::UnknownSwitch {
            switch: switch.to_string(),
            position: self.cursor,
        })
    }

    /// Exact switch lookup filtered by the active domain: options scoped
    /// out of the selected domain are unknown here.
    fn lookup_active(&self, switch: &str) -> Option<OptionId> {
        self.schema
            .switch_index
            .get(switch)
            .copied()
            .filter(|id| self.schema.option_active(*id, self.selected))
    }

    /// Whether a token would be recognized as a switch: used by value
    /// sniffing and arity slot checks, which must not swallow switches.
    fn is_recognized_switch(&self, token: &str) -> bool {
        if self.schema.switch_index.contains_key(token)
            || self.schema.negated_index.contains_key(token)
        {
            return true;
        }
        if self.is_long_shaped(token) {
            let (switch, _) = self.split_attached(token);
            return self.schema.switch_index.contains_key(&switch)
                || self.schema.negated_index.contains_key(&switch);
        }
        if self.is_short_shaped(token) {
            // A cluster counts when its first character is a known switch.
            let prefix_len = self.schema.config.short_prefix.len();
            if let Some(first) = token[prefix_len..].chars().next() {
                let head = format!("{}{}", &self.schema.config.short_prefix, first);
                return self.schema.switch_index.contains_key(&head);
            }
        }
        false
    }

    /// Consumes one occurrence of a matched option: the switch token
    /// itself plus however many value tokens its arity and type call for.
    /// `self.cursor` must point at the switch token.
    fn consume(
        &mut self,
        id: OptionId,
        attached: Option<String>,
        negated: bool,
    ) -> Result<(), ParseError> {
        let schema = self.schema;
        let spec = schema.spec(id);
        let position = self.cursor;
        self.cursor += 1;

        let mut group: Vec<Value> = Vec::new();
        if let Some(literal) = attached {
            group.push(self.coerce(spec, &literal)?);
            if let Some(arity) = spec.arity {
                // An attached value never pulls further tokens.
                return Err(ParseError::MissingValue {
                    option: spec.display_name().to_string(),
                    index: 2,
                    arity,
                    position,
                });
            }
        } else if let Some(arity) = spec.arity {
            for index in 1..=arity {
                let candidate = self.tokens.get(self.cursor).cloned();
                match candidate {
                    Some(token)
                        if !self.is_recognized_switch(&token)
                            && token != schema.config.long_prefix =>
                    {
                        group.push(self.coerce(spec, &token)?);
                        self.cursor += 1;
                    }
                    _ => {
                        return Err(ParseError::MissingValue {
                            option: spec.display_name().to_string(),
                            index,
                            arity,
                            position,
                        });
                    }
                }
            }
        } else if spec.requires_value {
            let candidate = self.tokens.get(self.cursor).cloned();
            match candidate {
                Some(token)
                    if !self.is_recognized_switch(&token)
                        && token != schema.config.long_prefix =>
                {
                    group.push(self.coerce(spec, &token)?);
                    self.cursor += 1;
                }
                _ => {
                    return Err(ParseError::MissingValue {
                        option: spec.display_name().to_string(),
                        index: 1,
                        arity: 1,
                        position,
                    });
                }
            }
        } else {
            // Optional value: consume the next token only when it is not a
            // recognized switch, not the terminator, and coerces cleanly.
            let candidate = self.tokens.get(self.cursor).cloned();
            let mut consumed = false;
            if let Some(token) = candidate {
                if !self.is_recognized_switch(&token)
                    && token != schema.config.long_prefix
                    && spec.coercer.accepts(&token)
                {
                    group.push(self.coerce(spec, &token)?);
                    self.cursor += 1;
                    consumed = true;
                }
            }
            if !consumed && spec.coercer.is_bool() {
                group.push(Value::Bool(true));
            }
            // Non-boolean bare occurrences record presence with no value.
        }

        if negated {
            for value in &mut group {
                if let Value::Bool(b) = value {
                    *b = !*b;
                }
            }
        }

        trace!(
            option = spec.display_name(),
            values = group.len(),
            position,
            "matched option occurrence"
        );
        self.occurrences[id.0].push(group);
        Ok(())
    }

    /// Short-option clustering: each character matching a flag-like switch
    /// emits an occurrence; the first value-consuming character takes the
    /// token remainder as its attached value (or, when the remainder is
    /// empty, consumes following tokens) and stops the walk.
    fn cluster(&mut self, token: &str) -> Result<(), ParseError> {
        let schema = self.schema;
        let position = self.cursor;
        let prefix_len = schema.config.short_prefix.len();
        let body: Vec<char> = token[prefix_len..].chars().collect();

        for (index, c) in body.iter().enumerate() {
            let switch = format!("{}{}", schema.config.short_prefix, c);
            let Some(id) = self.lookup_active(&switch) else {
                return Err(ParseError::UnknownSwitch {
                    switch,
                    position,
                });
            };
            let spec = schema.spec(id);
            if spec.flag_like() {
                let group = if spec.coercer.is_bool() {
                    vec![Value::Bool(true)]
                } else {
                    Vec::new()
                };
                self.occurrences[id.0].push(group);
                continue;
            }
            // Value-consuming switch: the remainder is its value.
            let remainder: String = body[index + 1..].iter().collect();
            if remainder.is_empty() {
                return self.consume(id, None, false);
            }
            return self.consume(id, Some(remainder), false);
        }

        self.cursor += 1;
        Ok(())
    }

    /// Distributes queued positional tokens across declared positionals in
    /// declaration order; the one trailing list absorbs the remainder.
    fn distribute_positionals(&mut self) -> Result<(), ParseError> {
        let schema = self.schema;
        let queue = std::mem::take(&mut self.positional_queue);
        let mut next = 0;

        let positional_ids: Vec<OptionId> = schema
            .specs
            .iter()
            .enumerate()
            .filter(|(index, spec)| {
                spec.positional && schema.option_active(OptionId(*index), self.selected)
            })
            .map(|(index, _)| OptionId(index))
            .collect();

        for id in positional_ids {
            let spec = schema.spec(id);
            if spec.is_collection() {
                while next < queue.len() {
                    let value = self.coerce(spec, &queue[next])?;
                    self.occurrences[id.0].push(vec![value]);
                    next += 1;
                }
            } else if next < queue.len() {
                let value = self.coerce(spec, &queue[next])?;
                self.occurrences[id.0].push(vec![value]);
                next += 1;
            }
        }

        if next < queue.len() {
            return Err(ParseError::UnexpectedPositionals {
                values: queue[next..].to_vec(),
            });
        }
        Ok(())
    }

    fn coerce(&self, spec: &OptionSpec, literal: &str) -> Result<Value, ParseError> {
        spec.coercer
            .coerce(literal)
            .map_err(|failure| ParseError::InvalidValue {
                option: spec.display_name().to_string(),
                literal: failure.literal,
                expected: failure.expected,
            })
    }
}
