//! Single-pass message translation seam.
//!
//! Error messages cross the i18n boundary exactly once. A [`Message`] starts
//! raw (a stable key plus parameters and an English fallback) and becomes
//! rendered after one [`Message::render`] call; rendering an already-rendered
//! message is a no-op, even when parameter text coincides with translation
//! keys. The raw/rendered distinction is carried on the message itself, so
//! no process-wide translation memory exists.

use crate::error::{ConstraintKindTag, ParseError};

/// Message-translation collaborator.
///
/// Returning `None` means "no translation available"; the message's English
/// fallback is used verbatim.
pub trait Translate {
    fn translate(&self, key: &str, params: &[(&'static str, String)]) -> Option<String>;
}

/// Default translator: everything falls through to the English fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTranslation;

impl Translate for NoTranslation {
    fn translate(&self, _key: &str, _params: &[(&'static str, String)]) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
enum MessageState {
    Raw,
    Rendered(String),
}

/// A renderable message with a one-shot translation pass.
///
/// # Examples
///
/// ```
/// use declargs_core::{Message, NoTranslation, ParseError};
///
/// let err = ParseError::MissingRequired { option: "--port".into() };
/// let msg = Message::for_error(&err).render(&NoTranslation);
/// assert_eq!(msg.text(), "option --port is required");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    key: &'static str,
    params: Vec<(&'static str, String)>,
    fallback: String,
    state: MessageState,
}

impl Message {
    pub fn new(key: &'static str, params: Vec<(&'static str, String)>, fallback: String) -> Self {
        Self {
            key,
            params,
            fallback,
            state: MessageState::Raw,
        }
    }

    /// Builds the raw message for a parse error: stable key, named
    /// parameters, and the error's `Display` text as the English fallback.
    pub fn for_error(error: &ParseError) -> Self {
        let (key, params) = error_key_and_params(error);
        Self::new(key, params, error.to_string())
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn params(&self) -> &[(&'static str, String)] {
        &self.params
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self.state, MessageState::Rendered(_))
    }

    /// Translates the message, exactly once. A second call returns the
    /// message unchanged regardless of the translator.
    pub fn render(mut self, translator: &dyn Translate) -> Self {
        if let MessageState::Raw = self.state {
            let text = translator
                .translate(self.key, &self.params)
                .unwrap_or_else(|| self.fallback.clone());
            self.state = MessageState::Rendered(text);
        }
        self
    }

    /// The displayable text: rendered text if available, fallback otherwise.
    pub fn text(&self) -> &str {
        match &self.state {
            MessageState::Rendered(text) => text,
            MessageState::Raw => &self.fallback,
        }
    }
}

fn error_key_and_params(error: &ParseError) -> (&'static str, Vec<(&'static str, String)>) {
    match error {
        ParseError::UnknownSwitch { switch, position } => (
            "error.unknown_switch",
            vec![("switch", switch.clone()), ("position", position.to_string())],
        ),
        ParseError::DomainRequired => ("error.domain_required", Vec::new()),
        ParseError::MissingValue {
            option,
            index,
            arity,
            position,
        } => (
            "error.missing_value",
            vec![
                ("option", option.clone()),
                ("index", index.to_string()),
                ("arity", arity.to_string()),
                ("position", position.to_string()),
            ],
        ),
        ParseError::InvalidValue {
            option,
            literal,
            expected,
        } => (
            "error.invalid_value",
            vec![
                ("option", option.clone()),
                ("literal", literal.clone()),
                ("expected", expected.clone()),
            ],
        ),
        ParseError::NotNegatable { option } => {
            ("error.not_negatable", vec![("option", option.clone())])
        }
        ParseError::UnexpectedPositionals { values } => (
            if values.len() == 1 {
                "error.unexpected_positional"
            } else {
                "error.unexpected_positionals"
            },
            vec![("values", values.join(", "))],
        ),
        ParseError::MissingRequired { option } => {
            ("error.missing_required", vec![("option", option.clone())])
        }
        ParseError::ValidatorFailed {
            option,
            literal,
            message,
        } => (
            "error.validator_failed",
            vec![
                ("option", option.clone()),
                ("literal", literal.clone()),
                ("message", message.clone()),
            ],
        ),
        ParseError::CollectionValidatorFailed { option, message } => (
            "error.collection_validator_failed",
            vec![("option", option.clone()), ("message", message.clone())],
        ),
        ParseError::TooFewOccurrences {
            option,
            needed,
            got,
        } => (
            "error.too_few_occurrences",
            vec![
                ("option", option.clone()),
                ("needed", needed.to_string()),
                ("got", got.to_string()),
            ],
        ),
        ParseError::Constraint { kind, options } => (
            constraint_key(*kind),
            vec![("options", options.join(", "))],
        ),
        ParseError::PromptExhausted { option, attempts } => (
            "error.prompt_exhausted",
            vec![("option", option.clone()), ("attempts", attempts.to_string())],
        ),
        ParseError::Violations { errors } => (
            "error.violations",
            vec![("count", errors.len().to_string())],
        ),
    }
}

fn constraint_key(kind: ConstraintKindTag) -> &'static str {
    match kind {
        ConstraintKindTag::ExactlyOne => "error.constraint.exactly_one",
        ConstraintKindTag::AtMostOne => "error.constraint.at_most_one",
        ConstraintKindTag::AtLeastOne => "error.constraint.at_least_one",
        ConstraintKindTag::Conflicts => "error.constraint.conflicts",
        ConstraintKindTag::RequireIfAllPresent => "error.constraint.require_if_all_present",
        ConstraintKindTag::RequireIfAnyPresent => "error.constraint.require_if_any_present",
        ConstraintKindTag::RequireIfValue => "error.constraint.require_if_value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Wraps everything it sees so a second pass would be visible.
    struct Bracketing;

    impl Translate for Bracketing {
        fn translate(&self, key: &str, _params: &[(&'static str, String)]) -> Option<String> {
            Some(format!("[{key}]"))
        }
    }

    #[test]
    fn test_render_translates_exactly_once() {
        let err = ParseError::MissingRequired {
            option: "--port".into(),
        };
        let once = Message::for_error(&err).render(&Bracketing);
        assert_eq!(once.text(), "[error.missing_required]");

        // A second render pass must not re-translate, even though the
        // rendered text itself looks like a translation key.
        let twice = once.clone().render(&Bracketing);
        assert_eq!(twice.text(), "[error.missing_required]");
        assert!(twice.is_rendered());
    }

    #[test]
    fn test_no_translation_falls_back_to_display_text() {
        let err = ParseError::UnknownSwitch {
            switch: "--bogus".into(),
            position: 0,
        };
        let msg = Message::for_error(&err).render(&NoTranslation);
        assert_eq!(msg.text(), err.to_string());
    }

    #[test]
    fn test_params_carry_offending_switch() {
        let err = ParseError::UnknownSwitch {
            switch: "--bogus".into(),
            position: 2,
        };
        let msg = Message::for_error(&err);
        assert_eq!(msg.key(), "error.unknown_switch");
        assert!(msg
            .params()
            .iter()
            .any(|(name, value)| *name == "switch" && value == "--bogus"));
    }
}
