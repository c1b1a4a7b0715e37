use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::sync::{Arc, Mutex};

use declargs_core::{
    KeyValue, ParseError, Prompt, Schema, SchemaConfig, Translate, ValueSource,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Prompter fed from a fixed script; runs dry with an I/O error.
struct ScriptedPrompt {
    responses: Mutex<VecDeque<String>>,
}

impl ScriptedPrompt {
    fn new(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|r| r.to_string()).collect()),
        }
    }
}

impl Prompt for ScriptedPrompt {
    fn read_secret(&self, _prompt: &str) -> io::Result<String> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"))
    }
}

// ---------------------------------------------------------------------------
// Scalars and provenance
// ---------------------------------------------------------------------------

#[test]
fn test_scalar_binds_last_occurrence() {
    let mut schema = Schema::new();
    let port = schema.option(&["--port"]).int().finish().unwrap();

    let matches = schema.parse(&["--port", "1", "--port", "2"]).unwrap();
    assert_eq!(port.get(&matches), Some(2));
    assert_eq!(matches.occurrences(port.id()), 2);
    assert_eq!(matches.source_of(port.id()), ValueSource::User);
}

#[test]
fn test_default_binds_when_absent_and_is_not_present() {
    let mut schema = Schema::new();
    let port = schema.option(&["--port"]).int().default(8080).finish().unwrap();

    let matches = schema.parse::<&str>(&[]).unwrap();
    assert_eq!(port.get(&matches), 8080);
    assert_eq!(matches.source_of(port.id()), ValueSource::Default);
    assert!(!matches.is_present(port.id()));

    // The schema is reusable; a second parse rebinds the same default.
    let again = schema.parse::<&str>(&[]).unwrap();
    assert_eq!(port.get(&again), 8080);
}

#[test]
fn test_env_fallback_and_cli_precedence() {
    let mut schema = Schema::new();
    schema.set_env(env(&[("APP_PORT", "9000")]));
    let port = schema
        .option(&["--port"])
        .int()
        .from_env("APP_PORT")
        .finish()
        .unwrap();

    let matches = schema.parse::<&str>(&[]).unwrap();
    assert_eq!(port.get(&matches), Some(9000));
    assert_eq!(matches.source_of(port.id()), ValueSource::Environment);
    assert!(matches.is_present(port.id()));

    let cli = schema.parse(&["--port", "1"]).unwrap();
    assert_eq!(port.get(&cli), Some(1));
    assert_eq!(cli.source_of(port.id()), ValueSource::User);
}

#[test]
fn test_env_value_must_coerce() {
    let mut schema = Schema::new();
    schema.set_env(env(&[("APP_PORT", "not-a-number")]));
    schema
        .option(&["--port"])
        .int()
        .from_env("APP_PORT")
        .finish()
        .unwrap();

    let err = schema.parse::<&str>(&[]).unwrap_err();
    assert!(matches!(err, ParseError::InvalidValue { ref literal, .. } if literal == "not-a-number"));
}

#[test]
fn test_bare_occurrence_blocks_env_fallback() {
    let mut schema = Schema::new();
    schema.set_env(env(&[("APP_LIMIT", "99")]));
    let limit = schema
        .option(&["--limit"])
        .int()
        .requires_value(false)
        .from_env("APP_LIMIT")
        .finish()
        .unwrap();

    // The user spoke: presence is recorded, but the environment variable
    // must not sneak a value in behind the bare flag.
    let bare = schema.parse(&["--limit"]).unwrap();
    assert_eq!(limit.get(&bare), None);
    assert_eq!(bare.source_of(limit.id()), ValueSource::Missing);
    assert_eq!(bare.occurrences(limit.id()), 1);
    assert!(bare.is_present(limit.id()));

    // With no occurrence the fallback chain runs as usual.
    let silent = schema.parse::<&str>(&[]).unwrap();
    assert_eq!(limit.get(&silent), Some(99));
    assert_eq!(silent.source_of(limit.id()), ValueSource::Environment);
}

#[test]
fn test_bare_occurrence_of_defaulted_option_still_owes_a_value() {
    let mut schema = Schema::new();
    let limit = schema
        .option(&["--limit"])
        .int()
        .requires_value(false)
        .default(7)
        .finish()
        .unwrap();

    assert_eq!(limit.get(&schema.parse::<&str>(&[]).unwrap()), 7);
    assert_eq!(limit.get(&schema.parse(&["--limit", "5"]).unwrap()), 5);

    let err = schema.parse(&["--limit"]).unwrap_err();
    assert_eq!(
        err,
        ParseError::MissingRequired {
            option: "--limit".to_string(),
        }
    );
}

#[test]
fn test_bare_occurrence_does_not_trigger_prompting() {
    let mut schema = Schema::new();
    schema.set_prompter(ScriptedPrompt::new(&["from-prompt"]));
    let token = schema
        .option(&["--token"])
        .string()
        .requires_value(false)
        .prompt("Token: ")
        .required()
        .finish()
        .unwrap();

    // Were the prompter consulted, the scripted value would bind cleanly;
    // the error proves it never ran.
    let err = schema.parse(&["--token"]).unwrap_err();
    assert_eq!(
        err,
        ParseError::MissingRequired {
            option: "--token".to_string(),
        }
    );

    let prompted = schema.parse::<&str>(&[]).unwrap();
    assert_eq!(token.get(&prompted), "from-prompt");
}

#[test]
fn test_missing_optional_scalar_binds_none() {
    let mut schema = Schema::new();
    let out = schema.option(&["--output"]).string().finish().unwrap();

    let matches = schema.parse::<&str>(&[]).unwrap();
    assert_eq!(out.get(&matches), None);
    assert_eq!(matches.source_of(out.id()), ValueSource::Missing);
}

// ---------------------------------------------------------------------------
// Tokenizer: attached values, clustering, negation, terminator
// ---------------------------------------------------------------------------

#[test]
fn test_attached_value_after_separator() {
    let mut schema = Schema::new();
    let port = schema.option(&["--port"]).int().finish().unwrap();

    let matches = schema.parse(&["--port=8080"]).unwrap();
    assert_eq!(port.get(&matches), Some(8080));

    let err = schema.parse(&["--port=abc"]).unwrap_err();
    assert!(matches!(err, ParseError::InvalidValue { ref literal, .. } if literal == "abc"));
}

#[test]
fn test_boolean_list_counts_occurrences() {
    let mut schema = Schema::new();
    let verbose = schema.option(&["-v", "--verbose"]).bool().list().finish().unwrap();

    let clustered = schema.parse(&["-vvv"]).unwrap();
    assert_eq!(verbose.get(&clustered).len(), 3);
    assert_eq!(clustered.occurrences(verbose.id()), 3);

    let spread = schema.parse(&["-v", "--verbose"]).unwrap();
    assert_eq!(verbose.get(&spread).len(), 2);
}

#[test]
fn test_cluster_with_trailing_value_switch() {
    let mut schema = Schema::new();
    let verbose = schema.option(&["-v"]).bool().list().finish().unwrap();
    let file = schema.option(&["-f"]).string().finish().unwrap();

    let matches = schema.parse(&["-vfout.txt"]).unwrap();
    assert_eq!(verbose.get(&matches).len(), 1);
    assert_eq!(file.get(&matches), Some("out.txt".to_string()));

    // Empty remainder: the value comes from the next token instead.
    let split = schema.parse(&["-vf", "out.txt"]).unwrap();
    assert_eq!(file.get(&split), Some("out.txt".to_string()));
}

#[test]
fn test_cluster_rejects_unknown_character() {
    let mut schema = Schema::new();
    schema.option(&["-v"]).bool().list().finish().unwrap();

    let err = schema.parse(&["-vx"]).unwrap_err();
    assert_eq!(
        err,
        ParseError::UnknownSwitch {
            switch: "-x".to_string(),
            position: 0,
        }
    );
}

#[test]
fn test_negated_spelling_inverts_boolean() {
    let mut schema = Schema::new();
    let debug = schema
        .option(&["--debug"])
        .bool()
        .negatable()
        .default(true)
        .finish()
        .unwrap();

    assert!(debug.get(&schema.parse::<&str>(&[]).unwrap()));
    assert!(debug.get(&schema.parse(&["--debug"]).unwrap()));
    assert!(!debug.get(&schema.parse(&["--no-debug"]).unwrap()));

    // An explicit literal is inverted too.
    assert!(debug.get(&schema.parse(&["--no-debug", "false"]).unwrap()));
    assert!(!debug.get(&schema.parse(&["--no-debug", "true"]).unwrap()));
}

#[test]
fn test_negating_non_negatable_option_is_dedicated_error() {
    let mut schema = Schema::new();
    schema.option(&["--cache"]).bool().finish().unwrap();

    let err = schema.parse(&["--no-cache"]).unwrap_err();
    assert_eq!(
        err,
        ParseError::NotNegatable {
            option: "--cache".to_string(),
        }
    );
}

#[test]
fn test_terminator_demotes_switch_shaped_tokens() {
    let mut schema = Schema::new();
    let src = schema.positional("src").string().required().finish().unwrap();
    let files = schema.positional("files").string().list().finish().unwrap();

    let matches = schema.parse(&["--", "--weird"]).unwrap();
    assert_eq!(src.get(&matches), "--weird");
    assert!(files.get(&matches).is_empty());
}

#[test]
fn test_unknown_switch_reports_position() {
    let mut schema = Schema::new();
    schema.option(&["--port"]).int().finish().unwrap();

    let err = schema.parse(&["--port", "1", "--bogus"]).unwrap_err();
    assert_eq!(
        err,
        ParseError::UnknownSwitch {
            switch: "--bogus".to_string(),
            position: 2,
        }
    );
}

// ---------------------------------------------------------------------------
// Value consumption: required values, arity groups
// ---------------------------------------------------------------------------

#[test]
fn test_required_value_missing_at_end() {
    let mut schema = Schema::new();
    schema.option(&["--port"]).int().finish().unwrap();

    let err = schema.parse(&["--port"]).unwrap_err();
    assert_eq!(
        err,
        ParseError::MissingValue {
            option: "--port".to_string(),
            index: 1,
            arity: 1,
            position: 0,
        }
    );
}

#[test]
fn test_required_value_never_swallows_a_switch() {
    let mut schema = Schema::new();
    schema.option(&["--port"]).int().finish().unwrap();
    schema.option(&["--verbose"]).bool().finish().unwrap();

    let err = schema.parse(&["--port", "--verbose"]).unwrap_err();
    assert!(matches!(err, ParseError::MissingValue { ref option, .. } if option == "--port"));
}

#[test]
fn test_negative_number_is_a_value_not_a_switch() {
    let mut schema = Schema::new();
    let offset = schema.option(&["--offset"]).int().finish().unwrap();

    let matches = schema.parse(&["--offset", "-3"]).unwrap();
    assert_eq!(offset.get(&matches), Some(-3));
}

#[test]
fn test_arity_groups_accumulate_per_occurrence() {
    let mut schema = Schema::new();
    let points = schema
        .option(&["--point"])
        .int()
        .list()
        .arity(2)
        .finish()
        .unwrap();

    let matches = schema
        .parse(&["--point", "1", "2", "--point", "3", "4"])
        .unwrap();
    assert_eq!(points.get(&matches), vec![vec![1, 2], vec![3, 4]]);
}

#[test]
fn test_arity_group_cut_short() {
    let mut schema = Schema::new();
    schema.option(&["--point"]).int().list().arity(2).finish().unwrap();

    let err = schema.parse(&["--point", "1"]).unwrap_err();
    assert_eq!(
        err,
        ParseError::MissingValue {
            option: "--point".to_string(),
            index: 2,
            arity: 2,
            position: 0,
        }
    );
}

#[test]
fn test_attached_value_cannot_start_an_arity_group() {
    let mut schema = Schema::new();
    schema.option(&["--point"]).int().list().arity(2).finish().unwrap();

    let err = schema.parse(&["--point=1", "2"]).unwrap_err();
    assert!(matches!(
        err,
        ParseError::MissingValue { index: 2, arity: 2, .. }
    ));
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

#[test]
fn test_set_deduplicates() {
    let mut schema = Schema::new();
    let tags = schema.option(&["--tag"]).string().set().finish().unwrap();

    let matches = schema
        .parse(&["--tag", "a", "--tag", "b", "--tag", "a"])
        .unwrap();
    let tags: HashSet<String> = tags.get(&matches);
    assert_eq!(tags.len(), 2);
    assert!(tags.contains("a"));
    assert!(tags.contains("b"));
}

#[test]
fn test_key_value_set_keeps_last_value_per_key() {
    let mut schema = Schema::new();
    let defines = schema.option(&["-D"]).key_value().set().finish().unwrap();

    let matches = schema
        .parse(&["-D", "host=localhost", "-D", "port=1", "-D", "host=example.com"])
        .unwrap();
    let defines: HashSet<KeyValue> = defines.get(&matches);
    assert_eq!(defines.len(), 2);
    let host = defines.iter().find(|kv| kv.key() == "host").unwrap();
    assert_eq!(host.value(), "example.com");
}

#[test]
fn test_list_default_and_env_element() {
    let mut schema = Schema::new();
    schema.set_env(env(&[("APP_TAGS", "from-env")]));
    let tags = schema
        .option(&["--tag"])
        .string()
        .list()
        .default(vec!["fallback".to_string()])
        .finish()
        .unwrap();
    let hosts = schema
        .option(&["--host"])
        .string()
        .from_env("APP_TAGS")
        .list()
        .finish()
        .unwrap();

    let matches = schema.parse::<&str>(&[]).unwrap();
    assert_eq!(tags.get(&matches), vec!["fallback".to_string()]);
    assert_eq!(matches.source_of(tags.id()), ValueSource::Default);

    // The environment variable contributes exactly one element.
    assert_eq!(hosts.get(&matches), vec!["from-env".to_string()]);
    assert_eq!(matches.source_of(hosts.id()), ValueSource::Environment);
}

#[test]
fn test_at_least_enforced_against_final_count() {
    let mut schema = Schema::new();
    schema
        .option(&["--tag"])
        .string()
        .list()
        .at_least(2)
        .finish()
        .unwrap();

    let err = schema.parse(&["--tag", "a"]).unwrap_err();
    assert_eq!(
        err,
        ParseError::TooFewOccurrences {
            option: "--tag".to_string(),
            needed: 2,
            got: 1,
        }
    );

    assert!(schema.parse(&["--tag", "a", "--tag", "b"]).is_ok());
}

// ---------------------------------------------------------------------------
// Positionals
// ---------------------------------------------------------------------------

#[test]
fn test_positionals_fill_in_declaration_order() {
    let mut schema = Schema::new();
    let src = schema.positional("src").string().required().finish().unwrap();
    let dests = schema.positional("dests").string().list().finish().unwrap();

    let matches = schema.parse(&["in.txt", "a", "b"]).unwrap();
    assert_eq!(src.get(&matches), "in.txt");
    assert_eq!(dests.get(&matches), vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn test_missing_required_positional() {
    let mut schema = Schema::new();
    schema.positional("src").string().required().finish().unwrap();

    let err = schema.parse::<&str>(&[]).unwrap_err();
    assert_eq!(
        err,
        ParseError::MissingRequired {
            option: "src".to_string(),
        }
    );
}

#[test]
fn test_excess_positionals_rejected() {
    let mut schema = Schema::new();
    schema.option(&["--port"]).int().finish().unwrap();

    let err = schema.parse(&["stray", "extra"]).unwrap_err();
    assert_eq!(
        err,
        ParseError::UnexpectedPositionals {
            values: vec!["stray".to_string(), "extra".to_string()],
        }
    );
}

// ---------------------------------------------------------------------------
// Validators and callbacks
// ---------------------------------------------------------------------------

#[test]
fn test_element_validator_rejects_before_binding() {
    let mut schema = Schema::new();
    schema
        .option(&["--port"])
        .int()
        .validate("must be positive", |port| *port > 0)
        .finish()
        .unwrap();

    let err = schema.parse(&["--port", "-1"]).unwrap_err();
    assert_eq!(
        err,
        ParseError::ValidatorFailed {
            option: "--port".to_string(),
            literal: "-1".to_string(),
            message: "must be positive".to_string(),
        }
    );
}

#[test]
fn test_collection_validator_sees_final_collection() {
    let mut schema = Schema::new();
    schema
        .option(&["--tag"])
        .string()
        .list()
        .validate_collection("at most two tags", |tags: &[String]| tags.len() <= 2)
        .finish()
        .unwrap();

    let err = schema
        .parse(&["--tag", "a", "--tag", "b", "--tag", "c"])
        .unwrap_err();
    assert_eq!(
        err,
        ParseError::CollectionValidatorFailed {
            option: "--tag".to_string(),
            message: "at most two tags".to_string(),
        }
    );
}

#[test]
fn test_on_value_fires_in_encounter_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let mut schema = Schema::new();
    schema
        .option(&["--n"])
        .int()
        .on_value(move |n| sink.lock().unwrap().push(*n))
        .list()
        .finish()
        .unwrap();

    schema.parse(&["--n", "1", "--n", "2"]).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
}

// ---------------------------------------------------------------------------
// Prompting
// ---------------------------------------------------------------------------

#[test]
fn test_prompt_supplies_missing_required_value() {
    let mut schema = Schema::new();
    schema.set_prompter(ScriptedPrompt::new(&["s3cret"]));
    let token = schema
        .option(&["--token"])
        .string()
        .prompt("API token: ")
        .required()
        .finish()
        .unwrap();

    let matches = schema.parse::<&str>(&[]).unwrap();
    assert_eq!(token.get(&matches), "s3cret");
    assert_eq!(matches.source_of(token.id()), ValueSource::User);
}

#[test]
fn test_prompt_retries_then_gives_up() {
    let mut schema = Schema::new();
    schema.set_prompter(ScriptedPrompt::new(&["abc", "def"]));
    schema
        .option(&["--port"])
        .int()
        .prompt("Port: ")
        .required()
        .finish()
        .unwrap();

    let err = schema.parse::<&str>(&[]).unwrap_err();
    assert_eq!(
        err,
        ParseError::PromptExhausted {
            option: "--port".to_string(),
            attempts: 3,
        }
    );
}

#[test]
fn test_missing_required_without_prompter() {
    let mut schema = Schema::new();
    schema.option(&["--token"]).string().required().finish().unwrap();

    let err = schema.parse::<&str>(&[]).unwrap_err();
    assert_eq!(
        err,
        ParseError::MissingRequired {
            option: "--token".to_string(),
        }
    );
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

#[test]
fn test_parse_or_report_hands_error_to_callback() {
    let mut schema = Schema::new();
    schema.option(&["--port"]).int().finish().unwrap();

    let reported = Mutex::new(None);
    let outcome = schema.parse_or_report(&["--bogus"], |err| {
        *reported.lock().unwrap() = Some(err.clone());
    });
    assert!(outcome.is_none());
    assert!(matches!(
        reported.lock().unwrap().as_ref(),
        Some(ParseError::UnknownSwitch { .. })
    ));
}

#[test]
fn test_render_error_goes_through_translator() {
    struct German;
    impl Translate for German {
        fn translate(&self, key: &str, params: &[(&'static str, String)]) -> Option<String> {
            if key == "error.missing_required" {
                let option = params.iter().find(|(k, _)| *k == "option")?;
                return Some(format!("Option {} ist erforderlich", option.1));
            }
            None
        }
    }

    let mut schema = Schema::new();
    schema.set_translator(German);
    schema.option(&["--port"]).int().required().finish().unwrap();

    let err = schema.parse::<&str>(&[]).unwrap_err();
    let message = schema.render_error(&err);
    assert_eq!(message.text(), "Option --port ist erforderlich");
}

#[test]
fn test_custom_prefixes_and_separators() {
    let config = SchemaConfig {
        value_separators: vec![':', '='],
        ..SchemaConfig::default()
    };
    let mut schema = Schema::with_config(config);
    let port = schema.option(&["--port"]).int().finish().unwrap();

    let matches = schema.parse(&["--port:8080"]).unwrap();
    assert_eq!(port.get(&matches), Some(8080));
}
