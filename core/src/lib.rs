//! Declarative command-line argument parsing with typed handles.
//!
//! A [`Schema`] is declared once through builders and then parses any number
//! of raw token arrays. Each builder `finish()` returns a typed [`Arg`]
//! handle whose type parameter is exactly what a successful parse binds:
//! `Option<T>` for optional scalars, `T` for required or defaulted scalars,
//! `Vec<T>` / `HashSet<T>` for collections, and nested vectors for arity
//! groups. There is no runtime type inspection and no stringly-typed lookup;
//! reads go through the handle.
//!
//! ```
//! use declargs_core::Schema;
//!
//! let mut schema = Schema::new();
//! let port = schema
//!     .option(&["-p", "--port"])
//!     .int()
//!     .from_env("APP_PORT")
//!     .default(8080)
//!     .finish()?;
//! let verbose = schema.option(&["-v", "--verbose"]).bool().list().finish()?;
//! let files = schema.positional("files").string().list().finish()?;
//!
//! let matches = schema.parse(&["--port", "9000", "-vv", "a.txt", "b.txt"]).unwrap();
//! assert_eq!(port.get(&matches), 9000);
//! assert_eq!(verbose.get(&matches).len(), 2);
//! assert_eq!(files.get(&matches), vec!["a.txt".to_string(), "b.txt".to_string()]);
//! # Ok::<(), declargs_core::ConfigError>(())
//! ```
//!
//! Domains scope options and constraints to subcommand-like modes, and
//! fragments bundle constraints for reuse through inheritance. Values fall
//! back from the command line to an environment variable, a declared
//! default, and (for required options with a prompt) interactive input, with
//! provenance recorded per option as a [`ValueSource`].

mod coerce;
mod error;
mod host;
mod message;
mod parse;
mod schema;
mod snapshot;
mod value;

pub use coerce::{CoerceFailure, Coercer};
pub use error::{ConfigError, ConstraintKindTag, ParseError};
pub use host::{EnvLookup, Prompt, StdEnv};
pub use message::{Message, NoTranslation, Translate};
pub use parse::Matches;
pub use schema::{
    Arg, CollectionKind, ConstraintMode, ConstraintScope, DomainBuilder, DomainId,
    GroupListOption, GroupSetOption, ListOption, OptionBuilder, OptionId, PositionalBuilder,
    RequiredOption, Schema, SchemaConfig, SetOption, TypedOption,
};
pub use snapshot::{DomainSnapshot, OptionSnapshot, PositionalSnapshot, SchemaSnapshot};
pub use value::{
    Binding, BoundData, FromBinding, FromValue, IntoValue, KeyValue, Value, ValueSource,
};
