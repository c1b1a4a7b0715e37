//! Collaborator seams for OS-touching concerns.
//!
//! The engine never reads the environment or a terminal directly; it goes
//! through these traits so tests and embedders can substitute their own
//! sources. [`StdEnv`] is the production environment lookup; no default
//! prompter is shipped, so prompting is off unless a caller installs one.

use std::io;

/// Environment-variable lookup used for `from_env` fallbacks.
pub trait EnvLookup {
    fn var(&self, name: &str) -> Option<String>;
}

/// Process-environment lookup via [`std::env::var`].
#[derive(Debug, Default, Clone, Copy)]
pub struct StdEnv;

impl EnvLookup for StdEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvLookup for std::collections::HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Interactive input reader used when a required option with a prompt is
/// missing from every other source. Implementations own echo suppression
/// and terminal handling; the engine only sees the returned buffer.
pub trait Prompt {
    fn read_secret(&self, prompt: &str) -> io::Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_map_env_lookup() {
        let mut env = HashMap::new();
        env.insert("APP_PORT".to_string(), "8080".to_string());
        assert_eq!(env.var("APP_PORT"), Some("8080".to_string()));
        assert_eq!(env.var("APP_HOST"), None);
    }
}
