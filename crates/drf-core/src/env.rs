//! Parsing of `KEY=value[,KEY=value...]` environment assignment lists
//!
//! Used to configure container runtime environments. A value may be wrapped
//! in double quotes to keep embedded `,` and `=` characters. `$VAR` (or
//! `%VAR%` with [`PlaceholderStyle::Windows`]) placeholders are substituted
//! from the environment being populated. Tokens that do not look like an
//! assignment are skipped.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::trace;

const ENV_NAME: &str = "[A-Za-z_][A-Za-z0-9_]*";

fn assignment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r#"(?:^|,)({ENV_NAME})=("[^"]*"|[^,]*)"#))
            .expect("assignment pattern is valid")
    })
}

/// Placeholder syntax used when expanding values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `$VAR`
    Unix,
    /// `%VAR%`
    Windows,
}

impl PlaceholderStyle {
    /// Style of the platform this binary was built for
    pub fn native() -> Self {
        if cfg!(windows) {
            PlaceholderStyle::Windows
        } else {
            PlaceholderStyle::Unix
        }
    }

    fn regex(self) -> &'static Regex {
        static UNIX: OnceLock<Regex> = OnceLock::new();
        static WINDOWS: OnceLock<Regex> = OnceLock::new();
        match self {
            PlaceholderStyle::Unix => UNIX.get_or_init(|| {
                Regex::new(&format!(r"\$({ENV_NAME})"))
                    .expect("placeholder pattern is valid")
            }),
            PlaceholderStyle::Windows => WINDOWS.get_or_init(|| {
                Regex::new(&format!(r"%({ENV_NAME})%"))
                    .expect("placeholder pattern is valid")
            }),
        }
    }
}

impl Default for PlaceholderStyle {
    fn default() -> Self {
        Self::native()
    }
}

/// Environment assignment list parser
#[derive(Debug, Clone)]
pub struct EnvParser {
    style: PlaceholderStyle,
    separator: String,
    inherit_process_env: bool,
}

impl EnvParser {
    /// Create a parser that joins repeated keys with `separator`
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            style: PlaceholderStyle::native(),
            separator: separator.into(),
            inherit_process_env: false,
        }
    }

    pub fn with_style(mut self, style: PlaceholderStyle) -> Self {
        self.style = style;
        self
    }

    /// Resolve placeholders missing from the target map against the
    /// process environment
    pub fn inherit_process_env(mut self, inherit: bool) -> Self {
        self.inherit_process_env = inherit;
        self
    }

    /// Apply every well-formed assignment in `input` to `env`
    pub fn set_env_from_input_string(&self, env: &mut HashMap<String, String>, input: &str) {
        for caps in assignment_regex().captures_iter(input) {
            let key = &caps[1];
            let raw = &caps[2];
            let raw = raw
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(raw);
            let value = self.expand(env, raw);
            trace!(key = key, value = %value, "Parsed environment assignment");
            self.add_to_environment(env, key, value);
        }
    }

    /// Substitute placeholders in `value`
    pub fn expand(&self, env: &HashMap<String, String>, value: &str) -> String {
        self.style
            .regex()
            .replace_all(value, |caps: &Captures<'_>| {
                let name = &caps[1];
                env.get(name)
                    .cloned()
                    .or_else(|| {
                        self.inherit_process_env
                            .then(|| std::env::var(name).ok())
                            .flatten()
                    })
                    .unwrap_or_default()
            })
            .into_owned()
    }

    /// Set `key`, appending after the separator if it already has a value
    pub fn add_to_environment(&self, env: &mut HashMap<String, String>, key: &str, value: String) {
        match env.get_mut(key) {
            Some(existing) => {
                existing.push_str(&self.separator);
                existing.push_str(&value);
            }
            None => {
                env.insert(key.to_string(), value);
            }
        }
    }
}

impl Default for EnvParser {
    fn default() -> Self {
        let separator = if cfg!(windows) { ";" } else { ":" };
        Self::new(separator)
    }
}
