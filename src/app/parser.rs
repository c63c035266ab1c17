//! Command line parsing
//!
//! Turns a raw input line into a command name and an ordered set of unique
//! `key=value` parameters. Values may span several space-separated tokens:
//! `n=my new space` yields the single value `my new space`.

use indexmap::IndexMap;

use crate::errors::{ValidationError, ValidationResult};

/// A parsed command: lower-cased name plus ordered unique parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    name: String,
    params: IndexMap<String, Option<String>>,
}

impl CommandInvocation {
    /// Build an invocation directly, mostly useful in tests
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_lowercase(),
            params: IndexMap::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: Option<&str>) -> Self {
        self.params
            .insert(key.to_lowercase(), value.map(str::to_string));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &IndexMap<String, Option<String>> {
        &self.params
    }

    /// Whether the key was given at all, with or without a value
    pub fn has(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Value of a parameter, `None` when absent or given as a bare flag
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(|v| v.as_deref())
    }

    /// Value of a required parameter
    pub fn require(&self, key: &str) -> ValidationResult<&str> {
        self.get(key).ok_or_else(|| ValidationError::MissingParam {
            name: key.to_string(),
        })
    }

    /// Keys in input order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }
}

/// Parse one input line.
///
/// Returns `Ok(None)` for an empty line. Tokens are separated by single
/// spaces; runs of spaces do not produce empty values.
pub fn parse_line(line: &str) -> ValidationResult<Option<CommandInvocation>> {
    let mut tokens = line.trim().split(' ').filter(|t| !t.is_empty());

    let name = match tokens.next() {
        Some(name) => name.to_lowercase(),
        None => return Ok(None),
    };

    let mut params: IndexMap<String, Option<String>> = IndexMap::new();
    let mut current: Option<(String, String)> = None;

    for token in tokens {
        match token.split_once('=') {
            Some((key, value)) => {
                if let Some((key, value)) = current.take() {
                    insert_param(&mut params, key, value)?;
                }
                current = Some((key.to_lowercase(), value.to_string()));
            }
            None => match current.as_mut() {
                Some((_, value)) => {
                    value.push(' ');
                    value.push_str(token);
                }
                None => return Err(ValidationError::MalformedArguments),
            },
        }
    }
    if let Some((key, value)) = current {
        insert_param(&mut params, key, value)?;
    }

    Ok(Some(CommandInvocation { name, params }))
}

fn insert_param(
    params: &mut IndexMap<String, Option<String>>,
    key: String,
    value: String,
) -> ValidationResult<()> {
    if key.is_empty() || params.contains_key(&key) {
        return Err(ValidationError::MalformedArguments);
    }
    let value = if value.is_empty() { None } else { Some(value) };
    params.insert(key, value);
    Ok(())
}

/// Split a comma-separated list such as `id=3,4,5`
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
