//! Module argument parsing
//!
//! The host writes the task's options to a file and passes its path as the
//! only argument. New-style hosts write a JSON object; old-style hosts write
//! `key=value` pairs with shell quoting.

use std::path::Path;

use serde_json::{Map, Value};
use thiserror::Error;
use webfaction_facts::Credentials;

const OPTIONS: [&str; 3] = ["login_name", "login_password", "machine"];
const REQUIRED: [&str; 2] = ["login_name", "login_password"];

/// Errors in the module arguments
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgsError {
    /// Arguments file could not be read
    #[error("failed to read arguments file {path}: {message}")]
    Read {
        /// Path given on the command line
        path: String,
        /// I/O error text
        message: String,
    },

    /// Arguments are neither a JSON object nor `key=value` pairs
    #[error("invalid module arguments: {0}")]
    Malformed(String),

    /// Options this module does not know
    #[error("Unsupported parameters for (webfaction_facts) module: {}", .0.join(", "))]
    Unsupported(Vec<String>),

    /// Required options not given
    #[error("missing required arguments: {}", .0.join(", "))]
    Missing(Vec<String>),

    /// Option given with a value of the wrong kind
    #[error("argument {name} is of type {found} and we were unable to convert to str")]
    WrongType {
        /// Option name
        name: String,
        /// JSON type found
        found: &'static str,
    },
}

/// Validated module arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleArgs {
    /// Login credentials
    pub credentials: Credentials,
    /// Host asked for a dry run
    pub check_mode: bool,
}

/// Read and validate the arguments file
///
/// # Errors
/// Returns an error if the file cannot be read or its options are invalid.
pub fn load(path: &Path) -> Result<ModuleArgs, ArgsError> {
    let text = std::fs::read_to_string(path).map_err(|e| ArgsError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    parse(&text)
}

/// Parse and validate arguments text
///
/// # Errors
/// Returns an error for malformed text, unknown options, missing required
/// options or values that are not strings.
pub fn parse(text: &str) -> Result<ModuleArgs, ArgsError> {
    let raw = match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            return Err(ArgsError::Malformed(
                "expected a JSON object of options".to_string(),
            ));
        }
        Err(_) => parse_key_value(text)?,
    };
    validate(&raw)
}

fn validate(raw: &Map<String, Value>) -> Result<ModuleArgs, ArgsError> {
    let mut unsupported: Vec<String> = raw
        .keys()
        .filter(|k| !k.starts_with("_ansible_") && !OPTIONS.contains(&k.as_str()))
        .cloned()
        .collect();
    if !unsupported.is_empty() {
        unsupported.sort();
        return Err(ArgsError::Unsupported(unsupported));
    }

    let missing: Vec<String> = REQUIRED
        .iter()
        .filter(|k| matches!(raw.get(**k), None | Some(Value::Null)))
        .map(|k| (*k).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ArgsError::Missing(missing));
    }

    let login_name = string_option(raw, "login_name")?.unwrap_or_default();
    let login_password = string_option(raw, "login_password")?.unwrap_or_default();
    let machine = match raw.get("machine") {
        None | Some(Value::Null | Value::Bool(false)) => None,
        Some(_) => string_option(raw, "machine")?,
    };

    let credentials = Credentials::new(login_name, login_password);
    let credentials = match machine {
        Some(machine) => credentials.with_machine(machine),
        None => credentials,
    };

    let check_mode = matches!(raw.get("_ansible_check_mode"), Some(Value::Bool(true)));

    Ok(ModuleArgs {
        credentials,
        check_mode,
    })
}

fn string_option(raw: &Map<String, Value>, name: &str) -> Result<Option<String>, ArgsError> {
    let wrong_type = |found| ArgsError::WrongType {
        name: name.to_string(),
        found,
    };

    match raw.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(Value::Array(_)) => Err(wrong_type("list")),
        Some(Value::Object(_)) => Err(wrong_type("dict")),
    }
}

fn parse_key_value(text: &str) -> Result<Map<String, Value>, ArgsError> {
    let mut map = Map::new();
    // Token text may hold part of a secret; only its position is reported
    for (position, token) in split_words(text)?.into_iter().enumerate() {
        let Some((key, value)) = token.split_once('=') else {
            return Err(ArgsError::Malformed(format!(
                "expected key=value pairs, word {} is not one",
                position + 1
            )));
        };
        map.insert(key.to_string(), Value::String(value.to_string()));
    }
    Ok(map)
}

// Whitespace-separated words; single quotes are literal, double quotes
// honour backslash escapes
fn split_words(text: &str) -> Result<Vec<String>, ArgsError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => current.push(c),
                        None => return Err(unterminated()),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c) => current.push(c),
                            None => return Err(unterminated()),
                        },
                        Some(c) => current.push(c),
                        None => return Err(unterminated()),
                    }
                }
            }
            '\\' => {
                in_word = true;
                if let Some(c) = chars.next() {
                    current.push(c);
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }
    if in_word {
        words.push(current);
    }

    Ok(words)
}

fn unterminated() -> ArgsError {
    ArgsError::Malformed("unterminated quote".to_string())
}
