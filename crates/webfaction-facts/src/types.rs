//! Fact type definitions

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

// ============================================================================
// Credentials
// ============================================================================

/// Password that never shows up in `Debug` output
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    /// Wrap a secret value
    pub fn new(secret: impl Into<String>) -> Self {
        SecretString(secret.into())
    }

    /// Get the secret as a string slice
    ///
    /// Only for building the login call and masking output.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(********)")
    }
}

/// Account credentials for the login call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account login name
    pub login_name: String,
    /// Account password
    pub login_password: SecretString,
    /// Machine name, for accounts with more than one machine
    pub machine: Option<String>,
}

impl Credentials {
    /// Create credentials without a machine name
    pub fn new(login_name: impl Into<String>, login_password: impl Into<String>) -> Self {
        Self {
            login_name: login_name.into(),
            login_password: SecretString::new(login_password),
            machine: None,
        }
    }

    /// Set machine name
    #[must_use]
    pub fn with_machine(mut self, machine: impl Into<String>) -> Self {
        self.machine = Some(machine.into());
        self
    }

    /// Machine name if one was given and it is not empty
    #[must_use]
    pub fn machine(&self) -> Option<&str> {
        self.machine.as_deref().filter(|m| !m.is_empty())
    }
}

// ============================================================================
// Session
// ============================================================================

/// Authenticated session returned by `login`
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Session identifier passed to every list call
    pub id: String,
    /// Account descriptor
    pub account: Value,
}

// ============================================================================
// Records
// ============================================================================

/// One entry returned by a list call
pub type Record = Map<String, Value>;

/// Records keyed by their identifying field
pub type ResultSet = BTreeMap<String, Record>;

/// The four list calls issued while gathering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListOperation {
    Apps,
    Dbs,
    Domains,
    Websites,
}

impl ListOperation {
    /// All operations in the order they are issued
    pub const ALL: [ListOperation; 4] = [
        ListOperation::Apps,
        ListOperation::Dbs,
        ListOperation::Domains,
        ListOperation::Websites,
    ];

    /// Remote method name
    #[must_use]
    pub fn method(self) -> &'static str {
        match self {
            ListOperation::Apps => "list_apps",
            ListOperation::Dbs => "list_dbs",
            ListOperation::Domains => "list_domains",
            ListOperation::Websites => "list_websites",
        }
    }

    /// Record field used as the result key
    #[must_use]
    pub fn key_field(self) -> &'static str {
        match self {
            ListOperation::Domains => "domain",
            _ => "name",
        }
    }

    /// Name of the fact the result is published under
    #[must_use]
    pub fn fact_name(self) -> &'static str {
        match self {
            ListOperation::Apps => "webfaction_apps",
            ListOperation::Dbs => "webfaction_dbs",
            ListOperation::Domains => "webfaction_domains",
            ListOperation::Websites => "webfaction_websites",
        }
    }
}

impl fmt::Display for ListOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method())
    }
}

// ============================================================================
// Facts
// ============================================================================

/// Account inventory, one result set per list call
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WebfactionFacts {
    pub webfaction_apps: ResultSet,
    pub webfaction_dbs: ResultSet,
    pub webfaction_domains: ResultSet,
    pub webfaction_websites: ResultSet,
}

impl WebfactionFacts {
    /// Result set slot for an operation
    pub fn slot_mut(&mut self, operation: ListOperation) -> &mut ResultSet {
        match operation {
            ListOperation::Apps => &mut self.webfaction_apps,
            ListOperation::Dbs => &mut self.webfaction_dbs,
            ListOperation::Domains => &mut self.webfaction_domains,
            ListOperation::Websites => &mut self.webfaction_websites,
        }
    }
}

/// Output of one gather run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FactsBundle {
    /// Always false; gathering never modifies the account
    pub changed: bool,
    #[serde(flatten)]
    pub facts: WebfactionFacts,
}

impl FactsBundle {
    /// Wrap gathered facts
    #[must_use]
    pub fn new(facts: WebfactionFacts) -> Self {
        Self {
            changed: false,
            facts,
        }
    }
}
