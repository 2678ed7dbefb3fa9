//! Module response document

use serde::Serialize;
use webfaction_facts::{FactsBundle, WebfactionFacts};

const MASK: &str = "********";

/// JSON document printed on stdout for the host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleResponse {
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ansible_facts: Option<WebfactionFacts>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl ModuleResponse {
    /// Successful run publishing the gathered facts
    #[must_use]
    pub fn facts(bundle: FactsBundle) -> Self {
        Self {
            changed: bundle.changed,
            ansible_facts: Some(bundle.facts),
            failed: false,
            msg: None,
        }
    }

    /// Failed run; every secret is masked out of the message
    #[must_use]
    pub fn failure(message: &str, secrets: &[&str]) -> Self {
        Self {
            changed: false,
            ansible_facts: None,
            failed: true,
            msg: Some(mask_secrets(message, secrets)),
        }
    }

    /// Process exit status for this response
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        u8::from(self.failed)
    }
}

/// Replace every occurrence of a secret value with a mask
#[must_use]
pub fn mask_secrets(message: &str, secrets: &[&str]) -> String {
    secrets
        .iter()
        .filter(|s| !s.is_empty())
        .fold(message.to_string(), |acc, secret| acc.replace(secret, MASK))
}
