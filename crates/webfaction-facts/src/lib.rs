//! webfaction-facts: account inventory from the WebFaction API
//!
//! Logs in once, lists applications, databases, domains and websites, and
//! indexes each list by its identifying field.

pub mod collector;
pub mod error;
pub mod types;

pub use collector::{FactsGatherer, index_records};
pub use error::FactsError;
pub use types::{
    Credentials, FactsBundle, ListOperation, Record, ResultSet, SecretString, Session,
    WebfactionFacts,
};
