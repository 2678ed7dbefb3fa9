//! Error types for webfaction-facts

use thiserror::Error;

/// Errors that can occur while gathering facts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FactsError {
    /// The login call failed; no list call was attempted
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A list call failed after a successful login
    #[error("{operation} failed: {message}")]
    RemoteCall {
        /// Remote method name
        operation: String,
        /// Underlying remote message
        message: String,
    },
}

impl FactsError {
    pub(crate) fn remote_call(operation: &str, message: impl Into<String>) -> Self {
        FactsError::RemoteCall {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    /// Check if the failure happened during login
    #[must_use]
    pub fn is_authentication(&self) -> bool {
        matches!(self, FactsError::Authentication(_))
    }
}
