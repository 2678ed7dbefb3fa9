//! Error types for the XML-RPC client

use thiserror::Error;

/// Errors that can occur when calling an XML-RPC endpoint
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid endpoint URL
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Endpoint returned a non-success HTTP status
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// Server answered with an XML-RPC fault
    #[error("{message} (fault {code})")]
    Fault {
        /// `faultCode` member
        code: i64,
        /// `faultString` member
        message: String,
    },

    /// Response body is not well-formed XML
    #[error("XML error: {0}")]
    Xml(String),

    /// Response is well-formed but not a valid method response
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Check if the server itself rejected the call
    #[must_use]
    pub fn is_fault(&self) -> bool {
        matches!(self, ClientError::Fault { .. })
    }
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
