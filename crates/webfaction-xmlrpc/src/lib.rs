//! webfaction-xmlrpc: XML-RPC client library
//!
//! Encodes method calls, decodes method responses and faults, and posts them
//! over HTTP. Values cross the API as [`serde_json::Value`].
//!
//! # Example
//!
//! ```no_run
//! use serde_json::json;
//! use webfaction_xmlrpc::XmlRpcClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = XmlRpcClient::new("https://api.webfaction.com/")?;
//!
//! let login = client
//!     .call_method("login", &[json!("user"), json!("secret")])
//!     .await?;
//! println!("{login}");
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod error;
pub mod http;
pub mod traits;

pub use error::{ClientError, Result};
pub use http::XmlRpcClient;
pub use traits::RpcTransport;
