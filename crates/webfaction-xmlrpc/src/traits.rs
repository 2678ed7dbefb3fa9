//! Remote call trait

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ClientError;

/// Anything that can issue a positional remote procedure call.
///
/// Implemented by [`XmlRpcClient`](crate::XmlRpcClient) and by test doubles.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, ClientError>;
}
