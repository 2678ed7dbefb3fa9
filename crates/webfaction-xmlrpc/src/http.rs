//! HTTP transport for XML-RPC calls

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::codec::{decode_response, encode_call};
use crate::error::{ClientError, Result};
use crate::traits::RpcTransport;

/// XML-RPC client bound to a single endpoint
#[derive(Debug, Clone)]
pub struct XmlRpcClient {
    client: Client,
    endpoint: Url,
}

impl XmlRpcClient {
    /// Create a new client for an endpoint
    ///
    /// # Errors
    /// Returns an error if the endpoint URL is invalid.
    ///
    /// # Example
    /// ```no_run
    /// use webfaction_xmlrpc::XmlRpcClient;
    ///
    /// let client = XmlRpcClient::new("https://api.webfaction.com/")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(endpoint: impl AsRef<str>) -> Result<Self> {
        Self::with_client(endpoint, Client::new())
    }

    /// Create a new client with a custom `reqwest::Client`
    ///
    /// # Errors
    /// Returns an error if the endpoint URL is invalid.
    pub fn with_client(endpoint: impl AsRef<str>, client: Client) -> Result<Self> {
        let endpoint = Url::parse(endpoint.as_ref())?;
        Ok(Self { client, endpoint })
    }

    /// Endpoint every call is posted to
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Issue a method call and decode its single return value
    ///
    /// Parameters are not recorded in traces; they may carry credentials.
    ///
    /// # Errors
    /// Returns an error if the request fails, the endpoint answers with a
    /// non-success status, the body cannot be decoded, or the server returns
    /// a fault.
    ///
    /// # Example
    /// ```no_run
    /// # use webfaction_xmlrpc::XmlRpcClient;
    /// # use serde_json::json;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = XmlRpcClient::new("https://api.webfaction.com/")?;
    /// let apps = client.call_method("list_apps", &[json!("session-id")]).await?;
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self, params), fields(endpoint = %self.endpoint))]
    pub async fn call_method(&self, method: &str, params: &[Value]) -> Result<Value> {
        let body = encode_call(method, params);

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "text/xml")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Api { status, message });
        }

        let text = response.text().await?;
        let value = decode_response(&text)?;

        debug!("call completed");

        Ok(value)
    }
}

#[async_trait]
impl RpcTransport for XmlRpcClient {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        self.call_method(method, &params).await
    }
}
