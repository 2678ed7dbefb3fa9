//! High-level facts gathering API

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument};
use webfaction_xmlrpc::RpcTransport;

use crate::error::FactsError;
use crate::types::{Credentials, FactsBundle, ListOperation, ResultSet, Session, WebfactionFacts};

/// Facts gatherer
///
/// Logs in once and indexes the result of every list call.
pub struct FactsGatherer {
    api: Arc<dyn RpcTransport>,
}

impl FactsGatherer {
    /// Create a new gatherer over a remote API transport
    pub fn new(api: Arc<dyn RpcTransport>) -> Self {
        Self { api }
    }

    /// Log in and open a session
    ///
    /// The machine name is only sent when it is present and non-empty.
    ///
    /// # Errors
    /// Returns [`FactsError::Authentication`] if the login call fails or its
    /// result is not a `[session_id, account]` pair.
    #[instrument(skip_all, fields(login_name = %credentials.login_name))]
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<Session, FactsError> {
        let mut params = vec![
            Value::String(credentials.login_name.clone()),
            Value::String(credentials.login_password.expose().to_string()),
        ];
        if let Some(machine) = credentials.machine() {
            params.push(Value::String(machine.to_string()));
        }

        debug!(args = params.len(), "logging in");

        let result = self
            .api
            .call("login", params)
            .await
            .map_err(|e| FactsError::Authentication(e.to_string()))?;

        let session = parse_session(result)?;
        info!("logged in");
        Ok(session)
    }

    /// Call a list method and index its records by `key_field`
    ///
    /// # Errors
    /// Returns [`FactsError::RemoteCall`] if the call fails, the result is not
    /// an array, or a record cannot be indexed.
    #[instrument(skip(self, session))]
    pub async fn fetch_and_index(
        &self,
        session: &Session,
        operation: &str,
        key_field: &str,
    ) -> Result<ResultSet, FactsError> {
        let result = self
            .api
            .call(operation, vec![Value::String(session.id.clone())])
            .await
            .map_err(|e| FactsError::remote_call(operation, e.to_string()))?;

        let records = match result {
            Value::Array(records) => records,
            other => {
                return Err(FactsError::remote_call(
                    operation,
                    format!("expected a list of records, got {other}"),
                ));
            }
        };

        let indexed = index_records(records, key_field)
            .map_err(|message| FactsError::remote_call(operation, message))?;

        debug!(count = indexed.len(), "indexed records");

        Ok(indexed)
    }

    /// Log in and collect every fact
    ///
    /// List calls are issued one after another; the first failure aborts the
    /// run and no partial bundle is returned.
    ///
    /// # Errors
    /// Returns [`FactsError::Authentication`] if login fails, otherwise
    /// [`FactsError::RemoteCall`] for the first list call that fails.
    #[instrument(skip_all, fields(login_name = %credentials.login_name))]
    pub async fn gather(&self, credentials: &Credentials) -> Result<FactsBundle, FactsError> {
        info!("gathering facts");

        let session = self.authenticate(credentials).await?;

        let mut facts = WebfactionFacts::default();
        for operation in ListOperation::ALL {
            let indexed = self
                .fetch_and_index(&session, operation.method(), operation.key_field())
                .await?;
            debug!(fact = operation.fact_name(), count = indexed.len(), "fact collected");
            *facts.slot_mut(operation) = indexed;
        }

        info!(
            apps = facts.webfaction_apps.len(),
            dbs = facts.webfaction_dbs.len(),
            domains = facts.webfaction_domains.len(),
            websites = facts.webfaction_websites.len(),
            "facts gathered"
        );

        Ok(FactsBundle::new(facts))
    }
}

fn parse_session(result: Value) -> Result<Session, FactsError> {
    let mut items = match result {
        Value::Array(items) => items,
        other => {
            return Err(FactsError::Authentication(format!(
                "unexpected login response: {other}"
            )));
        }
    };
    if items.len() != 2 {
        return Err(FactsError::Authentication(format!(
            "unexpected login response: expected 2 items, got {}",
            items.len()
        )));
    }

    let account = items.pop().unwrap_or_default();
    match items.pop() {
        Some(Value::String(id)) => Ok(Session { id, account }),
        other => Err(FactsError::Authentication(format!(
            "unexpected session id: {other:?}"
        ))),
    }
}

/// Index records by one of their fields
///
/// A later record replaces an earlier one with the same key. String keys are
/// used as-is; other key values use their JSON text.
///
/// # Errors
/// Returns a message if a record is not a struct or lacks `key_field`.
pub fn index_records(records: Vec<Value>, key_field: &str) -> Result<ResultSet, String> {
    let mut indexed = ResultSet::new();

    for record in records {
        let record = match record {
            Value::Object(record) => record,
            other => return Err(format!("expected a record, got {other}")),
        };
        let key = match record.get(key_field) {
            Some(Value::String(key)) => key.clone(),
            Some(other) => other.to_string(),
            None => return Err(format!("record has no '{key_field}' field")),
        };
        if indexed.insert(key.clone(), record).is_some() {
            debug!(key = %key, "duplicate key, keeping later record");
        }
    }

    Ok(indexed)
}
