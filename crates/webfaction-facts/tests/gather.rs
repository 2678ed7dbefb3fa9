use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use webfaction_facts::{Credentials, FactsError, FactsGatherer, ListOperation};
use webfaction_xmlrpc::{ClientError, RpcTransport};

// Mock transport: canned results per method, records every call
#[derive(Default)]
struct MockApi {
    responses: HashMap<&'static str, Value>,
    faults: HashMap<&'static str, &'static str>,
    calls: Mutex<Vec<(String, Vec<Value>)>>,
}

impl MockApi {
    fn webfaction() -> Self {
        let mut api = MockApi::default();
        api.responses
            .insert("login", json!(["sid123", {"id": 1, "username": "u"}]));
        api.responses
            .insert("list_apps", json!([{"name": "app1", "type": "python"}]));
        api.responses.insert("list_dbs", json!([]));
        api.responses
            .insert("list_domains", json!([{"domain": "example.com"}]));
        api.responses.insert("list_websites", json!([{"name": "site1"}]));
        api
    }

    fn failing(mut self, method: &'static str, message: &'static str) -> Self {
        self.faults.insert(method, message);
        self
    }

    fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls.lock().unwrap().clone()
    }

    fn call_count(&self, method: &str) -> usize {
        self.calls().iter().filter(|(m, _)| m == method).count()
    }
}

#[async_trait]
impl RpcTransport for MockApi {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, ClientError> {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), params));

        if let Some(message) = self.faults.get(method) {
            return Err(ClientError::Fault {
                code: 1,
                message: (*message).to_string(),
            });
        }
        Ok(self.responses.get(method).cloned().unwrap_or(json!([])))
    }
}

fn gatherer(api: &Arc<MockApi>) -> FactsGatherer {
    FactsGatherer::new(api.clone())
}

#[tokio::test]
async fn test_gather_end_to_end() {
    let api = Arc::new(MockApi::webfaction());
    let credentials = Credentials::new("u", "p").with_machine("");

    let bundle = gatherer(&api).gather(&credentials).await.unwrap();

    assert_eq!(
        serde_json::to_value(&bundle).unwrap(),
        json!({
            "changed": false,
            "webfaction_apps": {"app1": {"name": "app1", "type": "python"}},
            "webfaction_dbs": {},
            "webfaction_domains": {"example.com": {"domain": "example.com"}},
            "webfaction_websites": {"site1": {"name": "site1"}}
        })
    );

    let methods: Vec<String> = api.calls().into_iter().map(|(m, _)| m).collect();
    assert_eq!(
        methods,
        ["login", "list_apps", "list_dbs", "list_domains", "list_websites"]
    );
    for (method, params) in api.calls().into_iter().skip(1) {
        assert_eq!(params, vec![json!("sid123")], "{method} must get the session id");
    }
}

#[tokio::test]
async fn test_cardinality_matches_input() {
    let mut api = MockApi::webfaction();
    api.responses.insert(
        "list_dbs",
        json!([{"name": "db1"}, {"name": "db2"}, {"name": "db3"}]),
    );
    api.responses.insert(
        "list_domains",
        json!([{"domain": "a.com"}, {"domain": "b.com"}]),
    );
    let api = Arc::new(api);

    let bundle = gatherer(&api)
        .gather(&Credentials::new("u", "p"))
        .await
        .unwrap();

    assert_eq!(bundle.facts.webfaction_apps.len(), 1);
    assert_eq!(bundle.facts.webfaction_dbs.len(), 3);
    assert_eq!(bundle.facts.webfaction_domains.len(), 2);
    assert_eq!(bundle.facts.webfaction_websites.len(), 1);
    assert!(!bundle.changed);
}

#[tokio::test]
async fn test_login_without_machine_sends_two_args() {
    let api = Arc::new(MockApi::webfaction());

    let session = gatherer(&api)
        .authenticate(&Credentials::new("u", "p"))
        .await
        .unwrap();
    assert_eq!(session.id, "sid123");

    let calls = api.calls();
    assert_eq!(calls[0].1, vec![json!("u"), json!("p")]);
}

#[tokio::test]
async fn test_login_with_empty_machine_sends_two_args() {
    let api = Arc::new(MockApi::webfaction());

    gatherer(&api)
        .authenticate(&Credentials::new("u", "p").with_machine(""))
        .await
        .unwrap();

    assert_eq!(api.calls()[0].1.len(), 2);
}

#[tokio::test]
async fn test_login_with_machine_sends_three_args() {
    let api = Arc::new(MockApi::webfaction());

    gatherer(&api)
        .authenticate(&Credentials::new("u", "p").with_machine("web500"))
        .await
        .unwrap();

    assert_eq!(
        api.calls()[0].1,
        vec![json!("u"), json!("p"), json!("web500")]
    );
}

#[tokio::test]
async fn test_login_failure_skips_all_list_calls() {
    let api = Arc::new(MockApi::webfaction().failing("login", "LoginError"));

    let err = gatherer(&api)
        .gather(&Credentials::new("u", "wrong"))
        .await
        .unwrap_err();

    assert!(err.is_authentication());
    assert!(err.to_string().contains("LoginError"));
    for operation in ListOperation::ALL {
        assert_eq!(api.call_count(operation.method()), 0);
    }
}

#[tokio::test]
async fn test_list_failure_aborts_remaining_calls() {
    let api = Arc::new(MockApi::webfaction().failing("list_domains", "boom"));

    let err = gatherer(&api)
        .gather(&Credentials::new("u", "p"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        FactsError::RemoteCall {
            operation: "list_domains".to_string(),
            message: "boom (fault 1)".to_string(),
        }
    );
    assert_eq!(api.call_count("list_apps"), 1);
    assert_eq!(api.call_count("list_dbs"), 1);
    assert_eq!(api.call_count("list_domains"), 1);
    assert_eq!(api.call_count("list_websites"), 0);
}

#[tokio::test]
async fn test_malformed_list_result() {
    let mut api = MockApi::webfaction();
    api.responses.insert("list_apps", json!({"name": "app1"}));
    let api = Arc::new(api);

    let err = gatherer(&api)
        .gather(&Credentials::new("u", "p"))
        .await
        .unwrap_err();

    assert!(matches!(err, FactsError::RemoteCall { ref operation, .. } if operation == "list_apps"));
}

#[tokio::test]
async fn test_fetch_and_index_duplicates() {
    let mut api = MockApi::webfaction();
    api.responses.insert(
        "list_websites",
        json!([{"name": "site", "https": false}, {"name": "site", "https": true}]),
    );
    let api = Arc::new(api);
    let gatherer = gatherer(&api);

    let session = gatherer
        .authenticate(&Credentials::new("u", "p"))
        .await
        .unwrap();
    let websites = gatherer
        .fetch_and_index(&session, "list_websites", "name")
        .await
        .unwrap();

    assert_eq!(websites.len(), 1);
    assert_eq!(websites["site"]["https"], json!(true));
}
