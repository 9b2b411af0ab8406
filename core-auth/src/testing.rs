//! Shared test doubles for the session core.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::{AppShell, HttpClient, HttpRequest, HttpResponse, KeyValueStore, Route};
use bytes::Bytes;

/// In-memory [`KeyValueStore`].
#[derive(Default)]
pub(crate) struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub(crate) fn with_entries(entries: &[(&str, &str)]) -> Self {
        let map = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            entries: Mutex::new(map),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get_item(&self, key: &str) -> BridgeResult<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> BridgeResult<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> BridgeResult<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn clear(&self) -> BridgeResult<()> {
        self.entries.lock().unwrap().clear();
        Ok(())
    }
}

/// Scripted [`HttpClient`] that pops one canned result per request and logs
/// every request it receives.
#[derive(Default)]
pub(crate) struct ScriptedHttpClient {
    script: Mutex<VecDeque<BridgeResult<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_response(&self, status: u16, body: serde_json::Value) {
        self.push(Ok(response(status, body)));
    }

    pub(crate) fn push_error(&self, message: &str) {
        self.push(Err(BridgeError::OperationFailed(message.to_string())));
    }

    pub(crate) fn push(&self, result: BridgeResult<HttpResponse>) {
        self.script.lock().unwrap().push_back(result);
    }

    /// All requests executed so far, in order.
    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Number of recorded requests whose URL contains `fragment`.
    pub(crate) fn count_requests_to(&self, fragment: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.contains(fragment))
            .count()
    }
}

#[async_trait]
impl HttpClient for ScriptedHttpClient {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("Unscripted request: {} {}", request.method.as_str(), request.url))
    }
}

pub(crate) fn response(status: u16, body: serde_json::Value) -> HttpResponse {
    HttpResponse {
        status,
        headers: HashMap::new(),
        body: Bytes::from(serde_json::to_vec(&body).unwrap()),
    }
}

/// Unsigned JWT whose `exp` claim is `seconds` from now.
pub(crate) fn jwt_expiring_in(seconds: i64) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    let exp = chrono::Utc::now().timestamp() + seconds;
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&serde_json::json!({ "exp": exp })).unwrap());
    format!("{}.{}.sig", header, payload)
}

/// [`AppShell`] that records navigations and alerts.
#[derive(Default)]
pub(crate) struct RecordingShell {
    navigations: Mutex<Vec<Route>>,
    alerts: Mutex<Vec<(String, String)>>,
}

impl RecordingShell {
    pub(crate) fn navigations(&self) -> Vec<Route> {
        self.navigations.lock().unwrap().clone()
    }

    pub(crate) fn alerts(&self) -> Vec<(String, String)> {
        self.alerts.lock().unwrap().clone()
    }
}

impl AppShell for RecordingShell {
    fn navigate(&self, route: Route) {
        self.navigations.lock().unwrap().push(route);
    }

    fn alert(&self, title: &str, message: &str) {
        self.alerts
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }
}
