//! Authenticated request executor.
//!
//! Every API call from the app goes through [`ApiClient::fetch`], which
//! attaches the stored access token, refreshes it when it is expired or
//! rejected, and retries the original request once with the new token.
//!
//! Auth-layer failures never surface as `Err`: the caller receives a
//! synthetic `401` response with a JSON error body, exactly as if the server
//! had rejected the request, and the session has already been torn down.
//! `Err` is reserved for transport and storage failures.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{AppShell, HttpClient, HttpMethod, HttpRequest, HttpResponse, Route};
use bytes::Bytes;
use core_runtime::{ApiConfig, EventBus, SessionEvent};
use tokio::sync::Mutex;

use crate::api::AuthApi;
use crate::error::{AuthError, Result};
use crate::jwt::is_token_expired;
use crate::token_store::TokenStore;

/// Alert shown when a session dies while the user is active.
pub const SESSION_EXPIRED_TITLE: &str = "Session expired";
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session expired. Please sign in again.";

/// Request body variants.
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// JSON payload; sets `Content-Type: application/json`.
    Json(serde_json::Value),
    /// Pre-encoded multipart payload. No content type is set here; the
    /// caller supplies the `multipart/form-data` header with its boundary.
    Multipart(Bytes),
}

/// Options for an authenticated request.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub body: Option<RequestBody>,
    pub headers: HashMap<String, String>,
    pub timeout: Option<Duration>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: HttpMethod::Get,
            body: None,
            headers: HashMap::new(),
            timeout: None,
        }
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post_json(body: serde_json::Value) -> Self {
        Self {
            method: HttpMethod::Post,
            body: Some(RequestBody::Json(body)),
            ..Self::default()
        }
    }

    pub fn multipart(method: HttpMethod, body: Bytes) -> Self {
        Self {
            method,
            body: Some(RequestBody::Multipart(body)),
            ..Self::default()
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// HTTP client with credential management.
pub struct ApiClient {
    http: Arc<dyn HttpClient>,
    tokens: TokenStore,
    api: AuthApi,
    shell: Arc<dyn AppShell>,
    events: EventBus,
    /// Serializes refresh attempts so concurrent 401s trigger one refresh.
    refresh_gate: Mutex<()>,
}

impl ApiClient {
    pub fn new(
        http: Arc<dyn HttpClient>,
        tokens: TokenStore,
        shell: Arc<dyn AppShell>,
        config: ApiConfig,
        events: EventBus,
    ) -> Self {
        let api = AuthApi::new(http.clone(), config);
        Self {
            http,
            tokens,
            api,
            shell,
            events,
            refresh_gate: Mutex::new(()),
        }
    }

    pub fn auth_api(&self) -> &AuthApi {
        &self.api
    }

    pub fn token_store(&self) -> &TokenStore {
        &self.tokens
    }

    /// Execute an authenticated request against an API path.
    ///
    /// The path is resolved under the mobile prefix; see
    /// [`ApiConfig::api_url`](core_runtime::ApiConfig::api_url).
    pub async fn fetch(&self, path: &str, options: RequestOptions) -> Result<HttpResponse> {
        let creds = self.tokens.get_tokens().await?;
        if !has_value(creds.access_token.as_deref()) || !has_value(creds.refresh_token.as_deref())
        {
            tracing::debug!(path, "Request without a complete credential pair");
            if let Err(e) = self.tokens.clear_session().await {
                tracing::error!(error = %e, "Failed to clear partial session");
            }
            self.shell.navigate(Route::Login);
            return Ok(synthetic_401("missing tokens"));
        }

        let mut access = creds.access_token.clone();
        if is_token_expired(access.as_deref(), "access") {
            if is_token_expired(creds.refresh_token.as_deref(), "refresh") {
                self.teardown_session().await;
                return Ok(synthetic_401("authentication failed"));
            }
            match self.refresh_access_token(access.as_deref()).await {
                Ok(fresh) => access = Some(fresh),
                Err(e) => {
                    tracing::warn!(error = %e, "Pre-flight token refresh failed");
                    self.teardown_session().await;
                    return Ok(synthetic_401("authentication failed"));
                }
            }
        }

        let response = self
            .http
            .execute(self.build_request(path, &options, access.as_deref()))
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if response.status != 401 {
            return Ok(response);
        }

        tracing::debug!(path, "Request rejected with 401, refreshing");
        let fresh = match self.refresh_access_token(access.as_deref()).await {
            Ok(fresh) => fresh,
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh after 401 failed");
                self.teardown_session().await;
                return Ok(synthetic_401("authentication failed"));
            }
        };

        // One retry with the new token; a second 401 goes back to the caller.
        self.http
            .execute(self.build_request(path, &options, Some(&fresh)))
            .await
            .map_err(|e| AuthError::Network(e.to_string()))
    }

    /// Refresh the access token now, treating the stored one as stale.
    ///
    /// Goes through the same single-flight gate as the 401 path, so a
    /// proactive refresh and an in-flight 401 recovery cannot race into two
    /// refresh calls.
    pub async fn force_refresh(&self) -> Result<String> {
        let creds = self.tokens.get_tokens().await?;
        self.refresh_access_token(creds.access_token.as_deref())
            .await
    }

    /// Execute a request against an absolute URL, bypassing the base URL,
    /// the mobile prefix and all credential handling.
    pub async fn fetch_raw(&self, url: &str, options: RequestOptions) -> Result<HttpResponse> {
        let request = apply_options(HttpRequest::new(options.method, url), &options);
        self.http
            .execute(request)
            .await
            .map_err(|e| AuthError::Network(e.to_string()))
    }

    fn build_request(
        &self,
        path: &str,
        options: &RequestOptions,
        access_token: Option<&str>,
    ) -> HttpRequest {
        let mut request = apply_options(
            HttpRequest::new(options.method, self.api.config().api_url(path)),
            options,
        );
        if let Some(token) = access_token {
            request = request.bearer_token(token);
        }
        request
    }

    /// Get a usable access token, refreshing at most once across concurrent
    /// callers.
    ///
    /// `stale_access` is the token the caller just found expired or
    /// rejected. After the gate is acquired, the store is re-read: if the
    /// stored token differs from the stale one, another task already
    /// refreshed and that token is returned without a second network call.
    async fn refresh_access_token(&self, stale_access: Option<&str>) -> Result<String> {
        let _guard = self.refresh_gate.lock().await;

        let creds = self.tokens.get_tokens().await?;
        if let Some(current) = &creds.access_token {
            if Some(current.as_str()) != stale_access && !is_token_expired(Some(current), "access")
            {
                tracing::debug!("Reusing access token refreshed by a concurrent request");
                return Ok(current.clone());
            }
        }

        let refresh_token = creds
            .refresh_token
            .as_deref()
            .ok_or(AuthError::MissingCredentials)?;

        let _ = self.events.emit(SessionEvent::TokenRefreshing);
        let refreshed = self.api.refresh(refresh_token).await?;
        let access = refreshed
            .access_token
            .ok_or_else(|| AuthError::RefreshFailed {
                status: 200,
                message: "Refresh response missing access token".to_string(),
            })?;

        // Persist before anyone retries with the new token.
        self.tokens
            .save_tokens(&access, refreshed.refresh_token.as_deref(), Some(refresh_token))
            .await?;
        let _ = self.events.emit(SessionEvent::TokenRefreshed);

        Ok(access)
    }

    /// Clear the session, push the user to login and tell them why.
    async fn teardown_session(&self) {
        if let Err(e) = self.tokens.clear_session().await {
            tracing::error!(error = %e, "Failed to clear session during teardown");
        }
        let _ = self.events.emit(SessionEvent::SessionExpired {
            message: SESSION_EXPIRED_MESSAGE.to_string(),
        });
        let _ = self.events.emit(SessionEvent::SignedOut);
        self.shell.navigate(Route::Login);
        self.shell.alert(SESSION_EXPIRED_TITLE, SESSION_EXPIRED_MESSAGE);
    }
}

fn has_value(token: Option<&str>) -> bool {
    token.map_or(false, |t| !t.is_empty())
}

fn apply_options(mut request: HttpRequest, options: &RequestOptions) -> HttpRequest {
    for (key, value) in &options.headers {
        request = request.header(key.clone(), value.clone());
    }
    if let Some(timeout) = options.timeout {
        request = request.timeout(timeout);
    }
    match &options.body {
        Some(RequestBody::Json(value)) => {
            request.body = Some(Bytes::from(value.to_string()));
            request
                .headers
                .insert("Content-Type".to_string(), "application/json".to_string());
        }
        Some(RequestBody::Multipart(bytes)) => {
            request.body = Some(bytes.clone());
        }
        None => {}
    }
    request
}

/// Locally fabricated 401 with the same shape the server uses for auth
/// errors.
fn synthetic_401(error: &str) -> HttpResponse {
    let mut headers = HashMap::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    HttpResponse {
        status: 401,
        headers,
        body: Bytes::from(serde_json::json!({ "error": error }).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{jwt_expiring_in, MemoryStore, RecordingShell, ScriptedHttpClient};
    use crate::token_store::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixture {
        http: Arc<ScriptedHttpClient>,
        shell: Arc<RecordingShell>,
        client: ApiClient,
    }

    fn fixture(entries: &[(&str, &str)]) -> Fixture {
        let http = Arc::new(ScriptedHttpClient::new());
        let shell = Arc::new(RecordingShell::default());
        let tokens = TokenStore::new(Arc::new(MemoryStore::with_entries(entries)));
        let client = ApiClient::new(
            http.clone(),
            tokens,
            shell.clone(),
            ApiConfig::default(),
            EventBus::default(),
        );
        Fixture { http, shell, client }
    }

    #[tokio::test]
    async fn test_missing_tokens_short_circuits_without_network() {
        let fx = fixture(&[]);

        let response = fx.client.fetch("/posts", RequestOptions::get()).await.unwrap();

        assert_eq!(response.status, 401);
        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body, json!({ "error": "missing tokens" }));
        assert_eq!(fx.http.request_count(), 0);
        // The caller lands on login, silently.
        assert_eq!(fx.shell.navigations(), vec![Route::Login]);
        assert!(fx.shell.alerts().is_empty());
    }

    #[tokio::test]
    async fn test_access_token_alone_short_circuits() {
        let fresh = jwt_expiring_in(3600);
        let fx = fixture(&[(ACCESS_TOKEN_KEY, &fresh)]);

        let response = fx.client.fetch("/posts", RequestOptions::get()).await.unwrap();

        assert_eq!(response.status, 401);
        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body, json!({ "error": "missing tokens" }));
        assert_eq!(fx.http.request_count(), 0);
        assert_eq!(fx.shell.navigations(), vec![Route::Login]);

        // The half-session is gone.
        let creds = fx.client.token_store().get_tokens().await.unwrap();
        assert!(creds.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_token_alone_short_circuits() {
        let fx = fixture(&[(REFRESH_TOKEN_KEY, "r1")]);

        let response = fx.client.fetch("/posts", RequestOptions::get()).await.unwrap();

        assert_eq!(response.status, 401);
        assert_eq!(fx.http.request_count(), 0);
        assert_eq!(fx.shell.navigations(), vec![Route::Login]);
        let creds = fx.client.token_store().get_tokens().await.unwrap();
        assert!(creds.is_empty());
    }

    #[tokio::test]
    async fn test_empty_string_tokens_count_as_missing() {
        let fx = fixture(&[(ACCESS_TOKEN_KEY, ""), (REFRESH_TOKEN_KEY, "")]);

        let response = fx.client.fetch("/posts", RequestOptions::get()).await.unwrap();

        assert_eq!(response.status, 401);
        assert_eq!(fx.http.request_count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_attaches_bearer_token() {
        let fresh = jwt_expiring_in(3600);
        let fx = fixture(&[(ACCESS_TOKEN_KEY, &fresh), (REFRESH_TOKEN_KEY, "r1")]);
        fx.http.push_response(200, json!({ "ok": true }));

        let response = fx.client.fetch("/posts", RequestOptions::get()).await.unwrap();
        assert_eq!(response.status, 200);

        let requests = fx.http.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "https://invid.au/mobile/posts");
        assert_eq!(
            requests[0].headers.get("Authorization"),
            Some(&format!("Bearer {}", fresh))
        );
    }

    #[tokio::test]
    async fn test_401_refreshes_once_and_retries_with_new_token() {
        let fresh = jwt_expiring_in(3600);
        let fx = fixture(&[(ACCESS_TOKEN_KEY, &fresh), (REFRESH_TOKEN_KEY, "r1")]);
        fx.http.push_response(401, json!({ "error": "expired" }));
        fx.http
            .push_response(200, json!({ "accessToken": "a2", "refreshToken": "r2" }));
        fx.http.push_response(200, json!({ "ok": true }));

        let response = fx.client.fetch("/posts", RequestOptions::get()).await.unwrap();
        assert_eq!(response.status, 200);

        let requests = fx.http.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests[1].url.ends_with("/auth/refresh"));
        assert_eq!(
            requests[2].headers.get("Authorization").map(String::as_str),
            Some("Bearer a2")
        );

        // The new pair is persisted, not just used in flight.
        let creds = fx.client.token_store().get_tokens().await.unwrap();
        assert_eq!(creds.access_token.as_deref(), Some("a2"));
        assert_eq!(creds.refresh_token.as_deref(), Some("r2"));
    }

    #[tokio::test]
    async fn test_second_401_is_returned_to_caller() {
        let fresh = jwt_expiring_in(3600);
        let fx = fixture(&[(ACCESS_TOKEN_KEY, &fresh), (REFRESH_TOKEN_KEY, "r1")]);
        fx.http.push_response(401, json!({ "error": "expired" }));
        fx.http.push_response(200, json!({ "accessToken": "a2" }));
        fx.http.push_response(401, json!({ "error": "still no" }));

        let response = fx.client.fetch("/posts", RequestOptions::get()).await.unwrap();
        assert_eq!(response.status, 401);
        // No second refresh attempt.
        assert_eq!(fx.http.count_requests_to("/auth/refresh"), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_tears_down_session() {
        let fresh = jwt_expiring_in(3600);
        let fx = fixture(&[(ACCESS_TOKEN_KEY, &fresh), (REFRESH_TOKEN_KEY, "r1")]);
        fx.http.push_response(401, json!({ "error": "expired" }));
        fx.http.push_response(403, json!({ "error": "revoked" }));

        let response = fx.client.fetch("/posts", RequestOptions::get()).await.unwrap();
        assert_eq!(response.status, 401);
        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body, json!({ "error": "authentication failed" }));

        let creds = fx.client.token_store().get_tokens().await.unwrap();
        assert!(creds.is_empty());
        assert_eq!(fx.shell.navigations(), vec![Route::Login]);
        assert_eq!(
            fx.shell.alerts(),
            vec![(
                SESSION_EXPIRED_TITLE.to_string(),
                SESSION_EXPIRED_MESSAGE.to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_expired_access_refreshes_before_request() {
        let stale = jwt_expiring_in(-60);
        let fx = fixture(&[(ACCESS_TOKEN_KEY, &stale), (REFRESH_TOKEN_KEY, "r1")]);
        fx.http
            .push_response(200, json!({ "accessToken": "a2", "refreshToken": "r2" }));
        fx.http.push_response(200, json!({ "ok": true }));

        let response = fx.client.fetch("/posts", RequestOptions::get()).await.unwrap();
        assert_eq!(response.status, 200);

        let requests = fx.http.requests();
        assert!(requests[0].url.ends_with("/auth/refresh"));
        assert_eq!(
            requests[1].headers.get("Authorization").map(String::as_str),
            Some("Bearer a2")
        );
    }

    #[tokio::test]
    async fn test_both_tokens_expired_tears_down_without_network() {
        let stale_access = jwt_expiring_in(-60);
        let stale_refresh = jwt_expiring_in(-30);
        let fx = fixture(&[
            (ACCESS_TOKEN_KEY, &stale_access),
            (REFRESH_TOKEN_KEY, &stale_refresh),
        ]);

        let response = fx.client.fetch("/posts", RequestOptions::get()).await.unwrap();
        assert_eq!(response.status, 401);
        assert_eq!(fx.http.request_count(), 0);
        assert_eq!(fx.shell.navigations(), vec![Route::Login]);
    }

    #[tokio::test]
    async fn test_initial_transport_error_propagates() {
        let fresh = jwt_expiring_in(3600);
        let fx = fixture(&[(ACCESS_TOKEN_KEY, &fresh), (REFRESH_TOKEN_KEY, "r1")]);
        fx.http.push_error("connection reset");

        let err = fx.client.fetch("/posts", RequestOptions::get()).await.unwrap_err();
        assert!(matches!(err, AuthError::Network(_)));
        // Transport failures never tear down the session.
        assert!(fx.shell.navigations().is_empty());
    }

    #[tokio::test]
    async fn test_multipart_body_has_no_json_content_type() {
        let fresh = jwt_expiring_in(3600);
        let fx = fixture(&[(ACCESS_TOKEN_KEY, &fresh), (REFRESH_TOKEN_KEY, "r1")]);
        fx.http.push_response(200, json!({ "ok": true }));

        let options =
            RequestOptions::multipart(HttpMethod::Post, Bytes::from_static(b"--boundary--"))
                .header("Content-Type", "multipart/form-data; boundary=boundary");
        fx.client.fetch("/media", options).await.unwrap();

        let requests = fx.http.requests();
        assert_eq!(
            requests[0].headers.get("Content-Type").map(String::as_str),
            Some("multipart/form-data; boundary=boundary")
        );
        assert!(requests[0].body.is_some());
    }

    #[tokio::test]
    async fn test_fetch_raw_skips_auth_and_prefix() {
        let fx = fixture(&[]);
        fx.http.push_response(200, json!({ "ok": true }));

        fx.client
            .fetch_raw("https://cdn.example.com/file.bin", RequestOptions::get())
            .await
            .unwrap();

        let requests = fx.http.requests();
        assert_eq!(requests[0].url, "https://cdn.example.com/file.bin");
        assert!(requests[0].headers.get("Authorization").is_none());
    }

    /// Routes requests by URL and bearer token so concurrent interleavings
    /// stay deterministic.
    struct RoutedHttpClient {
        refresh_calls: AtomicUsize,
    }

    #[async_trait]
    impl HttpClient for RoutedHttpClient {
        async fn execute(
            &self,
            request: HttpRequest,
        ) -> bridge_traits::error::Result<HttpResponse> {
            if request.url.contains("/auth/refresh") {
                self.refresh_calls.fetch_add(1, Ordering::SeqCst);
                return Ok(crate::testing::response(
                    200,
                    json!({ "accessToken": "fresh", "refreshToken": "r2" }),
                ));
            }
            let authorized = request.headers.get("Authorization").map(String::as_str)
                == Some("Bearer fresh");
            if authorized {
                Ok(crate::testing::response(200, json!({ "ok": true })))
            } else {
                Ok(crate::testing::response(401, json!({ "error": "expired" })))
            }
        }
    }

    #[tokio::test]
    async fn test_concurrent_401s_trigger_one_refresh() {
        let access = jwt_expiring_in(3600);
        let http = Arc::new(RoutedHttpClient {
            refresh_calls: AtomicUsize::new(0),
        });
        let tokens = TokenStore::new(Arc::new(MemoryStore::with_entries(&[
            (ACCESS_TOKEN_KEY, &access),
            (REFRESH_TOKEN_KEY, "r1"),
        ])));
        let client = ApiClient::new(
            http.clone(),
            tokens,
            Arc::new(RecordingShell::default()),
            ApiConfig::default(),
            EventBus::default(),
        );

        let (a, b, c) = tokio::join!(
            client.fetch("/posts", RequestOptions::get()),
            client.fetch("/events", RequestOptions::get()),
            client.fetch("/profile", RequestOptions::get()),
        );

        assert_eq!(a.unwrap().status, 200);
        assert_eq!(b.unwrap().status, 200);
        assert_eq!(c.unwrap().status, 200);
        assert_eq!(http.refresh_calls.load(Ordering::SeqCst), 1);

        let creds = client.token_store().get_tokens().await.unwrap();
        assert_eq!(creds.access_token.as_deref(), Some("fresh"));
        assert_eq!(creds.refresh_token.as_deref(), Some("r2"));
    }
}
