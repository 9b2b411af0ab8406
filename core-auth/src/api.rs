//! Auth endpoint client.
//!
//! Thin typed layer over the bridge HTTP client for the four auth endpoints:
//! refresh, login, two-factor verification and logout. It resolves paths
//! through [`ApiConfig`] and validates response shapes; retry and session
//! policy live in [`crate::client`] and [`crate::session`].

use std::sync::Arc;

use bridge_traits::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use core_runtime::ApiConfig;

use crate::error::{AuthError, Result};
use crate::types::{
    LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, TwoFactorRequest,
};

pub const REFRESH_PATH: &str = "/auth/refresh";
pub const LOGIN_PATH: &str = "/auth/login";
pub const VERIFY_2FA_PATH: &str = "/auth/verify-2fa";
pub const LOGOUT_PATH: &str = "/auth/logout";

#[derive(Clone)]
pub struct AuthApi {
    http: Arc<dyn HttpClient>,
    config: ApiConfig,
}

impl AuthApi {
    pub fn new(http: Arc<dyn HttpClient>, config: ApiConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// Any non-2xx status, and a 2xx body without an access token, is
    /// `RefreshFailed`; callers treat that as a dead session.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse> {
        tracing::debug!("Requesting access token refresh");
        let request = HttpRequest::new(HttpMethod::Post, self.config.api_url(REFRESH_PATH))
            .json(&RefreshRequest { refresh_token })?;

        let response = self.http.execute(request).await.map_err(transport_error)?;
        if !response.is_success() {
            return Err(AuthError::RefreshFailed {
                status: response.status,
                message: error_message(&response),
            });
        }

        let parsed: RefreshResponse = response.json().map_err(|e| AuthError::RefreshFailed {
            status: response.status,
            message: format!("Unreadable refresh response: {}", e),
        })?;

        if parsed.access_token.as_deref().map_or(true, str::is_empty) {
            return Err(AuthError::RefreshFailed {
                status: response.status,
                message: "Refresh response missing access token".to_string(),
            });
        }

        tracing::info!("Access token refreshed");
        Ok(parsed)
    }

    /// Submit username and password.
    ///
    /// A 2xx response is returned unvalidated; the caller decides between a
    /// two-factor challenge and a full session.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let request = HttpRequest::new(HttpMethod::Post, self.config.api_url(LOGIN_PATH))
            .json(&LoginRequest { username, password })?;
        self.submit_login(request).await
    }

    /// Submit the second-factor code for a pending login ticket.
    pub async fn verify_two_factor(&self, ticket: &str, code: &str) -> Result<LoginResponse> {
        let request = HttpRequest::new(HttpMethod::Post, self.config.api_url(VERIFY_2FA_PATH))
            .json(&TwoFactorRequest { ticket, code })?;
        self.submit_login(request).await
    }

    /// Tell the server to invalidate the session.
    ///
    /// Callers treat failure here as non-fatal: local teardown proceeds
    /// whether or not the server heard about it.
    pub async fn logout(&self, access_token: &str) -> Result<()> {
        let request = HttpRequest::new(HttpMethod::Post, self.config.api_url(LOGOUT_PATH))
            .bearer_token(access_token);

        let response = self.http.execute(request).await.map_err(transport_error)?;
        if !response.is_success() {
            return Err(AuthError::Network(format!(
                "Logout rejected with status {}",
                response.status
            )));
        }
        Ok(())
    }

    async fn submit_login(&self, request: HttpRequest) -> Result<LoginResponse> {
        let response = self.http.execute(request).await.map_err(transport_error)?;
        if !response.is_success() {
            return Err(AuthError::LoginFailed {
                status: response.status,
                message: error_message(&response),
            });
        }

        response
            .json()
            .map_err(|e| AuthError::InvalidLoginResponse(e.to_string()))
    }
}

fn transport_error(e: bridge_traits::BridgeError) -> AuthError {
    AuthError::Network(e.to_string())
}

/// Best-effort human-readable message from an error response body.
fn error_message(response: &HttpResponse) -> String {
    if let Ok(value) = response.json::<serde_json::Value>() {
        for key in ["error", "message"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
    }
    response
        .text()
        .ok()
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "No error detail".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedHttpClient;
    use serde_json::json;

    fn api(http: Arc<ScriptedHttpClient>) -> AuthApi {
        AuthApi::new(http, ApiConfig::default())
    }

    #[tokio::test]
    async fn test_refresh_hits_mobile_endpoint_with_token_body() {
        let http = Arc::new(ScriptedHttpClient::new());
        http.push_response(200, json!({ "accessToken": "a2", "refreshToken": "r2" }));

        let result = api(http.clone()).refresh("r1").await.unwrap();
        assert_eq!(result.access_token.as_deref(), Some("a2"));
        assert_eq!(result.refresh_token.as_deref(), Some("r2"));

        let requests = http.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "https://invid.au/mobile/auth/refresh");
        let body: serde_json::Value =
            serde_json::from_slice(requests[0].body.as_ref().unwrap()).unwrap();
        assert_eq!(body, json!({ "refreshToken": "r1" }));
    }

    #[tokio::test]
    async fn test_refresh_rejection_carries_status_and_message() {
        let http = Arc::new(ScriptedHttpClient::new());
        http.push_response(403, json!({ "error": "refresh token revoked" }));

        let err = api(http).refresh("r1").await.unwrap_err();
        match err {
            AuthError::RefreshFailed { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "refresh token revoked");
            }
            other => panic!("Unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_refresh_without_access_token_is_a_failure() {
        let http = Arc::new(ScriptedHttpClient::new());
        http.push_response(200, json!({ "refreshToken": "r2" }));

        let err = api(http).refresh("r1").await.unwrap_err();
        assert!(matches!(err, AuthError::RefreshFailed { status: 200, .. }));
    }

    #[tokio::test]
    async fn test_refresh_transport_error_is_network() {
        let http = Arc::new(ScriptedHttpClient::new());
        http.push_error("connection reset");

        let err = api(http).refresh("r1").await.unwrap_err();
        assert!(matches!(err, AuthError::Network(_)));
    }

    #[tokio::test]
    async fn test_login_failure_surfaces_server_message() {
        let http = Arc::new(ScriptedHttpClient::new());
        http.push_response(401, json!({ "message": "bad password" }));

        let err = api(http).login("kaz", "nope").await.unwrap_err();
        match err {
            AuthError::LoginFailed { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "bad password");
            }
            other => panic!("Unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_logout_sends_bearer_token() {
        let http = Arc::new(ScriptedHttpClient::new());
        http.push_response(200, json!({}));

        api(http.clone()).logout("access-1").await.unwrap();

        let requests = http.requests();
        assert_eq!(requests[0].url, "https://invid.au/mobile/auth/logout");
        assert_eq!(
            requests[0].headers.get("Authorization").map(String::as_str),
            Some("Bearer access-1")
        );
    }
}
