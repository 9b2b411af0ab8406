//! Core data types for the session layer.
//!
//! Wire DTOs use camelCase field names matching the platform API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored credential pair.
///
/// Either field may be absent independently; partial states occur around
/// refresh failures and interrupted writes.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Credentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Credentials {
    pub fn new(access_token: Option<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token,
            refresh_token,
        }
    }

    /// True when no token of either kind is stored.
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

// Token values never appear in logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// The authenticated user's profile as returned by the server.
///
/// Only the fields the session layer reads are typed; everything else is
/// preserved verbatim in `extra` so it round-trips through storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Everything the store holds for one session.
#[derive(Debug, Clone, Default)]
pub struct StoredSession {
    pub credentials: Credentials,
    pub user: Option<UserRecord>,
}

/// Notification emitted whenever the persisted credentials change.
///
/// Carried over an in-process broadcast channel; see
/// [`TokenStore::subscribe`](crate::token_store::TokenStore::subscribe).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenChange {
    /// Tokens were written. Fields reflect the new stored state.
    Updated {
        access_token: Option<String>,
        refresh_token: Option<String>,
    },
    /// All session data was removed.
    Cleared,
}

/// Body of `POST /auth/refresh`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Successful response from `POST /auth/refresh`.
///
/// The server may rotate the refresh token; when it does not, the caller
/// keeps the one it sent.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Body of `POST /auth/login`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Body of `POST /auth/verify-2fa`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorRequest<'a> {
    pub ticket: &'a str,
    pub code: &'a str,
}

/// Status sentinel the login endpoint returns when a second factor is
/// required before tokens are issued.
pub const TWOFA_REQUIRED: &str = "TWOFA_REQUIRED";

/// Raw response body shared by `/auth/login` and `/auth/verify-2fa`.
///
/// The endpoint either issues a full credential set or a two-factor
/// challenge; [`LoginOutcome`] is the validated form.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub ticket: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<UserRecord>,
}

/// Validated result of a login or two-factor verification.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// The server wants a second factor. `ticket` is passed back with the
    /// code; no session state has changed.
    TwoFactorRequired { ticket: String },
    /// A complete session was issued and persisted.
    Authenticated { user: UserRecord },
}
