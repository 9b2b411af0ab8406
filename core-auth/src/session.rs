//! Session lifecycle management.
//!
//! Owns the in-memory view of the session (phase, user, credential mirror)
//! and drives the transitions around it: restoring a persisted session at
//! startup, logging in (including the two-factor handshake), proactive
//! refresh when the app returns to the foreground, and teardown.
//!
//! Startup and background recovery failures sign the user out silently; only
//! failures during active use raise an alert, and those are handled by
//! [`ApiClient`](crate::client::ApiClient).

use std::sync::Arc;

use bridge_traits::{AppShell, LifecycleState, Route};
use core_runtime::{EventBus, SessionEvent};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::client::ApiClient;
use crate::error::{AuthError, Result};
use crate::jwt::is_token_expired;
use crate::types::{LoginOutcome, LoginResponse, TokenChange, UserRecord, TWOFA_REQUIRED};

/// Event message when a persisted session could not be restored.
pub const RESTORE_FAILED_MESSAGE: &str =
    "We could not restore your session. Please sign in again.";

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Nothing has been read from storage yet.
    Uninitialized,
    /// Startup restore is in progress.
    Restoring,
    /// A session exists and the access token was usable when last checked.
    Authenticated,
    /// A proactive refresh is in flight; the session is still considered
    /// live.
    Refreshing,
    /// No session.
    Unauthenticated,
}

/// In-memory mirror of the session.
///
/// Kept consistent with the token store by [`SessionManager::spawn_token_watcher`].
#[derive(Debug, Clone)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub user: Option<UserRecord>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// True while restore is running; hosts keep the splash screen up.
    pub is_loading: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Uninitialized,
            user: None,
            access_token: None,
            refresh_token: None,
            is_loading: false,
        }
    }
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(
            self.phase,
            SessionPhase::Authenticated | SessionPhase::Refreshing
        )
    }
}

/// Drives session transitions and owns the session state.
pub struct SessionManager {
    client: Arc<ApiClient>,
    shell: Arc<dyn AppShell>,
    events: EventBus,
    state: RwLock<SessionState>,
}

impl SessionManager {
    pub fn new(client: Arc<ApiClient>, shell: Arc<dyn AppShell>, events: EventBus) -> Self {
        Self {
            client,
            shell,
            events,
            state: RwLock::new(SessionState::default()),
        }
    }

    /// Snapshot of the current session state.
    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// Restore a persisted session at startup.
    ///
    /// Never fails outward: every failure path lands in
    /// `SessionPhase::Unauthenticated` with storage cleared, silently. Only
    /// storage errors propagate.
    pub async fn restore(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.phase = SessionPhase::Restoring;
            state.is_loading = true;
        }

        let session = self.client.token_store().load_session().await?;
        let creds = &session.credentials;

        if creds.is_empty() {
            tracing::info!("No persisted session");
            self.set_unauthenticated().await;
            return Ok(());
        }

        if !is_token_expired(creds.access_token.as_deref(), "access") {
            tracing::info!("Persisted session restored");
            self.set_authenticated(session.user.clone(), creds.access_token.clone(), creds.refresh_token.clone())
                .await;
            let _ = self.events.emit(SessionEvent::SignedIn {
                username: session.user.and_then(|u| u.username),
            });
            return Ok(());
        }

        if is_token_expired(creds.refresh_token.as_deref(), "refresh") {
            tracing::info!("Persisted session fully expired");
            self.force_logout(RESTORE_FAILED_MESSAGE).await?;
            return Ok(());
        }

        match self.client.force_refresh().await {
            Ok(access) => {
                let creds = self.client.token_store().get_tokens().await?;
                tracing::info!("Persisted session restored via refresh");
                self.set_authenticated(session.user.clone(), Some(access), creds.refresh_token)
                    .await;
                let _ = self.events.emit(SessionEvent::SignedIn {
                    username: session.user.and_then(|u| u.username),
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session restore refresh failed");
                self.force_logout(RESTORE_FAILED_MESSAGE).await?;
            }
        }
        Ok(())
    }

    /// React to an app lifecycle transition.
    ///
    /// On return to the foreground with an expired access token, refreshes
    /// proactively so the first user-triggered request does not eat the
    /// 401 round trip. A failed refresh signs the user out silently.
    pub async fn handle_lifecycle_change(
        &self,
        previous: LifecycleState,
        next: LifecycleState,
    ) -> Result<()> {
        if !previous.resumed_to(next) {
            return Ok(());
        }
        if !self.state.read().await.is_authenticated() {
            return Ok(());
        }

        let creds = self.client.token_store().get_tokens().await?;
        if !is_token_expired(creds.access_token.as_deref(), "access") {
            return Ok(());
        }

        if is_token_expired(creds.refresh_token.as_deref(), "refresh") {
            tracing::info!("Session expired while backgrounded");
            self.force_logout(RESTORE_FAILED_MESSAGE).await?;
            return Ok(());
        }

        tracing::debug!("Refreshing access token after foreground resume");
        self.state.write().await.phase = SessionPhase::Refreshing;
        match self.client.force_refresh().await {
            Ok(_) => {
                self.state.write().await.phase = SessionPhase::Authenticated;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Foreground refresh failed");
                self.force_logout(RESTORE_FAILED_MESSAGE).await?;
            }
        }
        Ok(())
    }

    /// Log in with username and password.
    ///
    /// A two-factor challenge leaves all state untouched; the caller holds
    /// the ticket and finishes with [`verify_two_factor`](Self::verify_two_factor).
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome> {
        let response = self.client.auth_api().login(username, password).await?;
        self.complete_login(response, true).await
    }

    /// Complete a pending two-factor login.
    pub async fn verify_two_factor(&self, ticket: &str, code: &str) -> Result<LoginOutcome> {
        let response = self
            .client
            .auth_api()
            .verify_two_factor(ticket, code)
            .await?;
        // A second challenge here means the server is confused; treat it as
        // an invalid response rather than looping.
        self.complete_login(response, false).await
    }

    /// Sign out.
    ///
    /// The server is told first, best effort; local teardown happens whether
    /// or not it answered.
    pub async fn logout(&self) -> Result<()> {
        self.logout_with_reason(None).await
    }

    /// Sign out and, when a reason is given, tell the user why after the
    /// teardown.
    pub async fn logout_with_reason(&self, reason: Option<&str>) -> Result<()> {
        let creds = self.client.token_store().get_tokens().await?;
        if let Some(access) = creds.access_token.as_deref() {
            if let Err(e) = self.client.auth_api().logout(access).await {
                tracing::warn!(error = %e, "Server logout failed, clearing locally");
            }
        }

        self.client.token_store().clear_session().await?;
        self.set_unauthenticated().await;
        let _ = self.events.emit(SessionEvent::SignedOut);
        self.shell.navigate(Route::Login);
        if let Some(reason) = reason {
            self.shell.alert("Signed out", reason);
        }
        Ok(())
    }

    /// Keep the in-memory credential mirror aligned with the store.
    ///
    /// Runs until the token store is dropped. Changes made by the request
    /// executor (401-triggered refreshes, teardowns) land in the state
    /// without the manager being on that code path.
    pub fn spawn_token_watcher(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let mut changes = manager.client.token_store().subscribe();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(TokenChange::Updated {
                        access_token,
                        refresh_token,
                    }) => {
                        let mut state = manager.state.write().await;
                        state.access_token = access_token;
                        if refresh_token.is_some() {
                            state.refresh_token = refresh_token;
                        }
                    }
                    Ok(TokenChange::Cleared) => {
                        let mut state = manager.state.write().await;
                        *state = SessionState {
                            phase: SessionPhase::Unauthenticated,
                            ..SessionState::default()
                        };
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "Token watcher lagged, resyncing from store");
                        if let Ok(creds) = manager.client.token_store().get_tokens().await {
                            let mut state = manager.state.write().await;
                            state.access_token = creds.access_token;
                            state.refresh_token = creds.refresh_token;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    async fn complete_login(
        &self,
        response: LoginResponse,
        allow_two_factor: bool,
    ) -> Result<LoginOutcome> {
        if response.status.as_deref() == Some(TWOFA_REQUIRED) {
            if !allow_two_factor {
                return Err(AuthError::InvalidLoginResponse(
                    "Two-factor challenge in response to a verification".to_string(),
                ));
            }
            let ticket = response.ticket.ok_or_else(|| {
                AuthError::InvalidLoginResponse("Two-factor challenge without a ticket".to_string())
            })?;
            tracing::info!("Two-factor challenge received");
            let _ = self.events.emit(SessionEvent::TwoFactorChallenge);
            return Ok(LoginOutcome::TwoFactorRequired { ticket });
        }

        let (access, refresh, user) = match (
            response.access_token,
            response.refresh_token,
            response.user,
        ) {
            (Some(a), Some(r), Some(u)) if !a.is_empty() && !r.is_empty() => (a, r, u),
            _ => {
                return Err(AuthError::InvalidLoginResponse(
                    "Login response missing token or user".to_string(),
                ))
            }
        };

        self.client
            .token_store()
            .save_session(&access, &refresh, &user)
            .await?;
        self.set_authenticated(Some(user.clone()), Some(access), Some(refresh))
            .await;
        tracing::info!("Login complete");
        let _ = self.events.emit(SessionEvent::SignedIn {
            username: user.username.clone(),
        });
        self.shell.navigate(Route::Home);
        Ok(LoginOutcome::Authenticated { user })
    }

    /// Silent teardown: clear storage and land on login without an alert.
    async fn force_logout(&self, message: &str) -> Result<()> {
        self.client.token_store().clear_session().await?;
        self.set_unauthenticated().await;
        let _ = self.events.emit(SessionEvent::SessionExpired {
            message: message.to_string(),
        });
        let _ = self.events.emit(SessionEvent::SignedOut);
        self.shell.navigate(Route::Login);
        Ok(())
    }

    async fn set_authenticated(
        &self,
        user: Option<UserRecord>,
        access_token: Option<String>,
        refresh_token: Option<String>,
    ) {
        let mut state = self.state.write().await;
        *state = SessionState {
            phase: SessionPhase::Authenticated,
            user,
            access_token,
            refresh_token,
            is_loading: false,
        };
    }

    async fn set_unauthenticated(&self) {
        let mut state = self.state.write().await;
        *state = SessionState {
            phase: SessionPhase::Unauthenticated,
            ..SessionState::default()
        };
    }
}
