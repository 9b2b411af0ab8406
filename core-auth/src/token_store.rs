//! Durable token and user persistence.
//!
//! Wraps a [`KeyValueStore`] with the fixed keys the session layer uses and
//! broadcasts a [`TokenChange`] after every successful write, so in-memory
//! mirrors of the session can stay consistent with disk.

use std::sync::Arc;

use bridge_traits::KeyValueStore;
use tokio::sync::broadcast;

use crate::error::Result;
use crate::types::{Credentials, StoredSession, TokenChange, UserRecord};

/// Storage key for the short-lived access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Storage key for the long-lived refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
/// Storage key for the serialized user record.
pub const USER_KEY: &str = "user";

const CHANGE_BUFFER_SIZE: usize = 16;

/// Persistent store for the credential pair and user record.
///
/// Cloning is cheap; clones share the backing store and the change channel.
/// Writes notify subscribers only after the store write succeeded, so an
/// observer acting on a change always sees it reflected on re-read.
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
    changes: broadcast::Sender<TokenChange>,
}

impl TokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER_SIZE);
        Self { store, changes }
    }

    /// Subscribe to credential changes. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<TokenChange> {
        self.changes.subscribe()
    }

    /// Persist a complete session (both tokens and the user record) as one
    /// batch.
    pub async fn save_session(
        &self,
        access_token: &str,
        refresh_token: &str,
        user: &UserRecord,
    ) -> Result<()> {
        let user_json = serde_json::to_string(user)
            .map_err(|e| crate::error::AuthError::Storage(format!("User serialization: {}", e)))?;

        self.store
            .multi_set(&[
                (ACCESS_TOKEN_KEY, access_token),
                (REFRESH_TOKEN_KEY, refresh_token),
                (USER_KEY, &user_json),
            ])
            .await?;

        tracing::debug!("Session persisted");
        self.notify(TokenChange::Updated {
            access_token: Some(access_token.to_string()),
            refresh_token: Some(refresh_token.to_string()),
        });
        Ok(())
    }

    /// Persist new token values after a refresh.
    ///
    /// When the server did not rotate the refresh token, `refresh_token` is
    /// `None` and `fallback_refresh_token` (the one used for the refresh
    /// call) is kept, so the stored pair never loses its refresh token to a
    /// non-rotating server.
    pub async fn save_tokens(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
        fallback_refresh_token: Option<&str>,
    ) -> Result<()> {
        let effective_refresh = refresh_token.or(fallback_refresh_token);

        match effective_refresh {
            Some(refresh) => {
                self.store
                    .multi_set(&[(ACCESS_TOKEN_KEY, access_token), (REFRESH_TOKEN_KEY, refresh)])
                    .await?;
            }
            None => {
                self.store.set_item(ACCESS_TOKEN_KEY, access_token).await?;
            }
        }

        self.notify(TokenChange::Updated {
            access_token: Some(access_token.to_string()),
            refresh_token: effective_refresh.map(str::to_string),
        });
        Ok(())
    }

    /// Read the stored credential pair.
    pub async fn get_tokens(&self) -> Result<Credentials> {
        let values = self
            .store
            .multi_get(&[ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY])
            .await?;
        let mut values = values.into_iter();
        Ok(Credentials::new(
            values.next().flatten(),
            values.next().flatten(),
        ))
    }

    /// Read the full stored session.
    ///
    /// A user record that no longer parses is dropped and removed from the
    /// store; the tokens are still returned.
    pub async fn load_session(&self) -> Result<StoredSession> {
        let values = self
            .store
            .multi_get(&[ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY])
            .await?;
        let mut values = values.into_iter();
        let credentials = Credentials::new(values.next().flatten(), values.next().flatten());
        let user_json = values.next().flatten();

        let user = match user_json {
            Some(json) => match serde_json::from_str::<UserRecord>(&json) {
                Ok(user) => Some(user),
                Err(e) => {
                    tracing::warn!(error = %e, "Stored user record is corrupt, discarding");
                    self.store.remove_item(USER_KEY).await?;
                    None
                }
            },
            None => None,
        };

        Ok(StoredSession { credentials, user })
    }

    /// Remove all session data.
    pub async fn clear_session(&self) -> Result<()> {
        self.store
            .multi_remove(&[ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY])
            .await?;
        tracing::debug!("Session cleared");
        self.notify(TokenChange::Cleared);
        Ok(())
    }

    fn notify(&self, change: TokenChange) {
        // No subscribers is fine.
        let _ = self.changes.send(change);
    }
}
