//! # Session Event Bus
//!
//! Broadcast channel for session lifecycle events, built on
//! `tokio::sync::broadcast`. The auth core publishes every state transition
//! here so the UI layer (and diagnostics panels) can observe the session
//! without owning it.
//!
//! ## Usage
//!
//! ```
//! use core_runtime::events::{EventBus, SessionEvent};
//!
//! let bus = EventBus::new(100);
//! let mut rx = bus.subscribe();
//! bus.emit(SessionEvent::SignedOut).ok();
//! ```
//!
//! Subscribers that fall behind receive `RecvError::Lagged` and can keep
//! consuming; `RecvError::Closed` signals shutdown.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Events related to the authentication session.
///
/// Token values are never carried in events; subscribers that need
/// credentials read them through the token store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SessionEvent {
    /// A login (password or two-factor) completed and a session exists.
    SignedIn {
        /// Username of the authenticated user, when known.
        username: Option<String>,
    },
    /// The server requires a second factor to complete login.
    TwoFactorChallenge,
    /// The local session was cleared.
    SignedOut,
    /// An access-token refresh started.
    TokenRefreshing,
    /// An access-token refresh completed and new credentials are persisted.
    TokenRefreshed,
    /// The session could not be recovered and the user was signed out.
    SessionExpired {
        /// Human-readable reason, suitable for display.
        message: String,
    },
}

impl SessionEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &'static str {
        match self {
            SessionEvent::SignedIn { .. } => "User signed in",
            SessionEvent::TwoFactorChallenge => "Two-factor challenge issued",
            SessionEvent::SignedOut => "User signed out",
            SessionEvent::TokenRefreshing => "Refreshing access token",
            SessionEvent::TokenRefreshed => "Access token refreshed",
            SessionEvent::SessionExpired { .. } => "Session expired",
        }
    }
}

/// Central broadcast channel for session events.
///
/// Cloning the bus is cheap; all clones share the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none. Publishers generally ignore the result: a
    /// session transition is valid whether or not anyone is listening.
    pub fn emit(&self, event: SessionEvent) -> Result<usize, SendError<SessionEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber receiving all future events.
    ///
    /// Past events are not replayed. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}
