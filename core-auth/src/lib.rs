//! # Authentication & Session Core
//!
//! Credential lifecycle for the mobile app: durable token storage, JWT
//! expiry inspection, the refresh protocol, an authenticated request
//! executor with automatic 401 recovery, and the session state machine the
//! UI observes.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ SessionManager (restore, login, lifecycle)  │
//! ├─────────────────────────────────────────────┤
//! │ ApiClient (bearer attach, 401 refresh+retry)│
//! ├──────────────┬──────────────────────────────┤
//! │ AuthApi      │ TokenStore (+ change feed)   │
//! ├──────────────┴──────────────────────────────┤
//! │ bridge_traits::{HttpClient, KeyValueStore}  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! All refresh attempts in the process funnel through one single-flight
//! gate, so any number of concurrent 401s produce exactly one refresh call.

pub mod api;
pub mod client;
pub mod error;
pub mod jwt;
pub mod session;
pub mod token_store;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use api::AuthApi;
pub use client::{ApiClient, RequestBody, RequestOptions};
pub use error::{AuthError, Result};
pub use jwt::is_token_expired;
pub use session::{SessionManager, SessionPhase, SessionState};
pub use token_store::TokenStore;
pub use types::{
    Credentials, LoginOutcome, StoredSession, TokenChange, UserRecord,
};
