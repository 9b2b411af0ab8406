//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the session core and the host
//! application. Each trait represents a capability the core requires but that
//! is implemented differently per platform (iOS, Android, desktop test
//! harness).
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP request execution
//! - [`KeyValueStore`](storage::KeyValueStore) - Durable string key-value persistence
//! - [`AppShell`](shell::AppShell) - Navigation and user-visible alerts
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Platform
//! implementations should convert platform-specific errors to `BridgeError`
//! and provide actionable messages.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds so implementations can be
//! shared across async tasks behind `Arc`.

pub mod error;
pub mod http;
pub mod shell;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use shell::{AppShell, LifecycleState, Route};
pub use storage::KeyValueStore;
