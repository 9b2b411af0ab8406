//! # Native Bridge Adapters
//!
//! Concrete implementations of the `bridge-traits` capabilities for native
//! targets:
//!
//! - [`ReqwestHttpClient`] - `HttpClient` over reqwest with pooling and TLS
//! - [`JsonFileStore`] - `KeyValueStore` persisted as a JSON document
//!
//! Navigation ([`AppShell`](bridge_traits::AppShell)) has no native adapter
//! here; it is implemented by the embedding UI layer.

pub mod http;
pub mod storage;

pub use http::ReqwestHttpClient;
pub use storage::JsonFileStore;
