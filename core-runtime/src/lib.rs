//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the mobile session core:
//! - Logging and tracing infrastructure
//! - API configuration
//! - Session event bus
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the auth core depends on. It
//! establishes the logging conventions and event broadcasting mechanism used
//! throughout the system.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::ApiConfig;
pub use error::{Error, Result};
pub use events::{EventBus, SessionEvent};
