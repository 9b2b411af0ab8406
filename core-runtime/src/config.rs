//! # API Configuration
//!
//! Holds the base URL of the platform API and resolves request paths against
//! it. Every mobile endpoint lives under a fixed `/mobile` prefix on the
//! server, so path resolution always inserts it.
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::ApiConfig;
//!
//! let config = ApiConfig::new("https://invid.au").unwrap();
//! assert_eq!(config.api_url("/auth/refresh"), "https://invid.au/mobile/auth/refresh");
//! // Leading slash is optional
//! assert_eq!(config.api_url("auth/refresh"), "https://invid.au/mobile/auth/refresh");
//! ```

use crate::error::{Error, Result};
use url::Url;

/// Default production API host.
const DEFAULT_API_BASE: &str = "https://invid.au";

/// Path prefix for all mobile-client endpoints.
const MOBILE_PREFIX: &str = "/mobile";

/// Environment variable overriding the API base URL.
const API_URL_ENV: &str = "MOBILE_API_URL";

/// API endpoint configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    base_url: Url,
}

impl ApiConfig {
    /// Create a configuration for the given base URL.
    ///
    /// The URL must be absolute (scheme + host). A trailing slash is
    /// stripped so path resolution is uniform.
    pub fn new(base_url: &str) -> Result<Self> {
        let trimmed = base_url.trim_end_matches('/');
        let parsed = Url::parse(trimmed)
            .map_err(|e| Error::Config(format!("Invalid API base URL '{}': {}", base_url, e)))?;

        if parsed.host_str().is_none() {
            return Err(Error::Config(format!(
                "API base URL '{}' has no host",
                base_url
            )));
        }

        Ok(Self { base_url: parsed })
    }

    /// Create a configuration from the `MOBILE_API_URL` environment variable,
    /// falling back to the production host.
    pub fn from_env() -> Result<Self> {
        match std::env::var(API_URL_ENV) {
            Ok(value) if !value.trim().is_empty() => Self::new(&value),
            _ => Self::new(DEFAULT_API_BASE),
        }
    }

    /// Resolve a request path to a full endpoint URL under the mobile prefix.
    ///
    /// Paths are accepted with or without a leading `/`.
    pub fn api_url(&self, path: &str) -> String {
        let normalized = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        format!(
            "{}{}{}",
            self.base_url.as_str().trim_end_matches('/'),
            MOBILE_PREFIX,
            normalized
        )
    }

    /// The configured base URL (without the mobile prefix).
    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE).expect("default base URL parses")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_with_leading_slash() {
        let config = ApiConfig::new("https://invid.au").unwrap();
        assert_eq!(
            config.api_url("/auth/login"),
            "https://invid.au/mobile/auth/login"
        );
    }

    #[test]
    fn test_api_url_without_leading_slash() {
        let config = ApiConfig::new("https://invid.au").unwrap();
        assert_eq!(
            config.api_url("auth/login"),
            "https://invid.au/mobile/auth/login"
        );
    }

    #[test]
    fn test_trailing_slash_stripped() {
        let config = ApiConfig::new("https://invid.au/").unwrap();
        assert_eq!(
            config.api_url("/auth/refresh"),
            "https://invid.au/mobile/auth/refresh"
        );
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(ApiConfig::new("not a url").is_err());
    }

    #[test]
    fn test_default_points_at_production() {
        let config = ApiConfig::default();
        assert_eq!(config.base_url(), "https://invid.au");
    }
}
