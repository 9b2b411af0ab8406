use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// No credentials were present at request time.
    #[error("No credentials available")]
    MissingCredentials,

    /// The refresh endpoint rejected the refresh token or returned a body
    /// without an access token.
    #[error("Token refresh failed with status {status}: {message}")]
    RefreshFailed { status: u16, message: String },

    /// Login or two-factor verification was rejected by the server.
    #[error("Login failed with status {status}: {message}")]
    LoginFailed { status: u16, message: String },

    /// A login response was missing one of access token, refresh token or
    /// user record.
    #[error("Invalid login response from server: {0}")]
    InvalidLoginResponse(String),

    /// Transport-level failure (DNS, timeout, connectivity).
    #[error("Network error: {0}")]
    Network(String),

    /// Storage-layer failure from the key-value store.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<bridge_traits::BridgeError> for AuthError {
    fn from(e: bridge_traits::BridgeError) -> Self {
        match e {
            bridge_traits::BridgeError::StorageError(msg) => AuthError::Storage(msg),
            bridge_traits::BridgeError::Io(io) => AuthError::Storage(io.to_string()),
            other => AuthError::Network(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
