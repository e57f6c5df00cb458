//! Error types for token acquisition

/// Errors from OAuth token operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
