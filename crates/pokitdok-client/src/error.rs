//! Error types for API calls
//!
//! Only transport, authentication, and decoding failures are errors here. A
//! non-2xx response whose body parses as JSON is returned as ordinary data;
//! the platform reports validation and business errors inside its envelope.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Connection refused, DNS failure, timeout, or a body that could not be read.
    #[error("transport error: {message}")]
    Transport { message: String, timeout: bool },

    #[error("authentication failed: {0}")]
    Auth(#[from] pokitdok_auth::Error),

    #[error("could not decode response body (status {status}): {message}")]
    Decode { status: u16, message: String },

    #[error("file upload failed: {0}")]
    Upload(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl Error {
    pub(crate) fn transport(e: &reqwest::Error) -> Self {
        Error::Transport {
            message: e.to_string(),
            timeout: e.is_timeout(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Transport { timeout: true, .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
