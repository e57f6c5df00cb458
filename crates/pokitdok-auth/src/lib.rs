//! OAuth2 token management for the PokitDok platform
//!
//! Establishes the single bearer token a client uses for its lifetime:
//! 1. Caller supplies `Credentials` and optional `AuthOptions`
//! 2. `TokenManager::obtain()` adopts a supplied token or exchanges at `/oauth2/token`
//! 3. The request dispatcher reads the token through `TokenSource`
//! 4. `TokenManager::current_token()` lets callers cache the token across restarts
//!
//! For user-delegated scopes, `build_authorization_url()` produces the page the
//! user visits to obtain an authorization code.

pub mod authorize;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod manager;
pub mod token;

pub use authorize::{build_authorization_url, generate_state};
pub use constants::*;
pub use credentials::{AccessToken, Credentials};
pub use error::{Error, Result};
pub use manager::{AuthOptions, TokenManager};
pub use token::{Grant, TokenResponse, exchange};

/// Supplies the bearer token attached to each API request.
///
/// The dispatcher holds this by reference rather than owning token logic, so
/// alternative sources (a vault-backed store, a fixed test token) slot in
/// without touching request construction.
pub trait TokenSource: Send + Sync {
    fn bearer_token(&self) -> String;
}
