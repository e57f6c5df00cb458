//! Client credentials and the active access token
//!
//! `Credentials` is fixed for the lifetime of a client. `AccessToken` is the
//! single bearer token a `TokenManager` holds at any time, either adopted from
//! the caller or built from a token endpoint response.

use std::time::{Duration, SystemTime};

use common::Secret;

use crate::error::{Error, Result};
use crate::token::TokenResponse;

/// OAuth client id and secret issued by PokitDok.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: Secret<String>,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<Secret<String>>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

/// The bearer token currently in use.
///
/// `expires_at` is derived from the response's `expires_in` at receipt time.
/// Adopted tokens carry no expiry metadata.
#[derive(Debug, Clone)]
pub struct AccessToken {
    token: Secret<String>,
    pub token_type: Option<String>,
    pub expires_at: Option<SystemTime>,
    pub refresh_token: Option<Secret<String>>,
    pub scope: Option<String>,
}

impl AccessToken {
    /// Wrap a token supplied by the caller, verbatim.
    pub fn adopted(token: Secret<String>) -> Self {
        Self {
            token,
            token_type: None,
            expires_at: None,
            refresh_token: None,
            scope: None,
        }
    }

    /// Build from a token endpoint response received at `received_at`.
    pub fn from_response(response: TokenResponse, received_at: SystemTime) -> Result<Self> {
        if response.access_token.trim().is_empty() {
            return Err(Error::InvalidToken(
                "token endpoint returned an empty access_token".into(),
            ));
        }
        Ok(Self {
            token: Secret::new(response.access_token),
            token_type: response.token_type,
            expires_at: response
                .expires_in
                .map(|secs| received_at + Duration::from_secs(secs)),
            refresh_token: response.refresh_token.and_then(|r| Secret::from_trimmed(&r)),
            scope: response.scope,
        })
    }

    pub fn secret(&self) -> &Secret<String> {
        &self.token
    }

    /// Whether the server-declared lifetime has elapsed at `now`.
    ///
    /// Tokens without expiry metadata are never reported as expired.
    pub fn is_expired(&self, now: SystemTime) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}
