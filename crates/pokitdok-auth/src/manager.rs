//! Token lifecycle for one client instance
//!
//! A `TokenManager` holds exactly one active token. It is established once at
//! construction, either by adopting a caller-supplied token or by exchanging
//! credentials, and is only replaced when the caller asks for it via
//! `reauthenticate`. There is no refresh-on-expiry: an expired or revoked
//! token surfaces as a failed API call.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use common::Secret;
use tracing::{debug, info};

use crate::TokenSource;
use crate::constants::{TOKEN_PATH, oauth_url};
use crate::credentials::{AccessToken, Credentials};
use crate::error::Result;
use crate::token::{Grant, exchange};

/// Optional inputs that shape how the first token is obtained.
#[derive(Debug, Clone, Default)]
pub struct AuthOptions {
    /// Previously issued token. Adopted verbatim when non-empty.
    pub token: Option<Secret<String>>,
    pub redirect_uri: Option<String>,
    pub scope: Option<String>,
    /// Authorization code from the user-facing authorize flow.
    pub code: Option<String>,
}

pub struct TokenManager {
    http: reqwest::Client,
    token_url: String,
    credentials: Credentials,
    scope: Option<String>,
    token: RwLock<AccessToken>,
}

impl TokenManager {
    /// Establish the initial token.
    ///
    /// Precedence: supplied token, then authorization code, then client
    /// credentials. Exchange failures are returned as-is; nothing is retried.
    pub async fn obtain(
        http: reqwest::Client,
        base_url: &str,
        credentials: Credentials,
        options: AuthOptions,
    ) -> Result<Self> {
        let token_url = oauth_url(base_url, TOKEN_PATH);

        let token = match options.token.filter(|t| !t.is_empty()) {
            Some(existing) => {
                debug!("adopting caller-supplied access token");
                AccessToken::adopted(existing)
            }
            None => {
                let grant = match options.code.as_deref() {
                    Some(code) => Grant::AuthorizationCode {
                        code,
                        redirect_uri: options.redirect_uri.as_deref(),
                    },
                    None => Grant::ClientCredentials,
                };
                let response = exchange(
                    &http,
                    &token_url,
                    &credentials,
                    grant,
                    options.scope.as_deref(),
                )
                .await?;
                info!(grant = grant.name(), "obtained access token");
                AccessToken::from_response(response, SystemTime::now())?
            }
        };

        Ok(Self {
            http,
            token_url,
            credentials,
            scope: options.scope,
            token: RwLock::new(token),
        })
    }

    /// The active bearer token, for callers that cache it across restarts.
    pub fn current_token(&self) -> String {
        self.read_token().secret().expose().clone()
    }

    /// Snapshot of the active token with its metadata.
    pub fn token(&self) -> AccessToken {
        self.read_token().clone()
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Replace the active token on explicit request.
    ///
    /// Uses the refresh token when the current token carries one, otherwise
    /// repeats the client-credentials exchange. The old token stays active if
    /// the exchange fails.
    pub async fn reauthenticate(&self) -> Result<String> {
        let refresh = self.read_token().refresh_token.clone();
        let grant = match refresh.as_ref() {
            Some(refresh) => Grant::RefreshToken(refresh.expose()),
            None => Grant::ClientCredentials,
        };

        let response = exchange(
            &self.http,
            &self.token_url,
            &self.credentials,
            grant,
            self.scope.as_deref(),
        )
        .await?;
        let fresh = AccessToken::from_response(response, SystemTime::now())?;
        let value = fresh.secret().expose().clone();
        *self.write_token() = fresh;

        info!(grant = grant.name(), "access token replaced");
        Ok(value)
    }

    fn read_token(&self) -> RwLockReadGuard<'_, AccessToken> {
        self.token.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_token(&self) -> RwLockWriteGuard<'_, AccessToken> {
        self.token.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl TokenSource for TokenManager {
    fn bearer_token(&self) -> String {
        self.current_token()
    }
}
