//! Token endpoint exchange
//!
//! Every grant POSTs a form body to `{base}/oauth2/token` with the client id
//! and secret sent as HTTP Basic credentials.

use serde::{Deserialize, Serialize};

use crate::credentials::Credentials;
use crate::error::{Error, Result};

/// Response from the token endpoint.
#[derive(Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Seconds until the access token expires (delta, not absolute)
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// OAuth2 grant used for an exchange.
#[derive(Debug, Clone, Copy)]
pub enum Grant<'a> {
    ClientCredentials,
    AuthorizationCode {
        code: &'a str,
        redirect_uri: Option<&'a str>,
    },
    RefreshToken(&'a str),
}

impl<'a> Grant<'a> {
    pub fn name(&self) -> &'static str {
        match self {
            Grant::ClientCredentials => "client_credentials",
            Grant::AuthorizationCode { .. } => "authorization_code",
            Grant::RefreshToken(_) => "refresh_token",
        }
    }

    /// Form fields for this grant, with `scope` appended when present.
    pub fn form(&self, scope: Option<&'a str>) -> Vec<(&'static str, &'a str)> {
        let mut form = vec![("grant_type", self.name())];
        match *self {
            Grant::ClientCredentials => {}
            Grant::AuthorizationCode { code, redirect_uri } => {
                form.push(("code", code));
                if let Some(uri) = redirect_uri {
                    form.push(("redirect_uri", uri));
                }
            }
            Grant::RefreshToken(refresh) => form.push(("refresh_token", refresh)),
        }
        if let Some(scope) = scope {
            form.push(("scope", scope));
        }
        form
    }
}

/// Exchange credentials for an access token. No retry.
pub async fn exchange(
    client: &reqwest::Client,
    token_url: &str,
    credentials: &Credentials,
    grant: Grant<'_>,
    scope: Option<&str>,
) -> Result<TokenResponse> {
    let response = client
        .post(token_url)
        .basic_auth(
            &credentials.client_id,
            Some(credentials.client_secret.expose()),
        )
        .form(&grant.form(scope))
        .send()
        .await
        .map_err(|e| Error::Http(format!("token request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(Error::InvalidCredentials(format!(
                "{} grant rejected ({status}): {body}",
                grant.name()
            )));
        }

        return Err(Error::TokenExchange(format!(
            "token endpoint returned {status}: {body}"
        )));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::TokenExchange(format!("invalid token response: {e}")))
}
