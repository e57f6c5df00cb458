//! Authorization-code flow helpers
//!
//! Endpoints that act on behalf of a user (scheduling, for instance) need a
//! token issued through the user-facing authorize page. The caller sends the
//! user to `build_authorization_url`, receives a `code` on the redirect URI,
//! and hands it to `TokenManager::obtain` via `AuthOptions::code`.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;

use crate::constants::{AUTHORIZE_PATH, oauth_url};
use crate::error::{Error, Result};

/// Random opaque value for the `state` parameter (CSRF protection).
pub fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Build the authorize URL the user visits to grant access.
pub fn build_authorization_url(
    base_url: &str,
    client_id: &str,
    redirect_uri: &str,
    scope: Option<&str>,
    state: &str,
) -> Result<String> {
    let mut url = reqwest::Url::parse(&oauth_url(base_url, AUTHORIZE_PATH))
        .map_err(|e| Error::InvalidUrl(format!("{base_url}: {e}")))?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code");
        if let Some(scope) = scope {
            query.append_pair("scope", scope);
        }
        query.append_pair("state", state);
    }
    Ok(url.into())
}
