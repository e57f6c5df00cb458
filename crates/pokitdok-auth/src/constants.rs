//! PokitDok platform endpoints and defaults

/// Production platform host.
pub const DEFAULT_BASE_URL: &str = "https://platform.pokitdok.com";

/// API version used when the caller does not pick one.
pub const DEFAULT_API_VERSION: &str = "v4";

/// Token endpoint, relative to the host (not under `/api/{version}`).
pub const TOKEN_PATH: &str = "/oauth2/token";

/// User-facing authorization endpoint for the authorization-code flow.
pub const AUTHORIZE_PATH: &str = "/oauth2/authorize";

/// Join a host-relative OAuth path onto a base URL.
pub fn oauth_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}
