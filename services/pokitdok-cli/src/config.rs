//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! Client credentials and tokens come from POKITDOK_* env vars (the secret
//! may also come from client_secret_file), never from the TOML itself.

use common::Secret;
use pokitdok_auth::{AuthOptions, Credentials, DEFAULT_API_VERSION, DEFAULT_BASE_URL};
use pokitdok_client::ClientOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "pokitdok.toml";

pub const ENV_CLIENT_ID: &str = "POKITDOK_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "POKITDOK_CLIENT_SECRET";
pub const ENV_TOKEN: &str = "POKITDOK_TOKEN";
pub const ENV_AUTH_CODE: &str = "POKITDOK_AUTH_CODE";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
}

/// Platform connection settings
#[derive(Debug, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Must match the redirect URI registered for the app.
    #[serde(default)]
    pub redirect_uri: Option<String>,
    /// Space-separated scopes, e.g. `user_schedule`.
    #[serde(default)]
    pub scope: Option<String>,
    /// Path to a file containing the client secret (alternative to POKITDOK_CLIENT_SECRET)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,

    #[serde(skip)]
    pub client_id: Option<String>,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    #[serde(skip)]
    pub token: Option<Secret<String>>,
    #[serde(skip)]
    pub auth_code: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            version: default_version(),
            timeout_secs: default_timeout(),
            redirect_uri: None,
            scope: None,
            client_secret_file: None,
            client_id: None,
            client_secret: None,
            token: None,
            auth_code: None,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_timeout() -> u64 {
    60
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Like `load`, but a missing file at the default location yields the
    /// defaults. An explicitly chosen path must exist.
    pub fn load_or_default(path: &Path) -> common::Result<Self> {
        if path == Path::new(DEFAULT_CONFIG_PATH) && !path.exists() {
            return Self::from_toml("");
        }
        Self::load(path)
    }

    fn from_toml(contents: &str) -> common::Result<Self> {
        let mut config: Config = toml::from_str(contents)?;
        let client = &mut config.client;

        if !client.base_url.starts_with("http://") && !client.base_url.starts_with("https://") {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                client.base_url
            )));
        }

        if client.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if client.version.trim().is_empty() {
            return Err(common::Error::Config("version must not be empty".into()));
        }

        client.client_id = std::env::var(ENV_CLIENT_ID)
            .ok()
            .map(|id| id.trim().to_owned())
            .filter(|id| !id.is_empty());

        // Secret: env var takes precedence over file
        if let Some(secret) = std::env::var(ENV_CLIENT_SECRET)
            .ok()
            .and_then(|s| Secret::from_trimmed(&s))
        {
            client.client_secret = Some(secret);
        } else if let Some(ref secret_file) = client.client_secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read client_secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            client.client_secret = Secret::from_trimmed(&secret);
        }

        client.token = std::env::var(ENV_TOKEN)
            .ok()
            .and_then(|t| Secret::from_trimmed(&t));
        client.auth_code = std::env::var(ENV_AUTH_CODE)
            .ok()
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty());

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from(DEFAULT_CONFIG_PATH)
    }

    pub fn client_id(&self) -> common::Result<&str> {
        self.client
            .client_id
            .as_deref()
            .ok_or_else(|| common::Error::MissingEnv(ENV_CLIENT_ID.into()))
    }

    /// Client id and secret, both required for any platform call.
    pub fn credentials(&self) -> common::Result<Credentials> {
        let client_id = self.client_id()?;
        let secret = self.client.client_secret.as_ref().ok_or_else(|| {
            common::Error::MissingEnv(format!("{ENV_CLIENT_SECRET} (or client_secret_file)"))
        })?;
        Ok(Credentials::new(client_id, secret.expose().as_str()))
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            base_url: self.client.base_url.clone(),
            version: self.client.version.clone(),
            timeout: Duration::from_secs(self.client.timeout_secs),
            user_agent: None,
            auth: AuthOptions {
                token: self.client.token.clone(),
                redirect_uri: self.client.redirect_uri.clone(),
                scope: self.client.scope.clone(),
                code: self.client.auth_code.clone(),
            },
        }
    }
}
