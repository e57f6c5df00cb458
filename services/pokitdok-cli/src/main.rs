//! PokitDok command-line client
//!
//! Loads configuration, establishes a bearer token, runs one platform
//! operation, and prints `{"status": ..., "body": ...}` as pretty JSON.

mod cli;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use pokitdok_auth::{build_authorization_url, generate_state};
use pokitdok_client::{ENDPOINTS, EndpointDescriptor, PokitDok};
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command};
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs on stderr so stdout stays parseable; LOG_LEVEL / RUST_LOG
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    let config_path = Config::resolve_path(cli.config.as_deref());
    debug!(path = %config_path.display(), "loading configuration");
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    run(cli.command, &config).await
}

async fn run(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Endpoints => {
            print!("{}", endpoint_listing(ENDPOINTS));
            Ok(())
        }
        Command::AuthorizeUrl => {
            let redirect_uri = config
                .client
                .redirect_uri
                .as_deref()
                .context("redirect_uri must be set in [client] to build an authorization URL")?;
            let state = generate_state();
            let url = build_authorization_url(
                &config.client.base_url,
                config.client_id()?,
                redirect_uri,
                config.client.scope.as_deref(),
                &state,
            )?;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({"url": url, "state": state}))?
            );
            Ok(())
        }
        Command::Token => {
            let client = connect(config).await?;
            println!("{}", client.current_token());
            Ok(())
        }
        Command::Call {
            name,
            path_args,
            params,
            file,
        } => {
            let client = connect(config).await?;
            let path_args: Vec<&str> = path_args.iter().map(String::as_str).collect();
            let params = params.unwrap_or(Value::Null);
            let response = client
                .call(&name, &path_args, &params, file.as_deref())
                .await
                .with_context(|| format!("{name} failed"))?;
            if !response.is_success() {
                warn!(operation = %name, status = response.status, "platform returned an error status");
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Command::Request {
            verb,
            path,
            params,
            file,
        } => {
            let client = connect(config).await?;
            let params = params.unwrap_or(Value::Null);
            let response = client
                .request(&path, verb, &params, file.as_deref())
                .await
                .with_context(|| format!("{verb} {path} failed"))?;
            if !response.is_success() {
                warn!(%verb, %path, status = response.status, "platform returned an error status");
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
    }
}

async fn connect(config: &Config) -> Result<PokitDok> {
    let credentials = config.credentials()?;
    let client = PokitDok::connect(credentials, config.client_options())
        .await
        .context("failed to authenticate with the platform")?;
    info!(api_url = %client.api_url(), "connected");
    Ok(client)
}

/// One line per operation: name, verb, path, then upload/deprecation markers.
fn endpoint_listing(endpoints: &[EndpointDescriptor]) -> String {
    let width = endpoints.iter().map(|e| e.name.len()).max().unwrap_or(0);
    let mut out = String::new();
    for endpoint in endpoints {
        let mut line = format!(
            "{:width$}  {:6}  {}",
            endpoint.name,
            endpoint.verb.as_str(),
            endpoint.path
        );
        if endpoint.accepts_file {
            line.push_str("  [file]");
        }
        match (endpoint.deprecated, endpoint.replacement) {
            (true, Some(replacement)) => line.push_str(&format!("  [deprecated: use {replacement}]")),
            (true, None) => line.push_str("  [deprecated]"),
            _ => {}
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}
