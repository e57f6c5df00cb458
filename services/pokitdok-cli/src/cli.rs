use clap::{Parser, Subcommand};
use pokitdok_client::Verb;
use serde_json::Value;
use std::path::PathBuf;

/// Command-line client for the PokitDok platform
#[derive(Parser, Debug)]
#[command(name = "pokitdok", version, about)]
pub struct Cli {
    /// Config file path (falls back to pokitdok.toml)
    #[arg(long, env = "CONFIG_PATH", global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Print the active bearer token
    Token,

    /// List named operations with verb, path and deprecation markers
    Endpoints,

    /// Print the user authorization URL and a fresh state value
    AuthorizeUrl,

    /// Invoke a named operation
    Call {
        /// Operation name, e.g. `eligibility`
        name: String,

        /// Positional path arguments, in template order
        path_args: Vec<String>,

        /// Request parameters as JSON
        #[arg(long)]
        params: Option<Value>,

        /// File to upload (sent as a multipart POST)
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Send a request to an arbitrary endpoint path
    Request {
        /// GET, POST, PUT or DELETE
        verb: Verb,

        /// Path under /api/{version}
        path: String,

        /// Request parameters as JSON
        #[arg(long)]
        params: Option<Value>,

        /// File to upload (forces a multipart POST)
        #[arg(long)]
        file: Option<PathBuf>,
    },
}
