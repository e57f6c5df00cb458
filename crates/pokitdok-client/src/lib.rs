//! PokitDok platform client
//!
//! Request flow:
//! 1. `PokitDok::connect()` establishes a bearer token via `pokitdok_auth`
//! 2. A named operation looks up its verb and path template in `ENDPOINTS`
//! 3. `Dispatcher::send()` signs, sends, and decodes one request
//! 4. The caller gets an `ApiResponse` with the status and JSON body
//!
//! Error statuses (400, 422, ...) with a JSON body are ordinary responses, not
//! `Err`. `Err` is reserved for failures where no usable response exists.

pub mod client;
pub mod dispatcher;
pub mod endpoints;
pub mod error;
pub mod metrics;
pub mod response;

#[cfg(test)]
mod mock;

pub use client::{ClientOptions, PokitDok, default_user_agent};
pub use common::Secret;
pub use dispatcher::{Dispatcher, Verb};
pub use endpoints::{ENDPOINTS, EndpointDescriptor, lookup, render_path};
pub use error::{Error, Result};
pub use pokitdok_auth::{AuthOptions, Credentials, TokenSource};
pub use response::{ApiBody, ApiResponse};
