//! Shared types for the PokitDok client workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
