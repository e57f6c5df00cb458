//! Normalized API responses

use serde::Serialize;
use serde_json::Value;

use crate::dispatcher::Verb;
use crate::error::{Error, Result};

/// Outcome of one API call: the HTTP status plus the decoded body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: ApiBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ApiBody {
    Json(Value),
    /// DELETE answered with an empty body; `true` only for 204.
    Deleted(bool),
}

impl ApiBody {
    /// Decode a response body for the verb that was actually sent.
    pub fn decode(verb: Verb, status: u16, bytes: &[u8]) -> Result<Self> {
        if verb == Verb::Delete && bytes.trim_ascii().is_empty() {
            return Ok(ApiBody::Deleted(status == 204));
        }
        serde_json::from_slice(bytes)
            .map(ApiBody::Json)
            .map_err(|e| Error::Decode {
                status,
                message: e.to_string(),
            })
    }
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            ApiBody::Json(value) => Some(value),
            ApiBody::Deleted(_) => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self.body {
            ApiBody::Json(value) => Some(value),
            ApiBody::Deleted(_) => None,
        }
    }

    pub fn deleted(&self) -> Option<bool> {
        match self.body {
            ApiBody::Deleted(ok) => Some(ok),
            ApiBody::Json(_) => None,
        }
    }

    /// The envelope's `meta` object.
    pub fn meta(&self) -> Option<&Value> {
        self.json().and_then(|v| v.get("meta"))
    }

    /// The envelope's `data` object.
    pub fn data(&self) -> Option<&Value> {
        self.json().and_then(|v| v.get("data"))
    }

    /// Structured errors reported by the platform, from `data.errors` or a
    /// top-level `errors` key.
    pub fn errors(&self) -> Option<&Value> {
        self.data()
            .and_then(|d| d.get("errors"))
            .or_else(|| self.json().and_then(|v| v.get("errors")))
    }
}
