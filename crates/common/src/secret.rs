//! Redacting wrapper for client secrets and bearer tokens

use std::fmt;
use zeroize::Zeroize;

/// Sensitive value. Formats as `[REDACTED]` and is wiped on drop.
pub struct Secret<T: Zeroize>(T);

impl<T: Zeroize> Secret<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Borrow the wrapped value. Callers must not log the result.
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl Secret<String> {
    /// Trim surrounding whitespace, returning `None` when nothing is left.
    ///
    /// Secrets read from files or env vars routinely carry a trailing newline.
    pub fn from_trimmed(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_owned()))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Secret<String> {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Secret<String> {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T: Zeroize> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T: Zeroize> Drop for Secret<T> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl<T: Zeroize + Clone> Clone for Secret<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_and_display_are_redacted() {
        let secret = Secret::from("client-secret-value");
        assert_eq!(format!("{secret:?}"), "[REDACTED]");
        assert_eq!(format!("{secret}"), "[REDACTED]");
    }

    #[test]
    fn redaction_holds_inside_derived_debug() {
        #[derive(Debug)]
        #[allow(dead_code)]
        struct Holder {
            id: String,
            secret: Secret<String>,
        }
        let holder = Holder {
            id: "client-id".into(),
            secret: Secret::from("s3cr3t"),
        };
        let debug = format!("{holder:?}");
        assert!(debug.contains("client-id"));
        assert!(!debug.contains("s3cr3t"), "got: {debug}");
    }

    #[test]
    fn expose_returns_inner_value() {
        let secret = Secret::new(String::from("abc"));
        assert_eq!(secret.expose(), "abc");
        assert!(!secret.is_empty());
    }

    #[test]
    fn from_trimmed_strips_newlines() {
        let secret = Secret::from_trimmed("  value\n").unwrap();
        assert_eq!(secret.expose(), "value");
    }

    #[test]
    fn from_trimmed_rejects_blank_input() {
        assert!(Secret::from_trimmed(" \n\t ").is_none());
        assert!(Secret::from_trimmed("").is_none());
    }
}
