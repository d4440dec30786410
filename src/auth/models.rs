//! Authentication models

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::LazyLock;

use crate::error::{Error, Result};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Compile-time constant pattern; a failure here is a bug in the codebase
    Regex::new(r"^[^@\s]+@[^@\s]+$").expect("Invalid email pattern")
});

/// The authenticated subject carried inside a session token.
///
/// Only `email` is interpreted by the server. Anything else the client
/// submitted at login travels along untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityClaim {
    pub email: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IdentityClaim {
    /// Create a claim holding only an email
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            extra: Map::new(),
        }
    }

    /// Whether this identity owns a resource stamped with `owner`
    pub fn owns(&self, owner: &str) -> bool {
        self.email == owner
    }
}

/// Reject values that cannot be an email address
pub fn validate_email(field: &str, value: &str) -> Result<()> {
    if EMAIL_RE.is_match(value) {
        Ok(())
    } else {
        Err(Error::BadRequest(format!(
            "field '{}' must be an email address",
            field
        )))
    }
}

/// Body returned by the session endpoints
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionResponse {
    pub success: bool,
}

impl SessionResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}
