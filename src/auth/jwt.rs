//! JWT token handling

use crate::auth::models::IdentityClaim;
use crate::error::Result;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Default token lifetime (1 hour)
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// Claim names the service sets itself; client copies are dropped
const RESERVED_CLAIMS: [&str; 2] = ["iat", "exp"];

/// Why a token failed verification.
///
/// Callers must treat every variant the same way. The distinction exists
/// for server-side logs only.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VerificationError {
    #[error("token expired")]
    Expired,

    #[error("token signature invalid")]
    InvalidSignature,

    #[error("token malformed")]
    Malformed,
}

/// Wire form of the token payload
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenClaims {
    #[serde(flatten)]
    identity: Map<String, Value>,
    /// Issued at
    iat: i64,
    /// Expiration time
    exp: i64,
}

/// Issues and verifies signed, time-limited identity tokens
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: chrono::Duration,
}

impl TokenService {
    /// Create a service signing with `secret`; tokens live for `ttl`
    pub fn new(secret: &[u8], ttl: chrono::Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    /// Create a service with the default one hour lifetime
    pub fn with_default_ttl(secret: &[u8]) -> Self {
        Self::new(secret, chrono::Duration::seconds(DEFAULT_TOKEN_TTL_SECS))
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    /// Sign `claim` into a token that expires `ttl` from now
    pub fn issue(&self, claim: &IdentityClaim) -> Result<String> {
        let mut identity = match serde_json::to_value(claim)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for reserved in RESERVED_CLAIMS {
            identity.remove(reserved);
        }

        let now = chrono::Utc::now().timestamp();
        let claims = TokenClaims {
            identity,
            iat: now,
            exp: now + self.ttl.num_seconds(),
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Check signature and expiry, returning the embedded identity
    pub fn verify(&self, token: &str) -> std::result::Result<IdentityClaim, VerificationError> {
        let data = decode::<TokenClaims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => VerificationError::Expired,
                ErrorKind::InvalidSignature => VerificationError::InvalidSignature,
                _ => VerificationError::Malformed,
            }
        })?;

        serde_json::from_value(Value::Object(data.claims.identity))
            .map_err(|_| VerificationError::Malformed)
    }
}
