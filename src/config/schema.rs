//! Configuration schema definitions

use serde::{Deserialize, Serialize};

use crate::auth::{SameSite, DEFAULT_TOKEN_TTL_SECS};
use crate::error::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

/// Server configuration for the HTTP API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins allowed to call the API with credentials
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: Vec::new(),
        }
    }
}

/// Token signing and session cookie settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign session tokens
    #[serde(default)]
    pub secret: String,

    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: i64,

    /// Require the owner's session for create, update and delete
    #[serde(default)]
    pub enforce_ownership_on_writes: bool,

    #[serde(default)]
    pub cookie: CookieConfig,
}

/// Longest session lifetime `validate` accepts (one year)
pub const MAX_TOKEN_TTL_SECS: i64 = 365 * 24 * 60 * 60;

fn default_token_ttl() -> i64 {
    DEFAULT_TOKEN_TTL_SECS
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            token_ttl_secs: default_token_ttl(),
            enforce_ownership_on_writes: false,
            cookie: CookieConfig::default(),
        }
    }
}

/// Session cookie attributes. Cross-site deployments need
/// `secure = true` with `same_site = "none"`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CookieConfig {
    #[serde(default)]
    pub secure: bool,

    #[serde(default)]
    pub same_site: SameSite,
}

/// Which document store backs the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    #[default]
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// libpq-style connection string
    #[serde(default = "default_store_url")]
    pub url: String,
}

fn default_store_url() -> String {
    "host=localhost user=postgres password=postgres dbname=altstocks".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: default_store_url(),
        }
    }
}

impl Config {
    /// Check settings that cannot be defaulted
    pub fn validate(&self) -> Result<()> {
        if self.auth.secret.trim().is_empty() {
            return Err(Error::Config(
                "auth.secret is empty; set ACCESS_TOKEN_SECRET or pass --secret".to_string(),
            ));
        }
        if self.auth.token_ttl_secs <= 0 {
            return Err(Error::Config(format!(
                "auth.token_ttl_secs must be positive, got {}",
                self.auth.token_ttl_secs
            )));
        }
        if self.auth.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(Error::Config(format!(
                "auth.token_ttl_secs must be at most {}, got {}",
                MAX_TOKEN_TTL_SECS, self.auth.token_ttl_secs
            )));
        }
        if self.server.allowed_origins.iter().any(|o| o == "*") {
            return Err(Error::Config(
                "server.allowed_origins cannot contain '*' when cookies are used".to_string(),
            ));
        }
        Ok(())
    }
}
