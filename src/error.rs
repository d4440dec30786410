//! Error types for Alternative Stocks

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::VerificationError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Failed to sign token: {0}")]
    TokenIssue(#[from] jsonwebtoken::errors::Error),

    /// No session cookie on the request
    #[error("not authorized")]
    MissingToken,

    /// Session cookie present but the token inside it did not verify
    #[error("unauthorized access")]
    InvalidToken(#[source] VerificationError),

    /// Authenticated, but not as the owner of the requested resource
    #[error("forbidden access")]
    Forbidden,

    #[error("{0}")]
    BadRequest(String),

    #[error("Config file not found. Run 'altstocks init' first.")]
    ConfigNotFound,

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

impl Error {
    /// HTTP status this error maps to when it reaches a client
    pub fn status(&self) -> StatusCode {
        match self {
            Error::MissingToken | Error::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
