//! Request body parsing with validation

use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Field-level checks run after a body deserializes
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// JSON body that must deserialize into `T` and pass [`Validate`].
///
/// Any failure, from a wrong content type to a bad email, is rejected as
/// [`Error::BadRequest`].
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| Error::BadRequest(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}
