use axum::body::HttpBody;
use axum::extract::{FromRequest, FromRequestParts, Path, Query};
use axum::http::{request::Parts, Request};
use axum::{BoxError, Json};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::errors::RequestError;

/// A JSON body that has been deserialized and passed its `validator` rules.
///
/// Malformed JSON, missing or mistyped fields and rule violations are all
/// rejected as [`RequestError::Validation`] before the handler runs, so no
/// store access happens for an invalid request.
pub struct ValidJson<T>(pub T);

#[axum::async_trait]
impl<S, B, T> FromRequest<S, B> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    B: HttpBody + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
    S: Send + Sync,
{
    type Rejection = RequestError;

    async fn from_request(req: Request<B>, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                tracing::debug!("Rejected request body: {}", rejection.body_text());
                RequestError::Validation(rejection.body_text())
            })?;
        value
            .validate()
            .map_err(|errors| RequestError::Validation(errors.to_string()))?;
        Ok(ValidJson(value))
    }
}

/// Path parameters; a segment that does not parse (`/users/abc`, an id past
/// `i64::MAX`) is rejected as [`RequestError::Validation`].
pub struct ValidPath<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for ValidPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = RequestError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| RequestError::Validation(rejection.body_text()))?;
        Ok(ValidPath(value))
    }
}

/// Query string parameters, with the same rejection shape as [`ValidPath`].
pub struct ValidQuery<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = RequestError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| RequestError::Validation(rejection.body_text()))?;
        Ok(ValidQuery(value))
    }
}
