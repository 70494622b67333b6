//! Request extractors that reject with the API's JSON error body.

use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;
use services::{AppServices, AuthError, Claims};

use crate::error::ApiError;

/// `Json` whose rejection is an [`ApiError`].
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// `Path` whose rejection is an [`ApiError`].
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Raw token from `Authorization: Bearer <token>`.
pub struct BearerToken(pub String);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingToken)?
            .to_str()
            .map_err(|_| AuthError::InvalidToken)?;
        // Only the second word matters; the scheme is not checked.
        match header.split_whitespace().nth(1) {
            Some(token) => Ok(Self(token.to_string())),
            None => Err(ApiError::Unauthorized("No token provided".into())),
        }
    }
}

/// Verified teacher claims; guards every `/api/teacher` route.
#[derive(Debug, Clone)]
pub struct TeacherAuth(pub Claims);

impl FromRequestParts<AppServices> for TeacherAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        services: &AppServices,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, services).await?;
        let claims = services.teachers().verify(&token)?;
        Ok(Self(claims))
    }
}
