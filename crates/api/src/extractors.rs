//! Request extractors.
//!
//! The identity extractors read the [`Caller`] placed in the request
//! extensions by [`identity_middleware`](crate::middleware::identity_middleware).
//! A request that skipped the middleware is treated as having no identity.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
};
use pollcast_common::AppError;
use pollcast_core::VoterIdentity;
use serde::de::DeserializeOwned;

use crate::middleware::Caller;

fn caller(parts: &Parts) -> Caller {
    parts.extensions.get::<Caller>().cloned().unwrap_or_default()
}

/// Authenticated user id extractor.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        caller(parts)
            .user_id
            .map(AuthUser)
            .ok_or(AppError::Unauthenticated)
    }
}

/// Optional authenticated user id extractor.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<String>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(caller(parts).user_id))
    }
}

/// Optional voter identity: user id if authenticated, else fingerprint.
#[derive(Debug, Clone)]
pub struct MaybeVoter(pub Option<VoterIdentity>);

impl<S> FromRequestParts<S> for MaybeVoter
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(caller(parts).voter()))
    }
}

/// JSON body extractor whose rejections use the API error body.
///
/// Malformed JSON, a wrong content type and missing or mistyped fields all
/// come back as `VALIDATION_ERROR`.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}
