//! HTTP API layer for pollcast.
//!
//! A thin transport over the core services:
//!
//! - **Endpoints**: poll CRUD, voting and results under `/polls`
//! - **Middleware**: turns the identity headers set by the upstream
//!   authenticator into a [`middleware::Caller`]
//! - **Extractors**: [`extractors::AuthUser`], [`extractors::MaybeAuthUser`]
//!   and [`extractors::MaybeVoter`]
//!
//! Errors are rendered by `AppError`'s `IntoResponse` impl.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

use axum::Router;

pub use endpoints::router;
pub use middleware::{AppState, Caller};

/// Router with the identity middleware applied and state attached.
pub fn app(state: AppState) -> Router {
    router()
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::identity_middleware,
        ))
        .with_state(state)
}
