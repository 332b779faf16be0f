//! API endpoints.

mod poll;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new().merge(poll::router())
}
