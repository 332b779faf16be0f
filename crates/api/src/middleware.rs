//! API middleware.

#![allow(missing_docs)]

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use pollcast_common::config::{AuthConfig, VotingConfig};
use pollcast_core::{PollService, SharedPollStore, TallyService, VoteService, VoterIdentity};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub poll_service: PollService,
    pub vote_service: VoteService,
    pub tally_service: TallyService,
    pub auth: AuthConfig,
}

impl AppState {
    /// Build every service on top of one store.
    #[must_use]
    pub fn new(store: SharedPollStore, auth: AuthConfig, voting: VotingConfig) -> Self {
        Self {
            poll_service: PollService::new(store.clone()),
            vote_service: VoteService::new(store.clone(), voting),
            tally_service: TallyService::new(store),
            auth,
        }
    }
}

/// Identity of the caller as reported by the upstream authenticator.
///
/// Header values are trusted as-is; this service never sees credentials.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    pub user_id: Option<String>,
    pub fingerprint: Option<String>,
}

impl Caller {
    fn from_headers(headers: &HeaderMap, auth: &AuthConfig) -> Self {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(ToString::to_string)
        };

        Self {
            user_id: read(&auth.user_header),
            fingerprint: read(&auth.fingerprint_header),
        }
    }

    /// The voter identity for this caller, preferring the user id.
    #[must_use]
    pub fn voter(&self) -> Option<VoterIdentity> {
        VoterIdentity::resolve(self.user_id.as_deref(), self.fingerprint.as_deref())
    }
}

/// Identity middleware.
pub async fn identity_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let caller = Caller::from_headers(req.headers(), &state.auth);
    tracing::trace!(
        authenticated = caller.user_id.is_some(),
        fingerprint = caller.fingerprint.is_some(),
        "Resolved caller"
    );
    req.extensions_mut().insert(caller);

    next.run(req).await
}
