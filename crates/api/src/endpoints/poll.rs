//! Poll endpoints.

use axum::{
    Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post, put},
};
use chrono::{DateTime, FixedOffset};
use pollcast_common::{AppError, AppResult};
use pollcast_core::{CreatePollInput, PollDetail, PollSummary, PollWithOptions, UpdatePollInput};
use pollcast_db::entities::{poll, vote};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{ApiJson, AuthUser, MaybeAuthUser, MaybeVoter},
    middleware::AppState,
    response::{ApiResponse, no_content},
};

/// Close/reopen request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetClosedRequest {
    pub closed: bool,
}

/// Vote request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteRequest {
    pub option_id: String,
}

/// Recorded vote. The voter key and fingerprint stay server-side.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub id: String,
    pub poll_id: String,
    pub option_id: String,
    pub created_at: DateTime<FixedOffset>,
}

impl From<vote::Model> for VoteResponse {
    fn from(vote: vote::Model) -> Self {
        Self {
            id: vote.id,
            poll_id: vote.poll_id,
            option_id: vote.option_id,
            created_at: vote.created_at,
        }
    }
}

/// Create a poll owned by the caller.
async fn create_poll(
    MaybeAuthUser(user_id): MaybeAuthUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreatePollInput>,
) -> AppResult<ApiResponse<PollWithOptions>> {
    let created = state
        .poll_service
        .create_poll(user_id.as_deref(), input)
        .await?;
    Ok(ApiResponse::created(created))
}

/// List the caller's polls with vote totals.
async fn list_polls(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<PollSummary>>> {
    let summaries = state.tally_service.list_poll_summaries(&user_id).await?;
    Ok(ApiResponse::ok(summaries))
}

/// Poll results for the caller.
async fn show_poll(
    MaybeVoter(voter): MaybeVoter,
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
) -> AppResult<ApiResponse<PollDetail>> {
    let detail = state
        .tally_service
        .get_poll_detail(&poll_id, voter.as_ref())
        .await?;
    Ok(ApiResponse::ok(detail))
}

/// Look a poll up by share-link code.
async fn show_poll_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<ApiResponse<PollWithOptions>> {
    let poll = state.poll_service.get_poll_by_short_code(&code).await?;
    Ok(ApiResponse::ok(poll))
}

/// Edit question and description.
async fn update_poll(
    MaybeAuthUser(user_id): MaybeAuthUser,
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
    ApiJson(input): ApiJson<UpdatePollInput>,
) -> AppResult<ApiResponse<poll::Model>> {
    let poll = state
        .poll_service
        .update_poll_question(&poll_id, user_id.as_deref(), input)
        .await?;
    Ok(ApiResponse::ok(poll))
}

/// Close or reopen a poll.
async fn set_closed(
    MaybeAuthUser(user_id): MaybeAuthUser,
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
    ApiJson(req): ApiJson<SetClosedRequest>,
) -> AppResult<ApiResponse<poll::Model>> {
    let poll = state
        .poll_service
        .set_poll_closed(&poll_id, user_id.as_deref(), req.closed)
        .await?;
    Ok(ApiResponse::ok(poll))
}

/// Delete a poll.
async fn delete_poll(
    MaybeAuthUser(user_id): MaybeAuthUser,
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state
        .poll_service
        .delete_poll(&poll_id, user_id.as_deref())
        .await?;
    Ok(no_content())
}

/// Cast the caller's vote.
async fn cast_vote(
    MaybeVoter(voter): MaybeVoter,
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
    ApiJson(req): ApiJson<CastVoteRequest>,
) -> AppResult<ApiResponse<VoteResponse>> {
    let voter = voter.ok_or(AppError::Unauthenticated)?;
    let vote = state
        .vote_service
        .cast_vote(&poll_id, &req.option_id, &voter)
        .await?;
    Ok(ApiResponse::created(vote.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/polls", post(create_poll).get(list_polls))
        .route("/polls/code/{code}", get(show_poll_by_code))
        .route(
            "/polls/{id}",
            get(show_poll).patch(update_poll).delete(delete_poll),
        )
        .route("/polls/{id}/closed", put(set_closed))
        .route("/polls/{id}/votes", post(cast_vote))
}
