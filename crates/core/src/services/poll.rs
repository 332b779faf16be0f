//! Poll service.

use chrono::{DateTime, Utc};
use pollcast_common::{AppError, AppResult, IdGenerator};
use pollcast_db::entities::{USER_ID_MAX_LEN, poll, poll_option};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use super::store::SharedPollStore;

/// Maximum length of a single option text, in characters.
const MAX_OPTION_CHARS: usize = 140;

/// Input for creating a poll.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollInput {
    #[validate(length(min = 1, max = 280))]
    pub question: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(min = 2, max = 20))]
    pub options: Vec<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

/// Input for editing a poll's question and description.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePollInput {
    #[validate(length(min = 1, max = 280))]
    pub question: String,
    /// Replaces the stored description. Absent or blank clears it.
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

/// A poll together with its options in position order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollWithOptions {
    #[serde(flatten)]
    pub poll: poll::Model,
    pub options: Vec<poll_option::Model>,
}

/// Trim a description, mapping blank text to `None`.
fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

impl CreatePollInput {
    /// Trim every text field, then check all constraints.
    fn normalized(self) -> AppResult<Self> {
        let input = Self {
            question: self.question.trim().to_string(),
            description: normalize_description(self.description),
            options: self
                .options
                .into_iter()
                .map(|text| text.trim().to_string())
                .collect(),
            starts_at: self.starts_at,
            ends_at: self.ends_at,
        };

        input.validate()?;

        for text in &input.options {
            let len = text.chars().count();
            if len == 0 || len > MAX_OPTION_CHARS {
                return Err(AppError::Validation(format!(
                    "Option text must be 1-{MAX_OPTION_CHARS} characters"
                )));
            }
        }

        if let (Some(starts_at), Some(ends_at)) = (input.starts_at, input.ends_at)
            && starts_at >= ends_at
        {
            return Err(AppError::Validation(
                "Poll must start before it ends".to_string(),
            ));
        }

        Ok(input)
    }
}

impl UpdatePollInput {
    fn normalized(self) -> AppResult<Self> {
        let input = Self {
            question: self.question.trim().to_string(),
            description: normalize_description(self.description),
        };
        input.validate()?;
        Ok(input)
    }
}

/// Poll service: creation, lookup, owner edits and deletion.
#[derive(Clone)]
pub struct PollService {
    store: SharedPollStore,
    id_gen: IdGenerator,
}

impl PollService {
    /// Create a new poll service.
    #[must_use]
    pub const fn new(store: SharedPollStore) -> Self {
        Self {
            store,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a poll with its options.
    ///
    /// The poll and every option are written in one atomic store call, so a
    /// failure leaves nothing behind.
    pub async fn create_poll(
        &self,
        owner: Option<&str>,
        input: CreatePollInput,
    ) -> AppResult<PollWithOptions> {
        let owner_id = owner
            .filter(|id| !id.trim().is_empty())
            .ok_or(AppError::Unauthenticated)?;
        if owner_id.chars().count() > USER_ID_MAX_LEN {
            return Err(AppError::Validation(format!(
                "Owner id cannot exceed {USER_ID_MAX_LEN} characters"
            )));
        }
        let input = input.normalized()?;

        let poll_id = self.id_gen.generate_uuid_v4();
        let poll = poll::Model {
            id: poll_id.clone(),
            owner_id: owner_id.to_string(),
            question: input.question,
            description: input.description,
            short_code: Some(self.id_gen.generate_short_code()),
            is_closed: false,
            starts_at: input.starts_at.map(Into::into),
            ends_at: input.ends_at.map(Into::into),
            allow_multiple: false,
            max_choices: 1,
            created_at: Utc::now().into(),
            updated_at: None,
        };

        let options = input
            .options
            .into_iter()
            .zip(0..)
            .map(|(text, position)| poll_option::Model {
                id: self.id_gen.generate_uuid_v4(),
                poll_id: poll_id.clone(),
                text,
                position,
            })
            .collect();

        let (poll, options) = self.store.insert_poll(poll, options).await?;
        info!(poll_id = %poll.id, owner_id = %poll.owner_id, options = options.len(), "Poll created");

        Ok(PollWithOptions { poll, options })
    }

    /// Get a poll and its options by ID.
    pub async fn get_poll_by_id(&self, poll_id: &str) -> AppResult<PollWithOptions> {
        let poll = self.get_poll(poll_id).await?;
        self.with_options(poll).await
    }

    /// Get a poll and its options by share-link short code.
    pub async fn get_poll_by_short_code(&self, code: &str) -> AppResult<PollWithOptions> {
        let poll = self
            .store
            .find_poll_by_short_code(code)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Poll with code {code}")))?;
        self.with_options(poll).await
    }

    /// Replace a poll's question and description. Owner only.
    pub async fn update_poll_question(
        &self,
        poll_id: &str,
        caller: Option<&str>,
        input: UpdatePollInput,
    ) -> AppResult<poll::Model> {
        let mut poll = self.get_poll(poll_id).await?;
        ensure_owner(&poll, caller)?;
        let input = input.normalized()?;

        poll.question = input.question;
        poll.description = input.description;
        poll.updated_at = Some(Utc::now().into());

        let poll = self.store.update_poll(poll).await?;
        info!(poll_id = %poll.id, "Poll question updated");
        Ok(poll)
    }

    /// Open or close a poll. Owner only.
    pub async fn set_poll_closed(
        &self,
        poll_id: &str,
        caller: Option<&str>,
        closed: bool,
    ) -> AppResult<poll::Model> {
        let mut poll = self.get_poll(poll_id).await?;
        ensure_owner(&poll, caller)?;

        poll.is_closed = closed;
        poll.updated_at = Some(Utc::now().into());

        let poll = self.store.update_poll(poll).await?;
        info!(poll_id = %poll.id, closed, "Poll closed flag changed");
        Ok(poll)
    }

    /// Delete a poll with its options and votes. Owner only.
    pub async fn delete_poll(&self, poll_id: &str, caller: Option<&str>) -> AppResult<()> {
        let poll = self.get_poll(poll_id).await?;
        ensure_owner(&poll, caller)?;

        // Someone else may have deleted it between the lookup and here.
        if !self.store.delete_poll(&poll.id).await? {
            return Err(AppError::NotFound(format!("Poll {poll_id}")));
        }

        info!(poll_id = %poll.id, "Poll deleted");
        Ok(())
    }

    async fn get_poll(&self, poll_id: &str) -> AppResult<poll::Model> {
        self.store
            .find_poll(poll_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Poll {poll_id}")))
    }

    async fn with_options(&self, poll: poll::Model) -> AppResult<PollWithOptions> {
        let options = self.store.find_options(&poll.id).await?;
        Ok(PollWithOptions { poll, options })
    }
}

/// Fail with `Unauthorized` unless `caller` owns the poll.
fn ensure_owner(poll: &poll::Model, caller: Option<&str>) -> AppResult<()> {
    if caller == Some(poll.owner_id.as_str()) {
        return Ok(());
    }

    warn!(poll_id = %poll.id, caller = ?caller, "Rejected owner-only poll operation");
    Err(AppError::Unauthorized(
        "Only the poll owner can do this".to_string(),
    ))
}
