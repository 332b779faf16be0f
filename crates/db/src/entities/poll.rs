//! Poll entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "poll")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Creator of the poll. Never changes after insert.
    #[sea_orm(indexed)]
    pub owner_id: String,

    pub question: String,

    #[sea_orm(nullable)]
    pub description: Option<String>,

    /// Code used by share links.
    #[sea_orm(unique, nullable)]
    pub short_code: Option<String>,

    pub is_closed: bool,

    #[sea_orm(nullable)]
    pub starts_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(nullable)]
    pub ends_at: Option<DateTimeWithTimeZone>,

    /// Stored but not consulted when voting (polls are single-choice).
    pub allow_multiple: bool,

    /// Stored but not consulted when voting (polls are single-choice).
    pub max_choices: i32,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::poll_option::Entity")]
    PollOption,

    #[sea_orm(has_many = "super::vote::Entity")]
    Vote,
}

impl Related<super::poll_option::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PollOption.def()
    }
}

impl Related<super::vote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vote.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
