use super::{Category, IssueStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "issues")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_type = "String(StringLen::N(200))")]
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "String(StringLen::N(40))")]
    pub category: String,
    pub latitude: f64,
    pub longitude: f64,
    pub location_name: Option<String>,
    pub street_address: Option<String>,
    pub landmark: Option<String>,
    pub image_url: Option<String>,
    pub is_spam: bool,
    pub duplicate_of: Option<i32>,
    pub priority_score: f64,
    pub upvotes_count: i32,
    #[sea_orm(column_type = "String(StringLen::N(20))")]
    pub status: String,
    pub assigned_to: Option<String>,
    pub response_time_seconds: Option<i64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub public_notes: Option<String>,
    #[serde(skip_serializing)]
    pub submitter_fingerprint: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    pub resolved_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::DuplicateOf",
        to = "Column::Id"
    )]
    Canonical,
    #[sea_orm(has_many = "super::issue_upvote::Entity")]
    Upvotes,
}

impl Related<super::issue_upvote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Upvotes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Stores only ever write known values; anything else reads as `Other`.
    pub fn category(&self) -> Category {
        self.category.parse().unwrap_or(Category::Other)
    }

    pub fn status(&self) -> IssueStatus {
        self.status.parse().unwrap_or(IssueStatus::New)
    }

    pub fn is_open(&self) -> bool {
        self.status() != IssueStatus::Resolved
    }

    /// Open, non-spam, canonical issues are the only valid duplicate targets.
    pub fn is_merge_target(&self) -> bool {
        !self.is_spam && self.is_open() && self.duplicate_of.is_none()
    }
}
