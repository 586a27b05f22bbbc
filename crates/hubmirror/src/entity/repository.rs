//! Repository entity - mirrored repository metadata.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "repositories")]
pub struct Model {
    /// Internal UUID primary key. Commits reference this, not the name.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    // ─── Identity ────────────────────────────────────────────────────────────
    /// Remote numeric id. Merge idempotency key.
    #[sea_orm(unique)]
    pub remote_id: i64,
    pub owner_id: Uuid,
    pub name: String,

    // ─── Content ─────────────────────────────────────────────────────────────
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub html_url: String,
    pub language: Option<String>,
    #[sea_orm(default_value = false)]
    pub is_fork: bool,

    // ─── Statistics ──────────────────────────────────────────────────────────
    pub forks: i32,
    pub stars: i32,
    pub open_issues: i32,
    pub watchers: i32,

    // ─── Timestamps ──────────────────────────────────────────────────────────
    pub remote_created_at: Option<DateTimeWithTimeZone>,
    /// Compared against the remote on rescan to detect drift.
    pub remote_updated_at: Option<DateTimeWithTimeZone>,
    /// When this row was last written from the remote.
    pub synced_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id"
    )]
    Owner,
    #[sea_orm(has_many = "super::commit::Entity")]
    Commit,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::commit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Commit.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
