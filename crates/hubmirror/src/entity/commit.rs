//! Commit entity - append-only history, truncated only by reset.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "commits")]
pub struct Model {
    /// Auto-increment; ordering by id is local insertion order.
    #[sea_orm(primary_key)]
    pub id: i64,
    pub repository_id: Uuid,
    /// Globally unique, immutable.
    #[sea_orm(unique)]
    pub sha: String,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    pub author: String,
    pub authored_at: Option<DateTimeWithTimeZone>,
    pub html_url: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::repository::Entity",
        from = "Column::RepositoryId",
        to = "super::repository::Column::Id",
        on_delete = "Cascade"
    )]
    Repository,
}

impl Related<super::repository::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Repository.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
