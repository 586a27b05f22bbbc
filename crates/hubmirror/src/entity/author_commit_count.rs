//! AuthorCommitCount entity - cumulative commits per author name across all repositories.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "author_commit_counts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub author: String,
    /// Only ever incremented.
    pub commit_count: i64,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
