//! Cumulative per-author commit counters.

use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ConnectionTrait, EntityTrait, QueryOrder, QuerySelect, Set};

use crate::entity::author_commit_count::{
    ActiveModel, Column, Entity as AuthorCommitCount, Model,
};

use super::errors::Result;

/// Add `count` to an author's total, creating the row on first sight.
///
/// The increment happens inside the database (`commit_count = commit_count + n`),
/// so concurrent callers never overwrite each other.
pub async fn increment<C: ConnectionTrait>(db: &C, author: &str, count: i64) -> Result<()> {
    if count <= 0 {
        return Ok(());
    }

    let model = ActiveModel {
        author: Set(author.to_string()),
        commit_count: Set(count),
        updated_at: Set(Utc::now().fixed_offset()),
    };

    AuthorCommitCount::insert(model)
        .on_conflict(
            OnConflict::column(Column::Author)
                .value(
                    Column::CommitCount,
                    Expr::col((AuthorCommitCount, Column::CommitCount)).add(count),
                )
                .update_column(Column::UpdatedAt)
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Ok(())
}

pub async fn find_count<C: ConnectionTrait>(db: &C, author: &str) -> Result<Option<i64>> {
    Ok(AuthorCommitCount::find_by_id(author.to_string())
        .one(db)
        .await?
        .map(|row| row.commit_count))
}

/// Highest counts first; equal counts ordered by author name.
pub async fn find_top<C: ConnectionTrait>(db: &C, limit: u64) -> Result<Vec<Model>> {
    Ok(AuthorCommitCount::find()
        .order_by_desc(Column::CommitCount)
        .order_by_asc(Column::Author)
        .limit(limit)
        .all(db)
        .await?)
}
