//! Commit ingestion and newest-first scans.

use std::collections::BTreeMap;

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entity::commit::{ActiveModel, Column, Entity as Commit, Model};
use crate::platform::PlatformCommit;

use super::authors;
use super::errors::Result;
use super::port::CommitIngest;

/// Count commits per author.
fn tally_authors(commits: &[PlatformCommit]) -> BTreeMap<String, i64> {
    let mut counts = BTreeMap::new();
    for commit in commits {
        *counts.entry(commit.author.clone()).or_insert(0) += 1;
    }
    counts
}

/// Store every commit whose sha is new and credit its author, in one transaction.
///
/// `commits` arrive newest first, as the remote lists them; they are written
/// oldest first so that id order follows history. If any write fails nothing
/// is kept, so a retry sees the same commits as new and credits them then.
pub async fn ingest(
    db: &DatabaseConnection,
    repository_id: Uuid,
    commits: &[PlatformCommit],
) -> Result<CommitIngest> {
    let txn = db.begin().await?;
    let inserted = insert_new(&txn, repository_id, commits).await?;

    let author_increments = tally_authors(&inserted);
    for (author, count) in &author_increments {
        authors::increment(&txn, author, *count).await?;
    }

    txn.commit().await?;
    Ok(CommitIngest {
        inserted,
        author_increments,
    })
}

async fn insert_new<C: ConnectionTrait>(
    db: &C,
    repository_id: Uuid,
    commits: &[PlatformCommit],
) -> Result<Vec<PlatformCommit>> {
    let now = Utc::now().fixed_offset();
    let mut inserted = Vec::new();

    for commit in commits.iter().rev() {
        let model = ActiveModel {
            id: NotSet,
            repository_id: Set(repository_id),
            sha: Set(commit.sha.clone()),
            message: Set(commit.message.clone()),
            author: Set(commit.author.clone()),
            authored_at: Set(commit.authored_at.map(|t| t.fixed_offset())),
            html_url: Set(commit.html_url.clone()),
            created_at: Set(now),
        };

        let rows = Commit::insert(model)
            .on_conflict(OnConflict::column(Column::Sha).do_nothing().to_owned())
            .exec_without_returning(db)
            .await?;
        if rows > 0 {
            inserted.push(commit.clone());
        }
    }

    Ok(inserted)
}

/// Most recently inserted commit of a repository.
pub async fn find_most_recent<C: ConnectionTrait>(
    db: &C,
    repository_id: Uuid,
) -> Result<Option<Model>> {
    Ok(Commit::find()
        .filter(Column::RepositoryId.eq(repository_id))
        .order_by_desc(Column::Id)
        .one(db)
        .await?)
}

/// All commits of a repository, newest inserted first.
pub async fn find_by_repository<C: ConnectionTrait>(
    db: &C,
    repository_id: Uuid,
) -> Result<Vec<Model>> {
    Ok(Commit::find()
        .filter(Column::RepositoryId.eq(repository_id))
        .order_by_desc(Column::Id)
        .all(db)
        .await?)
}

pub async fn delete<C: ConnectionTrait>(db: &C, id: i64) -> Result<u64> {
    let result = Commit::delete_by_id(id).exec(db).await?;
    Ok(result.rows_affected)
}
