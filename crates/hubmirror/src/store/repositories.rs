//! Repository merge and queries.
//!
//! The merge is keyed by `remote_id`, which carries a unique index. The
//! insert path uses `ON CONFLICT DO NOTHING` and re-reads on conflict, so two
//! concurrent merges of the same remote repository converge on one row.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entity::repository::{ActiveModel, Column, Entity as Repository, Model};
use crate::entity::user::{Entity as User, Model as UserModel};
use crate::platform::PlatformRepo;

use super::errors::{Result, StoreError};
use super::port::{MergeOutcome, RepositoryFilter, TrackedRepository};
use super::users;

fn fill_metadata(model: &mut ActiveModel, owner: &UserModel, remote: &PlatformRepo) {
    model.owner_id = Set(owner.id);
    model.name = Set(remote.name.clone());
    model.description = Set(remote.description.clone());
    model.html_url = Set(remote.html_url.clone());
    model.language = Set(remote.language.clone());
    model.is_fork = Set(remote.is_fork);
    model.forks = Set(remote.forks);
    model.stars = Set(remote.stars);
    model.open_issues = Set(remote.open_issues);
    model.watchers = Set(remote.watchers);
    model.remote_created_at = Set(remote.created_at.map(|t| t.fixed_offset()));
    model.remote_updated_at = Set(remote.updated_at.map(|t| t.fixed_offset()));
    model.synced_at = Set(Utc::now().fixed_offset());
}

fn new_active_model(owner: &UserModel, remote: &PlatformRepo) -> ActiveModel {
    let mut model = ActiveModel {
        id: Set(Uuid::new_v4()),
        remote_id: Set(remote.remote_id),
        ..Default::default()
    };
    fill_metadata(&mut model, owner, remote);
    model
}

pub async fn find_by_remote_id<C: ConnectionTrait>(
    db: &C,
    remote_id: i64,
) -> Result<Option<Model>> {
    Ok(Repository::find()
        .filter(Column::RemoteId.eq(remote_id))
        .one(db)
        .await?)
}

/// Bring an existing row in line with `remote`, unless it is already current.
async fn reconcile<C: ConnectionTrait>(
    db: &C,
    existing: Model,
    owner: &UserModel,
    remote: &PlatformRepo,
) -> Result<MergeOutcome> {
    let incoming = remote.updated_at.map(|t| t.fixed_offset());
    if existing.remote_updated_at == incoming {
        return Ok(MergeOutcome::Unchanged(existing));
    }

    let mut model: ActiveModel = existing.into();
    fill_metadata(&mut model, owner, remote);
    Ok(MergeOutcome::Updated(model.update(db).await?))
}

async fn merge_in<C: ConnectionTrait>(
    db: &C,
    owner: &UserModel,
    remote: &PlatformRepo,
) -> Result<MergeOutcome> {
    if let Some(existing) = find_by_remote_id(db, remote.remote_id).await? {
        return reconcile(db, existing, owner, remote).await;
    }

    let inserted = Repository::insert(new_active_model(owner, remote))
        .on_conflict(OnConflict::column(Column::RemoteId).do_nothing().to_owned())
        .exec_without_returning(db)
        .await?;

    let stored = find_by_remote_id(db, remote.remote_id)
        .await?
        .ok_or_else(|| StoreError::conflict(format!("remote_id {}", remote.remote_id)))?;

    if inserted > 0 {
        Ok(MergeOutcome::Inserted(stored))
    } else {
        // A concurrent merge inserted first.
        reconcile(db, stored, owner, remote).await
    }
}

/// Idempotent upsert of a remote repository, atomic in one transaction.
pub async fn merge(
    db: &DatabaseConnection,
    owner: &UserModel,
    remote: &PlatformRepo,
) -> Result<MergeOutcome> {
    let txn = db.begin().await?;
    let outcome = merge_in(&txn, owner, remote).await?;
    txn.commit().await?;
    Ok(outcome)
}

/// Point lookup by owner username and repository name.
pub async fn find_by_owner_and_name<C: ConnectionTrait>(
    db: &C,
    owner: &str,
    name: &str,
) -> Result<Option<TrackedRepository>> {
    let Some(user) = users::find_by_username(db, owner).await? else {
        return Ok(None);
    };

    let repository = Repository::find()
        .filter(Column::OwnerId.eq(user.id))
        .filter(Column::Name.eq(name))
        .one(db)
        .await?;

    Ok(repository.map(|repository| TrackedRepository {
        repository,
        owner: user,
    }))
}

/// Every stored repository with its owner, ordered by name.
pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<TrackedRepository>> {
    let rows = Repository::find()
        .find_also_related(User)
        .order_by_asc(Column::Name)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(repository, owner)| {
            owner.map(|owner| TrackedRepository { repository, owner })
        })
        .collect())
}

/// Repositories of one owner narrowed by `filter`.
pub async fn search<C: ConnectionTrait>(
    db: &C,
    owner_id: Uuid,
    filter: &RepositoryFilter,
) -> Result<Vec<Model>> {
    let mut query = Repository::find().filter(Column::OwnerId.eq(owner_id));

    if let Some(name) = filter.name.as_deref().filter(|n| !n.is_empty()) {
        query = query.filter(Column::Name.contains(name));
    }
    if let Some(language) = filter.language.as_deref().filter(|l| !l.is_empty()) {
        query = query.filter(Column::Language.eq(language));
    }

    query = match filter.top_stars {
        Some(limit) if limit > 0 => query
            .order_by_desc(Column::Stars)
            .order_by_asc(Column::Name)
            .limit(limit),
        _ => query.order_by_asc(Column::Name),
    };

    Ok(query.all(db).await?)
}
