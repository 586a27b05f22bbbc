//! User upsert and lookup.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::entity::user::{ActiveModel, Column, Entity as User, Model};

use super::errors::{Result, StoreError};

/// Insert a user, or refresh the display name of an existing one.
///
/// A `None` display name leaves an existing name untouched.
pub async fn upsert<C: ConnectionTrait>(
    db: &C,
    username: &str,
    display_name: Option<&str>,
) -> Result<Model> {
    let model = ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_string()),
        display_name: Set(display_name.map(str::to_string)),
        created_at: Set(Utc::now().fixed_offset()),
    };

    let on_conflict = if display_name.is_some() {
        OnConflict::column(Column::Username)
            .update_column(Column::DisplayName)
            .to_owned()
    } else {
        OnConflict::column(Column::Username).do_nothing().to_owned()
    };

    User::insert(model)
        .on_conflict(on_conflict)
        .exec_without_returning(db)
        .await?;

    find_by_username(db, username)
        .await?
        .ok_or_else(|| StoreError::not_found(format!("user {username}")))
}

pub async fn find_by_username<C: ConnectionTrait>(db: &C, username: &str) -> Result<Option<Model>> {
    Ok(User::find()
        .filter(Column::Username.eq(username))
        .one(db)
        .await?)
}
