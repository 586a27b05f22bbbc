//! Initial migration creating users, repositories, commits and author counts.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_users(manager).await?;
        self.create_repositories(manager).await?;
        self.create_commits(manager).await?;
        self.create_author_commit_counts(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuthorCommitCounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Commits::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Repositories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}

impl Migration {
    async fn create_users(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Users::Username).string().not_null())
                    .col(ColumnDef::new(Users::DisplayName).string().null())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_users_username")
                    .table(Users::Table)
                    .col(Users::Username)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn create_repositories(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Repositories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Repositories::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    // Identity
                    .col(
                        ColumnDef::new(Repositories::RemoteId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Repositories::OwnerId).uuid().not_null())
                    .col(ColumnDef::new(Repositories::Name).string().not_null())
                    // Content
                    .col(ColumnDef::new(Repositories::Description).text().null())
                    .col(ColumnDef::new(Repositories::HtmlUrl).string().not_null())
                    .col(ColumnDef::new(Repositories::Language).string().null())
                    .col(
                        ColumnDef::new(Repositories::IsFork)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    // Statistics
                    .col(
                        ColumnDef::new(Repositories::Forks)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Repositories::Stars)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Repositories::OpenIssues)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Repositories::Watchers)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    // Timestamps
                    .col(
                        ColumnDef::new(Repositories::RemoteCreatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Repositories::RemoteUpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Repositories::SyncedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_repositories_owner")
                            .from(Repositories::Table, Repositories::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Merge idempotency key
        manager
            .create_index(
                Index::create()
                    .name("idx_repositories_remote_id")
                    .table(Repositories::Table)
                    .col(Repositories::RemoteId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Point lookup by owner + name
        manager
            .create_index(
                Index::create()
                    .name("idx_repositories_owner_name")
                    .table(Repositories::Table)
                    .col(Repositories::OwnerId)
                    .col(Repositories::Name)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_repositories_stars")
                    .table(Repositories::Table)
                    .col((Repositories::Stars, IndexOrder::Desc))
                    .to_owned(),
            )
            .await
    }

    async fn create_commits(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Commits::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Commits::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Commits::RepositoryId).uuid().not_null())
                    .col(ColumnDef::new(Commits::Sha).string().not_null())
                    .col(ColumnDef::new(Commits::Message).text().not_null())
                    .col(ColumnDef::new(Commits::Author).string().not_null())
                    .col(
                        ColumnDef::new(Commits::AuthoredAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Commits::HtmlUrl).string().not_null())
                    .col(
                        ColumnDef::new(Commits::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_commits_repository")
                            .from(Commits::Table, Commits::RepositoryId)
                            .to(Repositories::Table, Repositories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_commits_sha")
                    .table(Commits::Table)
                    .col(Commits::Sha)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Newest-first scans per repository
        manager
            .create_index(
                Index::create()
                    .name("idx_commits_repository_id")
                    .table(Commits::Table)
                    .col(Commits::RepositoryId)
                    .col((Commits::Id, IndexOrder::Desc))
                    .to_owned(),
            )
            .await
    }

    async fn create_author_commit_counts(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AuthorCommitCounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuthorCommitCounts::Author)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AuthorCommitCounts::CommitCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(AuthorCommitCounts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_author_commit_counts_count")
                    .table(AuthorCommitCounts::Table)
                    .col((AuthorCommitCounts::CommitCount, IndexOrder::Desc))
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    DisplayName,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Repositories {
    Table,
    Id,
    RemoteId,
    OwnerId,
    Name,
    Description,
    HtmlUrl,
    Language,
    IsFork,
    Forks,
    Stars,
    OpenIssues,
    Watchers,
    RemoteCreatedAt,
    RemoteUpdatedAt,
    SyncedAt,
}

#[derive(DeriveIden)]
enum Commits {
    Table,
    Id,
    RepositoryId,
    Sha,
    Message,
    Author,
    AuthoredAt,
    HtmlUrl,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AuthorCommitCounts {
    Table,
    Author,
    CommitCount,
    UpdatedAt,
}
