//! Database connection utilities.

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Apply SQLite pragmas for concurrent access from many background tasks.
///
/// - `journal_mode=WAL` so readers don't block the discovery writers
/// - `busy_timeout=5000` to wait on lock contention instead of failing
/// - `synchronous=NORMAL`, which is safe with WAL
async fn configure_sqlite(db: &DatabaseConnection) -> Result<(), DbErr> {
    use sea_orm::{ConnectionTrait, Statement};

    for pragma in [
        "PRAGMA journal_mode=WAL",
        "PRAGMA busy_timeout=5000",
        "PRAGMA synchronous=NORMAL",
    ] {
        db.execute(Statement::from_string(
            db.get_database_backend(),
            pragma.to_string(),
        ))
        .await?;
    }

    Ok(())
}

fn is_sqlite_memory(database_url: &str) -> bool {
    database_url.starts_with("sqlite:") && database_url.contains(":memory:")
}

/// Connection options for `database_url`.
///
/// An in-memory SQLite database lives and dies with its connection, so it is
/// pinned to a single pooled connection.
fn connect_options(database_url: &str) -> ConnectOptions {
    let mut options = ConnectOptions::new(database_url.to_string());
    options.sqlx_logging(false);
    if is_sqlite_memory(database_url) {
        options.max_connections(1).min_connections(1);
    }
    options
}

/// Establish a connection to the database.
///
/// File-backed SQLite databases get WAL mode, a 5 second busy timeout and
/// NORMAL synchronous mode.
///
/// # Errors
/// Returns `DbErr` if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(connect_options(database_url)).await?;

    if database_url.starts_with("sqlite://") && !is_sqlite_memory(database_url) {
        configure_sqlite(&db).await?;
    }

    Ok(db)
}

/// Connect and run all pending migrations.
///
/// # Example
/// ```ignore
/// let db = hubmirror::connect_and_migrate("sqlite://hubmirror.db?mode=rwc").await?;
/// ```
#[cfg(feature = "migrate")]
pub async fn connect_and_migrate(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    use sea_orm_migration::MigratorTrait;

    let db = connect(database_url).await?;
    crate::migration::Migrator::up(&db, None).await?;
    Ok(db)
}
