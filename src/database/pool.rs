use crate::config::Config;
use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use std::time::Duration;

pub async fn create_pool(config: &Config) -> Result<SqlitePool> {
    let in_memory = config.database_url.contains(":memory:");
    let mut options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(config.database_busy_timeout_secs));
    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    // An in-memory database lives exactly as long as its connection.
    let pool = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(config.database_max_connections.max(1))
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await?
    };
    Ok(pool)
}

/// Opens a transaction that holds SQLite's write lock from its first
/// statement.
///
/// sqlx begins with a deferred `BEGIN`, which takes a read snapshot first and
/// fails with `SQLITE_BUSY` when it later needs to write while another writer
/// committed in between. The empty deferred transaction is closed and replaced
/// with `BEGIN IMMEDIATE`, which waits on the busy timeout instead. Commit and
/// rollback-on-drop still go through the returned `Transaction`.
pub async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>> {
    let mut tx = pool.begin().await?;
    sqlx::query("COMMIT").execute(&mut *tx).await?;
    sqlx::query("BEGIN IMMEDIATE").execute(&mut *tx).await?;
    Ok(tx)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| crate::error::Error::Internal(format!("Migration failed: {}", e)))?;
    Ok(())
}

/// Fresh, migrated in-memory pool.
pub async fn create_memory_pool() -> Result<SqlitePool> {
    let pool = create_pool(&Config::default()).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}
