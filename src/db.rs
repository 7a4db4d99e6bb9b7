//! SQLite connection setup for the index database.
//!
//! One pool per process. WAL journaling keeps retrieval reads concurrent
//! with an indexing pass that is writing. The database is derived state:
//! deleting the file and rerunning `sv index` rebuilds it from the vault.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::config::Config;

/// Open (or create) the index database at `[db].path`.
pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let path = &config.db.path;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create database directory for {}", path.display())
        })?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open index database at {}", path.display()))?;

    Ok(pool)
}
