use anyhow::Result;
use sqlx::SqlitePool;

/// Create the schema. Idempotent; safe to run at every startup.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            note_path TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            text TEXT NOT NULL,
            chunk_hash TEXT NOT NULL,
            note_hash TEXT NOT NULL,
            tags_json TEXT NOT NULL DEFAULT '[]',
            model TEXT NOT NULL,
            dims INTEGER NOT NULL,
            embedding BLOB NOT NULL,
            indexed_at INTEGER NOT NULL,
            UNIQUE(note_path, chunk_index)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_note_path ON chunks(note_path)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_note_hash ON chunks(note_path, note_hash)")
        .execute(pool)
        .await?;

    Ok(())
}
