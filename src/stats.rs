//! Vault and index statistics.
//!
//! Summarizes what is on disk versus what is indexed: note and chunk
//! counts, embedding model, database size, and a per-folder breakdown.
//! Used by `sv stats` to confirm indexing passes are keeping up.

use anyhow::Result;
use sqlx::Row;

use crate::config::Config;
use crate::db;
use crate::vault;

struct FolderStats {
    folder: String,
    note_count: i64,
    chunk_count: i64,
}

/// Run the stats command: compare the vault on disk with the index.
pub async fn run_stats(config: &Config) -> Result<()> {
    let notes = vault::scan_vault(&config.vault)?;
    let total_words: usize = notes.iter().map(|n| n.word_count).sum();

    let pool = db::connect(config).await?;

    let indexed_notes: i64 =
        sqlx::query_scalar("SELECT COUNT(DISTINCT note_path) FROM chunks")
            .fetch_one(&pool)
            .await?;

    let total_chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
        .fetch_one(&pool)
        .await?;

    let model: Option<String> = sqlx::query_scalar("SELECT DISTINCT model FROM chunks LIMIT 1")
        .fetch_optional(&pool)
        .await?;

    let last_indexed: Option<i64> = sqlx::query_scalar("SELECT MAX(indexed_at) FROM chunks")
        .fetch_one(&pool)
        .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Semvault — Index Stats");
    println!("======================");
    println!();
    println!("  Vault:        {}", config.vault.root.display());
    println!("  Notes:        {} ({} words)", notes.len(), total_words);
    println!();
    println!("  Database:     {}", config.db.path.display());
    println!("  Size:         {}", format_bytes(db_size));
    println!(
        "  Indexed:      {} / {} notes, {} chunks",
        indexed_notes,
        notes.len(),
        total_chunks
    );
    println!(
        "  Model:        {}",
        model.as_deref().unwrap_or("(none)")
    );
    println!(
        "  Last indexed: {}",
        match last_indexed {
            Some(ts) => format_ts_relative(ts),
            None => "never".to_string(),
        }
    );

    let folder_rows = sqlx::query(
        r#"
        SELECT
            CASE WHEN instr(note_path, '/') = 0 THEN '.'
                 ELSE rtrim(note_path, replace(note_path, '/', ''))
            END AS folder_key,
            COUNT(DISTINCT note_path) AS note_count,
            COUNT(*) AS chunk_count
        FROM chunks
        GROUP BY folder_key
        ORDER BY note_count DESC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    let folder_stats: Vec<FolderStats> = folder_rows
        .iter()
        .map(|row| {
            let raw: String = row.get("folder_key");
            FolderStats {
                folder: raw.trim_end_matches('/').to_string(),
                note_count: row.get("note_count"),
                chunk_count: row.get("chunk_count"),
            }
        })
        .collect();

    if !folder_stats.is_empty() {
        println!();
        println!("  By folder:");
        println!("  {:<32} {:>6} {:>8}", "FOLDER", "NOTES", "CHUNKS");
        println!("  {}", "-".repeat(48));
        for s in &folder_stats {
            println!(
                "  {:<32} {:>6} {:>8}",
                s.folder, s.note_count, s.chunk_count
            );
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let delta = now - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
