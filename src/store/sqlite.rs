//! SQLite [`VectorStore`] backend.
//!
//! Chunks live in a single `chunks` table with the embedding stored as a
//! little-endian f32 BLOB. Similarity queries fetch all vectors and compute
//! cosine similarity in Rust — brute force, but vault-sized collections are
//! small and it keeps the schema free of extension dependencies. The on-disk
//! database survives restarts and can always be rebuilt from the vault.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};

use super::{rank_hits, ChunkHit, ChunkRecord, TagFilter, VectorStore};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn upsert_chunks(&self, records: &[ChunkRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for record in records {
            let blob = vec_to_blob(&record.embedding);
            let tags_json = serde_json::to_string(&record.tags)?;

            sqlx::query(
                r#"
                INSERT INTO chunks (id, note_path, chunk_index, text, chunk_hash, note_hash,
                                    tags_json, model, dims, embedding, indexed_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(note_path, chunk_index) DO UPDATE SET
                    id = excluded.id,
                    text = excluded.text,
                    chunk_hash = excluded.chunk_hash,
                    note_hash = excluded.note_hash,
                    tags_json = excluded.tags_json,
                    model = excluded.model,
                    dims = excluded.dims,
                    embedding = excluded.embedding,
                    indexed_at = excluded.indexed_at
                "#,
            )
            .bind(&record.id)
            .bind(&record.note_path)
            .bind(record.chunk_index)
            .bind(&record.text)
            .bind(&record.chunk_hash)
            .bind(&record.note_hash)
            .bind(&tags_json)
            .bind(&record.model)
            .bind(record.dims as i64)
            .bind(&blob)
            .bind(record.indexed_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_note(&self, note_path: &str) -> Result<()> {
        sqlx::query("DELETE FROM chunks WHERE note_path = ?")
            .bind(note_path)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&TagFilter>,
    ) -> Result<Vec<ChunkHit>> {
        let rows = sqlx::query(
            "SELECT note_path, chunk_index, text, tags_json, embedding FROM chunks",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in &rows {
            let tags_json: String = row.get("tags_json");
            let tags: Vec<String> = serde_json::from_str(&tags_json).unwrap_or_default();

            if let Some(f) = filter {
                if !f.matches(&tags) {
                    continue;
                }
            }

            let blob: Vec<u8> = row.get("embedding");
            let stored = blob_to_vec(&blob);
            let similarity = cosine_similarity(vector, &stored);

            hits.push(ChunkHit {
                note_path: row.get("note_path"),
                chunk_index: row.get("chunk_index"),
                text: row.get("text"),
                tags,
                similarity,
            });
        }

        Ok(rank_hits(hits, k))
    }

    async fn note_hashes(&self) -> Result<HashMap<String, String>> {
        let rows = sqlx::query("SELECT DISTINCT note_path, note_hash FROM chunks")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| (row.get("note_path"), row.get("note_hash")))
            .collect())
    }

    async fn chunk_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
