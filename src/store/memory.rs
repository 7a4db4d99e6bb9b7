//! In-memory [`VectorStore`] implementation for tests.
//!
//! Uses a `Vec` behind `std::sync::RwLock`. Queries are brute-force cosine
//! similarity, same ranking as the SQLite backend.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::embedding::cosine_similarity;

use super::{rank_hits, ChunkHit, ChunkRecord, TagFilter, VectorStore};

#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<ChunkRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records, for test assertions.
    pub fn records(&self) -> Vec<ChunkRecord> {
        self.records.read().unwrap().clone()
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn upsert_chunks(&self, records: &[ChunkRecord]) -> Result<()> {
        let mut stored = self.records.write().unwrap();
        for record in records {
            stored.retain(|r| {
                !(r.note_path == record.note_path && r.chunk_index == record.chunk_index)
            });
            stored.push(record.clone());
        }
        Ok(())
    }

    async fn delete_note(&self, note_path: &str) -> Result<()> {
        self.records
            .write()
            .unwrap()
            .retain(|r| r.note_path != note_path);
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&TagFilter>,
    ) -> Result<Vec<ChunkHit>> {
        let stored = self.records.read().unwrap();

        let hits = stored
            .iter()
            .filter(|r| filter.map_or(true, |f| f.matches(&r.tags)))
            .map(|r| ChunkHit {
                note_path: r.note_path.clone(),
                chunk_index: r.chunk_index,
                text: r.text.clone(),
                tags: r.tags.clone(),
                similarity: cosine_similarity(vector, &r.embedding),
            })
            .collect();

        Ok(rank_hits(hits, k))
    }

    async fn note_hashes(&self) -> Result<HashMap<String, String>> {
        let stored = self.records.read().unwrap();
        Ok(stored
            .iter()
            .map(|r| (r.note_path.clone(), r.note_hash.clone()))
            .collect())
    }

    async fn chunk_count(&self) -> Result<i64> {
        Ok(self.records.read().unwrap().len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, idx: i64, embedding: Vec<f32>, tags: &[&str]) -> ChunkRecord {
        ChunkRecord {
            id: format!("{path}:{idx}"),
            note_path: path.to_string(),
            chunk_index: idx,
            text: format!("chunk {idx} of {path}"),
            chunk_hash: "ch".to_string(),
            note_hash: "nh".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            model: "test".to_string(),
            dims: embedding.len(),
            embedding,
            indexed_at: 0,
        }
    }

    #[tokio::test]
    async fn test_upsert_overwrites_same_slot() {
        let store = MemoryStore::new();
        store
            .upsert_chunks(&[record("a.md", 0, vec![1.0, 0.0], &[])])
            .await
            .unwrap();
        store
            .upsert_chunks(&[record("a.md", 0, vec![0.0, 1.0], &[])])
            .await
            .unwrap();
        assert_eq!(store.chunk_count().await.unwrap(), 1);
        assert_eq!(store.records()[0].embedding, vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn test_delete_note_removes_all_chunks() {
        let store = MemoryStore::new();
        store
            .upsert_chunks(&[
                record("a.md", 0, vec![1.0, 0.0], &[]),
                record("a.md", 1, vec![0.0, 1.0], &[]),
                record("b.md", 0, vec![1.0, 1.0], &[]),
            ])
            .await
            .unwrap();

        store.delete_note("a.md").await.unwrap();
        assert_eq!(store.chunk_count().await.unwrap(), 1);
        assert_eq!(store.records()[0].note_path, "b.md");
    }

    #[tokio::test]
    async fn test_query_ranks_by_similarity() {
        let store = MemoryStore::new();
        store
            .upsert_chunks(&[
                record("far.md", 0, vec![0.0, 1.0], &[]),
                record("near.md", 0, vec![1.0, 0.0], &[]),
            ])
            .await
            .unwrap();

        let hits = store.query(&[1.0, 0.0], 2, None).await.unwrap();
        assert_eq!(hits[0].note_path, "near.md");
        assert!((hits[0].similarity - 1.0).abs() < 1e-6);
        assert_eq!(hits[1].note_path, "far.md");
    }

    #[tokio::test]
    async fn test_query_with_tag_filter() {
        let store = MemoryStore::new();
        store
            .upsert_chunks(&[
                record("a.md", 0, vec![1.0, 0.0], &["infra"]),
                record("b.md", 0, vec![1.0, 0.0], &["poetry"]),
            ])
            .await
            .unwrap();

        let filter = TagFilter {
            any_of: vec!["infra".to_string()],
        };
        let hits = store.query(&[1.0, 0.0], 10, Some(&filter)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].note_path, "a.md");
    }

    #[tokio::test]
    async fn test_is_empty_probe() {
        let store = MemoryStore::new();
        assert!(store.is_empty().await.unwrap());
        store
            .upsert_chunks(&[record("a.md", 0, vec![1.0], &[])])
            .await
            .unwrap();
        assert!(!store.is_empty().await.unwrap());
    }
}
