//! Vector store abstraction.
//!
//! The [`VectorStore`] trait defines the persistent collection of embedded
//! chunks the engine reads and writes: upsert, delete-by-note, and
//! nearest-neighbor query with tag filtering. Two backends implement it —
//! SQLite ([`sqlite::SqliteStore`]) for production and an in-memory store
//! ([`memory::MemoryStore`]) for tests.
//!
//! The store is an explicitly injected, lifecycle-scoped resource: opened
//! once at startup and passed by reference, never a hidden singleton. Only
//! the indexer writes; retrieval and both suggestion engines only read.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// One embedded chunk as persisted in the store.
///
/// `note_hash` is the hash of the owning note's full effective text; the
/// indexer replaces a note's chunk set as a unit, so all records for one
/// path always carry the same `note_hash`.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    /// Chunk UUID.
    pub id: String,
    pub note_path: String,
    pub chunk_index: i64,
    pub text: String,
    /// SHA-256 of this chunk's text.
    pub chunk_hash: String,
    /// SHA-256 of the owning note's effective text.
    pub note_hash: String,
    /// Frontmatter tags of the owning note.
    pub tags: Vec<String>,
    /// Embedding model that produced the vector.
    pub model: String,
    pub dims: usize,
    pub embedding: Vec<f32>,
    /// Unix timestamp of the indexing pass that wrote this record.
    pub indexed_at: i64,
}

/// A chunk returned from a nearest-neighbor query.
#[derive(Debug, Clone)]
pub struct ChunkHit {
    pub note_path: String,
    pub chunk_index: i64,
    pub text: String,
    pub tags: Vec<String>,
    /// Cosine similarity to the query vector.
    pub similarity: f32,
}

/// Tag-inclusion predicate: a chunk matches when its tag set intersects
/// `any_of`. An empty predicate matches everything.
#[derive(Debug, Clone, Default)]
pub struct TagFilter {
    pub any_of: Vec<String>,
}

impl TagFilter {
    pub fn matches(&self, tags: &[String]) -> bool {
        self.any_of.is_empty() || tags.iter().any(|t| self.any_of.contains(t))
    }
}

/// Abstract storage backend for embedded chunks.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert_chunks`](VectorStore::upsert_chunks) | Insert or overwrite chunk records |
/// | [`delete_note`](VectorStore::delete_note) | Remove all chunks owned by a note |
/// | [`query`](VectorStore::query) | Nearest-neighbor search with tag filter |
/// | [`note_hashes`](VectorStore::note_hashes) | Per-note content hash map for the indexer |
/// | [`chunk_count`](VectorStore::chunk_count) | Total chunks (emptiness probe) |
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or overwrite chunk records. Idempotent: re-upserting the
    /// same (note path, chunk index) slot overwrites vector and metadata.
    async fn upsert_chunks(&self, records: &[ChunkRecord]) -> Result<()>;

    /// Remove every chunk owned by `note_path`.
    async fn delete_note(&self, note_path: &str) -> Result<()>;

    /// Return up to `k` chunks ranked by descending cosine similarity to
    /// `vector`. Ties are broken by note path, then chunk index, so results
    /// are deterministic. `filter` restricts candidates by tag.
    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&TagFilter>,
    ) -> Result<Vec<ChunkHit>>;

    /// Map of note path → stored note-level content hash.
    ///
    /// Drives the indexer's state machine; each path appears once because
    /// hashes are uniform across a note's chunk set.
    async fn note_hashes(&self) -> Result<HashMap<String, String>>;

    /// Total number of stored chunks.
    async fn chunk_count(&self) -> Result<i64>;

    /// True when the store holds no chunks at all.
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.chunk_count().await? == 0)
    }
}

/// Rank raw chunk hits into query output: similarity
/// descending, ties by note path then chunk index, truncated to `k`.
/// Shared by both backends so their ordering semantics cannot drift.
pub(crate) fn rank_hits(mut hits: Vec<ChunkHit>, k: usize) -> Vec<ChunkHit> {
    hits.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.note_path.cmp(&b.note_path))
            .then_with(|| a.chunk_index.cmp(&b.chunk_index))
    });
    hits.truncate(k);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_filter_empty_matches_all() {
        let filter = TagFilter::default();
        assert!(filter.matches(&[]));
        assert!(filter.matches(&["x".to_string()]));
    }

    #[test]
    fn test_tag_filter_intersection() {
        let filter = TagFilter {
            any_of: vec!["infra".to_string()],
        };
        assert!(filter.matches(&["infra".to_string(), "linux".to_string()]));
        assert!(!filter.matches(&["poetry".to_string()]));
    }

    #[test]
    fn test_rank_hits_tie_broken_by_path() {
        let mk = |path: &str, idx: i64, sim: f32| ChunkHit {
            note_path: path.to_string(),
            chunk_index: idx,
            text: String::new(),
            tags: Vec::new(),
            similarity: sim,
        };
        let hits = vec![mk("b.md", 0, 0.5), mk("a.md", 1, 0.5), mk("a.md", 0, 0.5)];
        let ranked = rank_hits(hits, 10);
        assert_eq!(ranked[0].note_path, "a.md");
        assert_eq!(ranked[0].chunk_index, 0);
        assert_eq!(ranked[1].note_path, "a.md");
        assert_eq!(ranked[1].chunk_index, 1);
        assert_eq!(ranked[2].note_path, "b.md");
    }
}
