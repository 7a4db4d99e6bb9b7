//! Similarity retrieval over the chunk store, aggregated to notes.
//!
//! Queries are answered at chunk granularity, then pooled: a note's score
//! is the maximum similarity over its matching chunks. Max-pooling keeps a
//! long note with one highly relevant section competitive with a short
//! note that is uniformly on-topic.

use std::collections::HashMap;

use crate::config::RetrievalConfig;
use crate::embedding::{embed_query, EmbeddingProvider};
use crate::models::NoteHit;
use crate::store::{TagFilter, VectorStore};

/// Find the `k` notes most similar to `text`.
///
/// Degrades rather than fails: an empty or unreachable store, or an
/// embedding error, yields an empty result set with a warning on stderr.
/// An empty index is a legitimate state, not an error.
pub async fn retrieve(
    store: &dyn VectorStore,
    provider: &dyn EmbeddingProvider,
    cfg: &RetrievalConfig,
    text: &str,
    k: usize,
    filter: Option<&TagFilter>,
) -> Vec<NoteHit> {
    match store.is_empty().await {
        Ok(true) => return Vec::new(),
        Ok(false) => {}
        Err(e) => {
            eprintln!("Warning: vector store unavailable: {e}");
            return Vec::new();
        }
    }

    let vector = match embed_query(provider, text).await {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Warning: failed to embed query: {e}");
            return Vec::new();
        }
    };

    // Over-fetch at chunk level so note-level dedup still fills k slots.
    let chunk_k = k.saturating_mul(cfg.chunk_multiplier).max(k);
    let chunk_hits = match store.query(&vector, chunk_k, filter).await {
        Ok(hits) => hits,
        Err(e) => {
            eprintln!("Warning: similarity query failed: {e}");
            return Vec::new();
        }
    };

    let mut by_note: HashMap<String, NoteHit> = HashMap::new();
    for hit in chunk_hits {
        match by_note.get_mut(&hit.note_path) {
            Some(existing) if existing.score >= hit.similarity => {}
            Some(existing) => {
                existing.score = hit.similarity;
                existing.snippet = hit.text;
            }
            None => {
                by_note.insert(
                    hit.note_path.clone(),
                    NoteHit {
                        path: hit.note_path,
                        score: hit.similarity,
                        snippet: hit.text,
                        tags: hit.tags,
                    },
                );
            }
        }
    }

    let mut hits: Vec<NoteHit> = by_note.into_values().collect();
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.path.cmp(&b.path))
    });
    hits.truncate(k);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingConfig;
    use crate::index::Indexer;
    use crate::models::Note;
    use crate::store::memory::MemoryStore;
    use crate::vault::note_from_content;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct BowProvider;

    #[async_trait]
    impl EmbeddingProvider for BowProvider {
        fn model_name(&self) -> &str {
            "test-bow"
        }
        fn dims(&self) -> usize {
            16
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| crate::index::bag_of_words(t))
                .collect())
        }
    }

    async fn indexed_store(notes: &[Note]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let indexer = Indexer::new(
            store.clone(),
            Arc::new(BowProvider),
            &crate::config::ChunkingConfig { max_chars: 1500 },
            &EmbeddingConfig::default(),
        );
        indexer.run(notes, false, None).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_identical_text_ranks_first_with_near_unit_score() {
        let notes = vec![
            note_from_content("ml.md", "gradient descent optimizes neural networks", 0),
            note_from_content("cooking.md", "slow roasted tomato pasta recipe", 0),
        ];
        let store = indexed_store(&notes).await;

        let hits = retrieve(
            store.as_ref(),
            &BowProvider,
            &RetrievalConfig::default(),
            "gradient descent optimizes neural networks",
            5,
            None,
        )
        .await;

        assert_eq!(hits[0].path, "ml.md");
        assert!(hits[0].score > 0.99);
    }

    #[tokio::test]
    async fn test_empty_store_returns_empty() {
        let store = MemoryStore::new();
        let hits = retrieve(
            &store,
            &BowProvider,
            &RetrievalConfig::default(),
            "anything",
            5,
            None,
        )
        .await;
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_notes_are_deduplicated_across_chunks() {
        // Two paragraphs force two chunks for the same note.
        let long = format!("{}\n\n{}", "alpha beta ".repeat(120), "alpha beta ".repeat(120));
        let notes = vec![note_from_content("long.md", &long, 0)];
        let store = indexed_store(&notes).await;
        assert!(store.chunk_count().await.unwrap() >= 2);

        let hits = retrieve(
            store.as_ref(),
            &BowProvider,
            &RetrievalConfig::default(),
            "alpha beta",
            5,
            None,
        )
        .await;
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_k_limits_results() {
        let notes: Vec<Note> = (0..6)
            .map(|i| note_from_content(&format!("n{i}.md"), &format!("topic shared word{i}"), 0))
            .collect();
        let store = indexed_store(&notes).await;

        let hits = retrieve(
            store.as_ref(),
            &BowProvider,
            &RetrievalConfig::default(),
            "topic shared",
            3,
            None,
        )
        .await;
        assert_eq!(hits.len(), 3);
    }

    #[tokio::test]
    async fn test_tag_filter_restricts_hits() {
        let notes = vec![
            note_from_content("a.md", "---\ntags: [work]\n---\nshared topic text", 0),
            note_from_content("b.md", "---\ntags: [personal]\n---\nshared topic text", 0),
        ];
        let store = indexed_store(&notes).await;

        let filter = TagFilter {
            any_of: vec!["work".to_string()],
        };
        let hits = retrieve(
            store.as_ref(),
            &BowProvider,
            &RetrievalConfig::default(),
            "shared topic",
            5,
            Some(&filter),
        )
        .await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "a.md");
    }
}
