//! Incremental indexing pass.
//!
//! Orchestrates chunker + embedding provider + vector store against the
//! current vault state. Each pass classifies every note:
//!
//! | State | Condition | Action |
//! |-------|-----------|--------|
//! | Unindexed | no stored hash for the path | chunk, embed, upsert |
//! | Unchanged | stored hash == current hash | skip |
//! | Stale | stored hash != current hash | delete, then reindex |
//! | Orphaned | stored hash but note gone | delete |
//!
//! A **forced** pass treats every note as Stale — required after changing
//! the embedding model, since old and new vectors are not comparable.
//! Embedding is the expensive operation; the Unchanged short-circuit is
//! what keeps repeat passes cheap.
//!
//! Failure semantics: a chunk that fails to embed is skipped and counted,
//! the pass moves on; only the inability to reach the store aborts a pass.
//! A note is replaced in the store only after its new vectors exist, and
//! the stale chunk set is deleted immediately before the upsert, so a
//! note's stored chunks never mix two content versions.
//!
//! A note with failed chunks is written under a partial hash marker
//! (see [`partial_hash`]) instead of its real content hash. The marker can
//! never equal a real hash, so the next plain pass classifies the note
//! Stale and re-attempts the missing chunks without `--force`.

use anyhow::Result;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::chunk::chunk_note;
use crate::config::{ChunkingConfig, EmbeddingConfig};
use crate::embedding::EmbeddingProvider;
use crate::models::{Chunk, IndexReport, Note};
use crate::store::{ChunkRecord, VectorStore};

/// SHA-256 hex of a note's effective text. Content-based, not mtime-based:
/// copy/restore operations touch mtimes without changing content.
pub fn note_content_hash(effective_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(effective_text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Stored hash for a note whose pass embedded only some of its chunks.
/// Real hashes are bare hex, so the prefix guarantees a mismatch on the
/// next pass and the note gets retried.
fn partial_hash(note_hash: &str) -> String {
    format!("partial:{note_hash}")
}

pub struct Indexer {
    store: Arc<dyn VectorStore>,
    provider: Arc<dyn EmbeddingProvider>,
    max_chars: usize,
    batch_size: usize,
    // At most one pass in flight: interleaved delete/upsert sequences from
    // two passes could leave a note with zero or duplicate chunks.
    lock: Mutex<()>,
}

impl Indexer {
    pub fn new(
        store: Arc<dyn VectorStore>,
        provider: Arc<dyn EmbeddingProvider>,
        chunking: &ChunkingConfig,
        embedding: &EmbeddingConfig,
    ) -> Self {
        Self {
            store,
            provider,
            max_chars: chunking.max_chars,
            batch_size: embedding.batch_size.max(1),
            lock: Mutex::new(()),
        }
    }

    /// Run one indexing pass over the given vault snapshot.
    ///
    /// `deadline` is checked between notes only; an in-progress single-note
    /// reindex always completes, so hitting the deadline still leaves the
    /// store fully consistent. The report's `interrupted` flag tells the
    /// caller the pass did not visit every note.
    pub async fn run(
        &self,
        notes: &[Note],
        forced: bool,
        deadline: Option<Instant>,
    ) -> Result<IndexReport> {
        let _guard = self.lock.lock().await;

        // Store unreachable ⇒ abort the whole pass before touching anything.
        let stored_hashes = self.store.note_hashes().await?;

        let mut report = IndexReport::default();

        // Orphan cleanup: entries whose note left the vault.
        let vault_paths: HashSet<&str> = notes.iter().map(|n| n.path.as_str()).collect();
        let mut orphaned: Vec<&String> = stored_hashes
            .keys()
            .filter(|path| !vault_paths.contains(path.as_str()))
            .collect();
        orphaned.sort();
        for path in orphaned {
            self.store.delete_note(path).await?;
            report.orphaned += 1;
        }

        for note in notes {
            if let Some(d) = deadline {
                if Instant::now() >= d {
                    report.interrupted = true;
                    break;
                }
            }

            let note_hash = note_content_hash(&note.effective_text);
            let previously_indexed = stored_hashes.contains_key(&note.path);

            if !forced && stored_hashes.get(&note.path) == Some(&note_hash) {
                report.skipped += 1;
                continue;
            }

            let chunks = chunk_note(&note.path, &note.effective_text, self.max_chars);
            if chunks.is_empty() {
                // Nothing to embed. Stale chunks of a now-empty note go away.
                if previously_indexed {
                    self.store.delete_note(&note.path).await?;
                    report.reindexed += 1;
                } else {
                    report.skipped += 1;
                }
                continue;
            }

            let (embedded, failed_chunks) = self.embed_chunks(&chunks).await;

            if failed_chunks > 0 {
                eprintln!(
                    "Warning: {} of {} chunks failed to embed for {}",
                    failed_chunks,
                    chunks.len(),
                    note.path
                );
                report.failed += 1;
            }

            if embedded.is_empty() {
                // Total embedding failure: keep whatever consistent state the
                // store already has for this note.
                continue;
            }

            // Partial results are stored under a mismatching hash so the
            // note stays Stale until every chunk embeds.
            let stored_hash = if failed_chunks > 0 {
                partial_hash(&note_hash)
            } else {
                note_hash.clone()
            };

            let indexed_at = chrono::Utc::now().timestamp();
            let records: Vec<ChunkRecord> = embedded
                .into_iter()
                .map(|(chunk, vector)| ChunkRecord {
                    id: Uuid::new_v4().to_string(),
                    note_path: chunk.note_path,
                    chunk_index: chunk.chunk_index,
                    text: chunk.text,
                    chunk_hash: chunk.hash,
                    note_hash: stored_hash.clone(),
                    tags: note.tags.clone(),
                    model: self.provider.model_name().to_string(),
                    dims: self.provider.dims(),
                    embedding: vector,
                    indexed_at,
                })
                .collect();

            // Delete-before-reindex: the note's chunk set is replaced as a
            // unit, never mixed across content versions.
            self.store.delete_note(&note.path).await?;
            self.store.upsert_chunks(&records).await?;
            report.reindexed += 1;
        }

        Ok(report)
    }

    /// Embed a note's chunks. Tries the whole note as batches first; if a
    /// batch fails, falls back to per-chunk calls so one bad chunk cannot
    /// sink its neighbors. Returns successfully embedded (chunk, vector)
    /// pairs and the number of chunks that failed.
    async fn embed_chunks(&self, chunks: &[Chunk]) -> (Vec<(Chunk, Vec<f32>)>, usize) {
        let mut embedded = Vec::with_capacity(chunks.len());
        let mut failed = 0usize;

        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();

            match self.provider.embed(&texts).await {
                Ok(vectors) => {
                    for (chunk, vector) in batch.iter().zip(vectors) {
                        embedded.push((chunk.clone(), vector));
                    }
                }
                Err(_) => {
                    for chunk in batch {
                        match self.provider.embed(&[chunk.text.clone()]).await {
                            Ok(mut vectors) if !vectors.is_empty() => {
                                embedded.push((chunk.clone(), vectors.remove(0)));
                            }
                            _ => failed += 1,
                        }
                    }
                }
            }
        }

        (embedded, failed)
    }
}

/// Deterministic bag-of-words embedding, shared by unit tests across the
/// crate. Same words always produce the same vector.
#[cfg(test)]
pub(crate) fn bag_of_words(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; 16];
    for word in text.to_lowercase().split_whitespace() {
        let mut h = 5381u64;
        for b in word.bytes() {
            h = h.wrapping_mul(33).wrapping_add(b as u64);
        }
        v[(h % 16) as usize] += 1.0;
    }
    v
}
