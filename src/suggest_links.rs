//! Connection discovery: unlinked pairs of topically close notes.
//!
//! Each sufficiently long indexed note is used as its own query; neighbors
//! above the similarity threshold that are not already wikilinked in either
//! direction become suggestions. Pairs are symmetric, so each surviving
//! pair is reported once under its lexicographically ordered paths.

use anyhow::Result;
use std::collections::HashMap;

use crate::config::{RetrievalConfig, SuggestConfig};
use crate::embedding::EmbeddingProvider;
use crate::links::LinkGraph;
use crate::models::{ConnectionSuggestion, Note};
use crate::retrieve::retrieve;
use crate::store::VectorStore;

/// Suggest new links across the vault.
///
/// Stub notes below the word minimum are skipped as queries (their text is
/// too thin to embed meaningfully), as are notes not present in the index.
pub async fn suggest_connections(
    store: &dyn VectorStore,
    provider: &dyn EmbeddingProvider,
    retrieval: &RetrievalConfig,
    cfg: &SuggestConfig,
    notes: &[Note],
    graph: &LinkGraph,
    threshold: f32,
    limit: usize,
) -> Result<Vec<ConnectionSuggestion>> {
    let indexed = store.note_hashes().await?;
    if indexed.is_empty() {
        return Ok(Vec::new());
    }

    // Keyed by ordered pair, keeping the higher similarity of the two
    // query directions.
    let mut pairs: HashMap<(String, String), f32> = HashMap::new();

    for note in notes {
        if note.word_count < cfg.min_words || !indexed.contains_key(&note.path) {
            continue;
        }

        // +1 hit of headroom since the note matches itself.
        let hits = retrieve(
            store,
            provider,
            retrieval,
            &note.effective_text,
            cfg.link_k + 1,
            None,
        )
        .await;

        for hit in hits {
            if hit.path == note.path || hit.score < threshold {
                continue;
            }
            if graph.linked_either_way(&note.path, &hit.path) {
                continue;
            }
            let key = if note.path < hit.path {
                (note.path.clone(), hit.path.clone())
            } else {
                (hit.path.clone(), note.path.clone())
            };
            let entry = pairs.entry(key).or_insert(hit.score);
            if hit.score > *entry {
                *entry = hit.score;
            }
        }
    }

    let mut suggestions: Vec<ConnectionSuggestion> = pairs
        .into_iter()
        .map(|((note_a, note_b), similarity)| ConnectionSuggestion {
            note_a,
            note_b,
            similarity,
        })
        .collect();
    suggestions.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| (&a.note_a, &a.note_b).cmp(&(&b.note_a, &b.note_b)))
    });
    suggestions.truncate(limit);
    Ok(suggestions)
}
