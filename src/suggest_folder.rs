//! Folder placement for new notes.
//!
//! Three strategies, tried in order until one produces candidates:
//!
//! 1. **Semantic voting** — embed title + tags + a content excerpt, fetch
//!    the nearest indexed notes, and let each vote for its own folder with
//!    its similarity as vote weight. Confidence is each folder's share of
//!    the total weight.
//! 2. **Keyword rules** — match folder path segments against title and tag
//!    tokens. Works with no embeddings at all.
//! 3. **Inbox fallback** — an existing inbox-like folder, or the first
//!    configured inbox name.

use serde::Serialize;
use std::collections::HashMap;

use crate::config::{RetrievalConfig, SuggestConfig};
use crate::embedding::EmbeddingProvider;
use crate::models::{ConfidenceBand, FolderCandidate, Note};
use crate::retrieve::retrieve;
use crate::store::VectorStore;

/// Which strategy produced the candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Semantic,
    Keyword,
    Inbox,
}

#[derive(Debug, Serialize)]
pub struct FolderSuggestion {
    pub strategy: Strategy,
    pub candidates: Vec<FolderCandidate>,
}

pub async fn suggest_folder(
    store: &dyn VectorStore,
    provider: &dyn EmbeddingProvider,
    retrieval: &RetrievalConfig,
    cfg: &SuggestConfig,
    notes: &[Note],
    title: &str,
    tags: &[String],
    content: &str,
) -> FolderSuggestion {
    if let Some(candidates) =
        semantic_candidates(store, provider, retrieval, cfg, title, tags, content).await
    {
        return FolderSuggestion {
            strategy: Strategy::Semantic,
            candidates,
        };
    }

    if let Some(candidates) = keyword_candidates(cfg, notes, title, tags) {
        return FolderSuggestion {
            strategy: Strategy::Keyword,
            candidates,
        };
    }

    FolderSuggestion {
        strategy: Strategy::Inbox,
        candidates: vec![inbox_candidate(cfg, notes)],
    }
}

fn folder_of(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some((dir, _)) => dir,
        None => ".",
    }
}

fn char_safe_prefix(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

async fn semantic_candidates(
    store: &dyn VectorStore,
    provider: &dyn EmbeddingProvider,
    retrieval: &RetrievalConfig,
    cfg: &SuggestConfig,
    title: &str,
    tags: &[String],
    content: &str,
) -> Option<Vec<FolderCandidate>> {
    let mut query = title.to_string();
    if !tags.is_empty() {
        query.push('\n');
        query.push_str(&tags.join(" "));
    }
    let excerpt = char_safe_prefix(content, cfg.excerpt_chars);
    if !excerpt.is_empty() {
        query.push('\n');
        query.push_str(excerpt);
    }

    let hits = retrieve(store, provider, retrieval, &query, cfg.similar_notes, None).await;
    if hits.is_empty() {
        return None;
    }

    // Similarity-weighted voting: a very close neighbor should pull harder
    // than two marginal ones.
    let mut votes: HashMap<String, (f32, Vec<String>)> = HashMap::new();
    let mut total = 0.0f32;
    for hit in hits {
        let weight = hit.score.max(0.0);
        total += weight;
        let entry = votes
            .entry(folder_of(&hit.path).to_string())
            .or_insert((0.0, Vec::new()));
        entry.0 += weight;
        entry.1.push(hit.path);
    }
    if total <= 0.0 {
        return None;
    }

    let mut candidates: Vec<FolderCandidate> = votes
        .into_iter()
        .map(|(folder, (weight, supporting_notes))| {
            let confidence_pct = weight / total * 100.0;
            FolderCandidate {
                folder,
                weight,
                confidence_pct,
                band: ConfidenceBand::from_pct(confidence_pct),
                supporting_notes,
            }
        })
        .collect();
    candidates.sort_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.folder.cmp(&b.folder))
    });
    candidates.truncate(cfg.folder_candidates);
    Some(candidates)
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn keyword_candidates(
    cfg: &SuggestConfig,
    notes: &[Note],
    title: &str,
    tags: &[String],
) -> Option<Vec<FolderCandidate>> {
    let mut note_tokens: Vec<String> = tokenize(title);
    for tag in tags {
        note_tokens.extend(tokenize(tag));
    }
    if note_tokens.is_empty() {
        return None;
    }

    let mut folders: Vec<&str> = notes
        .iter()
        .map(|n| n.folder.as_str())
        .filter(|f| *f != ".")
        .collect();
    folders.sort_unstable();
    folders.dedup();

    let mut scored: Vec<(String, f32)> = folders
        .into_iter()
        .filter_map(|folder| {
            let folder_tokens = tokenize(folder);
            let matches = note_tokens
                .iter()
                .filter(|t| folder_tokens.contains(t))
                .count();
            (matches > 0).then(|| (folder.to_string(), matches as f32))
        })
        .collect();
    if scored.is_empty() {
        return None;
    }

    let total: f32 = scored.iter().map(|(_, w)| w).sum();
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    scored.truncate(cfg.folder_candidates);

    Some(
        scored
            .into_iter()
            .map(|(folder, weight)| {
                let confidence_pct = weight / total * 100.0;
                FolderCandidate {
                    folder,
                    weight,
                    confidence_pct,
                    band: ConfidenceBand::from_pct(confidence_pct),
                    supporting_notes: Vec::new(),
                }
            })
            .collect(),
    )
}

fn inbox_candidate(cfg: &SuggestConfig, notes: &[Note]) -> FolderCandidate {
    let existing = notes.iter().map(|n| n.folder.as_str()).find(|folder| {
        let lower = folder.to_lowercase();
        cfg.inbox_names.iter().any(|name| lower.contains(name))
    });
    let folder = existing
        .map(str::to_string)
        .or_else(|| cfg.inbox_names.first().cloned())
        .unwrap_or_else(|| "inbox".to_string());
    FolderCandidate {
        folder,
        weight: 0.0,
        confidence_pct: 0.0,
        band: ConfidenceBand::Low,
        supporting_notes: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChunkingConfig, EmbeddingConfig};
    use crate::index::{bag_of_words, Indexer};
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
            Ok(texts.iter().map(|t| bag_of_words(t)).collect())
        }
    }

    async fn indexed_store(notes: &[Note]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let indexer = Indexer::new(
            store.clone(),
            Arc::new(BowProvider),
            &ChunkingConfig { max_chars: 1500 },
            &EmbeddingConfig::default(),
        );
        indexer.run(notes, false, None).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_semantic_voting_weights_by_similarity_share() {
        // Four recipe notes in one folder, one stray note elsewhere.
        let notes = vec![
            note_from_content("recipes/a.md", "pasta tomato basil dinner recipe", 0),
            note_from_content("recipes/b.md", "pasta tomato garlic dinner recipe", 0),
            note_from_content("recipes/c.md", "pasta basil garlic dinner recipe", 0),
            note_from_content("recipes/d.md", "tomato basil garlic dinner recipe", 0),
            note_from_content("work/e.md", "pasta dinner meeting notes", 0),
        ];
        let store = indexed_store(&notes).await;

        let result = suggest_folder(
            store.as_ref(),
            &BowProvider,
            &RetrievalConfig::default(),
            &SuggestConfig::default(),
            &notes,
            "Tomato pasta",
            &[],
            "pasta tomato basil garlic dinner recipe",
        )
        .await;

        assert_eq!(result.strategy, Strategy::Semantic);
        assert_eq!(result.candidates[0].folder, "recipes");
        assert!(result.candidates[0].confidence_pct > 60.0);
        assert_eq!(result.candidates[0].band, ConfidenceBand::High);
        assert_eq!(result.candidates[0].supporting_notes.len(), 4);

        let total: f32 = result.candidates.iter().map(|c| c.confidence_pct).sum();
        assert!(total <= 100.0 + f32::EPSILON);
    }

    #[tokio::test]
    async fn test_keyword_fallback_without_index() {
        let notes = vec![
            note_from_content("projects/alpha.md", "", 0),
            note_from_content("recipes/pasta.md", "", 0),
        ];
        let store = MemoryStore::new();

        let result = suggest_folder(
            &store,
            &BowProvider,
            &RetrievalConfig::default(),
            &SuggestConfig::default(),
            &notes,
            "New recipes to try",
            &[],
            "",
        )
        .await;

        assert_eq!(result.strategy, Strategy::Keyword);
        assert_eq!(result.candidates[0].folder, "recipes");
    }

    #[tokio::test]
    async fn test_keyword_fallback_matches_tags() {
        let notes = vec![note_from_content("work/status.md", "", 0)];
        let store = MemoryStore::new();

        let result = suggest_folder(
            &store,
            &BowProvider,
            &RetrievalConfig::default(),
            &SuggestConfig::default(),
            &notes,
            "Untitled",
            &["work".to_string()],
            "",
        )
        .await;

        assert_eq!(result.strategy, Strategy::Keyword);
        assert_eq!(result.candidates[0].folder, "work");
    }

    #[tokio::test]
    async fn test_inbox_fallback_prefers_existing_inbox_folder() {
        let notes = vec![
            note_from_content("Inbox/misc.md", "", 0),
            note_from_content("archive/old.md", "", 0),
        ];
        let store = MemoryStore::new();

        let result = suggest_folder(
            &store,
            &BowProvider,
            &RetrievalConfig::default(),
            &SuggestConfig::default(),
            &notes,
            "Zzz unrelated",
            &[],
            "",
        )
        .await;

        assert_eq!(result.strategy, Strategy::Inbox);
        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.candidates[0].folder, "Inbox");
        assert_eq!(result.candidates[0].band, ConfidenceBand::Low);
    }

    #[tokio::test]
    async fn test_inbox_fallback_on_empty_vault() {
        let store = MemoryStore::new();
        let result = suggest_folder(
            &store,
            &BowProvider,
            &RetrievalConfig::default(),
            &SuggestConfig::default(),
            &[],
            "Anything",
            &[],
            "",
        )
        .await;

        assert_eq!(result.strategy, Strategy::Inbox);
        assert_eq!(result.candidates[0].folder, "inbox");
    }

    #[test]
    fn test_folder_of_root_note() {
        assert_eq!(folder_of("note.md"), ".");
        assert_eq!(folder_of("a/b/note.md"), "a/b");
    }
}
