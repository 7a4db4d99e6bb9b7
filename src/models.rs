//! Core data models for the semantic engine.
//!
//! These types represent the notes, chunks, and suggestion results that flow
//! through the indexing and retrieval pipeline. Notes are owned by the vault
//! on disk; everything else is derived.

use serde::Serialize;

/// A note loaded from the vault, enriched with everything the engine needs.
///
/// `effective_text` is the chunking input: the body with frontmatter
/// stripped, plus any image captions appended under a trailer section so
/// image content stays retrievable by caption.
#[derive(Debug, Clone)]
pub struct Note {
    /// Vault-relative path with forward slashes (identity).
    pub path: String,
    /// File stem, used as the wikilink target name.
    pub title: String,
    /// Parent folder relative to the vault root; `"."` for root notes.
    pub folder: String,
    /// Tags from YAML frontmatter.
    pub tags: Vec<String>,
    /// Outgoing wikilink targets, order-preserving, deduplicated.
    pub links: Vec<String>,
    /// Last-modified timestamp (unix seconds).
    pub modified_at: i64,
    pub effective_text: String,
    /// Word count of the effective text.
    pub word_count: usize,
}

/// A chunk of a note's effective text, the unit actually embedded.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub note_path: String,
    pub chunk_index: i64,
    pub text: String,
    /// SHA-256 of this chunk's text.
    pub hash: String,
}

/// A note-level retrieval result. Chunk hits are max-pooled per note,
/// so the score is the best similarity among the note's retrieved chunks.
#[derive(Debug, Clone, Serialize)]
pub struct NoteHit {
    pub path: String,
    pub score: f32,
    /// Text of the best-scoring chunk, for display.
    pub snippet: String,
    pub tags: Vec<String>,
}

/// A proposed link between two topically close but unlinked notes.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionSuggestion {
    pub note_a: String,
    pub note_b: String,
    pub similarity: f32,
}

/// A folder placement candidate produced by weighted voting.
#[derive(Debug, Clone, Serialize)]
pub struct FolderCandidate {
    pub folder: String,
    /// Accumulated vote weight (sum of supporter similarities).
    pub weight: f32,
    /// Share of the total vote weight, in percent.
    pub confidence_pct: f32,
    pub band: ConfidenceBand,
    /// Notes that voted for this folder, for caller transparency.
    pub supporting_notes: Vec<String>,
}

/// Guidance bands for the calling layer's presentation logic.
/// These never suppress candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBand {
    High,
    Moderate,
    Low,
}

impl ConfidenceBand {
    pub fn from_pct(pct: f32) -> Self {
        if pct >= 60.0 {
            ConfidenceBand::High
        } else if pct >= 40.0 {
            ConfidenceBand::Moderate
        } else {
            ConfidenceBand::Low
        }
    }
}

/// Outcome counts of one indexing pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexReport {
    /// Notes chunked, embedded, and written (new or stale).
    pub reindexed: u64,
    /// Notes left untouched because their content hash was unchanged.
    pub skipped: u64,
    /// Index entries removed because the note no longer exists.
    pub orphaned: u64,
    /// Notes with at least one chunk that failed to embed.
    pub failed: u64,
    /// True when a deadline stopped the pass before all notes were visited.
    pub interrupted: bool,
}
