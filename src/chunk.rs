//! Paragraph-boundary text chunker.
//!
//! Splits a note's effective text into [`Chunk`]s that respect a
//! configurable `max_chars` limit. Splitting prefers paragraph boundaries
//! (`\n\n`), falls back to sentence boundaries for oversized paragraphs,
//! and only then hard-cuts, so semantically coherent spans stay together.
//!
//! Deterministic: the same input always yields the same chunk boundaries
//! and hashes, which is what makes hash-driven invalidation reliable.
//! An empty input yields zero chunks.

use sha2::{Digest, Sha256};

use crate::models::Chunk;

/// Split effective text into chunks with contiguous indices starting at 0.
pub fn chunk_note(note_path: &str, text: &str, max_chars: usize) -> Vec<Chunk> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current_buf = String::new();

    for para in text.split("\n\n") {
        let trimmed = para.trim();
        if trimmed.is_empty() {
            continue;
        }

        // If adding this paragraph would exceed max, flush current buffer
        let would_be = if current_buf.is_empty() {
            trimmed.len()
        } else {
            current_buf.len() + 2 + trimmed.len()
        };

        if would_be > max_chars && !current_buf.is_empty() {
            push_chunk(&mut chunks, note_path, &current_buf);
            current_buf.clear();
        }

        if trimmed.len() > max_chars {
            if !current_buf.is_empty() {
                push_chunk(&mut chunks, note_path, &current_buf);
                current_buf.clear();
            }
            for piece in split_oversized(trimmed, max_chars) {
                push_chunk(&mut chunks, note_path, piece.trim());
            }
        } else {
            if !current_buf.is_empty() {
                current_buf.push_str("\n\n");
            }
            current_buf.push_str(trimmed);
        }
    }

    if !current_buf.is_empty() {
        push_chunk(&mut chunks, note_path, &current_buf);
    }

    chunks
}

/// Split a single oversized paragraph, preferring sentence ends, then
/// newline/space boundaries, then a hard cut at `max_chars`.
fn split_oversized(text: &str, max_chars: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_chars {
            pieces.push(remaining);
            break;
        }

        let mut window = floor_char_boundary(remaining, max_chars);
        if window == 0 {
            // max_chars smaller than one char: take the first char whole
            window = remaining.chars().next().map(|c| c.len_utf8()).unwrap_or(1);
        }
        let head = &remaining[..window];

        let split_at = find_sentence_end(head)
            .or_else(|| head.rfind('\n').map(|p| p + 1))
            .or_else(|| head.rfind(' ').map(|p| p + 1))
            .filter(|&p| p > 0)
            .unwrap_or(window);

        pieces.push(&remaining[..split_at]);
        remaining = &remaining[split_at..];
    }

    pieces
}

/// Position just after the last sentence terminator followed by whitespace.
fn find_sentence_end(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut best = None;
    for (i, &b) in bytes.iter().enumerate() {
        if matches!(b, b'.' | b'!' | b'?') && bytes.get(i + 1).is_some_and(|n| n.is_ascii_whitespace())
        {
            best = Some(i + 2);
        }
    }
    best
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn push_chunk(chunks: &mut Vec<Chunk>, note_path: &str, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }

    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    chunks.push(Chunk {
        note_path: note_path.to_string(),
        chunk_index: chunks.len() as i64,
        text: text.to_string(),
        hash,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = chunk_note("a.md", "Hello, world!", 1500);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].text, "Hello, world!");
    }

    #[test]
    fn test_empty_text_yields_zero_chunks() {
        assert!(chunk_note("a.md", "", 1500).is_empty());
        assert!(chunk_note("a.md", "  \n\n  ", 1500).is_empty());
    }

    #[test]
    fn test_paragraphs_packed_under_limit() {
        let text = "First paragraph.\n\nSecond paragraph.\n\nThird paragraph.";
        let chunks = chunk_note("a.md", text, 1500);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.contains("First paragraph."));
        assert!(chunks[0].text.contains("Third paragraph."));
    }

    #[test]
    fn test_paragraphs_split_over_limit() {
        let text = "This is paragraph one.\n\nThis is paragraph two.\n\nThis is paragraph three.";
        let chunks = chunk_note("a.md", text, 30);
        assert!(chunks.len() > 1);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i as i64);
            assert!(c.text.len() <= 30);
        }
    }

    #[test]
    fn test_oversized_paragraph_prefers_sentence_boundary() {
        let text = "One sentence here. Another sentence follows right after it and keeps going.";
        let chunks = chunk_note("a.md", text, 40);
        assert!(chunks.len() >= 2);
        assert_eq!(chunks[0].text, "One sentence here.");
    }

    #[test]
    fn test_hard_cut_without_any_boundary() {
        let text = "x".repeat(100);
        let chunks = chunk_note("a.md", &text, 40);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.text.len() <= 40));
    }

    #[test]
    fn test_multibyte_text_never_splits_mid_char() {
        let text = "é".repeat(50);
        let chunks = chunk_note("a.md", &text, 41);
        assert!(!chunks.is_empty());
        for c in &chunks {
            assert!(c.text.len() <= 41);
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha\n\nBeta\n\nGamma\n\nDelta";
        let a = chunk_note("a.md", text, 12);
        let b = chunk_note("a.md", text, 12);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.text, y.text);
            assert_eq!(x.hash, y.hash);
            assert_eq!(x.chunk_index, y.chunk_index);
        }
    }

    #[test]
    fn test_indices_contiguous_on_long_input() {
        let text = (0..50)
            .map(|i| format!("Paragraph number {}.", i))
            .collect::<Vec<_>>()
            .join("\n\n");
        let chunks = chunk_note("a.md", &text, 60);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i as i64, "index mismatch at {}", i);
        }
    }
}
