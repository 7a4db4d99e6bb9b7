//! Vault reader: enumerates markdown notes and turns each one into the
//! engine's input representation.
//!
//! The vault on disk is the source of truth; this module only reads.
//! For every note it strips YAML frontmatter, collects tags, extracts
//! wikilink targets and image captions, and assembles the *effective text*
//! (body + caption trailer) that the chunker and the content hash operate on.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use walkdir::WalkDir;

use crate::config::VaultConfig;
use crate::models::Note;

/// Section header under which image captions are appended to a note's
/// effective text. Kept stable: it feeds the note-level content hash.
const CAPTION_TRAILER: &str = "Image captions:";

fn frontmatter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\A---\s*\n(.*?)\n---\s*\n").unwrap())
}

fn wikilink_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(!?)\[\[([^\[\]]+?)\]\]").unwrap())
}

fn md_image_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"!\[([^\]]+)\]\([^)]*\)").unwrap())
}

/// Scan the vault and load every non-excluded markdown note.
///
/// Returns notes sorted by path for deterministic ordering. Unreadable
/// files are skipped with a warning instead of aborting the scan.
pub fn scan_vault(config: &VaultConfig) -> Result<Vec<Note>> {
    let root = &config.root;
    if !root.exists() {
        bail!("Vault root does not exist: {}", root.display());
    }

    let exclude_set = build_globset(&config.exclude_globs)?;

    let mut notes = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if in_excluded_folder(&rel_str, &config.exclude_folders) {
            continue;
        }
        let file_name = relative
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if exclude_set.is_match(&file_name) {
            continue;
        }

        match load_note(path, &rel_str) {
            Ok(note) => notes.push(note),
            Err(e) => eprintln!("Warning: could not load {}: {}", rel_str, e),
        }
    }

    notes.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(notes)
}

fn in_excluded_folder(rel_path: &str, exclude_folders: &[String]) -> bool {
    exclude_folders.iter().any(|folder| {
        rel_path == folder || rel_path.starts_with(&format!("{}/", folder))
    })
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

fn load_note(path: &Path, rel_path: &str) -> Result<Note> {
    let content = std::fs::read_to_string(path)?;

    let metadata = std::fs::metadata(path)?;
    let modified_at = metadata
        .modified()
        .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;

    Ok(note_from_content(rel_path, &content, modified_at))
}

/// Build a [`Note`] from raw markdown content. Split out from file I/O so
/// tests can exercise parsing directly.
pub fn note_from_content(rel_path: &str, content: &str, modified_at: i64) -> Note {
    let (tags, body) = split_frontmatter(content);
    let links = extract_wikilinks(&body);
    let effective_text = effective_text(&body);
    let word_count = effective_text.split_whitespace().count();

    let title = rel_path
        .rsplit('/')
        .next()
        .unwrap_or(rel_path)
        .trim_end_matches(".md")
        .to_string();
    let folder = match rel_path.rsplit_once('/') {
        Some((parent, _)) => parent.to_string(),
        None => ".".to_string(),
    };

    Note {
        path: rel_path.to_string(),
        title,
        folder,
        tags,
        links,
        modified_at,
        effective_text,
        word_count,
    }
}

/// Strip YAML frontmatter and return (tags, body).
///
/// Malformed frontmatter yields no tags but the delimited block is still
/// removed from the body.
fn split_frontmatter(content: &str) -> (Vec<String>, String) {
    let Some(caps) = frontmatter_re().captures(content) else {
        return (Vec::new(), content.to_string());
    };

    let yaml_text = caps.get(1).map(|m| m.as_str()).unwrap_or("");
    let body = content[caps.get(0).unwrap().end()..].to_string();

    let tags = match serde_yml::from_str::<serde_yml::Value>(yaml_text) {
        Ok(serde_yml::Value::Mapping(map)) => extract_tags(&map),
        _ => Vec::new(),
    };

    (tags, body)
}

fn extract_tags(map: &serde_yml::Mapping) -> Vec<String> {
    let Some(value) = map.get("tags") else {
        return Vec::new();
    };

    match value {
        serde_yml::Value::Sequence(seq) => seq
            .iter()
            .filter_map(|v| v.as_str().map(|s| s.trim().to_string()))
            .filter(|s| !s.is_empty())
            .collect(),
        // Tags written inline: `tags: a, b, c`
        serde_yml::Value::String(s) => s
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// Extract `[[wikilink]]` targets, dropping aliases (`[[Note|Alias]]` →
/// `Note`) and image embeds (`![[...]]`). Order preserved, duplicates removed.
pub fn extract_wikilinks(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut links = Vec::new();

    for caps in wikilink_re().captures_iter(text) {
        if &caps[1] == "!" {
            continue;
        }
        let target = caps[2].split('|').next().unwrap_or("").trim();
        if !target.is_empty() && seen.insert(target.to_string()) {
            links.push(target.to_string());
        }
    }

    links
}

/// Extract image captions from both embed forms:
/// `![[image.png|caption]]` and `![caption](url)`.
/// Images without a caption are ignored.
pub fn extract_image_captions(text: &str) -> Vec<String> {
    let mut captions = Vec::new();

    for caps in wikilink_re().captures_iter(text) {
        if &caps[1] != "!" {
            continue;
        }
        if let Some((_, caption)) = caps[2].split_once('|') {
            let caption = caption.trim();
            if !caption.is_empty() {
                captions.push(caption.to_string());
            }
        }
    }

    for caps in md_image_re().captures_iter(text) {
        let caption = caps[1].trim();
        if !caption.is_empty() {
            captions.push(caption.to_string());
        }
    }

    captions
}

/// Body plus the caption trailer. This is the text that gets chunked and
/// hashed, so adding or editing a caption invalidates the note like any
/// other edit would.
fn effective_text(body: &str) -> String {
    let body = body.trim();
    let captions = extract_image_captions(body);
    if captions.is_empty() {
        return body.to_string();
    }

    let mut text = String::with_capacity(body.len() + 64);
    text.push_str(body);
    text.push_str("\n\n");
    text.push_str(CAPTION_TRAILER);
    for caption in &captions {
        text.push('\n');
        text.push_str("- ");
        text.push_str(caption);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frontmatter_tags_sequence() {
        let content = "---\ntags:\n  - rust\n  - notes\n---\n# Body\n";
        let note = note_from_content("a.md", content, 0);
        assert_eq!(note.tags, vec!["rust", "notes"]);
        assert!(note.effective_text.starts_with("# Body"));
    }

    #[test]
    fn test_frontmatter_tags_inline_string() {
        let content = "---\ntags: rust, notes\n---\nBody\n";
        let note = note_from_content("a.md", content, 0);
        assert_eq!(note.tags, vec!["rust", "notes"]);
    }

    #[test]
    fn test_no_frontmatter() {
        let note = note_from_content("a.md", "Just a body.", 0);
        assert!(note.tags.is_empty());
        assert_eq!(note.effective_text, "Just a body.");
    }

    #[test]
    fn test_title_and_folder() {
        let note = note_from_content("Tech/Infra/SSH setup.md", "x", 0);
        assert_eq!(note.title, "SSH setup");
        assert_eq!(note.folder, "Tech/Infra");

        let root_note = note_from_content("Readme.md", "x", 0);
        assert_eq!(root_note.folder, ".");
    }

    #[test]
    fn test_extract_wikilinks_with_alias_and_dedupe() {
        let text = "See [[Note A]] and [[Note B|an alias]], also [[Note A]].";
        assert_eq!(extract_wikilinks(text), vec!["Note A", "Note B"]);
    }

    #[test]
    fn test_wikilinks_skip_image_embeds() {
        let text = "![[image.png|caption]] but [[Real Note]]";
        assert_eq!(extract_wikilinks(text), vec!["Real Note"]);
    }

    #[test]
    fn test_extract_captions_wikilink_form() {
        let captions =
            extract_image_captions("Some text ![[image.png|A beautiful sunset]] more text.");
        assert_eq!(captions, vec!["A beautiful sunset"]);
    }

    #[test]
    fn test_extract_captions_markdown_form() {
        let captions = extract_image_captions("Data: ![Graph of growth](assets/graph.png)");
        assert_eq!(captions, vec!["Graph of growth"]);
    }

    #[test]
    fn test_captionless_images_ignored() {
        let captions = extract_image_captions("![[image.png]] and ![[other.jpg|]]");
        assert!(captions.is_empty());
    }

    #[test]
    fn test_plain_wikilinks_are_not_captions() {
        let captions = extract_image_captions("[[Note|Alias]] is not an image.");
        assert!(captions.is_empty());
    }

    #[test]
    fn test_effective_text_appends_caption_trailer() {
        let content = "Intro.\n\n![[diagram.png|A complex diagram]]\n";
        let note = note_from_content("a.md", content, 0);
        assert!(note.effective_text.contains("Image captions:"));
        assert!(note.effective_text.contains("- A complex diagram"));
    }

    #[test]
    fn test_empty_body_yields_empty_effective_text() {
        let note = note_from_content("a.md", "---\ntags: [x]\n---\n", 0);
        assert!(note.effective_text.is_empty());
        assert_eq!(note.word_count, 0);
    }

    #[test]
    fn test_scan_vault_respects_exclusions() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("Notes")).unwrap();
        std::fs::create_dir_all(root.join("Templates")).unwrap();
        std::fs::write(root.join("Notes/keep.md"), "kept").unwrap();
        std::fs::write(root.join("Templates/skip.md"), "skipped").unwrap();
        std::fs::write(root.join("Notes/draw.excalidraw.md"), "skipped").unwrap();
        std::fs::write(root.join("Notes/data.txt"), "not markdown").unwrap();

        let config = VaultConfig {
            root: root.to_path_buf(),
            exclude_folders: vec!["Templates".to_string()],
            exclude_globs: vec!["*.excalidraw.md".to_string()],
        };

        let notes = scan_vault(&config).unwrap();
        let paths: Vec<&str> = notes.iter().map(|n| n.path.as_str()).collect();
        assert_eq!(paths, vec!["Notes/keep.md"]);
    }
}
