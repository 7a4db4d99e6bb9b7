//! Explicit link graph between notes.
//!
//! Wikilinks target note titles, not paths, so edges are keyed by
//! normalized title. The connection engine only needs one probe: does an
//! explicit link already exist between two notes, in either direction?

use std::collections::{HashMap, HashSet};

use crate::models::Note;

pub struct LinkGraph {
    /// Directed edges as (from_title, to_title), normalized.
    edges: HashSet<(String, String)>,
    /// Note path -> normalized title, for path-based probes.
    titles: HashMap<String, String>,
}

fn normalize(title: &str) -> String {
    title.trim().to_lowercase()
}

impl LinkGraph {
    pub fn build(notes: &[Note]) -> Self {
        let mut edges = HashSet::new();
        let mut titles = HashMap::new();
        for note in notes {
            let from = normalize(&note.title);
            titles.insert(note.path.clone(), from.clone());
            for target in &note.links {
                edges.insert((from.clone(), normalize(target)));
            }
        }
        Self { edges, titles }
    }

    /// True when either note links to the other by path.
    pub fn linked_either_way(&self, path_a: &str, path_b: &str) -> bool {
        match (self.titles.get(path_a), self.titles.get(path_b)) {
            (Some(a), Some(b)) => {
                self.edges.contains(&(a.clone(), b.clone()))
                    || self.edges.contains(&(b.clone(), a.clone()))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::note_from_content;

    #[test]
    fn test_detects_links_in_both_directions() {
        let notes = vec![
            note_from_content("a/alpha.md", "See [[Beta]] for details.", 0),
            note_from_content("b/beta.md", "No links here.", 0),
        ];
        let graph = LinkGraph::build(&notes);
        assert!(graph.linked_either_way("a/alpha.md", "b/beta.md"));
        assert!(graph.linked_either_way("b/beta.md", "a/alpha.md"));
    }

    #[test]
    fn test_unlinked_notes() {
        let notes = vec![
            note_from_content("alpha.md", "Nothing relevant.", 0),
            note_from_content("beta.md", "Also nothing.", 0),
        ];
        let graph = LinkGraph::build(&notes);
        assert!(!graph.linked_either_way("alpha.md", "beta.md"));
    }

    #[test]
    fn test_title_match_is_case_insensitive() {
        let notes = vec![
            note_from_content("alpha.md", "Related: [[bETA]].", 0),
            note_from_content("Beta.md", "", 0),
        ];
        let graph = LinkGraph::build(&notes);
        assert!(graph.linked_either_way("alpha.md", "Beta.md"));
    }

    #[test]
    fn test_aliased_link_counts() {
        let notes = vec![
            note_from_content("alpha.md", "See [[Beta|the beta note]].", 0),
            note_from_content("beta.md", "", 0),
        ];
        let graph = LinkGraph::build(&notes);
        assert!(graph.linked_either_way("alpha.md", "beta.md"));
    }

    #[test]
    fn test_unknown_path_is_not_linked() {
        let notes = vec![note_from_content("alpha.md", "[[Beta]]", 0)];
        let graph = LinkGraph::build(&notes);
        assert!(!graph.linked_either_way("alpha.md", "missing.md"));
    }
}
