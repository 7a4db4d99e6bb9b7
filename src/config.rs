use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub vault: VaultConfig,
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub suggest: SuggestConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VaultConfig {
    /// Root of the notes vault. All note paths are relative to this.
    pub root: PathBuf,
    #[serde(default = "default_exclude_folders")]
    pub exclude_folders: Vec<String>,
    #[serde(default = "default_exclude_globs")]
    pub exclude_globs: Vec<String>,
}

fn default_exclude_folders() -> Vec<String> {
    vec![".obsidian".to_string(), "Templates".to_string()]
}

fn default_exclude_globs() -> Vec<String> {
    vec!["*.excalidraw.md".to_string(), "*.canvas.md".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
        }
    }
}

fn default_max_chars() -> usize {
    1500
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the Ollama provider.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            base_url: default_base_url(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_batch_size() -> usize {
    32
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Default number of note-level results to return.
    #[serde(default = "default_k")]
    pub k: usize,
    /// Chunk candidates fetched per query = k × chunk_multiplier,
    /// leaving headroom for note-level deduplication.
    #[serde(default = "default_chunk_multiplier")]
    pub chunk_multiplier: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            chunk_multiplier: default_chunk_multiplier(),
        }
    }
}

fn default_k() -> usize {
    10
}
fn default_chunk_multiplier() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct SuggestConfig {
    /// Minimum similarity for a connection suggestion.
    #[serde(default = "default_link_threshold")]
    pub link_threshold: f32,
    /// Maximum number of connection suggestions per run.
    #[serde(default = "default_link_limit")]
    pub link_limit: usize,
    /// Neighbors retrieved per note when scanning for connections.
    #[serde(default = "default_link_k")]
    pub link_k: usize,
    /// Notes shorter than this (in words) are skipped by the connection scan.
    #[serde(default = "default_min_words")]
    pub min_words: usize,
    /// Similar notes consulted for folder voting.
    #[serde(default = "default_similar_notes")]
    pub similar_notes: usize,
    /// Folder candidates returned to the caller.
    #[serde(default = "default_folder_candidates")]
    pub folder_candidates: usize,
    /// Content excerpt length used to build the folder query.
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,
    /// Folder-name substrings treated as inbox-like for the last-resort fallback.
    #[serde(default = "default_inbox_names")]
    pub inbox_names: Vec<String>,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            link_threshold: default_link_threshold(),
            link_limit: default_link_limit(),
            link_k: default_link_k(),
            min_words: default_min_words(),
            similar_notes: default_similar_notes(),
            folder_candidates: default_folder_candidates(),
            excerpt_chars: default_excerpt_chars(),
            inbox_names: default_inbox_names(),
        }
    }
}

fn default_link_threshold() -> f32 {
    0.70
}
fn default_link_limit() -> usize {
    10
}
fn default_link_k() -> usize {
    5
}
fn default_min_words() -> usize {
    150
}
fn default_similar_notes() -> usize {
    5
}
fn default_folder_candidates() -> usize {
    3
}
fn default_excerpt_chars() -> usize {
    1000
}
fn default_inbox_names() -> Vec<String> {
    vec!["inbox".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7431".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.chunking.max_chars == 0 {
        anyhow::bail!("chunking.max_chars must be > 0");
    }

    if config.retrieval.k == 0 {
        anyhow::bail!("retrieval.k must be >= 1");
    }
    if config.retrieval.chunk_multiplier == 0 {
        anyhow::bail!("retrieval.chunk_multiplier must be >= 1");
    }

    if !(0.0..=1.0).contains(&config.suggest.link_threshold) {
        anyhow::bail!("suggest.link_threshold must be in [0.0, 1.0]");
    }

    if config.embedding.is_enabled() {
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("sv.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        (tmp, path)
    }

    #[test]
    fn test_minimal_config_defaults() {
        let (_tmp, path) = write_config(
            r#"
[vault]
root = "/tmp/vault"

[db]
path = "/tmp/sv.sqlite"
"#,
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.chunking.max_chars, 1500);
        assert_eq!(cfg.retrieval.k, 10);
        assert!((cfg.suggest.link_threshold - 0.70).abs() < 1e-6);
        assert!(!cfg.embedding.is_enabled());
    }

    #[test]
    fn test_enabled_provider_requires_model_and_dims() {
        let (_tmp, path) = write_config(
            r#"
[vault]
root = "/tmp/vault"

[db]
path = "/tmp/sv.sqlite"

[embedding]
provider = "ollama"
"#,
        );
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let (_tmp, path) = write_config(
            r#"
[vault]
root = "/tmp/vault"

[db]
path = "/tmp/sv.sqlite"

[embedding]
provider = "chroma"
model = "m"
dims = 8
"#,
        );
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_threshold_range_validated() {
        let (_tmp, path) = write_config(
            r#"
[vault]
root = "/tmp/vault"

[db]
path = "/tmp/sv.sqlite"

[suggest]
link_threshold = 1.5
"#,
        );
        assert!(load_config(&path).is_err());
    }
}
