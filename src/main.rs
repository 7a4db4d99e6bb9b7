//! # Semvault CLI (`sv`)
//!
//! The `sv` binary is the primary interface for Semvault. It provides
//! commands for database initialization, indexing passes, similarity
//! queries, suggestions, statistics, and starting the MCP server.
//!
//! ## Usage
//!
//! ```bash
//! sv --config ./semvault.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sv init` | Create the SQLite database and run schema migrations |
//! | `sv index` | Run an incremental indexing pass over the vault |
//! | `sv query "<text>"` | Find notes semantically similar to a text |
//! | `sv suggest links` | Propose links between similar but unlinked notes |
//! | `sv suggest folder` | Suggest folder placement for a new note |
//! | `sv stats` | Show vault and index statistics |
//! | `sv serve mcp` | Start the MCP-compatible HTTP server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use semvault::config::{self, Config};
use semvault::embedding::create_provider;
use semvault::index::Indexer;
use semvault::links::LinkGraph;
use semvault::retrieve::retrieve;
use semvault::store::sqlite::SqliteStore;
use semvault::store::TagFilter;
use semvault::suggest_folder::suggest_folder;
use semvault::suggest_links::suggest_connections;
use semvault::{db, migrate, server, stats, vault};

/// Semvault CLI — a semantic indexing and retrieval engine for markdown
/// note vaults.
#[derive(Parser)]
#[command(
    name = "sv",
    about = "Semvault — semantic indexing and retrieval for markdown note vaults",
    version,
    long_about = "Semvault scans a markdown vault, chunks and embeds note content, and \
    maintains an incremental vector index in SQLite. It answers similarity queries, \
    proposes links between related notes, and suggests folder placement, via a CLI \
    and an MCP-compatible HTTP server."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./semvault.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the chunks table. Idempotent.
    Init,

    /// Run an indexing pass over the vault.
    ///
    /// Scans the vault, reindexes notes whose content changed, and removes
    /// index entries for deleted notes. Unchanged notes are skipped.
    Index {
        /// Reindex every note even if unchanged. Required after switching
        /// embedding models.
        #[arg(long)]
        force: bool,

        /// Stop the pass after this many seconds, at a note boundary.
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Find notes semantically similar to a text.
    Query {
        /// The query text.
        text: String,

        /// Maximum number of notes to return.
        #[arg(long)]
        k: Option<usize>,

        /// Only return notes carrying at least one of these tags (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Suggestion tools built on the index.
    Suggest {
        #[command(subcommand)]
        kind: SuggestKind,
    },

    /// Show vault and index statistics.
    Stats,

    /// Start the MCP-compatible HTTP server.
    Serve {
        #[command(subcommand)]
        service: ServeService,
    },
}

/// Suggestion subcommands.
#[derive(Subcommand)]
enum SuggestKind {
    /// Propose links between topically close but unlinked notes.
    Links {
        /// Minimum similarity for a suggestion.
        #[arg(long)]
        threshold: Option<f32>,

        /// Maximum number of suggestions.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Suggest folder placement for a new note.
    Folder {
        /// Title of the new note.
        #[arg(long)]
        title: String,

        /// Tags of the new note (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Draft content of the new note.
        #[arg(long, default_value = "")]
        content: String,
    },
}

/// Server subcommands.
#[derive(Subcommand)]
enum ServeService {
    /// Start the MCP tool server on `[server].bind`.
    Mcp,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Index {
            force,
            timeout_secs,
        } => {
            run_index(&cfg, force, timeout_secs).await?;
        }
        Commands::Query { text, k, tags } => {
            run_query(&cfg, &text, k, tags).await?;
        }
        Commands::Suggest { kind } => match kind {
            SuggestKind::Links { threshold, limit } => {
                run_suggest_links(&cfg, threshold, limit).await?;
            }
            SuggestKind::Folder {
                title,
                tags,
                content,
            } => {
                run_suggest_folder(&cfg, &title, &tags, &content).await?;
            }
        },
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve { service } => match service {
            ServeService::Mcp => {
                server::run_server(&cfg).await?;
            }
        },
    }

    Ok(())
}

fn embeddings_disabled_notice() {
    println!("Semantic features are disabled: no embedding provider is configured.");
    println!("Set [embedding].provider in the config to \"ollama\" or \"openai\".");
}

async fn open_store(cfg: &Config) -> anyhow::Result<SqliteStore> {
    let pool = db::connect(cfg).await?;
    migrate::run_migrations(&pool).await?;
    Ok(SqliteStore::new(pool))
}

async fn run_index(cfg: &Config, force: bool, timeout_secs: Option<u64>) -> anyhow::Result<()> {
    if !cfg.embedding.is_enabled() {
        embeddings_disabled_notice();
        return Ok(());
    }

    let notes = vault::scan_vault(&cfg.vault)?;
    println!("Scanned {} notes in {}", notes.len(), cfg.vault.root.display());

    let provider = create_provider(&cfg.embedding)?;
    let store = Arc::new(open_store(cfg).await?);
    let indexer = Indexer::new(store.clone(), provider, &cfg.chunking, &cfg.embedding);

    let deadline = timeout_secs.map(|secs| Instant::now() + Duration::from_secs(secs));
    let started = Instant::now();
    let report = indexer.run(&notes, force, deadline).await?;

    println!(
        "Indexed {} notes ({} skipped, {} orphaned, {} failed) in {:.1}s",
        report.reindexed,
        report.skipped,
        report.orphaned,
        report.failed,
        started.elapsed().as_secs_f64()
    );
    if report.interrupted {
        println!("Pass interrupted by timeout; rerun to finish the remaining notes.");
    }

    store.close().await;
    Ok(())
}

async fn run_query(
    cfg: &Config,
    text: &str,
    k: Option<usize>,
    tags: Vec<String>,
) -> anyhow::Result<()> {
    if !cfg.embedding.is_enabled() {
        embeddings_disabled_notice();
        return Ok(());
    }

    let provider = create_provider(&cfg.embedding)?;
    let store = open_store(cfg).await?;

    let filter = (!tags.is_empty()).then(|| TagFilter { any_of: tags });
    let k = k.unwrap_or(cfg.retrieval.k);
    let hits = retrieve(
        &store,
        provider.as_ref(),
        &cfg.retrieval,
        text,
        k,
        filter.as_ref(),
    )
    .await;

    if hits.is_empty() {
        println!("No results. Is the vault indexed? Try `sv index`.");
    } else {
        for (i, hit) in hits.iter().enumerate() {
            println!("{}. {} (score {:.3})", i + 1, hit.path, hit.score);
            let snippet: String = hit.snippet.chars().take(160).collect();
            println!("   {}", snippet.replace('\n', " "));
        }
    }

    store.close().await;
    Ok(())
}

async fn run_suggest_links(
    cfg: &Config,
    threshold: Option<f32>,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    if !cfg.embedding.is_enabled() {
        embeddings_disabled_notice();
        return Ok(());
    }

    let notes = vault::scan_vault(&cfg.vault)?;
    let graph = LinkGraph::build(&notes);
    let provider = create_provider(&cfg.embedding)?;
    let store = open_store(cfg).await?;

    let suggestions = suggest_connections(
        &store,
        provider.as_ref(),
        &cfg.retrieval,
        &cfg.suggest,
        &notes,
        &graph,
        threshold.unwrap_or(cfg.suggest.link_threshold),
        limit.unwrap_or(cfg.suggest.link_limit),
    )
    .await?;

    if suggestions.is_empty() {
        println!("No connection suggestions.");
    } else {
        println!("Suggested connections:");
        for s in &suggestions {
            println!(
                "  {} <-> {} (similarity {:.3})",
                s.note_a, s.note_b, s.similarity
            );
        }
    }

    store.close().await;
    Ok(())
}

async fn run_suggest_folder(
    cfg: &Config,
    title: &str,
    tags: &[String],
    content: &str,
) -> anyhow::Result<()> {
    let notes = vault::scan_vault(&cfg.vault)?;
    let provider = create_provider(&cfg.embedding)?;
    let store = open_store(cfg).await?;

    let result = suggest_folder(
        &store,
        provider.as_ref(),
        &cfg.retrieval,
        &cfg.suggest,
        &notes,
        title,
        tags,
        content,
    )
    .await;

    println!("Strategy: {:?}", result.strategy);
    for c in &result.candidates {
        println!(
            "  {} ({:.0}% confidence, {:?})",
            c.folder, c.confidence_pct, c.band
        );
        for path in &c.supporting_notes {
            println!("    supported by {}", path);
        }
    }

    store.close().await;
    Ok(())
}
