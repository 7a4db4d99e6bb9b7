//! # Semvault
//!
//! A semantic indexing and retrieval engine for markdown note vaults.
//!
//! Semvault scans a vault of markdown notes, chunks and embeds their
//! content, and maintains an incremental vector index in SQLite. On top of
//! the index it answers similarity queries, proposes links between related
//! but unconnected notes, and suggests folder placement for new notes.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────┐
//! │    Vault    │──▶│   Indexer    │──▶│  SQLite   │
//! │  (markdown) │   │ Chunk+Embed  │   │  vectors  │
//! └─────────────┘   └──────────────┘   └────┬─────┘
//!                                           │
//!                       ┌───────────────────┤
//!                       ▼                   ▼
//!                  ┌──────────┐       ┌──────────┐
//!                  │   CLI    │       │   HTTP   │
//!                  │   (sv)   │       │  (MCP)   │
//!                  └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! sv init                          # create database
//! sv index                         # incremental indexing pass
//! sv query "distributed consensus" # find similar notes
//! sv suggest links                 # propose missing connections
//! sv suggest folder --title "Raft" # place a new note
//! sv serve mcp                     # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`vault`] | Vault scanning and markdown parsing |
//! | [`chunk`] | Text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Vector store backends |
//! | [`index`] | Incremental indexing passes |
//! | [`retrieve`] | Note-level similarity retrieval |
//! | [`links`] | Wikilink graph |
//! | [`suggest_links`] | Connection discovery |
//! | [`suggest_folder`] | Folder placement |
//! | [`server`] | MCP HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod index;
pub mod links;
pub mod migrate;
pub mod models;
pub mod retrieve;
pub mod server;
pub mod stats;
pub mod store;
pub mod suggest_folder;
pub mod suggest_links;
pub mod vault;
