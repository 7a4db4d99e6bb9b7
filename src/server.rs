//! MCP-compatible HTTP server.
//!
//! Exposes the vault engine over a JSON HTTP API suitable for integration
//! with MCP-aware editors and assistants.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/tools/list` | List the available tools |
//! | `POST` | `/tools/{name}` | Call a tool by name |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! Tools: `index`, `query`, `suggest_connections`, `suggest_folder`.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "text must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404),
//! `embeddings_disabled` (400), `internal` (500). An `index` call stopped
//! by its deadline is not an error; the report carries `interrupted`.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients and cross-origin MCP tool calls.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::index::Indexer;
use crate::links::LinkGraph;
use crate::models::Note;
use crate::retrieve::retrieve;
use crate::store::sqlite::SqliteStore;
use crate::store::TagFilter;
use crate::suggest_folder::suggest_folder;
use crate::suggest_links::suggest_connections;
use crate::{db, migrate, vault};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    store: Arc<SqliteStore>,
    provider: Arc<dyn EmbeddingProvider>,
    // The indexer owns the pass lock, so concurrent `index` tool calls
    // queue up instead of interleaving.
    indexer: Arc<Indexer>,
}

/// Starts the MCP-compatible HTTP server.
///
/// Binds to `[server].bind` and runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let config = Arc::new(config.clone());

    let provider = crate::embedding::create_provider(&config.embedding)?;
    let pool = db::connect(&config).await?;
    migrate::run_migrations(&pool).await?;
    let store = Arc::new(SqliteStore::new(pool));

    let indexer = Arc::new(Indexer::new(
        store.clone(),
        provider.clone(),
        &config.chunking,
        &config.embedding,
    ));

    let state = AppState {
        config,
        store,
        provider,
        indexer,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/tools/list", get(handle_list_tools))
        .route("/tools/{name}", post(handle_tool_call))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    println!("MCP server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn embeddings_disabled(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "embeddings_disabled".to_string(),
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: err.to_string(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /tools/list ============

#[derive(Serialize)]
struct ToolInfo {
    name: &'static str,
    description: &'static str,
}

#[derive(Serialize)]
struct ToolListResponse {
    tools: Vec<ToolInfo>,
}

const TOOLS: &[ToolInfo] = &[
    ToolInfo {
        name: "index",
        description: "Run an incremental indexing pass over the vault",
    },
    ToolInfo {
        name: "query",
        description: "Find notes semantically similar to a text",
    },
    ToolInfo {
        name: "suggest_connections",
        description: "Propose links between similar but unlinked notes",
    },
    ToolInfo {
        name: "suggest_folder",
        description: "Suggest folder placement for a new note",
    },
];

async fn handle_list_tools() -> Json<ToolListResponse> {
    Json(ToolListResponse {
        tools: TOOLS
            .iter()
            .map(|t| ToolInfo {
                name: t.name,
                description: t.description,
            })
            .collect(),
    })
}

// ============ POST /tools/{name} ============

#[derive(Deserialize, Default)]
struct IndexParams {
    #[serde(default)]
    force: bool,
    timeout_secs: Option<u64>,
}

#[derive(Deserialize)]
struct QueryParams {
    text: String,
    k: Option<usize>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Deserialize, Default)]
struct ConnectionParams {
    threshold: Option<f32>,
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct FolderParams {
    title: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    content: String,
}

async fn handle_tool_call(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(params): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = match name.as_str() {
        "index" => tool_index(&state, parse(params)?).await?,
        "query" => tool_query(&state, parse(params)?).await?,
        "suggest_connections" => tool_suggest_connections(&state, parse(params)?).await?,
        "suggest_folder" => tool_suggest_folder(&state, parse(params)?).await?,
        _ => return Err(not_found(format!("no tool registered with name: {}", name))),
    };
    Ok(Json(serde_json::json!({ "result": result })))
}

fn parse<T: serde::de::DeserializeOwned>(params: serde_json::Value) -> Result<T, AppError> {
    serde_json::from_value(params).map_err(|e| bad_request(format!("invalid parameters: {e}")))
}

fn scan(state: &AppState) -> Result<Vec<Note>, AppError> {
    vault::scan_vault(&state.config.vault).map_err(internal)
}

fn require_embeddings(state: &AppState) -> Result<(), AppError> {
    if state.config.embedding.is_enabled() {
        Ok(())
    } else {
        Err(embeddings_disabled(
            "semantic features are disabled; configure [embedding] to enable them",
        ))
    }
}

async fn tool_index(state: &AppState, params: IndexParams) -> Result<serde_json::Value, AppError> {
    require_embeddings(state)?;
    let notes = scan(state)?;
    let deadline = params
        .timeout_secs
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    let report = state
        .indexer
        .run(&notes, params.force, deadline)
        .await
        .map_err(internal)?;
    serde_json::to_value(report).map_err(|e| internal(e.into()))
}

async fn tool_query(state: &AppState, params: QueryParams) -> Result<serde_json::Value, AppError> {
    if params.text.trim().is_empty() {
        return Err(bad_request("text must not be empty"));
    }
    require_embeddings(state)?;
    let k = params.k.unwrap_or(state.config.retrieval.k);
    let filter = (!params.tags.is_empty()).then(|| TagFilter {
        any_of: params.tags.clone(),
    });
    let hits = retrieve(
        state.store.as_ref(),
        state.provider.as_ref(),
        &state.config.retrieval,
        &params.text,
        k,
        filter.as_ref(),
    )
    .await;
    serde_json::to_value(hits).map_err(|e| internal(e.into()))
}

async fn tool_suggest_connections(
    state: &AppState,
    params: ConnectionParams,
) -> Result<serde_json::Value, AppError> {
    require_embeddings(state)?;
    let notes = scan(state)?;
    let graph = LinkGraph::build(&notes);
    let cfg = &state.config.suggest;
    let suggestions = suggest_connections(
        state.store.as_ref(),
        state.provider.as_ref(),
        &state.config.retrieval,
        cfg,
        &notes,
        &graph,
        params.threshold.unwrap_or(cfg.link_threshold),
        params.limit.unwrap_or(cfg.link_limit),
    )
    .await
    .map_err(internal)?;
    serde_json::to_value(suggestions).map_err(|e| internal(e.into()))
}

async fn tool_suggest_folder(
    state: &AppState,
    params: FolderParams,
) -> Result<serde_json::Value, AppError> {
    if params.title.trim().is_empty() {
        return Err(bad_request("title must not be empty"));
    }
    // Folder placement still works without embeddings via its fallbacks.
    let notes = scan(state)?;
    let suggestion = suggest_folder(
        state.store.as_ref(),
        state.provider.as_ref(),
        &state.config.retrieval,
        &state.config.suggest,
        &notes,
        &params.title,
        &params.tags,
        &params.content,
    )
    .await;
    serde_json::to_value(suggestion).map_err(|e| internal(e.into()))
}
