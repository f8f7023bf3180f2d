//! `/v1` API: chat and ingest.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | POST | `/v1/chat` | Answer a question with retrieved context |
//! | POST | `/v1/ingest` | Add documents or Pokemon records to the knowledge base |

use crate::SharedState;
use axum::{Router, extract::State, http::StatusCode, response::Json, routing::post};
use pokerag_agent::ingest::{IngestReport, PokemonRecord};
use pokerag_agent::{ChatRequest, ChatResponse};
use pokerag_core::error::Error;
use pokerag_core::source::{CrawlSpec, SourceDocument};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/ingest", post(ingest_handler))
        .with_state(state)
}

// ── DTOs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable validation code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub retryable: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct IngestRequest {
    #[serde(default)]
    pub documents: Vec<SourceDocument>,
    #[serde(default)]
    pub pokemon: Vec<PokemonRecord>,
    /// Items to take; 0 takes everything. Capped at the configured crawl maximum.
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub start_from: usize,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a pipeline error to a status code and a body that never leaks
/// collaborator details.
pub fn error_response(err: &Error) -> ApiError {
    let status = match err {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::Embedding(_) | Error::Search(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::Completion(_) => StatusCode::BAD_GATEWAY,
        Error::Store(e) if e.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(status = status.as_u16(), error = %err, "Request failed");
    }

    let kind = match err {
        Error::Validation(v) => Some(v.kind().to_string()),
        _ => None,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.public_message(),
            kind,
            retryable: err.is_retryable(),
        }),
    )
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn chat_handler(
    State(state): State<SharedState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    info!(
        history_turns = request.conversation_history.len(),
        budget_override = request.max_prompt_tokens,
        "v1/chat request"
    );
    state
        .services
        .chat
        .handle(request)
        .await
        .map(Json)
        .map_err(|e| error_response(&e))
}

async fn ingest_handler(
    State(state): State<SharedState>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestReport>, ApiError> {
    let mut documents: Vec<SourceDocument> =
        request.pokemon.iter().map(PokemonRecord::to_document).collect();
    documents.extend(request.documents);

    // Inline payloads are ingested in full unless the caller asks for a
    // window; a requested limit is still capped.
    let available = documents.len();
    let take = match request.limit {
        0 => usize::MAX,
        limit => state.services.crawl_spec(CrawlSpec::new(limit)).limit,
    };
    let documents: Vec<SourceDocument> = documents
        .into_iter()
        .skip(request.start_from)
        .take(take)
        .collect();
    let skipped = available - documents.len();
    info!(available, selected = documents.len(), skipped, "v1/ingest request");

    let mut report = state
        .services
        .ingest
        .ingest_documents(documents)
        .await
        .map_err(|e| error_response(&e))?;
    report.skipped = skipped;
    Ok(Json(report))
}
