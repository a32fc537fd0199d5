//! JSON HTTP API.
//!
//! Every handler goes through one shared [`Pipeline`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST`   | `/documents?filename=<name>` | Upload raw PDF bytes |
//! | `GET`    | `/documents` | List documents, most recent first |
//! | `DELETE` | `/documents/{doc_id}` | Delete one document and its passages |
//! | `DELETE` | `/documents` | Delete everything |
//! | `POST`   | `/ask` | Answer `{question, doc_id?, k?}` |
//! | `GET`    | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "document not found: 1a2b3c4d_x.pdf" } }
//! ```
//!
//! | Code | Status |
//! |------|--------|
//! | `bad_request`, `invalid_config` | 400 |
//! | `not_found` | 404 |
//! | `empty_document`, `extraction` | 422 |
//! | `embedding_provider`, `answer_provider` | 502 |
//! | `dimension_mismatch`, `encoding`, `storage` | 500 |

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use pdfqa_core::models::{Answer, DocumentRecord, IngestOutcome};
use pdfqa_core::pipeline::Pipeline;
use pdfqa_core::RagError;

use crate::app::App;
use crate::extract::extract_pdf_pages_blocking;

/// Largest accepted upload body.
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

const DEFAULT_FILENAME: &str = "document.pdf";

#[derive(Clone)]
struct AppState {
    pipeline: Pipeline,
    top_k: usize,
}

/// Bind to `[server].bind` and serve until the process exits.
pub async fn run_server(app: App) -> anyhow::Result<()> {
    let bind_addr = app.config.server.bind.clone();
    let router = router(app.pipeline, app.config.retrieval.top_k);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    println!("pdfqa server listening on http://{}", bind_addr);
    tracing::info!(bind = %bind_addr, "server started");

    axum::serve(listener, router).await?;
    Ok(())
}

/// Build the API router. `top_k` is used when a request omits `k`.
pub fn router(pipeline: Pipeline, top_k: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/documents",
            post(handle_upload).get(handle_list).delete(handle_clear),
        )
        .route("/documents/{doc_id}", delete(handle_delete))
        .route("/ask", post(handle_ask))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { pipeline, top_k })
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

fn status_for(err: &RagError) -> StatusCode {
    match err {
        RagError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
        RagError::NotFound(_) => StatusCode::NOT_FOUND,
        RagError::EmptyDocument(_) | RagError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RagError::EmbeddingProvider(_) | RagError::AnswerProvider(_) => StatusCode::BAD_GATEWAY,
        RagError::DimensionMismatch { .. } | RagError::Encoding(_) | RagError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<RagError> for AppError {
    fn from(err: RagError) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            tracing::error!(code = err.code(), error = %err, "request failed");
        }
        AppError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
        }
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

// ============ /documents ============

#[derive(Deserialize)]
struct UploadQuery {
    filename: Option<String>,
}

async fn handle_upload(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<IngestOutcome>), AppError> {
    if body.is_empty() {
        return Err(bad_request("request body must contain a PDF"));
    }
    let filename = query
        .filename
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string());

    let pages = extract_pdf_pages_blocking(body.to_vec()).await?;
    let outcome = state.pipeline.ingest_pages(&filename, &pages).await?;
    let status = if outcome.is_new {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome)))
}

#[derive(Serialize)]
struct ListResponse {
    documents: Vec<DocumentRecord>,
}

async fn handle_list(State(state): State<AppState>) -> Result<Json<ListResponse>, AppError> {
    let documents = state.pipeline.list_documents().await?;
    Ok(Json(ListResponse { documents }))
}

#[derive(Serialize)]
struct DeleteResponse {
    deleted: bool,
}

async fn handle_delete(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let deleted = state.pipeline.delete_document(&doc_id).await?;
    Ok(Json(DeleteResponse { deleted }))
}

#[derive(Serialize)]
struct ClearResponse {
    cleared: bool,
}

async fn handle_clear(State(state): State<AppState>) -> Result<Json<ClearResponse>, AppError> {
    state.pipeline.clear_all().await?;
    Ok(Json(ClearResponse { cleared: true }))
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct AskRequest {
    question: String,
    #[serde(default)]
    doc_id: Option<String>,
    #[serde(default)]
    k: Option<usize>,
}

async fn handle_ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<Answer>, AppError> {
    if req.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }
    let k = req.k.unwrap_or(state.top_k);
    let answer = state
        .pipeline
        .answer_query(&req.question, req.doc_id.as_deref(), k)
        .await?;
    Ok(Json(answer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (RagError::InvalidConfig("x".into()), 400, "invalid_config"),
            (RagError::NotFound("x".into()), 404, "not_found"),
            (RagError::EmptyDocument("x".into()), 422, "empty_document"),
            (RagError::Extraction("x".into()), 422, "extraction"),
            (RagError::EmbeddingProvider("x".into()), 502, "embedding_provider"),
            (RagError::AnswerProvider("x".into()), 502, "answer_provider"),
            (
                RagError::DimensionMismatch {
                    expected: 3,
                    actual: 2,
                },
                500,
                "dimension_mismatch",
            ),
            (RagError::Storage("x".into()), 500, "storage"),
            (RagError::Encoding("x".into()), 500, "encoding"),
        ];
        for (err, status, code) in cases {
            let app_err = AppError::from(err);
            assert_eq!(app_err.status.as_u16(), status);
            assert_eq!(app_err.code, code);
        }
    }
}
