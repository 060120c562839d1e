//! services/api/src/web/analyzer.rs
//!
//! Document analysis and Q&A. Anonymous callers get results without history;
//! a session cookie records documents and chat turns for that user.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::port_error_response;
use crate::web::middleware::optional_user;
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct ProcessRequest {
    /// Local path of the PDF.
    pub path: String,
}

#[derive(Deserialize, ToSchema)]
pub struct AskRequest {
    pub question: String,
    /// The stored document the question is about; enables the chat log.
    pub document_id: Option<Uuid>,
    /// Extracted text returned by `/analyzer/process`. Re-read from the stored
    /// document when omitted.
    pub context: Option<String>,
}

/// POST /analyzer/process - Extract, summarise and record a PDF
#[utoipa::path(
    post,
    path = "/analyzer/process",
    request_body = ProcessRequest,
    responses(
        (status = 200, description = "Summary, models and extracted text"),
        (status = 404, description = "PDF file not found"),
        (status = 500, description = "The PDF could not be read")
    )
)]
pub async fn process_pdf_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ProcessRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = optional_user(&state, &headers).await;
    let processed = state
        .analyzer
        .process_pdf(user_id, std::path::Path::new(req.path.trim()))
        .await
        .map_err(|e| {
            error!("Failed to process {}: {:?}", req.path, e);
            port_error_response(&e)
        })?;
    Ok(Json(processed))
}

/// POST /analyzer/ask - Ask a question about the loaded PDF
#[utoipa::path(
    post,
    path = "/analyzer/ask",
    request_body = AskRequest,
    responses(
        (status = 200, description = "The answer"),
        (status = 400, description = "Blank question or no document loaded"),
        (status = 404, description = "Unknown document")
    )
)]
pub async fn ask_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<AskRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = optional_user(&state, &headers).await;
    let answer = state
        .analyzer
        .ask(user_id, req.document_id, &req.question, req.context.as_deref())
        .await
        .map_err(|e| {
            error!("Failed to answer question: {:?}", e);
            port_error_response(&e)
        })?;
    Ok(Json(answer))
}

/// GET /history - Documents the user analysed, newest first
#[utoipa::path(
    get,
    path = "/history",
    responses(
        (status = 200, description = "Analysed documents"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn history_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let documents = state.analyzer.history(user_id).await.map_err(|e| {
        error!("Failed to load history of {}: {:?}", user_id, e);
        port_error_response(&e)
    })?;
    Ok(Json(documents))
}

/// GET /history/{document_id}/chat - The chat log of one document
#[utoipa::path(
    get,
    path = "/history/{document_id}/chat",
    params(("document_id" = Uuid, Path, description = "Stored document id")),
    responses(
        (status = 200, description = "Chat turns, oldest first"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Unknown document")
    )
)]
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(document_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let messages = state
        .analyzer
        .chat(user_id, document_id)
        .await
        .map_err(|e| port_error_response(&e))?;
    Ok(Json(messages))
}
